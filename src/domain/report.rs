//! Report rows and the pure aggregation that turns them into per-content
//! groups for administrator triage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::content::{ContentKind, ContentRef};

/// Maximum accepted length for the free-text description on a report.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub content_kind: ContentKind,
    pub content_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub status: ReportStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Report {
    pub fn content(&self) -> ContentRef {
        ContentRef::new(self.content_kind, self.content_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    Inappropriate,
    Copyright,
    Misinformation,
    Other,
}

impl ReportReason {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "spam" => Some(Self::Spam),
            "harassment" => Some(Self::Harassment),
            "inappropriate" => Some(Self::Inappropriate),
            "copyright" => Some(Self::Copyright),
            "misinformation" => Some(Self::Misinformation),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Spam => "spam",
            Self::Harassment => "harassment",
            Self::Inappropriate => "inappropriate",
            Self::Copyright => "copyright",
            Self::Misinformation => "misinformation",
            Self::Other => "other",
        }
    }
}

/// Report lifecycle. `Resolved` and `Rejected` are terminal; triage order
/// for a group is pending, then reviewed, then resolved, then rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "reviewed" => Some(Self::Reviewed),
            "resolved" => Some(Self::Resolved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    /// Still awaiting an administrator decision.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Reviewed)
    }

    fn triage_rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Reviewed => 1,
            Self::Resolved => 2,
            Self::Rejected => 3,
        }
    }
}

/// All reports against one content item, with the derived histograms.
/// Computed on read, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ReportGroup {
    pub content_kind: ContentKind,
    pub content_id: Uuid,
    pub total: i64,
    pub reason_counts: BTreeMap<String, i64>,
    pub status_counts: BTreeMap<String, i64>,
    pub primary_status: ReportStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub latest_report_at: OffsetDateTime,
    pub reports: Vec<Report>,
}

impl ReportGroup {
    pub fn content(&self) -> ContentRef {
        ContentRef::new(self.content_kind, self.content_id)
    }

    /// True once every report in the group has reached a terminal status;
    /// a settled group rejects further penalty or removal actions.
    pub fn is_settled(&self) -> bool {
        self.reports.iter().all(|report| !report.status.is_open())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Desc
    }
}

/// Group raw report rows by (kind, id), preserving the first-seen order of
/// groups and row order within each group.
pub fn group_reports(rows: Vec<Report>) -> Vec<ReportGroup> {
    let mut order: Vec<ContentRef> = Vec::new();
    let mut buckets: BTreeMap<(ContentKind, Uuid), Vec<Report>> = BTreeMap::new();

    for row in rows {
        let key = (row.content_kind, row.content_id);
        let bucket = buckets.entry(key).or_default();
        if bucket.is_empty() {
            order.push(row.content());
        }
        bucket.push(row);
    }

    order
        .into_iter()
        .map(|content| {
            let reports = buckets
                .remove(&(content.kind, content.id))
                .unwrap_or_default();
            build_group(content, reports)
        })
        .collect()
}

fn build_group(content: ContentRef, reports: Vec<Report>) -> ReportGroup {
    let mut reason_counts: BTreeMap<String, i64> = BTreeMap::new();
    let mut status_counts: BTreeMap<String, i64> = BTreeMap::new();
    let mut latest_report_at = reports[0].created_at;

    for report in &reports {
        *reason_counts
            .entry(report.reason.as_db().to_string())
            .or_default() += 1;
        *status_counts
            .entry(report.status.as_db().to_string())
            .or_default() += 1;
        if report.created_at > latest_report_at {
            latest_report_at = report.created_at;
        }
    }

    let primary_status = primary_status(reports.iter().map(|report| report.status))
        .unwrap_or(ReportStatus::Pending);

    ReportGroup {
        content_kind: content.kind,
        content_id: content.id,
        total: reports.len() as i64,
        reason_counts,
        status_counts,
        primary_status,
        latest_report_at,
        reports,
    }
}

/// First of pending, reviewed, resolved, rejected present in the set.
pub fn primary_status(statuses: impl IntoIterator<Item = ReportStatus>) -> Option<ReportStatus> {
    statuses
        .into_iter()
        .min_by_key(|status| status.triage_rank())
}

/// Order groups by their latest report date. Stable: ties keep the
/// first-seen group order.
pub fn sort_groups(groups: &mut [ReportGroup], order: SortOrder) {
    match order {
        SortOrder::Asc => groups.sort_by_key(|group| group.latest_report_at),
        SortOrder::Desc => {
            groups.sort_by(|a, b| b.latest_report_at.cmp(&a.latest_report_at))
        }
    }
}
