//! Report submission and the read side of administrator triage.

use anyhow::{anyhow, Result};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::app::content::ContentService;
use crate::domain::content::{ContentRef, ContentSummary, Visibility};
use crate::domain::report::{
    self, Report, ReportGroup, ReportReason, ReportStatus, SortOrder,
};
use crate::infra::db::Db;

/// Result of the idempotent report toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Reported,
    Withdrawn,
    ContentNotFound,
    NotReportable,
    OwnContent,
}

/// A report group joined with whatever remains of its target. `content`
/// is `None` once the target has been deleted; the group itself stays
/// visible so moderation history survives removal.
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    #[serde(flatten)]
    pub group: ReportGroup,
    pub content: Option<ContentSummary>,
}

#[derive(Clone)]
pub struct ReportService {
    db: Db,
}

impl ReportService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Idempotent toggle: a second submission by the same reporter against
    /// the same content withdraws the first instead of duplicating it.
    pub async fn submit(
        &self,
        reporter_id: Uuid,
        content: ContentRef,
        reason: ReportReason,
        description: Option<String>,
    ) -> Result<SubmitOutcome> {
        let target = ContentService::new(self.db.clone()).resolve(content).await?;
        let (owner_id, visibility) = match target {
            Some(target) => target,
            None => return Ok(SubmitOutcome::ContentNotFound),
        };
        if owner_id == reporter_id {
            return Ok(SubmitOutcome::OwnContent);
        }
        if visibility != Visibility::Public {
            return Ok(SubmitOutcome::NotReportable);
        }

        let mut tx = self.db.pool().begin().await?;
        let removed = sqlx::query(
            "DELETE FROM reports \
             WHERE reporter_id = $1 AND content_kind = $2::content_kind AND content_id = $3",
        )
        .bind(reporter_id)
        .bind(content.kind.as_db())
        .bind(content.id)
        .execute(&mut *tx)
        .await?;

        if removed.rows_affected() > 0 {
            tx.commit().await?;
            return Ok(SubmitOutcome::Withdrawn);
        }

        sqlx::query(
            "INSERT INTO reports (reporter_id, content_kind, content_id, reason, description) \
             VALUES ($1, $2::content_kind, $3, $4::report_reason, $5)",
        )
        .bind(reporter_id)
        .bind(content.kind.as_db())
        .bind(content.id)
        .bind(reason.as_db())
        .bind(description)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(SubmitOutcome::Reported)
    }

    /// Every report group, ordered by latest report date.
    pub async fn list_groups(&self, order: SortOrder) -> Result<Vec<GroupView>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM reports ORDER BY created_at ASC, id ASC",
            REPORT_COLUMNS
        ))
        .fetch_all(self.db.pool())
        .await?;

        let reports = rows
            .iter()
            .map(report_from_row)
            .collect::<Result<Vec<_>>>()?;
        let mut groups = report::group_reports(reports);
        report::sort_groups(&mut groups, order);

        let content_service = ContentService::new(self.db.clone());
        let mut views = Vec::with_capacity(groups.len());
        for group in groups {
            let content = content_service.summary(group.content()).await?;
            views.push(GroupView { group, content });
        }

        Ok(views)
    }

    /// One group by content key, `None` if nothing was ever reported.
    pub async fn get_group(&self, content: ContentRef) -> Result<Option<GroupView>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM reports \
             WHERE content_kind = $1::content_kind AND content_id = $2 \
             ORDER BY created_at ASC, id ASC",
            REPORT_COLUMNS
        ))
        .bind(content.kind.as_db())
        .bind(content.id)
        .fetch_all(self.db.pool())
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let reports = rows
            .iter()
            .map(report_from_row)
            .collect::<Result<Vec<_>>>()?;
        let group = report::group_reports(reports)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("grouping dropped a non-empty report set"))?;
        let content = ContentService::new(self.db.clone()).summary(content).await?;

        Ok(Some(GroupView { group, content }))
    }
}

pub(crate) const REPORT_COLUMNS: &str =
    "id, reporter_id, content_kind::text AS content_kind, content_id, \
     reason::text AS reason, description, status::text AS status, created_at";

pub(crate) fn report_from_row(row: &PgRow) -> Result<Report> {
    let kind: String = row.get("content_kind");
    let kind = crate::domain::content::ContentKind::from_db(&kind)
        .ok_or_else(|| anyhow!("unknown content kind: {}", kind))?;
    let reason: String = row.get("reason");
    let reason =
        ReportReason::from_db(&reason).ok_or_else(|| anyhow!("unknown report reason: {}", reason))?;
    let status: String = row.get("status");
    let status =
        ReportStatus::from_db(&status).ok_or_else(|| anyhow!("unknown report status: {}", status))?;

    Ok(Report {
        id: row.get("id"),
        reporter_id: row.get("reporter_id"),
        content_kind: kind,
        content_id: row.get("content_id"),
        reason,
        description: row.get("description"),
        status,
        created_at: row.get("created_at"),
    })
}
