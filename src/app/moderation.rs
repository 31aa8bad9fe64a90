//! Administrator actions against a report group: mark reviewed, dismiss,
//! apply a score penalty, or remove the content.
//!
//! Every write path is one transaction: guards run against rows locked
//! inside it, and the score/status update commits together with the bulk
//! report resolution. Notifications are enqueued only after commit and
//! never roll the action back.

use anyhow::Result;
use sqlx::{Postgres, Row, Transaction};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app::reports::{report_from_row, REPORT_COLUMNS};
use crate::domain::content::ContentRef;
use crate::domain::moderation::{
    AdminActor, DismissOutcome, ModerationError, PenaltyOutcome, RemovalOutcome, ReviewOutcome,
};
use crate::domain::report::Report;
use crate::domain::trust::{self, PenaltyLevel};
use crate::domain::user::AccountStatus;
use crate::infra::db::Db;
use crate::infra::notify::{NewNotification, NotificationQueue};

#[derive(Clone)]
pub struct ModerationService {
    db: Db,
    notifications: NotificationQueue,
    suspension_default_days: i64,
}

impl ModerationService {
    pub fn new(db: Db, notifications: NotificationQueue, suspension_default_days: i64) -> Self {
        Self {
            db,
            notifications,
            suspension_default_days,
        }
    }

    /// Move every pending report in the group to reviewed. Idempotent:
    /// a second pass finds no pending rows and changes nothing.
    pub async fn set_reviewed(
        &self,
        actor: AdminActor,
        content: ContentRef,
    ) -> Result<ReviewOutcome, ModerationError> {
        let mut tx = self.db.pool().begin().await?;
        self.load_open_group(&mut tx, content).await?;

        let result = sqlx::query(
            "UPDATE reports SET status = 'reviewed' \
             WHERE content_kind = $1::content_kind AND content_id = $2 AND status = 'pending'",
        )
        .bind(content.kind.as_db())
        .bind(content.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            admin_id = %actor.id,
            content = %content.key(),
            marked = result.rows_affected(),
            "report group marked reviewed"
        );

        Ok(ReviewOutcome {
            reports_marked: result.rows_affected(),
        })
    }

    /// Reject the group's open reports without penalizing anyone. The
    /// rejected status is terminal and independent of later actions.
    pub async fn dismiss(
        &self,
        actor: AdminActor,
        content: ContentRef,
    ) -> Result<DismissOutcome, ModerationError> {
        let mut tx = self.db.pool().begin().await?;
        let reports = self.load_open_group(&mut tx, content).await?;

        let result = sqlx::query(
            "UPDATE reports SET status = 'rejected' \
             WHERE content_kind = $1::content_kind AND content_id = $2 \
               AND status IN ('pending', 'reviewed')",
        )
        .bind(content.kind.as_db())
        .bind(content.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            admin_id = %actor.id,
            content = %content.key(),
            rejected = result.rows_affected(),
            "report group dismissed"
        );
        self.notifications.notify_many(reporter_notices(
            &reports,
            "moderation.report_dismissed",
            "Report reviewed",
            "Your report was reviewed. No action was taken against the content.",
        ));

        Ok(DismissOutcome {
            reports_rejected: result.rows_affected(),
        })
    }

    /// Deduct a fixed penalty from the content owner's score, recompute
    /// status from the ledger, and resolve the group's open reports, all
    /// in one transaction.
    pub async fn apply_penalty(
        &self,
        actor: AdminActor,
        content: ContentRef,
        penalty_level: u8,
    ) -> Result<PenaltyOutcome, ModerationError> {
        let penalty =
            PenaltyLevel::from_level(penalty_level).ok_or(ModerationError::InvalidPenaltyLevel)?;

        let mut tx = self.db.pool().begin().await?;
        let reports = self.load_open_group(&mut tx, content).await?;
        let owner_id = resolve_owner(&mut tx, content).await?;

        // Lock the owner row so concurrent penalties against the same user
        // serialize; the score read below is the one the write is based on.
        let row = sqlx::query(
            "SELECT score, status::text AS status, suspended_until \
             FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ModerationError::ContentNotFound)?;

        let previous_score: i32 = row.get("score");
        let status: String = row.get("status");
        let previous_status = AccountStatus::from_db(&status).ok_or_else(|| {
            ModerationError::Database(sqlx::Error::Decode(
                format!("unknown account status: {}", status).into(),
            ))
        })?;
        let suspended_until: Option<OffsetDateTime> = row.get("suspended_until");

        let new_score = trust::deduct(previous_score, penalty.points());
        let new_status = trust::status_for_score(new_score);
        let new_suspended_until = match new_status {
            // A penalty that drives the account into suspension stamps the
            // default window; one that lands on an already-suspended
            // account keeps the existing deadline.
            AccountStatus::Suspended => suspended_until.or_else(|| {
                Some(OffsetDateTime::now_utc() + Duration::days(self.suspension_default_days))
            }),
            AccountStatus::Active | AccountStatus::Banned => None,
        };

        sqlx::query(
            "UPDATE users \
             SET score = $2, status = $3::account_status, suspended_until = $4, \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(owner_id)
        .bind(new_score)
        .bind(new_status.as_db())
        .bind(new_suspended_until)
        .execute(&mut *tx)
        .await?;

        let resolved = resolve_open_reports(&mut tx, content).await?;
        tx.commit().await?;

        let outcome = PenaltyOutcome {
            owner_id,
            previous_score,
            new_score,
            penalty_points: penalty.points(),
            previous_status,
            new_status,
            status_changed: previous_status != new_status,
            reports_resolved: resolved,
        };

        tracing::warn!(
            admin_id = %actor.id,
            content = %content.key(),
            owner_id = %owner_id,
            penalty_level = penalty.level(),
            previous_score,
            new_score,
            previous_status = previous_status.as_db(),
            new_status = new_status.as_db(),
            "penalty applied"
        );

        let mut notices = vec![NewNotification {
            user_id: owner_id,
            kind: "moderation.penalty",
            title: "Content policy penalty".to_string(),
            message: format!(
                "Your content was found to violate our guidelines. {} points were \
                 deducted; your reputation score is now {}.",
                penalty.points(),
                new_score
            ),
            link: None,
        }];
        notices.extend(reporter_notices(
            &reports,
            "moderation.report_resolved",
            "Report resolved",
            "Thank you for your report. The content has been reviewed and action was taken.",
        ));
        self.notifications.notify_many(notices);

        Ok(outcome)
    }

    /// Resolve the group's open reports, then delete the content itself.
    /// Resolution precedes deletion so no surviving report row points at
    /// deleted content with a stale pending status.
    pub async fn remove_content(
        &self,
        actor: AdminActor,
        content: ContentRef,
    ) -> Result<RemovalOutcome, ModerationError> {
        let mut tx = self.db.pool().begin().await?;
        let reports = self.load_open_group(&mut tx, content).await?;
        let owner_id = resolve_owner(&mut tx, content).await?;

        let resolved = resolve_open_reports(&mut tx, content).await?;

        let deleted = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", content.kind.table()))
            .bind(content.id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            // Lost a race with another removal; roll everything back.
            return Err(ModerationError::ContentNotFound);
        }
        tx.commit().await?;

        tracing::warn!(
            admin_id = %actor.id,
            content = %content.key(),
            owner_id = %owner_id,
            reports_resolved = resolved,
            "reported content removed"
        );

        let mut notices = vec![NewNotification {
            user_id: owner_id,
            kind: "moderation.content_removed",
            title: "Content removed".to_string(),
            message: "Your content was removed for violating our guidelines.".to_string(),
            link: None,
        }];
        notices.extend(reporter_notices(
            &reports,
            "moderation.report_resolved",
            "Report resolved",
            "Thank you for your report. The content has been removed.",
        ));
        self.notifications.notify_many(notices);

        Ok(RemovalOutcome {
            owner_id,
            reports_resolved: resolved,
        })
    }

    /// Fetch the group inside the transaction and enforce the shared
    /// guards: it must exist and must still have at least one open report.
    async fn load_open_group(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        content: ContentRef,
    ) -> Result<Vec<Report>, ModerationError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM reports \
             WHERE content_kind = $1::content_kind AND content_id = $2 \
             ORDER BY created_at ASC, id ASC",
            REPORT_COLUMNS
        ))
        .bind(content.kind.as_db())
        .bind(content.id)
        .fetch_all(&mut **tx)
        .await?;

        if rows.is_empty() {
            return Err(ModerationError::GroupNotFound);
        }

        let reports = rows
            .iter()
            .map(report_from_row)
            .collect::<Result<Vec<_>>>()
            .map_err(|err| ModerationError::Database(sqlx::Error::Decode(err.into())))?;

        if reports.iter().all(|report| !report.status.is_open()) {
            return Err(ModerationError::GroupSettled);
        }

        Ok(reports)
    }
}

async fn resolve_owner(
    tx: &mut Transaction<'_, Postgres>,
    content: ContentRef,
) -> Result<Uuid, ModerationError> {
    let owner_id: Option<Uuid> = sqlx::query_scalar(&format!(
        "SELECT owner_id FROM {} WHERE id = $1",
        content.kind.table()
    ))
    .bind(content.id)
    .fetch_optional(&mut **tx)
    .await?;

    owner_id.ok_or(ModerationError::ContentNotFound)
}

async fn resolve_open_reports(
    tx: &mut Transaction<'_, Postgres>,
    content: ContentRef,
) -> Result<u64, ModerationError> {
    let result = sqlx::query(
        "UPDATE reports SET status = 'resolved' \
         WHERE content_kind = $1::content_kind AND content_id = $2 \
           AND status IN ('pending', 'reviewed')",
    )
    .bind(content.kind.as_db())
    .bind(content.id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// One acknowledgement per reporter whose report was still open when the
/// action ran. The unique (reporter, content) constraint guarantees
/// reporters within a group are distinct.
fn reporter_notices(
    reports: &[Report],
    kind: &'static str,
    title: &str,
    message: &str,
) -> Vec<NewNotification> {
    reports
        .iter()
        .filter(|report| report.status.is_open())
        .map(|report| NewNotification {
            user_id: report.reporter_id,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            link: None,
        })
        .collect()
}
