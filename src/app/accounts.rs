//! Account standing: admin ban/suspend/activate and the lazy
//! reconcile-on-access pass that expires suspensions and grants score
//! recovery.

use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::moderation::{AdminActor, ModerationError};
use crate::domain::trust;
use crate::domain::user::{AccountStatus, User, UserRole};
use crate::infra::db::Db;
use crate::infra::notify::{NewNotification, NotificationQueue};

pub(crate) const USER_COLUMNS: &str =
    "id, handle, email, password_hash, role::text AS role, score, status::text AS status, \
     suspended_until, created_at, updated_at";

pub(crate) fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.get("role");
    let role = UserRole::from_db(&role).ok_or_else(|| anyhow!("unknown user role: {}", role))?;
    let status: String = row.get("status");
    let status = AccountStatus::from_db(&status)
        .ok_or_else(|| anyhow!("unknown account status: {}", status))?;

    Ok(User {
        id: row.get("id"),
        handle: row.get("handle"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role,
        score: row.get("score"),
        status,
        suspended_until: row.get("suspended_until"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[derive(Clone)]
pub struct AccountService {
    db: Db,
    notifications: NotificationQueue,
    suspension_default_days: i64,
}

impl AccountService {
    pub fn new(db: Db, notifications: NotificationQueue, suspension_default_days: i64) -> Self {
        Self {
            db,
            notifications,
            suspension_default_days,
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Lazy time-based reconciliation, run on every session validation:
    /// expire a lapsed suspension, then grant score recovery for clean
    /// active time. Returns the user as reconciled, `None` if the row is
    /// gone. The row is locked for the duration so concurrent reconciles
    /// and penalties serialize instead of losing updates.
    pub async fn reconcile_on_access(&self, user_id: Uuid) -> Result<Option<User>> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let mut user = user_from_row(&row)?;

        let now = OffsetDateTime::now_utc();
        match user.status {
            AccountStatus::Suspended => {
                let lapsed = user
                    .suspended_until
                    .map(|until| until <= now)
                    // A suspended row without a deadline is malformed;
                    // reconcile it back to active rather than strand it.
                    .unwrap_or(true);
                if lapsed {
                    let row = sqlx::query(&format!(
                        "UPDATE users \
                         SET status = 'active', suspended_until = NULL, updated_at = now() \
                         WHERE id = $1 \
                         RETURNING {}",
                        USER_COLUMNS
                    ))
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;
                    user = user_from_row(&row)?;
                    tracing::info!(user_id = %user_id, "suspension lapsed, account reactivated");
                }
            }
            AccountStatus::Active if user.score < trust::MAX_SCORE => {
                let days_since_update = (now - user.updated_at).whole_days();
                let points = trust::recovery_points(days_since_update);
                if points > 0 && !self.has_pending_reports(&mut tx, user_id).await? {
                    let new_score = trust::restore(user.score, points);
                    let row = sqlx::query(&format!(
                        "UPDATE users SET score = $2, updated_at = now() \
                         WHERE id = $1 \
                         RETURNING {}",
                        USER_COLUMNS
                    ))
                    .bind(user_id)
                    .bind(new_score)
                    .fetch_one(&mut *tx)
                    .await?;
                    let previous_score = user.score;
                    user = user_from_row(&row)?;
                    tracing::info!(
                        user_id = %user_id,
                        previous_score,
                        new_score,
                        points,
                        "score recovery granted"
                    );
                }
            }
            _ => {}
        }

        tx.commit().await?;
        Ok(Some(user))
    }

    /// Any pending report against content this user owns blocks recovery.
    async fn has_pending_reports(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports r \
             WHERE r.status = 'pending' \
               AND ((r.content_kind = 'note' \
                     AND r.content_id IN (SELECT id FROM notes WHERE owner_id = $1)) \
                 OR (r.content_kind = 'deck' \
                     AND r.content_id IN (SELECT id FROM decks WHERE owner_id = $1)))",
        )
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(count > 0)
    }

    /// Direct moderation override: sets status without touching score.
    pub async fn ban(
        &self,
        actor: AdminActor,
        target_id: Uuid,
        reason: Option<String>,
    ) -> Result<User, ModerationError> {
        let mut tx = self.db.pool().begin().await?;
        let target = self.lock_target(&mut tx, actor, target_id).await?;

        if target.status == AccountStatus::Banned {
            return Err(ModerationError::AlreadyBanned);
        }

        let row = sqlx::query(&format!(
            "UPDATE users \
             SET status = 'banned', suspended_until = NULL, updated_at = now() \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;
        let user = user_from_row(&row).map_err(into_db_error)?;
        tx.commit().await?;

        tracing::warn!(
            admin_id = %actor.id,
            user_id = %target_id,
            previous_status = target.status.as_db(),
            reason = reason.as_deref().unwrap_or(""),
            "account banned by administrator"
        );
        self.notifications.notify(NewNotification {
            user_id: target_id,
            kind: "account.banned",
            title: "Account banned".to_string(),
            message: match reason {
                Some(reason) => format!("Your account has been banned. Reason: {}", reason),
                None => "Your account has been banned.".to_string(),
            },
            link: None,
        });

        Ok(user)
    }

    pub async fn suspend(
        &self,
        actor: AdminActor,
        target_id: Uuid,
        days: Option<i64>,
        reason: Option<String>,
    ) -> Result<User, ModerationError> {
        let days = days.unwrap_or(self.suspension_default_days);
        if days <= 0 {
            return Err(ModerationError::InvalidDuration);
        }

        let mut tx = self.db.pool().begin().await?;
        let target = self.lock_target(&mut tx, actor, target_id).await?;

        match target.status {
            AccountStatus::Banned => return Err(ModerationError::MustActivateFirst),
            AccountStatus::Suspended => return Err(ModerationError::AlreadySuspended),
            AccountStatus::Active => {}
        }

        let until = OffsetDateTime::now_utc() + Duration::days(days);
        let row = sqlx::query(&format!(
            "UPDATE users \
             SET status = 'suspended', suspended_until = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(target_id)
        .bind(until)
        .fetch_one(&mut *tx)
        .await?;
        let user = user_from_row(&row).map_err(into_db_error)?;
        tx.commit().await?;

        tracing::warn!(
            admin_id = %actor.id,
            user_id = %target_id,
            days,
            reason = reason.as_deref().unwrap_or(""),
            "account suspended by administrator"
        );
        self.notifications.notify(NewNotification {
            user_id: target_id,
            kind: "account.suspended",
            title: "Account suspended".to_string(),
            message: match reason {
                Some(reason) => format!(
                    "Your account has been suspended for {} days. Reason: {}",
                    days, reason
                ),
                None => format!("Your account has been suspended for {} days.", days),
            },
            link: None,
        });

        Ok(user)
    }

    pub async fn activate(
        &self,
        actor: AdminActor,
        target_id: Uuid,
    ) -> Result<User, ModerationError> {
        let mut tx = self.db.pool().begin().await?;
        let target = self.lock_target(&mut tx, actor, target_id).await?;

        let row = sqlx::query(&format!(
            "UPDATE users \
             SET status = 'active', suspended_until = NULL, updated_at = now() \
             WHERE id = $1 \
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;
        let user = user_from_row(&row).map_err(into_db_error)?;
        tx.commit().await?;

        tracing::info!(
            admin_id = %actor.id,
            user_id = %target_id,
            previous_status = target.status.as_db(),
            "account activated by administrator"
        );
        self.notifications.notify(NewNotification {
            user_id: target_id,
            kind: "account.activated",
            title: "Account reactivated".to_string(),
            message: "Your account has been reactivated.".to_string(),
            link: None,
        });

        Ok(user)
    }

    /// Shared guards for manual transitions: target exists, is not the
    /// acting admin, and is not an admin account.
    async fn lock_target(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        actor: AdminActor,
        target_id: Uuid,
    ) -> Result<User, ModerationError> {
        if actor.id == target_id {
            return Err(ModerationError::SelfAction);
        }

        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(target_id)
        .fetch_optional(&mut **tx)
        .await?;

        let row = row.ok_or(ModerationError::UserNotFound)?;
        let target = user_from_row(&row).map_err(into_db_error)?;
        if target.role.is_admin() {
            return Err(ModerationError::TargetIsAdmin);
        }

        Ok(target)
    }
}

// Row decoding failures surface through the Database variant; they are
// storage corruption, not guard violations.
fn into_db_error(err: anyhow::Error) -> ModerationError {
    ModerationError::Database(sqlx::Error::Decode(err.into()))
}
