//! Notification dispatcher: drains the in-process queue and persists
//! inbox rows. Failures are logged and the batch is dropped; moderation
//! decisions are committed before anything reaches this task, so a lost
//! notice never implies a lost decision.

use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::infra::db::Db;
use crate::infra::notify::NewNotification;

pub async fn run(db: Db, mut rx: UnboundedReceiver<Vec<NewNotification>>) -> Result<()> {
    info!("notification dispatcher started");
    while let Some(batch) = rx.recv().await {
        if let Err(err) = deliver(&db, &batch).await {
            warn!(error = ?err, count = batch.len(), "failed to persist notifications");
        }
    }
    info!("notification dispatcher stopped");
    Ok(())
}

/// Insert one inbox row per notification. Split out of `run` so tests can
/// drain a queue deterministically.
pub async fn deliver(db: &Db, batch: &[NewNotification]) -> Result<()> {
    for notification in batch {
        sqlx::query(
            "INSERT INTO notifications (user_id, kind, title, message, link) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(notification.user_id)
        .bind(notification.kind)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.link)
        .execute(db.pool())
        .await?;
    }
    debug!(count = batch.len(), "notifications persisted");
    Ok(())
}
