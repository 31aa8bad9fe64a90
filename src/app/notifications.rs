//! Read side of the notification inbox the moderation pipeline writes into.

use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::notification::Notification;
use crate::infra::db::Db;

/// Keyset position within a user's inbox, newest first.
pub type InboxCursor = (OffsetDateTime, Uuid);

/// One page of a user's inbox. `next` is set only when the page was full,
/// so a `None` tells the client it has reached the end.
pub struct InboxPage {
    pub items: Vec<Notification>,
    pub next: Option<InboxCursor>,
}

#[derive(Clone)]
pub struct NotificationService {
    db: Db,
}

impl NotificationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        cursor: Option<InboxCursor>,
        limit: i64,
    ) -> Result<InboxPage> {
        // Row-value comparison keeps rows sharing a timestamp in a stable
        // order across pages; a null cursor disables the predicate.
        let rows = sqlx::query(
            "SELECT id, user_id, kind, title, message, link, read_at, created_at \
             FROM notifications \
             WHERE user_id = $1 \
               AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3)) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $4",
        )
        .bind(user_id)
        .bind(cursor.map(|(created_at, _)| created_at))
        .bind(cursor.map(|(_, id)| id))
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        let items: Vec<Notification> = rows
            .into_iter()
            .map(|row| Notification {
                id: row.get("id"),
                user_id: row.get("user_id"),
                kind: row.get("kind"),
                title: row.get("title"),
                message: row.get("message"),
                link: row.get("link"),
                read_at: row.get("read_at"),
                created_at: row.get("created_at"),
            })
            .collect();

        let next = if items.len() as i64 == limit {
            items.last().map(|n| (n.created_at, n.id))
        } else {
            None
        };

        Ok(InboxPage { items, next })
    }

    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET read_at = now() \
             WHERE id = $1 AND user_id = $2 AND read_at IS NULL",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
