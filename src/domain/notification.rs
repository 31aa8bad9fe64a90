use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// A persisted inbox row. Delivery to the end user is out of scope; a row
/// existing means the moderation event was recorded.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
