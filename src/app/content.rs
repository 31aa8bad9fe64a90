//! Minimal note/deck storage: enough surface for content to exist, be
//! reported, have its owner resolved, and be removed by moderation.

use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::content::{ContentRef, ContentSummary, Deck, Note, Visibility};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ContentService {
    db: Db,
}

impl ContentService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_note(
        &self,
        owner_id: Uuid,
        title: String,
        body: String,
        visibility: Visibility,
    ) -> Result<Note> {
        let row = sqlx::query(
            "INSERT INTO notes (owner_id, title, body, visibility) \
             VALUES ($1, $2, $3, $4::content_visibility) \
             RETURNING id, owner_id, title, body, visibility::text AS visibility, created_at",
        )
        .bind(owner_id)
        .bind(title)
        .bind(body)
        .bind(visibility.as_db())
        .fetch_one(self.db.pool())
        .await?;

        note_from_row(&row)
    }

    pub async fn get_note(&self, note_id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, body, visibility::text AS visibility, created_at \
             FROM notes WHERE id = $1",
        )
        .bind(note_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(note_from_row).transpose()
    }

    pub async fn delete_note(&self, owner_id: Uuid, note_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND owner_id = $2")
            .bind(note_id)
            .bind(owner_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn create_deck(
        &self,
        owner_id: Uuid,
        title: String,
        description: Option<String>,
        visibility: Visibility,
    ) -> Result<Deck> {
        let row = sqlx::query(
            "INSERT INTO decks (owner_id, title, description, visibility) \
             VALUES ($1, $2, $3, $4::content_visibility) \
             RETURNING id, owner_id, title, description, visibility::text AS visibility, created_at",
        )
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(visibility.as_db())
        .fetch_one(self.db.pool())
        .await?;

        deck_from_row(&row)
    }

    pub async fn get_deck(&self, deck_id: Uuid) -> Result<Option<Deck>> {
        let row = sqlx::query(
            "SELECT id, owner_id, title, description, visibility::text AS visibility, created_at \
             FROM decks WHERE id = $1",
        )
        .bind(deck_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(deck_from_row).transpose()
    }

    pub async fn delete_deck(&self, owner_id: Uuid, deck_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM decks WHERE id = $1 AND owner_id = $2")
            .bind(deck_id)
            .bind(owner_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Owner and visibility of a content item, `None` if it is gone.
    /// The report toggle uses this to gate on reportability.
    pub async fn resolve(&self, content: ContentRef) -> Result<Option<(Uuid, Visibility)>> {
        let row = sqlx::query(&format!(
            "SELECT owner_id, visibility::text AS visibility FROM {} WHERE id = $1",
            content.kind.table()
        ))
        .bind(content.id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| {
            let visibility: String = row.get("visibility");
            let visibility = Visibility::from_db(&visibility)
                .ok_or_else(|| anyhow!("unknown content visibility: {}", visibility))?;
            Ok((row.get("owner_id"), visibility))
        })
        .transpose()
    }

    /// Admin-facing view of a report group's target, `None` once deleted.
    pub async fn summary(&self, content: ContentRef) -> Result<Option<ContentSummary>> {
        let row = sqlx::query(&format!(
            "SELECT c.id, c.owner_id, c.title, c.visibility::text AS visibility, \
                    u.handle AS owner_handle \
             FROM {} c JOIN users u ON c.owner_id = u.id \
             WHERE c.id = $1",
            content.kind.table()
        ))
        .bind(content.id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| {
            let visibility: String = row.get("visibility");
            let visibility = Visibility::from_db(&visibility)
                .ok_or_else(|| anyhow!("unknown content visibility: {}", visibility))?;
            Ok(ContentSummary {
                kind: content.kind,
                id: row.get("id"),
                owner_id: row.get("owner_id"),
                owner_handle: row.get("owner_handle"),
                title: row.get("title"),
                visibility,
            })
        })
        .transpose()
    }
}

fn note_from_row(row: &PgRow) -> Result<Note> {
    let visibility: String = row.get("visibility");
    let visibility = Visibility::from_db(&visibility)
        .ok_or_else(|| anyhow!("unknown content visibility: {}", visibility))?;
    Ok(Note {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        body: row.get("body"),
        visibility,
        created_at: row.get("created_at"),
    })
}

fn deck_from_row(row: &PgRow) -> Result<Deck> {
    let visibility: String = row.get("visibility");
    let visibility = Visibility::from_db(&visibility)
        .ok_or_else(|| anyhow!("unknown content visibility: {}", visibility))?;
    Ok(Deck {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        description: row.get("description"),
        visibility,
        created_at: row.get("created_at"),
    })
}
