use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Note,
    Deck,
}

impl ContentKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "note" => Some(Self::Note),
            "deck" => Some(Self::Deck),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Deck => "deck",
        }
    }

    /// Table holding rows of this kind. Kinds live in separate tables but
    /// share one report namespace via (kind, id).
    pub fn table(&self) -> &'static str {
        match self {
            Self::Note => "notes",
            Self::Deck => "decks",
        }
    }
}

/// A polymorphic content reference, keyed in admin routes as
/// `{kind}-{id}`, e.g. `note-7d44…`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub id: Uuid,
}

impl ContentRef {
    pub fn new(kind: ContentKind, id: Uuid) -> Self {
        Self { kind, id }
    }

    pub fn parse_key(key: &str) -> Option<Self> {
        let (kind, id) = key.split_once('-')?;
        let kind = ContentKind::from_db(kind)?;
        let id = Uuid::parse_str(id).ok()?;
        Some(Self { kind, id })
    }

    pub fn key(&self) -> String {
        format!("{}-{}", self.kind.as_db(), self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub body: String,
    pub visibility: Visibility,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Deck {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// What an administrator sees about the target of a report group. `None`
/// at the aggregation layer when the content has since been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ContentSummary {
    pub kind: ContentKind,
    pub id: Uuid,
    pub owner_id: Uuid,
    pub owner_handle: String,
    pub title: String,
    pub visibility: Visibility,
}
