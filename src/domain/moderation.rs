//! Moderation outcomes and the error taxonomy admin endpoints surface.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::user::AccountStatus;

/// Proof that the caller passed the admin gate. Constructed only by the
/// admin extractor; every moderation operation takes one explicitly
/// instead of reading an ambient session.
#[derive(Debug, Clone, Copy)]
pub struct AdminActor {
    pub id: Uuid,
}

/// Why a moderation operation was refused. Each variant maps to one
/// stable machine-checkable `code` in the HTTP error body.
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("cannot act on your own account")]
    SelfAction,
    #[error("cannot act on an administrator account")]
    TargetIsAdmin,
    #[error("user is already banned")]
    AlreadyBanned,
    #[error("user is already suspended")]
    AlreadySuspended,
    #[error("user is banned and must be activated first")]
    MustActivateFirst,
    #[error("all reports for this content are already settled")]
    GroupSettled,
    #[error("invalid penalty level, expected 1, 2 or 3")]
    InvalidPenaltyLevel,
    #[error("suspension duration must be a positive number of days")]
    InvalidDuration,
    #[error("no reports found for this content")]
    GroupNotFound,
    #[error("content or its owner no longer exists")]
    ContentNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ModerationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SelfAction => "self_action",
            Self::TargetIsAdmin => "target_is_admin",
            Self::AlreadyBanned => "already_banned",
            Self::AlreadySuspended => "already_suspended",
            Self::MustActivateFirst => "must_activate_first",
            Self::GroupSettled => "group_settled",
            Self::InvalidPenaltyLevel => "invalid_penalty_level",
            Self::InvalidDuration => "invalid_duration",
            Self::GroupNotFound => "group_not_found",
            Self::ContentNotFound => "content_not_found",
            Self::UserNotFound => "user_not_found",
            Self::Database(_) => "internal",
        }
    }
}

/// Result of a penalty, returned so the client never needs a follow-up
/// read to confirm the effect.
#[derive(Debug, Clone, Serialize)]
pub struct PenaltyOutcome {
    pub owner_id: Uuid,
    pub previous_score: i32,
    pub new_score: i32,
    pub penalty_points: i32,
    pub previous_status: AccountStatus,
    pub new_status: AccountStatus,
    pub status_changed: bool,
    pub reports_resolved: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovalOutcome {
    pub owner_id: Uuid,
    pub reports_resolved: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub reports_marked: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DismissOutcome {
    pub reports_rejected: u64,
}
