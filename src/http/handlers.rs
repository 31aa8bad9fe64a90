use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::accounts::AccountService;
use crate::app::auth::AuthService;
use crate::app::content::ContentService;
use crate::app::moderation::ModerationService;
use crate::app::notifications::NotificationService;
use crate::app::reports::{GroupView, ReportService, SubmitOutcome};
use crate::domain::content::{ContentRef, Visibility};
use crate::domain::moderation::ModerationError;
use crate::domain::notification::Notification;
use crate::domain::report::{ReportReason, SortOrder, MAX_DESCRIPTION_LEN};
use crate::domain::user::{AccountStatus, User};
use crate::http::{Admin, AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.is_healthy().await {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

const MAX_PASSWORD_LEN: usize = 128;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub handle: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub handle: String,
    pub email: String,
    pub role: &'static str,
    pub score: i32,
    pub status: &'static str,
    #[serde(with = "time::serde::rfc3339::option")]
    pub suspended_until: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserResponse {
    fn from_user(user: User) -> Self {
        Self {
            id: user.id,
            handle: user.handle,
            email: user.email,
            role: user.role.as_db(),
            score: user.score,
            status: user.status.as_db(),
            suspended_until: user.suspended_until,
            created_at: user.created_at,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let handle = payload.handle.trim().to_string();
    let email = payload.email.trim().to_string();
    if handle.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request(
            "handle, email and password are required",
        ));
    }
    if handle.len() > 64 {
        return Err(AppError::bad_request("handle must be at most 64 characters"));
    }
    if payload.password.len() < 8 {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    let user = service
        .register(handle, email, payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to register");
            AppError::internal("failed to register")
        })?;

    match user {
        Some(user) => Ok((StatusCode::CREATED, Json(UserResponse::from_user(user)))),
        None => Err(AppError::conflict("handle or email already taken")),
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    if payload.identifier.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("identifier and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    let session = service
        .login(&payload.identifier, &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match session {
        Some(session) => Ok(Json(SessionResponse {
            token: session.token,
            expires_at: session.expires_at,
        })),
        None => Err(AppError::unauthorized("invalid credentials")),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    service.logout(token).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to logout");
        AppError::internal("failed to logout")
    })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let service = AuthService::new(state.db.clone(), state.session_ttl_hours);
    let user = service
        .get_current_user(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load current user");
            AppError::internal("failed to load current user")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(UserResponse::from_user(user)))
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub visibility: Option<Visibility>,
}

pub async fn create_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<crate::domain::content::Note>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let service = ContentService::new(state.db.clone());
    let note = service
        .create_note(
            auth.user_id,
            payload.title,
            payload.body,
            payload.visibility.unwrap_or(Visibility::Public),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create note");
            AppError::internal("failed to create note")
        })?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(note_id): Path<Uuid>,
) -> Result<Json<crate::domain::content::Note>, AppError> {
    let service = ContentService::new(state.db.clone());
    let note = service
        .get_note(note_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load note");
            AppError::internal("failed to load note")
        })?
        .ok_or_else(|| AppError::not_found("note not found"))?;

    if note.visibility == Visibility::Private && note.owner_id != auth.user_id {
        return Err(AppError::not_found("note not found"));
    }

    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(note_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = ContentService::new(state.db.clone());
    let deleted = service
        .delete_note(auth.user_id, note_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to delete note");
            AppError::internal("failed to delete note")
        })?;

    if !deleted {
        return Err(AppError::not_found("note not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct CreateDeckRequest {
    pub title: String,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

pub async fn create_deck(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateDeckRequest>,
) -> Result<(StatusCode, Json<crate::domain::content::Deck>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let service = ContentService::new(state.db.clone());
    let deck = service
        .create_deck(
            auth.user_id,
            payload.title,
            payload.description,
            payload.visibility.unwrap_or(Visibility::Public),
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create deck");
            AppError::internal("failed to create deck")
        })?;

    Ok((StatusCode::CREATED, Json(deck)))
}

pub async fn get_deck(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(deck_id): Path<Uuid>,
) -> Result<Json<crate::domain::content::Deck>, AppError> {
    let service = ContentService::new(state.db.clone());
    let deck = service
        .get_deck(deck_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load deck");
            AppError::internal("failed to load deck")
        })?
        .ok_or_else(|| AppError::not_found("deck not found"))?;

    if deck.visibility == Visibility::Private && deck.owner_id != auth.user_id {
        return Err(AppError::not_found("deck not found"));
    }

    Ok(Json(deck))
}

pub async fn delete_deck(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(deck_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = ContentService::new(state.db.clone());
    let deleted = service
        .delete_deck(auth.user_id, deck_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to delete deck");
            AppError::internal("failed to delete deck")
        })?;

    if !deleted {
        return Err(AppError::not_found("deck not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SubmitReportRequest {
    pub content_kind: crate::domain::content::ContentKind,
    pub content_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct SubmitReportResponse {
    pub reported: bool,
}

pub async fn submit_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SubmitReportRequest>,
) -> Result<Json<SubmitReportResponse>, AppError> {
    if let Some(description) = &payload.description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::bad_request(
                "description must be at most 1000 characters",
            ));
        }
    }

    let service = ReportService::new(state.db.clone());
    let outcome = service
        .submit(
            auth.user_id,
            ContentRef::new(payload.content_kind, payload.content_id),
            payload.reason,
            payload.description,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to submit report");
            AppError::internal("failed to submit report")
        })?;

    match outcome {
        SubmitOutcome::Reported => Ok(Json(SubmitReportResponse { reported: true })),
        SubmitOutcome::Withdrawn => Ok(Json(SubmitReportResponse { reported: false })),
        SubmitOutcome::ContentNotFound => Err(AppError::not_found("content not found")),
        SubmitOutcome::NotReportable => {
            Err(AppError::bad_request("private content cannot be reported")
                .with_code("not_reportable"))
        }
        SubmitOutcome::OwnContent => {
            Err(AppError::bad_request("cannot report your own content").with_code("own_content"))
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Notification>>, AppError> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let cursor = parse_cursor(query.cursor)?;

    let service = NotificationService::new(state.db.clone());
    let page = service
        .list(auth.user_id, cursor, limit)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list notifications");
            AppError::internal("failed to list notifications")
        })?;

    Ok(Json(ListResponse {
        items: page.items,
        next_cursor: encode_cursor(page.next),
    }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = NotificationService::new(state.db.clone());
    let marked = service
        .mark_read(notification_id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to mark notification read");
            AppError::internal("failed to mark notification read")
        })?;

    if !marked {
        return Err(AppError::not_found("notification not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Admin: report triage
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ReportListQuery {
    pub order: Option<SortOrder>,
}

#[derive(Serialize)]
pub struct ReportGroupListResponse {
    pub groups: Vec<GroupView>,
}

pub async fn list_report_groups(
    State(state): State<AppState>,
    Admin(_): Admin,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<ReportGroupListResponse>, AppError> {
    let service = ReportService::new(state.db.clone());
    let groups = service
        .list_groups(query.order.unwrap_or_default())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list report groups");
            AppError::internal("failed to list report groups")
        })?;

    Ok(Json(ReportGroupListResponse { groups }))
}

fn parse_content_key(key: &str) -> Result<ContentRef, AppError> {
    ContentRef::parse_key(key).ok_or_else(|| {
        AppError::bad_request("invalid content key, expected {kind}-{id}")
            .with_code("invalid_content_key")
    })
}

pub async fn get_report_group(
    State(state): State<AppState>,
    Admin(_): Admin,
    Path(key): Path<String>,
) -> Result<Json<GroupView>, AppError> {
    let content = parse_content_key(&key)?;
    let service = ReportService::new(state.db.clone());
    let group = service
        .get_group(content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load report group");
            AppError::internal("failed to load report group")
        })?
        .ok_or_else(|| {
            AppError::not_found("no reports found for this content").with_code("group_not_found")
        })?;

    Ok(Json(group))
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    SetReviewed,
    ReduceScore,
    DeleteContent,
}

#[derive(Deserialize)]
pub struct ReportActionRequest {
    pub action: ReportAction,
    pub penalty_level: Option<u8>,
}

#[derive(Serialize)]
pub struct ReportActionResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<crate::domain::moderation::PenaltyOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal: Option<crate::domain::moderation::RemovalOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_marked: Option<u64>,
}

pub async fn report_group_action(
    State(state): State<AppState>,
    Admin(actor): Admin,
    Path(key): Path<String>,
    Json(payload): Json<ReportActionRequest>,
) -> Result<Json<ReportActionResponse>, AppError> {
    let content = parse_content_key(&key)?;
    let service = ModerationService::new(
        state.db.clone(),
        state.notifications.clone(),
        state.suspension_default_days,
    );

    match payload.action {
        ReportAction::SetReviewed => {
            let outcome = service.set_reviewed(actor, content).await?;
            Ok(Json(ReportActionResponse {
                message: format!("{} report(s) marked reviewed", outcome.reports_marked),
                penalty: None,
                removal: None,
                reports_marked: Some(outcome.reports_marked),
            }))
        }
        ReportAction::ReduceScore => {
            let level = payload
                .penalty_level
                .ok_or(ModerationError::InvalidPenaltyLevel)?;
            let outcome = service.apply_penalty(actor, content, level).await?;
            Ok(Json(ReportActionResponse {
                message: format!(
                    "penalty applied: score {} -> {}, {} report(s) resolved",
                    outcome.previous_score, outcome.new_score, outcome.reports_resolved
                ),
                penalty: Some(outcome),
                removal: None,
                reports_marked: None,
            }))
        }
        ReportAction::DeleteContent => {
            let outcome = service.remove_content(actor, content).await?;
            Ok(Json(ReportActionResponse {
                message: format!(
                    "content removed, {} report(s) resolved",
                    outcome.reports_resolved
                ),
                penalty: None,
                removal: Some(outcome),
                reports_marked: None,
            }))
        }
    }
}

#[derive(Serialize)]
pub struct DismissResponse {
    pub message: String,
    pub reports_rejected: u64,
}

pub async fn dismiss_report_group(
    State(state): State<AppState>,
    Admin(actor): Admin,
    Path(key): Path<String>,
) -> Result<Json<DismissResponse>, AppError> {
    let content = parse_content_key(&key)?;
    let service = ModerationService::new(
        state.db.clone(),
        state.notifications.clone(),
        state.suspension_default_days,
    );
    let outcome = service.dismiss(actor, content).await?;

    Ok(Json(DismissResponse {
        message: format!("{} report(s) rejected", outcome.reports_rejected),
        reports_rejected: outcome.reports_rejected,
    }))
}

// ---------------------------------------------------------------------------
// Admin: user standing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Ban,
    Suspend,
    Activate,
}

#[derive(Deserialize)]
pub struct UserActionRequest {
    pub action: UserAction,
    pub reason: Option<String>,
    pub duration: Option<i64>,
}

#[derive(Serialize)]
pub struct UserActionResponse {
    pub message: String,
    pub user: UserResponse,
}

pub async fn admin_user_action(
    State(state): State<AppState>,
    Admin(actor): Admin,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UserActionRequest>,
) -> Result<Json<UserActionResponse>, AppError> {
    let service = AccountService::new(
        state.db.clone(),
        state.notifications.clone(),
        state.suspension_default_days,
    );

    let (message, user) = match payload.action {
        UserAction::Ban => {
            let user = service.ban(actor, user_id, payload.reason).await?;
            ("user banned".to_string(), user)
        }
        UserAction::Suspend => {
            let user = service
                .suspend(actor, user_id, payload.duration, payload.reason)
                .await?;
            let until = user
                .suspended_until
                .and_then(|until| until.format(&Rfc3339).ok())
                .unwrap_or_default();
            (format!("user suspended until {}", until), user)
        }
        UserAction::Activate => {
            let user = service.activate(actor, user_id).await?;
            ("user activated".to_string(), user)
        }
    };

    debug_assert!(user.status != AccountStatus::Suspended || user.suspended_until.is_some());

    Ok(Json(UserActionResponse {
        message,
        user: UserResponse::from_user(user),
    }))
}
