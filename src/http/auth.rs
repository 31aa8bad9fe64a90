//! Session extractors. `AuthUser` is where lazy reconciliation hangs:
//! every authenticated request first expires a lapsed suspension and
//! grants due score recovery, then gates on the reconciled status.
//! `Admin` layers the role check on top and is the only constructor of
//! `AdminActor`.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::accounts::AccountService;
use crate::app::auth::AuthService;
use crate::domain::moderation::AdminActor;
use crate::domain::user::{AccountStatus, UserRole};
use crate::http::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub role: UserRole,
}

#[derive(Debug, Clone, Copy)]
pub struct Admin(pub AdminActor);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let auth = AuthService::new(state.db.clone(), state.session_ttl_hours);
        let session = auth.authenticate(token).await.map_err(|err| {
            tracing::error!(error = ?err, "failed to authenticate");
            AppError::internal("failed to authenticate")
        })?;
        let session = session.ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;

        let accounts = AccountService::new(
            state.db.clone(),
            state.notifications.clone(),
            state.suspension_default_days,
        );
        let user = accounts
            .reconcile_on_access(session.user_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to reconcile account standing");
                AppError::internal("failed to authenticate")
            })?
            .ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;

        match user.status {
            AccountStatus::Active => Ok(AuthUser {
                user_id: user.id,
                role: user.role,
            }),
            AccountStatus::Banned => {
                Err(AppError::forbidden("your account has been banned")
                    .with_code("account_banned"))
            }
            AccountStatus::Suspended => {
                Err(AppError::forbidden("your account is suspended")
                    .with_code("account_suspended"))
            }
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(
                AppError::forbidden("administrator access required").with_code("admin_required")
            );
        }

        Ok(Admin(AdminActor { id: user.user_id }))
    }
}
