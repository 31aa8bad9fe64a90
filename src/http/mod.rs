use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{Admin, AuthUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::content())
        .merge(routes::reports())
        .merge(routes::notifications())
        .merge(routes::admin())
        .with_state(state)
}
