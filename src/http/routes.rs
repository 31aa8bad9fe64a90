use axum::{routing::delete, routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn content() -> Router<AppState> {
    Router::new()
        .route("/notes", post(handlers::create_note))
        .route("/notes/:id", get(handlers::get_note))
        .route("/notes/:id", delete(handlers::delete_note))
        .route("/decks", post(handlers::create_deck))
        .route("/decks/:id", get(handlers::get_deck))
        .route("/decks/:id", delete(handlers::delete_deck))
}

pub fn reports() -> Router<AppState> {
    Router::new().route("/reports", post(handlers::submit_report))
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/reports", get(handlers::list_report_groups))
        .route("/admin/reports/:key", get(handlers::get_report_group))
        .route(
            "/admin/reports/:key/action",
            post(handlers::report_group_action),
        )
        .route(
            "/admin/reports/:key/dismiss",
            post(handlers::dismiss_report_group),
        )
        .route("/admin/users/:id/action", post(handlers::admin_user_action))
}
