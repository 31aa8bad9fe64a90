pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use crate::infra::{db::Db, notify::NotificationQueue};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub notifications: NotificationQueue,
    pub session_ttl_hours: u64,
    pub suspension_default_days: i64,
}
