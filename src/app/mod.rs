pub mod accounts;
pub mod auth;
pub mod content;
pub mod moderation;
pub mod notifications;
pub mod reports;
