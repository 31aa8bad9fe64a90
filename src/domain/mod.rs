pub mod content;
pub mod moderation;
pub mod notification;
pub mod report;
pub mod trust;
pub mod user;
