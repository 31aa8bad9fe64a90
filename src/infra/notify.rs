//! Fire-and-forget notification queue.
//!
//! Moderation transactions never write inbox rows themselves; they enqueue
//! after commit and move on. A dispatcher task (`jobs::notifier`) drains the
//! channel and persists the rows, logging failures without retry. The
//! channel is unbounded so a slow dispatcher never applies backpressure to
//! a request handler.

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

#[derive(Clone)]
pub struct NotificationQueue {
    tx: UnboundedSender<Vec<NewNotification>>,
}

impl NotificationQueue {
    pub fn new() -> (Self, UnboundedReceiver<Vec<NewNotification>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify(&self, notification: NewNotification) {
        self.notify_many(vec![notification]);
    }

    pub fn notify_many(&self, batch: Vec<NewNotification>) {
        if batch.is_empty() {
            return;
        }
        let count = batch.len();
        if self.tx.send(batch).is_err() {
            // Dispatcher is gone (shutdown); the moderation decision itself
            // is already durable, so only the notice is lost.
            warn!(count, "notification dispatcher unavailable, dropping batch");
        }
    }
}
