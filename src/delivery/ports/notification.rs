//! Notification port for telling administrators about courier check-ins.

use crate::delivery::domain::{PersonId, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for notification dispatch.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Outbound notification contract.
///
/// Dispatch is fire-and-forget from the caller's point of view: services log
/// failures and carry on.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    /// Tells the administrators that `courier_id` checked in `task_id`.
    async fn notify_admin(&self, task_id: TaskId, courier_id: PersonId) -> NotificationResult<()>;
}

/// Errors returned by notifier adapters.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// The notification channel is not reachable.
    #[error("notification channel unavailable: {0}")]
    Unavailable(String),

    /// The transport rejected the message.
    #[error("notification transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
