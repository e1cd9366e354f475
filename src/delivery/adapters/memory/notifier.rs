//! Recording implementation of the [`AdminNotifier`] port.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::delivery::{
    domain::{PersonId, TaskId},
    ports::{AdminNotifier, NotificationError, NotificationResult},
};

/// Notifier that keeps every dispatched check-in notification in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingAdminNotifier {
    sent: Arc<Mutex<Vec<(TaskId, PersonId)>>>,
}

impl RecordingAdminNotifier {
    /// Creates a notifier with no recorded notifications.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notifications sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<(TaskId, PersonId)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AdminNotifier for RecordingAdminNotifier {
    async fn notify_admin(&self, task_id: TaskId, courier_id: PersonId) -> NotificationResult<()> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|err| NotificationError::Unavailable(err.to_string()))?;
        sent.push((task_id, courier_id));
        Ok(())
    }
}
