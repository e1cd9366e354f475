//! Business rule tables consumed by the command services.

use crate::delivery::domain::{ParcelStatus, TaskStatus};

/// Predicates deciding which status changes callers may request.
pub trait StatusRules: Send + Sync {
    /// Returns `true` when a courier may move an item from `from` to `to`.
    fn courier_may_transition(&self, from: ParcelStatus, to: ParcelStatus) -> bool;

    /// Returns `true` when an administrator may set a task to `status`
    /// directly.
    fn admin_may_set(&self, status: TaskStatus) -> bool;
}

/// Configuration for the status rule tables.
///
/// # Examples
///
/// ```
/// use courier_dispatch::delivery::domain::{ParcelStatus, TaskStatus};
/// use courier_dispatch::delivery::ports::StatusRulesConfig;
///
/// let config = StatusRulesConfig::default();
/// assert!(config.allows_transition(ParcelStatus::PickingUp, ParcelStatus::PickedUp));
/// assert!(!config.allows_transition(ParcelStatus::Delivered, ParcelStatus::PickedUp));
///
/// let strict = StatusRulesConfig::without_admin_overrides();
/// assert!(!strict.admin_updatable.contains(&TaskStatus::Completed));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRulesConfig {
    /// Item transitions a courier may report, as `(from, to)` pairs.
    pub courier_transitions: Vec<(ParcelStatus, ParcelStatus)>,
    /// Task statuses an administrator may set directly.
    pub admin_updatable: Vec<TaskStatus>,
}

impl Default for StatusRulesConfig {
    fn default() -> Self {
        Self {
            courier_transitions: vec![
                (ParcelStatus::PickingUp, ParcelStatus::PickedUp),
                (ParcelStatus::PickingUp, ParcelStatus::FailedPickup),
                (ParcelStatus::PickedUp, ParcelStatus::Delivering),
                (ParcelStatus::PickedUp, ParcelStatus::Delivered),
                (ParcelStatus::PickedUp, ParcelStatus::FailedDelivery),
                (ParcelStatus::Delivering, ParcelStatus::Delivered),
                (ParcelStatus::Delivering, ParcelStatus::FailedDelivery),
            ],
            admin_updatable: vec![TaskStatus::ReturningToStation, TaskStatus::Completed],
        }
    }
}

impl StatusRulesConfig {
    /// Creates the default courier table with no administrative overrides.
    #[must_use]
    pub fn without_admin_overrides() -> Self {
        Self {
            admin_updatable: Vec::new(),
            ..Default::default()
        }
    }

    /// Adds a courier transition.
    #[must_use]
    pub fn with_courier_transition(mut self, from: ParcelStatus, to: ParcelStatus) -> Self {
        if !self.allows_transition(from, to) {
            self.courier_transitions.push((from, to));
        }
        self
    }

    /// Adds an administrator-updatable task status.
    #[must_use]
    pub fn with_admin_updatable(mut self, status: TaskStatus) -> Self {
        if !self.admin_updatable.contains(&status) {
            self.admin_updatable.push(status);
        }
        self
    }

    /// Returns `true` when the table contains `(from, to)`.
    #[must_use]
    pub fn allows_transition(&self, from: ParcelStatus, to: ParcelStatus) -> bool {
        self.courier_transitions.contains(&(from, to))
    }
}
