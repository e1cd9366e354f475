//! Unit-of-work port for delivery persistence.
//!
//! Every multi-entity operation runs through [`DeliveryStore::transact`].
//! The closure receives a [`DeliveryTransaction`] view; its writes become
//! visible together when the closure returns `Ok` and are discarded when it
//! returns `Err`.

use crate::delivery::domain::{
    Courier, DeliveryErrorKind, Order, OrderId, Parcel, ParcelId, Payment, PersonId, Task, TaskId,
    TaskItemId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for delivery repository operations.
pub type DeliveryRepositoryResult<T> = Result<T, DeliveryRepositoryError>;

/// Reads and writes available inside one unit of work.
///
/// `save_*` methods insert or overwrite by identifier. Tasks are written
/// together with their items.
pub trait DeliveryTransaction {
    /// Finds a courier by person identifier.
    fn find_courier(&mut self, id: PersonId) -> DeliveryRepositoryResult<Option<Courier>>;

    /// Stores a courier.
    fn save_courier(&mut self, courier: &Courier) -> DeliveryRepositoryResult<()>;

    /// Finds a parcel by identifier.
    fn find_parcel(&mut self, id: ParcelId) -> DeliveryRepositoryResult<Option<Parcel>>;

    /// Loads the requested parcels, locking them against concurrent writers
    /// until the unit of work ends. Unknown identifiers are skipped.
    fn find_parcels(&mut self, ids: &[ParcelId]) -> DeliveryRepositoryResult<Vec<Parcel>>;

    /// Stores a parcel.
    fn save_parcel(&mut self, parcel: &Parcel) -> DeliveryRepositoryResult<()>;

    /// Finds an order by identifier.
    fn find_order(&mut self, id: OrderId) -> DeliveryRepositoryResult<Option<Order>>;

    /// Returns the orders shipping any of the given parcels.
    fn find_orders_by_parcels(&mut self, ids: &[ParcelId])
    -> DeliveryRepositoryResult<Vec<Order>>;

    /// Stores an order.
    fn save_order(&mut self, order: &Order) -> DeliveryRepositoryResult<()>;

    /// Finds the payment attached to an order.
    fn find_payment_by_order(&mut self, order_id: OrderId)
    -> DeliveryRepositoryResult<Option<Payment>>;

    /// Stores a payment.
    fn save_payment(&mut self, payment: &Payment) -> DeliveryRepositoryResult<()>;

    /// Stores a new task and its items.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryRepositoryError::DuplicateTask`] when the task
    /// identifier exists, or [`DeliveryRepositoryError::Conflict`] when an
    /// item would give a parcel a second live item.
    fn insert_task(&mut self, task: &Task) -> DeliveryRepositoryResult<()>;

    /// Persists changes to an existing task and its items.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryRepositoryError::TaskNotFound`] when the task does
    /// not exist.
    fn update_task(&mut self, task: &Task) -> DeliveryRepositoryResult<()>;

    /// Finds a task with all of its items.
    fn find_task(&mut self, id: TaskId) -> DeliveryRepositoryResult<Option<Task>>;

    /// Finds the task that owns the given item.
    fn find_task_by_item(&mut self, item_id: TaskItemId) -> DeliveryRepositoryResult<Option<Task>>;
}

/// Transactional delivery persistence contract.
#[async_trait]
pub trait DeliveryStore: Send + Sync {
    /// Runs `work` as one atomic unit.
    ///
    /// # Errors
    ///
    /// Returns whatever `work` returns, or a [`DeliveryRepositoryError`]
    /// converted into `E` when the backend cannot begin or commit.
    async fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn DeliveryTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DeliveryRepositoryError> + Send + 'static;
}

/// Errors returned by delivery repository implementations.
#[derive(Debug, Clone, Error)]
pub enum DeliveryRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// A concurrent unit of work touched the same rows.
    #[error("conflicting concurrent update: {0}")]
    Conflict(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DeliveryRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> DeliveryErrorKind {
        match self {
            Self::DuplicateTask(_) | Self::Conflict(_) => DeliveryErrorKind::Conflict,
            Self::TaskNotFound(_) => DeliveryErrorKind::NotFound,
            Self::Persistence(_) => DeliveryErrorKind::Persistence,
        }
    }
}
