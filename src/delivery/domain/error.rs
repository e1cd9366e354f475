//! Error types for delivery domain invariants and parsing.

use super::{OrderId, OrderStatus, ParcelId, ParcelStatus, PersonId, TaskId, TaskItemId, TaskStatus};
use thiserror::Error;

/// Coarse classification shared by every delivery error.
///
/// Request-handling layers translate these into transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryErrorKind {
    /// A referenced courier, task, item, order, payment or parcel is absent.
    NotFound,
    /// The request itself is malformed or targets the wrong aggregate state.
    InvalidArgument,
    /// An entity-internal invariant would be violated.
    InvalidState,
    /// The caller lacks the role or ownership the operation requires.
    UnauthorizedAccess,
    /// A concurrent writer won; the caller may retry.
    Conflict,
    /// The storage backend failed.
    Persistence,
    /// The order can no longer be cancelled.
    OrderCancellation,
}

/// Errors raised by delivery entities when an operation would break one of
/// their invariants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryDomainError {
    /// The parcel is already claimed by a live task item.
    #[error("parcel {0} is already assigned to a task item")]
    ParcelAlreadyAssigned(ParcelId),

    /// The parcel cannot move from its current status to the requested one.
    #[error("parcel {parcel_id} cannot move from {from} to {to}")]
    InvalidParcelTransition {
        /// Parcel identifier.
        parcel_id: ParcelId,
        /// Current parcel status.
        from: ParcelStatus,
        /// Requested parcel status.
        to: ParcelStatus,
    },

    /// The task item has reached a final status and is frozen.
    #[error("task item {item_id} is in final status {status} and cannot be modified")]
    TaskItemFinal {
        /// Task item identifier.
        item_id: TaskItemId,
        /// Frozen status.
        status: ParcelStatus,
    },

    /// Notes must carry text.
    #[error("note text must not be empty")]
    EmptyNote,

    /// No parcel is linked to the task item.
    #[error("task item {0} has no linked parcel")]
    ParcelNotLinked(TaskItemId),

    /// The supplied parcel is not the one the task item wraps.
    #[error("parcel {parcel_id} is not linked to task item {item_id}")]
    ParcelMismatch {
        /// Task item identifier.
        item_id: TaskItemId,
        /// Parcel that was supplied.
        parcel_id: ParcelId,
    },

    /// The order supplied for an item does not reference the parcel.
    #[error("order {order_id} does not reference parcel {parcel_id}")]
    OrderMismatch {
        /// Order identifier.
        order_id: OrderId,
        /// Parcel identifier.
        parcel_id: ParcelId,
    },

    /// The task item does not belong to the task.
    #[error("task item {item_id} does not belong to task {task_id}")]
    ItemNotInTask {
        /// Task item identifier.
        item_id: TaskItemId,
        /// Task identifier.
        task_id: TaskId,
    },

    /// The courier supplied is not the one assigned to the task.
    #[error("courier {courier_id} is not assigned to task {task_id}")]
    CourierMismatch {
        /// Task identifier.
        task_id: TaskId,
        /// Courier that was supplied.
        courier_id: PersonId,
    },

    /// The courier already owns an active task.
    #[error("courier {0} already has an active task")]
    CourierBusy(PersonId),

    /// Check-in is only legal once the courier is returning to the station.
    #[error("task {task_id} cannot be checked in while {status}")]
    CheckInNotAllowed {
        /// Task identifier.
        task_id: TaskId,
        /// Current task status.
        status: TaskStatus,
    },

    /// The operation requires an active task.
    #[error("task {task_id} is not active (status {status})")]
    TaskNotActive {
        /// Task identifier.
        task_id: TaskId,
        /// Current task status.
        status: TaskStatus,
    },

    /// The order has already been confirmed or cancelled.
    #[error("order {order_id} cannot be cancelled while {status}")]
    OrderNotCancelable {
        /// Order identifier.
        order_id: OrderId,
        /// Current order status.
        status: OrderStatus,
    },

    /// Payment can only be confirmed for a pending order.
    #[error("order {order_id} cannot accept a payment while {status}")]
    OrderNotPending {
        /// Order identifier.
        order_id: OrderId,
        /// Current order status.
        status: OrderStatus,
    },

    /// Payment amounts are positive minor currency units.
    #[error("invalid payment amount {0}, expected a positive value")]
    InvalidPaymentAmount(i64),

    /// Courier names must not be blank.
    #[error("courier name must not be empty")]
    EmptyCourierName,

    /// The operation needs administrator privileges.
    #[error("person {0} is not an administrator")]
    AdminRequired(PersonId),

    /// The operation needs a courier identity.
    #[error("person {0} is not a courier")]
    CourierRequired(PersonId),
}

impl DeliveryDomainError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> DeliveryErrorKind {
        match self {
            Self::EmptyNote
            | Self::CheckInNotAllowed { .. }
            | Self::TaskNotActive { .. }
            | Self::ItemNotInTask { .. }
            | Self::CourierBusy(_)
            | Self::InvalidPaymentAmount(_)
            | Self::EmptyCourierName => DeliveryErrorKind::InvalidArgument,
            Self::OrderNotCancelable { .. } => DeliveryErrorKind::OrderCancellation,
            Self::AdminRequired(_) | Self::CourierRequired(_) => {
                DeliveryErrorKind::UnauthorizedAccess
            }
            Self::ParcelAlreadyAssigned(_)
            | Self::InvalidParcelTransition { .. }
            | Self::TaskItemFinal { .. }
            | Self::ParcelNotLinked(_)
            | Self::ParcelMismatch { .. }
            | Self::OrderMismatch { .. }
            | Self::CourierMismatch { .. }
            | Self::OrderNotPending { .. } => DeliveryErrorKind::InvalidState,
        }
    }
}

/// Error returned while parsing parcel statuses from labels or storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown parcel status: {0}")]
pub struct ParseParcelStatusError(pub String);

/// Error returned while parsing task statuses from labels or storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task types from storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task type: {0}")]
pub struct ParseTaskTypeError(pub String);

/// Error returned while parsing order or payment statuses from storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {entity} status: {value}")]
pub struct ParseOrderStatusError {
    /// Entity whose status failed to parse.
    pub entity: &'static str,
    /// Raw value that was rejected.
    pub value: String,
}
