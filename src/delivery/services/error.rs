//! Service-level error taxonomy shared by every delivery service.

use crate::delivery::{
    domain::{
        DeliveryDomainError, DeliveryErrorKind, OrderId, ParcelId, ParcelStatus,
        ParseParcelStatusError, ParseTaskStatusError, PersonId, TaskId, TaskItemId, TaskStatus,
    },
    ports::DeliveryRepositoryError,
};
use thiserror::Error;

/// Errors returned by delivery services.
#[derive(Debug, Error)]
pub enum DeliveryServiceError {
    /// A domain invariant rejected the operation.
    #[error(transparent)]
    Domain(#[from] DeliveryDomainError),

    /// The store failed or a concurrent unit of work won the race.
    #[error(transparent)]
    Repository(#[from] DeliveryRepositoryError),

    /// A parcel status label could not be parsed.
    #[error(transparent)]
    ParcelStatusLabel(#[from] ParseParcelStatusError),

    /// A task status label could not be parsed.
    #[error(transparent)]
    TaskStatusLabel(#[from] ParseTaskStatusError),

    /// The courier does not exist.
    #[error("courier {0} was not found")]
    CourierNotFound(PersonId),

    /// The task does not exist.
    #[error("task {0} was not found")]
    TaskNotFound(TaskId),

    /// No task holds the item.
    #[error("task item {0} was not found")]
    TaskItemNotFound(TaskItemId),

    /// The parcel does not exist.
    #[error("parcel {0} was not found")]
    ParcelNotFound(ParcelId),

    /// The order does not exist.
    #[error("order {0} was not found")]
    OrderNotFound(OrderId),

    /// The order has no payment attached.
    #[error("payment for order {0} was not found")]
    PaymentNotFound(OrderId),

    /// No order ships the parcel, so no item can be built from it.
    #[error("Order for parcel was not found: {0}")]
    OrderForParcelNotFound(ParcelId),

    /// The parcel cannot join a task in its current status.
    #[error("parcel {parcel_id} is not eligible for a task while {status}")]
    ParcelNotEligible {
        /// Rejected parcel.
        parcel_id: ParcelId,
        /// Its current status.
        status: ParcelStatus,
    },

    /// A task needs at least one parcel.
    #[error("a task needs at least one parcel")]
    EmptyParcelSelection,

    /// The same parcel was requested more than once.
    #[error("parcel {0} was requested more than once")]
    DuplicateParcel(ParcelId),

    /// Administrators may not set this status directly.
    #[error("task status {0} cannot be set by an administrator")]
    StatusNotAdminUpdatable(TaskStatus),

    /// The courier transition table forbids the move.
    #[error("task item cannot move from {from} to {to}")]
    TransitionNotAllowed {
        /// Current item status.
        from: ParcelStatus,
        /// Requested item status.
        to: ParcelStatus,
    },

    /// The caller is not the courier assigned to the task.
    #[error("person {person_id} is not the courier assigned to task {task_id}")]
    NotAssignedCourier {
        /// Task being accessed.
        task_id: TaskId,
        /// Caller identifier.
        person_id: PersonId,
    },

    /// The caller neither placed the order nor administers it.
    #[error("person {person_id} may not manage order {order_id}")]
    NotOrderOwner {
        /// Order being accessed.
        order_id: OrderId,
        /// Caller identifier.
        person_id: PersonId,
    },
}

impl DeliveryServiceError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> DeliveryErrorKind {
        match self {
            Self::Domain(err) => err.kind(),
            Self::Repository(err) => err.kind(),
            Self::ParcelStatusLabel(_)
            | Self::TaskStatusLabel(_)
            | Self::ParcelNotEligible { .. }
            | Self::EmptyParcelSelection
            | Self::DuplicateParcel(_)
            | Self::StatusNotAdminUpdatable(_)
            | Self::TransitionNotAllowed { .. } => DeliveryErrorKind::InvalidArgument,
            Self::CourierNotFound(_)
            | Self::TaskNotFound(_)
            | Self::TaskItemNotFound(_)
            | Self::ParcelNotFound(_)
            | Self::OrderNotFound(_)
            | Self::PaymentNotFound(_)
            | Self::OrderForParcelNotFound(_) => DeliveryErrorKind::NotFound,
            Self::NotAssignedCourier { .. } | Self::NotOrderOwner { .. } => {
                DeliveryErrorKind::UnauthorizedAccess
            }
        }
    }
}

/// Result type for delivery service operations.
pub type DeliveryServiceResult<T> = Result<T, DeliveryServiceError>;
