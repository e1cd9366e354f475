//! Domain model for the courier delivery lifecycle.
//!
//! Parcels, task items, tasks, couriers and orders are plain values that
//! reference each other by identifier. Every state change goes through an
//! entity method that enforces the relevant invariant; persistence and
//! notification concerns stay outside the domain boundary.

mod caller;
mod courier;
mod error;
mod ids;
mod order;
mod parcel;
mod task;
mod task_item;

pub use caller::{Caller, Role};
pub use courier::Courier;
pub use error::{
    DeliveryDomainError, DeliveryErrorKind, ParseOrderStatusError, ParseParcelStatusError,
    ParseTaskStatusError, ParseTaskTypeError,
};
pub use ids::{AddressId, OrderId, ParcelId, PaymentId, PersonId, TaskId, TaskItemId};
pub use order::{
    Order, OrderStatus, Payment, PaymentStatus, PersistedOrderData, ShippingDetails,
};
pub use parcel::{Parcel, ParcelStatus};
pub use task::{
    CancellationOutcome, ItemRemovalOutcome, PersistedTaskData, Task, TaskStatus, TaskType,
};
pub use task_item::{PersistedTaskItemData, TaskItem, TaskItemNote};
