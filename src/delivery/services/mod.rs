//! Application services orchestrating the delivery lifecycle.
//!
//! Every operation runs its reads and writes inside one
//! [`DeliveryStore::transact`](crate::delivery::ports::DeliveryStore::transact)
//! call.

mod assignment;
mod command;
mod error;
mod orders;

pub use assignment::{CreateTaskRequest, TaskAssignmentService};
pub use command::TaskCommandService;
pub use error::{DeliveryServiceError, DeliveryServiceResult};
pub use orders::{OrderPaymentService, PlaceOrderRequest, PlacedOrder};
