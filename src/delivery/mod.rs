//! Courier delivery lifecycle.
//!
//! Customers place orders whose parcels, once paid, are batched by an
//! administrator into tasks for a courier. Couriers report per-item
//! outcomes, the task derives its own status from its items, and the
//! courier checks in at the station to free up for the next task. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
