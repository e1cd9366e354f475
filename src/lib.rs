//! Courier dispatch: delivery task lifecycle engine.
//!
//! This crate assigns paid parcels to couriers as pickup or delivery tasks
//! and tracks each parcel through the task until the courier checks back in
//! at the station.
//!
//! # Architecture
//!
//! The delivery engine follows hexagonal architecture principles:
//!
//! - **Domain**: Parcels, task items and tasks with their invariants
//! - **Ports**: The transactional store, admin notification and status rules
//! - **Adapters**: In-memory and `PostgreSQL` stores, configured rule tables
//! - **Services**: Task assignment, task commands and order payment flows
//!
//! # Modules
//!
//! - [`delivery`]: The delivery lifecycle engine
//! - [`config`]: Environment-driven settings for the binaries
//! - [`telemetry`]: Tracing subscriber setup

pub mod config;
pub mod delivery;
pub mod telemetry;
