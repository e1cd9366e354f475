//! `PostgreSQL` adapters for delivery lifecycle persistence.

mod conversion;
mod models;
mod repository;
mod schema;

pub use repository::{DeliveryPgPool, PostgresDeliveryStore};

/// SQL creating the delivery tables and the live-parcel index.
pub const CREATE_DELIVERY_TABLES_SQL: &str =
    include_str!("../../../../migrations/2026-10-01-000000_create_delivery_tables/up.sql");
