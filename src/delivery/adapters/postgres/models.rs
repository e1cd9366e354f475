//! Diesel row models for delivery persistence.

use super::schema::{couriers, orders, parcels, payments, task_items, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

/// Row for the `couriers` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = couriers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CourierRow {
    /// Courier person identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Capacity flag.
    pub has_active_task: bool,
}

/// Row for the `parcels` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = parcels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ParcelRow {
    /// Parcel identifier.
    pub id: Uuid,
    /// Status label.
    pub status: String,
    /// Claim flag.
    pub assigned: bool,
}

/// Row for the `orders` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    /// Order identifier.
    pub id: Uuid,
    /// Customer identifier.
    pub customer_id: Uuid,
    /// Parcel identifier.
    pub parcel_id: Uuid,
    /// Pickup address.
    pub sender_address_id: Uuid,
    /// Drop-off address.
    pub recipient_address_id: Uuid,
    /// Delivery preference.
    pub delivery_preference: Option<String>,
    /// Status label.
    pub status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Row for the `payments` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    /// Payment identifier.
    pub id: Uuid,
    /// Order identifier.
    pub order_id: Uuid,
    /// Amount in minor units.
    pub amount_minor: i64,
    /// Status label.
    pub status: String,
}

/// Row for the `tasks` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Task identifier.
    pub id: Uuid,
    /// Courier identifier.
    pub courier_id: Uuid,
    /// Creating administrator.
    pub created_by_admin_id: Uuid,
    /// Cancelling administrator.
    pub canceled_by_admin_id: Option<Uuid>,
    /// Task type label.
    pub task_type: String,
    /// Aggregate status label.
    pub delivery_status: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Row for the `task_items` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = task_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskItemRow {
    /// Task item identifier.
    pub id: Uuid,
    /// Owning task identifier.
    pub task_id: Uuid,
    /// Position within the task.
    pub position: i32,
    /// Parcel identifier.
    pub parcel_id: Option<Uuid>,
    /// Status label.
    pub status: String,
    /// Pickup address.
    pub sender_address_id: Uuid,
    /// Drop-off address.
    pub recipient_address_id: Uuid,
    /// Delivery preference.
    pub delivery_preference: Option<String>,
    /// Notes JSON array.
    pub notes: Value,
    /// Parcel-holding flag backing the live-parcel index.
    pub live: bool,
}
