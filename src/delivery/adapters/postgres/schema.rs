//! Diesel schema for delivery lifecycle persistence.

diesel::table! {
    /// Couriers and their task capacity flag.
    couriers (id) {
        /// Courier person identifier.
        id -> Uuid,
        /// Display name.
        #[max_length = 255]
        name -> Varchar,
        /// Whether the courier owns an active task.
        has_active_task -> Bool,
    }
}

diesel::table! {
    /// Parcels and their claim flag.
    parcels (id) {
        /// Parcel identifier.
        id -> Uuid,
        /// Parcel status label.
        #[max_length = 32]
        status -> Varchar,
        /// Whether a live task item claims the parcel.
        assigned -> Bool,
    }
}

diesel::table! {
    /// Customer shipping orders, one parcel each.
    orders (id) {
        /// Order identifier.
        id -> Uuid,
        /// Customer who placed the order.
        customer_id -> Uuid,
        /// Shipped parcel.
        parcel_id -> Uuid,
        /// Pickup address.
        sender_address_id -> Uuid,
        /// Drop-off address.
        recipient_address_id -> Uuid,
        /// Free-text delivery preference.
        delivery_preference -> Nullable<Text>,
        /// Order status label.
        #[max_length = 32]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Payments, one per order.
    payments (id) {
        /// Payment identifier.
        id -> Uuid,
        /// Settled order.
        order_id -> Uuid,
        /// Amount in minor currency units.
        amount_minor -> BigInt,
        /// Payment status label.
        #[max_length = 32]
        status -> Varchar,
    }
}

diesel::table! {
    /// Courier tasks.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Assigned courier.
        courier_id -> Uuid,
        /// Administrator who created the task.
        created_by_admin_id -> Uuid,
        /// Administrator who cancelled the task.
        canceled_by_admin_id -> Nullable<Uuid>,
        /// Task type label.
        #[max_length = 32]
        task_type -> Varchar,
        /// Aggregate status label.
        #[max_length = 32]
        delivery_status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Parcels wrapped inside tasks.
    task_items (id) {
        /// Task item identifier.
        id -> Uuid,
        /// Owning task.
        task_id -> Uuid,
        /// Position of the item within its task.
        position -> Int4,
        /// Wrapped parcel.
        parcel_id -> Nullable<Uuid>,
        /// Item status label.
        #[max_length = 32]
        status -> Varchar,
        /// Pickup address.
        sender_address_id -> Uuid,
        /// Drop-off address.
        recipient_address_id -> Uuid,
        /// Free-text delivery preference.
        delivery_preference -> Nullable<Text>,
        /// Append-only notes as a JSON array.
        notes -> Jsonb,
        /// Whether the item still holds its parcel.
        live -> Bool,
    }
}
