//! Orders and payments feeding parcels into the delivery pipeline.

use super::{
    AddressId, DeliveryDomainError, OrderId, ParcelId, ParseOrderStatusError, PaymentId, PersonId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    Pending,
    /// Paid; the parcel has entered the pickup pool.
    Confirmed,
    /// Cancelled before payment.
    Canceled,
}

impl OrderStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = ParseOrderStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELED" => Ok(Self::Canceled),
            _ => Err(ParseOrderStatusError {
                entity: "order",
                value: value.to_owned(),
            }),
        }
    }
}

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Awaiting the provider's confirmation.
    Pending,
    /// Funds captured.
    Succeeded,
    /// Voided together with its order.
    Canceled,
}

impl PaymentStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Succeeded => "SUCCEEDED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = ParseOrderStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SUCCEEDED" => Ok(Self::Succeeded),
            "CANCELED" => Ok(Self::Canceled),
            _ => Err(ParseOrderStatusError {
                entity: "payment",
                value: value.to_owned(),
            }),
        }
    }
}

/// Addresses and handling instructions captured when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    /// Where the courier collects the parcel.
    pub sender_address_id: AddressId,
    /// Where the courier delivers the parcel.
    pub recipient_address_id: AddressId,
    /// Free-text delivery preference, if the customer gave one.
    pub delivery_preference: Option<String>,
}

impl ShippingDetails {
    /// Creates shipping details without a delivery preference.
    #[must_use]
    pub const fn new(sender_address_id: AddressId, recipient_address_id: AddressId) -> Self {
        Self {
            sender_address_id,
            recipient_address_id,
            delivery_preference: None,
        }
    }

    /// Sets the delivery preference. Blank text clears it.
    #[must_use]
    pub fn with_delivery_preference(mut self, preference: impl Into<String>) -> Self {
        let text = preference.into();
        self.delivery_preference = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }
}

/// Customer shipping order for exactly one parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: PersonId,
    parcel_id: ParcelId,
    shipping: ShippingDetails,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedOrderData {
    /// Persisted order identifier.
    pub id: OrderId,
    /// Customer who placed the order.
    pub customer_id: PersonId,
    /// Parcel shipped by the order.
    pub parcel_id: ParcelId,
    /// Persisted shipping details.
    pub shipping: ShippingDetails,
    /// Persisted order status.
    pub status: OrderStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Places a pending order for the given parcel.
    #[must_use]
    pub fn new(
        customer_id: PersonId,
        parcel_id: ParcelId,
        shipping: ShippingDetails,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            parcel_id,
            shipping,
            status: OrderStatus::Pending,
            created_at: clock.utc(),
        }
    }

    /// Reconstructs an order from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedOrderData) -> Self {
        Self {
            id: data.id,
            customer_id: data.customer_id,
            parcel_id: data.parcel_id,
            shipping: data.shipping,
            status: data.status,
            created_at: data.created_at,
        }
    }

    /// Returns the order identifier.
    #[must_use]
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the customer who placed the order.
    #[must_use]
    pub const fn customer_id(&self) -> PersonId {
        self.customer_id
    }

    /// Returns the parcel shipped by this order.
    #[must_use]
    pub const fn parcel_id(&self) -> ParcelId {
        self.parcel_id
    }

    /// Returns the shipping details.
    #[must_use]
    pub const fn shipping(&self) -> &ShippingDetails {
        &self.shipping
    }

    /// Returns the order status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Marks the order as paid.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::OrderNotPending`] unless the order is
    /// still pending.
    pub const fn confirm(&mut self) -> Result<(), DeliveryDomainError> {
        if !matches!(self.status, OrderStatus::Pending) {
            return Err(DeliveryDomainError::OrderNotPending {
                order_id: self.id,
                status: self.status,
            });
        }
        self.status = OrderStatus::Confirmed;
        Ok(())
    }

    /// Cancels an unpaid order.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::OrderNotCancelable`] when the order is
    /// already confirmed or cancelled.
    pub const fn cancel(&mut self) -> Result<(), DeliveryDomainError> {
        if !matches!(self.status, OrderStatus::Pending) {
            return Err(DeliveryDomainError::OrderNotCancelable {
                order_id: self.id,
                status: self.status,
            });
        }
        self.status = OrderStatus::Canceled;
        Ok(())
    }
}

/// Payment attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    order_id: OrderId,
    amount_minor: i64,
    status: PaymentStatus,
}

impl Payment {
    /// Opens a pending payment for an order.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::InvalidPaymentAmount`] unless the amount
    /// is positive.
    pub fn new(order_id: OrderId, amount_minor: i64) -> Result<Self, DeliveryDomainError> {
        if amount_minor <= 0 {
            return Err(DeliveryDomainError::InvalidPaymentAmount(amount_minor));
        }
        Ok(Self {
            id: PaymentId::new(),
            order_id,
            amount_minor,
            status: PaymentStatus::Pending,
        })
    }

    /// Reconstructs a payment from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: PaymentId,
        order_id: OrderId,
        amount_minor: i64,
        status: PaymentStatus,
    ) -> Self {
        Self {
            id,
            order_id,
            amount_minor,
            status,
        }
    }

    /// Returns the payment identifier.
    #[must_use]
    pub const fn id(&self) -> PaymentId {
        self.id
    }

    /// Returns the order this payment settles.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Returns the amount in minor currency units.
    #[must_use]
    pub const fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the payment status.
    #[must_use]
    pub const fn status(&self) -> PaymentStatus {
        self.status
    }

    /// Records a successful capture.
    pub const fn succeed(&mut self) {
        self.status = PaymentStatus::Succeeded;
    }

    /// Voids the payment.
    pub const fn cancel(&mut self) {
        self.status = PaymentStatus::Canceled;
    }
}
