//! Parcel entity and the parcel status pipeline.

use super::{DeliveryDomainError, ParcelId, ParseParcelStatusError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a parcel in the delivery pipeline.
///
/// The happy path runs `WaitingForPayment → PickingUp → PickedUp →
/// Delivering → Delivered`. Task items mirror these values for the parcel
/// they wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParcelStatus {
    /// Order placed, payment outstanding.
    WaitingForPayment,
    /// Paid and waiting for a courier to collect it.
    PickingUp,
    /// Collected by the courier.
    PickedUp,
    /// On its way to the recipient.
    Delivering,
    /// Handed to the recipient.
    Delivered,
    /// The courier could not collect the parcel.
    FailedPickup,
    /// The courier could not hand the parcel over.
    FailedDelivery,
    /// Administratively cancelled.
    Canceled,
    /// Taken out of its task without a delivery outcome.
    RemovedFromTheList,
}

impl ParcelStatus {
    /// Every status, in pipeline order.
    pub const ALL: [Self; 9] = [
        Self::WaitingForPayment,
        Self::PickingUp,
        Self::PickedUp,
        Self::Delivering,
        Self::Delivered,
        Self::FailedPickup,
        Self::FailedDelivery,
        Self::Canceled,
        Self::RemovedFromTheList,
    ];

    /// Returns the canonical label and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitingForPayment => "WAITING_FOR_PAYMENT",
            Self::PickingUp => "PICKING_UP",
            Self::PickedUp => "PICKED_UP",
            Self::Delivering => "DELIVERING",
            Self::Delivered => "DELIVERED",
            Self::FailedPickup => "FAILED_PICKUP",
            Self::FailedDelivery => "FAILED_DELIVERY",
            Self::Canceled => "CANCELED",
            Self::RemovedFromTheList => "REMOVED_FROM_THE_LIST",
        }
    }

    /// Returns `true` when no further task item mutation is allowed.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(
            self,
            Self::Delivered
                | Self::FailedPickup
                | Self::FailedDelivery
                | Self::Canceled
                | Self::RemovedFromTheList
        )
    }

    /// Returns `true` for final statuses the courier reported from the field.
    ///
    /// Items in one of these statuses block a full task cancellation.
    #[must_use]
    pub const fn is_delivery_outcome(self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::FailedPickup | Self::FailedDelivery
        )
    }

    /// Returns `true` for final statuses that carry no delivery outcome.
    #[must_use]
    pub const fn is_withdrawn(self) -> bool {
        matches!(self, Self::Canceled | Self::RemovedFromTheList)
    }
}

impl fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ParcelStatus {
    type Error = ParseParcelStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseParcelStatusError(value.to_owned()))
    }
}

/// A physical parcel and whether a live task item currently claims it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    id: ParcelId,
    status: ParcelStatus,
    assigned: bool,
}

impl Parcel {
    /// Creates a parcel for a freshly placed order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ParcelId::new(),
            status: ParcelStatus::WaitingForPayment,
            assigned: false,
        }
    }

    /// Reconstructs a parcel from persisted storage.
    #[must_use]
    pub const fn from_persisted(id: ParcelId, status: ParcelStatus, assigned: bool) -> Self {
        Self {
            id,
            status,
            assigned,
        }
    }

    /// Returns the parcel identifier.
    #[must_use]
    pub const fn id(&self) -> ParcelId {
        self.id
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> ParcelStatus {
        self.status
    }

    /// Returns `true` while a live task item claims this parcel.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.assigned
    }

    /// Claims the parcel for a task item.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::ParcelAlreadyAssigned`] when another
    /// item already holds the claim.
    pub const fn assign(&mut self) -> Result<(), DeliveryDomainError> {
        if self.assigned {
            return Err(DeliveryDomainError::ParcelAlreadyAssigned(self.id));
        }
        self.assigned = true;
        Ok(())
    }

    /// Releases the claim. Releasing an unclaimed parcel is a no-op.
    pub const fn unassign(&mut self) {
        self.assigned = false;
    }

    /// Moves a collected parcel onto the delivery leg.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::InvalidParcelTransition`] unless the
    /// parcel is currently [`ParcelStatus::PickedUp`].
    pub fn transition_to_delivery(&mut self) -> Result<(), DeliveryDomainError> {
        self.transition(ParcelStatus::PickedUp, ParcelStatus::Delivering)
    }

    /// Makes a paid parcel available to the pickup pool.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::InvalidParcelTransition`] unless the
    /// parcel is still waiting for payment.
    pub fn mark_paid(&mut self) -> Result<(), DeliveryDomainError> {
        self.transition(ParcelStatus::WaitingForPayment, ParcelStatus::PickingUp)
    }

    /// Applies a task item's outcome and releases the claim.
    pub const fn update_status_from_task_item(&mut self, status: ParcelStatus) {
        self.status = status;
        self.assigned = false;
    }

    /// Mirrors an in-progress task item status while keeping the claim.
    pub const fn track_task_item_status(&mut self, status: ParcelStatus) {
        self.status = status;
    }

    /// Forces the parcel into [`ParcelStatus::Canceled`].
    pub const fn cancel(&mut self) {
        self.status = ParcelStatus::Canceled;
    }

    fn transition(
        &mut self,
        expected: ParcelStatus,
        target: ParcelStatus,
    ) -> Result<(), DeliveryDomainError> {
        if self.status != expected {
            return Err(DeliveryDomainError::InvalidParcelTransition {
                parcel_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}

impl Default for Parcel {
    fn default() -> Self {
        Self::new()
    }
}
