//! Task item: one parcel's participation in one courier task.

use super::{
    AddressId, DeliveryDomainError, Order, Parcel, ParcelId, ParcelStatus, PersonId, TaskId,
    TaskItemId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Append-only note recorded against a task item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItemNote {
    /// Note text, stored verbatim.
    pub text: String,
    /// Person who caused the note, when known.
    pub author_id: Option<PersonId>,
    /// When the note was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A parcel wrapped inside a courier task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    id: TaskItemId,
    task_id: TaskId,
    parcel_id: Option<ParcelId>,
    status: ParcelStatus,
    sender_address_id: AddressId,
    recipient_address_id: AddressId,
    delivery_preference: Option<String>,
    notes: Vec<TaskItemNote>,
}

/// Parameter object for reconstructing a persisted task item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskItemData {
    /// Persisted item identifier.
    pub id: TaskItemId,
    /// Owning task.
    pub task_id: TaskId,
    /// Wrapped parcel, if still linked.
    pub parcel_id: Option<ParcelId>,
    /// Persisted item status.
    pub status: ParcelStatus,
    /// Pickup address.
    pub sender_address_id: AddressId,
    /// Drop-off address.
    pub recipient_address_id: AddressId,
    /// Free-text delivery preference.
    pub delivery_preference: Option<String>,
    /// Persisted notes, oldest first.
    pub notes: Vec<TaskItemNote>,
}

impl TaskItem {
    /// Builds an item for `parcel` inside `task_id`, copying shipping data
    /// from the parcel's order and claiming the parcel.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::OrderMismatch`] when the order ships a
    /// different parcel, or [`DeliveryDomainError::ParcelAlreadyAssigned`]
    /// when another item already holds the parcel.
    pub fn from_parcel(
        parcel: &mut Parcel,
        order: &Order,
        task_id: TaskId,
    ) -> Result<Self, DeliveryDomainError> {
        if order.parcel_id() != parcel.id() {
            return Err(DeliveryDomainError::OrderMismatch {
                order_id: order.id(),
                parcel_id: parcel.id(),
            });
        }
        parcel.assign()?;

        let shipping = order.shipping();
        Ok(Self {
            id: TaskItemId::new(),
            task_id,
            parcel_id: Some(parcel.id()),
            status: parcel.status(),
            sender_address_id: shipping.sender_address_id,
            recipient_address_id: shipping.recipient_address_id,
            delivery_preference: shipping.delivery_preference.clone(),
            notes: Vec::new(),
        })
    }

    /// Reconstructs an item from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskItemData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            parcel_id: data.parcel_id,
            status: data.status,
            sender_address_id: data.sender_address_id,
            recipient_address_id: data.recipient_address_id,
            delivery_preference: data.delivery_preference,
            notes: data.notes,
        }
    }

    /// Returns the item identifier.
    #[must_use]
    pub const fn id(&self) -> TaskItemId {
        self.id
    }

    /// Returns the owning task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the wrapped parcel identifier, if linked.
    #[must_use]
    pub const fn parcel_id(&self) -> Option<ParcelId> {
        self.parcel_id
    }

    /// Returns the item status.
    #[must_use]
    pub const fn status(&self) -> ParcelStatus {
        self.status
    }

    /// Returns the pickup address.
    #[must_use]
    pub const fn sender_address_id(&self) -> AddressId {
        self.sender_address_id
    }

    /// Returns the drop-off address.
    #[must_use]
    pub const fn recipient_address_id(&self) -> AddressId {
        self.recipient_address_id
    }

    /// Returns the delivery preference, if any.
    #[must_use]
    pub fn delivery_preference(&self) -> Option<&str> {
        self.delivery_preference.as_deref()
    }

    /// Returns the notes, oldest first.
    #[must_use]
    pub fn notes(&self) -> &[TaskItemNote] {
        &self.notes
    }

    /// Returns `true` once the item has reached a final status.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.status.is_final()
    }

    /// Records a courier-reported status and a note describing it.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::TaskItemFinal`] when the item is frozen.
    pub fn change_status(
        &mut self,
        new_status: ParcelStatus,
        acting_person_id: PersonId,
        clock: &impl Clock,
    ) -> Result<(), DeliveryDomainError> {
        self.ensure_mutable()?;
        self.status = new_status;
        let text = format!(
            "{} (item {}, by {})",
            transition_note(new_status),
            self.id,
            acting_person_id
        );
        self.notes.push(TaskItemNote {
            text,
            author_id: Some(acting_person_id),
            recorded_at: clock.utc(),
        });
        Ok(())
    }

    /// Appends a free-text note verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::EmptyNote`] when the text is blank.
    pub fn add_note(
        &mut self,
        text: impl Into<String>,
        author_id: Option<PersonId>,
        clock: &impl Clock,
    ) -> Result<(), DeliveryDomainError> {
        let note = text.into();
        if note.trim().is_empty() {
            return Err(DeliveryDomainError::EmptyNote);
        }
        self.notes.push(TaskItemNote {
            text: note,
            author_id,
            recorded_at: clock.utc(),
        });
        Ok(())
    }

    /// Pulls the item out of its task and releases the parcel, if present.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::TaskItemFinal`] when the item is frozen,
    /// or [`DeliveryDomainError::ParcelMismatch`] when `parcel` is not the
    /// one this item wraps.
    pub fn remove_from_task(
        &mut self,
        parcel: Option<&mut Parcel>,
    ) -> Result<(), DeliveryDomainError> {
        self.ensure_mutable()?;
        let linked = self.linked(parcel)?;
        self.status = ParcelStatus::RemovedFromTheList;
        if let Some(linked_parcel) = linked {
            linked_parcel.unassign();
        }
        Ok(())
    }

    /// Cancels the item and releases the parcel, if present.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::TaskItemFinal`] when the item already
    /// carries a final status, or [`DeliveryDomainError::ParcelMismatch`]
    /// when `parcel` is not the one this item wraps.
    pub fn cancel(&mut self, parcel: Option<&mut Parcel>) -> Result<(), DeliveryDomainError> {
        self.ensure_mutable()?;
        let linked = self.linked(parcel)?;
        self.status = ParcelStatus::Canceled;
        if let Some(linked_parcel) = linked {
            linked_parcel.unassign();
        }
        Ok(())
    }

    /// Copies this item's status onto its parcel and releases the claim.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::ParcelNotLinked`] when no parcel is
    /// available, or [`DeliveryDomainError::ParcelMismatch`] when `parcel` is
    /// not the one this item wraps.
    pub fn apply_final_status_to_parcel(
        &self,
        parcel: Option<&mut Parcel>,
    ) -> Result<(), DeliveryDomainError> {
        let linked = self
            .linked(parcel)?
            .ok_or(DeliveryDomainError::ParcelNotLinked(self.id))?;
        linked.update_status_from_task_item(self.status);
        Ok(())
    }

    /// Releases the parcel of an item left open when its task closed,
    /// copying the status the item reached. Items without a parcel are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::ParcelMismatch`] when `parcel` is not
    /// the one this item wraps.
    pub fn hand_back_parcel(&self, parcel: Option<&mut Parcel>) -> Result<(), DeliveryDomainError> {
        if let Some(linked) = self.linked(parcel)? {
            linked.update_status_from_task_item(self.status);
        }
        Ok(())
    }

    const fn ensure_mutable(&self) -> Result<(), DeliveryDomainError> {
        if self.status.is_final() {
            return Err(DeliveryDomainError::TaskItemFinal {
                item_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Checks that `parcel` is the parcel this item wraps.
    fn linked<'a>(
        &self,
        parcel: Option<&'a mut Parcel>,
    ) -> Result<Option<&'a mut Parcel>, DeliveryDomainError> {
        let (Some(expected), Some(candidate)) = (self.parcel_id, parcel) else {
            return Ok(None);
        };
        if candidate.id() != expected {
            return Err(DeliveryDomainError::ParcelMismatch {
                item_id: self.id,
                parcel_id: candidate.id(),
            });
        }
        Ok(Some(candidate))
    }
}

/// Canned note text for a courier-reported status.
const fn transition_note(status: ParcelStatus) -> &'static str {
    match status {
        ParcelStatus::PickedUp => "Picked up",
        ParcelStatus::Delivered => "Delivered",
        ParcelStatus::FailedPickup => "Failed to pick up",
        ParcelStatus::FailedDelivery => "Failed to deliver",
        _ => "Status changed",
    }
}
