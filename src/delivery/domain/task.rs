//! Task aggregate root: a batch of parcels assigned to one courier.

use super::{
    Courier, DeliveryDomainError, Order, Parcel, ParcelId, ParseTaskStatusError,
    ParseTaskTypeError, PersonId, TaskId, TaskItem, TaskItemId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Collect parcels from senders.
    Pickup,
    /// Deliver parcels to recipients.
    Delivery,
}

impl TaskType {
    /// Classifies an administrator-supplied label.
    ///
    /// `PICKING_UP` (any case) selects [`TaskType::Pickup`]; every other
    /// label selects [`TaskType::Delivery`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("PICKING_UP") {
            Self::Pickup
        } else {
            Self::Delivery
        }
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pickup => "PICKUP",
            Self::Delivery => "DELIVERY",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskType {
    type Error = ParseTaskTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PICKUP" => Ok(Self::Pickup),
            "DELIVERY" => Ok(Self::Delivery),
            _ => Err(ParseTaskTypeError(value.to_owned())),
        }
    }
}

/// Aggregate delivery status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// The courier is working through the items.
    InProgress,
    /// Every item has an outcome; the courier is heading back.
    ReturningToStation,
    /// The courier checked in at the station.
    AtCheckpoint,
    /// Closed without a check-in.
    Completed,
    /// Aborted by an administrator.
    Canceled,
}

impl TaskStatus {
    /// Every status.
    pub const ALL: [Self; 5] = [
        Self::InProgress,
        Self::ReturningToStation,
        Self::AtCheckpoint,
        Self::Completed,
        Self::Canceled,
    ];

    /// Returns the canonical label and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::ReturningToStation => "RETURNING_TO_STATION",
            Self::AtCheckpoint => "AT_CHECKPOINT",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Returns `true` while the task occupies its courier.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::InProgress | Self::ReturningToStation)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseTaskStatusError(value.to_owned()))
    }
}

/// Result of [`Task::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationOutcome {
    /// Every item ended up cancelled or removed; the courier was released.
    Full,
    /// Some items already carried a delivery outcome, so the task stays open
    /// with only the remaining items cancelled.
    Partial {
        /// Items whose outcome blocked the full cancellation.
        blocked_items: Vec<TaskItemId>,
    },
}

/// Result of [`Task::remove_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRemovalOutcome {
    /// Other items still need work.
    TaskContinues,
    /// The removed item was the last one with work left and nothing was
    /// delivered, so the whole task was cancelled.
    TaskCanceled,
    /// The removed item was the last one with work left; the courier now
    /// returns to the station with the remaining outcomes.
    TaskReturning,
}

/// Courier task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    courier_id: PersonId,
    created_by_admin_id: PersonId,
    canceled_by_admin_id: Option<PersonId>,
    task_type: TaskType,
    status: TaskStatus,
    items: Vec<TaskItem>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Assigned courier.
    pub courier_id: PersonId,
    /// Administrator who created the task.
    pub created_by_admin_id: PersonId,
    /// Administrator who cancelled the task, if any.
    pub canceled_by_admin_id: Option<PersonId>,
    /// Persisted task type.
    pub task_type: TaskType,
    /// Persisted aggregate status.
    pub status: TaskStatus,
    /// Persisted items in creation order.
    pub items: Vec<TaskItem>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Opens an empty in-progress task for a courier.
    #[must_use]
    pub fn new(
        courier_id: PersonId,
        created_by_admin_id: PersonId,
        task_type: TaskType,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: TaskId::new(),
            courier_id,
            created_by_admin_id,
            canceled_by_admin_id: None,
            task_type,
            status: TaskStatus::InProgress,
            items: Vec::new(),
            created_at: clock.utc(),
            completed_at: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            courier_id: data.courier_id,
            created_by_admin_id: data.created_by_admin_id,
            canceled_by_admin_id: data.canceled_by_admin_id,
            task_type: data.task_type,
            status: data.status,
            items: data.items,
            created_at: data.created_at,
            completed_at: data.completed_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the assigned courier.
    #[must_use]
    pub const fn courier_id(&self) -> PersonId {
        self.courier_id
    }

    /// Returns the administrator who created the task.
    #[must_use]
    pub const fn created_by_admin_id(&self) -> PersonId {
        self.created_by_admin_id
    }

    /// Returns the administrator who cancelled the task, if any.
    #[must_use]
    pub const fn canceled_by_admin_id(&self) -> Option<PersonId> {
        self.canceled_by_admin_id
    }

    /// Returns the task type.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the aggregate status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the items in creation order.
    #[must_use]
    pub fn items(&self) -> &[TaskItem] {
        &self.items
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the completion timestamp, if the task has completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Looks up an item by identifier.
    #[must_use]
    pub fn item(&self, item_id: TaskItemId) -> Option<&TaskItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    /// Returns parcel identifiers of every item still linked to a parcel.
    #[must_use]
    pub fn parcel_ids(&self) -> Vec<ParcelId> {
        self.items.iter().filter_map(TaskItem::parcel_id).collect()
    }

    /// Returns `true` when at least one item has no final status yet.
    #[must_use]
    pub fn has_open_items(&self) -> bool {
        self.items.iter().any(|item| !item.is_final())
    }

    /// Returns a mutable item, checking it belongs to this task.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::ItemNotInTask`] when the item belongs to
    /// another task.
    pub fn item_mut(&mut self, item_id: TaskItemId) -> Result<&mut TaskItem, DeliveryDomainError> {
        let task_id = self.id;
        self.items
            .iter_mut()
            .find(|item| item.id() == item_id)
            .ok_or(DeliveryDomainError::ItemNotInTask { item_id, task_id })
    }

    /// Claims `parcel` and adds an item built from it and its order.
    ///
    /// # Errors
    ///
    /// Propagates [`TaskItem::from_parcel`] failures.
    pub fn attach_item(
        &mut self,
        parcel: &mut Parcel,
        order: &Order,
    ) -> Result<TaskItemId, DeliveryDomainError> {
        let item = TaskItem::from_parcel(parcel, order, self.id)?;
        let item_id = item.id();
        self.items.push(item);
        Ok(item_id)
    }

    /// Advances an in-progress task to [`TaskStatus::ReturningToStation`]
    /// once every item carries a final status.
    ///
    /// Returns `true` when the status changed.
    pub fn update_status_if_all_items_final(&mut self) -> bool {
        if self.status != TaskStatus::InProgress || self.has_open_items() {
            return false;
        }
        self.status = TaskStatus::ReturningToStation;
        true
    }

    /// Closes the task at the station and releases the courier.
    ///
    /// Items still open at check-in (after an administrator sent the task
    /// back early) hand their parcels back to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::CheckInNotAllowed`] unless the task is
    /// returning to the station, [`DeliveryDomainError::CourierMismatch`]
    /// when `courier` is not the assigned courier, or
    /// [`DeliveryDomainError::ParcelMismatch`] if the parcel lookup is
    /// inconsistent.
    pub fn complete_on_check_in(
        &mut self,
        parcels: &mut [Parcel],
        courier: &mut Courier,
        clock: &impl Clock,
    ) -> Result<(), DeliveryDomainError> {
        if self.status != TaskStatus::ReturningToStation {
            return Err(DeliveryDomainError::CheckInNotAllowed {
                task_id: self.id,
                status: self.status,
            });
        }
        self.ensure_courier(courier)?;
        self.hand_back_open_parcels(parcels)?;
        self.status = TaskStatus::AtCheckpoint;
        self.completed_at = Some(clock.utc());
        courier.release();
        Ok(())
    }

    /// Cancels every item that has no final status yet.
    ///
    /// When all items end up cancelled or removed the task itself becomes
    /// [`TaskStatus::Canceled`] and the courier is released. Otherwise the
    /// task stays open and the outcome lists the items that blocked it.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::TaskNotActive`] for inactive tasks,
    /// [`DeliveryDomainError::CourierMismatch`] when `courier` is not the
    /// assigned courier, or [`DeliveryDomainError::ParcelMismatch`] if the
    /// parcel lookup is inconsistent.
    pub fn cancel(
        &mut self,
        admin_id: PersonId,
        parcels: &mut [Parcel],
        courier: &mut Courier,
    ) -> Result<CancellationOutcome, DeliveryDomainError> {
        self.ensure_active()?;
        self.ensure_courier(courier)?;

        for item in self.items.iter_mut().filter(|item| !item.is_final()) {
            let parcel = item
                .parcel_id()
                .and_then(|parcel_id| parcels.iter_mut().find(|p| p.id() == parcel_id));
            item.cancel(parcel)?;
        }

        let blocked_items: Vec<TaskItemId> = self
            .items
            .iter()
            .filter(|item| !item.status().is_withdrawn())
            .map(TaskItem::id)
            .collect();
        if !blocked_items.is_empty() {
            return Ok(CancellationOutcome::Partial { blocked_items });
        }

        self.status = TaskStatus::Canceled;
        self.canceled_by_admin_id = Some(admin_id);
        courier.release();
        Ok(CancellationOutcome::Full)
    }

    /// Removes one item from an in-progress task.
    ///
    /// If no item with work left remains, the task is cancelled when nothing
    /// was delivered, or sent back to the station otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::TaskNotActive`] unless the task is in
    /// progress, [`DeliveryDomainError::ItemNotInTask`] for foreign items,
    /// and propagates [`TaskItem::remove_from_task`] failures.
    pub fn remove_item(
        &mut self,
        item_id: TaskItemId,
        parcel: Option<&mut Parcel>,
        admin_id: PersonId,
        courier: &mut Courier,
    ) -> Result<ItemRemovalOutcome, DeliveryDomainError> {
        if self.status != TaskStatus::InProgress {
            return Err(DeliveryDomainError::TaskNotActive {
                task_id: self.id,
                status: self.status,
            });
        }
        self.ensure_courier(courier)?;
        self.item_mut(item_id)?.remove_from_task(parcel)?;

        if self.has_open_items() {
            return Ok(ItemRemovalOutcome::TaskContinues);
        }
        match self.cancel(admin_id, &mut [], courier)? {
            CancellationOutcome::Full => Ok(ItemRemovalOutcome::TaskCanceled),
            CancellationOutcome::Partial { .. } => {
                self.update_status_if_all_items_final();
                Ok(ItemRemovalOutcome::TaskReturning)
            }
        }
    }

    /// Sets the aggregate status directly on an administrator's behalf.
    ///
    /// Moving to an inactive status releases the courier and hands every
    /// parcel whose item is still open back to the pool with the status the
    /// item reached.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryDomainError::TaskNotActive`] for inactive tasks,
    /// [`DeliveryDomainError::CourierMismatch`] when `courier` is not the
    /// assigned courier, or [`DeliveryDomainError::ParcelMismatch`] if the
    /// parcel lookup is inconsistent.
    pub fn override_status(
        &mut self,
        status: TaskStatus,
        parcels: &mut [Parcel],
        courier: &mut Courier,
        clock: &impl Clock,
    ) -> Result<(), DeliveryDomainError> {
        self.ensure_active()?;
        self.ensure_courier(courier)?;
        if !status.is_active() {
            self.hand_back_open_parcels(parcels)?;
            if matches!(status, TaskStatus::AtCheckpoint | TaskStatus::Completed) {
                self.completed_at = Some(clock.utc());
            }
            courier.release();
        }
        self.status = status;
        Ok(())
    }

    /// Returns `true` while `item` still holds its parcel: the item is open
    /// and the task is active.
    #[must_use]
    pub const fn holds_parcel(&self, item: &TaskItem) -> bool {
        self.status.is_active() && !item.is_final()
    }

    fn hand_back_open_parcels(&self, parcels: &mut [Parcel]) -> Result<(), DeliveryDomainError> {
        for item in self.items.iter().filter(|item| !item.is_final()) {
            let parcel = item
                .parcel_id()
                .and_then(|parcel_id| parcels.iter_mut().find(|p| p.id() == parcel_id));
            item.hand_back_parcel(parcel)?;
        }
        Ok(())
    }

    const fn ensure_active(&self) -> Result<(), DeliveryDomainError> {
        if !self.status.is_active() {
            return Err(DeliveryDomainError::TaskNotActive {
                task_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    fn ensure_courier(&self, courier: &Courier) -> Result<(), DeliveryDomainError> {
        if courier.id() != self.courier_id {
            return Err(DeliveryDomainError::CourierMismatch {
                task_id: self.id,
                courier_id: courier.id(),
            });
        }
        Ok(())
    }
}
