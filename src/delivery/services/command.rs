//! Task commands: status overrides, cancellation, check-in, item removal
//! and courier reports on individual items.

use super::{DeliveryServiceError, DeliveryServiceResult};
use crate::delivery::{
    domain::{
        CancellationOutcome, Caller, Courier, DeliveryDomainError, ItemRemovalOutcome,
        ParcelStatus, PersonId, Task, TaskId, TaskItemId, TaskStatus,
    },
    ports::{AdminNotifier, DeliveryStore, DeliveryTransaction, StatusRules},
};
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates every mutation of an existing task.
pub struct TaskCommandService<S, N, R, C>
where
    S: DeliveryStore,
    N: AdminNotifier,
    R: StatusRules + 'static,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    notifier: Arc<N>,
    rules: Arc<R>,
    clock: Arc<C>,
}

impl<S, N, R, C> Clone for TaskCommandService<S, N, R, C>
where
    S: DeliveryStore,
    N: AdminNotifier,
    R: StatusRules + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            rules: Arc::clone(&self.rules),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, N, R, C> TaskCommandService<S, N, R, C>
where
    S: DeliveryStore,
    N: AdminNotifier,
    R: StatusRules + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new command service.
    #[must_use]
    pub const fn new(store: Arc<S>, notifier: Arc<N>, rules: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            store,
            notifier,
            rules,
            clock,
        }
    }

    /// Loads a task with all of its items.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::TaskNotFound`] when the task does not
    /// exist, or a repository error.
    pub async fn find_task(&self, task_id: TaskId) -> DeliveryServiceResult<Task> {
        self.store
            .transact(move |tx| load_task(tx, task_id))
            .await
    }

    /// Sets a task's aggregate status on an administrator's behalf.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the caller is not an
    /// administrator, the label is unknown, the status is not
    /// administrator-updatable, the task is not active, or the store fails.
    pub async fn change_task_status(
        &self,
        caller: &Caller,
        task_id: TaskId,
        status_label: &str,
    ) -> DeliveryServiceResult<Task> {
        let admin_id = caller.require_admin()?;
        let status = TaskStatus::try_from(status_label)?;
        if !self.rules.admin_may_set(status) {
            return Err(DeliveryServiceError::StatusNotAdminUpdatable(status));
        }
        let clock = Arc::clone(&self.clock);

        let task = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<Task> {
                let mut task = load_task(tx, task_id)?;
                let mut courier = load_courier(tx, task.courier_id())?;
                let mut parcels = tx.find_parcels(&task.parcel_ids())?;
                task.override_status(status, &mut parcels, &mut courier, &*clock)?;
                tx.update_task(&task)?;
                for parcel in &parcels {
                    tx.save_parcel(parcel)?;
                }
                tx.save_courier(&courier)?;
                Ok(task)
            })
            .await?;

        info!(task_id = %task_id, admin_id = %admin_id, status = %status, "task status overridden");
        Ok(task)
    }

    /// Cancels every item of an active task that can still be cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the caller is not an
    /// administrator, the task is unknown or inactive, or the store fails.
    pub async fn cancel_task(
        &self,
        caller: &Caller,
        task_id: TaskId,
    ) -> DeliveryServiceResult<CancellationOutcome> {
        let admin_id = caller.require_admin()?;

        let outcome = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<CancellationOutcome> {
                let mut task = load_task(tx, task_id)?;
                let mut courier = load_courier(tx, task.courier_id())?;
                let mut parcels = tx.find_parcels(&task.parcel_ids())?;
                let outcome = task.cancel(admin_id, &mut parcels, &mut courier)?;
                tx.update_task(&task)?;
                for parcel in &parcels {
                    tx.save_parcel(parcel)?;
                }
                tx.save_courier(&courier)?;
                Ok(outcome)
            })
            .await?;

        match &outcome {
            CancellationOutcome::Full => {
                info!(task_id = %task_id, admin_id = %admin_id, "task cancelled");
            }
            CancellationOutcome::Partial { blocked_items } => {
                info!(
                    task_id = %task_id,
                    admin_id = %admin_id,
                    blocked = blocked_items.len(),
                    "task partially cancelled"
                );
            }
        }
        Ok(outcome)
    }

    /// Closes a returning task at the station and notifies the
    /// administrator.
    ///
    /// The notification is sent after the check-in commits; a failed
    /// notification is logged and does not fail the check-in.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the caller is not the assigned
    /// courier, the task is unknown or not returning, or the store fails.
    pub async fn check_in(&self, caller: &Caller, task_id: TaskId) -> DeliveryServiceResult<Task> {
        let courier_id = caller.require_courier()?;
        let clock = Arc::clone(&self.clock);

        let task = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<Task> {
                let mut task = load_task(tx, task_id)?;
                ensure_assigned(&task, courier_id)?;
                let mut courier = load_courier(tx, courier_id)?;
                let mut parcels = tx.find_parcels(&task.parcel_ids())?;
                task.complete_on_check_in(&mut parcels, &mut courier, &*clock)?;
                tx.update_task(&task)?;
                for parcel in &parcels {
                    tx.save_parcel(parcel)?;
                }
                tx.save_courier(&courier)?;
                Ok(task)
            })
            .await?;

        info!(task_id = %task_id, courier_id = %courier_id, "courier checked in");
        if let Err(err) = self.notifier.notify_admin(task_id, courier_id).await {
            warn!(task_id = %task_id, courier_id = %courier_id, error = %err, "admin notification failed");
        }
        Ok(task)
    }

    /// Pulls one item out of an in-progress task.
    ///
    /// When no item with work left remains, the task is cancelled if
    /// nothing was delivered and sent back to the station otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the caller is not an
    /// administrator, the item is unknown or belongs to another task, the
    /// task is not in progress, the item is final, or the store fails.
    pub async fn remove_item_from_task(
        &self,
        caller: &Caller,
        task_id: TaskId,
        item_id: TaskItemId,
    ) -> DeliveryServiceResult<ItemRemovalOutcome> {
        let admin_id = caller.require_admin()?;

        let outcome = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<ItemRemovalOutcome> {
                let mut task = load_task_by_item(tx, item_id)?;
                if task.id() != task_id {
                    return Err(DeliveryDomainError::ItemNotInTask { item_id, task_id }.into());
                }
                let mut courier = load_courier(tx, task.courier_id())?;
                let mut parcel = match task.item(item_id).and_then(|item| item.parcel_id()) {
                    Some(parcel_id) => tx.find_parcel(parcel_id)?,
                    None => None,
                };
                let outcome =
                    task.remove_item(item_id, parcel.as_mut(), admin_id, &mut courier)?;
                tx.update_task(&task)?;
                if let Some(released) = &parcel {
                    tx.save_parcel(released)?;
                }
                tx.save_courier(&courier)?;
                Ok(outcome)
            })
            .await?;

        info!(
            task_id = %task_id,
            item_id = %item_id,
            admin_id = %admin_id,
            outcome = ?outcome,
            "item removed from task"
        );
        Ok(outcome)
    }

    /// Records a courier-reported status for one item.
    ///
    /// A final status is copied onto the parcel and releases it; any other
    /// status is mirrored while the claim is kept. The owning task moves to
    /// [`TaskStatus::ReturningToStation`] once every item is final.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the caller is not the assigned
    /// courier, the label is unknown, the transition is not allowed, the
    /// item is final, or the store fails.
    pub async fn update_item_status(
        &self,
        caller: &Caller,
        item_id: TaskItemId,
        status_label: &str,
    ) -> DeliveryServiceResult<Task> {
        let courier_id = caller.require_courier()?;
        let new_status = ParcelStatus::try_from(status_label)?;
        let rules = Arc::clone(&self.rules);
        let clock = Arc::clone(&self.clock);

        let task = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<Task> {
                let mut task = load_task_by_item(tx, item_id)?;
                ensure_assigned(&task, courier_id)?;
                if task.status() != TaskStatus::InProgress {
                    return Err(DeliveryDomainError::TaskNotActive {
                        task_id: task.id(),
                        status: task.status(),
                    }
                    .into());
                }

                let item = task.item_mut(item_id)?;
                let current = item.status();
                if !item.is_final() && !rules.courier_may_transition(current, new_status) {
                    return Err(DeliveryServiceError::TransitionNotAllowed {
                        from: current,
                        to: new_status,
                    });
                }
                item.change_status(new_status, courier_id, &*clock)?;

                let mut parcel = match item.parcel_id() {
                    Some(parcel_id) => tx.find_parcel(parcel_id)?,
                    None => None,
                };
                if new_status.is_final() {
                    item.apply_final_status_to_parcel(parcel.as_mut())?;
                } else if let Some(tracked) = parcel.as_mut() {
                    tracked.track_task_item_status(new_status);
                }

                let returning = task.update_status_if_all_items_final();
                tx.update_task(&task)?;
                if let Some(updated) = &parcel {
                    tx.save_parcel(updated)?;
                }
                if returning {
                    debug!(task_id = %task.id(), "all items final, courier returning");
                }
                Ok(task)
            })
            .await?;

        info!(
            task_id = %task.id(),
            item_id = %item_id,
            courier_id = %courier_id,
            status = %new_status,
            "item status updated"
        );
        Ok(task)
    }

    /// Appends a courier note to one item.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the caller is not the assigned
    /// courier, the item is unknown or final, the note is blank, or the
    /// store fails.
    pub async fn update_item_note(
        &self,
        caller: &Caller,
        item_id: TaskItemId,
        note: &str,
    ) -> DeliveryServiceResult<Task> {
        let courier_id = caller.require_courier()?;
        let text = note.to_owned();
        let clock = Arc::clone(&self.clock);

        let task = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<Task> {
                let mut task = load_task_by_item(tx, item_id)?;
                ensure_assigned(&task, courier_id)?;
                let item = task.item_mut(item_id)?;
                if item.is_final() {
                    return Err(DeliveryDomainError::TaskItemFinal {
                        item_id,
                        status: item.status(),
                    }
                    .into());
                }
                item.add_note(text, Some(courier_id), &*clock)?;
                tx.update_task(&task)?;
                Ok(task)
            })
            .await?;

        debug!(task_id = %task.id(), item_id = %item_id, "item note added");
        Ok(task)
    }
}

fn load_task(tx: &mut dyn DeliveryTransaction, task_id: TaskId) -> DeliveryServiceResult<Task> {
    tx.find_task(task_id)?
        .ok_or(DeliveryServiceError::TaskNotFound(task_id))
}

fn load_task_by_item(
    tx: &mut dyn DeliveryTransaction,
    item_id: TaskItemId,
) -> DeliveryServiceResult<Task> {
    tx.find_task_by_item(item_id)?
        .ok_or(DeliveryServiceError::TaskItemNotFound(item_id))
}

fn load_courier(
    tx: &mut dyn DeliveryTransaction,
    courier_id: PersonId,
) -> DeliveryServiceResult<Courier> {
    tx.find_courier(courier_id)?
        .ok_or(DeliveryServiceError::CourierNotFound(courier_id))
}

fn ensure_assigned(task: &Task, person_id: PersonId) -> DeliveryServiceResult<()> {
    if task.courier_id() != person_id {
        return Err(DeliveryServiceError::NotAssignedCourier {
            task_id: task.id(),
            person_id,
        });
    }
    Ok(())
}
