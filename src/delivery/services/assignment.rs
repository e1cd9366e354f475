//! Task assignment: batching paid parcels into a courier task.

use super::{DeliveryServiceError, DeliveryServiceResult};
use crate::delivery::{
    domain::{Caller, Courier, Parcel, ParcelId, ParcelStatus, PersonId, Task, TaskType},
    ports::{DeliveryStore, DeliveryTransaction},
};
use mockable::Clock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// Request payload for creating a courier task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    courier_id: PersonId,
    parcel_ids: Vec<ParcelId>,
    task_type_label: String,
}

impl CreateTaskRequest {
    /// Creates a request for `courier_id` covering `parcel_ids` in order.
    ///
    /// The label is classified with [`TaskType::from_label`].
    #[must_use]
    pub fn new(
        courier_id: PersonId,
        parcel_ids: impl IntoIterator<Item = ParcelId>,
        task_type_label: impl Into<String>,
    ) -> Self {
        Self {
            courier_id,
            parcel_ids: parcel_ids.into_iter().collect(),
            task_type_label: task_type_label.into(),
        }
    }

    /// Returns the target courier.
    #[must_use]
    pub const fn courier_id(&self) -> PersonId {
        self.courier_id
    }

    /// Returns the requested parcels.
    #[must_use]
    pub fn parcel_ids(&self) -> &[ParcelId] {
        &self.parcel_ids
    }

    /// Returns the raw task type label.
    #[must_use]
    pub fn task_type_label(&self) -> &str {
        &self.task_type_label
    }
}

/// Creates couriers and courier tasks.
pub struct TaskAssignmentService<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync + 'static,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> Clone for TaskAssignmentService<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, C> TaskAssignmentService<S, C>
where
    S: DeliveryStore,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a new assignment service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Registers an idle courier.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError::Domain`] when the name is blank, or a
    /// repository error when the courier cannot be stored.
    pub async fn register_courier(&self, name: &str) -> DeliveryServiceResult<Courier> {
        let courier = Courier::new(name)?;
        let stored = courier.clone();
        self.store
            .transact(move |tx| -> DeliveryServiceResult<()> {
                tx.save_courier(&stored)?;
                Ok(())
            })
            .await?;
        info!(courier_id = %courier.id(), "courier registered");
        Ok(courier)
    }

    /// Creates a task for a courier and claims every requested parcel.
    ///
    /// Either the task, its items, the parcel claims and the courier's
    /// active-task flag all become visible, or none of them do.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryServiceError`] when the caller is not an
    /// administrator, the courier is unknown or busy, a parcel is unknown,
    /// ineligible, already claimed or has no order, or the store fails.
    pub async fn create_task(
        &self,
        caller: &Caller,
        request: CreateTaskRequest,
    ) -> DeliveryServiceResult<Task> {
        let admin_id = caller.require_admin()?;
        ensure_distinct(&request.parcel_ids)?;
        let task_type = TaskType::from_label(&request.task_type_label);
        let courier_id = request.courier_id;
        let parcel_ids = request.parcel_ids;
        let clock = Arc::clone(&self.clock);

        let task = self
            .store
            .transact(move |tx| -> DeliveryServiceResult<Task> {
                let mut courier = tx
                    .find_courier(courier_id)?
                    .ok_or(DeliveryServiceError::CourierNotFound(courier_id))?;
                courier.occupy()?;

                let mut task = Task::new(courier_id, admin_id, task_type, &*clock);
                let parcels = claim_parcels(tx, &mut task, &parcel_ids)?;

                tx.insert_task(&task)?;
                for parcel in &parcels {
                    tx.save_parcel(parcel)?;
                }
                tx.save_courier(&courier)?;
                Ok(task)
            })
            .await?;

        info!(
            task_id = %task.id(),
            courier_id = %task.courier_id(),
            admin_id = %admin_id,
            task_type = %task.task_type(),
            items = task.items().len(),
            "courier task created"
        );
        Ok(task)
    }
}

fn ensure_distinct(parcel_ids: &[ParcelId]) -> DeliveryServiceResult<()> {
    if parcel_ids.is_empty() {
        return Err(DeliveryServiceError::EmptyParcelSelection);
    }
    let mut seen = HashSet::with_capacity(parcel_ids.len());
    for parcel_id in parcel_ids {
        if !seen.insert(*parcel_id) {
            return Err(DeliveryServiceError::DuplicateParcel(*parcel_id));
        }
    }
    Ok(())
}

/// Builds one item per requested parcel, in request order.
fn claim_parcels(
    tx: &mut dyn DeliveryTransaction,
    task: &mut Task,
    parcel_ids: &[ParcelId],
) -> DeliveryServiceResult<Vec<Parcel>> {
    let mut parcels = tx.find_parcels(parcel_ids)?;
    let orders = tx.find_orders_by_parcels(parcel_ids)?;

    for parcel_id in parcel_ids {
        let parcel = parcels
            .iter_mut()
            .find(|candidate| candidate.id() == *parcel_id)
            .ok_or(DeliveryServiceError::ParcelNotFound(*parcel_id))?;
        ensure_eligible(parcel)?;
        let order = orders
            .iter()
            .find(|candidate| candidate.parcel_id() == *parcel_id)
            .ok_or(DeliveryServiceError::OrderForParcelNotFound(*parcel_id))?;
        if task.task_type() == TaskType::Delivery && parcel.status() == ParcelStatus::PickedUp {
            parcel.transition_to_delivery()?;
        }
        task.attach_item(parcel, order)?;
    }
    Ok(parcels)
}

fn ensure_eligible(parcel: &Parcel) -> DeliveryServiceResult<()> {
    let status = parcel.status();
    if matches!(status, ParcelStatus::WaitingForPayment) || status.is_final() {
        return Err(DeliveryServiceError::ParcelNotEligible {
            parcel_id: parcel.id(),
            status,
        });
    }
    Ok(())
}
