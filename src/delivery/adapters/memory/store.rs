//! In-memory implementation of the [`DeliveryStore`] port.
//!
//! Each unit of work runs against a staged copy of the state under the write
//! lock; the copy replaces the live state only when the work succeeds.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::delivery::{
    domain::{
        Courier, Order, OrderId, Parcel, ParcelId, Payment, PersonId, Task, TaskId, TaskItemId,
    },
    ports::{
        DeliveryRepositoryError, DeliveryRepositoryResult, DeliveryStore, DeliveryTransaction,
    },
};

/// Thread-safe in-memory delivery store for tests and local tooling.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeliveryStore {
    state: Arc<RwLock<InMemoryDeliveryState>>,
}

#[derive(Debug, Clone, Default)]
struct InMemoryDeliveryState {
    couriers: HashMap<PersonId, Courier>,
    parcels: HashMap<ParcelId, Parcel>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<OrderId, Payment>,
    tasks: HashMap<TaskId, Task>,
    item_index: HashMap<TaskItemId, TaskId>,
}

impl InMemoryDeliveryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

struct InMemoryTransaction<'a> {
    state: &'a mut InMemoryDeliveryState,
}

impl InMemoryDeliveryState {
    /// Returns a parcel that would end up held by two task items if `task`
    /// were written.
    fn live_item_conflict(&self, task: &Task) -> Option<ParcelId> {
        let held_elsewhere = |parcel_id: ParcelId| {
            self.tasks
                .values()
                .filter(|other| other.id() != task.id())
                .any(|other| {
                    other
                        .items()
                        .iter()
                        .any(|item| other.holds_parcel(item) && item.parcel_id() == Some(parcel_id))
                })
        };
        task.items()
            .iter()
            .filter(|item| task.holds_parcel(item))
            .filter_map(|item| item.parcel_id())
            .find(|parcel_id| held_elsewhere(*parcel_id))
    }

    fn write_task(&mut self, task: &Task) -> DeliveryRepositoryResult<()> {
        if let Some(parcel_id) = self.live_item_conflict(task) {
            return Err(DeliveryRepositoryError::Conflict(format!(
                "parcel {parcel_id} already has a live task item"
            )));
        }
        for item in task.items() {
            self.item_index.insert(item.id(), task.id());
        }
        self.tasks.insert(task.id(), task.clone());
        Ok(())
    }
}

impl DeliveryTransaction for InMemoryTransaction<'_> {
    fn find_courier(&mut self, id: PersonId) -> DeliveryRepositoryResult<Option<Courier>> {
        Ok(self.state.couriers.get(&id).cloned())
    }

    fn save_courier(&mut self, courier: &Courier) -> DeliveryRepositoryResult<()> {
        self.state.couriers.insert(courier.id(), courier.clone());
        Ok(())
    }

    fn find_parcel(&mut self, id: ParcelId) -> DeliveryRepositoryResult<Option<Parcel>> {
        Ok(self.state.parcels.get(&id).cloned())
    }

    fn find_parcels(&mut self, ids: &[ParcelId]) -> DeliveryRepositoryResult<Vec<Parcel>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.state.parcels.get(id).cloned())
            .collect())
    }

    fn save_parcel(&mut self, parcel: &Parcel) -> DeliveryRepositoryResult<()> {
        self.state.parcels.insert(parcel.id(), parcel.clone());
        Ok(())
    }

    fn find_order(&mut self, id: OrderId) -> DeliveryRepositoryResult<Option<Order>> {
        Ok(self.state.orders.get(&id).cloned())
    }

    fn find_orders_by_parcels(
        &mut self,
        ids: &[ParcelId],
    ) -> DeliveryRepositoryResult<Vec<Order>> {
        Ok(self
            .state
            .orders
            .values()
            .filter(|order| ids.contains(&order.parcel_id()))
            .cloned()
            .collect())
    }

    fn save_order(&mut self, order: &Order) -> DeliveryRepositoryResult<()> {
        self.state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    fn find_payment_by_order(
        &mut self,
        order_id: OrderId,
    ) -> DeliveryRepositoryResult<Option<Payment>> {
        Ok(self.state.payments.get(&order_id).cloned())
    }

    fn save_payment(&mut self, payment: &Payment) -> DeliveryRepositoryResult<()> {
        self.state
            .payments
            .insert(payment.order_id(), payment.clone());
        Ok(())
    }

    fn insert_task(&mut self, task: &Task) -> DeliveryRepositoryResult<()> {
        if self.state.tasks.contains_key(&task.id()) {
            return Err(DeliveryRepositoryError::DuplicateTask(task.id()));
        }
        self.state.write_task(task)
    }

    fn update_task(&mut self, task: &Task) -> DeliveryRepositoryResult<()> {
        if !self.state.tasks.contains_key(&task.id()) {
            return Err(DeliveryRepositoryError::TaskNotFound(task.id()));
        }
        self.state.write_task(task)
    }

    fn find_task(&mut self, id: TaskId) -> DeliveryRepositoryResult<Option<Task>> {
        Ok(self.state.tasks.get(&id).cloned())
    }

    fn find_task_by_item(&mut self, item_id: TaskItemId) -> DeliveryRepositoryResult<Option<Task>> {
        let task = self
            .state
            .item_index
            .get(&item_id)
            .and_then(|task_id| self.state.tasks.get(task_id))
            .cloned();
        Ok(task)
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn DeliveryTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DeliveryRepositoryError> + Send + 'static,
    {
        let mut state = self.state.write().map_err(|err| {
            DeliveryRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        let mut staged = state.clone();
        let mut transaction = InMemoryTransaction {
            state: &mut staged,
        };
        let result = work(&mut transaction as &mut dyn DeliveryTransaction);
        if result.is_ok() {
            *state = staged;
        }
        result
    }
}
