//! Shared test helpers for in-memory delivery integration tests.

use std::sync::Arc;

use courier_dispatch::delivery::{
    adapters::{
        memory::{InMemoryDeliveryStore, RecordingAdminNotifier},
        rules::ConfiguredStatusRules,
    },
    domain::{AddressId, Caller, Parcel, ParcelId, PersonId, ShippingDetails, Task, TaskItemId},
    ports::{DeliveryRepositoryError, DeliveryStore},
    services::{OrderPaymentService, PlaceOrderRequest, TaskAssignmentService, TaskCommandService},
};
use eyre::eyre;
use mockable::DefaultClock;
use rstest::fixture;

/// Services wired over one shared in-memory store.
pub struct Dispatch {
    /// Backing store.
    pub store: Arc<InMemoryDeliveryStore>,
    /// Notifier receiving check-in notifications.
    pub notifier: Arc<RecordingAdminNotifier>,
    /// Task creation service.
    pub assignment: TaskAssignmentService<InMemoryDeliveryStore, DefaultClock>,
    /// Task command service.
    pub commands: TaskCommandService<
        InMemoryDeliveryStore,
        RecordingAdminNotifier,
        ConfiguredStatusRules,
        DefaultClock,
    >,
    /// Order and payment service.
    pub orders: OrderPaymentService<InMemoryDeliveryStore, DefaultClock>,
    /// Administrator issuing commands.
    pub admin: Caller,
}

/// Provides freshly wired services for each test.
#[fixture]
pub fn dispatch() -> Dispatch {
    let store = Arc::new(InMemoryDeliveryStore::new());
    let notifier = Arc::new(RecordingAdminNotifier::new());
    let clock = Arc::new(DefaultClock);
    Dispatch {
        assignment: TaskAssignmentService::new(Arc::clone(&store), Arc::clone(&clock)),
        commands: TaskCommandService::new(
            Arc::clone(&store),
            Arc::clone(&notifier),
            Arc::new(ConfiguredStatusRules::new()),
            Arc::clone(&clock),
        ),
        orders: OrderPaymentService::new(Arc::clone(&store), clock),
        store,
        notifier,
        admin: Caller::admin(PersonId::new()),
    }
}

impl Dispatch {
    /// Registers a courier and returns the caller acting as them.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails.
    pub async fn courier(&self, name: &str) -> eyre::Result<Caller> {
        let courier = self.assignment.register_courier(name).await?;
        Ok(Caller::courier(courier.id()))
    }

    /// Places and pays an order, returning its parcel.
    ///
    /// # Errors
    ///
    /// Returns an error if placement or payment fails.
    pub async fn paid_parcel(&self) -> eyre::Result<ParcelId> {
        let customer = Caller::customer(PersonId::new());
        let shipping = ShippingDetails::new(AddressId::new(), AddressId::new())
            .with_delivery_preference("back door");
        let placed = self
            .orders
            .place_order(&customer, PlaceOrderRequest::new(shipping, 2_000))
            .await?;
        self.orders.confirm_payment(placed.order.id()).await?;
        Ok(placed.parcel.id())
    }

    /// Loads a parcel straight from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the parcel is missing.
    pub async fn parcel(&self, parcel_id: ParcelId) -> eyre::Result<Parcel> {
        self.store
            .transact(move |tx| -> Result<_, DeliveryRepositoryError> {
                tx.find_parcel(parcel_id)
            })
            .await?
            .ok_or_else(|| eyre!("parcel {parcel_id} missing"))
    }

    /// Returns whether the courier currently holds a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the courier is missing.
    pub async fn is_busy(&self, courier: &Caller) -> eyre::Result<bool> {
        let courier_id = courier.person_id();
        let record = self
            .store
            .transact(move |tx| -> Result<_, DeliveryRepositoryError> {
                tx.find_courier(courier_id)
            })
            .await?
            .ok_or_else(|| eyre!("courier {courier_id} missing"))?;
        Ok(record.has_active_task())
    }
}

/// Finds the item wrapping `parcel_id` in `task`.
///
/// # Errors
///
/// Returns an error if the task holds no such item.
pub fn item_for(task: &Task, parcel_id: ParcelId) -> eyre::Result<TaskItemId> {
    task.items()
        .iter()
        .find(|item| item.parcel_id() == Some(parcel_id))
        .map(|item| item.id())
        .ok_or_else(|| eyre!("task {} holds no item for parcel {parcel_id}", task.id()))
}
