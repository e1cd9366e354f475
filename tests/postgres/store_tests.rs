//! Round trips and constraint enforcement against a real database.

use std::sync::Arc;

use super::helpers::{PostgresCluster, TestDatabase, postgres_cluster, test_runtime};
use courier_dispatch::delivery::{
    adapters::{
        memory::RecordingAdminNotifier, postgres::PostgresDeliveryStore,
        rules::ConfiguredStatusRules,
    },
    domain::{AddressId, Caller, DeliveryErrorKind, ParcelId, PersonId, ShippingDetails, TaskStatus},
    ports::{DeliveryRepositoryError, DeliveryStore},
    services::{
        CreateTaskRequest, OrderPaymentService, PlaceOrderRequest, TaskAssignmentService,
        TaskCommandService,
    },
};
use eyre::{ensure, eyre};
use mockable::DefaultClock;
use rstest::rstest;

type Commands = TaskCommandService<
    PostgresDeliveryStore,
    RecordingAdminNotifier,
    ConfiguredStatusRules,
    DefaultClock,
>;

struct Services {
    store: Arc<PostgresDeliveryStore>,
    assignment: TaskAssignmentService<PostgresDeliveryStore, DefaultClock>,
    commands: Commands,
    orders: OrderPaymentService<PostgresDeliveryStore, DefaultClock>,
    admin: Caller,
}

fn services(store: PostgresDeliveryStore) -> Services {
    let store = Arc::new(store);
    let clock = Arc::new(DefaultClock);
    Services {
        assignment: TaskAssignmentService::new(Arc::clone(&store), Arc::clone(&clock)),
        commands: TaskCommandService::new(
            Arc::clone(&store),
            Arc::new(RecordingAdminNotifier::new()),
            Arc::new(ConfiguredStatusRules::new()),
            Arc::clone(&clock),
        ),
        orders: OrderPaymentService::new(Arc::clone(&store), clock),
        store,
        admin: Caller::admin(PersonId::new()),
    }
}

impl Services {
    async fn paid_parcel(&self) -> eyre::Result<ParcelId> {
        let customer = Caller::customer(PersonId::new());
        let shipping = ShippingDetails::new(AddressId::new(), AddressId::new())
            .with_delivery_preference("call on arrival");
        let placed = self
            .orders
            .place_order(&customer, PlaceOrderRequest::new(shipping, 3_100))
            .await?;
        self.orders.confirm_payment(placed.order.id()).await?;
        Ok(placed.parcel.id())
    }
}

#[rstest]
fn task_round_trips_with_items_and_notes(
    postgres_cluster: eyre::Result<PostgresCluster>,
) -> eyre::Result<()> {
    let database = TestDatabase::create(postgres_cluster?)?;
    let svc = services(database.store.clone());
    test_runtime()?.block_on(async {
        let courier = svc.assignment.register_courier("Ada").await?;
        let caller = Caller::courier(courier.id());
        let first = svc.paid_parcel().await?;
        let second = svc.paid_parcel().await?;
        let task = svc
            .assignment
            .create_task(
                &svc.admin,
                CreateTaskRequest::new(courier.id(), [first, second], "PICKING_UP"),
            )
            .await?;
        let item_id = task
            .items()
            .first()
            .map(|item| item.id())
            .ok_or_else(|| eyre!("task has no items"))?;

        svc.commands
            .update_item_status(&caller, item_id, "PICKED_UP")
            .await?;
        let noted = svc
            .commands
            .update_item_note(&caller, item_id, "gate code 1234")
            .await?;
        let reloaded = svc.commands.find_task(task.id()).await?;

        ensure!(reloaded.items() == noted.items());
        ensure!(reloaded.parcel_ids() == vec![first, second]);
        ensure!(reloaded.status() == TaskStatus::InProgress);
        Ok::<_, eyre::Report>(())
    })
}

#[rstest]
fn live_parcel_index_rejects_second_claim(
    postgres_cluster: eyre::Result<PostgresCluster>,
) -> eyre::Result<()> {
    let database = TestDatabase::create(postgres_cluster?)?;
    let svc = services(database.store.clone());
    test_runtime()?.block_on(async {
        let ada = svc.assignment.register_courier("Ada").await?;
        let grace = svc.assignment.register_courier("Grace").await?;
        let parcel_id = svc.paid_parcel().await?;
        svc.assignment
            .create_task(
                &svc.admin,
                CreateTaskRequest::new(ada.id(), [parcel_id], "PICKING_UP"),
            )
            .await?;

        let result = svc
            .assignment
            .create_task(
                &svc.admin,
                CreateTaskRequest::new(grace.id(), [parcel_id], "PICKING_UP"),
            )
            .await;

        let err = result.err().ok_or_else(|| eyre!("second claim must fail"))?;
        ensure!(err.kind() == DeliveryErrorKind::InvalidState);
        Ok::<_, eyre::Report>(())
    })
}

/// Rounds of simultaneous claims on one parcel by two couriers.
const CLAIM_ROUNDS: usize = 10;

#[rstest]
fn concurrent_claims_on_a_parcel_leave_one_winner(
    postgres_cluster: eyre::Result<PostgresCluster>,
) -> eyre::Result<()> {
    let database = TestDatabase::create(postgres_cluster?)?;
    let svc = services(database.store.clone());
    test_runtime()?.block_on(async {
        for round in 0..CLAIM_ROUNDS {
            let parcel_id = svc.paid_parcel().await?;
            let ada = svc.assignment.register_courier("Ada").await?;
            let grace = svc.assignment.register_courier("Grace").await?;
            let claims = [ada.id(), grace.id()].map(|courier_id| {
                let assignment = svc.assignment.clone();
                let admin = svc.admin;
                tokio::spawn(async move {
                    let request = CreateTaskRequest::new(courier_id, [parcel_id], "PICKING_UP");
                    assignment.create_task(&admin, request).await
                })
            });

            let mut winners = 0_usize;
            for claim in claims {
                match claim.await? {
                    Ok(task) => {
                        ensure!(task.parcel_ids() == vec![parcel_id]);
                        winners += 1;
                    }
                    Err(err) => {
                        ensure!(
                            matches!(
                                err.kind(),
                                DeliveryErrorKind::Conflict | DeliveryErrorKind::InvalidState
                            ),
                            "round {round}: losing claim reported {:?}: {err}",
                            err.kind()
                        );
                    }
                }
            }
            ensure!(winners == 1, "round {round}: {winners} claims won");
        }
        Ok::<_, eyre::Report>(())
    })
}

#[rstest]
fn closed_task_releases_its_live_items(
    postgres_cluster: eyre::Result<PostgresCluster>,
) -> eyre::Result<()> {
    let database = TestDatabase::create(postgres_cluster?)?;
    let svc = services(database.store.clone());
    test_runtime()?.block_on(async {
        let ada = svc.assignment.register_courier("Ada").await?;
        let grace = svc.assignment.register_courier("Grace").await?;
        let parcel_id = svc.paid_parcel().await?;
        let task = svc
            .assignment
            .create_task(
                &svc.admin,
                CreateTaskRequest::new(ada.id(), [parcel_id], "PICKING_UP"),
            )
            .await?;

        svc.commands.cancel_task(&svc.admin, task.id()).await?;
        let retaken = svc
            .assignment
            .create_task(
                &svc.admin,
                CreateTaskRequest::new(grace.id(), [parcel_id], "PICKING_UP"),
            )
            .await?;

        ensure!(retaken.parcel_ids() == vec![parcel_id]);
        Ok::<_, eyre::Report>(())
    })
}

#[rstest]
fn failed_work_rolls_back(postgres_cluster: eyre::Result<PostgresCluster>) -> eyre::Result<()> {
    let database = TestDatabase::create(postgres_cluster?)?;
    let svc = services(database.store.clone());
    test_runtime()?.block_on(async {
        let parcel_id = svc.paid_parcel().await?;

        let result = svc
            .store
            .transact(move |tx| -> Result<(), DeliveryRepositoryError> {
                let mut parcel = tx
                    .find_parcel(parcel_id)?
                    .ok_or(DeliveryRepositoryError::Conflict("missing".to_owned()))?;
                parcel.cancel();
                tx.save_parcel(&parcel)?;
                Err(DeliveryRepositoryError::Conflict("forced".to_owned()))
            })
            .await;
        ensure!(result.is_err());

        let parcel = svc
            .store
            .transact(move |tx| -> Result<_, DeliveryRepositoryError> { tx.find_parcel(parcel_id) })
            .await?
            .ok_or_else(|| eyre!("parcel missing"))?;
        ensure!(!parcel.status().is_final());
        Ok::<_, eyre::Report>(())
    })
}
