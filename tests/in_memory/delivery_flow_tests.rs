//! Pickup and delivery legs driven end to end through the services.

use super::helpers::{Dispatch, dispatch, item_for};
use courier_dispatch::delivery::{
    domain::{ParcelStatus, TaskStatus, TaskType},
    services::CreateTaskRequest,
};
use eyre::ensure;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn parcel_travels_from_pickup_to_delivery(dispatch: Dispatch) -> eyre::Result<()> {
    let picker = dispatch.courier("Ada").await?;
    let driver = dispatch.courier("Grace").await?;
    let parcel_id = dispatch.paid_parcel().await?;

    let pickup = dispatch
        .assignment
        .create_task(
            &dispatch.admin,
            CreateTaskRequest::new(picker.person_id(), [parcel_id], "PICKING_UP"),
        )
        .await?;
    dispatch
        .commands
        .update_item_status(&picker, item_for(&pickup, parcel_id)?, "PICKED_UP")
        .await?;
    let closed = dispatch
        .commands
        .change_task_status(&dispatch.admin, pickup.id(), "COMPLETED")
        .await?;
    ensure!(closed.status() == TaskStatus::Completed);
    ensure!(closed.completed_at().is_some());
    ensure!(!dispatch.is_busy(&picker).await?);

    let delivery = dispatch
        .assignment
        .create_task(
            &dispatch.admin,
            CreateTaskRequest::new(driver.person_id(), [parcel_id], "DELIVERING"),
        )
        .await?;
    ensure!(delivery.task_type() == TaskType::Delivery);
    let returning = dispatch
        .commands
        .update_item_status(&driver, item_for(&delivery, parcel_id)?, "DELIVERED")
        .await?;
    ensure!(returning.status() == TaskStatus::ReturningToStation);

    let checked_in = dispatch.commands.check_in(&driver, delivery.id()).await?;

    ensure!(checked_in.status() == TaskStatus::AtCheckpoint);
    ensure!(!dispatch.is_busy(&driver).await?);
    let parcel = dispatch.parcel(parcel_id).await?;
    ensure!(parcel.status() == ParcelStatus::Delivered);
    ensure!(!parcel.is_assigned());
    ensure!(dispatch.notifier.sent() == vec![(delivery.id(), driver.person_id())]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_pickup_parcel_is_not_eligible_again(dispatch: Dispatch) -> eyre::Result<()> {
    let first = dispatch.courier("Ada").await?;
    let second = dispatch.courier("Grace").await?;
    let parcel_id = dispatch.paid_parcel().await?;
    let task = dispatch
        .assignment
        .create_task(
            &dispatch.admin,
            CreateTaskRequest::new(first.person_id(), [parcel_id], "PICKING_UP"),
        )
        .await?;

    dispatch
        .commands
        .update_item_status(&first, item_for(&task, parcel_id)?, "FAILED_PICKUP")
        .await?;
    dispatch.commands.check_in(&first, task.id()).await?;

    let parcel = dispatch.parcel(parcel_id).await?;
    ensure!(parcel.status() == ParcelStatus::FailedPickup);
    ensure!(!parcel.is_assigned());
    let retry = dispatch
        .assignment
        .create_task(
            &dispatch.admin,
            CreateTaskRequest::new(second.person_id(), [parcel_id], "PICKING_UP"),
        )
        .await;
    ensure!(retry.is_err(), "final parcels are not eligible for a new task");
    Ok(())
}
