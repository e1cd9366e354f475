//! Then steps for courier task BDD scenarios.

use super::world::CourierWorld;
use courier_dispatch::delivery::domain::DeliveryErrorKind;
use rstest_bdd_macros::then;

fn expect_failure(world: &CourierWorld, expected: DeliveryErrorKind) -> Result<(), eyre::Report> {
    match &world.last_result {
        Some(Err(err)) if err.kind() == expected => Ok(()),
        other => Err(eyre::eyre!("expected a {expected:?} failure, got {other:?}")),
    }
}

#[then("the last command succeeds")]
fn last_command_succeeds(world: &CourierWorld) -> Result<(), eyre::Report> {
    match &world.last_result {
        Some(Ok(())) => Ok(()),
        other => Err(eyre::eyre!("expected success, got {other:?}")),
    }
}

#[then("the last command fails as invalid state")]
fn last_command_invalid_state(world: &CourierWorld) -> Result<(), eyre::Report> {
    expect_failure(world, DeliveryErrorKind::InvalidState)
}

#[then("the last command fails as invalid argument")]
fn last_command_invalid_argument(world: &CourierWorld) -> Result<(), eyre::Report> {
    expect_failure(world, DeliveryErrorKind::InvalidArgument)
}

#[then(r#"parcel "{label}" is "{status}" and assigned"#)]
fn parcel_is_assigned(
    world: &CourierWorld,
    label: String,
    status: String,
) -> Result<(), eyre::Report> {
    let parcel = world.stored_parcel(&label)?;
    if parcel.status().as_str() != status || !parcel.is_assigned() {
        return Err(eyre::eyre!(
            "expected parcel '{label}' to be assigned in {status}, got {parcel:?}"
        ));
    }
    Ok(())
}

#[then(r#"parcel "{label}" is "{status}" and not assigned"#)]
fn parcel_is_not_assigned(
    world: &CourierWorld,
    label: String,
    status: String,
) -> Result<(), eyre::Report> {
    let parcel = world.stored_parcel(&label)?;
    if parcel.status().as_str() != status || parcel.is_assigned() {
        return Err(eyre::eyre!(
            "expected parcel '{label}' to be free in {status}, got {parcel:?}"
        ));
    }
    Ok(())
}

#[then(r#"the task is "{status}" with {count:usize} items"#)]
fn task_has_status(world: &CourierWorld, status: String, count: usize) -> Result<(), eyre::Report> {
    let task = world.current_task()?;
    if task.status().as_str() != status {
        return Err(eyre::eyre!(
            "expected task status {status}, got {}",
            task.status()
        ));
    }
    if task.items().len() != count {
        return Err(eyre::eyre!(
            "expected {count} items, found {}",
            task.items().len()
        ));
    }
    Ok(())
}

#[then(r#"courier "{name}" has an active task"#)]
fn courier_is_busy(world: &CourierWorld, name: String) -> Result<(), eyre::Report> {
    if !world.stored_courier(&name)?.has_active_task() {
        return Err(eyre::eyre!("expected courier '{name}' to be busy"));
    }
    Ok(())
}

#[then(r#"courier "{name}" is free"#)]
fn courier_is_free(world: &CourierWorld, name: String) -> Result<(), eyre::Report> {
    if world.stored_courier(&name)?.has_active_task() {
        return Err(eyre::eyre!("expected courier '{name}' to be free"));
    }
    Ok(())
}

#[then(r#"the item for parcel "{label}" has a note containing "{text}""#)]
fn item_has_note(world: &CourierWorld, label: String, text: String) -> Result<(), eyre::Report> {
    let parcel_id = world.parcel_id(&label)?;
    let task = world.current_task()?;
    let item = task
        .items()
        .iter()
        .find(|item| item.parcel_id() == Some(parcel_id))
        .ok_or_else(|| eyre::eyre!("no item for parcel '{label}' in the task"))?;
    if !item.notes().iter().any(|note| note.text.contains(&text)) {
        return Err(eyre::eyre!(
            "expected a note containing '{text}', got {:?}",
            item.notes()
        ));
    }
    Ok(())
}

#[then(r#"the administrator was notified about "{name}""#)]
fn admin_notified(world: &CourierWorld, name: String) -> Result<(), eyre::Report> {
    let courier_id = world.courier(&name)?.person_id();
    let task_id = world.current_task()?.id();
    if !world.notifier.sent().contains(&(task_id, courier_id)) {
        return Err(eyre::eyre!(
            "expected a check-in notification for '{name}', got {:?}",
            world.notifier.sent()
        ));
    }
    Ok(())
}
