//! Given steps for courier task BDD scenarios.

use super::world::{CourierWorld, run_async};
use courier_dispatch::delivery::{
    domain::{AddressId, Caller, PersonId, ShippingDetails},
    services::PlaceOrderRequest,
};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"a courier named "{name}""#)]
fn a_courier_named(world: &mut CourierWorld, name: String) -> Result<(), eyre::Report> {
    let courier = run_async(world.assignment.register_courier(&name))
        .wrap_err("register courier for scenario")?;
    world.couriers.insert(name, Caller::courier(courier.id()));
    Ok(())
}

#[given(r#"an order for parcel "{label}" awaiting payment"#)]
fn an_unpaid_order(world: &mut CourierWorld, label: String) -> Result<(), eyre::Report> {
    place_order(world, label)
}

#[given(r#"a paid parcel "{label}""#)]
fn a_paid_parcel(world: &mut CourierWorld, label: String) -> Result<(), eyre::Report> {
    place_order(world, label.clone())?;
    let order_id = world
        .orders_by_parcel
        .get(&label)
        .copied()
        .ok_or_else(|| eyre::eyre!("order for parcel '{label}' missing"))?;
    run_async(world.orders.confirm_payment(order_id)).wrap_err("confirm payment for scenario")?;
    Ok(())
}

#[given(r#""{courier}" has a pickup task for parcels "{labels}""#)]
fn a_pickup_task(
    world: &mut CourierWorld,
    courier: String,
    labels: String,
) -> Result<(), eyre::Report> {
    let request = world.pickup_request(&courier, &labels)?;
    let task = run_async(world.assignment.create_task(&world.admin, request))
        .wrap_err("create pickup task for scenario")?;
    world.task = Some(task);
    Ok(())
}

fn place_order(world: &mut CourierWorld, label: String) -> Result<(), eyre::Report> {
    let customer = Caller::customer(PersonId::new());
    let shipping = ShippingDetails::new(AddressId::new(), AddressId::new());
    let placed = run_async(
        world
            .orders
            .place_order(&customer, PlaceOrderRequest::new(shipping, 1_500)),
    )
    .wrap_err("place order for scenario")?;
    world
        .orders_by_parcel
        .insert(label.clone(), placed.order.id());
    world.parcels.insert(label, placed.parcel.id());
    Ok(())
}
