//! Conversions between delivery domain values and Diesel rows.

use super::models::{CourierRow, OrderRow, ParcelRow, PaymentRow, TaskItemRow, TaskRow};
use crate::delivery::{
    domain::{
        AddressId, Courier, Order, OrderId, OrderStatus, Parcel, ParcelId, ParcelStatus, Payment,
        PaymentId, PaymentStatus, PersistedOrderData, PersistedTaskData, PersistedTaskItemData,
        PersonId, ShippingDetails, Task, TaskId, TaskItem, TaskItemId, TaskItemNote, TaskStatus,
        TaskType,
    },
    ports::{DeliveryRepositoryError, DeliveryRepositoryResult},
};

pub fn courier_to_row(courier: &Courier) -> CourierRow {
    CourierRow {
        id: courier.id().into_inner(),
        name: courier.name().to_owned(),
        has_active_task: courier.has_active_task(),
    }
}

pub fn row_to_courier(row: CourierRow) -> Courier {
    Courier::from_persisted(PersonId::from_uuid(row.id), row.name, row.has_active_task)
}

pub fn parcel_to_row(parcel: &Parcel) -> ParcelRow {
    ParcelRow {
        id: parcel.id().into_inner(),
        status: parcel.status().as_str().to_owned(),
        assigned: parcel.is_assigned(),
    }
}

pub fn row_to_parcel(row: ParcelRow) -> DeliveryRepositoryResult<Parcel> {
    let status =
        ParcelStatus::try_from(row.status.as_str()).map_err(DeliveryRepositoryError::persistence)?;
    Ok(Parcel::from_persisted(
        ParcelId::from_uuid(row.id),
        status,
        row.assigned,
    ))
}

pub fn order_to_row(order: &Order) -> OrderRow {
    let shipping = order.shipping();
    OrderRow {
        id: order.id().into_inner(),
        customer_id: order.customer_id().into_inner(),
        parcel_id: order.parcel_id().into_inner(),
        sender_address_id: shipping.sender_address_id.into_inner(),
        recipient_address_id: shipping.recipient_address_id.into_inner(),
        delivery_preference: shipping.delivery_preference.clone(),
        status: order.status().as_str().to_owned(),
        created_at: order.created_at(),
    }
}

pub fn row_to_order(row: OrderRow) -> DeliveryRepositoryResult<Order> {
    let status =
        OrderStatus::try_from(row.status.as_str()).map_err(DeliveryRepositoryError::persistence)?;
    Ok(Order::from_persisted(PersistedOrderData {
        id: OrderId::from_uuid(row.id),
        customer_id: PersonId::from_uuid(row.customer_id),
        parcel_id: ParcelId::from_uuid(row.parcel_id),
        shipping: ShippingDetails {
            sender_address_id: AddressId::from_uuid(row.sender_address_id),
            recipient_address_id: AddressId::from_uuid(row.recipient_address_id),
            delivery_preference: row.delivery_preference,
        },
        status,
        created_at: row.created_at,
    }))
}

pub fn payment_to_row(payment: &Payment) -> PaymentRow {
    PaymentRow {
        id: payment.id().into_inner(),
        order_id: payment.order_id().into_inner(),
        amount_minor: payment.amount_minor(),
        status: payment.status().as_str().to_owned(),
    }
}

pub fn row_to_payment(row: PaymentRow) -> DeliveryRepositoryResult<Payment> {
    let status = PaymentStatus::try_from(row.status.as_str())
        .map_err(DeliveryRepositoryError::persistence)?;
    Ok(Payment::from_persisted(
        PaymentId::from_uuid(row.id),
        OrderId::from_uuid(row.order_id),
        row.amount_minor,
        status,
    ))
}

pub fn task_to_row(task: &Task) -> TaskRow {
    TaskRow {
        id: task.id().into_inner(),
        courier_id: task.courier_id().into_inner(),
        created_by_admin_id: task.created_by_admin_id().into_inner(),
        canceled_by_admin_id: task.canceled_by_admin_id().map(PersonId::into_inner),
        task_type: task.task_type().as_str().to_owned(),
        delivery_status: task.status().as_str().to_owned(),
        created_at: task.created_at(),
        completed_at: task.completed_at(),
    }
}

pub fn task_item_rows(task: &Task) -> DeliveryRepositoryResult<Vec<TaskItemRow>> {
    task.items()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let position = i32::try_from(index).map_err(DeliveryRepositoryError::persistence)?;
            let notes =
                serde_json::to_value(item.notes()).map_err(DeliveryRepositoryError::persistence)?;
            Ok(TaskItemRow {
                id: item.id().into_inner(),
                task_id: task.id().into_inner(),
                position,
                parcel_id: item.parcel_id().map(ParcelId::into_inner),
                status: item.status().as_str().to_owned(),
                sender_address_id: item.sender_address_id().into_inner(),
                recipient_address_id: item.recipient_address_id().into_inner(),
                delivery_preference: item.delivery_preference().map(str::to_owned),
                notes,
                live: task.holds_parcel(item),
            })
        })
        .collect()
}

/// Rebuilds a task from its row and its item rows in position order.
pub fn rows_to_task(row: TaskRow, item_rows: Vec<TaskItemRow>) -> DeliveryRepositoryResult<Task> {
    let task_type =
        TaskType::try_from(row.task_type.as_str()).map_err(DeliveryRepositoryError::persistence)?;
    let status = TaskStatus::try_from(row.delivery_status.as_str())
        .map_err(DeliveryRepositoryError::persistence)?;
    let items = item_rows
        .into_iter()
        .map(row_to_task_item)
        .collect::<DeliveryRepositoryResult<Vec<_>>>()?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        courier_id: PersonId::from_uuid(row.courier_id),
        created_by_admin_id: PersonId::from_uuid(row.created_by_admin_id),
        canceled_by_admin_id: row.canceled_by_admin_id.map(PersonId::from_uuid),
        task_type,
        status,
        items,
        created_at: row.created_at,
        completed_at: row.completed_at,
    }))
}

fn row_to_task_item(row: TaskItemRow) -> DeliveryRepositoryResult<TaskItem> {
    let status =
        ParcelStatus::try_from(row.status.as_str()).map_err(DeliveryRepositoryError::persistence)?;
    let notes = serde_json::from_value::<Vec<TaskItemNote>>(row.notes)
        .map_err(DeliveryRepositoryError::persistence)?;
    Ok(TaskItem::from_persisted(PersistedTaskItemData {
        id: TaskItemId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        parcel_id: row.parcel_id.map(ParcelId::from_uuid),
        status,
        sender_address_id: AddressId::from_uuid(row.sender_address_id),
        recipient_address_id: AddressId::from_uuid(row.recipient_address_id),
        delivery_preference: row.delivery_preference,
        notes,
    }))
}
