//! `PostgreSQL` implementation of the [`DeliveryStore`] port.
//!
//! Each unit of work runs in a `SERIALIZABLE` transaction on a pooled
//! connection. Parcels are locked with `FOR UPDATE` when loaded, and the
//! partial unique index `idx_task_items_live_parcel` keeps a parcel from
//! being held by two task items at once. Serialization failures surface as
//! [`DeliveryRepositoryError::Conflict`] wherever they are raised, reads
//! included.

use super::{
    conversion::{
        courier_to_row, order_to_row, parcel_to_row, payment_to_row, row_to_courier, row_to_order,
        row_to_parcel, row_to_payment, rows_to_task, task_item_rows, task_to_row,
    },
    models::{CourierRow, OrderRow, ParcelRow, PaymentRow, TaskItemRow, TaskRow},
    schema::{couriers, orders, parcels, payments, task_items, tasks},
};
use crate::delivery::{
    domain::{Courier, Order, OrderId, Parcel, ParcelId, Payment, PersonId, Task, TaskId, TaskItemId},
    ports::{
        DeliveryRepositoryError, DeliveryRepositoryResult, DeliveryStore, DeliveryTransaction,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;
use uuid::Uuid;

/// `PostgreSQL` connection pool type used by delivery adapters.
pub type DeliveryPgPool = Pool<ConnectionManager<PgConnection>>;

const LIVE_PARCEL_INDEX: &str = "idx_task_items_live_parcel";
const TASKS_PRIMARY_KEY: &str = "tasks_pkey";

/// `PostgreSQL`-backed delivery store.
#[derive(Debug, Clone)]
pub struct PostgresDeliveryStore {
    pool: DeliveryPgPool,
}

impl PostgresDeliveryStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: DeliveryPgPool) -> Self {
        Self { pool }
    }
}

/// Separates the caller's error from a database failure inside a
/// transaction so Diesel can roll back on either.
enum TransactionError<E> {
    Work(E),
    Database(DieselError),
}

impl<E> From<DieselError> for TransactionError<E> {
    fn from(err: DieselError) -> Self {
        Self::Database(err)
    }
}

#[async_trait]
impl DeliveryStore for PostgresDeliveryStore {
    async fn transact<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn DeliveryTransaction) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DeliveryRepositoryError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(DeliveryRepositoryError::persistence)?;
            connection
                .build_transaction()
                .serializable()
                .run(|tx_connection| {
                    let mut transaction = PgDeliveryTransaction {
                        connection: tx_connection,
                    };
                    work(&mut transaction as &mut dyn DeliveryTransaction)
                        .map_err(TransactionError::Work)
                })
                .map_err(|err| match err {
                    TransactionError::Work(work_err) => work_err,
                    TransactionError::Database(db_err) => E::from(map_db_error(db_err)),
                })
        })
        .await
        .map_err(|err| E::from(DeliveryRepositoryError::persistence(err)))?
    }
}

struct PgDeliveryTransaction<'a> {
    connection: &'a mut PgConnection,
}

impl DeliveryTransaction for PgDeliveryTransaction<'_> {
    fn find_courier(&mut self, id: PersonId) -> DeliveryRepositoryResult<Option<Courier>> {
        let row = couriers::table
            .find(id.into_inner())
            .select(CourierRow::as_select())
            .first::<CourierRow>(self.connection)
            .optional()
            .map_err(map_db_error)?;
        Ok(row.map(row_to_courier))
    }

    fn save_courier(&mut self, courier: &Courier) -> DeliveryRepositoryResult<()> {
        diesel::insert_into(couriers::table)
            .values(&courier_to_row(courier))
            .on_conflict(couriers::id)
            .do_update()
            .set((
                couriers::name.eq(excluded(couriers::name)),
                couriers::has_active_task.eq(excluded(couriers::has_active_task)),
            ))
            .execute(self.connection)
            .map_err(map_db_error)?;
        Ok(())
    }

    fn find_parcel(&mut self, id: ParcelId) -> DeliveryRepositoryResult<Option<Parcel>> {
        let row = parcels::table
            .find(id.into_inner())
            .select(ParcelRow::as_select())
            .for_update()
            .first::<ParcelRow>(self.connection)
            .optional()
            .map_err(map_db_error)?;
        row.map(row_to_parcel).transpose()
    }

    fn find_parcels(&mut self, ids: &[ParcelId]) -> DeliveryRepositoryResult<Vec<Parcel>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = parcels::table
            .filter(parcels::id.eq_any(uuids))
            .order(parcels::id)
            .select(ParcelRow::as_select())
            .for_update()
            .load::<ParcelRow>(self.connection)
            .map_err(map_db_error)?;
        rows.into_iter().map(row_to_parcel).collect()
    }

    fn save_parcel(&mut self, parcel: &Parcel) -> DeliveryRepositoryResult<()> {
        diesel::insert_into(parcels::table)
            .values(&parcel_to_row(parcel))
            .on_conflict(parcels::id)
            .do_update()
            .set((
                parcels::status.eq(excluded(parcels::status)),
                parcels::assigned.eq(excluded(parcels::assigned)),
            ))
            .execute(self.connection)
            .map_err(map_db_error)?;
        Ok(())
    }

    fn find_order(&mut self, id: OrderId) -> DeliveryRepositoryResult<Option<Order>> {
        let row = orders::table
            .find(id.into_inner())
            .select(OrderRow::as_select())
            .first::<OrderRow>(self.connection)
            .optional()
            .map_err(map_db_error)?;
        row.map(row_to_order).transpose()
    }

    fn find_orders_by_parcels(
        &mut self,
        ids: &[ParcelId],
    ) -> DeliveryRepositoryResult<Vec<Order>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = orders::table
            .filter(orders::parcel_id.eq_any(uuids))
            .select(OrderRow::as_select())
            .load::<OrderRow>(self.connection)
            .map_err(map_db_error)?;
        rows.into_iter().map(row_to_order).collect()
    }

    fn save_order(&mut self, order: &Order) -> DeliveryRepositoryResult<()> {
        diesel::insert_into(orders::table)
            .values(&order_to_row(order))
            .on_conflict(orders::id)
            .do_update()
            .set(orders::status.eq(excluded(orders::status)))
            .execute(self.connection)
            .map_err(map_db_error)?;
        Ok(())
    }

    fn find_payment_by_order(
        &mut self,
        order_id: OrderId,
    ) -> DeliveryRepositoryResult<Option<Payment>> {
        let row = payments::table
            .filter(payments::order_id.eq(order_id.into_inner()))
            .select(PaymentRow::as_select())
            .first::<PaymentRow>(self.connection)
            .optional()
            .map_err(map_db_error)?;
        row.map(row_to_payment).transpose()
    }

    fn save_payment(&mut self, payment: &Payment) -> DeliveryRepositoryResult<()> {
        diesel::insert_into(payments::table)
            .values(&payment_to_row(payment))
            .on_conflict(payments::id)
            .do_update()
            .set(payments::status.eq(excluded(payments::status)))
            .execute(self.connection)
            .map_err(map_db_error)?;
        Ok(())
    }

    fn insert_task(&mut self, task: &Task) -> DeliveryRepositoryResult<()> {
        let task_id = task.id();
        diesel::insert_into(tasks::table)
            .values(&task_to_row(task))
            .execute(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                    if has_constraint(info.as_ref(), TASKS_PRIMARY_KEY) =>
                {
                    DeliveryRepositoryError::DuplicateTask(task_id)
                }
                _ => map_db_error(err),
            })?;
        self.upsert_items(task)
    }

    fn update_task(&mut self, task: &Task) -> DeliveryRepositoryResult<()> {
        let row = task_to_row(task);
        let updated = diesel::update(tasks::table.find(row.id))
            .set((
                tasks::canceled_by_admin_id.eq(row.canceled_by_admin_id),
                tasks::delivery_status.eq(&row.delivery_status),
                tasks::completed_at.eq(row.completed_at),
            ))
            .execute(self.connection)
            .map_err(map_db_error)?;
        if updated == 0 {
            return Err(DeliveryRepositoryError::TaskNotFound(task.id()));
        }
        self.upsert_items(task)
    }

    fn find_task(&mut self, id: TaskId) -> DeliveryRepositoryResult<Option<Task>> {
        let Some(row) = tasks::table
            .find(id.into_inner())
            .select(TaskRow::as_select())
            .first::<TaskRow>(self.connection)
            .optional()
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };
        let item_rows = task_items::table
            .filter(task_items::task_id.eq(row.id))
            .order(task_items::position)
            .select(TaskItemRow::as_select())
            .load::<TaskItemRow>(self.connection)
            .map_err(map_db_error)?;
        rows_to_task(row, item_rows).map(Some)
    }

    fn find_task_by_item(&mut self, item_id: TaskItemId) -> DeliveryRepositoryResult<Option<Task>> {
        let task_id = task_items::table
            .find(item_id.into_inner())
            .select(task_items::task_id)
            .first::<Uuid>(self.connection)
            .optional()
            .map_err(map_db_error)?;
        match task_id {
            Some(found) => self.find_task(TaskId::from_uuid(found)),
            None => Ok(None),
        }
    }
}

impl PgDeliveryTransaction<'_> {
    fn upsert_items(&mut self, task: &Task) -> DeliveryRepositoryResult<()> {
        for item_row in task_item_rows(task)? {
            diesel::insert_into(task_items::table)
                .values(&item_row)
                .on_conflict(task_items::id)
                .do_update()
                .set((
                    task_items::parcel_id.eq(excluded(task_items::parcel_id)),
                    task_items::status.eq(excluded(task_items::status)),
                    task_items::notes.eq(excluded(task_items::notes)),
                    task_items::live.eq(excluded(task_items::live)),
                ))
                .execute(self.connection)
                .map_err(map_db_error)?;
        }
        Ok(())
    }
}

/// Maps Diesel failures from reads and writes alike, turning contention
/// into retryable conflicts.
fn map_db_error(err: DieselError) -> DeliveryRepositoryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, ref info) => {
            DeliveryRepositoryError::Conflict(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            if has_constraint(info.as_ref(), LIVE_PARCEL_INDEX) =>
        {
            DeliveryRepositoryError::Conflict(info.message().to_owned())
        }
        _ => DeliveryRepositoryError::persistence(err),
    }
}

fn has_constraint(info: &dyn DatabaseErrorInformation, constraint: &str) -> bool {
    info.constraint_name().is_some_and(|name| name == constraint)
}
