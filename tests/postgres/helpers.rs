//! Shared test helpers for `PostgreSQL` integration tests.

pub use super::cluster::{PostgresCluster, postgres_cluster};
use super::cluster::TemporaryDatabase;
use courier_dispatch::delivery::adapters::postgres::{
    CREATE_DELIVERY_TABLES_SQL, DeliveryPgPool, PostgresDeliveryStore,
};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use tokio::runtime::Runtime;
use uuid::Uuid;

/// Template database holding the migrated delivery schema.
pub const TEMPLATE_DB: &str = "courier_test_template";

/// A store bound to a private database cloned from [`TEMPLATE_DB`].
///
/// The database is dropped with this value; the store field is declared
/// first so its pool closes before the database goes.
pub struct TestDatabase {
    /// Store under test.
    pub store: PostgresDeliveryStore,
    _database: TemporaryDatabase,
}

impl TestDatabase {
    /// Migrates the template on first use and clones a fresh database.
    ///
    /// # Errors
    ///
    /// Returns an error if the template, the clone or the pool fails.
    pub fn create(cluster: PostgresCluster) -> eyre::Result<Self> {
        cluster.ensure_template(TEMPLATE_DB, |url| {
            let mut connection = PgConnection::establish(url)?;
            connection.batch_execute(CREATE_DELIVERY_TABLES_SQL)?;
            Ok(())
        })?;
        let database =
            cluster.temporary_database(&format!("courier_{}", Uuid::new_v4().simple()), TEMPLATE_DB)?;
        let pool: DeliveryPgPool = Pool::builder()
            .max_size(4)
            .build(ConnectionManager::<PgConnection>::new(database.url()))?;
        Ok(Self {
            store: PostgresDeliveryStore::new(pool),
            _database: database,
        })
    }
}

/// Multi-threaded runtime so spawned units of work can overlap.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built.
pub fn test_runtime() -> eyre::Result<Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?)
}
