//! Applies the delivery schema to the database named by `DATABASE_URL`.
//!
//! Usage:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/courier courier_migrate
//! ```
//!
//! Settings are read from the environment and an optional `.env` file. The
//! schema is applied inside one transaction, so a failed run leaves the
//! database unchanged.

use courier_dispatch::config::{AppConfig, ConfigError};
use courier_dispatch::delivery::adapters::postgres::{CREATE_DELIVERY_TABLES_SQL, DeliveryPgPool};
use courier_dispatch::telemetry::{TelemetryError, init_tracing};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use thiserror::Error;
use tracing::info;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
enum MigrateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to connect to database: {0}")]
    Connect(#[from] PoolError),
    #[error("failed to apply delivery schema: {0}")]
    Apply(#[from] diesel::result::Error),
}

fn main() -> Result<(), BoxError> {
    run().map_err(Into::into)
}

fn run() -> Result<(), MigrateError> {
    let config = AppConfig::from_env()?;
    init_tracing(&config)?;

    let pool: DeliveryPgPool = Pool::builder()
        .max_size(config.pool_size)
        .build(ConnectionManager::<PgConnection>::new(&config.database_url))?;
    let mut connection = pool.get()?;
    connection.transaction(|conn| conn.batch_execute(CREATE_DELIVERY_TABLES_SQL))?;
    info!(pool_size = config.pool_size, "delivery schema applied");
    Ok(())
}
