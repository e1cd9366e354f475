//! Embedded `PostgreSQL` cluster shared by every test in the binary.
//!
//! The cluster boots once per process. Unprivileged runners start it in
//! process; root runners delegate to the `pg_worker` binary, which drops to
//! `nobody`. Each test then works in its own database cloned from a
//! migrated template.


use self::environment::{
    as_os_pairs, sync_password_from_file, sync_port_from_pid, worker_env_changes,
};
use crate::test_helpers::EnvVarGuard;
use diesel::prelude::*;
use eyre::{WrapErr, eyre};
use pg_embedded_setup_unpriv::worker_process_test_api::{
    WorkerOperation, WorkerRequest, WorkerRequestArgs, run as run_worker,
};
use pg_embedded_setup_unpriv::{ExecutionPrivileges, TestBootstrapSettings, bootstrap_for_tests};
use postgresql_embedded::{PostgreSQL, Status};
use rstest::fixture;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tokio::runtime::Runtime;

static SHARED_CLUSTER: OnceLock<Result<ManagedCluster, String>> = OnceLock::new();
static TEMPLATE_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Shared cluster handle handed to tests.
pub type PostgresCluster = &'static ManagedCluster;

/// A running embedded cluster.
pub struct ManagedCluster {
    bootstrap: TestBootstrapSettings,
    env_vars: Vec<(String, Option<String>)>,
    runtime: Option<Runtime>,
    postgres: Option<PostgreSQL>,
}

impl ManagedCluster {
    fn boot() -> eyre::Result<Self> {
        let worker_env = worker_env_changes()?;
        let guard = EnvVarGuard::set_many(&worker_env);
        let bootstrapped = bootstrap_for_tests();
        drop(guard);
        let mut bootstrap = bootstrapped.wrap_err("bootstrapping embedded postgres")?;
        sync_password_from_file(&mut bootstrap.settings)?;
        let env_vars = bootstrap.environment.to_env();
        let mut cluster = Self {
            bootstrap,
            env_vars,
            runtime: None,
            postgres: None,
        };
        match cluster.bootstrap.privileges {
            ExecutionPrivileges::Root => cluster.start_via_worker()?,
            ExecutionPrivileges::Unprivileged => cluster.start_in_process()?,
        }
        Ok(cluster)
    }

    /// Connection URL for `database` on this cluster.
    #[must_use]
    pub fn database_url(&self, database: &str) -> String {
        self.bootstrap.settings.url(database)
    }

    /// Creates `template` and runs `migrate` against it unless it exists.
    ///
    /// A template whose migration fails is dropped again.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin queries or `migrate` fail.
    pub fn ensure_template<F>(&self, template: &str, migrate: F) -> eyre::Result<()>
    where
        F: FnOnce(&str) -> eyre::Result<()>,
    {
        let _guard = template_lock();
        if self.database_exists(template)? {
            return Ok(());
        }
        self.admin_sql(&format!("CREATE DATABASE {}", quote_identifier(template)))?;
        if let Err(err) = migrate(&self.database_url(template)) {
            self.drop_database(template)?;
            return Err(err);
        }
        Ok(())
    }

    /// Clones `template` into a fresh database dropped with the guard.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn temporary_database(
        &'static self,
        name: &str,
        template: &str,
    ) -> eyre::Result<TemporaryDatabase> {
        let _guard = template_lock();
        self.admin_sql(&format!(
            "CREATE DATABASE {} TEMPLATE {}",
            quote_identifier(name),
            quote_identifier(template),
        ))?;
        Ok(TemporaryDatabase {
            cluster: self,
            name: name.to_owned(),
        })
    }

    fn drop_database(&self, name: &str) -> eyre::Result<()> {
        self.admin_sql(&format!(
            "DROP DATABASE IF EXISTS {} WITH (FORCE)",
            quote_identifier(name)
        ))
    }

    fn start_in_process(&mut self) -> eyre::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let guard = EnvVarGuard::set_many(&as_os_pairs(&self.env_vars));
        let mut postgres = PostgreSQL::new(self.bootstrap.settings.clone());
        let started = runtime.block_on(async {
            postgres.setup().await?;
            if !matches!(postgres.status(), Status::Started) {
                postgres.start().await?;
            }
            Ok::<(), postgresql_embedded::Error>(())
        });
        drop(guard);
        started.wrap_err("starting embedded postgres")?;
        self.bootstrap.settings = postgres.settings().clone();
        sync_port_from_pid(&mut self.bootstrap.settings)?;
        self.runtime = Some(runtime);
        self.postgres = Some(postgres);
        Ok(())
    }

    fn start_via_worker(&mut self) -> eyre::Result<()> {
        self.worker(WorkerOperation::Setup, self.bootstrap.setup_timeout)?;
        self.worker(WorkerOperation::Start, self.bootstrap.start_timeout)?;
        sync_port_from_pid(&mut self.bootstrap.settings)
    }

    fn stop(&mut self) -> eyre::Result<()> {
        match (self.postgres.take(), &self.runtime) {
            (Some(postgres), Some(runtime)) => {
                runtime.block_on(postgres.stop())?;
                Ok(())
            }
            (None, _) if matches!(self.bootstrap.privileges, ExecutionPrivileges::Root) => {
                self.worker(WorkerOperation::Stop, self.bootstrap.shutdown_timeout)
            }
            _ => Ok(()),
        }
    }

    fn worker(&self, operation: WorkerOperation, timeout: Duration) -> eyre::Result<()> {
        let binary = self
            .bootstrap
            .worker_binary
            .as_ref()
            .ok_or_else(|| eyre!("PG_EMBEDDED_WORKER is required when running as root"))?;
        let args = WorkerRequestArgs {
            worker: binary.as_path(),
            settings: &self.bootstrap.settings,
            env_vars: &self.env_vars,
            operation,
            timeout,
        };
        run_worker(&WorkerRequest::new(args)).wrap_err("pg_worker request failed")?;
        Ok(())
    }

    fn admin_sql(&self, sql: &str) -> eyre::Result<()> {
        let mut connection = PgConnection::establish(&self.database_url("postgres"))?;
        diesel::sql_query(sql).execute(&mut connection)?;
        Ok(())
    }

    fn database_exists(&self, name: &str) -> eyre::Result<bool> {
        #[derive(diesel::QueryableByName)]
        struct Exists {
            #[diesel(sql_type = diesel::sql_types::Bool)]
            exists: bool,
        }

        let mut connection = PgConnection::establish(&self.database_url("postgres"))?;
        let row = diesel::sql_query(
            "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1) AS exists",
        )
        .bind::<diesel::sql_types::Text, _>(name)
        .get_result::<Exists>(&mut connection)?;
        Ok(row.exists)
    }
}

impl Drop for ManagedCluster {
    fn drop(&mut self) {
        drop(self.stop());
    }
}

/// A per-test database, dropped (connections and all) with the guard.
pub struct TemporaryDatabase {
    cluster: PostgresCluster,
    name: String,
}

impl TemporaryDatabase {
    /// Connection URL for this database.
    #[must_use]
    pub fn url(&self) -> String {
        self.cluster.database_url(&self.name)
    }
}

impl Drop for TemporaryDatabase {
    fn drop(&mut self) {
        drop(self.cluster.drop_database(&self.name));
    }
}

/// Boots the shared cluster on first use.
///
/// # Errors
///
/// Returns the boot failure, so every test depending on the cluster fails
/// instead of passing vacuously.
#[fixture]
pub fn postgres_cluster() -> eyre::Result<PostgresCluster> {
    SHARED_CLUSTER
        .get_or_init(|| ManagedCluster::boot().map_err(|err| format!("{err:#}")))
        .as_ref()
        .map_err(|reason| eyre!("embedded postgres failed to start: {reason}"))
}

fn template_lock() -> std::sync::MutexGuard<'static, ()> {
    TEMPLATE_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
