//! Runs embedded `PostgreSQL` lifecycle steps on behalf of the test cluster.
//!
//! Usage:
//!
//! ```text
//! pg_worker <setup|start|stop> <payload-path>
//! ```
//!
//! The payload is the JSON [`WorkerPayload`] written by
//! `pg-embed-setup-unpriv`: the cluster settings plus environment overrides.
//! When started as root the worker re-executes itself as `nobody`, since
//! `initdb` and `postgres` refuse to run with root privileges.
//!
//! [`WorkerPayload`]: pg_embedded_setup_unpriv::worker::WorkerPayload

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(unix)]
fn main() -> Result<(), BoxError> {
    unix::run().map_err(Into::into)
}

#[cfg(not(unix))]
fn main() -> Result<(), BoxError> {
    Err("pg_worker only runs on Unix platforms".into())
}

#[cfg(unix)]
mod unix {
    use camino::{Utf8Path, Utf8PathBuf};
    use nix::unistd::{Uid, User, initgroups, setgid, setuid};
    use pg_embedded_setup_unpriv::ambient_dir_and_path;
    use pg_embedded_setup_unpriv::worker::{PlainSecret, WorkerPayload};
    use postgresql_embedded::{PostgreSQL, Status};
    use std::env;
    use std::ffi::CString;
    use std::io::{self, Read};
    use std::process::{Command, ExitStatus};
    use std::str::FromStr;
    use thiserror::Error;

    const REEXEC_MARKER: &str = "PG_WORKER_REEXEC";
    const TRUSTED_PATH: &str = "/usr/sbin:/usr/bin:/sbin:/bin";
    const UNPRIVILEGED_USER: &str = "nobody";

    #[derive(Debug, Error)]
    pub enum PgWorkerError {
        #[error("usage error: {0}")]
        Usage(String),
        #[error("failed to read payload {path}: {source}")]
        PayloadRead {
            path: Utf8PathBuf,
            #[source]
            source: super::BoxError,
        },
        #[error("failed to parse payload: {0}")]
        PayloadParse(#[from] serde_json::Error),
        #[error("invalid cluster settings: {0}")]
        Settings(String),
        #[error("failed to build runtime: {0}")]
        Runtime(#[source] io::Error),
        #[error("failed to drop privileges: {0}")]
        PrivilegeDrop(String),
        #[error("postgres {operation} failed: {reason}")]
        Postgres {
            operation: Operation,
            reason: String,
        },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Operation {
        Setup,
        Start,
        Stop,
    }

    impl FromStr for Operation {
        type Err = PgWorkerError;

        fn from_str(value: &str) -> Result<Self, Self::Err> {
            match value {
                "setup" => Ok(Self::Setup),
                "start" => Ok(Self::Start),
                "stop" => Ok(Self::Stop),
                other => Err(PgWorkerError::Usage(format!(
                    "unknown operation '{other}', expected setup, start or stop"
                ))),
            }
        }
    }

    impl std::fmt::Display for Operation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(match self {
                Self::Setup => "setup",
                Self::Start => "start",
                Self::Stop => "stop",
            })
        }
    }

    struct Invocation {
        operation: Operation,
        payload_path: Utf8PathBuf,
        raw_args: Vec<String>,
    }

    pub fn run() -> Result<(), PgWorkerError> {
        let invocation = parse_invocation(env::args_os().skip(1))?;
        if Uid::effective().is_root() && env::var_os(REEXEC_MARKER).is_none() {
            let status = reexec_unprivileged(&invocation.raw_args)?;
            std::process::exit(status.code().unwrap_or(1));
        }

        let payload = read_payload(&invocation.payload_path)?;
        drop_root_privileges()?;
        let settings = payload
            .settings
            .into_settings()
            .map_err(|err| PgWorkerError::Settings(err.to_string()))?;
        apply_environment(&payload.environment);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(PgWorkerError::Runtime)?;
        let operation = invocation.operation;
        runtime.block_on(async move {
            let mut postgres = PostgreSQL::new(settings);
            let outcome = match operation {
                Operation::Setup => match postgres.setup().await {
                    Ok(()) => start_if_stopped(&mut postgres).await,
                    Err(err) => Err(err),
                },
                Operation::Start => start_if_stopped(&mut postgres).await,
                Operation::Stop => postgres.stop().await,
            };
            outcome.map_err(|err| PgWorkerError::Postgres {
                operation,
                reason: err.to_string(),
            })?;
            if operation == Operation::Start {
                // The server must outlive this process.
                std::mem::forget(postgres);
            }
            Ok(())
        })
    }

    fn parse_invocation(
        args: impl Iterator<Item = std::ffi::OsString>,
    ) -> Result<Invocation, PgWorkerError> {
        let raw_args = args
            .map(|arg| {
                arg.into_string()
                    .map_err(|_| PgWorkerError::Usage("arguments must be valid UTF-8".to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let [operation_arg, path_arg] = raw_args.as_slice() else {
            return Err(PgWorkerError::Usage(format!(
                "expected <operation> <payload-path>, got {} argument(s)",
                raw_args.len()
            )));
        };
        let operation = operation_arg.parse()?;
        let payload_path = Utf8PathBuf::from(path_arg);
        Ok(Invocation {
            operation,
            payload_path,
            raw_args,
        })
    }

    async fn start_if_stopped(
        postgres: &mut PostgreSQL,
    ) -> Result<(), postgresql_embedded::Error> {
        if matches!(postgres.status(), Status::Started) {
            return Ok(());
        }
        postgres.start().await
    }

    fn read_payload(path: &Utf8Path) -> Result<WorkerPayload, PgWorkerError> {
        let read = || -> Result<Vec<u8>, super::BoxError> {
            let (dir, relative) = ambient_dir_and_path(path)?;
            let mut file = dir.open(relative.as_std_path())?;
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            Ok(bytes)
        };
        let bytes = read().map_err(|source| PgWorkerError::PayloadRead {
            path: path.to_owned(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn reexec_unprivileged(args: &[String]) -> Result<ExitStatus, PgWorkerError> {
        let exe = env::current_exe().map_err(|err| PgWorkerError::PrivilegeDrop(err.to_string()))?;
        let spawned = Command::new("runuser")
            .args(["-u", UNPRIVILEGED_USER, "--"])
            .arg(&exe)
            .args(args)
            .env(REEXEC_MARKER, "1")
            .env("PATH", TRUSTED_PATH)
            .status();
        match spawned {
            Ok(status) => Ok(status),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let exe_text = exe.to_str().ok_or_else(|| {
                    PgWorkerError::PrivilegeDrop("executable path is not valid UTF-8".to_owned())
                })?;
                let mut command = format!("{REEXEC_MARKER}=1 exec {}", shell_quote(exe_text));
                for arg in args {
                    command.push(' ');
                    command.push_str(&shell_quote(arg));
                }
                Command::new("/bin/su")
                    .args(["-s", "/bin/sh", UNPRIVILEGED_USER, "-c"])
                    .arg(command)
                    .env("PATH", TRUSTED_PATH)
                    .status()
                    .map_err(|su_err| PgWorkerError::PrivilegeDrop(su_err.to_string()))
            }
            Err(err) => Err(PgWorkerError::PrivilegeDrop(err.to_string())),
        }
    }

    fn drop_root_privileges() -> Result<(), PgWorkerError> {
        if !Uid::effective().is_root() {
            return Ok(());
        }
        let privilege_error = |err: nix::Error| PgWorkerError::PrivilegeDrop(err.to_string());
        let user = User::from_name(UNPRIVILEGED_USER)
            .map_err(privilege_error)?
            .ok_or_else(|| {
                PgWorkerError::PrivilegeDrop(format!("user '{UNPRIVILEGED_USER}' not found"))
            })?;
        let name = CString::new(user.name.clone())
            .map_err(|err| PgWorkerError::PrivilegeDrop(err.to_string()))?;
        initgroups(&name, user.gid).map_err(privilege_error)?;
        setgid(user.gid).map_err(privilege_error)?;
        setuid(user.uid).map_err(privilege_error)?;

        // SAFETY: no other thread exists yet; the runtime is built afterwards.
        unsafe {
            env::set_var("HOME", &user.dir);
            env::set_var("USER", &user.name);
            env::set_var("LOGNAME", &user.name);
        }
        Ok(())
    }

    fn apply_environment(environment: &[(String, Option<PlainSecret>)]) {
        for (key, value) in environment {
            // SAFETY: called before the runtime starts, while single-threaded.
            unsafe {
                match value {
                    Some(secret) => env::set_var(key, secret.expose()),
                    None => env::remove_var(key),
                }
            }
        }
    }

    /// Wraps `value` in single quotes for `sh -c`.
    fn shell_quote(value: &str) -> String {
        format!("'{}'", value.replace('\'', "'\\''"))
    }

}
