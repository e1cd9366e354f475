//! Process-wide helpers shared by integration test binaries.

use camino::Utf8PathBuf;
use std::env;
use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, OnceLock};

static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

const WORKER_NAME: &str = "pg_worker";

/// Applies environment changes and restores the previous values on drop.
///
/// Holding the guard serializes every other guard in the process.
pub struct EnvVarGuard {
    restore: Vec<(OsString, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    /// Sets (`Some`) or removes (`None`) each variable in `changes`.
    pub fn set_many(changes: &[(OsString, Option<OsString>)]) -> Self {
        let lock = ENV_MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let restore = changes
            .iter()
            .map(|(key, value)| {
                let previous = env::var_os(key);
                apply(key, value.as_ref());
                (key.clone(), previous)
            })
            .collect();
        Self {
            restore,
            _lock: lock,
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, previous) in self.restore.drain(..).rev() {
            apply(&key, previous.as_ref());
        }
    }
}

fn apply(key: &OsString, value: Option<&OsString>) {
    // SAFETY: ENV_MUTEX serializes environment mutation across tests.
    unsafe {
        match value {
            Some(new_value) => env::set_var(key, new_value),
            None => env::remove_var(key),
        }
    }
}

/// Finds the `pg_worker` binary built alongside the tests.
///
/// Cargo's compile-time path wins, then `PG_EMBEDDED_WORKER`, then the
/// target directory next to the running test binary, then `PATH`.
pub fn locate_pg_worker_path() -> Option<Utf8PathBuf> {
    option_env!("CARGO_BIN_EXE_pg_worker")
        .map(Utf8PathBuf::from)
        .filter(|path| path.is_file())
        .or_else(worker_from_env)
        .or_else(worker_near_target)
        .or_else(worker_in_path)
}

fn worker_from_env() -> Option<Utf8PathBuf> {
    let path = utf8(env::var_os("PG_EMBEDDED_WORKER")?)?;
    (path.file_stem() == Some(WORKER_NAME) && path.is_file()).then_some(path)
}

fn worker_near_target() -> Option<Utf8PathBuf> {
    let exe = utf8(env::current_exe().ok()?.into_os_string())?;
    let candidate = exe.parent()?.parent()?.join(WORKER_NAME);
    candidate.is_file().then_some(candidate)
}

fn worker_in_path() -> Option<Utf8PathBuf> {
    let search_path = env::var_os("PATH")?;
    env::split_paths(&search_path)
        .filter_map(|dir| utf8(dir.into_os_string()))
        .map(|dir| dir.join(WORKER_NAME))
        .find(|candidate| candidate.is_file())
}

fn utf8(value: OsString) -> Option<Utf8PathBuf> {
    value.into_string().ok().map(Utf8PathBuf::from)
}
