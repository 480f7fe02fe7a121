// SPDX-License-Identifier: MIT

//! Daemon lifecycle management: single-instance locking, directory layout,
//! and startup recovery (§0, §5).

use std::fs::File;
use std::path::PathBuf;

use fs2::FileExt;
use hygiene_storage::{MaterializedState, StoreError, Wal};
use thiserror::Error;
use tracing::info;

use crate::env::state_dir;

/// Daemon configuration: fixed paths under the resolved state directory, one
/// daemon serving the whole platform.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/hygiene).
    pub state_dir: PathBuf,
    /// Path to lock/PID file.
    pub lock_path: PathBuf,
    /// Path to daemon log file.
    pub log_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            state_dir,
        })
    }
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Running daemon state: the lock file held for the process lifetime plus
/// the recovered materialized state and its WAL handle.
pub struct DaemonState {
    pub config: Config,
    #[allow(dead_code)]
    lock_file: File,
    pub state: MaterializedState,
    pub wal: Wal,
}

/// Acquire the single-instance lock, create the state directory, and
/// recover materialized state from the last checkpoint + WAL (§0 crash
/// recovery).
pub fn startup(config: Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    let (state, wal) = hygiene_storage::recover(&config.state_dir)?;
    info!(
        hosts = state.hosts.len(),
        tickets = state.tickets.len(),
        "recovered materialized state"
    );

    Ok(DaemonState {
        config,
        lock_file,
        state,
        wal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn startup_recovers_empty_state_in_a_fresh_directory() {
        let dir = tempdir().unwrap();
        let config = Config {
            lock_path: dir.path().join("daemon.pid"),
            log_path: dir.path().join("daemon.log"),
            state_dir: dir.path().to_path_buf(),
        };
        let daemon = startup(config).unwrap();
        assert!(daemon.state.hosts.is_empty());
    }

    #[test]
    fn startup_fails_when_lock_is_already_held() {
        let dir = tempdir().unwrap();
        let config = Config {
            lock_path: dir.path().join("daemon.pid"),
            log_path: dir.path().join("daemon.log"),
            state_dir: dir.path().to_path_buf(),
        };
        let _first = startup(config.clone()).unwrap();
        let err = startup(config).unwrap_err();
        assert!(matches!(err, LifecycleError::LockFailed(_)));
    }
}
