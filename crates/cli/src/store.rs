// SPDX-License-Identifier: MIT

//! One-shot load/mutate/save helper shared by every subcommand.

use hygiene_storage::{MaterializedState, StoreError};
use std::path::Path;

/// Recover state, hand it to `f` for mutation, then checkpoint the result.
/// `f` returns whatever the caller wants printed; the checkpoint only runs
/// if `f` succeeds.
pub fn with_state<T>(
    state_dir: &Path,
    f: impl FnOnce(&mut MaterializedState) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    std::fs::create_dir_all(state_dir)?;
    let (mut state, mut wal) = hygiene_storage::recover(state_dir)?;
    let result = f(&mut state)?;
    checkpoint(state_dir, &mut wal, &state)?;
    Ok(result)
}

fn checkpoint(
    state_dir: &Path,
    wal: &mut hygiene_storage::Wal,
    state: &MaterializedState,
) -> Result<(), StoreError> {
    hygiene_storage::checkpoint(state_dir, wal, state)
}
