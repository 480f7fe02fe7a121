// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hygiene-storage: the store contract (C3). A JSONL write-ahead log of
//! domain events, a zstd checkpoint writer, an in-memory materialized state
//! standing in for the indexed document store (§1, §6), and the versioned
//! YAML configuration loader.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod state;
pub mod wal;

pub use checkpoint::{load_checkpoint, CheckpointRecord, Checkpointer};
pub use config::{Config, ServiceConfig, StoreSection};
pub use error::StoreError;
pub use state::MaterializedState;
pub use wal::{Wal, WalEntry};

use std::path::Path;

/// Open the store for a given state directory: load the last checkpoint (if
/// any), open the WAL at the checkpoint's sequence, and replay unprocessed
/// entries (§0 crash recovery).
pub fn recover(state_dir: &Path) -> Result<(MaterializedState, Wal), StoreError> {
    let snapshot_path = state_dir.join("snapshot.zst");
    let wal_path = state_dir.join("events.wal");

    let (mut state, seq) = match load_checkpoint(&snapshot_path)? {
        Some(record) => (record.state, record.seq),
        None => (MaterializedState::default(), 0),
    };

    let wal = Wal::open(&wal_path, seq)?;
    for entry in wal.entries_after(seq)? {
        state.apply_event(&entry.event);
    }

    Ok((state, wal))
}

/// Checkpoint `state` to `state_dir` and truncate the WAL up to its current
/// write position (§0). Shared by the daemon's periodic checkpoint task and
/// the CLI's one-shot load/mutate/save commands.
pub fn checkpoint(state_dir: &Path, wal: &mut Wal, state: &MaterializedState) -> Result<(), StoreError> {
    let snapshot_path = state_dir.join("snapshot.zst");
    let seq = wal.write_seq();
    Checkpointer::new(snapshot_path).checkpoint_sync(seq, state)?;
    wal.mark_processed(seq);
    wal.truncate_before(seq)
}
