// SPDX-License-Identifier: MIT

//! zstd-compressed checkpoints of [`MaterializedState`] (§0): write to a
//! `.tmp` file, fsync, atomically rename, fsync the directory. The WAL is
//! only safe to truncate once a checkpoint's `checkpoint_sync` has returned
//! successfully.

use crate::state::MaterializedState;
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

pub struct Checkpointer {
    snapshot_path: PathBuf,
    compression_level: i32,
}

impl Checkpointer {
    pub fn new(snapshot_path: PathBuf) -> Self {
        Self {
            snapshot_path,
            compression_level: 3,
        }
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Serialize, compress, and durably write a checkpoint. Synchronous:
    /// the daemon's tick loop is not latency-sensitive enough to need a
    /// background-thread variant (§0).
    pub fn checkpoint_sync(
        &self,
        seq: u64,
        state: &MaterializedState,
    ) -> Result<(), StoreError> {
        let record = CheckpointRecord {
            seq,
            state: state.clone(),
            created_at: chrono::Utc::now(),
        };
        let json_bytes = serde_json::to_vec(&record)?;
        let compressed = zstd::encode_all(json_bytes.as_slice(), self.compression_level)
            .map_err(|e| StoreError::Compress(e.to_string()))?;

        if let Some(parent) = self.snapshot_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.snapshot_path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&compressed)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.snapshot_path)?;
        if let Some(parent) = self.snapshot_path.parent() {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }
}

/// Load a zstd-compressed checkpoint, if one exists.
pub fn load_checkpoint(path: &Path) -> Result<Option<CheckpointRecord>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let decoder = zstd::stream::read::Decoder::new(file)
        .map_err(|e| StoreError::Compress(e.to_string()))?;
    let record: CheckpointRecord = serde_json::from_reader(decoder)?;
    Ok(Some(record))
}
