// SPDX-License-Identifier: MIT

//! Storage-layer errors (§7): WAL/checkpoint I/O, and configuration
//! failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt WAL entry at offset {offset}: {message}")]
    CorruptWal { offset: u64, message: String },

    #[error("compression error: {0}")]
    Compress(String),

    #[error(
        "snapshot collision on (owner={owner}, start_time={start_time}, end_time={end_time}) \
         could not be resolved by advancing end_time"
    )]
    SnapshotCollision {
        owner: String,
        start_time: chrono::DateTime<chrono::Utc>,
        end_time: chrono::DateTime<chrono::Utc>,
    },

    #[error("config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config service {service:?} not found")]
    ConfigMissingService { service: String },

    #[error("config service {service:?} has no section {section:?}")]
    ConfigMissingSection { service: String, section: String },

    #[error("config version {found:?} is not supported (only \"1\" is)")]
    ConfigVersionMismatch { found: String },
}
