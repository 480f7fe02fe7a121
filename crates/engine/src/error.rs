// SPDX-License-Identifier: MIT

//! Engine-level errors (§7 "Reference integrity").

use hygiene_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("core error: {0}")]
    Core(#[from] hygiene_core::Error),

    #[error(
        "port-scan document not found for ticket {ticket_id} (scan {scan_id} at {scan_time})"
    )]
    PortScanNotFound {
        ticket_id: String,
        scan_id: String,
        scan_time: chrono::DateTime<chrono::Utc>,
    },

    #[error(
        "vuln-scan document not found for ticket {ticket_id} (scan {scan_id} at {scan_time})"
    )]
    VulnScanNotFound {
        ticket_id: String,
        scan_id: String,
        scan_time: chrono::DateTime<chrono::Utc>,
    },

    #[error("owner {owner:?} already exists, refusing id-update")]
    OwnerAlreadyExists { owner: String },
}
