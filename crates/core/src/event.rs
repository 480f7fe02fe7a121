// SPDX-License-Identifier: MIT

//! Event types persisted to the write-ahead log (§0): the domain facts
//! `hygiene-storage`'s `MaterializedState` replays to rebuild in-memory
//! collections. Pure data — no behavior, no I/O.

use crate::enums::{ControlAction, ControlTarget, Stage, Status, TicketEventKind};
use crate::ids::{SnapshotId, TicketId};
use crate::ticket::{DetailsDelta, TicketDetails};
use serde::{Deserialize, Serialize};

/// Serializes with `{"type": "host:saved", ...}`-style tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "host:upserted")]
    HostUpserted {
        ip_int: u32,
        owner: String,
        stage: Stage,
        status: Status,
        priority: i32,
        r: f64,
        up: bool,
        reason: String,
        time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "host:transitioned")]
    HostTransitioned {
        ip_int: u32,
        from_stage: Stage,
        from_status: Status,
        to_stage: Stage,
        to_status: Status,
        time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "tally:transferred")]
    TallyTransferred {
        owner: String,
        stage: Stage,
        from: Status,
        to: Status,
        count: u64,
        time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "tally:synced")]
    TallySynced {
        owner: String,
        time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "request:saved")]
    RequestSaved {
        owner: String,
        parent: Option<String>,
    },

    #[serde(rename = "ticket:opened")]
    TicketOpened {
        ticket_id: TicketId,
        ip_int: u32,
        port: u16,
        protocol: String,
        source: String,
        source_id: String,
        owner: String,
        details: TicketDetails,
        time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "ticket:event_appended")]
    TicketEventAppended {
        ticket_id: TicketId,
        action: TicketEventKind,
        reason: Option<String>,
        delta: Vec<DetailsDelta>,
        time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "ticket:owner_changed")]
    TicketOwnerChanged {
        ticket_id: TicketId,
        from: String,
        to: String,
        time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "scandoc:saved")]
    ScanDocSaved {
        owner: String,
        ip_int: u32,
        kind: crate::scandoc::ScanDocKind,
        time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "scandoc:tagged")]
    ScanDocTagged {
        owner: String,
        ip_int: u32,
        kind: crate::scandoc::ScanDocKind,
        snapshot: SnapshotId,
    },

    #[serde(rename = "snapshot:saved")]
    SnapshotSaved {
        id: SnapshotId,
        owner: String,
        start_time: chrono::DateTime<chrono::Utc>,
        end_time: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename = "control:issued")]
    ControlIssued {
        action: ControlAction,
        target: ControlTarget,
        sender: String,
        reason: String,
    },

    #[serde(rename = "control:acknowledged")]
    ControlAcknowledged {
        action: ControlAction,
        target: ControlTarget,
    },

    #[serde(rename = "owner:renamed")]
    OwnerRenamed { from: String, to: String },
}
