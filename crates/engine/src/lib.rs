// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hygiene-engine: the impure orchestration layer for the Cyber Hygiene
//! scan-orchestration core.
//!
//! Everything here reads "now" and mutates a `hygiene_storage::MaterializedState`
//! in place; the pure state machines and document shapes it drives live in
//! `hygiene-core`. One module per orchestration component named in §4:
//! the host state machine driver (C4's impure half), the fleet balancer
//! (C6), the rescan scheduler driver (C7), the three ticket lifecycle
//! managers (C8), the snapshot builder (C9), the control channel (C10), and
//! tally reconciliation (C5's impure half).

pub mod balancer;
pub mod control;
pub mod error;
pub mod host_lifecycle;
pub mod scheduler;
pub mod snapshot_builder;
pub mod tally;
pub mod ticket_lifecycle;

pub use balancer::{effective_limits, reconcile_owner, reconcile_stage, Reconciliation};
pub use control::{issue, poll, ControlState, DEFAULT_POLL_INTERVAL};
pub use error::EngineError;
pub use host_lifecycle::transition_host;
pub use scheduler::{schedule_rescan, sweep};
pub use snapshot_builder::{build_snapshot, tag_documents, world_stats, WorldStats};
pub use tally::{sync_all, sync_owner};
pub use ticket_lifecycle::{
    CveOverride, CveTable, IpPortTicketManager, IpTicketManager, OpenOutcome, PortFinding,
    VulnFinding, VulnTicketManager,
};
