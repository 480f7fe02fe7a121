// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hygiene-core: pure domain model and state machines for the Cyber Hygiene
//! scan-orchestration core.
//!
//! Nothing in this crate performs I/O. Every entity is a plain typed record;
//! every transition is a pure function from (state, signals) to new state.
//! Persistence, aggregation, and the store contract live in `hygiene-storage`;
//! orchestration that reads "now" or talks to the store lives in
//! `hygiene-engine`.

pub mod clock;
pub mod control;
pub mod enums;
pub mod error;
pub mod event;
pub mod host;
pub mod ids;
pub mod notification;
pub mod request;
pub mod scandoc;
pub mod scheduler;
pub mod snapshot;
pub mod tally;
pub mod ticket;
pub mod window;

pub use clock::{Clock, FakeClock, SystemClock};
pub use control::SystemControl;
pub use enums::{
    AgencyType, ControlAction, ControlTarget, Stage, Status, TicketEventKind, TicketSource,
    UNKNOWN_OWNER,
};
pub use error::Error;
pub use event::Event;
pub use host::{
    next_state, recompute_up_state, Host, HostState, HostTransitionSignals, Transition,
};
pub use ids::{NotificationId, SnapshotId, TicketId};
pub use notification::Notification;
pub use request::{default_scan_limits, descendants, Request, ScanLimits, ScanWindow};
pub use scandoc::{HostScanDoc, PortScanDoc, ScanDocHeader, ScanDocKind, VulnScanDoc};
pub use scheduler::{adjust_priority, hours_for_priority, priority_for_severity, PriorityAdjustment};
pub use snapshot::{safe_div, ServiceCount, SeverityCounts, Snapshot, TicketAgeStats};
pub use tally::{StageCounts, Tally};
pub use ticket::{DetailsDelta, Ticket, TicketDetails, TicketEvent};
pub use window::in_any_window;
