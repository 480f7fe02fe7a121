// SPDX-License-Identifier: MIT

//! Enum registry (C1): named constants for stages, statuses, ticket events,
//! and control actions. Serialize with the bit-exact string values named in
//! spec §6.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner id reserved for findings with no associated owning organization
/// (§6, §4.4 vuln manager step 3).
pub const UNKNOWN_OWNER: &str = "UNKNOWN";

/// The macro step in the scanning pipeline a host is in (§GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Netscan1,
    Netscan2,
    Portscan,
    Vulnscan,
    Basescan,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Netscan1,
        Stage::Netscan2,
        Stage::Portscan,
        Stage::Vulnscan,
        Stage::Basescan,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Netscan1 => "NETSCAN1",
            Stage::Netscan2 => "NETSCAN2",
            Stage::Portscan => "PORTSCAN",
            Stage::Vulnscan => "VULNSCAN",
            Stage::Basescan => "BASESCAN",
        };
        write!(f, "{s}")
    }
}

/// The micro state within a stage (§GLOSSARY): WAITING → READY → RUNNING → DONE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Waiting,
    Ready,
    Running,
    Done,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Waiting,
        Status::Ready,
        Status::Running,
        Status::Done,
    ];
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Waiting => "WAITING",
            Status::Ready => "READY",
            Status::Running => "RUNNING",
            Status::Done => "DONE",
        };
        write!(f, "{s}")
    }
}

/// Append-only ticket lifecycle event kinds (§3 Ticket, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketEventKind {
    Opened,
    Reopened,
    Verified,
    Unverified,
    Closed,
    Changed,
}

impl fmt::Display for TicketEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketEventKind::Opened => "OPENED",
            TicketEventKind::Reopened => "REOPENED",
            TicketEventKind::Verified => "VERIFIED",
            TicketEventKind::Unverified => "UNVERIFIED",
            TicketEventKind::Closed => "CLOSED",
            TicketEventKind::Changed => "CHANGED",
        };
        write!(f, "{s}")
    }
}

/// Agency classification of an owning organization (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgencyType {
    Federal,
    State,
    Local,
    Private,
    Tribal,
    Territorial,
    International,
}

/// Action requested over the control channel (C10, §4.6, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlAction {
    Pause,
    Stop,
}

/// Target of a control request (C10, §6). Only one target exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlTarget {
    Commander,
}

/// One of the three scan-result sources a ticket can be opened against
/// (§4.4). Also doubles as the `source` field recorded on a `Ticket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketSource {
    Vulnscan,
    Portscan,
    Netscan,
}
