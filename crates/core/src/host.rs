// SPDX-License-Identifier: MIT

//! Host entity and the pure scan-stage state machine (C4, §3, §4.1).

use crate::enums::{Stage, Status};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `state = {up: bool, reason: string}` (§3 Host).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    pub up: bool,
    pub reason: String,
}

impl HostState {
    pub fn new(up: bool, reason: impl Into<String>) -> Self {
        Self {
            up,
            reason: reason.into(),
        }
    }
}

/// A host document, unique by integer form of its IP address (§3 Host).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    /// `_id` — the integer form of the host's IP address.
    pub ip_int: u32,
    pub owner: String,
    pub location: Option<String>,
    pub stage: Stage,
    pub status: Status,
    pub last_change: chrono::DateTime<chrono::Utc>,
    pub next_scan: Option<chrono::DateTime<chrono::Utc>>,
    /// Latest-scan timestamp recorded per stage.
    pub latest_scan: HashMap<Stage, chrono::DateTime<chrono::Utc>>,
    pub priority: i32,
    /// Random tiebreaker in `[0, 1)`, diffuses contention among equal
    /// priorities in the fleet balancer (§4.2).
    pub r: f64,
    pub state: HostState,
}

impl Host {
    pub fn new(ip_int: u32, owner: impl Into<String>, init_stage: Stage, r: f64) -> Self {
        Self {
            ip_int,
            owner: owner.into(),
            location: None,
            stage: init_stage,
            status: Status::Waiting,
            last_change: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            next_scan: None,
            latest_scan: HashMap::new(),
            priority: -1,
            r,
            state: HostState::new(true, "new"),
        }
    }
}

/// Signals fed into the transition function for one invocation (§4.1).
#[derive(Debug, Clone, Copy, Default)]
pub struct HostTransitionSignals {
    pub up: Option<bool>,
    pub has_open_ports: Option<bool>,
    pub was_failure: bool,
}

/// Result of evaluating the pure transition rules (§4.1, §8 property 1/2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub stage: Stage,
    pub status: Status,
    pub changed: bool,
    pub finished_stage: bool,
}

/// Pure transition function `next(stage, status, signals) -> (stage',
/// status', changed, finished_stage)` (§4.1). Rules are evaluated in order;
/// first match wins. The degenerate "unexpected (stage, status)" case
/// (rule 5) is reported via the `unexpected` out-flag rather than a side
/// effect — callers log it (see `hygiene-engine`'s balancer/lifecycle
/// callers, §10).
pub fn next_state(
    stage: Stage,
    status: Status,
    signals: HostTransitionSignals,
) -> (Transition, bool) {
    // Rule 1: DONE is absorbing.
    if status == Status::Done {
        return (
            Transition {
                stage,
                status,
                changed: false,
                finished_stage: false,
            },
            false,
        );
    }

    // Rule 2: failures move (back) to WAITING.
    if signals.was_failure {
        let changed = status != Status::Waiting;
        return (
            Transition {
                stage,
                status: Status::Waiting,
                changed,
                finished_stage: false,
            },
            false,
        );
    }

    // Rule 3: claimed hosts start running.
    if matches!(status, Status::Waiting | Status::Ready) {
        return (
            Transition {
                stage,
                status: Status::Running,
                changed: true,
                finished_stage: false,
            },
            false,
        );
    }

    // Rule 4: running hosts resolve per-stage.
    if status == Status::Running {
        let transition = match stage {
            Stage::Netscan1 => {
                if signals.up.unwrap_or(false) {
                    Transition {
                        stage: Stage::Portscan,
                        status: Status::Waiting,
                        changed: true,
                        finished_stage: true,
                    }
                } else {
                    Transition {
                        stage: Stage::Netscan2,
                        status: Status::Waiting,
                        changed: true,
                        finished_stage: true,
                    }
                }
            }
            Stage::Netscan2 => {
                if signals.up.unwrap_or(false) {
                    Transition {
                        stage: Stage::Portscan,
                        status: Status::Waiting,
                        changed: true,
                        finished_stage: true,
                    }
                } else {
                    Transition {
                        stage: Stage::Netscan2,
                        status: Status::Done,
                        changed: true,
                        finished_stage: true,
                    }
                }
            }
            Stage::Portscan => {
                if signals.has_open_ports.unwrap_or(false) {
                    Transition {
                        stage: Stage::Vulnscan,
                        status: Status::Waiting,
                        changed: true,
                        finished_stage: true,
                    }
                } else {
                    Transition {
                        stage: Stage::Portscan,
                        status: Status::Done,
                        changed: true,
                        finished_stage: true,
                    }
                }
            }
            Stage::Vulnscan | Stage::Basescan => Transition {
                stage,
                status: Status::Done,
                changed: true,
                finished_stage: true,
            },
        };
        return (transition, false);
    }

    // Rule 5: unreachable (stage, status) combination under this model.
    (
        Transition {
            stage,
            status,
            changed: false,
            finished_stage: false,
        },
        true,
    )
}

/// Recompute `host.state` from scan evidence (§4.1, separate from the
/// stage/status bookkeeping above): `has_open_ports=true ⇒ up=true,
/// reason="open-port"`; `has_open_ports=false ⇒ up=false, reason="no-open"`;
/// otherwise fall through to the nmap-reported liveness and its reason
/// string (the netscan stages never observe `has_open_ports`).
pub fn recompute_up_state(
    has_open_ports: Option<bool>,
    nmap_says_up: Option<bool>,
    nmap_reason: &str,
) -> HostState {
    match has_open_ports {
        Some(true) => HostState::new(true, "open-port"),
        Some(false) => HostState::new(false, "no-open"),
        None => HostState::new(nmap_says_up.unwrap_or(true), nmap_reason),
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
