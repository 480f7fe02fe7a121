// SPDX-License-Identifier: MIT

//! Control channel polling (C10, §4.6): the daemon's side of the
//! pause/stop protocol. A driver loop calls `poll` on a fixed interval;
//! `poll` finds the newest uncompleted `SystemControl` document for a
//! target and, if `apply_actions` is set, acknowledges it and reports the
//! paused state the caller should now honor.

use hygiene_core::{ControlAction, ControlTarget, SystemControl};
use hygiene_storage::MaterializedState;
use tracing::info;

/// Default poll interval (§4.6 "polls... every 5 seconds by default").
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// Resulting paused/stopped state after a poll, for the caller to act on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub paused: bool,
    pub stopped: bool,
}

/// Find the newest uncompleted control document for `target`, acknowledge
/// it if `apply_actions` allows, and fold it into `state`'s running
/// pause/stop state (§4.6). Completed documents are left in place; the
/// store is append-only for this collection, same as every other WAL-backed
/// collection (§0).
pub fn poll(
    materialized: &mut MaterializedState,
    target: ControlTarget,
    apply_actions: bool,
    mut state: ControlState,
) -> ControlState {
    let pending = materialized
        .control
        .iter_mut()
        .filter(|c| c.target == target && !c.completed)
        .last();

    let Some(ctl) = pending else {
        return state;
    };

    let acted = ctl.acknowledge(apply_actions);
    if acted {
        match ctl.action {
            ControlAction::Pause => state.paused = true,
            ControlAction::Stop => state.stopped = true,
        }
        info!(?target, action = ?ctl.action, "control action acknowledged");
    }
    state
}

/// Append a new control request (§4.6, the operator side of the channel).
pub fn issue(
    materialized: &mut MaterializedState,
    action: ControlAction,
    target: ControlTarget,
    sender: impl Into<String>,
    reason: impl Into<String>,
) {
    materialized
        .control
        .push(SystemControl::new(action, target, sender, reason));
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
