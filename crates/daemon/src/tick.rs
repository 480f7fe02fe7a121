// SPDX-License-Identifier: MIT

//! One orchestrator tick: poll the control channel, then — unless paused or
//! stopped — reconcile the fleet balancer for every owner and sweep the
//! rescan scheduler (§4, §5).

use hygiene_core::ControlTarget;
use hygiene_engine::{control, scheduler, tally};
use hygiene_storage::MaterializedState;
use tracing::{debug, info};

/// Run one tick against `state` at `now`, folding in `apply_control` (the
/// operator-facing `--dry-run` knob: when false, control documents are
/// observed but not acted on). Returns the control state the caller should
/// carry into the next tick.
pub fn run_tick(
    state: &mut MaterializedState,
    now: chrono::DateTime<chrono::Utc>,
    apply_control: bool,
    control_state: control::ControlState,
) -> control::ControlState {
    let control_state = control::poll(state, ControlTarget::Commander, apply_control, control_state);

    if control_state.stopped {
        info!("daemon stop acknowledged, skipping reconciliation this tick");
        return control_state;
    }
    if control_state.paused {
        debug!("daemon paused, skipping reconciliation this tick");
        return control_state;
    }

    let owners: Vec<String> = state.requests.keys().cloned().collect();
    for owner in &owners {
        balancer_reconcile(state, owner, now);
    }

    let rescanned = scheduler::sweep(state, now);
    tally::sync_all(state, now);

    info!(owners = owners.len(), rescanned, "tick complete");
    control_state
}

fn balancer_reconcile(state: &mut MaterializedState, owner: &str, now: chrono::DateTime<chrono::Utc>) {
    hygiene_engine::reconcile_owner(state, owner, now);
}
