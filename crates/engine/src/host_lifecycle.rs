// SPDX-License-Identifier: MIT

//! Host state machine driver (C4's impure half, §4.1): applies
//! [`next_state`] to a host in the store, persists the stage/status/state
//! change, keeps the owner's tally in sync, and hands off to the rescan
//! scheduler once a host reaches DONE.

use chrono::{DateTime, Utc};
use hygiene_core::{
    next_state, recompute_up_state, Host, HostTransitionSignals, Status, Tally, Transition,
};
use hygiene_storage::MaterializedState;
use tracing::warn;

/// Apply one transition to `ip_int` and persist the result (§4.1). Returns
/// `None` if no such host exists. `nmap_reason` feeds
/// `recompute_up_state`'s fallback branch — it's only read when neither
/// `signals.has_open_ports` is set.
pub fn transition_host(
    state: &mut MaterializedState,
    ip_int: u32,
    signals: HostTransitionSignals,
    nmap_reason: &str,
    now: DateTime<Utc>,
) -> Option<Transition> {
    let (stage, status, owner) = {
        let host = state.hosts.get(&ip_int)?;
        (host.stage, host.status, host.owner.clone())
    };

    let (transition, unexpected) = next_state(stage, status, signals);
    if unexpected {
        warn!(ip_int, ?stage, ?status, "host hit an unexpected (stage, status) combination");
    }

    let host: &mut Host = state.hosts.get_mut(&ip_int).expect("looked up above");
    host.state = recompute_up_state(signals.has_open_ports, signals.up, nmap_reason);
    if transition.changed {
        host.stage = transition.stage;
        host.status = transition.status;
        host.last_change = now;

        let tally = state
            .tallies
            .entry(owner.clone())
            .or_insert_with(|| Tally::new(owner, now));
        tally.decrement(stage, status, now);
        tally.increment(transition.stage, transition.status, now);
    }

    if transition.finished_stage && transition.status == Status::Done {
        crate::scheduler::schedule_rescan(state, ip_int, now);
    }

    Some(transition)
}

#[cfg(test)]
#[path = "host_lifecycle_tests.rs"]
mod tests;
