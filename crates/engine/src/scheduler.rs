// SPDX-License-Identifier: MIT

//! Rescan scheduler driver (C7, §4.1 last paragraph, §4.3): the impure half
//! that reads tickets and `now()` and calls `hygiene_core`'s pure priority
//! math.

use hygiene_core::{adjust_priority, hours_for_priority};
use hygiene_storage::MaterializedState;
use tracing::debug;

/// Max severity among open, non-false-positive tickets for `ip_int` (§4.3
/// "compute `max_sev` = max severity among open, non-false-positive tickets
/// for this IP (0 if none)").
fn max_open_severity(state: &MaterializedState, ip_int: u32) -> u8 {
    state
        .tickets
        .values()
        .filter(|t| t.ip_int == ip_int && t.open && !t.false_positive)
        .map(|t| t.details.severity)
        .max()
        .unwrap_or(0)
}

/// Recompute `priority` and `next_scan` for one DONE host (§4.1 "When a host
/// reaches DONE, if its owner's request carries a `scheduler` setting, the
/// rescan scheduler assigns `next_scan`").
pub fn schedule_rescan(
    state: &mut MaterializedState,
    ip_int: u32,
    now: chrono::DateTime<chrono::Utc>,
) {
    let Some(owner) = state.hosts.get(&ip_int).map(|h| h.owner.clone()) else {
        return;
    };
    let gated = state
        .requests
        .get(&owner)
        .and_then(|r| r.scheduler)
        .unwrap_or(false);
    if !gated {
        return;
    }

    let max_sev = max_open_severity(state, ip_int);
    let Some(host) = state.hosts.get_mut(&ip_int) else {
        return;
    };
    let up = host.state.up;
    let adjustment = adjust_priority(host.priority, up, max_sev);
    host.priority = adjustment.priority;
    let hours = hours_for_priority(adjustment.priority);
    host.next_scan = Some(now + chrono::Duration::milliseconds((hours * 3_600_000.0) as i64));

    debug!(ip_int, priority = adjustment.priority, hours, "scheduled rescan");
}

/// Run [`schedule_rescan`] for every DONE host with a due (or unset)
/// `next_scan`, driven by the daemon's tick loop.
pub fn sweep(state: &mut MaterializedState, now: chrono::DateTime<chrono::Utc>) -> usize {
    let due_ips: Vec<u32> = state.hosts_due_for_rescan(now).iter().map(|h| h.ip_int).collect();
    for ip in &due_ips {
        schedule_rescan(state, *ip, now);
    }
    due_ips.len()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
