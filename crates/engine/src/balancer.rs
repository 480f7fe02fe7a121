// SPDX-License-Identifier: MIT

//! Fleet balancer (C6, §4.2): per tick, reconciles each owner's per-stage
//! WAITING/READY counts against its scan-window-gated limits.

use hygiene_core::{in_any_window, Request, ScanLimits, Stage, Status};
use hygiene_storage::MaterializedState;
use tracing::{debug, info};

/// Per-`(owner, stage)` outcome of one reconciliation pass, returned so
/// callers can persist tally transfers and log a summary (§10 "logs a
/// `tracing::info!` summary per `(owner, stage)` reconciliation").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub promoted: u64,
    pub demoted: u64,
}

/// `limits[stage]` for one owner at `now` (§4.2): `scan_limits` overridden
/// per stage onto the platform defaults when `now` is inside a scan window
/// and the request has started, all zeros otherwise.
pub fn effective_limits(request: &Request, now: chrono::DateTime<chrono::Utc>) -> ScanLimits {
    let started = request.period_start <= now;
    let in_window = in_any_window(&request.windows, now);
    if started && in_window {
        let mut limits = hygiene_core::default_scan_limits();
        limits.extend(request.scan_limits.clone());
        limits
    } else {
        Stage::ALL.into_iter().map(|s| (s, 0)).collect()
    }
}

/// Reconcile one `(owner, stage)` cell: promote WAITING→READY or demote
/// READY→WAITING to bring `ready` toward `target_ready = max(0, limit -
/// running)`, ordered by `(priority asc, r asc)` (§4.2).
pub fn reconcile_stage(
    state: &mut MaterializedState,
    owner: &str,
    stage: Stage,
    limit: u32,
    now: chrono::DateTime<chrono::Utc>,
) -> Reconciliation {
    let running = state
        .hosts_by_owner_stage_status(owner, stage, Status::Running)
        .len() as i64;
    let ready = state.hosts_by_owner_stage_status(owner, stage, Status::Ready).len() as i64;
    let target_ready = (limit as i64 - running).max(0);

    let mut outcome = Reconciliation::default();

    if target_ready > ready {
        let need = (target_ready - ready) as usize;
        let waiting_ips: Vec<u32> = state
            .hosts_by_owner_stage_status(owner, stage, Status::Waiting)
            .into_iter()
            .take(need)
            .map(|h| h.ip_int)
            .collect();
        for ip in &waiting_ips {
            if let Some(host) = state.hosts.get_mut(ip) {
                host.status = Status::Ready;
                host.last_change = now;
            }
        }
        outcome.promoted = waiting_ips.len() as u64;
        if outcome.promoted > 0 {
            let tally = state
                .tallies
                .entry(owner.to_string())
                .or_insert_with(|| hygiene_core::Tally::new(owner, now));
            tally.transfer(stage, Status::Waiting, Status::Ready, outcome.promoted, now);
        }
    } else if target_ready < ready {
        let excess = (ready - target_ready) as usize;
        let ready_ips: Vec<u32> = state
            .hosts_by_owner_stage_status(owner, stage, Status::Ready)
            .into_iter()
            .take(excess)
            .map(|h| h.ip_int)
            .collect();
        for ip in &ready_ips {
            if let Some(host) = state.hosts.get_mut(ip) {
                host.status = Status::Waiting;
                host.last_change = now;
            }
        }
        outcome.demoted = ready_ips.len() as u64;
        if outcome.demoted > 0 {
            let tally = state
                .tallies
                .entry(owner.to_string())
                .or_insert_with(|| hygiene_core::Tally::new(owner, now));
            tally.transfer(stage, Status::Ready, Status::Waiting, outcome.demoted, now);
        }
    }

    if outcome.promoted > 0 || outcome.demoted > 0 {
        info!(owner, %stage, promoted = outcome.promoted, demoted = outcome.demoted, "reconciled fleet balancer cell");
    } else {
        debug!(owner, %stage, "fleet balancer cell already balanced");
    }

    outcome
}

/// CYHY scan-type marker gating the balancer (§4.2 "every owner that has a
/// request of type CYHY").
const CYHY_SCAN_TYPE: &str = "CYHY";

/// Run the balancer for one owner across every stage (§4.2 "Per tick, for
/// every owner that has a request of type CYHY"). Owners whose request
/// doesn't carry the CYHY scan type are left alone.
pub fn reconcile_owner(
    state: &mut MaterializedState,
    owner: &str,
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<(Stage, Reconciliation)> {
    let Some(request) = state.requests.get(owner).cloned() else {
        return Vec::new();
    };
    if !request.scan_types.iter().any(|t| t == CYHY_SCAN_TYPE) {
        return Vec::new();
    }
    let limits = effective_limits(&request, now);
    Stage::ALL
        .into_iter()
        .map(|stage| {
            let limit = limits.get(&stage).copied().unwrap_or(0);
            (stage, reconcile_stage(state, owner, stage, limit, now))
        })
        .collect()
}

#[cfg(test)]
#[path = "balancer_tests.rs"]
mod tests;
