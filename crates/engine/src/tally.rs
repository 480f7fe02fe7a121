// SPDX-License-Identifier: MIT

//! Tally reconciliation (C5, §5 "Tally consistency"): the `sync` path that
//! recomputes an owner's counters from the hosts table directly, correcting
//! for any transfer that was missed or double-applied by the incremental
//! `transfer` path.

use hygiene_core::{Stage, Status, Tally};
use hygiene_storage::MaterializedState;
use tracing::info;

/// Recompute `owner`'s tally by direct count over its hosts, inserting a
/// fresh `Tally` if none exists yet. Does not bump `last_change` (§5).
pub fn sync_owner(state: &mut MaterializedState, owner: &str, now: chrono::DateTime<chrono::Utc>) {
    let counts: Vec<(Stage, Status)> = state
        .hosts
        .values()
        .filter(|h| h.owner == owner)
        .map(|h| (h.stage, h.status))
        .collect();
    let total = counts.len();

    let tally = state
        .tallies
        .entry(owner.to_string())
        .or_insert_with(|| Tally::new(owner, now));
    tally.sync(counts.into_iter());

    info!(owner, total, "tally synced from host table");
}

/// Reconcile every owner that has at least one host or an existing tally
/// document (§5, the periodic reconciliation sweep).
pub fn sync_all(state: &mut MaterializedState, now: chrono::DateTime<chrono::Utc>) {
    let mut owners: std::collections::HashSet<String> =
        state.hosts.values().map(|h| h.owner.clone()).collect();
    owners.extend(state.tallies.keys().cloned());

    for owner in owners {
        sync_owner(state, &owner, now);
    }
}

#[cfg(test)]
#[path = "tally_tests.rs"]
mod tests;
