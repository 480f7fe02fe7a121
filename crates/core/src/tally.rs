// SPDX-License-Identifier: MIT

//! Per-owner tally counters (C5, §3 Tally, §5 "Tally consistency").

use crate::enums::{Stage, Status};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `counts[stage][status] ∈ ℕ` (§3 Tally).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounts(HashMap<Stage, HashMap<Status, u64>>);

impl StageCounts {
    pub fn get(&self, stage: Stage, status: Status) -> u64 {
        self.0
            .get(&stage)
            .and_then(|m| m.get(&status))
            .copied()
            .unwrap_or(0)
    }

    fn set(&mut self, stage: Stage, status: Status, value: u64) {
        self.0.entry(stage).or_default().insert(status, value);
    }

    fn add(&mut self, stage: Stage, status: Status, delta: i64) {
        let current = self.get(stage, status) as i64;
        let updated = (current + delta).max(0) as u64;
        self.set(stage, status, updated);
    }

    /// `Σ counts[*][*]` (§3 Tally invariant).
    pub fn total(&self) -> u64 {
        self.0.values().flat_map(|m| m.values()).sum()
    }
}

/// Per-owner counters keyed by `(stage, status)` (§3 Tally, C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tally {
    pub owner: String,
    pub counts: StageCounts,
    pub last_change: chrono::DateTime<chrono::Utc>,
}

impl Tally {
    pub fn new(owner: impl Into<String>, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            owner: owner.into(),
            counts: StageCounts::default(),
            last_change: now,
        }
    }

    /// Atomically move `count` hosts from one `(stage, status)` cell to
    /// another, bumping `last_change` (§3, §5 "saving tally immediately
    /// after host transition" is the caller's responsibility — this method
    /// is the atomic half of that contract).
    pub fn transfer(
        &mut self,
        stage: Stage,
        from: Status,
        to: Status,
        count: u64,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        if count == 0 {
            return;
        }
        self.counts.add(stage, from, -(count as i64));
        self.counts.add(stage, to, count as i64);
        self.last_change = now;
    }

    /// Increment a single cell, e.g. when a brand-new host is inserted.
    pub fn increment(&mut self, stage: Stage, status: Status, now: chrono::DateTime<chrono::Utc>) {
        self.counts.add(stage, status, 1);
        self.last_change = now;
    }

    pub fn decrement(&mut self, stage: Stage, status: Status, now: chrono::DateTime<chrono::Utc>) {
        self.counts.add(stage, status, -1);
        self.last_change = now;
    }

    /// Recompute every cell by direct count and overwrite, *without* bumping
    /// `last_change` (§5 "the `sync` operation... overwrites them without
    /// bumping `last_change`, serving as the reconciliation path").
    pub fn sync(&mut self, hosts: impl Iterator<Item = (Stage, Status)>) {
        let mut fresh = StageCounts::default();
        for (stage, status) in hosts {
            fresh.add(stage, status, 1);
        }
        self.counts = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_moves_count_between_cells() {
        let now = chrono::Utc::now();
        let mut tally = Tally::new("acme", now);
        tally
            .counts
            .set(Stage::Portscan, Status::Waiting, 10);
        tally.transfer(Stage::Portscan, Status::Waiting, Status::Ready, 4, now);
        assert_eq!(tally.counts.get(Stage::Portscan, Status::Waiting), 6);
        assert_eq!(tally.counts.get(Stage::Portscan, Status::Ready), 4);
    }

    #[test]
    fn transfer_never_goes_negative() {
        let now = chrono::Utc::now();
        let mut tally = Tally::new("acme", now);
        tally.transfer(Stage::Portscan, Status::Waiting, Status::Ready, 4, now);
        assert_eq!(tally.counts.get(Stage::Portscan, Status::Waiting), 0);
    }

    #[test]
    fn sync_does_not_bump_last_change() {
        let t0 = chrono::Utc::now();
        let mut tally = Tally::new("acme", t0);
        tally.last_change = t0;
        tally.sync(vec![(Stage::Portscan, Status::Waiting)].into_iter());
        assert_eq!(tally.last_change, t0);
        assert_eq!(tally.counts.get(Stage::Portscan, Status::Waiting), 1);
    }

    #[test]
    fn total_conservation_across_transfers() {
        let now = chrono::Utc::now();
        let mut tally = Tally::new("acme", now);
        tally.counts.set(Stage::Portscan, Status::Waiting, 10);
        let total_before = tally.counts.total();
        tally.transfer(Stage::Portscan, Status::Waiting, Status::Ready, 3, now);
        assert_eq!(tally.counts.total(), total_before);
    }
}
