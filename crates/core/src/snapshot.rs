// SPDX-License-Identifier: MIT

//! Snapshot entity (§3 Snapshot, §4.5). The aggregation pipelines themselves
//! run against the store in `hygiene-engine`; this module is the pure
//! document shape plus the handful of safe-math helpers called out
//! explicitly (safe division, world-stats eligibility).

use crate::ids::SnapshotId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub total: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCount {
    pub service_name: String,
    pub count: u64,
}

/// Median/max age statistics for one severity bucket (§4.5 steps 11-12).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketAgeStats {
    pub median_msec: f64,
    pub max_msec: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub owner: String,
    pub descendants_included: Vec<String>,
    pub latest: bool,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: chrono::DateTime<chrono::Utc>,
    /// Contains `self.id` when this snapshot has no parent snapshot it was
    /// built from (§3 "initially containing self if root").
    pub parents: Vec<SnapshotId>,
    pub networks: Vec<String>,
    pub addresses_scanned: u64,
    pub host_count: u64,
    pub vulnerable_host_count: u64,
    pub unique_operating_systems: u64,
    pub port_count: u64,
    pub unique_port_count: u64,
    pub silent_port_count: u64,
    pub severity: SeverityCounts,
    pub unique_severity: SeverityCounts,
    pub false_positives: SeverityCounts,
    pub services: Vec<ServiceCount>,
    pub cvss_average_all: f64,
    pub cvss_average_vulnerable: f64,
    pub tix_msec_open: HashMap<String, TicketAgeStats>,
    pub tix_open_as_of_date: chrono::DateTime<chrono::Utc>,
    pub tix_msec_to_close: HashMap<String, TicketAgeStats>,
    pub tix_closed_after_date: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub exclude_from_world_stats: bool,
}

impl Snapshot {
    /// Unique-key tuple (§3 "Unique by `(owner, start_time, end_time)`").
    pub fn key(&self) -> (&str, chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>) {
        (self.owner.as_str(), self.start_time, self.end_time)
    }

    /// True when this snapshot counts toward world statistics: not a
    /// descendant of another snapshot (its own id is in its `parents`) and
    /// not explicitly opted out (§4.5 "World statistics").
    pub fn counts_toward_world_stats(&self) -> bool {
        !self.exclude_from_world_stats && self.parents.iter().any(|p| *p == self.id)
    }
}

/// `numerator / denominator`, returning `0.0` on a zero denominator (§4.5
/// step 10 "safe division").
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
