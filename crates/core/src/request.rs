// SPDX-License-Identifier: MIT

//! Request entity (§3): per-owner scanning configuration.

use crate::enums::{AgencyType, Stage};
use crate::window::ScanWindowSpec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A scan window as stored on a request (§3: `{day, start, duration_hours}`).
pub type ScanWindow = ScanWindowSpec;

/// Per-stage scan concurrency limits (§4.2).
pub type ScanLimits = HashMap<Stage, u32>;

/// Unique by owner — the owner string is the `_id` (§3 Request).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub owner: String,
    pub agency_type: AgencyType,
    pub period_start: chrono::DateTime<chrono::Utc>,
    pub windows: Vec<ScanWindow>,
    pub cidrs: Vec<String>,
    pub init_stage: Stage,
    /// Rescan gate (§4.1, §9 open question (b)): only the truthy-gate
    /// semantics are implemented; no identifier use.
    pub scheduler: Option<bool>,
    pub scan_types: Vec<String>,
    pub stakeholder: bool,
    pub children: Vec<String>,
    pub retired: bool,
    pub scan_limits: ScanLimits,
}

/// Platform-default per-stage concurrency limits, used when a request has no
/// `scan_limits` of its own (§4.2).
pub fn default_scan_limits() -> ScanLimits {
    [
        (Stage::Netscan1, 256),
        (Stage::Netscan2, 256),
        (Stage::Portscan, 32),
        (Stage::Vulnscan, 32),
        (Stage::Basescan, 512),
    ]
    .into_iter()
    .collect()
}

/// Transitive closure of `owner`'s `children` through the given lookup
/// function (§3 "Derived relation: `descendants(owner) = transitive closure
/// through children`"). Pure: the caller supplies `children_of` (typically
/// backed by the store) so this function does no I/O itself.
pub fn descendants(owner: &str, children_of: impl Fn(&str) -> Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut frontier = vec![owner.to_string()];
    let mut out = Vec::new();
    while let Some(current) = frontier.pop() {
        for child in children_of(&current) {
            if seen.insert(child.clone()) {
                out.push(child.clone());
                frontier.push(child);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descendants_is_transitive_closure() {
        let tree: HashMap<&str, Vec<&str>> = [
            ("root", vec!["a", "b"]),
            ("a", vec!["c"]),
            ("b", vec![]),
            ("c", vec![]),
        ]
        .into_iter()
        .collect();
        let mut result = descendants("root", |owner| {
            tree.get(owner)
                .map(|v| v.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default()
        });
        result.sort();
        assert_eq!(result, vec!["a", "b", "c"]);
    }

    #[test]
    fn descendants_of_leaf_is_empty() {
        let result = descendants("leaf", |_| Vec::new());
        assert!(result.is_empty());
    }

    #[test]
    fn default_scan_limits_cover_every_stage() {
        let limits = default_scan_limits();
        for stage in Stage::ALL {
            assert!(limits.contains_key(&stage));
        }
    }
}
