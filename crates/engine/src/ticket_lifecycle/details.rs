// SPDX-License-Identifier: MIT

//! CVE override lookup (§14): stands in for the `cves` collection named in
//! §6. When a finding carries a CVE present in the table, NVD's score wins
//! over the scanner's own `score_source`, mirroring
//! `ticket_manager.py`'s `__generate_ticket_details`.

use hygiene_core::TicketDetails;
use std::collections::HashMap;

/// One row of the CVE override table.
#[derive(Debug, Clone, Copy)]
pub struct CveOverride {
    pub cvss_base_score: f64,
    pub severity: u8,
}

/// In-memory stand-in for the `cves` collection.
#[derive(Debug, Clone, Default)]
pub struct CveTable(HashMap<String, CveOverride>);

impl CveTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cve: impl Into<String>, over: CveOverride) {
        self.0.insert(cve.into(), over);
    }

    /// Override `score_source`/`cvss_base_score`/`severity` on `details` when
    /// its `cve` is present in the table, leaving everything else untouched.
    pub fn apply(&self, details: &mut TicketDetails) {
        let Some(cve) = &details.cve else {
            return;
        };
        if let Some(over) = self.0.get(cve) {
            details.score_source = "nvd".to_string();
            details.cvss_base_score = Some(over.cvss_base_score);
            details.severity = over.severity;
        }
    }
}
