// SPDX-License-Identifier: MIT

//! The ScanDoc family (§3 "ScanDoc family"): immutable per-scan observations
//! carrying a `latest` flag and the list of snapshot oids that have tagged
//! them.

use crate::ids::SnapshotId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDocKind {
    HostScan,
    PortScan,
    VulnScan,
}

/// Fields shared by every member of the ScanDoc family (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDocHeader {
    pub owner: String,
    pub ip_int: u32,
    pub time: chrono::DateTime<chrono::Utc>,
    pub latest: bool,
    #[serde(default)]
    pub snapshots: Vec<SnapshotId>,
}

impl ScanDocHeader {
    pub fn new(owner: impl Into<String>, ip_int: u32, time: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            owner: owner.into(),
            ip_int,
            time,
            latest: true,
            snapshots: Vec::new(),
        }
    }

    /// Append `oid` to this document's snapshot set. Idempotent: tagging the
    /// same document with the same oid twice has no further effect (§4.5
    /// "Tagging is idempotent").
    pub fn tag(&mut self, oid: SnapshotId) {
        if !self.snapshots.contains(&oid) {
            self.snapshots.push(oid);
        }
    }
}

/// Host-scan observation: nmap liveness plus, implicitly, the operating
/// system guess used by the snapshot builder's `unique_operating_systems`
/// aggregate (§4.5 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostScanDoc {
    pub header: ScanDocHeader,
    pub up: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
}

/// Port-scan observation for a single `(ip, port, protocol)` (§3, §4.4
/// IP-Port manager, §4.5 steps 5-6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortScanDoc {
    pub header: ScanDocHeader,
    pub port: u16,
    pub protocol: String,
    /// `"open"`, `"closed"`, or `"silent"` (firewalled/filtered) (§4.5 step 6).
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

impl PortScanDoc {
    pub fn is_open(&self) -> bool {
        self.state == "open"
    }

    pub fn is_silent(&self) -> bool {
        self.state == "silent"
    }
}

/// Vulnerability-scan observation feeding the vuln ticket manager (§3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnScanDoc {
    pub header: ScanDocHeader,
    pub port: u16,
    pub protocol: String,
    pub source: String,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve: Option<String>,
    pub severity: u8,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}
