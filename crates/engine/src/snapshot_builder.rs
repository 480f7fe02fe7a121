// SPDX-License-Identifier: MIT

//! Snapshot builder (C9, §4.5): tags the documents in scope for one owner
//! into a fresh oid, then runs the aggregation steps that produce a
//! `Snapshot` document.

use chrono::{DateTime, Utc};
use hygiene_core::{
    safe_div, ServiceCount, SeverityCounts, Snapshot, SnapshotId, Ticket, TicketAgeStats,
};
use hygiene_storage::MaterializedState;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Mint a fresh oid and tag every matching document for `owner` and its
/// descendants (§4.5 "tag documents"). Returns the oid.
pub fn tag_documents(
    state: &mut MaterializedState,
    owner: &str,
    descendants: &[String],
) -> SnapshotId {
    let oid = SnapshotId::generate();
    let owners: HashSet<&str> = std::iter::once(owner).chain(descendants.iter().map(String::as_str)).collect();

    for doc in state.host_scans.iter_mut() {
        if doc.header.latest && owners.contains(doc.header.owner.as_str()) {
            doc.header.tag(oid.clone());
        }
    }
    for doc in state.port_scans.iter_mut() {
        if doc.header.latest && doc.is_open() && owners.contains(doc.header.owner.as_str()) {
            doc.header.tag(oid.clone());
        }
    }
    for doc in state.vuln_scans.iter_mut() {
        if doc.header.latest && owners.contains(doc.header.owner.as_str()) {
            doc.header.tag(oid.clone());
        }
    }
    for ticket in state.tickets.values_mut() {
        if ticket.open && owners.contains(ticket.owner.as_str()) {
            ticket.tag(oid.clone());
        }
    }

    info!(%oid, owner, "tagged documents for snapshot");
    oid
}

fn time_bounds(state: &MaterializedState, oid: &SnapshotId, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let scan_times: Vec<DateTime<Utc>> = state
        .host_scans
        .iter()
        .filter(|d| d.header.snapshots.contains(oid))
        .map(|d| d.header.time)
        .chain(
            state
                .port_scans
                .iter()
                .filter(|d| d.header.snapshots.contains(oid))
                .map(|d| d.header.time),
        )
        .chain(
            state
                .vuln_scans
                .iter()
                .filter(|d| d.header.snapshots.contains(oid))
                .map(|d| d.header.time),
        )
        .collect();

    if let (Some(min), Some(max)) = (scan_times.iter().min(), scan_times.iter().max()) {
        return (*min, *max);
    }

    let host_times: Vec<DateTime<Utc>> = state.hosts.values().map(|h| h.last_change).collect();
    if let (Some(min), Some(max)) = (host_times.iter().min(), host_times.iter().max()) {
        return (*min, *max);
    }

    (now, now)
}

/// Resolve a `(owner, start_time, end_time)` collision against a snapshot
/// under a different oid by advancing `end_time` to `now` (§4.5, §7).
fn resolve_collision(
    state: &MaterializedState,
    owner: &str,
    oid: &SnapshotId,
    start_time: DateTime<Utc>,
    mut end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let collides = state
        .snapshots
        .values()
        .any(|s| s.id != *oid && s.owner == owner && s.start_time == start_time && s.end_time == end_time);
    if collides {
        end_time = now;
    }
    end_time
}

fn severity_bucket(severity: u8) -> Option<&'static str> {
    match severity {
        4 => Some("critical"),
        3 => Some("high"),
        2 => Some("medium"),
        1 => Some("low"),
        _ => None,
    }
}

fn bump(counts: &mut SeverityCounts, severity: u8) {
    counts.total += 1;
    match severity {
        4 => counts.critical += 1,
        3 => counts.high += 1,
        2 => counts.medium += 1,
        1 => counts.low += 1,
        _ => {}
    }
}

fn age_stats(mut values: Vec<f64>) -> TicketAgeStats {
    if values.is_empty() {
        return TicketAgeStats::default();
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    let max = *values.last().unwrap();
    TicketAgeStats {
        median_msec: median,
        max_msec: max,
    }
}

/// Build and save the snapshot document for `owner` (§4.5 steps 1-12, plus
/// the final "clear prior latest, save new" step).
pub fn build_snapshot(
    state: &mut MaterializedState,
    owner: &str,
    descendants: Vec<String>,
    now: DateTime<Utc>,
) -> SnapshotId {
    let oid = tag_documents(state, owner, &descendants);
    let owners: HashSet<String> = std::iter::once(owner.to_string()).chain(descendants.iter().cloned()).collect();

    let (start_time, end_time) = time_bounds(state, &oid, now);
    let end_time = resolve_collision(state, owner, &oid, start_time, end_time, now);

    let owned_hosts: Vec<_> = state.hosts.values().filter(|h| owners.contains(&h.owner)).collect();

    // Step 1: addresses_scanned — hosts that have completed at least one
    // scan stage. `latest_scan.DONE` doesn't map cleanly onto this model's
    // per-stage `latest_scan` map, so "has any recorded stage completion" is
    // the adopted reading (see DESIGN.md).
    let addresses_scanned = owned_hosts.iter().filter(|h| !h.latest_scan.is_empty()).count() as u64;
    // Step 2
    let host_count = owned_hosts.iter().filter(|h| h.state.up).count() as u64;

    let tagged_tickets: Vec<&Ticket> = state.tickets.values().filter(|t| t.snapshots.contains(&oid)).collect();
    // Step 3
    let vulnerable_host_count = tagged_tickets.iter().map(|t| t.ip_int).collect::<HashSet<_>>().len() as u64;
    // Step 4
    let unique_operating_systems = state
        .host_scans
        .iter()
        .filter(|d| d.header.snapshots.contains(&oid))
        .filter_map(|d| d.os_name.clone())
        .collect::<HashSet<_>>()
        .len() as u64;
    // Step 5
    let tagged_ports: Vec<_> = state.port_scans.iter().filter(|d| d.header.snapshots.contains(&oid)).collect();
    let port_count = tagged_ports.iter().map(|d| (d.header.ip_int, d.port)).collect::<HashSet<_>>().len() as u64;
    let unique_port_count = tagged_ports.iter().map(|d| d.port).collect::<HashSet<_>>().len() as u64;
    // Step 6
    let silent_port_count = state
        .port_scans
        .iter()
        .filter(|d| d.header.latest && d.is_silent() && owners.contains(&d.header.owner))
        .count() as u64;

    // Step 7 + 8
    let mut severity = SeverityCounts::default();
    let mut false_positives = SeverityCounts::default();
    let mut unique_severity_seen: HashSet<(String, u8)> = HashSet::new();
    let mut unique_severity = SeverityCounts::default();
    for t in &tagged_tickets {
        if t.false_positive {
            bump(&mut false_positives, t.details.severity);
            continue;
        }
        bump(&mut severity, t.details.severity);
        if unique_severity_seen.insert((t.source_id.clone(), t.details.severity)) {
            bump(&mut unique_severity, t.details.severity);
        }
    }

    // Step 9
    let mut service_counts: HashMap<String, u64> = HashMap::new();
    let mut seen_service_keys: HashSet<(u32, u16, String)> = HashSet::new();
    for d in &tagged_ports {
        let Some(service) = d.service_name.clone().filter(|s| s != "unknown") else {
            continue;
        };
        if seen_service_keys.insert((d.header.ip_int, d.port, service.clone())) {
            *service_counts.entry(service).or_insert(0) += 1;
        }
    }
    let mut services: Vec<ServiceCount> = service_counts
        .into_iter()
        .map(|(service_name, count)| ServiceCount { service_name, count })
        .collect();
    services.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.service_name.cmp(&b.service_name)));
    const TOP_SERVICES: usize = 10;
    services.truncate(TOP_SERVICES);

    // Step 10
    let mut per_host_cvss_max: HashMap<u32, f64> = HashMap::new();
    for t in &tagged_tickets {
        if let Some(score) = t.details.cvss_base_score {
            let entry = per_host_cvss_max.entry(t.ip_int).or_insert(0.0);
            if score > *entry {
                *entry = score;
            }
        }
    }
    let cvss_sum: f64 = per_host_cvss_max.values().sum();
    let cvss_average_all = safe_div(cvss_sum, host_count as f64);
    let cvss_average_vulnerable = safe_div(cvss_sum, vulnerable_host_count as f64);

    // Step 11
    let mut tix_msec_open: HashMap<String, TicketAgeStats> = HashMap::new();
    for bucket in ["critical", "high", "medium", "low"] {
        let ages: Vec<f64> = tagged_tickets
            .iter()
            .filter(|t| t.open && !t.false_positive && severity_bucket(t.details.severity) == Some(bucket))
            .map(|t| (now - t.time_opened).num_milliseconds() as f64)
            .collect();
        tix_msec_open.insert(bucket.to_string(), age_stats(ages));
    }

    // Step 12
    let closed_after_date = now - chrono::Duration::days(365);
    let mut tix_msec_to_close: HashMap<String, TicketAgeStats> = HashMap::new();
    for bucket in ["critical", "high", "medium", "low"] {
        let ages: Vec<f64> = state
            .tickets
            .values()
            .filter(|t| owners.contains(&t.owner))
            .filter(|t| t.time_closed.is_some_and(|tc| tc > closed_after_date))
            .filter(|t| severity_bucket(t.details.severity) == Some(bucket))
            .filter_map(|t| t.time_closed.map(|tc| (tc - t.time_opened).num_milliseconds() as f64))
            .collect();
        tix_msec_to_close.insert(bucket.to_string(), age_stats(ages));
    }

    let mut descendants_included = descendants;
    descendants_included.sort();

    let snapshot = Snapshot {
        id: oid.clone(),
        owner: owner.to_string(),
        descendants_included,
        latest: true,
        start_time,
        end_time,
        parents: vec![oid.clone()],
        networks: Vec::new(),
        addresses_scanned,
        host_count,
        vulnerable_host_count,
        unique_operating_systems,
        port_count,
        unique_port_count,
        silent_port_count,
        severity,
        unique_severity,
        false_positives,
        services,
        cvss_average_all,
        cvss_average_vulnerable,
        tix_msec_open,
        tix_open_as_of_date: now,
        tix_msec_to_close,
        tix_closed_after_date: closed_after_date,
        exclude_from_world_stats: false,
    };

    save_snapshot(state, snapshot);
    info!(%oid, owner, host_count, "snapshot built");
    oid
}

/// Clear the prior `latest` snapshot for this owner and insert the new one
/// (§4.5 final step).
fn save_snapshot(state: &mut MaterializedState, snapshot: Snapshot) {
    for existing in state.snapshots.values_mut() {
        if existing.owner == snapshot.owner {
            existing.latest = false;
        }
    }
    state.snapshots.insert(snapshot.id.clone(), snapshot);
}

/// World statistics (§4.5 "World statistics"): host/vulnerability totals
/// summed across every eligible `latest=true` snapshot.
#[derive(Debug, Clone, Default)]
pub struct WorldStats {
    pub host_count: u64,
    pub vulnerable_host_count: u64,
    pub severity: SeverityCounts,
}

pub fn world_stats(state: &MaterializedState) -> WorldStats {
    let mut stats = WorldStats::default();
    for snap in state.snapshots.values() {
        if !snap.latest || !snap.counts_toward_world_stats() {
            continue;
        }
        stats.host_count += snap.host_count;
        stats.vulnerable_host_count += snap.vulnerable_host_count;
        stats.severity.total += snap.severity.total;
        stats.severity.critical += snap.severity.critical;
        stats.severity.high += snap.severity.high;
        stats.severity.medium += snap.severity.medium;
        stats.severity.low += snap.severity.low;
    }
    stats
}

#[cfg(test)]
#[path = "snapshot_builder_tests.rs"]
mod tests;
