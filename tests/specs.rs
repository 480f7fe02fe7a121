// SPDX-License-Identifier: MIT

//! End-to-end scenarios (spec.md §8 "End-to-end scenarios" S1-S6), each
//! exercised across the crate boundary: `hygiene-core` for entities,
//! `hygiene-engine` for the orchestration functions, `hygiene-storage` for
//! the materialized state they operate on.

use chrono::{TimeZone, Utc};
use hygiene_core::{
    AgencyType, Host, Request, Stage, Status, Tally, Ticket, TicketDetails, TicketId,
};
use hygiene_engine::ticket_lifecycle::{PortFinding, VulnFinding};
use hygiene_engine::{IpPortTicketManager, VulnTicketManager};
use hygiene_storage::MaterializedState;

fn request(owner: &str, limit: u32) -> Request {
    let mut scan_limits = hygiene_core::default_scan_limits();
    scan_limits.insert(Stage::Portscan, limit);
    Request {
        owner: owner.to_string(),
        agency_type: AgencyType::Federal,
        period_start: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        windows: Vec::new(),
        cidrs: Vec::new(),
        init_stage: Stage::Netscan1,
        scheduler: None,
        scan_types: Vec::new(),
        stakeholder: false,
        children: Vec::new(),
        retired: false,
        scan_limits,
    }
}

fn host(ip: u32, owner: &str, stage: Stage, status: Status) -> Host {
    let mut h = Host::new(ip, owner, stage, 0.0);
    h.status = status;
    h
}

fn details(severity: u8) -> TicketDetails {
    TicketDetails {
        cve: None,
        score_source: "cvss".to_string(),
        cvss_base_score: None,
        severity,
        name: "finding".to_string(),
        service: None,
    }
}

/// S1 Promotion: tally cell (PORTSCAN, WAITING)=10/READY=0/RUNNING=0; request
/// limit for PORTSCAN=4. After balance: READY=4, WAITING=6, RUNNING=0.
#[test]
fn s1_promotion() {
    let mut state = MaterializedState::default();
    state.requests.insert("acme".to_string(), request("acme", 4));
    for ip in 0..10 {
        state.hosts.insert(ip, host(ip, "acme", Stage::Portscan, Status::Waiting));
    }
    state.tallies.insert("acme".to_string(), Tally::new("acme", Utc::now()));

    let now = Utc::now();
    let outcome = hygiene_engine::reconcile_stage(&mut state, "acme", Stage::Portscan, 4, now);
    assert_eq!(outcome.promoted, 4);

    let ready = state
        .hosts
        .values()
        .filter(|h| h.status == Status::Ready)
        .count();
    let waiting = state
        .hosts
        .values()
        .filter(|h| h.status == Status::Waiting)
        .count();
    assert_eq!(ready, 4);
    assert_eq!(waiting, 6);
    assert!(state.tallies["acme"].last_change >= now);
}

/// S2 Verify: seed one open vuln ticket, observe the same vuln again. Ticket
/// count stays 1, last event is VERIFIED, still open.
#[test]
fn s2_verify() {
    let mut state = MaterializedState::default();
    let mut manager = VulnTicketManager::new("nessus", 30, false);
    let now = Utc::now();

    let outcome1 = manager.open_ticket(
        &mut state,
        VulnFinding {
            ip_int: u32::from(std::net::Ipv4Addr::new(10, 0, 0, 1)),
            port: 0,
            protocol: "tcp".to_string(),
            source_id: "1".to_string(),
            owner: "acme".to_string(),
            time: now,
            reference: None,
            details: details(3),
        },
        "initial finding",
        now,
    );

    let later = now + chrono::Duration::hours(1);
    let outcome2 = manager.open_ticket(
        &mut state,
        VulnFinding {
            ip_int: u32::from(std::net::Ipv4Addr::new(10, 0, 0, 1)),
            port: 0,
            protocol: "tcp".to_string(),
            source_id: "1".to_string(),
            owner: "acme".to_string(),
            time: later,
            reference: None,
            details: details(3),
        },
        "re-observed",
        later,
    );

    assert_eq!(outcome1.ticket_id, outcome2.ticket_id);
    assert_eq!(state.tickets.len(), 1);
    let ticket = &state.tickets[&outcome2.ticket_id];
    assert!(ticket.open);
    assert_eq!(
        ticket.events.last().unwrap().action,
        hygiene_core::TicketEventKind::Verified
    );
}

/// S3 Close on absence: seed two open tickets for two IPs, run a vuln close
/// sweep that saw nothing. Both close with a final CLOSED event.
#[test]
fn s3_close_on_absence() {
    let mut state = MaterializedState::default();
    let now = Utc::now();
    let ip_a = u32::from(std::net::Ipv4Addr::new(10, 0, 0, 1));
    let ip_b = u32::from(std::net::Ipv4Addr::new(192, 168, 1, 1));

    for (ip, source_id) in [(ip_a, "1"), (ip_b, "2")] {
        let id = TicketId::generate();
        let ticket = Ticket::open_ticket(id.clone(), ip, 0, "tcp", "nessus", source_id, "acme", details(2), now);
        state.tickets.insert(id, ticket);
    }

    let mut manager = VulnTicketManager::new("nessus", 30, false);
    manager.set_scope([ip_a, ip_b], [0u16, 123, 456, 10123], ["1".to_string(), "2".to_string(), "3".to_string()]);
    let closed = manager.close_tickets(&mut state, now + chrono::Duration::minutes(5));

    assert_eq!(closed, 2);
    for ticket in state.tickets.values() {
        assert!(!ticket.open);
        assert_eq!(ticket.events.last().unwrap().action, hygiene_core::TicketEventKind::Closed);
        assert_eq!(ticket.events.last().unwrap().reason.as_deref(), Some("vulnerability not detected"));
    }
}

/// S4 Port-0 survives partial portscan: seed a port-0 and a port-123 ticket
/// for one IP; close with a scanned range that doesn't include port 0.
/// The port-123 ticket closes; the port-0 ticket stays open.
#[test]
fn s4_port_zero_survives_partial_scan() {
    let mut state = MaterializedState::default();
    let now = Utc::now();
    let ip = u32::from(std::net::Ipv4Addr::new(10, 0, 0, 1));

    let port0_id = TicketId::generate();
    let port0 = Ticket::open_ticket(port0_id.clone(), ip, 0, "tcp", "nmap", "1", "acme", details(0), now);
    state.tickets.insert(port0_id.clone(), port0);

    let port123_id = TicketId::generate();
    let port123 = Ticket::open_ticket(port123_id.clone(), ip, 123, "tcp", "nmap", "1", "acme", details(0), now);
    state.tickets.insert(port123_id.clone(), port123);

    let mut manager = IpPortTicketManager::new(30);
    manager.set_scope([ip], (1u16..=1023).collect::<Vec<_>>(), vec!["tcp".to_string()]);
    let closed = manager.close_tickets(&mut state, now + chrono::Duration::minutes(5));

    assert_eq!(closed, 1);
    assert!(!state.tickets[&port123_id].open);
    assert!(state.tickets[&port0_id].open);
}

/// S5 Snapshot collision advance: two snapshots requested back-to-back for
/// the same owner. The second save resolves the (owner, start, end)
/// collision by advancing end_time and keeps exactly one `latest` snapshot.
#[test]
fn s5_snapshot_collision_advances_end_time() {
    let mut state = MaterializedState::default();
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let first = hygiene_engine::build_snapshot(&mut state, "acme", Vec::new(), now);
    let second = hygiene_engine::build_snapshot(&mut state, "acme", Vec::new(), now);

    assert_ne!(first, second);
    assert!(!state.snapshots[&first].latest);
    assert!(state.snapshots[&second].latest);
    assert!(state.snapshots[&second].end_time >= state.snapshots[&first].end_time);
}

/// S6 Scheduler relaxation: host at priority -16, up, no tickets. After one
/// schedule call, priority relaxes to -15 and next_scan is set accordingly.
#[test]
fn s6_scheduler_relaxation() {
    let mut state = MaterializedState::default();
    state.requests.insert("acme".to_string(), {
        let mut r = request("acme", 4);
        r.scheduler = Some(true);
        r
    });
    let ip = 1;
    let mut h = host(ip, "acme", Stage::Basescan, Status::Done);
    h.priority = -16;
    h.state.up = true;
    state.hosts.insert(ip, h);

    let now = Utc::now();
    hygiene_engine::schedule_rescan(&mut state, ip, now);

    let host = &state.hosts[&ip];
    assert_eq!(host.priority, -15);
    assert!(host.next_scan.is_some());
}
