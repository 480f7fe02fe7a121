// SPDX-License-Identifier: MIT

use super::*;
use chrono::TimeZone;
use hygiene_core::TicketEventKind;

fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn vuln_details(severity: u8) -> TicketDetails {
    TicketDetails {
        cve: None,
        score_source: "nessus".into(),
        cvss_base_score: None,
        severity,
        name: "finding".into(),
        service: None,
    }
}

fn vuln_finding(time: DateTime<Utc>, severity: u8, owner: &str) -> VulnFinding {
    VulnFinding {
        ip_int: 1,
        port: 443,
        protocol: "tcp".into(),
        source_id: "plugin-1".into(),
        owner: owner.to_string(),
        time,
        reference: Some("scan-1".into()),
        details: vuln_details(severity),
    }
}

#[test]
fn opening_same_finding_twice_verifies_not_duplicates() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);

    let first = mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);
    assert!(first.notify);
    assert_eq!(state.tickets.len(), 1);
    assert_eq!(state.notifications.len(), 1);
    assert_eq!(state.notifications[0].ticket_id, first.ticket_id);

    let second = mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "still present", t0);
    assert_eq!(second.ticket_id, first.ticket_id);
    assert!(!second.notify);
    assert_eq!(state.notifications.len(), 1, "verifying an existing ticket never notifies again");
    let ticket = &state.tickets[&first.ticket_id];
    assert_eq!(ticket.events.last().unwrap().action, TicketEventKind::Verified);
}

#[test]
fn low_severity_ticket_does_not_notify() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    let outcome = mgr.open_ticket(&mut state, vuln_finding(t0, 1, "acme"), "new finding", t0);
    assert!(!outcome.notify);
    assert!(state.notifications.is_empty());
}

#[test]
fn unknown_owner_ticket_closes_immediately() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    let outcome = mgr.open_ticket(&mut state, vuln_finding(t0, 4, "UNKNOWN"), "new finding", t0);
    assert!(!state.tickets[&outcome.ticket_id].open);
}

#[test]
fn unseen_ticket_closes_on_sweep() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);

    let mut sweep_mgr = VulnTicketManager::new("nessus", 90, false);
    sweep_mgr.set_scope([1u32], [443u16], ["plugin-1".to_string()]);
    let t1 = utc(2024, 1, 2);
    let closed = sweep_mgr.close_tickets(&mut state, t1);
    assert_eq!(closed, 1);
    assert!(!state.tickets.values().next().unwrap().open);
}

#[test]
fn false_positive_ticket_gets_unverified_not_closed() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    let outcome = mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);
    state
        .tickets
        .get_mut(&outcome.ticket_id)
        .unwrap()
        .mark_false_positive(t0, utc(2099, 1, 1), "reviewed");

    let mut sweep_mgr = VulnTicketManager::new("nessus", 90, false);
    sweep_mgr.set_scope([1u32], [443u16], ["plugin-1".to_string()]);
    let t1 = utc(2024, 1, 2);
    sweep_mgr.close_tickets(&mut state, t1);

    let ticket = &state.tickets[&outcome.ticket_id];
    assert!(ticket.open);
    assert_eq!(ticket.events.last().unwrap().action, TicketEventKind::Unverified);
}

fn port_finding(time: DateTime<Utc>, owner: &str) -> PortFinding {
    PortFinding {
        ip_int: 1,
        port: 80,
        protocol: "tcp".into(),
        source: "nmap".into(),
        source_id: "nmap".into(),
        owner: owner.to_string(),
        time,
        reference: None,
        name: "http".into(),
        service: Some("http".into()),
    }
}

#[test]
fn port_ticket_reopens_within_cutoff() {
    let mut state = MaterializedState::default();
    let mut mgr = IpPortTicketManager::new(90);
    let t0 = utc(2024, 1, 1);
    let id = mgr.open_ticket(&mut state, port_finding(t0, "acme"), "new finding", t0);

    mgr.set_scope([1u32], Vec::<u16>::new(), ["tcp".to_string()]);
    let t1 = utc(2024, 1, 2);
    mgr.close_tickets(&mut state, t1);
    assert!(!state.tickets[&id].open);

    let t2 = utc(2024, 1, 10);
    let mut mgr2 = IpPortTicketManager::new(90);
    let reopened = mgr2.open_ticket(&mut state, port_finding(t2, "acme"), "port open again", t2);
    assert_eq!(reopened, id);
    assert!(state.tickets[&id].open);
}

#[test]
fn every_new_port_ticket_notifies_regardless_of_severity() {
    let mut state = MaterializedState::default();
    let mut mgr = IpPortTicketManager::new(90);
    let t0 = utc(2024, 1, 1);
    let id = mgr.open_ticket(&mut state, port_finding(t0, "acme"), "new finding", t0);

    assert_eq!(state.notifications.len(), 1);
    assert_eq!(state.notifications[0].ticket_id, id);

    // Verifying the same finding again doesn't notify a second time.
    mgr.open_ticket(&mut state, port_finding(utc(2024, 1, 2), "acme"), "still open", utc(2024, 1, 2));
    assert_eq!(state.notifications.len(), 1);
}

#[test]
fn unknown_owner_port_ticket_does_not_notify() {
    let mut state = MaterializedState::default();
    let mut mgr = IpPortTicketManager::new(90);
    let t0 = utc(2024, 1, 1);
    mgr.open_ticket(&mut state, port_finding(t0, hygiene_core::UNKNOWN_OWNER), "new finding", t0);
    assert!(state.notifications.is_empty());
}

#[test]
fn all_ports_scanned_closes_port_zero_when_ip_has_no_open_ports() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    let outcome = mgr.open_ticket(
        &mut state,
        VulnFinding {
            ip_int: 5,
            port: 0,
            protocol: "tcp".into(),
            source_id: "general".into(),
            owner: "acme".into(),
            time: t0,
            reference: None,
            details: vuln_details(2),
        },
        "general finding",
        t0,
    );

    let mut port_mgr = IpPortTicketManager::new(90);
    port_mgr.set_scope([5u32], 0..=65534u16, ["tcp".to_string()]);
    let closed = port_mgr.close_tickets(&mut state, utc(2024, 1, 2));
    assert_eq!(closed, 1);
    assert!(!state.tickets[&outcome.ticket_id].open);
}

#[test]
fn udp_ticket_closes_even_when_its_port_is_out_of_scanned_scope() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    let outcome = mgr.open_ticket(
        &mut state,
        VulnFinding {
            ip_int: 1,
            port: 161,
            protocol: "udp".into(),
            source_id: "plugin-1".into(),
            owner: "acme".into(),
            time: t0,
            reference: None,
            details: vuln_details(3),
        },
        "new finding",
        t0,
    );

    // This run's scope never touched port 161, only port 443.
    let mut sweep_mgr = VulnTicketManager::new("nessus", 90, false);
    sweep_mgr.set_scope([1u32], [443u16], ["plugin-1".to_string()]);
    let closed = sweep_mgr.close_tickets(&mut state, utc(2024, 1, 2));
    assert_eq!(closed, 1);
    assert!(!state.tickets[&outcome.ticket_id].open);
}

#[test]
fn host_down_closes_open_ticket() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    let outcome = mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);

    let mut ip_mgr = IpTicketManager::new();
    ip_mgr.set_scope([1u32]);
    let closed = ip_mgr.close_tickets(&mut state, utc(2024, 1, 2));
    assert_eq!(closed, 1);
    assert!(!state.tickets[&outcome.ticket_id].open);
}

#[test]
fn host_up_leaves_ticket_open() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    let outcome = mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);

    let mut ip_mgr = IpTicketManager::new();
    ip_mgr.set_scope([1u32]);
    ip_mgr.ip_up(&mut state, "acme", 1, "nmap: host is up", None, utc(2024, 1, 2));
    let closed = ip_mgr.close_tickets(&mut state, utc(2024, 1, 2));
    assert_eq!(closed, 0);
    assert!(state.tickets[&outcome.ticket_id].open);
}

#[test]
fn host_down_sweep_clears_latest_on_the_host_vuln_docs() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);
    assert!(state.vuln_scans[0].header.latest);

    let mut ip_mgr = IpTicketManager::new();
    ip_mgr.set_scope([1u32]);
    ip_mgr.close_tickets(&mut state, utc(2024, 1, 2));

    assert!(!state.vuln_scans[0].header.latest);
}

#[test]
fn ip_up_appends_a_host_scan_doc_and_clears_the_prior_one() {
    let mut state = MaterializedState::default();
    let mut ip_mgr = IpTicketManager::new();
    ip_mgr.ip_up(&mut state, "acme", 1, "nmap: host is up", Some("Linux".to_string()), utc(2024, 1, 1));
    ip_mgr.ip_up(&mut state, "acme", 1, "nmap: host is up", Some("Linux".to_string()), utc(2024, 1, 2));

    assert_eq!(state.host_scans.len(), 2);
    assert_eq!(state.host_scans.iter().filter(|d| d.header.latest).count(), 1);
}

#[test]
fn vuln_finding_appends_a_scan_doc_and_clears_the_prior_one() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    mgr.set_scope([1u32], [443u16], ["plugin-1".to_string()]);
    let t0 = utc(2024, 1, 1);
    mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);

    let t1 = utc(2024, 1, 2);
    mgr.open_ticket(&mut state, vuln_finding(t1, 3, "acme"), "still present", t1);

    assert_eq!(state.vuln_scans.len(), 2);
    let latest: Vec<_> = state.vuln_scans.iter().filter(|d| d.header.latest).collect();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].header.time, t1);
}

#[test]
fn vuln_finding_does_not_clear_prior_scan_docs_with_an_empty_scope() {
    let mut state = MaterializedState::default();
    let mut mgr = VulnTicketManager::new("nessus", 90, false);
    let t0 = utc(2024, 1, 1);
    mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);
    let t1 = utc(2024, 1, 2);
    mgr.open_ticket(&mut state, vuln_finding(t1, 3, "acme"), "still present", t1);

    assert_eq!(state.vuln_scans.iter().filter(|d| d.header.latest).count(), 2);
}

#[test]
fn port_open_appends_a_scan_doc_and_clearing_sweeps_stale_vuln_docs() {
    let mut state = MaterializedState::default();
    let t0 = utc(2024, 1, 1);

    let mut vuln_mgr = VulnTicketManager::new("nessus", 90, false);
    vuln_mgr.open_ticket(&mut state, vuln_finding(t0, 3, "acme"), "new finding", t0);

    let mut port_mgr = IpPortTicketManager::new(90);
    port_mgr.set_scope([1u32], [80u16], vec!["tcp".to_string()]);
    port_mgr.port_open(&mut state, "acme", 1, 80, "tcp", Some("http".to_string()), t0);
    assert_eq!(state.port_scans.len(), 1);
    assert!(state.port_scans[0].is_open());

    // Port 443 (the vuln's port) never came back open this run.
    let t1 = utc(2024, 1, 2);
    port_mgr.close_tickets(&mut state, t1);

    assert!(!state.vuln_scans[0].header.latest);
}
