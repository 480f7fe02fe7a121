// SPDX-License-Identifier: MIT

use super::*;
use chrono::{TimeZone, Utc, Weekday};
use hygiene_core::{AgencyType, Host, ScanWindow};
use hygiene_storage::MaterializedState;

fn always_open_request(owner: &str) -> Request {
    Request {
        owner: owner.to_string(),
        agency_type: AgencyType::Federal,
        period_start: Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
        windows: vec![ScanWindow {
            day: Weekday::Mon,
            start: chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            duration_hours: 168,
        }],
        cidrs: vec![],
        init_stage: Stage::Netscan1,
        scheduler: None,
        scan_types: vec![],
        stakeholder: true,
        children: vec![],
        retired: false,
        scan_limits: [(Stage::Portscan, 2)].into_iter().collect(),
    }
}

fn waiting_host(ip: u32, owner: &str) -> Host {
    let mut h = Host::new(ip, owner, Stage::Portscan, 0.0);
    h.status = Status::Waiting;
    h
}

#[test]
fn promotes_waiting_hosts_up_to_limit() {
    let mut state = MaterializedState::default();
    let owner = "acme";
    state.requests.insert(owner.to_string(), always_open_request(owner));
    for ip in 1..=5u32 {
        state.hosts.insert(ip, waiting_host(ip, owner));
    }
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let outcome = reconcile_stage(&mut state, owner, Stage::Portscan, 2, now);
    assert_eq!(outcome.promoted, 2);
    let ready_count = state
        .hosts_by_owner_stage_status(owner, Stage::Portscan, Status::Ready)
        .len();
    assert_eq!(ready_count, 2);
}

#[test]
fn demotes_ready_hosts_when_limit_shrinks() {
    let mut state = MaterializedState::default();
    let owner = "acme";
    for ip in 1..=3u32 {
        let mut h = waiting_host(ip, owner);
        h.status = Status::Ready;
        state.hosts.insert(ip, h);
    }
    let now = Utc::now();
    let outcome = reconcile_stage(&mut state, owner, Stage::Portscan, 1, now);
    assert_eq!(outcome.demoted, 2);
    assert_eq!(
        state.hosts_by_owner_stage_status(owner, Stage::Portscan, Status::Ready).len(),
        1
    );
}

#[test]
fn running_hosts_shrink_target_ready() {
    let mut state = MaterializedState::default();
    let owner = "acme";
    let mut running = waiting_host(1, owner);
    running.status = Status::Running;
    state.hosts.insert(1, running);
    for ip in 2..=4u32 {
        state.hosts.insert(ip, waiting_host(ip, owner));
    }
    let now = Utc::now();
    // limit 2, running 1 => target_ready = 1
    let outcome = reconcile_stage(&mut state, owner, Stage::Portscan, 2, now);
    assert_eq!(outcome.promoted, 1);
}

#[test]
fn outside_scan_window_limits_are_zero() {
    let owner = "acme";
    let mut request = always_open_request(owner);
    request.period_start = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let limits = effective_limits(&request, now);
    assert!(limits.values().all(|&v| v == 0));
}
