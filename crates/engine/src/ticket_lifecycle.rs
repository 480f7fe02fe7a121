// SPDX-License-Identifier: MIT

//! Ticket lifecycle managers (C8, §4.4): one manager per scan stage, each
//! scoped to a single scan run. A manager tracks what it has seen as
//! findings stream in, then closes whatever in its scope went unseen.

use chrono::{DateTime, Utc};
use hygiene_core::{
    HostScanDoc, Notification, PortScanDoc, ScanDocHeader, Ticket, TicketDetails, TicketEventKind,
    TicketId, VulnScanDoc, UNKNOWN_OWNER,
};
use hygiene_storage::MaterializedState;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

pub mod details;
pub use details::{CveOverride, CveTable};

/// Append a host-scan observation and clear `latest` on whichever prior
/// observation shared its `(owner, ip_int)` key (§3 ScanDoc invariant).
fn push_host_scan(state: &mut MaterializedState, doc: HostScanDoc) {
    for prior in state
        .host_scans
        .iter_mut()
        .filter(|d| d.header.latest && d.header.owner == doc.header.owner && d.header.ip_int == doc.header.ip_int)
    {
        prior.header.latest = false;
    }
    state.host_scans.push(doc);
}

/// Append a port-scan observation and clear `latest` on whichever prior
/// observation shared its `(owner, ip_int, port, protocol)` key.
fn push_port_scan(state: &mut MaterializedState, doc: PortScanDoc) {
    for prior in state.port_scans.iter_mut().filter(|d| {
        d.header.latest
            && d.header.owner == doc.header.owner
            && d.header.ip_int == doc.header.ip_int
            && d.port == doc.port
            && d.protocol == doc.protocol
    }) {
        prior.header.latest = false;
    }
    state.port_scans.push(doc);
}

/// Append a vuln-scan observation. Clearing `latest` on whichever prior
/// observation shared its logical key requires all three of `ips`, `ports`,
/// `source_ids` to be non-empty (§4.4 "Clearing `latest` on vuln documents
/// requires all three of (ips, ports, source_ids) non-empty").
fn push_vuln_scan(
    state: &mut MaterializedState,
    doc: VulnScanDoc,
    ips: &HashSet<u32>,
    ports: &HashSet<u16>,
    source_ids: &HashSet<String>,
) {
    if !ips.is_empty() && !ports.is_empty() && !source_ids.is_empty() {
        for prior in state.vuln_scans.iter_mut().filter(|d| {
            d.header.latest
                && d.header.owner == doc.header.owner
                && d.header.ip_int == doc.header.ip_int
                && d.port == doc.port
                && d.protocol == doc.protocol
                && d.source == doc.source
                && d.source_id == doc.source_id
        }) {
            prior.header.latest = false;
        }
    }
    state.vuln_scans.push(doc);
}

/// One vulnerability finding feeding the vuln ticket manager (§4.4 step 1).
pub struct VulnFinding {
    pub ip_int: u32,
    pub port: u16,
    pub protocol: String,
    pub source_id: String,
    pub owner: String,
    pub time: DateTime<Utc>,
    pub reference: Option<String>,
    pub details: TicketDetails,
}

/// Outcome of opening one finding against the vuln manager: `notify` is set
/// when a fresh ticket is severity > 2 (§4.4 "Create notifications for
/// Highs (3) or Criticals (4)").
pub struct OpenOutcome {
    pub ticket_id: TicketId,
    pub notify: bool,
}

/// Handles ticket open/verify/reopen for one `(source, reopen_days)` scope
/// across a vulnerability scan run (§4.4).
pub struct VulnTicketManager {
    source: String,
    reopen_days: i64,
    manual_scan: bool,
    cves: CveTable,
    ips: HashSet<u32>,
    ports: HashSet<u16>,
    source_ids: HashSet<String>,
    seen: HashSet<TicketId>,
    closing_time: Option<DateTime<Utc>>,
}

impl VulnTicketManager {
    pub fn new(source: impl Into<String>, reopen_days: i64, manual_scan: bool) -> Self {
        Self {
            source: source.into(),
            reopen_days,
            manual_scan,
            cves: CveTable::new(),
            ips: HashSet::new(),
            ports: HashSet::new(),
            source_ids: HashSet::new(),
            seen: HashSet::new(),
            closing_time: None,
        }
    }

    pub fn with_cve_table(mut self, cves: CveTable) -> Self {
        self.cves = cves;
        self
    }

    pub fn set_scope(
        &mut self,
        ips: impl IntoIterator<Item = u32>,
        ports: impl IntoIterator<Item = u16>,
        source_ids: impl IntoIterator<Item = String>,
    ) {
        self.ips = ips.into_iter().collect();
        // General vulns live on port 0, but nmap never reports it open, so
        // it always has to be in scope (§4.4 step 1 note).
        self.ports = ports.into_iter().chain(std::iter::once(0)).collect();
        self.source_ids = source_ids.into_iter().collect();
    }

    fn reopen_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(self.reopen_days)
    }

    fn verified_or_changed_event(
        &self,
        kind: TicketEventKind,
        reason: &str,
        reference: Option<String>,
        time: DateTime<Utc>,
    ) -> hygiene_core::TicketEvent {
        let mut ev = hygiene_core::TicketEvent::new(time, kind, reason);
        ev.reference = reference;
        ev.manual = self.manual_scan;
        ev
    }

    /// Open, verify, or reopen a ticket for one finding (§4.4 step 1).
    pub fn open_ticket(
        &mut self,
        state: &mut MaterializedState,
        mut finding: VulnFinding,
        reason: &str,
        now: DateTime<Utc>,
    ) -> OpenOutcome {
        self.cves.apply(&mut finding.details);
        if self.closing_time.is_none_or(|t| t < finding.time) {
            self.closing_time = Some(finding.time);
        }

        let scan_doc = VulnScanDoc {
            header: ScanDocHeader::new(finding.owner.clone(), finding.ip_int, finding.time),
            port: finding.port,
            protocol: finding.protocol.clone(),
            source: self.source.clone(),
            source_id: finding.source_id.clone(),
            cve: finding.details.cve.clone(),
            severity: finding.details.severity,
            name: finding.details.name.clone(),
            service: finding.details.service.clone(),
        };
        push_vuln_scan(state, scan_doc, &self.ips, &self.ports, &self.source_ids);

        if let Some(ticket) = state.open_ticket_for_key_mut(
            finding.ip_int,
            finding.port,
            &finding.protocol,
            &self.source,
            &finding.source_id,
        ) {
            ticket.refresh_details(finding.details, finding.time, finding.reference.clone());
            ticket.expire_false_positive_if_due(finding.time);
            ticket.push_event(self.verified_or_changed_event(
                TicketEventKind::Verified,
                reason,
                finding.reference,
                finding.time,
            ));
            let id = ticket.id.clone();
            self.seen.insert(id.clone());
            debug!(ticket_id = %id, "vuln ticket verified");
            return OpenOutcome {
                ticket_id: id,
                notify: false,
            };
        }

        let cutoff = self.reopen_cutoff(now);
        if let Some(ticket) = state
            .latest_closed_ticket_for_key(
                finding.ip_int,
                finding.port,
                &finding.protocol,
                &self.source,
                &finding.source_id,
            )
            .filter(|t| t.time_closed.is_some_and(|tc| tc > cutoff))
            .map(|t| t.id.clone())
        {
            let ticket = state.tickets.get_mut(&ticket).expect("looked up by id");
            ticket.refresh_details(finding.details, finding.time, finding.reference.clone());
            ticket.reopen(finding.time, reason);
            if let Some(ev) = ticket.events.last_mut() {
                ev.reference = finding.reference;
                ev.manual = self.manual_scan;
            }
            let id = ticket.id.clone();
            self.seen.insert(id.clone());
            info!(ticket_id = %id, "vuln ticket reopened");
            return OpenOutcome {
                ticket_id: id,
                notify: false,
            };
        }

        let severity = finding.details.severity;
        let id = TicketId::generate();
        let mut ticket = Ticket::open_ticket(
            id.clone(),
            finding.ip_int,
            finding.port,
            finding.protocol,
            self.source.clone(),
            finding.source_id,
            finding.owner.clone(),
            finding.details,
            finding.time,
        );
        if let Some(ev) = ticket.events.last_mut() {
            ev.reason = Some(reason.to_string());
            ev.reference = finding.reference;
            ev.manual = self.manual_scan;
        }

        let mut notify = false;
        if finding.owner == UNKNOWN_OWNER {
            ticket
                .close(finding.time, "No associated owner")
                .expect("freshly opened ticket is never a false positive");
        } else if severity > 2 {
            notify = true;
            state.notifications.push(Notification::new(
                id.clone(),
                finding.owner.clone(),
                finding.ip_int,
                "high or critical severity vulnerability",
                finding.time,
            ));
        }

        self.seen.insert(id.clone());
        info!(ticket_id = %id, owner = %finding.owner, severity, "vuln ticket opened");
        state.tickets.insert(id.clone(), ticket);
        OpenOutcome {
            ticket_id: id,
            notify,
        }
    }

    /// Close every ticket in scope that wasn't touched this run (§4.4 step
    /// 1 "anything in scope not closed by that cutoff gets a CLOSED or
    /// UNVERIFIED event"). UDP tickets are in scope regardless of port,
    /// mirroring the original query's `$or: [port in ports, protocol=udp]`
    /// broadening (§15(c)).
    pub fn close_tickets(&mut self, state: &mut MaterializedState, now: DateTime<Utc>) -> usize {
        let closing_time = self.closing_time.unwrap_or(now);
        let ids: Vec<TicketId> = state
            .tickets
            .values()
            .filter(|t| {
                t.open
                    && t.source == self.source
                    && self.ips.contains(&t.ip_int)
                    && (self.ports.contains(&t.port) || t.protocol == "udp")
                    && self.source_ids.contains(&t.source_id)
                    && !self.seen.contains(&t.id)
            })
            .map(|t| t.id.clone())
            .collect();

        let mut closed = 0;
        for id in ids {
            let ticket = state.tickets.get_mut(&id).expect("looked up by id");
            close_or_unverify(ticket, closing_time, "vulnerability not detected");
            closed += 1;
        }
        info!(source = %self.source, closed, "vuln ticket sweep complete");
        closed
    }
}

/// One port-scan finding feeding the IP/port ticket manager (§4.4 step 2).
pub struct PortFinding {
    pub ip_int: u32,
    pub port: u16,
    pub protocol: String,
    pub source: String,
    pub source_id: String,
    pub owner: String,
    pub time: DateTime<Utc>,
    pub reference: Option<String>,
    pub name: String,
    pub service: Option<String>,
}

const MAX_PORTS_COUNT: usize = 65535;

/// Handles ticket open/verify/reopen and closure for a PORTSCAN run,
/// tracking which `(ip, port)` pairs came back open (§4.4 step 2).
pub struct IpPortTicketManager {
    reopen_days: i64,
    ips: HashSet<u32>,
    ports: HashSet<u16>,
    protocols: HashSet<String>,
    seen_ip_port: HashMap<u32, HashSet<u16>>,
    closing_time: Option<DateTime<Utc>>,
}

impl IpPortTicketManager {
    pub fn new(reopen_days: i64) -> Self {
        Self {
            reopen_days,
            ips: HashSet::new(),
            ports: HashSet::new(),
            protocols: HashSet::new(),
            seen_ip_port: HashMap::new(),
            closing_time: None,
        }
    }

    pub fn set_scope(
        &mut self,
        ips: impl IntoIterator<Item = u32>,
        ports: impl IntoIterator<Item = u16>,
        protocols: impl IntoIterator<Item = String>,
    ) {
        self.ips = ips.into_iter().collect();
        self.ports = ports.into_iter().collect();
        self.protocols = protocols.into_iter().collect();
    }

    /// Record that `port` came back open on `ip_int` (§4.4 "`port_open(ip,
    /// port)` adds to `seen`"), and append the backing port-scan document.
    #[allow(clippy::too_many_arguments)]
    pub fn port_open(
        &mut self,
        state: &mut MaterializedState,
        owner: &str,
        ip_int: u32,
        port: u16,
        protocol: &str,
        service_name: Option<String>,
        time: DateTime<Utc>,
    ) {
        self.seen_ip_port.entry(ip_int).or_default().insert(port);
        let doc = PortScanDoc {
            header: ScanDocHeader::new(owner, ip_int, time),
            port,
            protocol: protocol.to_string(),
            state: "open".to_string(),
            service_name,
        };
        push_port_scan(state, doc);
    }

    fn reopen_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(self.reopen_days)
    }

    pub fn open_ticket(
        &mut self,
        state: &mut MaterializedState,
        finding: PortFinding,
        reason: &str,
        now: DateTime<Utc>,
    ) -> TicketId {
        if self.closing_time.is_none_or(|t| t < finding.time) {
            self.closing_time = Some(finding.time);
        }

        if let Some(ticket) = state.open_ticket_for_key_mut(
            finding.ip_int,
            finding.port,
            &finding.protocol,
            &finding.source,
            &finding.source_id,
        ) {
            ticket.expire_false_positive_if_due(finding.time);
            let mut ev = hygiene_core::TicketEvent::new(finding.time, TicketEventKind::Verified, reason);
            ev.reference = finding.reference;
            ticket.push_event(ev);
            let id = ticket.id.clone();
            debug!(ticket_id = %id, "port ticket verified");
            return id;
        }

        let cutoff = self.reopen_cutoff(now);
        if let Some(id) = state
            .latest_closed_ticket_for_key(
                finding.ip_int,
                finding.port,
                &finding.protocol,
                &finding.source,
                &finding.source_id,
            )
            .filter(|t| t.time_closed.is_some_and(|tc| tc > cutoff))
            .map(|t| t.id.clone())
        {
            let ticket = state.tickets.get_mut(&id).expect("looked up by id");
            ticket.reopen(finding.time, reason);
            if let Some(ev) = ticket.events.last_mut() {
                ev.reference = finding.reference;
            }
            info!(ticket_id = %id, "port ticket reopened");
            return id;
        }

        let id = TicketId::generate();
        let owner_is_unknown = finding.owner == UNKNOWN_OWNER;
        let mut ticket = Ticket::open_ticket(
            id.clone(),
            finding.ip_int,
            finding.port,
            finding.protocol,
            finding.source,
            finding.source_id,
            finding.owner,
            TicketDetails {
                cve: None,
                score_source: "none".to_string(),
                cvss_base_score: None,
                severity: 0,
                name: finding.name,
                service: finding.service,
            },
            finding.time,
        );
        if let Some(ev) = ticket.events.last_mut() {
            ev.reason = Some(reason.to_string());
            ev.reference = finding.reference;
        }
        if owner_is_unknown {
            ticket
                .close(finding.time, "No associated owner")
                .expect("freshly opened ticket is never a false positive");
        } else {
            // No severity gate for this family — every new ticket notifies
            // (§4.4 "a notification... for every new ticket of this family").
            state.notifications.push(Notification::new(
                id.clone(),
                ticket.owner.clone(),
                ticket.ip_int,
                "new open port",
                finding.time,
            ));
        }
        info!(ticket_id = %id, "port ticket opened");
        state.tickets.insert(id.clone(), ticket);
        id
    }

    /// Close tickets whose `(ip, port)` wasn't seen open this run. When
    /// every port in the range was scanned (§4.4 step 2 "all 65535 ports"),
    /// IPs with no open port at all get every protocol closed, including
    /// the general port-0 ticket — otherwise only the scanned protocols and
    /// ports are in play.
    pub fn close_tickets(&mut self, state: &mut MaterializedState, now: DateTime<Utc>) -> usize {
        let closing_time = self.closing_time.unwrap_or(now);
        let all_ports_scanned = self.ports.len() == MAX_PORTS_COUNT;

        let ids: Vec<TicketId> = state
            .tickets
            .values()
            .filter(|t| {
                if !t.open || !self.ips.contains(&t.ip_int) {
                    return false;
                }
                let seen_ports = self.seen_ip_port.get(&t.ip_int);
                if seen_ports.is_some_and(|ports| ports.contains(&t.port)) {
                    return false;
                }
                if all_ports_scanned {
                    let ip_has_any_open = seen_ports.is_some_and(|p| !p.is_empty());
                    if ip_has_any_open {
                        t.port != 0 && self.protocols.contains(&t.protocol)
                    } else {
                        true
                    }
                } else {
                    self.ports.contains(&t.port) && self.protocols.contains(&t.protocol)
                }
            })
            .map(|t| t.id.clone())
            .collect();

        let mut closed = 0;
        for id in ids {
            let ticket = state.tickets.get_mut(&id).expect("looked up by id");
            close_or_unverify(ticket, closing_time, "port not open");
            closed += 1;
        }

        // Clearing latest on vuln documents (§4.4 IP-Port manager): any
        // in-scope ip whose port wasn't seen open this run has a stale vuln
        // observation tied to that port.
        for doc in state.vuln_scans.iter_mut() {
            if doc.header.latest
                && self.ips.contains(&doc.header.ip_int)
                && !self
                    .seen_ip_port
                    .get(&doc.header.ip_int)
                    .is_some_and(|ports| ports.contains(&doc.port))
            {
                doc.header.latest = false;
            }
        }

        info!(closed, "port ticket sweep complete");
        closed
    }
}

/// Handles ticket closure for a NETSCAN run: any ticket on an IP that
/// wasn't found up gets closed (§4.4 step 3).
pub struct IpTicketManager {
    ips: HashSet<u32>,
    seen_ips: HashSet<u32>,
}

impl IpTicketManager {
    pub fn new() -> Self {
        Self {
            ips: HashSet::new(),
            seen_ips: HashSet::new(),
        }
    }

    pub fn set_scope(&mut self, ips: impl IntoIterator<Item = u32>) {
        self.ips = ips.into_iter().collect();
    }

    /// Record that `ip_int` answered the netscan (§4.4 "`ip_up(ip)` adds to
    /// `seen_ips`"), and append the backing host-scan document.
    pub fn ip_up(
        &mut self,
        state: &mut MaterializedState,
        owner: &str,
        ip_int: u32,
        reason: impl Into<String>,
        os_name: Option<String>,
        time: DateTime<Utc>,
    ) {
        self.seen_ips.insert(ip_int);
        let doc = HostScanDoc {
            header: ScanDocHeader::new(owner, ip_int, time),
            up: true,
            reason: reason.into(),
            os_name,
        };
        push_host_scan(state, doc);
    }

    pub fn close_tickets(&mut self, state: &mut MaterializedState, now: DateTime<Utc>) -> usize {
        let not_up: HashSet<u32> = self.ips.difference(&self.seen_ips).copied().collect();
        let ids: Vec<TicketId> = state
            .tickets
            .values()
            .filter(|t| t.open && not_up.contains(&t.ip_int))
            .map(|t| t.id.clone())
            .collect();

        let mut closed = 0;
        for id in ids {
            let ticket = state.tickets.get_mut(&id).expect("looked up by id");
            close_or_unverify(ticket, now, "host down");
            closed += 1;
        }

        // §4.4 IP manager: vuln documents tied to a host that didn't answer
        // this run are stale.
        for doc in state.vuln_scans.iter_mut() {
            if doc.header.latest && not_up.contains(&doc.header.ip_int) {
                doc.header.latest = false;
            }
        }

        info!(closed, "host-down ticket sweep complete");
        closed
    }
}

impl Default for IpTicketManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared closure rule (§4.4, all three managers): false positives never
/// get closed, they get an UNVERIFIED event instead; everything else closes.
fn close_or_unverify(ticket: &mut Ticket, time: DateTime<Utc>, reason: &str) {
    ticket.expire_false_positive_if_due(time);
    if ticket.false_positive {
        ticket.push_event(hygiene_core::TicketEvent::new(
            time,
            TicketEventKind::Unverified,
            reason,
        ));
    } else {
        ticket
            .close(time, reason)
            .expect("false_positive checked above");
    }
}

#[cfg(test)]
#[path = "ticket_lifecycle_tests.rs"]
mod tests;
