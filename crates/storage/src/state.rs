// SPDX-License-Identifier: MIT

//! Materialized, in-memory implementation of the store contract (C3, §1,
//! §6). Collections are plain `HashMap`s keyed by primary id; the secondary
//! "indices" §6 names are implemented as query methods doing a linear scan
//! over those maps rather than as separate index trees, since nothing here
//! demands more than primary-key lookups plus the occasional filtered scan.

use hygiene_core::scandoc::{HostScanDoc, PortScanDoc, VulnScanDoc};
use hygiene_core::{
    Event, Host, Notification, Request, SnapshotId, Stage, Status, SystemControl, Tally, Ticket,
    TicketId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything §6 calls a "collection", rebuilt by replaying the WAL from
/// the last checkpoint (§0).
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub hosts: HashMap<u32, Host>,
    pub tallies: HashMap<String, Tally>,
    pub requests: HashMap<String, Request>,
    pub tickets: HashMap<TicketId, Ticket>,
    pub host_scans: Vec<HostScanDoc>,
    pub port_scans: Vec<PortScanDoc>,
    pub vuln_scans: Vec<VulnScanDoc>,
    pub snapshots: HashMap<SnapshotId, hygiene_core::Snapshot>,
    pub control: Vec<SystemControl>,
    pub notifications: Vec<Notification>,
}

impl MaterializedState {
    /// §6 index: tickets by `(ip_int, port, protocol, source, source_id,
    /// open, false_positive)` — narrowed here to the lookup the ticket
    /// lifecycle managers actually need: the single open ticket for a
    /// logical key (§3 invariant ii).
    pub fn open_ticket_for_key(
        &self,
        ip_int: u32,
        port: u16,
        protocol: &str,
        source: &str,
        source_id: &str,
    ) -> Option<&Ticket> {
        self.tickets.values().find(|t| {
            t.open && t.key() == (ip_int, port, protocol, source, source_id)
        })
    }

    pub fn open_ticket_for_key_mut(
        &mut self,
        ip_int: u32,
        port: u16,
        protocol: &str,
        source: &str,
        source_id: &str,
    ) -> Option<&mut Ticket> {
        self.tickets.values_mut().find(|t| {
            t.open && t.key() == (ip_int, port, protocol, source, source_id)
        })
    }

    /// Most recently closed ticket for a logical key, for the reopen check
    /// (§4.4 step 2: `time_closed > now - reopen_days`).
    pub fn latest_closed_ticket_for_key(
        &self,
        ip_int: u32,
        port: u16,
        protocol: &str,
        source: &str,
        source_id: &str,
    ) -> Option<&Ticket> {
        self.tickets
            .values()
            .filter(|t| !t.open && t.key() == (ip_int, port, protocol, source, source_id))
            .max_by_key(|t| t.time_closed)
    }

    /// §6 index: tickets by `(open, owner)`.
    pub fn tickets_by_owner_open(&self, owner: &str, open: bool) -> Vec<&Ticket> {
        self.tickets
            .values()
            .filter(|t| t.open == open && t.owner == owner)
            .collect()
    }

    /// §6 index: tickets by `(time_opened, open)`.
    pub fn tickets_opened_since(
        &self,
        since: chrono::DateTime<chrono::Utc>,
        open: bool,
    ) -> Vec<&Ticket> {
        self.tickets
            .values()
            .filter(|t| t.open == open && t.time_opened >= since)
            .collect()
    }

    /// §6 index: hosts by `(status, stage, owner, priority, r)`, the fleet
    /// balancer's promotion/demotion ordering (§4.2).
    pub fn hosts_by_owner_stage_status(
        &self,
        owner: &str,
        stage: Stage,
        status: Status,
    ) -> Vec<&Host> {
        let mut matches: Vec<&Host> = self
            .hosts
            .values()
            .filter(|h| h.owner == owner && h.stage == stage && h.status == status)
            .collect();
        matches.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.r.partial_cmp(&b.r).unwrap_or(std::cmp::Ordering::Equal))
        });
        matches
    }

    /// §6 index: hosts by `(next_scan, state.up, status)`, the rescan
    /// scheduler's due-for-scan query (§4.3).
    pub fn hosts_due_for_rescan(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<&Host> {
        self.hosts
            .values()
            .filter(|h| h.status == Status::Done && h.next_scan.is_some_and(|t| t <= now))
            .collect()
    }

    pub fn owners_with_children_of(&self, owner: &str) -> Vec<String> {
        self.requests
            .get(owner)
            .map(|r| r.children.clone())
            .unwrap_or_default()
    }

    /// Apply a WAL entry to derive state (§0). Handlers are idempotent:
    /// replaying the same event twice leaves state unchanged the second
    /// time.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::HostUpserted {
                ip_int,
                owner,
                stage,
                status,
                priority,
                r,
                up,
                reason,
                time,
            } => {
                let host = self.hosts.entry(*ip_int).or_insert_with(|| {
                    Host::new(*ip_int, owner.clone(), *stage, *r)
                });
                host.owner = owner.clone();
                host.stage = *stage;
                host.status = *status;
                host.priority = *priority;
                host.r = *r;
                host.state.up = *up;
                host.state.reason = reason.clone();
                host.last_change = *time;
            }
            Event::HostTransitioned {
                ip_int,
                to_stage,
                to_status,
                time,
                ..
            } => {
                if let Some(host) = self.hosts.get_mut(ip_int) {
                    host.stage = *to_stage;
                    host.status = *to_status;
                    host.last_change = *time;
                }
            }
            Event::TallyTransferred {
                owner,
                stage,
                from,
                to,
                count,
                time,
            } => {
                let tally = self
                    .tallies
                    .entry(owner.clone())
                    .or_insert_with(|| Tally::new(owner.clone(), *time));
                tally.transfer(*stage, *from, *to, *count, *time);
            }
            Event::TallySynced { owner, .. } => {
                let Some(owner_hosts): Option<Vec<(Stage, Status)>> = Some(
                    self.hosts
                        .values()
                        .filter(|h| &h.owner == owner)
                        .map(|h| (h.stage, h.status))
                        .collect(),
                ) else {
                    return;
                };
                if let Some(tally) = self.tallies.get_mut(owner) {
                    tally.sync(owner_hosts.into_iter());
                }
            }
            Event::RequestSaved { owner, parent } => {
                if let Some(parent_owner) = parent {
                    if let Some(parent_req) = self.requests.get_mut(parent_owner) {
                        if !parent_req.children.iter().any(|c| c == owner) {
                            parent_req.children.push(owner.clone());
                        }
                    }
                }
            }
            Event::TicketOpened {
                ticket_id,
                ip_int,
                port,
                protocol,
                source,
                source_id,
                owner,
                details,
                time,
            } => {
                self.tickets.entry(ticket_id.clone()).or_insert_with(|| {
                    Ticket::open_ticket(
                        ticket_id.clone(),
                        *ip_int,
                        *port,
                        protocol.clone(),
                        source.clone(),
                        source_id.clone(),
                        owner.clone(),
                        details.clone(),
                        *time,
                    )
                });
            }
            Event::TicketEventAppended {
                ticket_id,
                action,
                reason,
                delta,
                time,
            } => {
                if let Some(ticket) = self.tickets.get_mut(ticket_id) {
                    let already_applied = ticket
                        .events
                        .last()
                        .is_some_and(|e| e.action == *action && e.time == *time);
                    if !already_applied {
                        let mut ev = hygiene_core::TicketEvent::new(
                            *time,
                            *action,
                            reason.clone().unwrap_or_default(),
                        );
                        ev.delta = delta.clone();
                        ticket.push_event(ev);
                        match action {
                            hygiene_core::TicketEventKind::Closed => {
                                ticket.open = false;
                                ticket.time_closed = Some(*time);
                            }
                            hygiene_core::TicketEventKind::Reopened => {
                                ticket.open = true;
                                ticket.time_closed = None;
                            }
                            _ => {}
                        }
                    }
                }
            }
            Event::TicketOwnerChanged { ticket_id, to, .. } => {
                if let Some(ticket) = self.tickets.get_mut(ticket_id) {
                    ticket.owner = to.clone();
                }
            }
            Event::ScanDocSaved { .. } => {
                // Scan documents are appended directly by the ticket
                // lifecycle managers (push_host_scan / push_port_scan /
                // push_vuln_scan in hygiene-engine::ticket_lifecycle), which
                // also clear `latest` on the observations they supersede;
                // replay is a no-op here for the same direct-mutation reason
                // as SnapshotSaved below.
            }
            Event::ScanDocTagged {
                owner,
                ip_int,
                kind,
                snapshot,
            } => {
                use hygiene_core::scandoc::ScanDocKind;
                match kind {
                    ScanDocKind::HostScan => {
                        for doc in self.host_scans.iter_mut().filter(|d| {
                            &d.header.owner == owner && d.header.ip_int == *ip_int
                        }) {
                            doc.header.tag(snapshot.clone());
                        }
                    }
                    ScanDocKind::PortScan => {
                        for doc in self.port_scans.iter_mut().filter(|d| {
                            &d.header.owner == owner && d.header.ip_int == *ip_int
                        }) {
                            doc.header.tag(snapshot.clone());
                        }
                    }
                    ScanDocKind::VulnScan => {
                        for doc in self.vuln_scans.iter_mut().filter(|d| {
                            &d.header.owner == owner && d.header.ip_int == *ip_int
                        }) {
                            doc.header.tag(snapshot.clone());
                        }
                    }
                }
            }
            Event::SnapshotSaved { .. } => {
                // Snapshots are inserted directly by the snapshot builder
                // (save_snapshot); replay is a no-op for the same reason as
                // ScanDocSaved above.
            }
            Event::ControlIssued {
                action,
                target,
                sender,
                reason,
            } => {
                self.control
                    .push(SystemControl::new(*action, *target, sender.clone(), reason.clone()));
            }
            Event::ControlAcknowledged { action, target } => {
                if let Some(ctl) = self
                    .control
                    .iter_mut()
                    .find(|c| c.action == *action && c.target == *target && !c.completed)
                {
                    ctl.acknowledge(true);
                }
            }
            Event::OwnerRenamed { from, to } => {
                if let Some(req) = self.requests.remove(from) {
                    let mut req = req;
                    req.owner = to.clone();
                    self.requests.insert(to.clone(), req);
                }
                if let Some(tally) = self.tallies.remove(from) {
                    let mut tally = tally;
                    tally.owner = to.clone();
                    self.tallies.insert(to.clone(), tally);
                }
                for host in self.hosts.values_mut().filter(|h| &h.owner == from) {
                    host.owner = to.clone();
                }
                for ticket in self.tickets.values_mut().filter(|t| &t.owner == from) {
                    ticket.owner = to.clone();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
