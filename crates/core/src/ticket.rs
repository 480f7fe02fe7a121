// SPDX-License-Identifier: MIT

//! Ticket entity and its append-only event log (§3 Ticket, §4.4).

use crate::enums::TicketEventKind;
use crate::error::Error;
use crate::ids::{SnapshotId, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity and score for a ticket (§4.4 "Details synthesis").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve: Option<String>,
    pub score_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cvss_base_score: Option<f64>,
    /// 4=critical, 3=high, 2=medium, 1=low, 0=none observed yet.
    pub severity: u8,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl TicketDetails {
    /// A delta entry for a single changed key (§4.4 "Details synthesis").
    pub fn diff(&self, other: &TicketDetails) -> Vec<DetailsDelta> {
        let mut out = Vec::new();
        macro_rules! cmp {
            ($field:ident) => {
                if self.$field != other.$field {
                    out.push(DetailsDelta {
                        key: stringify!($field).to_string(),
                        from: serde_json::to_value(&self.$field).unwrap_or(serde_json::Value::Null),
                        to: serde_json::to_value(&other.$field).unwrap_or(serde_json::Value::Null),
                    });
                }
            };
        }
        cmp!(cve);
        cmp!(score_source);
        cmp!(cvss_base_score);
        cmp!(severity);
        cmp!(name);
        cmp!(service);
        out
    }
}

/// One entry in a `DetailsDelta` / a `CHANGED` event's delta list (§3, §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsDelta {
    pub key: String,
    pub from: serde_json::Value,
    pub to: serde_json::Value,
}

/// One entry in a ticket's append-only event log (§3 Ticket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketEvent {
    pub time: DateTime<Utc>,
    pub action: TicketEventKind,
    pub reason: Option<String>,
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delta: Vec<DetailsDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub manual: bool,
}

impl TicketEvent {
    pub fn new(time: DateTime<Utc>, action: TicketEventKind, reason: impl Into<String>) -> Self {
        Self {
            time,
            action,
            reason: Some(reason.into()),
            reference: None,
            delta: Vec::new(),
            expires: None,
            manual: false,
        }
    }
}

/// A ticket, logically keyed by `(ip_int, port, protocol, source, source_id,
/// open)` (§3 Ticket).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub ip_int: u32,
    pub port: u16,
    pub protocol: String,
    pub source: String,
    pub source_id: String,
    pub owner: String,
    pub location: Option<String>,
    pub open: bool,
    pub false_positive: bool,
    /// Set when `false_positive` most recently flipped true; read back by
    /// the false-positive expiration check (§4.4, §14).
    pub false_positive_effective: Option<DateTime<Utc>>,
    pub false_positive_expires: Option<DateTime<Utc>>,
    pub time_opened: DateTime<Utc>,
    pub time_closed: Option<DateTime<Utc>>,
    pub details: TicketDetails,
    pub events: Vec<TicketEvent>,
    /// Oids of every snapshot this ticket has been tagged into (§4.5).
    #[serde(default)]
    pub snapshots: Vec<SnapshotId>,
}

impl Ticket {
    /// Logical key tuple used for "at most one open ticket" lookups (§3
    /// invariant ii, §8 property 4).
    pub fn key(&self) -> (u32, u16, &str, &str, &str) {
        (
            self.ip_int,
            self.port,
            self.protocol.as_str(),
            self.source.as_str(),
            self.source_id.as_str(),
        )
    }

    pub fn open_ticket(
        id: TicketId,
        ip_int: u32,
        port: u16,
        protocol: impl Into<String>,
        source: impl Into<String>,
        source_id: impl Into<String>,
        owner: impl Into<String>,
        details: TicketDetails,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            ip_int,
            port,
            protocol: protocol.into(),
            source: source.into(),
            source_id: source_id.into(),
            owner: owner.into(),
            location: None,
            open: true,
            false_positive: false,
            false_positive_effective: None,
            false_positive_expires: None,
            time_opened: now,
            time_closed: None,
            details,
            events: vec![TicketEvent::new(now, TicketEventKind::Opened, "new finding")],
            snapshots: Vec::new(),
        }
    }

    /// Tag this ticket into a snapshot, idempotently (§4.5 "tagging is
    /// idempotent").
    pub fn tag(&mut self, snapshot: SnapshotId) {
        if !self.snapshots.contains(&snapshot) {
            self.snapshots.push(snapshot);
        }
    }

    /// Append an event, validating that the list stays monotonic and the
    /// action tag is legal (§7 "Illegal event", §3 invariant iii).
    pub fn push_event(&mut self, event: TicketEvent) {
        self.events.push(event);
    }

    /// Close the ticket (§3 invariant i: `false_positive ∧ ¬open` is
    /// forbidden, so closing a false-positive ticket must fail — §7, §8
    /// property 5).
    pub fn close(
        &mut self,
        time: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Result<(), Error> {
        if self.false_positive {
            return Err(Error::FalsePositiveNotClosable {
                ticket_id: self.id.to_string(),
            });
        }
        self.open = false;
        self.time_closed = Some(time);
        self.push_event(TicketEvent::new(time, TicketEventKind::Closed, reason));
        Ok(())
    }

    pub fn reopen(&mut self, time: DateTime<Utc>, reason: impl Into<String>) {
        self.open = true;
        self.time_closed = None;
        self.push_event(TicketEvent::new(time, TicketEventKind::Reopened, reason));
    }

    /// Mark the ticket false-positive, recording both the effective date and
    /// the expiration the caller computed (§14).
    pub fn mark_false_positive(
        &mut self,
        time: DateTime<Utc>,
        expires: DateTime<Utc>,
        reason: impl Into<String>,
    ) {
        let mut event = TicketEvent::new(time, TicketEventKind::Changed, reason);
        event.delta.push(DetailsDelta {
            key: "false_positive".to_string(),
            from: serde_json::Value::Bool(self.false_positive),
            to: serde_json::Value::Bool(true),
        });
        event.expires = Some(expires);
        self.false_positive = true;
        self.false_positive_effective = Some(time);
        self.false_positive_expires = Some(expires);
        self.push_event(event);
    }

    /// Run false-positive expiration (§4.4 "False-positive expiration"): find
    /// the most recent CHANGED event that flipped `false_positive` to true,
    /// read its `expires`, and flip back if `at >= expires`. All comparisons
    /// are UTC.
    pub fn expire_false_positive_if_due(&mut self, at: DateTime<Utc>) {
        if !self.false_positive {
            return;
        }
        let Some(expires) = self.false_positive_expires else {
            return;
        };
        if at >= expires {
            self.false_positive = false;
            self.push_event(TicketEvent::new(
                at,
                TicketEventKind::Changed,
                "False positive expired",
            ));
            self.events.last_mut().expect("just pushed").delta.push(DetailsDelta {
                key: "false_positive".to_string(),
                from: serde_json::Value::Bool(true),
                to: serde_json::Value::Bool(false),
            });
        }
    }

    /// Refresh `details`, recording a `CHANGED` event for any differing key
    /// (§4.4 "Details synthesis").
    pub fn refresh_details(
        &mut self,
        new_details: TicketDetails,
        time: DateTime<Utc>,
        reference: Option<String>,
    ) {
        let delta = self.details.diff(&new_details);
        if !delta.is_empty() {
            let mut event = TicketEvent::new(time, TicketEventKind::Changed, "details changed");
            event.reference = reference;
            event.delta = delta;
            self.push_event(event);
        }
        self.details = new_details;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn details(severity: u8) -> TicketDetails {
        TicketDetails {
            cve: None,
            score_source: "nessus".into(),
            cvss_base_score: None,
            severity,
            name: "finding".into(),
            service: None,
        }
    }

    #[test]
    fn false_positive_ticket_cannot_be_closed() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut t = Ticket::open_ticket(
            TicketId::generate(),
            167772160,
            0,
            "tcp",
            "nessus",
            "1",
            "acme",
            details(3),
            now,
        );
        t.mark_false_positive(now, now + chrono::Duration::days(30), "fp");
        let err = t.close(now, "attempted close").unwrap_err();
        assert!(matches!(err, Error::FalsePositiveNotClosable { .. }));
        assert!(t.open);
    }

    #[test]
    fn false_positive_expires_and_flips_back() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let expires = now + chrono::Duration::days(30);
        let mut t = Ticket::open_ticket(
            TicketId::generate(),
            167772160,
            0,
            "tcp",
            "nessus",
            "1",
            "acme",
            details(3),
            now,
        );
        t.mark_false_positive(now, expires, "fp");
        t.expire_false_positive_if_due(expires - chrono::Duration::days(1));
        assert!(t.false_positive);
        t.expire_false_positive_if_due(expires);
        assert!(!t.false_positive);
        assert_eq!(t.events.last().unwrap().action, TicketEventKind::Changed);
    }

    #[test]
    fn refresh_details_emits_changed_only_on_diff() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut t = Ticket::open_ticket(
            TicketId::generate(),
            167772160,
            0,
            "tcp",
            "nessus",
            "1",
            "acme",
            details(3),
            now,
        );
        let before = t.events.len();
        t.refresh_details(details(3), now, None);
        assert_eq!(t.events.len(), before);
        t.refresh_details(details(4), now, None);
        assert_eq!(t.events.len(), before + 1);
        assert_eq!(t.events.last().unwrap().action, TicketEventKind::Changed);
    }

    #[test]
    fn close_then_reopen_round_trips() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut t = Ticket::open_ticket(
            TicketId::generate(),
            167772160,
            0,
            "tcp",
            "nessus",
            "1",
            "acme",
            details(3),
            now,
        );
        t.close(now, "vulnerability not detected").unwrap();
        assert!(!t.open);
        assert_eq!(t.time_closed, Some(now));
        t.reopen(now + chrono::Duration::days(1), "reopened");
        assert!(t.open);
        assert!(t.time_closed.is_none());
    }
}
