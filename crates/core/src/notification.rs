// SPDX-License-Identifier: MIT

//! Notification documents (§4.4): produced alongside a ticket when it meets
//! a manager's "tell somebody" rule — severity > 2 for the vuln manager,
//! every new ticket for the IP-Port manager.

use crate::ids::{NotificationId, TicketId};
use serde::{Deserialize, Serialize};

/// One notification, tied back to the ticket that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub ticket_id: TicketId,
    pub owner: String,
    pub ip_int: u32,
    pub reason: String,
    pub time: chrono::DateTime<chrono::Utc>,
}

impl Notification {
    pub fn new(
        ticket_id: TicketId,
        owner: impl Into<String>,
        ip_int: u32,
        reason: impl Into<String>,
        time: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            ticket_id,
            owner: owner.into(),
            ip_int,
            reason: reason.into(),
            time,
        }
    }
}
