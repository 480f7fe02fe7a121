// SPDX-License-Identifier: MIT

//! Domain errors raised by pure state-machine and entity code (§7, §11).
//!
//! Kept deliberately small: `hygiene-core` never does I/O, so these variants
//! cover only illegal state transitions, not storage or network failures
//! (those live in `hygiene-storage`/`hygiene-engine`, §11).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("ticket {ticket_id} is marked false positive and cannot be closed")]
    FalsePositiveNotClosable { ticket_id: String },

    #[error("illegal ticket event {action} on ticket {ticket_id} in state open={open}")]
    IllegalTicketEvent {
        ticket_id: String,
        action: String,
        open: bool,
    },

    #[error("invalid scan window: {reason}")]
    InvalidWindow { reason: String },
}
