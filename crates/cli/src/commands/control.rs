// SPDX-License-Identifier: MIT

//! `hygiene control pause|stop` (C10): issue a control document for the
//! orchestrator to pick up on its next poll.

use clap::Subcommand;
use hygiene_core::{ControlAction, ControlTarget};
use std::path::Path;

#[derive(Subcommand)]
pub enum ControlCommand {
    /// Ask the orchestrator to pause reconciliation.
    Pause {
        /// Operator identity recorded on the control document.
        #[arg(long, default_value = "operator")]
        sender: String,
        /// Reason recorded on the control document.
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Ask the orchestrator to stop.
    Stop {
        #[arg(long, default_value = "operator")]
        sender: String,
        #[arg(long, default_value = "")]
        reason: String,
    },
}

pub fn run(state_dir: &Path, cmd: ControlCommand) -> anyhow::Result<i32> {
    let (action, sender, reason) = match cmd {
        ControlCommand::Pause { sender, reason } => (ControlAction::Pause, sender, reason),
        ControlCommand::Stop { sender, reason } => (ControlAction::Stop, sender, reason),
    };

    crate::store::with_state(state_dir, |state| {
        hygiene_engine::issue(state, action, ControlTarget::Commander, sender.clone(), reason.clone());
        Ok(())
    })?;

    println!("{action:?} request issued");
    Ok(0)
}
