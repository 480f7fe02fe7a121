// SPDX-License-Identifier: MIT

//! `hygiene tally sync` (C5): reconcile an owner's (or every owner's) tally
//! counters from the hosts table directly.

use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Subcommand)]
pub enum TallyCommand {
    /// Recompute tally counters.
    Sync(SyncArgs),
}

#[derive(Args)]
pub struct SyncArgs {
    /// Owner to sync; syncs every owner when omitted.
    owner: Option<String>,
}

pub fn run(state_dir: &Path, cmd: TallyCommand) -> anyhow::Result<i32> {
    let TallyCommand::Sync(args) = cmd;
    crate::store::with_state(state_dir, |state| {
        let now = chrono::Utc::now();
        match &args.owner {
            Some(owner) => hygiene_engine::sync_owner(state, owner, now),
            None => hygiene_engine::sync_all(state, now),
        }
        Ok(())
    })?;
    match args.owner {
        Some(owner) => println!("synced tally for {owner}"),
        None => println!("synced tallies for every owner"),
    }
    Ok(0)
}
