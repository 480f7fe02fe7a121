// SPDX-License-Identifier: MIT

//! hygiene - operator CLI for the Cyber Hygiene scan-orchestration core.
//!
//! Each command loads materialized state, mutates it, and checkpoints it
//! back (§0) — there is no long-lived daemon client here, only a one-shot
//! load/mutate/save cycle around `hygiene-storage`/`hygiene-engine`.

mod commands;
mod store;

use clap::{Parser, Subcommand};
use commands::{control, host, id_update, snapshot, tally};

#[derive(Parser)]
#[command(name = "hygiene", version, about = "Cyber Hygiene operator CLI")]
struct Cli {
    /// Override the resolved state directory.
    #[arg(long, global = true, value_name = "DIR")]
    state_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename an owner across every collection (§6 representative CLI).
    IdUpdate(id_update::IdUpdateArgs),
    /// Snapshot operations.
    #[command(subcommand)]
    Snapshot(snapshot::SnapshotCommand),
    /// Pause or stop the orchestrator (C10).
    #[command(subcommand)]
    Control(control::ControlCommand),
    /// Tally reconciliation (C5).
    #[command(subcommand)]
    Tally(tally::TallyCommand),
    /// Inspect one host.
    Host(host::HostArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let state_dir = match cli.state_dir {
        Some(dir) => dir,
        None => hygiene_daemon_state_dir()?,
    };

    let code = match cli.command {
        Commands::IdUpdate(args) => id_update::run(&state_dir, args)?,
        Commands::Snapshot(cmd) => snapshot::run(&state_dir, cmd)?,
        Commands::Control(cmd) => control::run(&state_dir, cmd)?,
        Commands::Tally(cmd) => tally::run(&state_dir, cmd)?,
        Commands::Host(args) => host::run(&state_dir, args)?,
    };
    std::process::exit(code);
}

/// Resolve the state directory the same way `hygiened` does, without
/// depending on the daemon crate's binary target.
fn hygiene_daemon_state_dir() -> anyhow::Result<std::path::PathBuf> {
    if let Ok(dir) = std::env::var("HYGIENE_STATE_DIR") {
        return Ok(std::path::PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(std::path::PathBuf::from(xdg).join("hygiene"));
    }
    let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("could not determine state directory"))?;
    Ok(std::path::PathBuf::from(home).join(".local/state/hygiene"))
}
