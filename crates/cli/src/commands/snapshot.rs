// SPDX-License-Identifier: MIT

//! `hygiene snapshot build|world-stats` (C9).

use clap::{Args, Subcommand};
use hygiene_core::descendants;
use std::path::Path;

#[derive(Subcommand)]
pub enum SnapshotCommand {
    /// Build a snapshot for one owner (and its descendants).
    Build(BuildArgs),
    /// Print aggregate world statistics across latest snapshots.
    WorldStats,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Owner to snapshot.
    owner: String,
}

pub fn run(state_dir: &Path, cmd: SnapshotCommand) -> anyhow::Result<i32> {
    match cmd {
        SnapshotCommand::Build(args) => build(state_dir, args),
        SnapshotCommand::WorldStats => world_stats(state_dir),
    }
}

fn build(state_dir: &Path, args: BuildArgs) -> anyhow::Result<i32> {
    let oid = crate::store::with_state(state_dir, |state| {
        let children = descendants(&args.owner, |owner| state.owners_with_children_of(owner));
        Ok(hygiene_engine::build_snapshot(state, &args.owner, children, chrono::Utc::now()))
    })?;
    println!("built snapshot {oid} for {}", args.owner);
    Ok(0)
}

fn world_stats(state_dir: &Path) -> anyhow::Result<i32> {
    let (state, _) = hygiene_storage::recover(state_dir)?;
    let stats = hygiene_engine::world_stats(&state);
    println!("{}", serde_json::to_string_pretty(&WorldStatsJson::from(stats))?);
    Ok(0)
}

#[derive(serde::Serialize)]
struct WorldStatsJson {
    host_count: u64,
    vulnerable_host_count: u64,
    severity_total: u64,
    severity_critical: u64,
    severity_high: u64,
}

impl From<hygiene_engine::WorldStats> for WorldStatsJson {
    fn from(stats: hygiene_engine::WorldStats) -> Self {
        Self {
            host_count: stats.host_count,
            vulnerable_host_count: stats.vulnerable_host_count,
            severity_total: stats.severity.total,
            severity_critical: stats.severity.critical,
            severity_high: stats.severity.high,
        }
    }
}
