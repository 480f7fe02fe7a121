// SPDX-License-Identifier: MIT

//! `hygiene host show IP` — inspect one host's current state.

use clap::Args;
use std::net::Ipv4Addr;
use std::path::Path;

#[derive(Args)]
pub struct HostArgs {
    /// Dotted-quad IPv4 address to look up.
    ip: Ipv4Addr,
}

pub fn run(state_dir: &Path, args: HostArgs) -> anyhow::Result<i32> {
    let (state, _) = hygiene_storage::recover(state_dir)?;
    let ip_int: u32 = args.ip.into();

    match state.hosts.get(&ip_int) {
        Some(host) => {
            println!("{}", serde_json::to_string_pretty(host)?);
            Ok(0)
        }
        None => {
            eprintln!("no host found for {}", args.ip);
            Ok(-1)
        }
    }
}
