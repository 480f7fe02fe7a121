// SPDX-License-Identifier: MIT

//! `hygiene id-update OLD NEW` (§6 representative CLI): rename an owner
//! across every collection. Refuses if the destination owner already
//! exists. Exit codes: 0 success, -1 error, -2 user abort.

use clap::Args;
use hygiene_core::{DetailsDelta, TicketEvent, TicketEventKind};
use hygiene_storage::MaterializedState;
use std::io::Write;
use std::path::Path;

#[derive(Args)]
pub struct IdUpdateArgs {
    /// Current owner id.
    old: String,
    /// New owner id.
    new: String,
    /// Skip the interactive confirmation prompt.
    #[arg(long)]
    yes: bool,
}

pub fn run(state_dir: &Path, args: IdUpdateArgs) -> anyhow::Result<i32> {
    if !args.yes && !confirm("This will modify persisted state.")? {
        eprintln!("Aborted.");
        return Ok(-2);
    }

    let outcome = crate::store::with_state(state_dir, |state| rename_owner(state, &args.old, &args.new));

    match outcome {
        Ok(summary) => {
            println!("{summary}");
            Ok(0)
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            Ok(-1)
        }
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} Continue? [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

/// Rename `old` to `new` across every collection (§6, grounded in the
/// original `id_update.py`'s four steps).
fn rename_owner(state: &mut MaterializedState, old: &str, new: &str) -> anyhow::Result<String> {
    if state.requests.contains_key(new) || state.tallies.contains_key(new) {
        anyhow::bail!("An organization with id {new} already exists.");
    }
    if !state.requests.contains_key(old) {
        anyhow::bail!("Organization {old} does not have a request document.");
    }

    let mut modified = 0u64;

    if let Some(mut request) = state.requests.remove(old) {
        request.owner = new.to_string();
        state.requests.insert(new.to_string(), request);
        modified += 1;
    }
    if let Some(mut tally) = state.tallies.remove(old) {
        tally.owner = new.to_string();
        state.tallies.insert(new.to_string(), tally);
        modified += 1;
    }

    let mut docs_modified = 0u64;
    for doc in state.host_scans.iter_mut() {
        if doc.header.owner == old {
            doc.header.owner = new.to_string();
            docs_modified += 1;
        }
    }
    for doc in state.port_scans.iter_mut() {
        if doc.header.owner == old {
            doc.header.owner = new.to_string();
            docs_modified += 1;
        }
    }
    for doc in state.vuln_scans.iter_mut() {
        if doc.header.owner == old {
            doc.header.owner = new.to_string();
            docs_modified += 1;
        }
    }
    for host in state.hosts.values_mut().filter(|h| h.owner == old) {
        host.owner = new.to_string();
        docs_modified += 1;
    }
    for snap in state.snapshots.values_mut().filter(|s| s.owner == old) {
        snap.owner = new.to_string();
        docs_modified += 1;
    }

    let now = chrono::Utc::now();
    let mut tickets_modified = 0u64;
    for ticket in state.tickets.values_mut().filter(|t| t.owner == old) {
        ticket.owner = new.to_string();
        let mut event = TicketEvent::new(now, TicketEventKind::Changed, "owner renamed");
        event.delta = vec![DetailsDelta {
            key: "owner".to_string(),
            from: serde_json::Value::String(old.to_string()),
            to: serde_json::Value::String(new.to_string()),
        }];
        ticket.push_event(event);
        tickets_modified += 1;
    }

    let mut children_updated = 0u64;
    for request in state.requests.values_mut() {
        if let Some(pos) = request.children.iter().position(|c| c == old) {
            request.children.remove(pos);
            request.children.push(new.to_string());
            children_updated += 1;
        }
    }

    Ok(format!(
        "{modified} request/tally document(s) moved, {docs_modified} scan/host/snapshot document(s) updated, \
         {tickets_modified} ticket(s) updated, {children_updated} parent request(s) updated"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hygiene_core::{AgencyType, Request, Stage};

    fn request(owner: &str) -> Request {
        Request {
            owner: owner.to_string(),
            agency_type: AgencyType::Federal,
            period_start: chrono::Utc::now(),
            windows: Vec::new(),
            cidrs: Vec::new(),
            init_stage: Stage::Netscan1,
            scheduler: None,
            scan_types: Vec::new(),
            stakeholder: false,
            children: Vec::new(),
            retired: false,
            scan_limits: hygiene_core::default_scan_limits(),
        }
    }

    #[test]
    fn rename_owner_moves_request_and_tally() {
        let mut state = MaterializedState::default();
        state.requests.insert("acme".to_string(), request("acme"));
        state
            .tallies
            .insert("acme".to_string(), hygiene_core::Tally::new("acme", chrono::Utc::now()));

        rename_owner(&mut state, "acme", "acme-renamed").unwrap();

        assert!(!state.requests.contains_key("acme"));
        assert!(state.requests.contains_key("acme-renamed"));
        assert!(state.tallies.contains_key("acme-renamed"));
    }

    #[test]
    fn rename_owner_refuses_when_destination_exists() {
        let mut state = MaterializedState::default();
        state.requests.insert("acme".to_string(), request("acme"));
        state.requests.insert("other".to_string(), request("other"));

        let err = rename_owner(&mut state, "acme", "other").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn rename_owner_updates_parent_childrens_list() {
        let mut state = MaterializedState::default();
        state.requests.insert("acme".to_string(), request("acme"));
        let mut parent = request("parent");
        parent.children.push("acme".to_string());
        state.requests.insert("parent".to_string(), parent);

        rename_owner(&mut state, "acme", "acme-renamed").unwrap();

        let parent = &state.requests["parent"];
        assert!(!parent.children.contains(&"acme".to_string()));
        assert!(parent.children.contains(&"acme-renamed".to_string()));
    }

    #[test]
    fn rename_owner_records_a_changed_event_per_ticket() {
        let mut state = MaterializedState::default();
        state.requests.insert("acme".to_string(), request("acme"));
        let details = hygiene_core::TicketDetails {
            cve: None,
            score_source: "cvss".to_string(),
            cvss_base_score: None,
            severity: 2,
            name: "finding".to_string(),
            service: None,
        };
        let ticket = hygiene_core::Ticket::open_ticket(
            hygiene_core::TicketId::generate(),
            1,
            443,
            "tcp",
            "nessus",
            "12345",
            "acme",
            details,
            chrono::Utc::now(),
        );
        state.tickets.insert(ticket.id.clone(), ticket);

        rename_owner(&mut state, "acme", "acme-renamed").unwrap();

        let ticket = state.tickets.values().next().unwrap();
        assert_eq!(ticket.owner, "acme-renamed");
        assert_eq!(ticket.events.last().unwrap().action, TicketEventKind::Changed);
    }
}
