//! Agent bookkeeping and expiry of stale registry entries.

use super::test_utils::{loaded, THREE_SECTIONS};
use niwa::config::RegistryConfig;
use niwa::store::StoreOptions;
use niwa::tree::node::now_millis;
use niwa::{EditOutcome, Niwa};
use tempfile::TempDir;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

fn conflict_for_agent_a(niwa: &Niwa) {
    niwa.read_node("h1_1", "agent_a").unwrap();
    niwa.edit("h1_1", "agent_b", "theirs\n", "").unwrap();
    let outcome = niwa.edit("h1_1", "agent_a", "yours\n", "").unwrap();
    assert!(matches!(outcome, EditOutcome::ConflictDetected(_)));
    niwa.read_node("h1_3", "agent_a").unwrap();
}

#[test]
fn test_cleanup_keeps_recent_entries() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    conflict_for_agent_a(&niwa);

    let report = niwa.cleanup_at(now_millis() + DAY_MS).unwrap();
    assert_eq!(report.pending_removed, 0);
    assert_eq!(report.conflicts_removed, 0);
    assert_eq!(niwa.open_conflicts(None).unwrap().len(), 1);
}

#[test]
fn test_cleanup_expires_old_entries() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    conflict_for_agent_a(&niwa);

    let report = niwa.cleanup_at(now_millis() + 31 * DAY_MS).unwrap();
    assert_eq!(report.pending_removed, 2);
    assert_eq!(report.conflicts_removed, 1);
    assert!(niwa.open_conflicts(None).unwrap().is_empty());
    assert!(niwa.pending_reads("agent_a").unwrap().is_empty());
    // History is never expired.
    assert_eq!(niwa.history("h1_1").unwrap().len(), 2);
}

#[test]
fn test_cleanup_disabled_removes_nothing() {
    let dir = TempDir::new().unwrap();
    let registry = RegistryConfig {
        expiry_enabled: false,
        ..RegistryConfig::default()
    };
    let niwa = Niwa::open_at(&dir.path().join("db"), StoreOptions::default(), registry).unwrap();
    niwa.load(THREE_SECTIONS, false).unwrap();
    conflict_for_agent_a(&niwa);

    let report = niwa.cleanup_at(now_millis() + 365 * DAY_MS).unwrap();
    assert_eq!(report.pending_removed + report.conflicts_removed, 0);
}

#[test]
fn test_agents_are_derived_from_activity() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    conflict_for_agent_a(&niwa);

    let agents = niwa.agents().unwrap();
    let ids: Vec<&str> = agents.iter().map(|a| a.agent_id.as_str()).collect();
    assert_eq!(ids, vec!["agent_a", "agent_b", "system"]);

    let a = &agents[0];
    assert_eq!(a.edit_count, 0);
    assert_eq!(a.open_conflicts, 1);
    // The conflicting edit leaves the read of h1_1 in place next to h1_3.
    assert_eq!(a.pending_reads, 2);
    let b = &agents[1];
    assert_eq!(b.edit_count, 1);
    assert_eq!(b.nodes_edited, vec!["h1_1"]);
}

#[test]
fn test_agent_status_flags_stale_reads() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    niwa.read_node("h1_2", "agent_a").unwrap();
    niwa.read_node("h1_3", "agent_a").unwrap();
    niwa.edit("h1_2", "agent_b", "moved on\n", "").unwrap();

    let status = niwa.agent_status("agent_a").unwrap();
    assert_eq!(status.pending_reads.len(), 2);
    let stale: Vec<&str> = status
        .pending_reads
        .iter()
        .filter(|r| r.is_stale())
        .map(|r| r.node_id.as_str())
        .collect();
    assert_eq!(stale, vec!["h1_2"]);

    let b = niwa.agent_status("agent_b").unwrap();
    assert_eq!(b.recent_edits.len(), 1);
    assert_eq!(b.recent_edits[0].version, 2);
}

#[test]
fn test_suggested_name_skips_taken_names() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    assert_eq!(niwa.suggest_agent_name().unwrap(), "agent_1");
    niwa.read_node("h1_1", "agent_1").unwrap();
    niwa.read_node("h1_1", "agent_2").unwrap();
    assert_eq!(niwa.suggest_agent_name().unwrap(), "agent_3");
}
