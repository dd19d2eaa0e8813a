//! Two agents, one node: read, race, conflict, manual merge.

use super::test_utils::{loaded, open_niwa};
use niwa::{EditOutcome, Resolution};
use tempfile::TempDir;

#[test]
fn test_three_headings_produce_four_nodes() {
    let dir = TempDir::new().unwrap();
    let niwa = open_niwa(&dir);
    let report = niwa.load("# One\na\n# Two\nb\n# Three\nc\n", false).unwrap();

    assert_eq!(report.node_count, 4);
    assert_eq!(report.node_ids, vec!["h1_1", "h1_2", "h1_3"]);
    let tree = niwa.tree().unwrap();
    assert_eq!(tree.children_of("root"), ["h1_1", "h1_2", "h1_3"]);
    for id in ["root", "h1_1", "h1_2", "h1_3"] {
        assert_eq!(niwa.node(id).unwrap().version, 1);
        assert_eq!(niwa.history(id).unwrap().len(), 1);
    }
}

#[test]
fn test_conflict_then_manual_merge() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);

    niwa.read_node("h1_2", "agent_a").unwrap();
    niwa.read_node("h1_2", "agent_b").unwrap();

    let first = niwa.edit("h1_2", "agent_b", "X", "B's take").unwrap();
    assert_eq!(first, EditOutcome::Applied { version: 2 });

    let second = niwa.edit("h1_2", "agent_a", "Y", "A's take").unwrap();
    let conflict = match second {
        EditOutcome::ConflictDetected(conflict) => conflict,
        other => panic!("expected a conflict, got {:?}", other),
    };
    assert_eq!(conflict.base_version, 1);
    assert_eq!(conflict.theirs_version, 2);
    assert_eq!(conflict.theirs_content, "X");
    assert_eq!(conflict.yours_content, "Y");
    assert_eq!(conflict.their_edits.len(), 1);
    assert_eq!(conflict.their_edits[0].agent, "agent_b");
    // The rejected edit leaves the node alone.
    assert_eq!(niwa.node("h1_2").unwrap().content, "X");

    let resolved = niwa
        .resolve("h1_2", "agent_a", Resolution::ManualMerge, Some("X+Y"))
        .unwrap();
    assert_eq!(resolved, EditOutcome::Applied { version: 3 });

    let node = niwa.node("h1_2").unwrap();
    assert_eq!(node.content, "X+Y");
    assert_eq!(node.version, 3);
    assert_eq!(node.last_agent, "agent_a");

    let history = niwa.history("h1_2").unwrap();
    let versions: Vec<u64> = history.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert_eq!(history[2].message, "Conflict resolved: manual_merge (A's take)");

    assert!(niwa.open_conflicts(None).unwrap().is_empty());
    assert!(niwa.pending_reads("agent_a").unwrap().is_empty());
    assert!(niwa.health().unwrap().is_healthy());
}

#[test]
fn test_export_reflects_edits() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    niwa.read_node("h1_3", "agent_a").unwrap();
    niwa.edit("h1_3", "agent_a", "farewell\n", "").unwrap();

    let exported = niwa.export().unwrap();
    assert_eq!(
        exported,
        "# Intro\nhello\n# Body\nline one\nline two\nline three\n# End\nfarewell\n"
    );
}

#[test]
fn test_edit_without_read_checks_current_version() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let outcome = niwa.edit("h1_1", "agent_a", "hi\n", "").unwrap();
    assert_eq!(outcome, EditOutcome::Applied { version: 2 });
}
