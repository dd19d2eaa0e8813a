//! Structure and metadata operations: add, title, summary, search, health, dry run.

use super::test_utils::{loaded, open_niwa};
use niwa::tree::parse;
use niwa::{DryRun, NiwaError};
use tempfile::TempDir;

#[test]
fn test_added_node_survives_export_and_reparse() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let node = niwa.add_node("h1_2", "Appendix", "extra\n", "agent_a").unwrap();
    assert_eq!(node.id, "h2_4");
    assert_eq!(node.parent_id.as_deref(), Some("h1_2"));

    let exported = niwa.export().unwrap();
    assert!(exported.contains("line three\n## Appendix\nextra\n# End\n"));

    let reparsed = parse(&exported);
    let body = reparsed.lookup("h1_2").unwrap();
    assert_eq!(body.children.len(), 1);
}

#[test]
fn test_ids_are_never_reused_after_replace() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    niwa.add_node("root", "Extra", "", "agent_a").unwrap();

    let report = niwa.load("# Fresh\n", true).unwrap();
    assert_eq!(report.node_ids, vec!["h1_6"]);
    assert_eq!(niwa.tree().unwrap().len(), 2);
    assert!(niwa.history("h1_1").is_err());
}

#[test]
fn test_title_must_be_unique_among_siblings() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let err = niwa.set_title("h1_3", "intro", "agent_a").unwrap_err();
    match err {
        NiwaError::DuplicateTitle { existing_id, .. } => assert_eq!(existing_id, "h1_1"),
        other => panic!("expected DuplicateTitle, got {:?}", other),
    }
    // Renaming to its own title with different case is allowed.
    let node = niwa.set_title("h1_3", "END", "agent_a").unwrap();
    assert_eq!(node.title, "END");
}

#[test]
fn test_title_rejects_newlines() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    assert!(matches!(
        niwa.set_title("h1_1", "two\nlines", "agent_a"),
        Err(NiwaError::InvalidInput(_))
    ));
}

#[test]
fn test_summary_shows_in_outline_and_clears() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    niwa.set_summary("h1_2", Some("three lines"), "agent_a").unwrap();
    assert!(niwa.outline().unwrap().contains("[h1_2] v1 \"Body\" (by agent_a) [S]"));

    let node = niwa.set_summary("h1_2", Some("   "), "agent_a").unwrap();
    assert!(node.summary.is_none());
    assert_eq!(node.version, 1);
}

#[test]
fn test_search_finds_lines_in_document_order() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let hits = niwa.search("LINE", false).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].node_id, "h1_2");
    assert_eq!(hits[0].total_matches, 3);
    assert_eq!(hits[0].matching_lines[1].line, 2);

    assert!(niwa.search("LINE", true).unwrap().is_empty());
    assert!(matches!(niwa.search("", false), Err(NiwaError::InvalidInput(_))));
}

#[test]
fn test_health_counts_records() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    niwa.read_node("h1_1", "agent_a").unwrap();
    niwa.edit("h1_2", "agent_b", "changed\n", "").unwrap();

    let report = niwa.health().unwrap();
    assert!(report.initialized);
    assert_eq!(report.node_count, 4);
    assert_eq!(report.total_versions, 5);
    assert_eq!(report.pending_reads, 1);
    assert_eq!(report.open_conflicts, 0);
    assert!(report.last_edit.is_some());
    assert!(report.is_healthy());
}

#[test]
fn test_dry_run_predicts_without_writing() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    niwa.read_node("h1_2", "agent_a").unwrap();

    let before = niwa.dry_run_edit("h1_2", "agent_a", "new\n").unwrap();
    assert!(matches!(
        before,
        DryRun::WouldApply {
            current_version: 1,
            new_version: 2,
            content_changed: true,
            had_prior_read: true,
        }
    ));

    niwa.edit("h1_2", "agent_b", "theirs\n", "").unwrap();
    let after = niwa.dry_run_edit("h1_2", "agent_a", "new\n").unwrap();
    assert!(matches!(
        after,
        DryRun::WouldConflict {
            base_version: 1,
            current_version: 2,
            versions_behind: 1,
            ..
        }
    ));
    assert!(niwa.open_conflicts(None).unwrap().is_empty());
    assert_eq!(niwa.pending_reads("agent_a").unwrap().len(), 1);
}

#[test]
fn test_invalid_agent_is_rejected() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    assert!(matches!(
        niwa.read_node("h1_1", "  "),
        Err(NiwaError::InvalidInput(_))
    ));
    assert!(matches!(
        niwa.edit("h1_1", "bad\nagent", "x", ""),
        Err(NiwaError::InvalidInput(_))
    ));
}

#[test]
fn test_unknown_node_is_not_found() {
    let dir = TempDir::new().unwrap();
    let niwa = open_niwa(&dir);
    niwa.init().unwrap();
    assert!(matches!(niwa.node("h1_1"), Err(NiwaError::NodeNotFound(_))));
    assert!(matches!(
        niwa.read_node("h1_1", "agent_a"),
        Err(NiwaError::NodeNotFound(_))
    ));
}
