//! Resolution strategies, stale conflicts and rollback.

use super::test_utils::loaded;
use niwa::registry::Conflict;
use niwa::{EditOutcome, Niwa, NiwaError, Resolution};
use tempfile::TempDir;

/// agent_a reads h1_2, agent_b writes `theirs`, agent_a submits `yours`.
fn conflict_on_body(niwa: &Niwa, theirs: &str, yours: &str) -> Box<Conflict> {
    niwa.read_node("h1_2", "agent_a").unwrap();
    niwa.read_node("h1_2", "agent_b").unwrap();
    niwa.edit("h1_2", "agent_b", theirs, "").unwrap();
    match niwa.edit("h1_2", "agent_a", yours, "").unwrap() {
        EditOutcome::ConflictDetected(conflict) => conflict,
        other => panic!("expected a conflict, got {:?}", other),
    }
}

#[test]
fn test_disjoint_edits_auto_merge() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let conflict = conflict_on_body(
        &niwa,
        "LINE ONE\nline two\nline three\n",
        "line one\nline two\nLINE THREE\n",
    );
    let merged = "LINE ONE\nline two\nLINE THREE\n";
    assert_eq!(conflict.auto_merge_suggestion.as_deref(), Some(merged));
    assert!(conflict.overlaps.is_empty());

    let outcome = niwa
        .resolve("h1_2", "agent_a", Resolution::AcceptAutoMerge, None)
        .unwrap();
    assert_eq!(outcome, EditOutcome::Applied { version: 3 });
    assert_eq!(niwa.node("h1_2").unwrap().content, merged);
}

#[test]
fn test_overlapping_edits_have_no_auto_merge() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let conflict = conflict_on_body(
        &niwa,
        "line one\nTHEIRS\nline three\n",
        "line one\nYOURS\nline three\n",
    );
    assert!(conflict.auto_merge_suggestion.is_none());
    assert!(!conflict.overlaps.is_empty());

    let err = niwa
        .resolve("h1_2", "agent_a", Resolution::AcceptAutoMerge, None)
        .unwrap_err();
    assert!(matches!(err, NiwaError::NoAutoMergeAvailable { .. }));
    // The conflict stays open for another strategy.
    assert!(niwa.conflict("h1_2", "agent_a").unwrap().is_some());
}

#[test]
fn test_accept_yours_overwrites() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    conflict_on_body(&niwa, "theirs\n", "yours\n");

    let outcome = niwa
        .resolve("h1_2", "agent_a", Resolution::AcceptYours, None)
        .unwrap();
    assert_eq!(outcome, EditOutcome::Applied { version: 3 });
    assert_eq!(niwa.node("h1_2").unwrap().content, "yours\n");
}

#[test]
fn test_accept_theirs_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    conflict_on_body(&niwa, "theirs\n", "yours\n");

    let outcome = niwa
        .resolve("h1_2", "agent_a", Resolution::AcceptTheirs, None)
        .unwrap();
    assert_eq!(outcome, EditOutcome::Unchanged { version: 2 });
    assert_eq!(niwa.history("h1_2").unwrap().len(), 2);
    assert!(niwa.conflict("h1_2", "agent_a").unwrap().is_none());
    assert!(niwa.pending_reads("agent_a").unwrap().is_empty());
}

#[test]
fn test_manual_merge_requires_content() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    conflict_on_body(&niwa, "theirs\n", "yours\n");
    let err = niwa
        .resolve("h1_2", "agent_a", Resolution::ManualMerge, None)
        .unwrap_err();
    assert!(matches!(err, NiwaError::InvalidInput(_)));
}

#[test]
fn test_stale_conflict_is_refreshed() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let original = conflict_on_body(&niwa, "theirs\n", "yours\n");
    assert_eq!(original.theirs_version, 2);

    niwa.edit("h1_2", "agent_b", "theirs again\n", "").unwrap();

    let err = niwa
        .resolve("h1_2", "agent_a", Resolution::AcceptYours, None)
        .unwrap_err();
    let fresh = match err {
        NiwaError::StaleConflict(fresh) => fresh,
        other => panic!("expected StaleConflict, got {:?}", other),
    };
    assert_eq!(fresh.base_version, 1);
    assert_eq!(fresh.theirs_version, 3);
    assert_eq!(fresh.theirs_content, "theirs again\n");
    assert_eq!(fresh.their_edits.len(), 2);

    // The refreshed conflict was stored, so a second attempt goes through.
    let stored = niwa.conflict("h1_2", "agent_a").unwrap().unwrap();
    assert_eq!(stored.theirs_version, 3);
    let outcome = niwa
        .resolve("h1_2", "agent_a", Resolution::AcceptYours, None)
        .unwrap();
    assert_eq!(outcome, EditOutcome::Applied { version: 4 });
}

#[test]
fn test_resolve_without_conflict_fails() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let err = niwa
        .resolve("h1_1", "agent_a", Resolution::AcceptYours, None)
        .unwrap_err();
    assert!(matches!(err, NiwaError::NoOpenConflict { .. }));
}

#[test]
fn test_rereading_discards_conflict() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    conflict_on_body(&niwa, "theirs\n", "yours\n");

    let node = niwa.read_node("h1_2", "agent_a").unwrap();
    assert_eq!(node.version, 2);
    assert!(niwa.open_conflicts(Some("agent_a")).unwrap().is_empty());

    let outcome = niwa.edit("h1_2", "agent_a", "rebased\n", "").unwrap();
    assert_eq!(outcome, EditOutcome::Applied { version: 3 });
}

#[test]
fn test_rollback_appends_old_content() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let original = niwa.node("h1_1").unwrap().content;
    niwa.edit("h1_1", "agent_a", "second\n", "").unwrap();
    niwa.edit("h1_1", "agent_a", "third\n", "").unwrap();

    let version = niwa.rollback("h1_1", 1, "agent_a").unwrap();
    assert_eq!(version, 4);

    let history = niwa.history("h1_1").unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].content, original);
    assert_eq!(history[3].message, "Rollback to v1");
    assert_eq!(history[1].content, "second\n");
    assert_eq!(history[2].content, "third\n");
    assert_eq!(niwa.node("h1_1").unwrap().content, original);
}

#[test]
fn test_rollback_to_unknown_version_fails() {
    let dir = TempDir::new().unwrap();
    let niwa = loaded(&dir);
    let err = niwa.rollback("h1_1", 9, "agent_a").unwrap_err();
    assert!(matches!(err, NiwaError::VersionNotFound { version: 9, .. }));
}
