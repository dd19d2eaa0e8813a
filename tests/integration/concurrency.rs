//! Many agents against one store from many threads.

use super::test_utils::{open_contended, THREE_SECTIONS};
use niwa::EditOutcome;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const AGENTS: usize = 8;

#[test]
fn test_racing_edits_on_one_node_apply_exactly_once() {
    let dir = TempDir::new().unwrap();
    let niwa = open_contended(&dir);
    niwa.load(THREE_SECTIONS, false).unwrap();

    let barrier = Arc::new(Barrier::new(AGENTS));
    let handles: Vec<_> = (0..AGENTS)
        .map(|i| {
            let niwa = niwa.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let agent = format!("agent_{i}");
                niwa.read_node("h1_2", &agent).unwrap();
                barrier.wait();
                niwa.edit("h1_2", &agent, &format!("written by {agent}\n"), "")
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<EditOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, EditOutcome::Applied { version: 2 }))
        .count();
    let conflicted = outcomes
        .iter()
        .filter(|o| matches!(o, EditOutcome::ConflictDetected(_)))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(conflicted, AGENTS - 1);

    assert_eq!(niwa.node("h1_2").unwrap().version, 2);
    assert_eq!(niwa.history("h1_2").unwrap().len(), 2);
    assert_eq!(niwa.open_conflicts(None).unwrap().len(), AGENTS - 1);
    assert!(niwa.health().unwrap().is_healthy());
}

#[test]
fn test_unsynchronized_writers_keep_ledger_dense() {
    let dir = TempDir::new().unwrap();
    let niwa = open_contended(&dir);
    niwa.load(THREE_SECTIONS, false).unwrap();

    // No reads: every edit is checked against the current version, so all apply.
    let handles: Vec<_> = (0..AGENTS)
        .map(|i| {
            let niwa = niwa.clone();
            thread::spawn(move || {
                for n in 0..5 {
                    let outcome = niwa
                        .edit("h1_1", &format!("agent_{i}"), &format!("{i}:{n}\n"), "")
                        .unwrap();
                    assert!(matches!(outcome, EditOutcome::Applied { .. }));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let history = niwa.history("h1_1").unwrap();
    let versions: Vec<u64> = history.iter().map(|r| r.version).collect();
    let expected: Vec<u64> = (1..=(1 + AGENTS as u64 * 5)).collect();
    assert_eq!(versions, expected);
    assert_eq!(niwa.node("h1_1").unwrap().version, *expected.last().unwrap());
}

#[test]
fn test_writers_on_different_nodes_all_apply() {
    let dir = TempDir::new().unwrap();
    let niwa = open_contended(&dir);
    niwa.load(THREE_SECTIONS, false).unwrap();

    let handles: Vec<_> = ["h1_1", "h1_2", "h1_3"]
        .into_iter()
        .enumerate()
        .map(|(i, node_id)| {
            let niwa = niwa.clone();
            thread::spawn(move || {
                let agent = format!("agent_{i}");
                niwa.read_node(node_id, &agent).unwrap();
                niwa.edit(node_id, &agent, "mine\n", "").unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), EditOutcome::Applied { version: 2 });
    }
}

#[test]
fn test_readers_see_consistent_snapshots() {
    let dir = TempDir::new().unwrap();
    let niwa = open_contended(&dir);
    niwa.load(THREE_SECTIONS, false).unwrap();

    let writer = {
        let niwa = niwa.clone();
        thread::spawn(move || {
            for n in 0..30 {
                niwa.edit("h1_1", "writer", &format!("rev {n}\n"), "").unwrap();
            }
        })
    };
    let reader = {
        let niwa = niwa.clone();
        thread::spawn(move || {
            for _ in 0..30 {
                let report = niwa.health().unwrap();
                assert!(report.is_healthy(), "{:?}", report.issues);
            }
        })
    };
    writer.join().unwrap();
    reader.join().unwrap();
}
