//! Property: whatever agents do, every node's ledger is exactly v1..=vN.

use niwa::config::NiwaConfig;
use niwa::{EditOutcome, Niwa, Resolution};
use proptest::prelude::*;
use tempfile::TempDir;

const NODES: [&str; 3] = ["h1_1", "h1_2", "h1_3"];

#[derive(Debug, Clone)]
enum Op {
    Read { agent: usize, node: usize },
    Edit { agent: usize, node: usize, content: String },
    Rollback { agent: usize, node: usize, version: u64 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize, 0..3usize).prop_map(|(agent, node)| Op::Read { agent, node }),
        (0..3usize, 0..3usize, "[a-c]{0,3}\n")
            .prop_map(|(agent, node, content)| Op::Edit { agent, node, content }),
        (0..3usize, 0..3usize, 1u64..4)
            .prop_map(|(agent, node, version)| Op::Rollback { agent, node, version }),
    ]
}

fn agent(i: usize) -> String {
    format!("agent_{i}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_ledger_stays_dense(ops in prop::collection::vec(op(), 1..25)) {
        let dir = TempDir::new().unwrap();
        let niwa = Niwa::open(dir.path(), &NiwaConfig::default()).unwrap();
        niwa.load("# A\na\n# B\nb\n# C\nc\n", false).unwrap();
        let mut writes = [0u64; 3];

        for op in ops {
            match op {
                Op::Read { agent: a, node } => {
                    niwa.read_node(NODES[node], &agent(a)).unwrap();
                }
                Op::Edit { agent: a, node, content } => {
                    match niwa.edit(NODES[node], &agent(a), &content, "").unwrap() {
                        EditOutcome::Applied { .. } => writes[node] += 1,
                        EditOutcome::ConflictDetected(_) => {
                            let outcome = niwa
                                .resolve(NODES[node], &agent(a), Resolution::AcceptYours, None)
                                .unwrap();
                            let applied = matches!(outcome, EditOutcome::Applied { .. });
                            prop_assert!(applied);
                            writes[node] += 1;
                        }
                        EditOutcome::Unchanged { .. } => {}
                    }
                }
                Op::Rollback { agent: a, node, version } => {
                    let current = niwa.node(NODES[node]).unwrap().version;
                    if version <= current {
                        let before = niwa.history(NODES[node]).unwrap();
                        niwa.rollback(NODES[node], version, &agent(a)).unwrap();
                        let after = niwa.history(NODES[node]).unwrap();
                        prop_assert_eq!(&after[..before.len()], &before[..]);
                        prop_assert_eq!(
                            &after[before.len()].content,
                            &before[(version - 1) as usize].content
                        );
                        writes[node] += 1;
                    }
                }
            }
        }

        for (i, node_id) in NODES.iter().enumerate() {
            let history = niwa.history(node_id).unwrap();
            let versions: Vec<u64> = history.iter().map(|r| r.version).collect();
            let expected: Vec<u64> = (1..=writes[i] + 1).collect();
            prop_assert_eq!(versions, expected);
            prop_assert_eq!(niwa.node(node_id).unwrap().version, writes[i] + 1);
        }
        let health = niwa.health().unwrap();
        prop_assert!(health.is_healthy(), "{:?}", health.issues);
        prop_assert_eq!(health.open_conflicts, 0);
    }
}
