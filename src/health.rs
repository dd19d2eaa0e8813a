//! Store health: record counts and integrity checks.
//!
//! The checks verify the invariants every write path maintains: ledger versions are
//! `1..=N` with `N` equal to the node's version, the last entry holds the node's content,
//! hashes match, and parent/child links agree in both directions.

use crate::error::NiwaError;
use crate::ledger::{self, content_hash, VersionRecord};
use crate::registry;
use crate::store::Txn;
use crate::tree::node::ROOT_ID;
use crate::tree::persist;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityIssue {
    MissingRoot,
    LedgerGap {
        node_id: String,
        expected: u64,
        found: u64,
    },
    VersionMismatch {
        node_id: String,
        node_version: u64,
        ledger_version: u64,
    },
    ContentMismatch {
        node_id: String,
        version: u64,
    },
    HashMismatch {
        node_id: String,
        version: u64,
    },
    MissingChild {
        parent_id: String,
        child_id: String,
    },
    ParentMismatch {
        node_id: String,
        parent_id: String,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::MissingRoot => write!(f, "nodes exist but there is no root"),
            IntegrityIssue::LedgerGap {
                node_id,
                expected,
                found,
            } => write!(f, "{node_id}: ledger expected v{expected}, found v{found}"),
            IntegrityIssue::VersionMismatch {
                node_id,
                node_version,
                ledger_version,
            } => write!(
                f,
                "{node_id}: node is at v{node_version} but ledger ends at v{ledger_version}"
            ),
            IntegrityIssue::ContentMismatch { node_id, version } => {
                write!(f, "{node_id}: content differs from ledger v{version}")
            }
            IntegrityIssue::HashMismatch { node_id, version } => {
                write!(f, "{node_id}: content hash mismatch at v{version}")
            }
            IntegrityIssue::MissingChild {
                parent_id,
                child_id,
            } => write!(f, "{parent_id}: child {child_id} does not exist"),
            IntegrityIssue::ParentMismatch { node_id, parent_id } => {
                write!(f, "{node_id}: not listed among the children of {parent_id}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub initialized: bool,
    pub node_count: usize,
    pub pending_reads: usize,
    pub open_conflicts: usize,
    pub total_versions: usize,
    pub agent_count: usize,
    pub last_edit: Option<u64>,
    pub issues: Vec<IntegrityIssue>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

pub fn check(txn: &mut Txn<'_>) -> Result<HealthReport, NiwaError> {
    let nodes = persist::all_nodes(txn)?;
    let records = ledger::all_records(txn)?;
    let pending_reads = registry::all_pending(txn)?.len();
    let open_conflicts = registry::open_conflicts(txn, None)?.len();
    let agent_count = registry::agents(txn)?.len();

    let mut issues = Vec::new();
    if !nodes.is_empty() && !nodes.iter().any(|n| n.id == ROOT_ID) {
        issues.push(IntegrityIssue::MissingRoot);
    }

    let mut by_node: BTreeMap<&str, Vec<&VersionRecord>> = BTreeMap::new();
    for record in &records {
        by_node.entry(record.node_id.as_str()).or_default().push(record);
        if record.content_hash != content_hash(&record.content) {
            issues.push(IntegrityIssue::HashMismatch {
                node_id: record.node_id.clone(),
                version: record.version,
            });
        }
    }

    let known: HashMap<&str, &crate::tree::Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    for node in &nodes {
        let entries = by_node.get(node.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        for (i, entry) in entries.iter().enumerate() {
            let expected = i as u64 + 1;
            if entry.version != expected {
                issues.push(IntegrityIssue::LedgerGap {
                    node_id: node.id.clone(),
                    expected,
                    found: entry.version,
                });
                break;
            }
        }
        let ledger_version = entries.last().map(|r| r.version).unwrap_or(0);
        if ledger_version != node.version {
            issues.push(IntegrityIssue::VersionMismatch {
                node_id: node.id.clone(),
                node_version: node.version,
                ledger_version,
            });
        } else if let Some(last) = entries.last() {
            if last.content != node.content {
                issues.push(IntegrityIssue::ContentMismatch {
                    node_id: node.id.clone(),
                    version: last.version,
                });
            }
        }

        for child in &node.children {
            if !known.contains_key(child.as_str()) {
                issues.push(IntegrityIssue::MissingChild {
                    parent_id: node.id.clone(),
                    child_id: child.clone(),
                });
            }
        }
        if let Some(parent_id) = &node.parent_id {
            let listed = known
                .get(parent_id.as_str())
                .map(|p| p.children.iter().filter(|c| **c == node.id).count() == 1)
                .unwrap_or(false);
            if !listed {
                issues.push(IntegrityIssue::ParentMismatch {
                    node_id: node.id.clone(),
                    parent_id: parent_id.clone(),
                });
            }
        }
    }

    Ok(HealthReport {
        initialized: known.contains_key(ROOT_ID),
        node_count: nodes.len(),
        pending_reads,
        open_conflicts,
        total_versions: records.len(),
        agent_count,
        last_edit: records.iter().map(|r| r.timestamp).max(),
        issues,
    })
}
