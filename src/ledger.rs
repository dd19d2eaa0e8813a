//! Version ledger
//!
//! Append-only per-node history. Versions of a node are exactly `1..=N` and the node's
//! `version` always equals `N`: every entry is written in the same transaction as the
//! node update it records.

use crate::error::NiwaError;
use crate::store::{keys, Txn};
use serde::{Deserialize, Serialize};

pub const CREATED_MESSAGE: &str = "Created";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub node_id: String,
    pub version: u64,
    pub content: String,
    /// blake3 of `content`, hex encoded.
    pub content_hash: String,
    pub agent: String,
    pub timestamp: u64,
    pub message: String,
}

pub fn content_hash(content: &str) -> String {
    hex::encode(blake3::hash(content.as_bytes()).as_bytes())
}

/// Write the entry for `version` of `node_id`. Callers pass `node.version + 1` (or 1 on
/// creation) and update the node in the same transaction.
pub fn append(
    txn: &mut Txn<'_>,
    node_id: &str,
    version: u64,
    content: &str,
    agent: &str,
    message: &str,
    timestamp: u64,
) -> Result<VersionRecord, NiwaError> {
    let record = VersionRecord {
        node_id: node_id.to_string(),
        version,
        content: content.to_string(),
        content_hash: content_hash(content),
        agent: agent.to_string(),
        timestamp,
        message: message.to_string(),
    };
    txn.put_record(keys::ledger(node_id, version), &record)?;
    Ok(record)
}

/// Oldest first.
pub fn history(txn: &mut Txn<'_>, node_id: &str) -> Result<Vec<VersionRecord>, NiwaError> {
    Ok(txn.scan_records(&keys::ledger_of(node_id))?)
}

pub fn record(txn: &mut Txn<'_>, node_id: &str, version: u64) -> Result<VersionRecord, NiwaError> {
    txn.get_record(&keys::ledger(node_id, version))?
        .ok_or_else(|| NiwaError::VersionNotFound {
            node_id: node_id.to_string(),
            version,
        })
}

/// Entries with `after < version <= upto`.
pub fn between(
    txn: &mut Txn<'_>,
    node_id: &str,
    after: u64,
    upto: u64,
) -> Result<Vec<VersionRecord>, NiwaError> {
    Ok(history(txn, node_id)?
        .into_iter()
        .filter(|r| r.version > after && r.version <= upto)
        .collect())
}

pub fn all_records(txn: &mut Txn<'_>) -> Result<Vec<VersionRecord>, NiwaError> {
    Ok(txn.scan_records(&keys::all_ledger())?)
}
