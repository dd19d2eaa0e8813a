//! Pending reads and conflicts.
//!
//! Both survive process restarts so an agent that lost its context can ask what it was
//! doing. Agents are never registered; every agent query is derived from these records
//! and the ledger.

use crate::error::NiwaError;
use crate::ledger::{self, VersionRecord};
use crate::merge::LineSpan;
use crate::store::{keys, Txn};
use crate::tree::persist;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

const RECENT_EDITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRead {
    pub agent_id: String,
    pub node_id: String,
    pub version_read: u64,
    pub read_at: u64,
}

/// A ledger entry made by someone else between the agent's read and its edit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheirEdit {
    pub version: u64,
    pub agent: String,
    pub message: String,
    pub timestamp: u64,
}

impl From<&VersionRecord> for TheirEdit {
    fn from(record: &VersionRecord) -> Self {
        Self {
            version: record.version,
            agent: record.agent.clone(),
            message: record.message.clone(),
            timestamp: record.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub node_id: String,
    pub agent_id: String,
    pub node_title: String,
    pub base_version: u64,
    pub yours_content: String,
    pub theirs_version: u64,
    pub theirs_content: String,
    pub auto_merge_suggestion: Option<String>,
    pub overlaps: Vec<LineSpan>,
    pub their_edits: Vec<TheirEdit>,
    /// Message the agent gave with the rejected edit.
    pub message: String,
    pub created_at: u64,
}

// Pending reads

pub fn get_pending(
    txn: &mut Txn<'_>,
    agent_id: &str,
    node_id: &str,
) -> Result<Option<PendingRead>, NiwaError> {
    Ok(txn.get_record(&keys::pending(agent_id, node_id))?)
}

pub fn put_pending(txn: &mut Txn<'_>, pending: &PendingRead) -> Result<(), NiwaError> {
    txn.put_record(keys::pending(&pending.agent_id, &pending.node_id), pending)?;
    Ok(())
}

pub fn delete_pending(txn: &mut Txn<'_>, agent_id: &str, node_id: &str) -> Result<(), NiwaError> {
    txn.delete(keys::pending(agent_id, node_id))?;
    Ok(())
}

pub fn pending_reads(txn: &mut Txn<'_>, agent_id: &str) -> Result<Vec<PendingRead>, NiwaError> {
    Ok(txn.scan_records(&keys::pending_of(agent_id))?)
}

pub fn all_pending(txn: &mut Txn<'_>) -> Result<Vec<PendingRead>, NiwaError> {
    Ok(txn.scan_records(&keys::all_pending())?)
}

// Conflicts

pub fn get_conflict(
    txn: &mut Txn<'_>,
    node_id: &str,
    agent_id: &str,
) -> Result<Option<Conflict>, NiwaError> {
    Ok(txn.get_record(&keys::conflict(node_id, agent_id))?)
}

/// Stores a conflict, replacing any earlier one for the same node and agent.
pub fn put_conflict(txn: &mut Txn<'_>, conflict: &Conflict) -> Result<(), NiwaError> {
    txn.put_record(keys::conflict(&conflict.node_id, &conflict.agent_id), conflict)?;
    Ok(())
}

/// Resolved conflicts are not retained; the resulting ledger entry is the audit trail.
pub fn delete_conflict(txn: &mut Txn<'_>, node_id: &str, agent_id: &str) -> Result<(), NiwaError> {
    txn.delete(keys::conflict(node_id, agent_id))?;
    Ok(())
}

pub fn open_conflicts(
    txn: &mut Txn<'_>,
    agent_id: Option<&str>,
) -> Result<Vec<Conflict>, NiwaError> {
    let conflicts: Vec<Conflict> = txn.scan_records(&keys::all_conflicts())?;
    Ok(conflicts
        .into_iter()
        .filter(|c| agent_id.map(|a| a == c.agent_id).unwrap_or(true))
        .collect())
}

pub fn conflicts_on(txn: &mut Txn<'_>, node_id: &str) -> Result<Vec<Conflict>, NiwaError> {
    Ok(txn.scan_records(&keys::conflicts_of(node_id))?)
}

// Cleanup

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub pending_removed: usize,
    pub conflicts_removed: usize,
}

/// Remove pending reads and open conflicts older than `horizon_ms`. `None` disables expiry.
pub fn cleanup(
    txn: &mut Txn<'_>,
    now: u64,
    horizon_ms: Option<u64>,
) -> Result<CleanupReport, NiwaError> {
    let mut report = CleanupReport::default();
    let Some(horizon) = horizon_ms else {
        return Ok(report);
    };
    let expired = |at: u64| now.saturating_sub(at) > horizon;

    for pending in all_pending(txn)? {
        if expired(pending.read_at) {
            delete_pending(txn, &pending.agent_id, &pending.node_id)?;
            report.pending_removed += 1;
        }
    }
    for conflict in open_conflicts(txn, None)? {
        if expired(conflict.created_at) {
            delete_conflict(txn, &conflict.node_id, &conflict.agent_id)?;
            report.conflicts_removed += 1;
        }
    }
    debug!(
        pending_removed = report.pending_removed,
        conflicts_removed = report.conflicts_removed,
        "Cleanup pass"
    );
    Ok(report)
}

// Agents

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub edit_count: usize,
    pub nodes_edited: Vec<String>,
    pub pending_reads: usize,
    pub open_conflicts: usize,
    pub first_seen: u64,
    pub last_seen: u64,
}

impl AgentSummary {
    fn new(agent_id: &str, at: u64) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            edit_count: 0,
            nodes_edited: Vec::new(),
            pending_reads: 0,
            open_conflicts: 0,
            first_seen: at,
            last_seen: at,
        }
    }

    fn seen(&mut self, at: u64) {
        self.first_seen = self.first_seen.min(at);
        self.last_seen = self.last_seen.max(at);
    }
}

/// Every distinct agent id in the ledger, pending reads and conflicts, sorted by id.
pub fn agents(txn: &mut Txn<'_>) -> Result<Vec<AgentSummary>, NiwaError> {
    let mut summaries: BTreeMap<String, AgentSummary> = BTreeMap::new();
    let mut edited: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for record in ledger::all_records(txn)? {
        let summary = summaries
            .entry(record.agent.clone())
            .or_insert_with(|| AgentSummary::new(&record.agent, record.timestamp));
        summary.seen(record.timestamp);
        summary.edit_count += 1;
        edited
            .entry(record.agent.clone())
            .or_default()
            .insert(record.node_id);
    }
    for pending in all_pending(txn)? {
        let summary = summaries
            .entry(pending.agent_id.clone())
            .or_insert_with(|| AgentSummary::new(&pending.agent_id, pending.read_at));
        summary.seen(pending.read_at);
        summary.pending_reads += 1;
    }
    for conflict in open_conflicts(txn, None)? {
        let summary = summaries
            .entry(conflict.agent_id.clone())
            .or_insert_with(|| AgentSummary::new(&conflict.agent_id, conflict.created_at));
        summary.seen(conflict.created_at);
        summary.open_conflicts += 1;
    }

    for (agent, nodes) in edited {
        if let Some(summary) = summaries.get_mut(&agent) {
            summary.nodes_edited = nodes.into_iter().collect();
        }
    }
    Ok(summaries.into_values().collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReadStatus {
    pub node_id: String,
    pub node_title: String,
    pub version_read: u64,
    pub current_version: u64,
    pub read_at: u64,
}

impl PendingReadStatus {
    /// Someone else has written since the read.
    pub fn is_stale(&self) -> bool {
        self.current_version > self.version_read
    }

    pub fn versions_behind(&self) -> u64 {
        self.current_version.saturating_sub(self.version_read)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub agent_id: String,
    pub pending_reads: Vec<PendingReadStatus>,
    pub open_conflicts: Vec<Conflict>,
    /// Newest first.
    pub recent_edits: Vec<VersionRecord>,
    pub nodes_touched: Vec<String>,
}

pub fn agent_status(txn: &mut Txn<'_>, agent_id: &str) -> Result<AgentStatus, NiwaError> {
    let mut statuses = Vec::new();
    for pending in pending_reads(txn, agent_id)? {
        // Reads of nodes removed by a replacing load are skipped.
        let node = match persist::get_node(txn, &pending.node_id) {
            Ok(node) => node,
            Err(NiwaError::NodeNotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        statuses.push(PendingReadStatus {
            node_id: pending.node_id,
            node_title: node.title,
            version_read: pending.version_read,
            current_version: node.version,
            read_at: pending.read_at,
        });
    }

    let mut edits: Vec<VersionRecord> = ledger::all_records(txn)?
        .into_iter()
        .filter(|r| r.agent == agent_id)
        .collect();
    let nodes_touched: BTreeSet<String> = edits
        .iter()
        .map(|r| r.node_id.clone())
        .chain(statuses.iter().map(|p| p.node_id.clone()))
        .collect();
    edits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.version.cmp(&a.version)));
    edits.truncate(RECENT_EDITS);

    Ok(AgentStatus {
        agent_id: agent_id.to_string(),
        pending_reads: statuses,
        open_conflicts: open_conflicts(txn, Some(agent_id))?,
        recent_edits: edits,
        nodes_touched: nodes_touched.into_iter().collect(),
    })
}

/// First free `agent_N` name, starting at 1.
pub fn suggest_agent_name(txn: &mut Txn<'_>) -> Result<String, NiwaError> {
    let taken: HashSet<String> = agents(txn)?.into_iter().map(|a| a.agent_id).collect();
    let limit = taken.len() + 1;
    let free = (1..=limit)
        .map(|i| format!("agent_{i}"))
        .find(|name| !taken.contains(name));
    Ok(free.unwrap_or_else(|| format!("agent_{limit}")))
}
