//! Optimistic concurrency control
//!
//! An agent's edit is checked against the version it last read. If someone else has
//! written since, the edit is not applied; a conflict is recorded with a merge analysis
//! instead. The check and the write happen in one store transaction, so the commit is the
//! linearization point.

use crate::error::NiwaError;
use crate::ledger;
use crate::merge::{self, LineSpan};
use crate::registry::{self, Conflict, PendingRead, TheirEdit};
use crate::store::Txn;
use crate::tree::node::{validate_agent_id, Node};
use crate::tree::persist;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOutcome {
    Applied { version: u64 },
    ConflictDetected(Box<Conflict>),
    /// Nothing was written (the agent kept the stored content).
    Unchanged { version: u64 },
}

impl EditOutcome {
    pub fn version(&self) -> Option<u64> {
        match self {
            EditOutcome::Applied { version } | EditOutcome::Unchanged { version } => Some(*version),
            EditOutcome::ConflictDetected(_) => None,
        }
    }
}

/// What an edit does when the agent's read is out of date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditStrategy {
    /// Record the conflict and leave the node alone.
    #[default]
    Prompt,
    /// Apply the three-way merge when the edits do not overlap; otherwise as `Prompt`.
    Auto,
    /// Overwrite the newer version, noting it in the ledger message.
    Force,
}

impl fmt::Display for EditStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EditStrategy::Prompt => "prompt",
            EditStrategy::Auto => "auto",
            EditStrategy::Force => "force",
        };
        f.write_str(name)
    }
}

impl FromStr for EditStrategy {
    type Err = NiwaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prompt" => Ok(EditStrategy::Prompt),
            "auto" => Ok(EditStrategy::Auto),
            "force" => Ok(EditStrategy::Force),
            other => Err(NiwaError::InvalidInput(format!(
                "unknown edit strategy '{other}' (expected prompt, auto or force)"
            ))),
        }
    }
}

/// What an edit would do right now, without writing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DryRun {
    WouldApply {
        current_version: u64,
        new_version: u64,
        content_changed: bool,
        had_prior_read: bool,
    },
    WouldConflict {
        base_version: u64,
        current_version: u64,
        versions_behind: u64,
        auto_merge_suggestion: Option<String>,
        overlaps: Vec<LineSpan>,
    },
}

/// Record that `agent` has seen the node at its current version.
///
/// Re-reading is a fresh start, so any open conflict of this agent on the node is dropped.
pub fn read(txn: &mut Txn<'_>, node_id: &str, agent: &str, now: u64) -> Result<Node, NiwaError> {
    validate_agent_id(agent)?;
    let node = persist::get_node(txn, node_id)?;
    registry::put_pending(
        txn,
        &PendingRead {
            agent_id: agent.to_string(),
            node_id: node_id.to_string(),
            version_read: node.version,
            read_at: now,
        },
    )?;
    registry::delete_conflict(txn, node_id, agent)?;
    Ok(node)
}

pub fn attempt_edit(
    txn: &mut Txn<'_>,
    node_id: &str,
    agent: &str,
    content: &str,
    message: &str,
    strategy: EditStrategy,
    now: u64,
) -> Result<EditOutcome, NiwaError> {
    validate_agent_id(agent)?;
    let node = persist::get_node(txn, node_id)?;
    let expected = expected_version(txn, &node, agent)?;

    if expected == node.version {
        let version = apply_write(txn, node, content, agent, message, now)?;
        return Ok(EditOutcome::Applied { version });
    }

    if strategy == EditStrategy::Force {
        warn!(
            node_id,
            agent_id = agent,
            base_version = expected,
            overwritten = node.version,
            "Forcing edit over newer version"
        );
        let note = format!("[FORCED - overwrote v{}]", node.version);
        let message = if message.is_empty() {
            note
        } else {
            format!("{message} {note}")
        };
        let version = apply_write(txn, node, content, agent, &message, now)?;
        return Ok(EditOutcome::Applied { version });
    }

    let conflict = build_conflict(txn, &node, agent, expected, content, message, now)?;
    if strategy == EditStrategy::Auto {
        if let Some(merged) = &conflict.auto_merge_suggestion {
            let message = if message.is_empty() {
                "Auto-merged".to_string()
            } else {
                format!("Auto-merged: {message}")
            };
            debug!(node_id, agent_id = agent, base_version = expected, "Edit auto-merged");
            let version = apply_write(txn, node, merged, agent, &message, now)?;
            return Ok(EditOutcome::Applied { version });
        }
    }

    registry::put_conflict(txn, &conflict)?;
    debug!(
        node_id,
        agent_id = agent,
        base_version = expected,
        current_version = node.version,
        auto_merge = conflict.auto_merge_suggestion.is_some(),
        "Edit conflicted"
    );
    Ok(EditOutcome::ConflictDetected(Box::new(conflict)))
}

pub fn dry_run(
    txn: &mut Txn<'_>,
    node_id: &str,
    agent: &str,
    content: &str,
) -> Result<DryRun, NiwaError> {
    validate_agent_id(agent)?;
    let node = persist::get_node(txn, node_id)?;
    let pending = registry::get_pending(txn, agent, node_id)?;
    let expected = pending.as_ref().map(|p| p.version_read).unwrap_or(node.version);

    if expected == node.version {
        return Ok(DryRun::WouldApply {
            current_version: node.version,
            new_version: node.version + 1,
            content_changed: node.content != content,
            had_prior_read: pending.is_some(),
        });
    }

    let base = ledger::record(txn, node_id, expected)?;
    let analysis = merge::three_way(&base.content, content, &node.content);
    Ok(DryRun::WouldConflict {
        base_version: expected,
        current_version: node.version,
        versions_behind: node.version.saturating_sub(expected),
        auto_merge_suggestion: analysis.suggestion,
        overlaps: analysis.overlaps,
    })
}

/// The one write path for content: ledger entry, node update, and clearing the agent's
/// pending read and open conflict on the node. Does not check versions.
pub fn apply_write(
    txn: &mut Txn<'_>,
    mut node: Node,
    content: &str,
    agent: &str,
    message: &str,
    now: u64,
) -> Result<u64, NiwaError> {
    let version = node.version + 1;
    ledger::append(txn, &node.id, version, content, agent, message, now)?;

    node.content = content.to_string();
    node.version = version;
    node.updated_at = now;
    node.last_agent = agent.to_string();
    persist::put_node(txn, &node)?;

    registry::delete_pending(txn, agent, &node.id)?;
    registry::delete_conflict(txn, &node.id, agent)?;
    debug!(node_id = %node.id, agent_id = agent, version, "Content written");
    Ok(version)
}

/// Conflict of `yours` (based on `base_version`) against the node's current content.
pub fn build_conflict(
    txn: &mut Txn<'_>,
    node: &Node,
    agent: &str,
    base_version: u64,
    yours: &str,
    message: &str,
    now: u64,
) -> Result<Conflict, NiwaError> {
    let base = ledger::record(txn, &node.id, base_version)?;
    let analysis = merge::three_way(&base.content, yours, &node.content);
    let their_edits = ledger::between(txn, &node.id, base_version, node.version)?
        .iter()
        .map(TheirEdit::from)
        .collect();

    Ok(Conflict {
        node_id: node.id.clone(),
        agent_id: agent.to_string(),
        node_title: node.title.clone(),
        base_version,
        yours_content: yours.to_string(),
        theirs_version: node.version,
        theirs_content: node.content.clone(),
        auto_merge_suggestion: analysis.suggestion,
        overlaps: analysis.overlaps,
        their_edits,
        message: message.to_string(),
        created_at: now,
    })
}

fn expected_version(txn: &mut Txn<'_>, node: &Node, agent: &str) -> Result<u64, NiwaError> {
    Ok(registry::get_pending(txn, agent, &node.id)?
        .map(|p| p.version_read)
        .unwrap_or(node.version))
}
