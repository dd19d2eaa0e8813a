//! Conflict resolution.

use crate::error::NiwaError;
use crate::occ::{self, EditOutcome};
use crate::registry::{self, Conflict};
use crate::store::Txn;
use crate::tree::node::validate_agent_id;
use crate::tree::persist;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    AcceptYours,
    AcceptTheirs,
    AcceptAutoMerge,
    ManualMerge,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resolution::AcceptYours => "accept_yours",
            Resolution::AcceptTheirs => "accept_theirs",
            Resolution::AcceptAutoMerge => "accept_auto_merge",
            Resolution::ManualMerge => "manual_merge",
        };
        f.write_str(name)
    }
}

impl FromStr for Resolution {
    type Err = NiwaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "accept_yours" | "yours" => Ok(Resolution::AcceptYours),
            "accept_theirs" | "theirs" => Ok(Resolution::AcceptTheirs),
            "accept_auto_merge" | "auto_merge" | "auto" => Ok(Resolution::AcceptAutoMerge),
            "manual_merge" | "manual" => Ok(Resolution::ManualMerge),
            other => Err(NiwaError::InvalidInput(format!(
                "unknown resolution '{other}' (expected accept_yours, accept_theirs, accept_auto_merge or manual_merge)"
            ))),
        }
    }
}

/// Result of a resolve transaction.
///
/// A stale conflict is refreshed inside the transaction and must be committed before the
/// caller reports `StaleConflict`, so it is returned as a value rather than an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Outcome(EditOutcome),
    Stale(Box<Conflict>),
}

impl Resolved {
    pub fn into_result(self) -> Result<EditOutcome, NiwaError> {
        match self {
            Resolved::Outcome(outcome) => Ok(outcome),
            Resolved::Stale(fresh) => Err(NiwaError::StaleConflict(fresh)),
        }
    }
}

pub fn resolve(
    txn: &mut Txn<'_>,
    node_id: &str,
    agent: &str,
    resolution: Resolution,
    manual_content: Option<&str>,
    now: u64,
) -> Result<Resolved, NiwaError> {
    validate_agent_id(agent)?;
    let node = persist::get_node(txn, node_id)?;
    let conflict = registry::get_conflict(txn, node_id, agent)?.ok_or_else(|| {
        NiwaError::NoOpenConflict {
            node_id: node_id.to_string(),
            agent_id: agent.to_string(),
        }
    })?;

    if conflict.theirs_version != node.version {
        let fresh = occ::build_conflict(
            txn,
            &node,
            agent,
            conflict.base_version,
            &conflict.yours_content,
            &conflict.message,
            now,
        )?;
        registry::put_conflict(txn, &fresh)?;
        debug!(
            node_id,
            agent_id = agent,
            recorded = conflict.theirs_version,
            current = node.version,
            "Conflict went stale, recomputed"
        );
        return Ok(Resolved::Stale(Box::new(fresh)));
    }

    let content = match resolution {
        Resolution::AcceptTheirs => {
            registry::delete_conflict(txn, node_id, agent)?;
            registry::delete_pending(txn, agent, node_id)?;
            return Ok(Resolved::Outcome(EditOutcome::Unchanged {
                version: node.version,
            }));
        }
        Resolution::AcceptYours => conflict.yours_content.clone(),
        Resolution::AcceptAutoMerge => conflict.auto_merge_suggestion.clone().ok_or_else(|| {
            NiwaError::NoAutoMergeAvailable {
                node_id: node_id.to_string(),
                agent_id: agent.to_string(),
            }
        })?,
        Resolution::ManualMerge => manual_content
            .map(str::to_string)
            .ok_or_else(|| NiwaError::InvalidInput("manual_merge requires content".to_string()))?,
    };

    let message = if conflict.message.is_empty() {
        format!("Conflict resolved: {resolution}")
    } else {
        format!("Conflict resolved: {resolution} ({})", conflict.message)
    };
    let version = occ::apply_write(txn, node, &content, agent, &message, now)?;
    Ok(Resolved::Outcome(EditOutcome::Applied { version }))
}
