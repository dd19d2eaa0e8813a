//! Node records and id validation.

use crate::error::NiwaError;
use serde::{Deserialize, Serialize};

pub const ROOT_ID: &str = "root";
pub const ROOT_TITLE: &str = "Document";
pub const SYSTEM_AGENT: &str = "system";
pub const MAX_LEVEL: u8 = 6;
const MAX_AGENT_LEN: usize = 128;

/// One heading (or the document root) and the body text under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    /// 0 for the root, 1..=6 for headings.
    pub level: u8,
    pub title: String,
    /// Text strictly between this heading line and the next heading line.
    pub content: String,
    pub parent_id: Option<String>,
    pub children: Vec<String>,
    pub version: u64,
    pub summary: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    pub last_agent: String,
}

impl Node {
    pub fn root(content: String, now: u64) -> Self {
        Self {
            id: ROOT_ID.to_string(),
            level: 0,
            title: ROOT_TITLE.to_string(),
            content,
            parent_id: None,
            children: Vec::new(),
            version: 1,
            summary: None,
            created_at: now,
            updated_at: now,
            last_agent: SYSTEM_AGENT.to_string(),
        }
    }

    pub fn heading(index: u64, level: u8, title: String, parent_id: String, now: u64) -> Self {
        Self {
            id: heading_id(level, index),
            level,
            title,
            content: String::new(),
            parent_id: Some(parent_id),
            children: Vec::new(),
            version: 1,
            summary: None,
            created_at: now,
            updated_at: now,
            last_agent: SYSTEM_AGENT.to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

pub fn heading_id(level: u8, index: u64) -> String {
    format!("h{level}_{index}")
}

/// Accepts `root` or `h{1-6}_{digits}`.
pub fn validate_node_id(id: &str) -> Result<(), NiwaError> {
    if id == ROOT_ID {
        return Ok(());
    }
    let valid = id
        .strip_prefix('h')
        .and_then(|rest| rest.split_once('_'))
        .map(|(level, index)| {
            matches!(level, "1" | "2" | "3" | "4" | "5" | "6")
                && !index.is_empty()
                && index.bytes().all(|b| b.is_ascii_digit())
        })
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(NiwaError::InvalidInput(format!("malformed node id '{id}'")))
    }
}

pub fn validate_agent_id(agent: &str) -> Result<(), NiwaError> {
    if agent.trim().is_empty() {
        return Err(NiwaError::InvalidInput("agent id must not be empty".to_string()));
    }
    if agent.chars().any(char::is_control) {
        return Err(NiwaError::InvalidInput(format!(
            "agent id {agent:?} contains control characters"
        )));
    }
    if agent.chars().count() > MAX_AGENT_LEN {
        return Err(NiwaError::InvalidInput(format!(
            "agent id longer than {MAX_AGENT_LEN} characters"
        )));
    }
    Ok(())
}

/// Trims and rejects titles that would break the heading line.
pub fn normalize_title(title: &str) -> Result<String, NiwaError> {
    let trimmed = title.trim();
    if trimmed.contains('\n') || trimmed.contains('\r') {
        return Err(NiwaError::InvalidInput("title must be a single line".to_string()));
    }
    if trimmed.is_empty() {
        return Err(NiwaError::InvalidInput("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
