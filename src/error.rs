//! Error types for the Niwa document store.

use crate::registry::Conflict;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The writer gate or the database lock could not be acquired in time.
    #[error("Store busy: {0}")]
    Busy(String),

    /// Another writer committed over keys this transaction read. Safe to retry.
    #[error("Write conflict: transaction read set changed before commit")]
    WriteConflict,

    #[error("Storage full: {0}")]
    StorageFull(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl StorageError {
    /// Contention a caller may retry as-is. Only `WriteConflict` is also retried inside
    /// `Store::write`; `Busy` is left to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::WriteConflict | StorageError::Busy(_))
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        match err {
            sled::Error::Io(io) if io.raw_os_error() == Some(ENOSPC) => {
                StorageError::StorageFull(io.to_string())
            }
            sled::Error::Io(io) => StorageError::IoError(io),
            other => StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                other.to_string(),
            )),
        }
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Codec(err.to_string())
    }
}

const ENOSPC: i32 = 28;

/// Errors returned by document store commands
#[derive(Debug, Error)]
pub enum NiwaError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Version {version} not found for node {node_id}")]
    VersionNotFound { node_id: String, version: u64 },

    #[error("No auto-merge available for node {node_id} (agent {agent_id}): edits overlap")]
    NoAutoMergeAvailable { node_id: String, agent_id: String },

    #[error("No open conflict for node {node_id} and agent {agent_id}")]
    NoOpenConflict { node_id: String, agent_id: String },

    /// The node moved again after the conflict was recorded. Carries the recomputed conflict.
    #[error(
        "Stale conflict on node {}: node is now at v{}, conflict recomputed",
        .0.node_id,
        .0.theirs_version
    )]
    StaleConflict(Box<Conflict>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Node {existing_id} under {parent_id} already has title '{title}'")]
    DuplicateTitle {
        parent_id: String,
        title: String,
        existing_id: String,
    },

    #[error("A document is already loaded; pass replace to overwrite it")]
    AlreadyLoaded,

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl NiwaError {
    /// Transactional contention that a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NiwaError::StorageError(e) if e.is_retryable())
    }
}

impl From<config::ConfigError> for NiwaError {
    fn from(err: config::ConfigError) -> Self {
        NiwaError::ConfigError(err.to_string())
    }
}
