//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{NiwaError, StorageError};

/// Map domain errors to a string for CLI output, with a hint where one helps.
pub fn map_error(e: &NiwaError) -> String {
    let hint = match e {
        NiwaError::AlreadyLoaded => Some("use `niwa load --replace` to overwrite"),
        NiwaError::NoOpenConflict { .. } => Some("see `niwa conflicts`"),
        NiwaError::StaleConflict(_) => Some("review the refreshed conflict and resolve again"),
        NiwaError::NoAutoMergeAvailable { .. } => {
            Some("resolve with accept_yours, accept_theirs or manual_merge")
        }
        NiwaError::StorageError(StorageError::Busy(_)) => {
            Some("another process holds the store; retry shortly")
        }
        _ => None,
    };
    match hint {
        Some(hint) => format!("Error: {e}\nHint: {hint}"),
        None => format!("Error: {e}"),
    }
}

/// Process exit code for an error: 2 for input and lookup errors, 3 for contention, 1 otherwise.
pub fn exit_code(e: &NiwaError) -> i32 {
    match e {
        NiwaError::NodeNotFound(_)
        | NiwaError::VersionNotFound { .. }
        | NiwaError::InvalidInput(_)
        | NiwaError::DuplicateTitle { .. }
        | NiwaError::AlreadyLoaded
        | NiwaError::NoOpenConflict { .. }
        | NiwaError::NoAutoMergeAvailable { .. } => 2,
        NiwaError::StaleConflict(_) => 3,
        NiwaError::StorageError(StorageError::Busy(_) | StorageError::WriteConflict) => 3,
        _ => 1,
    }
}
