//! niwa: multi-writer markdown document store
//!
//! A markdown document is parsed into a tree of heading nodes kept in a transactional
//! store. Agents read nodes and submit edits; optimistic concurrency control detects edits
//! based on stale reads and records them as conflicts with a three-way merge analysis,
//! which the agent then resolves. Every content change is kept in a per-node version ledger.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod ledger;
pub mod logging;
pub mod merge;
pub mod occ;
pub mod registry;
pub mod resolution;
pub mod search;
pub mod store;
pub mod tree;

pub use api::{LoadReport, Niwa};
pub use error::{NiwaError, StorageError};
pub use occ::{DryRun, EditOutcome, EditStrategy};
pub use resolution::Resolution;
