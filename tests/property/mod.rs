//! Property-based tests for the parser, the merge engine and the version ledger

mod ledger_versions;
mod merge_properties;
mod tree_roundtrip;
