//! Integration tests for the niwa document store

mod concurrency;
mod config_integration;
mod document_ops;
mod end_to_end;
mod registry_cleanup;
mod resolution_flow;
