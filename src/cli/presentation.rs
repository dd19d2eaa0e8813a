//! CLI presentation: text and json formatters per command family.

mod document;
mod edit;
mod registry;
mod shared;

pub use document::{
    format_history_json, format_history_text, format_load_report, format_node_json,
    format_node_text, format_outline_json, format_outline_text, format_search_json,
    format_search_text,
};
pub use edit::{
    format_conflict_text, format_dry_run_json, format_dry_run_text, format_edit_outcome_json,
    format_edit_outcome_text,
};
pub use registry::{
    format_agent_status_json, format_agent_status_text, format_agents_json, format_agents_text,
    format_cleanup_json, format_cleanup_text, format_conflicts_json, format_conflicts_text,
    format_health_json, format_health_text,
};
