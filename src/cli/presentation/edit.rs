//! Edit presentation: outcomes, conflicts, dry runs.

use super::shared::{format_timestamp, section_heading, to_json};
use crate::merge::LineSpan;
use crate::occ::{DryRun, EditOutcome};
use crate::registry::Conflict;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn format_edit_outcome_text(node_id: &str, outcome: &EditOutcome) -> String {
    match outcome {
        EditOutcome::Applied { version } => {
            format!("{} {} is now v{}", "Applied:".green().bold(), node_id, version)
        }
        EditOutcome::Unchanged { version } => {
            format!("{} {} stays at v{}", "Unchanged:".bold(), node_id, version)
        }
        EditOutcome::ConflictDetected(conflict) => format_conflict_text(conflict),
    }
}

pub fn format_edit_outcome_json(node_id: &str, outcome: &EditOutcome) -> String {
    to_json(&json!({ "node_id": node_id, "outcome": outcome }))
}

pub fn format_conflict_text(conflict: &Conflict) -> String {
    let mut out = format!(
        "{} on [{}] {}\n",
        "Conflict".red().bold(),
        conflict.node_id,
        conflict.node_title
    );
    out.push_str(&format!(
        "You edited v{}; the node is now at v{}.\n",
        conflict.base_version, conflict.theirs_version
    ));

    if !conflict.their_edits.is_empty() {
        out.push_str(&format!("\n{}\n", section_heading("Edits since your read")));
        for edit in &conflict.their_edits {
            let message = if edit.message.is_empty() {
                String::new()
            } else {
                format!(": {}", edit.message)
            };
            out.push_str(&format!(
                "  v{} by {} at {}{}\n",
                edit.version,
                edit.agent,
                format_timestamp(edit.timestamp),
                message
            ));
        }
    }

    if conflict.overlaps.is_empty() {
        out.push_str(&format!("\n{}\n", "Edits do not overlap; auto-merge available.".green()));
    } else {
        out.push_str(&format!(
            "\n{} {}\n",
            "Overlapping lines:".yellow(),
            format_spans(&conflict.overlaps)
        ));
    }

    out.push_str(&format!("\n--- yours ---\n{}", conflict.yours_content));
    out.push_str(&format!("\n--- theirs ---\n{}", conflict.theirs_content));
    if let Some(merged) = &conflict.auto_merge_suggestion {
        out.push_str(&format!("\n--- auto-merge ---\n{}", merged));
    }
    out.push_str(&format!(
        "\nResolve with: niwa resolve {} <accept_yours|accept_theirs|accept_auto_merge|manual_merge> --agent {}",
        conflict.node_id, conflict.agent_id
    ));
    out
}

pub fn format_dry_run_text(node_id: &str, dry_run: &DryRun) -> String {
    match dry_run {
        DryRun::WouldApply {
            current_version,
            new_version,
            content_changed,
            had_prior_read,
        } => {
            let mut out = format!(
                "Would apply: {} v{} -> v{}",
                node_id, current_version, new_version
            );
            if !content_changed {
                out.push_str("\nNote: content is identical to the current version");
            }
            if !had_prior_read {
                out.push_str("\nNote: no prior read registered; the edit is checked against the current version");
            }
            out
        }
        DryRun::WouldConflict {
            base_version,
            current_version,
            versions_behind,
            auto_merge_suggestion,
            overlaps,
        } => {
            let mut out = format!(
                "{} {} was read at v{}, now at v{} ({} version(s) behind)",
                "Would conflict:".yellow().bold(),
                node_id,
                base_version,
                current_version,
                versions_behind
            );
            if auto_merge_suggestion.is_some() {
                out.push_str("\nAuto-merge would be available");
            } else {
                out.push_str(&format!("\nOverlapping lines: {}", format_spans(overlaps)));
            }
            out
        }
    }
}

pub fn format_dry_run_json(node_id: &str, dry_run: &DryRun) -> String {
    to_json(&json!({ "node_id": node_id, "dry_run": dry_run }))
}

/// Base line ranges, 1-based and inclusive.
fn format_spans(spans: &[LineSpan]) -> String {
    spans
        .iter()
        .map(|s| {
            if s.end <= s.start + 1 {
                format!("L{}", s.start + 1)
            } else {
                format!("L{}-{}", s.start + 1, s.end)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
