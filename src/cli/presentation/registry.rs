//! Registry presentation: agent status, conflicts, agents, health, cleanup.

use super::shared::{format_timestamp, section_heading, to_json, truncate};
use crate::health::HealthReport;
use crate::registry::{AgentStatus, AgentSummary, CleanupReport, Conflict};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::Path;

pub fn format_agent_status_text(status: &AgentStatus) -> String {
    let mut out = format!(
        "{}\n\n",
        section_heading(&format!("Agent {}", status.agent_id))
    );

    out.push_str(&format!("{}\n", section_heading("Pending reads")));
    if status.pending_reads.is_empty() {
        out.push_str("  None\n\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Node", "Title", "Read", "Current", "State"]);
        for read in &status.pending_reads {
            let state = if read.is_stale() {
                format!("{} behind", read.versions_behind())
            } else {
                "current".to_string()
            };
            table.add_row(vec![
                read.node_id.clone(),
                truncate(&read.node_title, 40),
                format!("v{}", read.version_read),
                format!("v{}", read.current_version),
                state,
            ]);
        }
        out.push_str(&format!("{}\n\n", table));
        let stale = status.pending_reads.iter().filter(|r| r.is_stale()).count();
        if stale > 0 {
            out.push_str(&format!(
                "{}\n\n",
                format!("{} read(s) are stale; editing them will conflict", stale).yellow()
            ));
        }
    }

    out.push_str(&format!("{}\n", section_heading("Open conflicts")));
    if status.open_conflicts.is_empty() {
        out.push_str("  None\n\n");
    } else {
        out.push_str(&format!("{}\n\n", conflicts_table(&status.open_conflicts)));
    }

    out.push_str(&format!("{}\n", section_heading("Recent edits")));
    if status.recent_edits.is_empty() {
        out.push_str("  None");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Node", "Version", "Time", "Message"]);
        for edit in &status.recent_edits {
            table.add_row(vec![
                edit.node_id.clone(),
                format!("v{}", edit.version),
                format_timestamp(edit.timestamp),
                truncate(&edit.message, 50),
            ]);
        }
        out.push_str(&table.to_string());
    }
    out
}

pub fn format_agent_status_json(status: &AgentStatus) -> String {
    to_json(status)
}

pub fn format_conflicts_text(conflicts: &[Conflict]) -> String {
    if conflicts.is_empty() {
        return "No open conflicts.".to_string();
    }
    format!(
        "{}\n\nTotal: {} conflict(s)",
        conflicts_table(conflicts),
        conflicts.len()
    )
}

pub fn format_conflicts_json(conflicts: &[Conflict]) -> String {
    to_json(&json!({ "conflicts": conflicts, "total": conflicts.len() }))
}

fn conflicts_table(conflicts: &[Conflict]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Node", "Agent", "Base", "Theirs", "Auto-merge", "Created"]);
    for conflict in conflicts {
        table.add_row(vec![
            conflict.node_id.clone(),
            conflict.agent_id.clone(),
            format!("v{}", conflict.base_version),
            format!("v{}", conflict.theirs_version),
            if conflict.auto_merge_suggestion.is_some() {
                "yes".to_string()
            } else {
                "no".to_string()
            },
            format_timestamp(conflict.created_at),
        ]);
    }
    table
}

pub fn format_agents_text(agents: &[AgentSummary]) -> String {
    if agents.is_empty() {
        return "No agents found.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Agent", "Edits", "Nodes", "Pending", "Conflicts", "Last seen"]);
    for agent in agents {
        table.add_row(vec![
            agent.agent_id.clone(),
            agent.edit_count.to_string(),
            agent.nodes_edited.len().to_string(),
            agent.pending_reads.to_string(),
            agent.open_conflicts.to_string(),
            format_timestamp(agent.last_seen),
        ]);
    }
    format!("{}\n\nTotal: {} agent(s)", table, agents.len())
}

pub fn format_agents_json(agents: &[AgentSummary]) -> String {
    to_json(&json!({ "agents": agents, "total": agents.len() }))
}

pub fn format_health_text(report: &HealthReport, store_path: &Path) -> String {
    let mut out = format!("{}\n\n", section_heading("Store health"));
    out.push_str(&format!("  Store: {}\n", store_path.display()));
    out.push_str(&format!(
        "  Initialized: {}\n",
        if report.initialized { "yes" } else { "no" }
    ));
    out.push_str(&format!("  Nodes: {}\n", report.node_count));
    out.push_str(&format!("  Versions: {}\n", report.total_versions));
    out.push_str(&format!("  Agents: {}\n", report.agent_count));
    out.push_str(&format!("  Pending reads: {}\n", report.pending_reads));
    out.push_str(&format!("  Open conflicts: {}\n", report.open_conflicts));
    let last_edit = report
        .last_edit
        .map(format_timestamp)
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!("  Last edit: {}\n\n", last_edit));

    if report.is_healthy() {
        out.push_str(&format!("{}", "All integrity checks passed".green()));
    } else {
        out.push_str(&format!(
            "{}\n",
            format!("Integrity issues ({}):", report.issues.len()).red()
        ));
        for issue in &report.issues {
            out.push_str(&format!("  - {}\n", issue));
        }
    }
    out
}

pub fn format_health_json(report: &HealthReport, store_path: &Path) -> String {
    to_json(&json!({
        "store": store_path.display().to_string(),
        "healthy": report.is_healthy(),
        "report": report,
    }))
}

pub fn format_cleanup_text(report: &CleanupReport, horizon_days: Option<u64>) -> String {
    match horizon_days {
        None => "Expiry is disabled; nothing removed.".to_string(),
        Some(days) => format!(
            "Removed {} pending read(s) and {} conflict(s) older than {} day(s).",
            report.pending_removed, report.conflicts_removed, days
        ),
    }
}

pub fn format_cleanup_json(report: &CleanupReport) -> String {
    to_json(report)
}
