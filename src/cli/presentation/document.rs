//! Document presentation: outline, nodes, search hits, history.

use super::shared::{format_timestamp, section_heading, to_json, truncate};
use crate::api::LoadReport;
use crate::ledger::VersionRecord;
use crate::search::SearchHit;
use crate::tree::{render_outline, Node, Tree};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn format_load_report(report: &LoadReport) -> String {
    let verb = if report.replaced { "Replaced" } else { "Loaded" };
    let mut out = format!(
        "{} document: {} node(s) including root",
        verb, report.node_count
    );
    if !report.node_ids.is_empty() {
        out.push_str(&format!("\nHeadings: {}", report.node_ids.join(", ")));
    }
    out
}

pub fn format_outline_text(tree: &Tree) -> String {
    render_outline(tree)
}

pub fn format_outline_json(tree: &Tree) -> String {
    let nodes: Vec<_> = tree
        .walk_with_depth()
        .into_iter()
        .map(|(depth, node)| {
            json!({
                "id": node.id,
                "level": node.level,
                "depth": depth,
                "title": node.title,
                "version": node.version,
                "parent_id": node.parent_id,
                "children": node.children,
                "summary": node.summary,
                "last_agent": node.last_agent,
            })
        })
        .collect();
    to_json(&json!({ "nodes": nodes, "total": tree.len() }))
}

pub fn format_node_text(node: &Node) -> String {
    let mut out = format!("{} {}\n", format!("[{}]", node.id).bold(), node.title.bold());
    out.push_str(&format!("Version: {}\n", node.version));
    out.push_str(&format!(
        "Last edit: {} at {}\n",
        node.last_agent,
        format_timestamp(node.updated_at)
    ));
    if let Some(summary) = &node.summary {
        out.push_str(&format!("Summary: {}\n", summary));
    }
    if !node.children.is_empty() {
        out.push_str(&format!("Children: {}\n", node.children.join(", ")));
    }
    out.push_str("---\n");
    out.push_str(&node.content);
    out
}

pub fn format_node_json(node: &Node) -> String {
    to_json(node)
}

pub fn format_search_text(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No matches for '{}'.", query);
    }
    let mut out = format!("{}\n", section_heading(&format!("Matches for '{}'", query)));
    for hit in hits {
        let marker = if hit.match_in_title { " (title)" } else { "" };
        out.push_str(&format!(
            "\n[{}] {} v{}{}\n",
            hit.node_id, hit.title, hit.version, marker
        ));
        for line in &hit.matching_lines {
            out.push_str(&format!("  L{}: {}\n", line.line, line.text));
        }
        let hidden = hit.total_matches.saturating_sub(hit.matching_lines.len());
        if hidden > 0 {
            out.push_str(&format!("  ... and {} more\n", hidden));
        }
    }
    out.push_str(&format!("\n{} node(s) matched", hits.len()));
    out
}

pub fn format_search_json(query: &str, hits: &[SearchHit]) -> String {
    to_json(&json!({ "query": query, "hits": hits, "total": hits.len() }))
}

pub fn format_history_text(node_id: &str, records: &[VersionRecord], full: bool) -> String {
    let mut out = format!("{}\n\n", section_heading(&format!("History of {}", node_id)));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Version", "Agent", "Time", "Message", "Hash"]);
    for record in records {
        table.add_row(vec![
            format!("v{}", record.version),
            record.agent.clone(),
            format_timestamp(record.timestamp),
            truncate(&record.message, 50),
            record.content_hash.chars().take(8).collect(),
        ]);
    }
    out.push_str(&table.to_string());

    if full {
        for record in records {
            out.push_str(&format!("\n\n--- v{} ---\n", record.version));
            out.push_str(&record.content);
        }
    }
    out
}

pub fn format_history_json(node_id: &str, records: &[VersionRecord]) -> String {
    to_json(&json!({ "node_id": node_id, "versions": records }))
}
