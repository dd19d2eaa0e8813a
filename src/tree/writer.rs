//! Tree to markdown, and the outline listing.

use crate::tree::Tree;

const OUTLINE_TITLE_WIDTH: usize = 40;

/// Root content first, then every heading in pre-order.
///
/// Non-empty content that does not end in a newline gets one, so the next heading always
/// starts on its own line.
pub fn serialize(tree: &Tree) -> String {
    let mut out = String::new();
    for node in tree.walk() {
        if !node.is_root() {
            for _ in 0..node.level {
                out.push('#');
            }
            out.push(' ');
            out.push_str(&node.title);
            out.push('\n');
        }
        out.push_str(&node.content);
        if !node.content.is_empty() && !node.content.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

/// One line per node: `[id] vN "title" (by agent)`, indented by depth.
pub fn render_outline(tree: &Tree) -> String {
    let mut lines = Vec::with_capacity(tree.len());
    for (depth, node) in tree.walk_with_depth() {
        let title: String = node.title.chars().take(OUTLINE_TITLE_WIDTH).collect();
        let mut line = format!(
            "{}[{}] v{} \"{}\" (by {})",
            "  ".repeat(depth),
            node.id,
            node.version,
            title,
            node.last_agent
        );
        if node.summary.is_some() {
            line.push_str(" [S]");
        }
        lines.push(line);
    }
    lines.join("\n")
}
