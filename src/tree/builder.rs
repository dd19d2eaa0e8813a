//! Markdown to tree.
//!
//! A line of one to six `#` followed by a space, a tab or the end of the line is a heading.
//! Each heading closes open headings of the same or deeper level and nests under the
//! nearest shallower one, falling back to the root. Lines inside ``` or ~~~ fences are
//! never headings.

use crate::tree::node::{Node, MAX_LEVEL};
use crate::tree::Tree;
use tracing::debug;

/// Parse with a fresh id counter (root takes index 0).
pub fn parse(markdown: &str) -> Tree {
    TreeBuilder::new().build(markdown).tree
}

pub struct BuiltTree {
    pub tree: Tree,
    /// First counter value not used by this tree.
    pub next_index: u64,
}

pub struct TreeBuilder {
    first_index: u64,
    now: u64,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::with_first_index(0)
    }

    /// Start numbering at a persisted counter value. The root consumes `index`.
    pub fn with_first_index(index: u64) -> Self {
        Self {
            first_index: index,
            now: 0,
        }
    }

    /// Timestamp stamped on every created node.
    pub fn at(mut self, now: u64) -> Self {
        self.now = now;
        self
    }

    pub fn build(self, markdown: &str) -> BuiltTree {
        let text = normalize_line_endings(markdown);
        let mut index = self.first_index + 1;

        let mut nodes = vec![Node::root(String::new(), self.now)];
        // (level, position in `nodes`)
        let mut open: Vec<(u8, usize)> = vec![(0, 0)];
        let mut fence: Option<(char, usize)> = None;

        for line in text.split_inclusive('\n') {
            if let Some((ch, len)) = fence {
                if matches!(fence_marker(line), Some((c, l)) if c == ch && l >= len) {
                    fence = None;
                }
            } else if let Some(marker) = fence_marker(line) {
                fence = Some(marker);
            } else if let Some((level, title)) = heading_of(line) {
                while open.last().map(|(l, _)| *l >= level).unwrap_or(false) {
                    open.pop();
                }
                let parent_pos = open.last().map(|(_, pos)| *pos).unwrap_or(0);
                let parent_id = nodes[parent_pos].id.clone();

                let node = Node::heading(index, level, title.to_string(), parent_id, self.now);
                index += 1;
                nodes[parent_pos].children.push(node.id.clone());
                nodes.push(node);
                open.push((level, nodes.len() - 1));
                continue;
            }

            let current = nodes.len() - 1;
            nodes[current].content.push_str(line);
        }

        debug!(node_count = nodes.len(), next_index = index, "Parsed markdown");
        BuiltTree {
            tree: Tree::from_parts(nodes),
            next_index: index,
        }
    }
}

/// Strips a UTF-8 BOM and converts CRLF to LF.
pub fn normalize_line_endings(text: &str) -> String {
    text.strip_prefix('\u{feff}')
        .unwrap_or(text)
        .replace("\r\n", "\n")
}

/// Returns the heading level and trimmed title when `line` is a heading.
pub fn heading_of(line: &str) -> Option<(u8, &str)> {
    let body = line.strip_suffix('\n').unwrap_or(line);
    let hashes = body.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > MAX_LEVEL as usize {
        return None;
    }
    let rest = &body[hashes..];
    if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
        Some((hashes as u8, rest.trim()))
    } else {
        None
    }
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let count = trimmed.chars().take_while(|c| *c == ch).count();
    (count >= 3).then_some((ch, count))
}
