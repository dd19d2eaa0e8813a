//! Substring search over titles and content.

use crate::tree::Tree;
use serde::{Deserialize, Serialize};

const MAX_LINES_PER_NODE: usize = 5;
const MAX_LINE_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMatch {
    /// 1-based line number within the node's content.
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub node_id: String,
    pub title: String,
    pub version: u64,
    pub match_in_title: bool,
    /// First few matching lines, truncated.
    pub matching_lines: Vec<LineMatch>,
    pub total_matches: usize,
}

/// Hits in document order.
pub fn search(tree: &Tree, query: &str, case_sensitive: bool) -> Vec<SearchHit> {
    let fold = |s: &str| {
        if case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    };
    let needle = fold(query);

    let mut hits = Vec::new();
    for node in tree.walk() {
        let match_in_title = fold(&node.title).contains(&needle);
        let matches: Vec<LineMatch> = node
            .content
            .lines()
            .enumerate()
            .filter(|(_, line)| fold(line).contains(&needle))
            .map(|(i, line)| LineMatch {
                line: i + 1,
                text: line.chars().take(MAX_LINE_CHARS).collect(),
            })
            .collect();

        if !match_in_title && matches.is_empty() {
            continue;
        }
        let total_matches = matches.len();
        hits.push(SearchHit {
            node_id: node.id.clone(),
            title: node.title.clone(),
            version: node.version,
            match_in_title,
            matching_lines: matches.into_iter().take(MAX_LINES_PER_NODE).collect(),
            total_matches,
        });
    }
    hits
}
