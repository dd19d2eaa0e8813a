//! Three-way merge
//!
//! Given the content an agent last read (`base`), the agent's proposal (`yours`) and the
//! current stored content (`theirs`), decide whether both edit sets can be applied to
//! `base` together. Pure and deterministic.

pub mod diff;

pub use diff::{diff_lines, split_lines, Hunk, HunkKind};

use serde::{Deserialize, Serialize};

/// Half-open range of base lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAnalysis {
    pub yours: Vec<Hunk>,
    pub theirs: Vec<Hunk>,
    /// Base regions touched by both sides, one per overlapping hunk pair.
    pub overlaps: Vec<LineSpan>,
    /// Base with both hunk sets applied; `None` when any hunks overlap.
    pub suggestion: Option<String>,
}

impl MergeAnalysis {
    pub fn can_auto_merge(&self) -> bool {
        self.suggestion.is_some()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Yours,
    Theirs,
}

pub fn three_way(base: &str, yours: &str, theirs: &str) -> MergeAnalysis {
    let your_hunks = diff_lines(base, yours);
    let their_hunks = diff_lines(base, theirs);

    let mut overlaps = Vec::new();
    for mine in &your_hunks {
        for other in &their_hunks {
            if mine.overlaps(other) {
                let span = LineSpan {
                    start: mine.base_start.min(other.base_start),
                    end: mine.base_end.max(other.base_end),
                };
                if !overlaps.contains(&span) {
                    overlaps.push(span);
                }
            }
        }
    }

    let suggestion = if overlaps.is_empty() {
        Some(apply_both(base, &your_hunks, &their_hunks))
    } else {
        None
    };

    MergeAnalysis {
        yours: your_hunks,
        theirs: their_hunks,
        overlaps,
        suggestion,
    }
}

/// Apply two disjoint hunk sets in base order, yours first at equal anchors.
fn apply_both(base: &str, yours: &[Hunk], theirs: &[Hunk]) -> String {
    let lines = split_lines(base);
    let mut ops: Vec<(Side, &Hunk)> = yours
        .iter()
        .map(|h| (Side::Yours, h))
        .chain(theirs.iter().map(|h| (Side::Theirs, h)))
        .collect();
    ops.sort_by_key(|(side, hunk)| (hunk.base_start, *side));

    let mut out = String::with_capacity(base.len());
    let mut cursor = 0;
    for (_, hunk) in ops {
        let start = hunk.base_start.max(cursor);
        out.extend(lines[cursor..start].iter().copied());
        out.extend(hunk.lines.iter().map(String::as_str));
        cursor = hunk.base_end.max(start);
    }
    out.extend(lines[cursor..].iter().copied());
    out
}
