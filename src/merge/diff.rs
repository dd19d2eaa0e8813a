//! Line diff.
//!
//! Myers shortest edit script over lines (each line keeps its trailing newline), coalesced
//! into hunks addressed by base line numbers.

use serde::{Deserialize, Serialize};

/// Edit scripts longer than this fall back to one replace hunk over the changed middle.
const MAX_EDIT_DISTANCE: usize = 1024;

/// Replace base lines `[base_start, base_end)` with `lines`.
///
/// An empty range is an insert before `base_start`; empty `lines` is a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub base_start: usize,
    pub base_end: usize,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkKind {
    Insert,
    Delete,
    Replace,
}

impl Hunk {
    fn at(base_line: usize) -> Self {
        Self {
            base_start: base_line,
            base_end: base_line,
            lines: Vec::new(),
        }
    }

    pub fn kind(&self) -> HunkKind {
        match (self.base_start == self.base_end, self.lines.is_empty()) {
            (true, _) => HunkKind::Insert,
            (false, true) => HunkKind::Delete,
            (false, false) => HunkKind::Replace,
        }
    }

    /// Half-open range test. An insert overlaps a range only when strictly inside it.
    pub fn overlaps(&self, other: &Hunk) -> bool {
        self.base_start < other.base_end && other.base_start < self.base_end
    }
}

pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Hunks turning `base` into `other`, in base order.
pub fn diff_lines(base: &str, other: &str) -> Vec<Hunk> {
    let old = split_lines(base);
    let new = split_lines(other);

    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let edits = myers_line_edits(old_mid, new_mid).unwrap_or_else(|| {
        let mut edits = vec![LineEdit::Delete; old_mid.len()];
        edits.extend((0..new_mid.len()).map(LineEdit::Insert));
        edits
    });
    coalesce(&edits, new_mid, prefix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEdit {
    Equal,
    Delete,
    /// Index into the new lines.
    Insert(usize),
}

fn myers_line_edits(old: &[&str], new: &[&str]) -> Option<Vec<LineEdit>> {
    let old_len = old.len();
    let new_len = new.len();

    if old_len == 0 {
        return Some((0..new_len).map(LineEdit::Insert).collect());
    }
    if new_len == 0 {
        return Some(vec![LineEdit::Delete; old_len]);
    }

    let limit = (old_len + new_len).min(MAX_EDIT_DISTANCE);
    let offset = limit as isize + 1;
    let mut v = vec![0isize; 2 * limit + 3];
    let mut trace: Vec<Vec<isize>> = Vec::with_capacity(limit + 1);

    for d in 0..=limit {
        trace.push(v.clone());

        let d_isize = d as isize;
        let mut k = -d_isize;
        while k <= d_isize {
            let mut x = if k == -d_isize
                || (k != d_isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
            {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = x - k;

            while x < old_len as isize && y < new_len as isize && old[x as usize] == new[y as usize]
            {
                x += 1;
                y += 1;
            }

            v[(k + offset) as usize] = x;

            if x >= old_len as isize && y >= new_len as isize {
                return Some(backtrack(old_len, new_len, &trace, d, offset));
            }

            k += 2;
        }
    }
    None
}

fn backtrack(
    old_len: usize,
    new_len: usize,
    trace: &[Vec<isize>],
    solved_d: usize,
    offset: isize,
) -> Vec<LineEdit> {
    let mut edits = Vec::new();
    let mut x = old_len as isize;
    let mut y = new_len as isize;

    for d in (0..=solved_d).rev() {
        let v = &trace[d];
        let k = x - y;
        let d_isize = d as isize;

        let prev_k = if d == 0 {
            0
        } else if k == -d_isize
            || (k != d_isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { v[(prev_k + offset) as usize] };
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(LineEdit::Equal);
            x -= 1;
            y -= 1;
        }

        if d == 0 {
            break;
        }

        if x == prev_x {
            edits.push(LineEdit::Insert((y - 1) as usize));
            y -= 1;
        } else {
            edits.push(LineEdit::Delete);
            x -= 1;
        }
    }

    edits.reverse();
    edits
}

fn coalesce(edits: &[LineEdit], new: &[&str], base_offset: usize) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut current: Option<Hunk> = None;
    let mut base_line = base_offset;

    for edit in edits {
        match edit {
            LineEdit::Equal => {
                if let Some(hunk) = current.take() {
                    hunks.push(hunk);
                }
                base_line += 1;
            }
            LineEdit::Delete => {
                let hunk = current.get_or_insert_with(|| Hunk::at(base_line));
                hunk.base_end = base_line + 1;
                base_line += 1;
            }
            LineEdit::Insert(index) => {
                let hunk = current.get_or_insert_with(|| Hunk::at(base_line));
                hunk.lines.push(new[*index].to_string());
            }
        }
    }
    if let Some(hunk) = current {
        hunks.push(hunk);
    }
    hunks
}
