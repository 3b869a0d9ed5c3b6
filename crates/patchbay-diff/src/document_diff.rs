//! Line-level diff of two pretty-printed documents.
//!
//! Used for human review of queued snapshot changes. Uses the `similar`
//! crate (Myers diff algorithm) to produce hunks with context lines.

use serde_json::Value;
use similar::{ChangeTag, TextDiff};

const CONTEXT_LINES: usize = 3;

/// The result of diffing two documents line by line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentDiff {
    pub hunks: Vec<DiffHunk>,
    /// Total number of lines in the old rendering.
    pub old_lines: usize,
    /// Total number of lines in the new rendering.
    pub new_lines: usize,
}

impl DocumentDiff {
    /// Returns `true` if both renderings are identical.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn additions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| matches!(l, DiffLine::Added(_)))
            .count()
    }

    pub fn deletions(&self) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| matches!(l, DiffLine::Removed(_)))
            .count()
    }

    /// Render in unified format with `@@` hunk headers.
    pub fn to_unified(&self) -> String {
        let mut out = String::new();
        for hunk in &self.hunks {
            out.push_str(&format!(
                "@@ -{},{} +{},{} @@\n",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            ));
            for line in &hunk.lines {
                let (sign, text) = match line {
                    DiffLine::Context(t) => (' ', t),
                    DiffLine::Added(t) => ('+', t),
                    DiffLine::Removed(t) => ('-', t),
                };
                out.push(sign);
                out.push_str(text);
                out.push('\n');
            }
        }
        out
    }
}

/// A contiguous region of changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffHunk {
    /// 1-based start line in the old rendering.
    pub old_start: usize,
    pub old_count: usize,
    /// 1-based start line in the new rendering.
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

/// A single line in a hunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

fn render(doc: Option<&Value>) -> String {
    match doc {
        Some(value) => {
            let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            text.push('\n');
            text
        }
        None => String::new(),
    }
}

/// Diff two documents after pretty-printing them; an absent document
/// renders as empty text.
pub fn diff_documents(old: Option<&Value>, new: Option<&Value>) -> DocumentDiff {
    let old_text = render(old);
    let new_text = render(new);
    let old_lines = old_text.lines().count();
    let new_lines = new_text.lines().count();

    if old_text == new_text {
        return DocumentDiff {
            hunks: Vec::new(),
            old_lines,
            new_lines,
        };
    }

    let text_diff = TextDiff::from_lines(&old_text, &new_text);
    let mut hunks = Vec::new();

    for group in text_diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let new_start = first.new_range().start;
        let old_count = last.old_range().end - old_start;
        let new_count = last.new_range().end - new_start;

        let mut lines = Vec::new();
        for op in &group {
            for change in text_diff.iter_changes(op) {
                let text = change.value().trim_end_matches('\n').to_string();
                lines.push(match change.tag() {
                    ChangeTag::Equal => DiffLine::Context(text),
                    ChangeTag::Delete => DiffLine::Removed(text),
                    ChangeTag::Insert => DiffLine::Added(text),
                });
            }
        }

        hunks.push(DiffHunk {
            old_start: old_start + 1,
            old_count,
            new_start: new_start + 1,
            new_count,
            lines,
        });
    }

    DocumentDiff {
        hunks,
        old_lines,
        new_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_documents_no_hunks() {
        let doc = json!({"hp": 1});
        let diff = diff_documents(Some(&doc), Some(&doc));
        assert!(diff.is_empty());
        assert_eq!(diff.to_unified(), "");
    }

    #[test]
    fn changed_value_is_one_removal_one_addition() {
        let diff = diff_documents(Some(&json!({"hp": 10, "name": "orc"})), Some(&json!({"hp": 20, "name": "orc"})));
        assert_eq!(diff.additions(), 1);
        assert_eq!(diff.deletions(), 1);
        let unified = diff.to_unified();
        assert!(unified.contains("-  \"hp\": 10,"));
        assert!(unified.contains("+  \"hp\": 20,"));
    }

    #[test]
    fn created_document_is_all_additions() {
        let diff = diff_documents(None, Some(&json!({"a": 1})));
        assert_eq!(diff.old_lines, 0);
        assert_eq!(diff.additions(), diff.new_lines);
        assert_eq!(diff.deletions(), 0);
    }

    #[test]
    fn deleted_document_is_all_removals() {
        let diff = diff_documents(Some(&json!([1, 2])), None);
        assert_eq!(diff.deletions(), 4);
        assert_eq!(diff.additions(), 0);
    }
}
