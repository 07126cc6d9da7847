//! Differences between two values documents
//!
//! Used to preview what an edit changes in the persisted overrides before
//! the upgrade runs.

use reledit_core::{Values, render_document, values_equal};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use similar::{ChangeTag, TextDiff};

use crate::error::Result;

/// Structured and textual difference between two values documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuesDiff {
    /// Changed key paths, in key order
    pub changes: Vec<ValueChange>,

    /// Line diff of the two YAML renderings
    pub content: DiffContent,
}

impl ValuesDiff {
    /// Compare `old` and `new`
    pub fn between(old: &Values, new: &Values) -> Result<Self> {
        let mut changes = Vec::new();
        collect_changes("", old.inner(), new.inner(), &mut changes);

        let old_text = render_document(old)?;
        let new_text = render_document(new)?;

        Ok(Self {
            changes,
            content: DiffContent::between(&old_text, &new_text),
        })
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Get changes by type
    pub fn changes_by_type(&self, change_type: ChangeType) -> Vec<&ValueChange> {
        self.changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .collect()
    }

    /// Generate a human-readable summary
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        for change_type in [ChangeType::Added, ChangeType::Modified, ChangeType::Removed] {
            let count = self.changes_by_type(change_type).len();
            if count > 0 {
                parts.push(format!("{} {}", count, change_type));
            }
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn collect_changes(prefix: &str, old: &JsonValue, new: &JsonValue, out: &mut Vec<ValueChange>) {
    match (old, new) {
        (JsonValue::Object(old_map), JsonValue::Object(new_map)) => {
            collect_map_changes(prefix, old_map, new_map, out);
        }
        _ if values_equal(old, new) => {}
        _ => out.push(ValueChange {
            path: prefix.to_string(),
            change_type: ChangeType::Modified,
        }),
    }
}

fn collect_map_changes(
    prefix: &str,
    old: &Map<String, JsonValue>,
    new: &Map<String, JsonValue>,
    out: &mut Vec<ValueChange>,
) {
    let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    keys.sort();
    keys.dedup();

    for key in keys {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match (old.get(key), new.get(key)) {
            (Some(o), Some(n)) => collect_changes(&path, o, n, out),
            (None, Some(_)) => out.push(ValueChange {
                path,
                change_type: ChangeType::Added,
            }),
            (Some(_), None) => out.push(ValueChange {
                path,
                change_type: ChangeType::Removed,
            }),
            (None, None) => {}
        }
    }
}

/// A change at a single key path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange {
    /// Dot-separated key path (empty for the document root)
    pub path: String,

    /// Type of change
    pub change_type: ChangeType,
}

/// Type of value change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Key was added
    Added,

    /// Value was modified
    Modified,

    /// Key was removed
    Removed,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Removed => write!(f, "removed"),
        }
    }
}

/// Detailed diff content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffContent {
    /// Lines of the diff
    pub lines: Vec<DiffLine>,
}

impl DiffContent {
    /// Line diff of two texts
    pub fn between(old: &str, new: &str) -> Self {
        let diff = TextDiff::from_lines(old, new);
        let lines = diff
            .iter_all_changes()
            .map(|change| DiffLine {
                line_type: match change.tag() {
                    ChangeTag::Delete => LineType::Removed,
                    ChangeTag::Insert => LineType::Added,
                    ChangeTag::Equal => LineType::Context,
                },
                content: change.value().trim_end().to_string(),
                old_line_no: change.old_index(),
                new_line_no: change.new_index(),
            })
            .collect();

        Self { lines }
    }

    /// Generate a unified diff string
    pub fn to_unified_diff(&self) -> String {
        let mut output = String::new();

        for line in &self.lines {
            let prefix = match line.line_type {
                LineType::Added => "+",
                LineType::Removed => "-",
                LineType::Context => " ",
            };
            output.push_str(prefix);
            output.push_str(&line.content);
            output.push('\n');
        }

        output
    }
}

/// A single line in a diff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    /// Type of line
    pub line_type: LineType,

    /// Content of the line
    pub content: String,

    /// Line number in old version
    pub old_line_no: Option<usize>,

    /// Line number in new version
    pub new_line_no: Option<usize>,
}

/// Type of diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    /// Line was added
    Added,

    /// Line was removed
    Removed,

    /// Unchanged context line
    Context,
}
