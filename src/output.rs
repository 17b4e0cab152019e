//! Output formatting for diff reports.
//!
//! This module renders a [`Diff`] for people (terminal with colors, plain
//! text) or for tools (JSON). Records are printed in diff order, one line per
//! record, with the differing leaves of a modify record indented under it.
//!
//! # Examples
//!
//! ```
//! use mdrepo::{diff, format_diff, load_schema, parse_data, OutputFormat, OutputOptions};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(load_schema(r#"{
//!     "Data": {
//!         "@attr": {"mtype": "container"},
//!         "Value": {"@attr": {"mtype": "leaf", "dtype": "int"}}
//!     }
//! }"#).unwrap());
//! let run = parse_data(&schema, r#"{"Data": {"Value": 42}}"#).unwrap();
//! let edit = parse_data(&schema, r#"{"Data": {"Value": 43}}"#).unwrap();
//! let result = diff(&schema, &run, &edit).unwrap();
//!
//! let output = format_diff(&result, &OutputFormat::Plain, &OutputOptions::default()).unwrap();
//! assert!(output.contains("42"));
//! assert!(output.contains("43"));
//! ```

use crate::diff::{ChangeKind, Diff, DiffRecord, DiffStats, LeafDiff};
use crate::error::OutputError;
use crate::tree::LeafValue;
use colored::*;
use serde::Serialize;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored terminal output with ANSI escape codes
    Terminal,
    /// JSON representation of the diff
    Json,
    /// Plain text, no colors (suitable for logs and piping)
    Plain,
}

/// Options for controlling output formatting.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Print the differing leaves under each modify record
    pub leaf_details: bool,
    /// Maximum length for displayed values (truncate if longer)
    pub max_value_length: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            leaf_details: true,
            max_value_length: 80,
        }
    }
}

/// Formats a diff according to the specified format and options.
///
/// Terminal and plain output print one line per record in diff order:
/// `+ path` for adds, `- path` for deletes and `• path` for modifies, the
/// latter followed by one indented `Leaf: old → new` line per differing leaf
/// unless `options.leaf_details` is off. A blank line and a summary close
/// the report. JSON output carries the same records and statistics.
///
/// # Arguments
///
/// * `diff` - The diff to format
/// * `format` - The output format (Terminal, JSON, or Plain)
/// * `options` - Formatting options
///
/// # Returns
///
/// Returns the formatted string on success, or an OutputError on failure.
///
/// # Errors
///
/// Returns `OutputError::JsonSerializationError` if the JSON report cannot
/// be produced.
pub fn format_diff(
    diff: &Diff<'_>,
    format: &OutputFormat,
    options: &OutputOptions,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Terminal => Ok(format_terminal(diff, options)),
        OutputFormat::Json => format_json(diff),
        OutputFormat::Plain => Ok(format_plain(diff, options)),
    }
}

/// Formats a diff for terminal output with colors.
///
/// Color scheme:
/// - Add: green
/// - Delete: red
/// - Modify: yellow
fn format_terminal(diff: &Diff<'_>, options: &OutputOptions) -> String {
    if diff.is_empty() {
        return "No changes detected.".dimmed().to_string();
    }

    let mut output = String::new();
    for record in &diff.records {
        output.push_str(&format_record_terminal(record, options));
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&format_summary(&diff.stats));
    output
}

fn format_record_terminal(record: &DiffRecord<'_>, options: &OutputOptions) -> String {
    let path = record.path();

    match record.kind {
        ChangeKind::Add => format!("{} {}", "+".bright_green(), path.green()),
        ChangeKind::Delete => format!("{} {}", "-".bright_red(), path.red()),
        ChangeKind::Modify => {
            let mut line = format!("{} {}", "•".bright_yellow(), path.yellow());
            if options.leaf_details {
                for leaf in &record.leaf_diffs {
                    let (old_value, new_value) = leaf_values(leaf, options.max_value_length);
                    line.push_str(&format!(
                        "\n    {}: {} {} {}",
                        leaf.name(),
                        old_value.yellow(),
                        "→".bright_yellow(),
                        new_value.yellow()
                    ));
                }
            }
            line
        }
    }
}

/// Formats a diff for plain text output (no colors).
fn format_plain(diff: &Diff<'_>, options: &OutputOptions) -> String {
    if diff.is_empty() {
        return "No changes detected.".to_string();
    }

    let mut output = String::new();
    for record in &diff.records {
        output.push_str(&format_record_plain(record, options));
        output.push('\n');
    }

    output.push('\n');
    output.push_str(&format_summary(&diff.stats));
    output
}

fn format_record_plain(record: &DiffRecord<'_>, options: &OutputOptions) -> String {
    let path = record.path();

    match record.kind {
        ChangeKind::Add => format!("+ {}", path),
        ChangeKind::Delete => format!("- {}", path),
        ChangeKind::Modify => {
            let mut line = format!("• {}", path);
            if options.leaf_details {
                for leaf in &record.leaf_diffs {
                    let (old_value, new_value) = leaf_values(leaf, options.max_value_length);
                    line.push_str(&format!("\n    {}: {} → {}", leaf.name(), old_value, new_value));
                }
            }
            line
        }
    }
}

fn leaf_values(leaf: &LeafDiff<'_>, max_length: usize) -> (String, String) {
    (
        format_value(leaf.old_value(), max_length),
        format_value(leaf.new_value(), max_length),
    )
}

/// Formats a leaf value for display; an absent leaf shows as `(absent)`.
fn format_value(value: Option<&LeafValue>, max_length: usize) -> String {
    match value {
        Some(value) => value.preview(max_length),
        None => "(absent)".to_string(),
    }
}

/// Formats summary statistics.
fn format_summary(stats: &DiffStats) -> String {
    if stats.is_empty() {
        return "Summary: No changes".to_string();
    }

    let mut parts = Vec::new();
    if stats.added > 0 {
        parts.push(format!("{} added", stats.added));
    }
    if stats.removed > 0 {
        parts.push(format!("{} removed", stats.removed));
    }
    if stats.modified > 0 {
        parts.push(format!("{} modified", stats.modified));
    }

    let mut summary = format!("Summary: {}", parts.join(", "));
    if stats.leaves > 0 {
        let noun = if stats.leaves == 1 { "leaf" } else { "leaves" };
        summary.push_str(&format!(" ({} {})", stats.leaves, noun));
    }
    summary
}

#[derive(Serialize)]
struct JsonReport {
    records: Vec<JsonRecord>,
    stats: JsonStats,
}

#[derive(Serialize)]
struct JsonRecord {
    kind: ChangeKind,
    path: String,
    leaf_diffs: Vec<JsonLeafDiff>,
}

#[derive(Serialize)]
struct JsonLeafDiff {
    leaf: String,
    old_value: Option<serde_json::Value>,
    new_value: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct JsonStats {
    added: usize,
    removed: usize,
    modified: usize,
    leaves: usize,
}

/// Formats a diff as JSON, including the records and statistics.
///
/// Absent leaf values are written as `null`.
fn format_json(diff: &Diff<'_>) -> Result<String, OutputError> {
    let records = diff
        .records
        .iter()
        .map(|record| JsonRecord {
            kind: record.kind,
            path: record.path().to_string(),
            leaf_diffs: record
                .leaf_diffs
                .iter()
                .map(|leaf| JsonLeafDiff {
                    leaf: leaf.name().to_string(),
                    old_value: leaf.old_value().map(leaf_to_json_value),
                    new_value: leaf.new_value().map(leaf_to_json_value),
                })
                .collect(),
        })
        .collect();

    let report = JsonReport {
        records,
        stats: JsonStats {
            added: diff.stats.added,
            removed: diff.stats.removed,
            modified: diff.stats.modified,
            leaves: diff.stats.leaves,
        },
    };

    serde_json::to_string_pretty(&report)
        .map_err(|e| OutputError::JsonSerializationError { source: e })
}

/// Converts a leaf value to a serde_json::Value for the JSON report.
fn leaf_to_json_value(value: &LeafValue) -> serde_json::Value {
    match value {
        LeafValue::Int(v) => serde_json::json!(v),
        LeafValue::Str(s) => serde_json::json!(s),
    }
}
