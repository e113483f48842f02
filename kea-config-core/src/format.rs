//! Plain-text rendering of diff entries.

use crate::diff::result::DiffEntry;

/// One line per entry, prefixed `=`, `~`, `-`, `+` or `!`. Modified values
/// show the live side first.
pub fn format_text(entries: &[DiffEntry]) -> String {
    let mut lines = Vec::with_capacity(entries.len() + 1);
    for entry in entries {
        match entry {
            DiffEntry::Identical { path } => lines.push(format!("= {path}")),
            DiffEntry::Modified { path, left, right } => {
                lines.push(format!("~ {path}"));
                lines.push(format!("  live:    {left}"));
                lines.push(format!("  desired: {right}"));
            }
            DiffEntry::OnlyLeft { path, value } => lines.push(format!("- {path} {value}")),
            DiffEntry::OnlyRight { path, value } => lines.push(format!("+ {path} {value}")),
            DiffEntry::Structural { path, description } => {
                lines.push(format!("! {path}: {description}"));
            }
        }
    }
    lines.join("\n")
}
