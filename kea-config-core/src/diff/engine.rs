use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::diff::result::DiffEntry;

/// Configures tree diff behavior.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Include [`DiffEntry::Identical`] rows.
    pub include_identical: bool,
    /// Maximum recursion depth. `-1` means unlimited.
    pub max_depth: i32,
    /// Optional map from array key -> element field used as key for list-element matching.
    pub key_fields: HashMap<String, String>,
    /// Paths or key names to ignore.
    pub ignore_paths: Vec<String>,
    /// Name of the root path segment.
    pub root: String,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_identical: false,
            max_depth: -1,
            key_fields: HashMap::new(),
            ignore_paths: Vec::new(),
            root: "root".to_string(),
        }
    }
}

/// Diff two JSON trees with default options.
pub fn diff(left: &Value, right: &Value) -> Vec<DiffEntry> {
    diff_with_options(left, right, &DiffOptions::default())
}

/// Diff two JSON trees with custom options.
pub fn diff_with_options(left: &Value, right: &Value, opts: &DiffOptions) -> Vec<DiffEntry> {
    let mut out = Vec::new();
    diff_value(&opts.root, left, right, &opts.root, 0, opts, &mut out);
    out
}

fn diff_value(
    name: &str,
    left: &Value,
    right: &Value,
    path: &str,
    depth: i32,
    opts: &DiffOptions,
    out: &mut Vec<DiffEntry>,
) {
    if should_ignore(path, opts) {
        return;
    }

    if opts.max_depth >= 0 && depth > opts.max_depth {
        return;
    }

    let start_len = out.len();

    match (left, right) {
        (Value::Object(l), Value::Object(r)) => diff_objects(l, r, path, depth, opts, out),
        (Value::Array(l), Value::Array(r)) => {
            let mut ctx = MatchContext {
                parent_path: path,
                depth,
                opts,
                out,
            };
            if let Some(key_field) = opts.key_fields.get(name) {
                match_by_key(key_field, l, r, &mut ctx);
            } else {
                match_by_index(l, r, &mut ctx);
            }
        }
        (l, r) if kind(l) != kind(r) && (is_container(l) || is_container(r)) => {
            out.push(DiffEntry::Structural {
                path: path.to_string(),
                description: format!("type mismatch: left={} right={}", kind(l), kind(r)),
            });
        }
        (l, r) => {
            if l != r {
                out.push(DiffEntry::Modified {
                    path: path.to_string(),
                    left: scalar_signature(l),
                    right: scalar_signature(r),
                });
            }
        }
    }

    if opts.include_identical && out.len() == start_len {
        out.push(DiffEntry::Identical {
            path: path.to_string(),
        });
    }
}

fn diff_objects(
    left: &Map<String, Value>,
    right: &Map<String, Value>,
    path: &str,
    depth: i32,
    opts: &DiffOptions,
    out: &mut Vec<DiffEntry>,
) {
    let mut keys: Vec<&String> = left.keys().collect();
    for key in right.keys() {
        if !left.contains_key(key) {
            keys.push(key);
        }
    }

    for key in keys {
        let child_path = format!("{path}.{key}");
        match (left.get(key), right.get(key)) {
            (Some(l), Some(r)) => diff_value(key, l, r, &child_path, depth + 1, opts, out),
            (Some(l), None) => {
                if !should_ignore(&child_path, opts) {
                    out.push(DiffEntry::OnlyLeft {
                        path: child_path,
                        value: l.clone(),
                    });
                }
            }
            (None, Some(r)) => {
                if !should_ignore(&child_path, opts) {
                    out.push(DiffEntry::OnlyRight {
                        path: child_path,
                        value: r.clone(),
                    });
                }
            }
            (None, None) => {}
        }
    }
}

struct MatchContext<'a, 'b> {
    parent_path: &'a str,
    depth: i32,
    opts: &'a DiffOptions,
    out: &'b mut Vec<DiffEntry>,
}

fn match_by_index(left: &[Value], right: &[Value], ctx: &mut MatchContext<'_, '_>) {
    let max = left.len().max(right.len());
    for i in 0..max {
        let child_path = format!("{}[{}]", ctx.parent_path, i + 1);
        match (left.get(i), right.get(i)) {
            (Some(l), Some(r)) => diff_value("", l, r, &child_path, ctx.depth + 1, ctx.opts, ctx.out),
            (Some(l), None) => ctx.out.push(DiffEntry::OnlyLeft {
                path: child_path,
                value: l.clone(),
            }),
            (None, Some(r)) => ctx.out.push(DiffEntry::OnlyRight {
                path: child_path,
                value: r.clone(),
            }),
            (None, None) => {}
        }
    }
}

fn match_by_key(
    key_field: &str,
    left: &[Value],
    right: &[Value],
    ctx: &mut MatchContext<'_, '_>,
) {
    let right_keys: Vec<Option<String>> = right.iter().map(|v| key_of(v, key_field)).collect();

    let mut used_right = HashSet::new();

    for (left_idx, left_value) in left.iter().enumerate() {
        let left_key = key_of(left_value, key_field);
        let child_path = if let Some(key) = &left_key {
            format!("{}[{key}]", ctx.parent_path)
        } else {
            format!("{}[{}]", ctx.parent_path, left_idx + 1)
        };

        let matched_right = left_key.as_ref().and_then(|left_key_val| {
            right_keys.iter().enumerate().find_map(|(idx, right_key)| {
                if !used_right.contains(&idx) && right_key.as_ref() == Some(left_key_val) {
                    Some(idx)
                } else {
                    None
                }
            })
        });

        // Keyless entries fall back to positional pairing.
        let positional = if left_key.is_none()
            && left_idx < right.len()
            && right_keys[left_idx].is_none()
            && !used_right.contains(&left_idx)
        {
            Some(left_idx)
        } else {
            None
        };

        if let Some(right_idx) = matched_right.or(positional) {
            used_right.insert(right_idx);
            diff_value(
                "",
                left_value,
                &right[right_idx],
                &child_path,
                ctx.depth + 1,
                ctx.opts,
                ctx.out,
            );
        } else {
            ctx.out.push(DiffEntry::OnlyLeft {
                path: child_path,
                value: left_value.clone(),
            });
        }
    }

    for (right_idx, right_value) in right.iter().enumerate() {
        if used_right.contains(&right_idx) {
            continue;
        }
        let child_path = if let Some(key) = &right_keys[right_idx] {
            format!("{}[{key}]", ctx.parent_path)
        } else {
            format!("{}[{}]", ctx.parent_path, right_idx + 1)
        };
        ctx.out.push(DiffEntry::OnlyRight {
            path: child_path,
            value: right_value.clone(),
        });
    }
}

fn key_of(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn should_ignore(path: &str, opts: &DiffOptions) -> bool {
    opts.ignore_paths.iter().any(|ignore| {
        path == ignore
            || path.ends_with(&format!(".{ignore}"))
            || path.contains(&format!(".{ignore}["))
            || path.contains(&format!(".{ignore}."))
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn scalar_signature(value: &Value) -> String {
    value.to_string()
}
