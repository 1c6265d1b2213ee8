//! Raw document → typed [`RoleDocument`] conversion.
//!
//! A raw corpus document is a sequence of revision records:
//!
//! ```yaml
//! - role_id: geerlingguy.docker
//!   role_rev: HEAD
//!   role_root:
//!     task_files:
//!       - file_name: main.yml
//!         content:
//!           - block:
//!               - action: apt
//!                 when: ansible_os_family == 'Debian'
//!                 loop: "{{ packages }}"
//!                 args: { name: docker }
//! ```
//!
//! Shape problems are collected as [`MalformedDocument`] records instead of
//! aborting: a bad revision entry is dropped, a bad nested node is skipped,
//! and only a document that is not a sequence at all is rejected outright.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::domain::{Block, Guard, MalformedDocument, RoleDocument, RoleRevision, Task, TaskFile};

/// A parsed document plus the non-fatal shape problems found inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub document: RoleDocument,
    pub malformed: Vec<MalformedDocument>,
}

/// Parse one raw document.
///
/// `origin` labels diagnostics; its file stem is the fallback role id when no
/// revision entry carries a `role_id`.
pub fn parse_document(raw: &Value, origin: &str) -> Result<ParsedDocument, MalformedDocument> {
    let entries = raw.as_array().ok_or_else(|| {
        MalformedDocument::document(
            origin,
            format!("expected a sequence of revisions, found {}", kind(raw)),
        )
    })?;

    let mut malformed = Vec::new();
    let mut role_id: Option<String> = None;
    let mut revisions = Vec::new();

    for (idx, entry) in entries.iter().enumerate() {
        let Some(record) = entry.as_object() else {
            malformed.push(MalformedDocument::entry(
                origin,
                idx,
                format!("revision entry is not a mapping ({})", kind(entry)),
            ));
            continue;
        };

        let Some(label) = record.get("role_rev").and_then(scalar_string) else {
            malformed.push(MalformedDocument::entry(origin, idx, "revision entry lacks role_rev"));
            continue;
        };

        if role_id.is_none() {
            role_id = record
                .get("role_id")
                .and_then(scalar_string)
                .filter(|id| !id.is_empty());
        }

        let mut notes = Vec::new();
        let revision = parse_revision(label, record, &mut notes);
        malformed.extend(
            notes
                .into_iter()
                .map(|reason| MalformedDocument::entry(origin, idx, reason)),
        );
        revisions.push(revision);
    }

    let role_id = role_id
        .or_else(|| file_stem(origin))
        .ok_or_else(|| MalformedDocument::document(origin, "no role_id could be resolved"))?;

    Ok(ParsedDocument {
        document: RoleDocument { role_id, revisions },
        malformed,
    })
}

fn parse_revision(
    label: String,
    record: &Map<String, Value>,
    notes: &mut Vec<String>,
) -> RoleRevision {
    let task_files = record
        .get("role_root")
        .and_then(|root| root.get("task_files"))
        .map(|files| sequence(files, "task_files", notes))
        .unwrap_or_default();

    let task_files = task_files
        .iter()
        .enumerate()
        .filter_map(|(f_idx, file)| {
            let Some(file) = file.as_object() else {
                notes.push(format!("task_files[{}] is not a mapping", f_idx));
                return None;
            };
            Some(parse_task_file(f_idx, file, notes))
        })
        .collect();

    RoleRevision {
        revision_label: label,
        task_files,
    }
}

fn parse_task_file(f_idx: usize, file: &Map<String, Value>, notes: &mut Vec<String>) -> TaskFile {
    let path = format!("task_files[{}].content", f_idx);
    let content = file
        .get("content")
        .map(|c| sequence(c, &path, notes))
        .unwrap_or_default();

    let tasks = content
        .iter()
        .enumerate()
        .filter_map(|(t_idx, task)| {
            let Some(task) = task.as_object() else {
                notes.push(format!("{}[{}] is not a mapping", path, t_idx));
                return None;
            };
            let block_path = format!("{}[{}].block", path, t_idx);
            let blocks = task
                .get("block")
                .map(|b| sequence(b, &block_path, notes))
                .unwrap_or_default()
                .iter()
                .enumerate()
                .filter_map(|(b_idx, block)| match block.as_object() {
                    Some(block) => Some(parse_block(block)),
                    None => {
                        notes.push(format!("{}[{}] is not a mapping", block_path, b_idx));
                        None
                    }
                })
                .collect();
            Some(Task { blocks })
        })
        .collect();

    TaskFile {
        file_name: file.get("file_name").and_then(scalar_string),
        tasks,
    }
}

/// Parse a single block record.
pub fn parse_block(block: &Map<String, Value>) -> Block {
    let action = block
        .get("action")
        .and_then(Value::as_str)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    let guard = match block.get("when") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Guard::new(items.iter().filter_map(scalar_string)),
        Some(other) => scalar_string(other).map(Guard::single),
    };

    let has_loop = block.get("loop").is_some_and(|l| !l.is_null());

    let arguments: BTreeMap<String, Value> = match block.get("args") {
        Some(Value::Object(args)) => args.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => BTreeMap::new(),
    };

    Block {
        action,
        guard,
        has_loop,
        arguments,
    }
}

fn sequence<'a>(value: &'a Value, path: &str, notes: &mut Vec<String>) -> Vec<&'a Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => {
            notes.push(format!("{} is not a sequence ({})", path, kind(other)));
            Vec::new()
        }
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn file_stem(origin: &str) -> Option<String> {
    std::path::Path::new(origin)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
