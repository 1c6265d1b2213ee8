//! Typed in-memory model of a role document.
//!
//! A [`RoleDocument`] owns an ordered list of [`RoleRevision`]s; each revision
//! holds task files, tasks and blocks in document order. Blocks are parsed
//! once into typed records so consumers never re-check shapes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel revision label marking the current version of a role.
pub const HEAD_REVISION: &str = "HEAD";

/// A named configuration unit with one or more historical revisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDocument {
    pub role_id: String,
    /// Revisions in document order.
    #[serde(default)]
    pub revisions: Vec<RoleRevision>,
}

impl RoleDocument {
    pub fn new(role_id: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            revisions: Vec::new(),
        }
    }

    pub fn with_revision(mut self, revision: RoleRevision) -> Self {
        self.revisions.push(revision);
        self
    }
}

/// One labelled version of a role's task tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRevision {
    /// Content hash or the literal [`HEAD_REVISION`] marker.
    pub revision_label: String,
    #[serde(default)]
    pub task_files: Vec<TaskFile>,
}

impl RoleRevision {
    pub fn new(revision_label: impl Into<String>) -> Self {
        Self {
            revision_label: revision_label.into(),
            task_files: Vec::new(),
        }
    }

    pub fn head() -> Self {
        Self::new(HEAD_REVISION)
    }

    pub fn with_task_file(mut self, task_file: TaskFile) -> Self {
        self.task_files.push(task_file);
        self
    }

    /// `true` when this revision carries the explicit `HEAD` label.
    pub fn is_head(&self) -> bool {
        self.revision_label == HEAD_REVISION
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFile {
    /// Only used in diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskFile {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            file_name: None,
            tasks,
        }
    }

    pub fn named(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Task {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }
}

/// A guard condition attached to a block.
///
/// Both the single-string and the list form normalize to a non-empty ordered
/// list of conditions; use [`Guard::new`] which returns `None` for an empty
/// input so an empty guard can never be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guard(Vec<String>);

impl Guard {
    pub fn new<I, S>(conditions: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let conditions: Vec<String> = conditions.into_iter().map(Into::into).collect();
        if conditions.is_empty() {
            None
        } else {
            Some(Self(conditions))
        }
    }

    pub fn single(condition: impl Into<String>) -> Self {
        Self(vec![condition.into()])
    }

    pub fn conditions(&self) -> &[String] {
        &self.0
    }
}

/// A task block invoking (at most) one named action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Blocks without an action are skipped by every consumer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Guard>,
    #[serde(default)]
    pub has_loop: bool,
    #[serde(default)]
    pub arguments: BTreeMap<String, serde_json::Value>,
}

impl Block {
    pub fn action(name: impl Into<String>) -> Self {
        Self {
            action: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_loop(mut self) -> Self {
        self.has_loop = true;
        self
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_rejects_empty_list() {
        assert!(Guard::new(Vec::<String>::new()).is_none());
        let guard = Guard::new(["a is defined", "b"]).unwrap();
        assert_eq!(guard.conditions(), &["a is defined".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_revision_is_head() {
        assert!(RoleRevision::head().is_head());
        assert!(!RoleRevision::new("3f2a9c1").is_head());
        assert!(!RoleRevision::new("head").is_head());
    }

    #[test]
    fn test_block_builder() {
        let block = Block::action("copy")
            .with_guard(Guard::single("x"))
            .with_loop()
            .with_argument("src", serde_json::json!("a"));
        assert_eq!(block.action.as_deref(), Some("copy"));
        assert!(block.has_loop);
        assert!(block.arguments.contains_key("src"));
    }
}
