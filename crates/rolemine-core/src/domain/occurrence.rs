//! Derived, per-block action records produced by the extractor.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::role::{Block, Guard};

/// One invocation of an action inside a role's selected revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOccurrence {
    pub role_id: String,
    pub action: String,
    pub guard: Option<Guard>,
    pub has_loop: bool,
    /// Argument names only; values are dropped at extraction time.
    pub argument_keys: BTreeSet<String>,
}

impl ActionOccurrence {
    /// Build an occurrence from a block, or `None` when the block has no
    /// action.
    pub fn from_block(role_id: &str, block: &Block) -> Option<Self> {
        let action = block.action.as_ref()?;
        Some(Self {
            role_id: role_id.to_string(),
            action: action.clone(),
            guard: block.guard.clone(),
            has_loop: block.has_loop,
            argument_keys: block.arguments.keys().cloned().collect(),
        })
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}
