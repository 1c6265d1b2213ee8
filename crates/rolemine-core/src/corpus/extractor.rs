//! Action sequence extraction.
//!
//! [`extract`] flattens one revision depth-first (task file → task → block)
//! into [`ActionOccurrence`]s. [`extract_corpus`] applies the revision
//! selector to every document and collects the canonical sequences into a
//! [`CorpusSequences`] snapshot that every aggregator reads.
//!
//! Visit order is the only source of sequence order used by the transition
//! statistics, so it must stay stable.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::corpus::selector::select;
use crate::domain::{ActionOccurrence, RoleDocument, RoleRevision, HEAD_REVISION};

/// Flatten `revision` into its ordered action occurrences.
pub fn extract(role_id: &str, revision: &RoleRevision) -> Vec<ActionOccurrence> {
    revision
        .task_files
        .iter()
        .flat_map(|file| file.tasks.iter())
        .flat_map(|task| task.blocks.iter())
        .filter_map(|block| ActionOccurrence::from_block(role_id, block))
        .collect()
}

/// The canonical action sequence of a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSequence {
    pub role_id: String,
    /// Label of the revision the sequence was drawn from.
    pub revision_label: String,
    pub occurrences: Vec<ActionOccurrence>,
}

impl RoleSequence {
    /// `true` when the sequence comes from an explicitly labelled `HEAD`
    /// revision rather than the document-order fallback.
    pub fn is_head(&self) -> bool {
        self.revision_label == HEAD_REVISION
    }

    pub fn actions(&self) -> Vec<&str> {
        self.occurrences.iter().map(|o| o.action.as_str()).collect()
    }
}

/// Frozen extractor output for a whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSequences {
    /// Canonical sequence per role, keyed (and therefore ordered) by role id.
    pub roles: BTreeMap<String, RoleSequence>,
    /// Role ids seen more than once; only the first document was kept.
    pub duplicate_roles: Vec<String>,
    /// Roles whose document carried no revision at all.
    pub empty_roles: Vec<String>,
}

impl CorpusSequences {
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    pub fn occurrence_count(&self) -> usize {
        self.roles.values().map(|r| r.occurrences.len()).sum()
    }

    /// All canonical occurrences, roles in id order.
    pub fn canonical_occurrences(&self) -> impl Iterator<Item = &ActionOccurrence> {
        self.roles.values().flat_map(|r| r.occurrences.iter())
    }

    /// Occurrences drawn only from revisions labelled exactly `HEAD`.
    pub fn head_occurrences(&self) -> impl Iterator<Item = &ActionOccurrence> {
        self.roles
            .values()
            .filter(|r| r.is_head())
            .flat_map(|r| r.occurrences.iter())
    }

    /// Role id → ordered action list.
    pub fn action_sequences(&self) -> BTreeMap<String, Vec<String>> {
        self.roles
            .iter()
            .map(|(id, seq)| {
                (
                    id.clone(),
                    seq.occurrences.iter().map(|o| o.action.clone()).collect(),
                )
            })
            .collect()
    }

    /// Hex SHA-256 over every role id and its ordered actions.
    ///
    /// Two runs over the same documents produce the same digest.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (role_id, seq) in &self.roles {
            hasher.update(role_id.as_bytes());
            hasher.update(b"\0");
            hasher.update(seq.revision_label.as_bytes());
            hasher.update(b"\0");
            for occ in &seq.occurrences {
                hasher.update(occ.action.as_bytes());
                hasher.update(b"\x1f");
            }
            hasher.update(b"\x1e");
        }
        hex::encode(hasher.finalize())
    }
}

/// Select and extract the canonical revision of every document.
pub fn extract_corpus(documents: &[RoleDocument]) -> CorpusSequences {
    let mut corpus = CorpusSequences::default();
    // empty documents claim their id too
    let mut seen = BTreeSet::new();

    for document in documents {
        if !seen.insert(document.role_id.as_str()) {
            warn!(
                event = "corpus.duplicate_role",
                role_id = %document.role_id,
                "duplicate role id; keeping the first document"
            );
            corpus.duplicate_roles.push(document.role_id.clone());
            continue;
        }

        let Some(revision) = select(document) else {
            debug!(role_id = %document.role_id, "role has no revisions, skipping");
            corpus.empty_roles.push(document.role_id.clone());
            continue;
        };

        let occurrences = extract(&document.role_id, revision);
        debug!(
            role_id = %document.role_id,
            revision = %revision.revision_label,
            actions = occurrences.len(),
            "extracted role"
        );
        corpus.roles.insert(
            document.role_id.clone(),
            RoleSequence {
                role_id: document.role_id.clone(),
                revision_label: revision.revision_label.clone(),
                occurrences,
            },
        );
    }

    corpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Block, Guard, Task, TaskFile};

    fn revision(label: &str, files: Vec<Vec<Vec<Block>>>) -> RoleRevision {
        files.into_iter().fold(RoleRevision::new(label), |rev, tasks| {
            rev.with_task_file(TaskFile::new(tasks.into_iter().map(Task::new).collect()))
        })
    }

    #[test]
    fn test_extract_visits_depth_first() {
        let rev = revision(
            "HEAD",
            vec![
                vec![
                    vec![Block::action("a"), Block::default(), Block::action("b")],
                    vec![Block::action("c")],
                ],
                vec![vec![Block::action("d")]],
            ],
        );
        let actions: Vec<String> = extract("r", &rev).into_iter().map(|o| o.action).collect();
        assert_eq!(actions, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_extract_corpus_uses_canonical_revision() {
        let doc = RoleDocument::new("r1")
            .with_revision(revision("old", vec![vec![vec![Block::action("old")]]]))
            .with_revision(revision("HEAD", vec![vec![vec![Block::action("new")]]]))
            .with_revision(revision("later", vec![vec![vec![Block::action("later")]]]));
        let corpus = extract_corpus(&[doc]);
        assert_eq!(corpus.roles["r1"].actions(), vec!["new"]);
        assert!(corpus.roles["r1"].is_head());
    }

    fn head_doc(id: &str, action: &str) -> RoleDocument {
        let blocks = vec![vec![vec![Block::action(action)]]];
        RoleDocument::new(id).with_revision(revision("HEAD", blocks))
    }

    #[test]
    fn test_extract_corpus_records_empty_and_duplicate_roles() {
        let docs = vec![
            head_doc("dup", "x"),
            RoleDocument::new("empty"),
            head_doc("dup", "y"),
        ];
        let corpus = extract_corpus(&docs);
        assert_eq!(corpus.role_count(), 1);
        assert_eq!(corpus.roles["dup"].actions(), vec!["x"]);
        assert_eq!(corpus.empty_roles, vec!["empty"]);
        assert_eq!(corpus.duplicate_roles, vec!["dup"]);
    }

    #[test]
    fn test_empty_first_document_still_wins_over_later_duplicate() {
        let docs = vec![RoleDocument::new("x"), head_doc("x", "copy")];
        let corpus = extract_corpus(&docs);
        assert!(corpus.roles.is_empty());
        assert_eq!(corpus.empty_roles, vec!["x"]);
        assert_eq!(corpus.duplicate_roles, vec!["x"]);
    }

    #[test]
    fn test_head_occurrences_exclude_fallback_revisions() {
        let docs = vec![
            head_doc("a", "x"),
            RoleDocument::new("b")
                .with_revision(revision("abc", vec![vec![vec![Block::action("y")]]])),
        ];
        let corpus = extract_corpus(&docs);
        let head: Vec<&str> = corpus.head_occurrences().map(|o| o.action.as_str()).collect();
        assert_eq!(head, vec!["x"]);
        assert_eq!(corpus.canonical_occurrences().count(), 2);
    }

    #[test]
    fn test_digest_is_stable_and_order_sensitive() {
        let seq = |actions: &[&str]| {
            let blocks = actions
                .iter()
                .map(|a| Block::action(*a).with_guard(Guard::single("c")))
                .collect();
            vec![RoleDocument::new("r").with_revision(revision("HEAD", vec![vec![blocks]]))]
        };
        let a = extract_corpus(&seq(&["x", "y"]));
        let b = extract_corpus(&seq(&["x", "y"]));
        let c = extract_corpus(&seq(&["y", "x"]));
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
    }
}
