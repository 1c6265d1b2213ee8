//! Per-action argument vocabularies.
//!
//! Vocabularies are mined only from occurrences of revisions labelled exactly
//! `HEAD`; the caller is expected to pass
//! [`CorpusSequences::head_occurrences`](crate::corpus::CorpusSequences::head_occurrences).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::ActionOccurrence;

/// Action → sorted, deduplicated argument names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentReport {
    pub actions: BTreeMap<String, Vec<String>>,
}

impl ArgumentReport {
    pub fn arguments_of(&self, action: &str) -> Option<&[String]> {
        self.actions.get(action).map(Vec::as_slice)
    }

    /// Argument name → number of actions whose vocabulary contains it.
    pub fn argument_frequency(&self) -> BTreeMap<String, u64> {
        let mut freq: BTreeMap<String, u64> = BTreeMap::new();
        for arg in self.actions.values().flatten() {
            *freq.entry(arg.clone()).or_default() += 1;
        }
        freq
    }
}

pub fn aggregate_arguments<'a>(
    occurrences: impl IntoIterator<Item = &'a ActionOccurrence>,
) -> ArgumentReport {
    let mut vocab: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for occ in occurrences {
        vocab
            .entry(occ.action.clone())
            .or_default()
            .extend(occ.argument_keys.iter().cloned());
    }
    ArgumentReport {
        actions: vocab
            .into_iter()
            .map(|(action, keys)| (action, keys.into_iter().collect()))
            .collect(),
    }
}
