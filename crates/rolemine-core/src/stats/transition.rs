//! First-order action → action transition statistics.
//!
//! Each role's canonical action sequence is treated as an empirical Markov
//! chain. Consecutive pairs are counted into one global matrix (sequences
//! never bridge two roles), then each row is normalized to probabilities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusSequences;

pub const DEFAULT_TRANSITION_THRESHOLD: f64 = 0.05;

/// A directed transition with its row-normalized probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionPair {
    pub from: String,
    pub to: String,
    pub probability: f64,
}

/// Global transition counts and their row-normalized probabilities.
///
/// # Invariants
///
/// A row exists in `probabilities` only when its count total is positive,
/// and every materialized row sums to 1.0 within floating-point tolerance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    pub counts: BTreeMap<String, BTreeMap<String, u64>>,
    pub probabilities: BTreeMap<String, BTreeMap<String, f64>>,
}

impl TransitionMatrix {
    /// Count transitions over every sequence yielded by `sequences`.
    pub fn from_sequences<'a, I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = &'a [S]>,
        S: AsRef<str> + 'a,
    {
        let mut counts: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for seq in sequences {
            for pair in seq.windows(2) {
                *counts
                    .entry(pair[0].as_ref().to_string())
                    .or_default()
                    .entry(pair[1].as_ref().to_string())
                    .or_default() += 1;
            }
        }

        let probabilities = counts
            .iter()
            .filter_map(|(from, row)| {
                let total: u64 = row.values().sum();
                if total == 0 {
                    return None;
                }
                let normalized = row
                    .iter()
                    .map(|(to, c)| (to.clone(), *c as f64 / total as f64))
                    .collect();
                Some((from.clone(), normalized))
            })
            .collect();

        Self {
            counts,
            probabilities,
        }
    }

    pub fn from_corpus(corpus: &CorpusSequences) -> Self {
        let sequences: Vec<Vec<&str>> = corpus.roles.values().map(|r| r.actions()).collect();
        Self::from_sequences(sequences.iter().map(Vec::as_slice))
    }

    pub fn count(&self, from: &str, to: &str) -> u64 {
        self.counts
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(0)
    }

    pub fn probability(&self, from: &str, to: &str) -> Option<f64> {
        self.probabilities.get(from)?.get(to).copied()
    }

    /// Directed pairs with `probability >= threshold`, ordered by `(from, to)`.
    pub fn strong_transitions(&self, threshold: f64) -> Vec<TransitionPair> {
        self.probabilities
            .iter()
            .flat_map(|(from, row)| {
                row.iter().map(move |(to, p)| TransitionPair {
                    from: from.clone(),
                    to: to.clone(),
                    probability: *p,
                })
            })
            .filter(|t| t.probability >= threshold)
            .collect()
    }
}

/// Stage output of the transition aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionReport {
    pub threshold: f64,
    pub matrix: TransitionMatrix,
    pub strong: Vec<TransitionPair>,
}

pub fn aggregate_transitions(corpus: &CorpusSequences, threshold: f64) -> TransitionReport {
    let matrix = TransitionMatrix::from_corpus(corpus);
    let strong = matrix.strong_transitions(threshold);
    TransitionReport {
        threshold,
        matrix,
        strong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abababc_scenario() {
        let seq = ["a", "b", "a", "b", "a", "c"];
        let m = TransitionMatrix::from_sequences([&seq[..]]);
        assert_eq!(m.count("a", "b"), 2);
        assert_eq!(m.count("b", "a"), 2);
        assert_eq!(m.count("a", "c"), 1);
        assert_eq!(m.count("c", "a"), 0);

        let p_ab = m.probability("a", "b").unwrap();
        let p_ac = m.probability("a", "c").unwrap();
        assert!((p_ab - 2.0 / 3.0).abs() < 1e-9);
        assert!((p_ac - 1.0 / 3.0).abs() < 1e-9);
        assert!(m.probabilities.get("c").is_none(), "terminal action has no row");
    }

    #[test]
    fn test_rows_sum_to_one() {
        let s1 = ["x", "y", "x", "z", "z", "y"];
        let s2 = ["y", "x", "x"];
        let m = TransitionMatrix::from_sequences([&s1[..], &s2[..]]);
        for row in m.probabilities.values() {
            let sum: f64 = row.values().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_self_transitions_are_counted() {
        let seq = ["copy", "copy", "copy"];
        let m = TransitionMatrix::from_sequences([&seq[..]]);
        assert_eq!(m.count("copy", "copy"), 2);
        assert_eq!(m.probability("copy", "copy"), Some(1.0));
        assert_eq!(m.strong_transitions(DEFAULT_TRANSITION_THRESHOLD).len(), 1);
    }

    #[test]
    fn test_sequences_do_not_bridge_roles() {
        let s1 = ["a"];
        let s2 = ["b"];
        let m = TransitionMatrix::from_sequences([&s1[..], &s2[..]]);
        assert!(m.counts.is_empty());
        assert!(m.strong_transitions(0.0).is_empty());
    }

    #[test]
    fn test_strong_transitions_respects_threshold() {
        let seq = ["a", "b", "a", "b", "a", "c"];
        let m = TransitionMatrix::from_sequences([&seq[..]]);
        let strong: Vec<(String, String)> = m
            .strong_transitions(0.5)
            .into_iter()
            .map(|t| (t.from, t.to))
            .collect();
        assert_eq!(
            strong,
            vec![("a".to_string(), "b".to_string()), ("b".to_string(), "a".to_string())]
        );
    }
}
