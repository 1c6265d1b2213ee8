//! Co-occurrence correlation between actions across roles.
//!
//! A [`PresenceMatrix`] has one row per role and one column per action; each
//! cell counts the action's occurrences in the role's canonical sequence.
//! Pearson correlation is computed between every pair of distinct columns,
//! treating each role as one sample.
//!
//! A pair involving a zero-variance column is undefined and left out of the
//! [`CorrelationMatrix`] entirely; no NaN ever reaches a consumer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusSequences;

pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.6;

/// Role × action occurrence-count matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMatrix {
    /// Row labels, sorted.
    pub roles: Vec<String>,
    /// Column labels, sorted.
    pub actions: Vec<String>,
    /// `counts[row][col]`.
    pub counts: Vec<Vec<u64>>,
}

impl PresenceMatrix {
    pub fn from_corpus(corpus: &CorpusSequences) -> Self {
        Self::from_sequences(&corpus.action_sequences())
    }

    /// Build from role id → ordered action list.
    pub fn from_sequences(sequences: &BTreeMap<String, Vec<String>>) -> Self {
        let mut actions: Vec<String> = sequences.values().flatten().cloned().collect();
        actions.sort();
        actions.dedup();
        let column: BTreeMap<&str, usize> = actions
            .iter()
            .enumerate()
            .map(|(i, a)| (a.as_str(), i))
            .collect();

        let mut roles = Vec::with_capacity(sequences.len());
        let mut counts = Vec::with_capacity(sequences.len());
        for (role, seq) in sequences {
            let mut row = vec![0u64; actions.len()];
            for action in seq {
                if let Some(&col) = column.get(action.as_str()) {
                    row[col] += 1;
                }
            }
            roles.push(role.clone());
            counts.push(row);
        }

        Self {
            roles,
            actions,
            counts,
        }
    }

    pub fn count(&self, role: &str, action: &str) -> Option<u64> {
        let row = self.roles.iter().position(|r| r == role)?;
        let col = self.actions.iter().position(|a| a == action)?;
        Some(self.counts[row][col])
    }

    fn column(&self, col: usize) -> Vec<f64> {
        self.counts.iter().map(|row| row[col] as f64).collect()
    }
}

/// Pearson correlation coefficient of two equally long samples.
///
/// `None` when fewer than two samples exist or either sample has zero
/// variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    let r = cov / (var_x * var_y).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// An unordered action pair with its correlation; `action_a < action_b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub action_a: String,
    pub action_b: String,
    pub correlation: f64,
}

/// Symmetric action × action correlation values for every defined pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    values: BTreeMap<String, BTreeMap<String, f64>>,
}

impl CorrelationMatrix {
    /// Correlate every pair of distinct columns of `matrix`.
    pub fn compute(matrix: &PresenceMatrix) -> Self {
        let columns: Vec<Vec<f64>> = (0..matrix.actions.len()).map(|c| matrix.column(c)).collect();
        let mut values: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();

        for i in 0..columns.len() {
            for j in (i + 1)..columns.len() {
                let Some(r) = pearson(&columns[i], &columns[j]) else {
                    continue;
                };
                let (a, b) = (&matrix.actions[i], &matrix.actions[j]);
                values.entry(a.clone()).or_default().insert(b.clone(), r);
                values.entry(b.clone()).or_default().insert(a.clone(), r);
            }
        }
        Self { values }
    }

    /// Correlation of `a` and `b`; `None` for self-pairs and undefined pairs.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.values.get(a)?.get(b).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every defined unordered pair, sorted by `(action_a, action_b)`.
    pub fn pairs(&self) -> Vec<CorrelationPair> {
        self.values
            .iter()
            .flat_map(|(a, row)| {
                row.iter()
                    .filter(move |(b, _)| a < *b)
                    .map(move |(b, r)| CorrelationPair {
                        action_a: a.clone(),
                        action_b: b.clone(),
                        correlation: *r,
                    })
            })
            .collect()
    }

    /// Pairs with `|correlation| >= threshold`.
    pub fn strong_pairs(&self, threshold: f64) -> Vec<CorrelationPair> {
        self.pairs()
            .into_iter()
            .filter(|p| p.correlation.abs() >= threshold)
            .collect()
    }
}

/// Stage output of the correlation aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub threshold: f64,
    pub presence: PresenceMatrix,
    pub matrix: CorrelationMatrix,
    pub strong: Vec<CorrelationPair>,
}

pub fn aggregate_correlations(corpus: &CorpusSequences, threshold: f64) -> CorrelationReport {
    let presence = PresenceMatrix::from_corpus(corpus);
    let matrix = CorrelationMatrix::compute(&presence);
    let strong = matrix.strong_pairs(threshold);
    CorrelationReport {
        threshold,
        presence,
        matrix,
        strong,
    }
}
