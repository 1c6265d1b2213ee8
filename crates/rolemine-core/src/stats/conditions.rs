//! Guard-condition vocabularies and clause statistics.
//!
//! Like argument vocabularies, conditions are mined only from revisions
//! labelled `HEAD`. Each distinct condition is split into AND / OR clauses
//! with [`split_condition`] to count clause usage and clause co-occurrence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::ActionOccurrence;

/// AND / OR clauses of one guard expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionClauses {
    pub and: Vec<String>,
    pub or: Vec<String>,
}

struct Patterns {
    and_group: Regex,
    or_group: Regex,
    and_sep: Regex,
    or_sep: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            and_group: Regex::new(r"^(.*?)\s+and\s+\((.*?)\)$")?,
            or_group: Regex::new(r"^(.*?)\s+or\s+\((.*?)\)$")?,
            and_sep: Regex::new(r"\s+and\s+")?,
            or_sep: Regex::new(r"\s+or\s+")?,
        })
    }
}

fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns::compile().ok()).as_ref()
}

fn split_trimmed(re: &Regex, text: &str) -> Vec<String> {
    re.split(text).map(|c| c.trim().to_string()).collect()
}

/// Split a guard expression into AND and OR clauses.
///
/// The expression is lower-cased and trimmed first.
/// - `A and (B or C)` ⇒ and = `[A, "(b or c)"]`, or = `[B, C]`
/// - `A or (B and C)` ⇒ or = `[A, "(b and c)"]`, and = `[B, C]`
/// - otherwise the expression is split on `and`; parts containing ` or `
///   are split again into the OR list, the rest are AND clauses.
pub fn split_condition(condition: &str) -> ConditionClauses {
    let condition = condition.trim().to_lowercase();
    let mut clauses = ConditionClauses::default();

    let Some(p) = patterns() else {
        clauses.and.push(condition);
        return clauses;
    };

    if let Some(caps) = p.and_group.captures(&condition) {
        let first = caps[1].trim().to_string();
        let grouped = caps[2].trim();
        clauses.and.push(first);
        clauses.and.push(format!("({})", grouped));
        clauses.or = split_trimmed(&p.or_sep, grouped);
        return clauses;
    }

    if let Some(caps) = p.or_group.captures(&condition) {
        let first = caps[1].trim().to_string();
        let grouped = caps[2].trim();
        clauses.or.push(first);
        clauses.or.push(format!("({})", grouped));
        clauses.and = split_trimmed(&p.and_sep, grouped);
        return clauses;
    }

    for part in split_trimmed(&p.and_sep, &condition) {
        if part.contains(" or ") {
            clauses.or.extend(split_trimmed(&p.or_sep, &part));
        } else {
            clauses.and.push(part);
        }
    }
    clauses
}

/// Result of [`aggregate_conditions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionReport {
    /// Action → sorted distinct guard conditions.
    pub conditions: BTreeMap<String, Vec<String>>,
    /// Clause → number of distinct conditions (per action) it appears in.
    pub clause_usage: BTreeMap<String, u64>,
    /// Clause → clause → times both appeared as AND clauses of one condition.
    pub and_pairs: BTreeMap<String, BTreeMap<String, u64>>,
    /// Clause → clause → times both appeared among one action's OR clauses.
    pub or_pairs: BTreeMap<String, BTreeMap<String, u64>>,
}

impl ConditionReport {
    /// Action → number of distinct conditions guarding it.
    pub fn conditioned_actions(&self) -> BTreeMap<String, u64> {
        self.conditions
            .iter()
            .map(|(a, c)| (a.clone(), c.len() as u64))
            .collect()
    }
}

fn count_pairs(clauses: &[String], into: &mut BTreeMap<String, BTreeMap<String, u64>>) {
    for (i, a) in clauses.iter().enumerate() {
        for (j, b) in clauses.iter().enumerate() {
            if i != j && a != b {
                *into.entry(a.clone()).or_default().entry(b.clone()).or_default() += 1;
            }
        }
    }
}

pub fn aggregate_conditions<'a>(
    occurrences: impl IntoIterator<Item = &'a ActionOccurrence>,
) -> ConditionReport {
    let mut vocab: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for occ in occurrences {
        if let Some(guard) = &occ.guard {
            vocab
                .entry(occ.action.clone())
                .or_default()
                .extend(guard.conditions().iter().cloned());
        }
    }

    let mut report = ConditionReport::default();
    for (action, conditions) in vocab {
        let mut action_or = Vec::new();
        for condition in &conditions {
            let clauses = split_condition(condition);
            for clause in clauses.and.iter().chain(&clauses.or) {
                *report.clause_usage.entry(clause.clone()).or_default() += 1;
            }
            count_pairs(&clauses.and, &mut report.and_pairs);
            action_or.extend(clauses.or);
        }
        count_pairs(&action_or, &mut report.or_pairs);
        report
            .conditions
            .insert(action, conditions.into_iter().collect());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Block, Guard};

    #[test]
    fn test_split_and_with_grouped_or() {
        let c = split_condition("A is defined and (b == 1 or c == 2)");
        assert_eq!(c.and, vec!["a is defined", "(b == 1 or c == 2)"]);
        assert_eq!(c.or, vec!["b == 1", "c == 2"]);
    }

    #[test]
    fn test_split_or_with_grouped_and() {
        let c = split_condition("x or (y and z)");
        assert_eq!(c.or, vec!["x", "(y and z)"]);
        assert_eq!(c.and, vec!["y", "z"]);
    }

    #[test]
    fn test_split_flat_expression() {
        let c = split_condition("  a and b or c and d ");
        assert_eq!(c.and, vec!["a", "d"]);
        assert_eq!(c.or, vec!["b", "c"]);
    }

    #[test]
    fn test_aggregate_conditions_dedups_and_counts() {
        let occ = |action: &str, guard: Guard| {
            ActionOccurrence::from_block("r", &Block::action(action).with_guard(guard)).unwrap()
        };
        let occurrences = vec![
            occ("apt", Guard::single("a and b")),
            occ("apt", Guard::single("a and b")),
            occ("apt", Guard::new(["c or d"]).unwrap()),
            ActionOccurrence::from_block("r", &Block::action("copy")).unwrap(),
        ];
        let report = aggregate_conditions(&occurrences);

        assert_eq!(report.conditions["apt"], vec!["a and b", "c or d"]);
        assert!(!report.conditions.contains_key("copy"));
        assert_eq!(report.clause_usage["a"], 1);
        assert_eq!(report.and_pairs["a"]["b"], 1);
        assert_eq!(report.and_pairs["b"]["a"], 1);
        assert_eq!(report.or_pairs["c"]["d"], 1);
        assert_eq!(report.conditioned_actions()["apt"], 2);
    }

    #[test]
    fn test_or_pairs_pool_clauses_across_an_actions_conditions() {
        let occ = |action: &str, condition: &str| {
            let block = Block::action(action).with_guard(Guard::single(condition));
            ActionOccurrence::from_block("r", &block).unwrap()
        };
        let occurrences = vec![
            occ("apt", "a or b"),
            occ("apt", "c or d"),
            occ("copy", "e or f"),
        ];
        let report = aggregate_conditions(&occurrences);

        // a and c never share a condition but both guard apt
        assert_eq!(report.or_pairs["a"]["c"], 1);
        assert_eq!(report.or_pairs["a"]["b"], 1);
        // pooling stops at the action boundary
        assert!(!report.or_pairs["a"].contains_key("e"));
        assert!(report.and_pairs.is_empty());
    }
}
