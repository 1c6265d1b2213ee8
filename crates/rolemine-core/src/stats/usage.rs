//! Per-action usage, guard and loop statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ActionOccurrence;

/// Usage figures for one action.
///
/// # Invariants
///
/// `total > 0`, `guarded <= total`, `looped <= total`, and both percentages
/// lie in `[0, 100]`. Actions that never occurred are never inserted, so
/// there is no zero-denominator case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionUsage {
    pub total: u64,
    pub guarded: u64,
    pub looped: u64,
    pub guard_percentage: f64,
    pub loop_percentage: f64,
}

/// Result of [`UsageAggregator::finish`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub actions: BTreeMap<String, ActionUsage>,
}

impl UsageReport {
    pub fn get(&self, action: &str) -> Option<&ActionUsage> {
        self.actions.get(action)
    }

    /// Action → total occurrences.
    pub fn totals(&self) -> BTreeMap<String, u64> {
        self.project(|u| u.total)
    }

    /// Action → percentage of occurrences carrying a guard.
    pub fn guard_percentages(&self) -> BTreeMap<String, f64> {
        self.project(|u| u.guard_percentage)
    }

    /// Action → percentage of occurrences carrying a loop directive.
    pub fn loop_percentages(&self) -> BTreeMap<String, f64> {
        self.project(|u| u.loop_percentage)
    }

    fn project<T>(&self, f: impl Fn(&ActionUsage) -> T) -> BTreeMap<String, T> {
        self.actions.iter().map(|(k, u)| (k.clone(), f(u))).collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    total: u64,
    guarded: u64,
    looped: u64,
}

/// Fresh-per-run accumulator for [`UsageReport`].
#[derive(Debug, Default)]
pub struct UsageAggregator {
    counts: BTreeMap<String, Counts>,
}

impl UsageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, occurrence: &ActionOccurrence) {
        let c = self.counts.entry(occurrence.action.clone()).or_default();
        c.total += 1;
        if occurrence.is_guarded() {
            c.guarded += 1;
        }
        if occurrence.has_loop {
            c.looped += 1;
        }
    }

    pub fn extend<'a>(&mut self, occurrences: impl IntoIterator<Item = &'a ActionOccurrence>) {
        for occ in occurrences {
            self.observe(occ);
        }
    }

    pub fn finish(self) -> UsageReport {
        let actions = self
            .counts
            .into_iter()
            .filter(|(_, c)| c.total > 0)
            .map(|(action, c)| {
                let total = c.total as f64;
                let usage = ActionUsage {
                    total: c.total,
                    guarded: c.guarded,
                    looped: c.looped,
                    guard_percentage: 100.0 * c.guarded as f64 / total,
                    loop_percentage: 100.0 * c.looped as f64 / total,
                };
                (action, usage)
            })
            .collect();
        UsageReport { actions }
    }
}

/// Aggregate usage over `occurrences`.
pub fn aggregate_usage<'a>(
    occurrences: impl IntoIterator<Item = &'a ActionOccurrence>,
) -> UsageReport {
    let mut agg = UsageAggregator::new();
    agg.extend(occurrences);
    agg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Block, Guard};

    fn occ(block: Block) -> ActionOccurrence {
        ActionOccurrence::from_block("r", &block).unwrap()
    }

    #[test]
    fn test_copy_copy_template_scenario() {
        let seq = vec![
            occ(Block::action("copy").with_guard(Guard::single("x"))),
            occ(Block::action("copy")),
            occ(Block::action("template").with_loop()),
        ];
        let report = aggregate_usage(&seq);

        let copy = report.get("copy").unwrap();
        assert_eq!(copy.total, 2);
        assert_eq!(copy.guard_percentage, 50.0);
        assert_eq!(copy.loop_percentage, 0.0);

        let template = report.get("template").unwrap();
        assert_eq!(template.total, 1);
        assert_eq!(template.loop_percentage, 100.0);
        assert_eq!(template.guard_percentage, 0.0);
    }

    #[test]
    fn test_empty_input_yields_empty_report() {
        let report = aggregate_usage(std::iter::empty());
        assert!(report.actions.is_empty());
    }

    #[test]
    fn test_percentages_are_bounded() {
        let seq: Vec<ActionOccurrence> = (0..7)
            .map(|i| {
                let mut b = Block::action(if i % 2 == 0 { "a" } else { "b" });
                if i % 3 == 0 {
                    b = b.with_guard(Guard::single("g"));
                }
                if i % 4 == 0 {
                    b = b.with_loop();
                }
                occ(b)
            })
            .collect();
        let report = aggregate_usage(&seq);
        for usage in report.actions.values() {
            assert!(usage.total > 0);
            assert!((0.0..=100.0).contains(&usage.guard_percentage));
            assert!((0.0..=100.0).contains(&usage.loop_percentage));
        }
        assert_eq!(report.totals().values().sum::<u64>(), 7);
    }
}
