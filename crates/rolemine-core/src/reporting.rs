use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::corpus::{CorpusSequences, LoadedCorpus};
use crate::domain::MalformedDocument;
use crate::options::{MineOptions, RankedList};
use crate::pipeline::builtin::{
    ARGUMENTS, CONDITIONS, CORRELATION, EXTRACT, LOAD, TRANSITIONS, USAGE,
};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::harness::RunOutcome;
use crate::pipeline::result_map::ResultMap;
use crate::pipeline::stage::{FailureCause, StageStatus};
use crate::stats::{
    top_n, ArgumentReport, ConditionReport, CorrelationPair, CorrelationReport, TransitionPair,
    TransitionReport, UsageReport,
};

/// Ranked summary of one mining run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MiningReport {
    pub schema_version: String,
    pub source: String,
    pub corpus_digest: String,
    pub documents: usize,
    pub roles: usize,
    pub occurrences: usize,
    pub duplicate_roles: Vec<String>,
    pub empty_roles: Vec<String>,
    pub malformed: Vec<MalformedDocument>,
    pub most_used: Vec<(String, u64)>,
    pub guard_percentages: Vec<(String, f64)>,
    pub loop_percentages: Vec<(String, f64)>,
    pub conditioned_actions: Vec<(String, u64)>,
    pub argument_frequency: Vec<(String, u64)>,
    /// Strongest correlated pairs by `|r|`.
    pub correlations: Vec<CorrelationPair>,
    /// Most probable transitions.
    pub transitions: Vec<TransitionPair>,
}

pub const REPORT_SCHEMA_VERSION: &str = "1.0";

impl MiningReport {
    /// Rank the outputs of the built-in aggregate stages.
    pub fn from_results(
        results: &ResultMap,
        source: &str,
        options: &MineOptions,
    ) -> PipelineResult<Self> {
        let loaded = results.require::<LoadedCorpus>(LOAD)?;
        let corpus = results.require::<CorpusSequences>(EXTRACT)?;
        let usage = results.require::<UsageReport>(USAGE)?;
        let arguments = results.require::<ArgumentReport>(ARGUMENTS)?;
        let conditions = results.require::<ConditionReport>(CONDITIONS)?;
        let correlation = results.require::<CorrelationReport>(CORRELATION)?;
        let transitions = results.require::<TransitionReport>(TRANSITIONS)?;

        Ok(Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            source: source.to_string(),
            corpus_digest: corpus.digest(),
            documents: loaded.documents.len(),
            roles: corpus.role_count(),
            occurrences: corpus.occurrence_count(),
            duplicate_roles: corpus.duplicate_roles.clone(),
            empty_roles: corpus.empty_roles.clone(),
            malformed: loaded.malformed.clone(),
            most_used: top_n(&usage.totals(), options.limit(RankedList::MostUsed)),
            guard_percentages: top_n(
                &usage.guard_percentages(),
                options.limit(RankedList::GuardPercentage),
            ),
            loop_percentages: top_n(
                &usage.loop_percentages(),
                options.limit(RankedList::LoopPercentage),
            ),
            conditioned_actions: top_n(
                &conditions.conditioned_actions(),
                options.limit(RankedList::ConditionedActions),
            ),
            argument_frequency: top_n(
                &arguments.argument_frequency(),
                options.limit(RankedList::ArgumentFrequency),
            ),
            correlations: strongest_correlations(
                &correlation.strong,
                options.limit(RankedList::Correlations),
            ),
            transitions: likeliest_transitions(
                &transitions.strong,
                options.limit(RankedList::Transitions),
            ),
        })
    }
}

fn strongest_correlations(pairs: &[CorrelationPair], n: usize) -> Vec<CorrelationPair> {
    let scores: BTreeMap<(String, String), f64> = pairs
        .iter()
        .map(|p| ((p.action_a.clone(), p.action_b.clone()), p.correlation.abs()))
        .collect();
    top_n(&scores, n)
        .into_iter()
        .filter_map(|((a, b), _)| {
            pairs
                .iter()
                .find(|p| p.action_a == a && p.action_b == b)
                .cloned()
        })
        .collect()
}

fn likeliest_transitions(pairs: &[TransitionPair], n: usize) -> Vec<TransitionPair> {
    let scores: BTreeMap<(String, String), f64> = pairs
        .iter()
        .map(|t| ((t.from.clone(), t.to.clone()), t.probability))
        .collect();
    top_n(&scores, n)
        .into_iter()
        .map(|((from, to), probability)| TransitionPair {
            from,
            to,
            probability,
        })
        .collect()
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &MiningReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize mining report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render the report as markdown.
pub fn render_report_md(report: &MiningReport) -> String {
    let mut out = String::new();
    out.push_str("# Mining Report\n\n");
    out.push_str("## Corpus\n");
    out.push_str(&format!(
        "- source: {}\n- digest: `{}`\n- documents: {}\n- roles: {}\n- action occurrences: {}\n",
        report.source, report.corpus_digest, report.documents, report.roles, report.occurrences
    ));
    out.push_str(&format!(
        "- duplicate roles: {}\n- roles without revisions: {}\n- malformed: {}\n\n",
        report.duplicate_roles.len(),
        report.empty_roles.len(),
        report.malformed.len()
    ));

    if !report.malformed.is_empty() {
        out.push_str("### Malformed\n");
        for m in &report.malformed {
            out.push_str(&format!("- {}\n", m));
        }
        out.push('\n');
    }

    push_counts(&mut out, "Most Used Actions", &report.most_used);
    push_percentages(&mut out, "Guard Usage", &report.guard_percentages);
    push_percentages(&mut out, "Loop Usage", &report.loop_percentages);
    push_counts(&mut out, "Conditioned Actions", &report.conditioned_actions);
    push_counts(&mut out, "Argument Frequency", &report.argument_frequency);

    if !report.correlations.is_empty() {
        out.push_str("## Correlations\n");
        for p in &report.correlations {
            out.push_str(&format!(
                "- `{}` ~ `{}`: {:.3}\n",
                p.action_a, p.action_b, p.correlation
            ));
        }
        out.push('\n');
    }

    if !report.transitions.is_empty() {
        out.push_str("## Transitions\n");
        for t in &report.transitions {
            out.push_str(&format!("- `{}` → `{}`: {:.3}\n", t.from, t.to, t.probability));
        }
        out.push('\n');
    }
    out
}

fn push_counts(out: &mut String, title: &str, rows: &[(String, u64)]) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("## {}\n", title));
    for (key, count) in rows {
        out.push_str(&format!("- `{}`: {}\n", key, count));
    }
    out.push('\n');
}

fn push_percentages(out: &mut String, title: &str, rows: &[(String, f64)]) {
    if rows.is_empty() {
        return;
    }
    out.push_str(&format!("## {}\n", title));
    for (key, pct) in rows {
        out.push_str(&format!("- `{}`: {:.1}%\n", key, pct));
    }
    out.push('\n');
}

/// Write the markdown rendering of the report.
pub fn write_report_md(path: &Path, report: &MiningReport) -> Result<()> {
    let md = render_report_md(report);
    std::fs::write(path, md).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// Render per-stage results of a pipeline run.
pub fn render_outcome_md(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Pipeline `{}`\n\n", outcome.pipeline));
    out.push_str(&format!(
        "- completed: {} ({} cached)\n- failed: {}\n- skipped: {}\n\n",
        outcome.completed.len(),
        outcome.cached.len(),
        outcome.failed.len(),
        outcome.skipped.len()
    ));
    out.push_str("## Stages\n");
    for name in &outcome.order {
        let state = match outcome.statuses.get(name) {
            Some(StageStatus::Completed { cached: true }) => "cached".to_string(),
            Some(StageStatus::Completed { cached: false }) => "ok".to_string(),
            Some(StageStatus::Failed {
                cause: FailureCause::UpstreamFailed { upstream },
            }) => format!("skipped (upstream `{}` failed)", upstream),
            Some(StageStatus::Failed {
                cause: FailureCause::Error { reason } | FailureCause::ContractViolation { reason },
            }) => format!("failed: {}", reason),
            Some(StageStatus::Pending) | Some(StageStatus::Running) | None => "not run".to_string(),
        };
        match outcome.reports.get(name) {
            Some(line) => out.push_str(&format!("- `{}`: {} ({})\n", name, state, line)),
            None => out.push_str(&format!("- `{}`: {}\n", name, state)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MiningReport {
        MiningReport {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            source: "in-memory".to_string(),
            corpus_digest: "abc".to_string(),
            documents: 1,
            roles: 1,
            occurrences: 3,
            duplicate_roles: vec![],
            empty_roles: vec![],
            malformed: vec![],
            most_used: vec![("copy".to_string(), 2), ("template".to_string(), 1)],
            guard_percentages: vec![("copy".to_string(), 50.0)],
            loop_percentages: vec![],
            conditioned_actions: vec![],
            argument_frequency: vec![],
            correlations: vec![],
            transitions: vec![TransitionPair {
                from: "copy".to_string(),
                to: "template".to_string(),
                probability: 0.5,
            }],
        }
    }

    #[test]
    fn test_report_markdown_render_is_stable() {
        let actual = render_report_md(&sample());
        let expected = concat!(
            "# Mining Report\n",
            "\n",
            "## Corpus\n",
            "- source: in-memory\n",
            "- digest: `abc`\n",
            "- documents: 1\n",
            "- roles: 1\n",
            "- action occurrences: 3\n",
            "- duplicate roles: 0\n",
            "- roles without revisions: 0\n",
            "- malformed: 0\n",
            "\n",
            "## Most Used Actions\n",
            "- `copy`: 2\n",
            "- `template`: 1\n",
            "\n",
            "## Guard Usage\n",
            "- `copy`: 50.0%\n",
            "\n",
            "## Transitions\n",
            "- `copy` → `template`: 0.500\n",
            "\n",
        );
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_report_json_has_expected_keys() {
        let raw = serde_json::to_value(sample()).unwrap();
        let obj = raw.as_object().unwrap();
        for key in ["schema_version", "corpus_digest", "most_used", "correlations", "transitions"] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(raw["most_used"][0][0], "copy");
        assert_eq!(raw["most_used"][0][1], 2);
    }

    #[test]
    fn test_strongest_correlations_ranks_by_magnitude() {
        let pair = |a: &str, b: &str, r: f64| CorrelationPair {
            action_a: a.to_string(),
            action_b: b.to_string(),
            correlation: r,
        };
        let pairs = vec![pair("a", "b", 0.7), pair("a", "c", -0.9), pair("b", "c", 0.8)];
        let top = strongest_correlations(&pairs, 2);
        assert_eq!(top, vec![pair("a", "c", -0.9), pair("b", "c", 0.8)]);
    }

    #[test]
    fn test_outcome_markdown_marks_skips() {
        let mut outcome = RunOutcome {
            pipeline: "standard".to_string(),
            order: vec!["load".to_string(), "extract".to_string()],
            ..RunOutcome::default()
        };
        outcome.failed.push(("load".to_string(), "missing".to_string()));
        outcome.skipped.push("extract".to_string());
        outcome.statuses.insert(
            "load".to_string(),
            StageStatus::Failed {
                cause: FailureCause::Error {
                    reason: "missing".to_string(),
                },
            },
        );
        outcome.statuses.insert(
            "extract".to_string(),
            StageStatus::Failed {
                cause: FailureCause::UpstreamFailed {
                    upstream: "load".to_string(),
                },
            },
        );
        let md = render_outcome_md(&outcome);
        assert!(md.contains("- `load`: failed: missing\n"));
        assert!(md.contains("- `extract`: skipped (upstream `load` failed)\n"));
    }
}
