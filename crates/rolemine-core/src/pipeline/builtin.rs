//! The built-in mining stages and the standard pipeline wiring them up.
//!
//! ```text
//! load → extract → usage ───────┐
//!                ├→ arguments ──┤
//!                ├→ conditions ─┤
//!                ├→ correlation ┼→ summary
//!                └→ transitions ┘
//! ```

use anyhow::Context;
use tracing::debug;

use crate::corpus::{extract_corpus, CorpusSequences, LoadedCorpus};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::harness::Pipeline;
use crate::pipeline::result_map::{output, ResultMap, StageOutput};
use crate::pipeline::stage::{Stage, StageContext};
use crate::reporting::{write_report_json, write_report_md, MiningReport};
use crate::stats::{
    aggregate_arguments, aggregate_conditions, aggregate_correlations, aggregate_transitions,
    aggregate_usage, ArgumentReport, ConditionReport, CorrelationReport, TransitionReport,
    UsageReport,
};

pub const LOAD: &str = "load";
pub const EXTRACT: &str = "extract";
pub const USAGE: &str = "usage";
pub const ARGUMENTS: &str = "arguments";
pub const CONDITIONS: &str = "conditions";
pub const CORRELATION: &str = "correlation";
pub const TRANSITIONS: &str = "transitions";
pub const SUMMARY: &str = "summary";

pub const STANDARD_PIPELINE: &str = "standard";

fn requires(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn corpus(results: &ResultMap) -> anyhow::Result<&CorpusSequences> {
    Ok(results.require::<CorpusSequences>(EXTRACT)?)
}

/// Reads documents from the context's corpus source.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadStage;

impl Stage for LoadStage {
    fn name(&self) -> &str {
        LOAD
    }

    fn run(&self, ctx: &StageContext, _results: &ResultMap) -> anyhow::Result<StageOutput> {
        let loaded = ctx
            .source
            .load()
            .with_context(|| format!("load corpus from {}", ctx.source.describe()))?;
        Ok(output(loaded))
    }

    fn report(&self, output: &StageOutput) -> Option<String> {
        let loaded = output.downcast_ref::<LoadedCorpus>()?;
        Some(format!(
            "{} documents loaded, {} malformed skipped",
            loaded.documents.len(),
            loaded.malformed.len()
        ))
    }
}

/// Builds the per-role canonical action sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractStage;

impl Stage for ExtractStage {
    fn name(&self) -> &str {
        EXTRACT
    }

    fn requires(&self) -> Vec<String> {
        requires(&[LOAD])
    }

    fn run(&self, _ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput> {
        let loaded = results.require::<LoadedCorpus>(LOAD)?;
        let corpus = extract_corpus(&loaded.documents);
        debug!(
            roles = corpus.role_count(),
            occurrences = corpus.occurrence_count(),
            "corpus extracted"
        );
        Ok(output(corpus))
    }

    fn report(&self, output: &StageOutput) -> Option<String> {
        let corpus = output.downcast_ref::<CorpusSequences>()?;
        Some(format!(
            "{} roles, {} action occurrences",
            corpus.role_count(),
            corpus.occurrence_count()
        ))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UsageStage;

impl Stage for UsageStage {
    fn name(&self) -> &str {
        USAGE
    }

    fn requires(&self) -> Vec<String> {
        requires(&[EXTRACT])
    }

    fn run(&self, _ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput> {
        let corpus = corpus(results)?;
        Ok(output(aggregate_usage(corpus.canonical_occurrences())))
    }

    fn report(&self, output: &StageOutput) -> Option<String> {
        let usage = output.downcast_ref::<UsageReport>()?;
        Some(format!("{} distinct actions", usage.actions.len()))
    }
}

/// Argument vocabularies from `HEAD` revisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentsStage;

impl Stage for ArgumentsStage {
    fn name(&self) -> &str {
        ARGUMENTS
    }

    fn requires(&self) -> Vec<String> {
        requires(&[EXTRACT])
    }

    fn run(&self, _ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput> {
        let corpus = corpus(results)?;
        Ok(output(aggregate_arguments(corpus.head_occurrences())))
    }

    fn report(&self, output: &StageOutput) -> Option<String> {
        let arguments = output.downcast_ref::<ArgumentReport>()?;
        Some(format!(
            "{} actions, {} distinct argument names",
            arguments.actions.len(),
            arguments.argument_frequency().len()
        ))
    }
}

/// Guard-condition vocabularies from `HEAD` revisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionsStage;

impl Stage for ConditionsStage {
    fn name(&self) -> &str {
        CONDITIONS
    }

    fn requires(&self) -> Vec<String> {
        requires(&[EXTRACT])
    }

    fn run(&self, _ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput> {
        let corpus = corpus(results)?;
        Ok(output(aggregate_conditions(corpus.head_occurrences())))
    }

    fn report(&self, output: &StageOutput) -> Option<String> {
        let conditions = output.downcast_ref::<ConditionReport>()?;
        Some(format!(
            "{} guarded actions, {} distinct clauses",
            conditions.conditions.len(),
            conditions.clause_usage.len()
        ))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationStage;

impl Stage for CorrelationStage {
    fn name(&self) -> &str {
        CORRELATION
    }

    fn requires(&self) -> Vec<String> {
        requires(&[EXTRACT])
    }

    fn run(&self, ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput> {
        let corpus = corpus(results)?;
        Ok(output(aggregate_correlations(
            corpus,
            ctx.options.correlation_threshold,
        )))
    }

    fn report(&self, output: &StageOutput) -> Option<String> {
        let correlation = output.downcast_ref::<CorrelationReport>()?;
        Some(format!(
            "{} pairs with |r| >= {}",
            correlation.strong.len(),
            correlation.threshold
        ))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionsStage;

impl Stage for TransitionsStage {
    fn name(&self) -> &str {
        TRANSITIONS
    }

    fn requires(&self) -> Vec<String> {
        requires(&[EXTRACT])
    }

    fn run(&self, ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput> {
        let corpus = corpus(results)?;
        Ok(output(aggregate_transitions(
            corpus,
            ctx.options.transition_threshold,
        )))
    }

    fn report(&self, output: &StageOutput) -> Option<String> {
        let transitions = output.downcast_ref::<TransitionReport>()?;
        Some(format!(
            "{} transitions with p >= {}",
            transitions.strong.len(),
            transitions.threshold
        ))
    }
}

/// Ranks every aggregate into a [`MiningReport`] and, when the context has
/// an output directory, writes it there as JSON and markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryStage;

impl Stage for SummaryStage {
    fn name(&self) -> &str {
        SUMMARY
    }

    fn requires(&self) -> Vec<String> {
        requires(&[LOAD, EXTRACT, USAGE, ARGUMENTS, CONDITIONS, CORRELATION, TRANSITIONS])
    }

    fn run(&self, ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput> {
        let report = MiningReport::from_results(results, &ctx.source.describe(), &ctx.options)?;
        Ok(output(report))
    }

    fn store(&self, output: &StageOutput, ctx: &StageContext) -> anyhow::Result<()> {
        let (Some(dir), Some(report)) = (&ctx.output_dir, output.downcast_ref::<MiningReport>())
        else {
            return Ok(());
        };
        std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
        write_report_json(&dir.join("report.json"), report)?;
        write_report_md(&dir.join("report.md"), report)?;
        Ok(())
    }

    fn report(&self, output: &StageOutput) -> Option<String> {
        let report = output.downcast_ref::<MiningReport>()?;
        Some(format!("corpus digest {}", report.corpus_digest))
    }
}

/// The built-in stages in registration order.
pub fn standard_pipeline() -> PipelineResult<Pipeline> {
    Pipeline::new(STANDARD_PIPELINE)
        .with_stage(LoadStage)?
        .with_stage(ExtractStage)?
        .with_stage(UsageStage)?
        .with_stage(ArgumentsStage)?
        .with_stage(ConditionsStage)?
        .with_stage(CorrelationStage)?
        .with_stage(TransitionsStage)?
        .with_stage(SummaryStage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::corpus::{DirectoryCorpus, InMemoryCorpus};
    use crate::domain::{Block, Guard, RoleDocument, RoleRevision, Task, TaskFile};
    use crate::options::MineOptions;
    use crate::pipeline::stage::FailureCause;

    fn role(id: &str, blocks: Vec<Block>) -> RoleDocument {
        RoleDocument::new(id)
            .with_revision(
                RoleRevision::head().with_task_file(TaskFile::new(vec![Task::new(blocks)])),
            )
    }

    fn ctx(documents: Vec<RoleDocument>) -> StageContext {
        StageContext::new(Arc::new(InMemoryCorpus::new(documents)), MineOptions::default())
    }

    #[test]
    fn test_standard_pipeline_order() {
        let plan = standard_pipeline().unwrap().plan().unwrap();
        let names: Vec<&str> = plan.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![LOAD, EXTRACT, ARGUMENTS, CONDITIONS, CORRELATION, TRANSITIONS, USAGE, SUMMARY]
        );
    }

    #[test]
    fn test_standard_pipeline_computes_usage() {
        let documents = vec![role(
            "web",
            vec![
                Block::action("copy").with_guard(Guard::single("x is defined")),
                Block::action("copy"),
                Block::action("template").with_loop(),
            ],
        )];
        let run = standard_pipeline().unwrap().run(&ctx(documents)).unwrap();
        assert!(run.outcome.overall_success());

        let usage = run.results.require::<UsageReport>(USAGE).unwrap();
        assert_eq!(usage.get("copy").unwrap().total, 2);
        assert_eq!(usage.get("copy").unwrap().guard_percentage, 50.0);
        assert_eq!(usage.get("template").unwrap().loop_percentage, 100.0);

        let summary = run.results.require::<MiningReport>(SUMMARY).unwrap();
        assert_eq!(summary.roles, 1);
        assert!(run.outcome.reports.contains_key(USAGE));
    }

    #[test]
    fn test_missing_corpus_fails_load_and_skips_everything_else() {
        let ctx = StageContext::new(
            Arc::new(DirectoryCorpus::new("/definitely/not/a/corpus")),
            MineOptions::default(),
        );
        let run = standard_pipeline().unwrap().run(&ctx).unwrap();
        assert_eq!(run.outcome.failed.len(), 1);
        assert_eq!(run.outcome.failed[0].0, LOAD);
        assert!(run.outcome.failed[0].1.contains("does not exist"));
        assert_eq!(run.outcome.skipped.len(), 7);
        assert!(matches!(
            run.outcome.status(SUMMARY),
            Some(crate::pipeline::stage::StageStatus::Failed {
                cause: FailureCause::UpstreamFailed { upstream }
            }) if upstream == LOAD
        ));
        assert!(run.results.is_empty());
    }

    #[test]
    fn test_summary_store_writes_report_files() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(vec![role("web", vec![Block::action("copy")])])
            .with_output_dir(dir.path().join("out"));
        let run = standard_pipeline().unwrap().run(&ctx).unwrap();
        assert!(run.outcome.overall_success());
        assert!(dir.path().join("out/report.json").exists());
        assert!(dir.path().join("out/report.md").exists());
    }
}
