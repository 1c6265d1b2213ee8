//! Dependency-ordered stage execution.
//!
//! [`Pipeline`] validates its stages into a [`StageGraph`] and runs them one
//! at a time in topological order. When a stage fails, every transitive
//! dependent is marked failed with [`FailureCause::UpstreamFailed`] and never
//! runs; independent stages are unaffected.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::obs::{
    emit_pipeline_finished, emit_pipeline_started, emit_stage_cached, emit_stage_completed,
    emit_stage_failed, emit_stage_skipped, emit_stage_started, emit_stage_store_failed,
    PipelineSpan,
};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::graph::StageGraph;
use crate::pipeline::result_map::ResultMap;
use crate::pipeline::stage::{FailureCause, Stage, StageContext, StageStatus};

/// A stage as it will be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStage {
    pub name: String,
    pub requires: Vec<String>,
}

/// What happened to every stage of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub pipeline: String,
    /// Execution order.
    pub order: Vec<String>,
    /// Stages with a result after the run, cached ones included.
    pub completed: Vec<String>,
    /// Stages whose result was reused without running.
    pub cached: Vec<String>,
    /// Stages that ran (or tried to) and failed, with the reason.
    pub failed: Vec<(String, String)>,
    /// Stages never run because an upstream stage failed.
    pub skipped: Vec<String>,
    pub statuses: BTreeMap<String, StageStatus>,
    /// Per-stage one-line summaries.
    pub reports: BTreeMap<String, String>,
}

impl RunOutcome {
    /// `true` when no stage failed or was skipped.
    pub fn overall_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    pub fn status(&self, stage: &str) -> Option<&StageStatus> {
        self.statuses.get(stage)
    }
}

/// Outcome plus the result map it produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub outcome: RunOutcome,
    pub results: ResultMap,
}

/// An ordered collection of stages sharing one result map.
pub struct Pipeline {
    name: String,
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a stage. Names must be unique; dependencies are checked when
    /// the pipeline is planned, so stages may be added in any order.
    pub fn add_stage<S: Stage + 'static>(&mut self, stage: S) -> PipelineResult<()> {
        if self.stages.iter().any(|s| s.name() == stage.name()) {
            return Err(PipelineError::DuplicateStage {
                stage: stage.name().to_string(),
            });
        }
        self.stages.push(Box::new(stage));
        Ok(())
    }

    pub fn with_stage<S: Stage + 'static>(mut self, stage: S) -> PipelineResult<Self> {
        self.add_stage(stage)?;
        Ok(self)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    fn stage(&self, name: &str) -> PipelineResult<&dyn Stage> {
        self.stages
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
            .ok_or_else(|| PipelineError::StageNotFound {
                stage: name.to_string(),
            })
    }

    /// Validate the stage graph: duplicates, unknown dependencies, cycles.
    pub fn graph(&self) -> PipelineResult<StageGraph> {
        let mut graph = StageGraph::new();
        for stage in &self.stages {
            graph.add_stage(stage.name())?;
        }
        for stage in &self.stages {
            for dependency in stage.requires() {
                if !graph.contains(&dependency) {
                    return Err(PipelineError::UnknownDependency {
                        stage: stage.name().to_string(),
                        dependency,
                    });
                }
                graph.add_dependency(&dependency, stage.name())?;
            }
        }
        Ok(graph)
    }

    /// Stages in execution order with their direct dependencies.
    pub fn plan(&self) -> PipelineResult<Vec<PlannedStage>> {
        let graph = self.graph()?;
        graph
            .topological_order()?
            .into_iter()
            .map(|name| {
                let requires = graph
                    .dependencies_of(&name)?
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                Ok(PlannedStage { name, requires })
            })
            .collect()
    }

    /// Run every stage against a fresh result map.
    pub fn run(&self, ctx: &StageContext) -> PipelineResult<PipelineRun> {
        self.run_with(ctx, ResultMap::new())
    }

    /// Run against `results`. Stages whose result is already present are
    /// reported completed (cached) and not run again.
    ///
    /// Errs only when the graph itself is invalid; stage failures are
    /// reported in the returned [`RunOutcome`].
    pub fn run_with(
        &self,
        ctx: &StageContext,
        mut results: ResultMap,
    ) -> PipelineResult<PipelineRun> {
        let graph = self.graph()?;
        let order = graph.topological_order()?;

        let _span = PipelineSpan::enter(&self.name, &ctx.source.describe());
        emit_pipeline_started(&self.name, order.len());
        let started = Instant::now();

        let mut outcome = RunOutcome {
            pipeline: self.name.clone(),
            order: order.clone(),
            statuses: order
                .iter()
                .map(|n| (n.clone(), StageStatus::Pending))
                .collect(),
            ..RunOutcome::default()
        };
        // stage → failed upstream that blocks it
        let mut blocked: BTreeMap<String, String> = BTreeMap::new();

        for name in &order {
            let stage = self.stage(name)?;

            if let Some(upstream) = blocked.get(name) {
                emit_stage_skipped(name, upstream);
                outcome.skipped.push(name.clone());
                outcome.statuses.insert(
                    name.clone(),
                    StageStatus::Failed {
                        cause: FailureCause::UpstreamFailed {
                            upstream: upstream.clone(),
                        },
                    },
                );
                continue;
            }

            if let Some(cached) = results.raw(name) {
                emit_stage_cached(name);
                if let Some(line) = stage.report(cached) {
                    outcome.reports.insert(name.clone(), line);
                }
                outcome.completed.push(name.clone());
                outcome.cached.push(name.clone());
                outcome
                    .statuses
                    .insert(name.clone(), StageStatus::Completed { cached: true });
                continue;
            }

            outcome.statuses.insert(name.clone(), StageStatus::Running);
            emit_stage_started(name);
            let stage_started = Instant::now();

            match stage.run(ctx, &results) {
                Ok(output) => {
                    if let Err(e) = stage.store(&output, ctx) {
                        emit_stage_store_failed(name, &e);
                    }
                    if let Some(line) = stage.report(&output) {
                        outcome.reports.insert(name.clone(), line);
                    }
                    results.insert(name, output)?;
                    emit_stage_completed(name, stage_started.elapsed().as_millis() as u64);
                    outcome.completed.push(name.clone());
                    outcome
                        .statuses
                        .insert(name.clone(), StageStatus::Completed { cached: false });
                }
                Err(e) => {
                    emit_stage_failed(name, &e);
                    let reason = format!("{:#}", e);
                    let cause = match e.downcast_ref::<PipelineError>() {
                        Some(PipelineError::ContractViolation { .. }) => {
                            FailureCause::ContractViolation {
                                reason: reason.clone(),
                            }
                        }
                        _ => FailureCause::Error {
                            reason: reason.clone(),
                        },
                    };
                    outcome.failed.push((name.clone(), reason));
                    outcome
                        .statuses
                        .insert(name.clone(), StageStatus::Failed { cause });

                    for dependent in graph.transitive_dependents_of(name)? {
                        blocked.entry(dependent).or_insert_with(|| name.clone());
                    }
                }
            }
        }

        emit_pipeline_finished(
            &self.name,
            started.elapsed().as_millis() as u64,
            outcome.completed.len(),
            outcome.failed.len(),
            outcome.skipped.len(),
        );

        Ok(PipelineRun { outcome, results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::corpus::InMemoryCorpus;
    use crate::options::MineOptions;
    use crate::pipeline::result_map::{output, StageOutput};

    struct Fixed {
        name: &'static str,
        requires: Vec<&'static str>,
        fail: bool,
        runs: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn ok(name: &'static str, requires: Vec<&'static str>) -> Self {
            Self {
                name,
                requires,
                fail: false,
                runs: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(name: &'static str, requires: Vec<&'static str>) -> Self {
            Self {
                fail: true,
                ..Self::ok(name, requires)
            }
        }
    }

    impl Stage for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn requires(&self) -> Vec<String> {
            self.requires.iter().map(|s| s.to_string()).collect()
        }

        fn run(&self, _ctx: &StageContext, _results: &ResultMap) -> anyhow::Result<StageOutput> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("{} exploded", self.name);
            }
            Ok(output(self.name.to_string()))
        }
    }

    fn ctx() -> StageContext {
        StageContext::new(Arc::new(InMemoryCorpus::default()), MineOptions::default())
    }

    #[test]
    fn test_failure_skips_transitive_dependents_only() {
        // a → b → c, a → d, e independent
        let c = Fixed::ok("c", vec!["b"]);
        let c_runs = Arc::clone(&c.runs);
        let pipeline = Pipeline::new("t")
            .with_stage(Fixed::ok("a", vec![]))
            .unwrap()
            .with_stage(Fixed::failing("b", vec!["a"]))
            .unwrap()
            .with_stage(c)
            .unwrap()
            .with_stage(Fixed::ok("d", vec!["a"]))
            .unwrap()
            .with_stage(Fixed::ok("e", vec![]))
            .unwrap();

        let run = pipeline.run(&ctx()).unwrap();
        let o = &run.outcome;
        assert!(!o.overall_success());
        assert_eq!(o.failed.len(), 1);
        assert_eq!(o.failed[0].0, "b");
        assert!(o.failed[0].1.contains("exploded"));
        assert_eq!(o.skipped, vec!["c"]);
        assert_eq!(c_runs.load(Ordering::SeqCst), 0);
        assert!(o.status("c").unwrap().is_skipped());
        let completed: BTreeSet<&str> = o.completed.iter().map(String::as_str).collect();
        assert_eq!(completed, BTreeSet::from(["a", "d", "e"]));
        assert_eq!(run.results.get::<String>("d").unwrap().map(String::as_str), Some("d"));
        assert!(!run.results.contains("b"));
    }

    #[test]
    fn test_cached_results_are_not_rerun() {
        let a = Fixed::ok("a", vec![]);
        let a_runs = Arc::clone(&a.runs);
        let pipeline = Pipeline::new("t")
            .with_stage(a)
            .unwrap()
            .with_stage(Fixed::ok("b", vec!["a"]))
            .unwrap();

        let first = pipeline.run(&ctx()).unwrap();
        let second = pipeline.run_with(&ctx(), first.results).unwrap();
        assert_eq!(a_runs.load(Ordering::SeqCst), 1);
        assert_eq!(second.outcome.cached, vec!["a", "b"]);
        assert_eq!(
            second.outcome.status("a"),
            Some(&StageStatus::Completed { cached: true })
        );
    }

    #[test]
    fn test_invalid_graphs_are_rejected_before_running() {
        let unknown = Pipeline::new("t")
            .with_stage(Fixed::ok("b", vec!["missing"]))
            .unwrap();
        assert!(matches!(
            unknown.run(&ctx()),
            Err(PipelineError::UnknownDependency { .. })
        ));

        let cyclic = Pipeline::new("t")
            .with_stage(Fixed::ok("x", vec!["y"]))
            .unwrap()
            .with_stage(Fixed::ok("y", vec!["x"]))
            .unwrap();
        assert!(matches!(
            cyclic.plan(),
            Err(PipelineError::DependencyCycle { .. })
        ));

        let mut dup = Pipeline::new("t");
        dup.add_stage(Fixed::ok("a", vec![])).unwrap();
        assert!(matches!(
            dup.add_stage(Fixed::ok("a", vec![])),
            Err(PipelineError::DuplicateStage { .. })
        ));
    }

    #[test]
    fn test_plan_lists_dependencies_in_order() {
        let pipeline = Pipeline::new("t")
            .with_stage(Fixed::ok("report", vec!["usage", "load"]))
            .unwrap()
            .with_stage(Fixed::ok("usage", vec!["load"]))
            .unwrap()
            .with_stage(Fixed::ok("load", vec![]))
            .unwrap();
        let plan = pipeline.plan().unwrap();
        let names: Vec<&str> = plan.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["load", "usage", "report"]);
        assert_eq!(plan[2].requires, vec!["load", "usage"]);
    }
}
