//! The stage contract and per-stage run state.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusSource;
use crate::options::MineOptions;
use crate::pipeline::result_map::{ResultMap, StageOutput};

/// Everything a stage may read besides upstream results.
#[derive(Clone)]
pub struct StageContext {
    pub source: Arc<dyn CorpusSource>,
    pub options: MineOptions,
    /// Where stages that persist their output may write.
    pub output_dir: Option<PathBuf>,
}

impl StageContext {
    pub fn new(source: Arc<dyn CorpusSource>, options: MineOptions) -> Self {
        Self {
            source,
            options,
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("source", &self.source.describe())
            .field("options", &self.options)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

/// One unit of work in a pipeline.
///
/// A stage names the stages whose results it reads; the harness runs it only
/// after all of them completed and hands it the shared [`ResultMap`].
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    /// Names of the stages this one reads results from.
    fn requires(&self) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput>;

    /// Persist a freshly computed output. Called once per successful run.
    fn store(&self, _output: &StageOutput, _ctx: &StageContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// One-line human summary of an output.
    fn report(&self, _output: &StageOutput) -> Option<String> {
        None
    }
}

/// Why a stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FailureCause {
    /// The stage ran and returned an error.
    Error { reason: String },
    /// An external stage's plugin unit could not be run.
    ContractViolation { reason: String },
    /// The stage never ran because `upstream` failed.
    UpstreamFailed { upstream: String },
}

/// Run state of a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum StageStatus {
    Pending,
    Running,
    Completed {
        /// The result was already present and the stage did not run.
        cached: bool,
    },
    Failed {
        cause: FailureCause,
    },
}

impl StageStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageStatus::Completed { .. })
    }

    /// Failed without running because an upstream stage failed.
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            StageStatus::Failed {
                cause: FailureCause::UpstreamFailed { .. }
            }
        )
    }

    /// Failed after running (or attempting to run).
    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed { .. }) && !self.is_skipped()
    }
}
