//! Dependency-ordered stage pipeline.
//!
//! Provides:
//! - [`graph::StageGraph`] — stage dependency DAG with deterministic topological order
//! - [`result_map::ResultMap`] — write-once, type-erased stage results
//! - [`stage::Stage`] — the stage contract, with [`stage::StageStatus`] run state
//! - [`registry::PluginRegistry`] / [`registry::ExternalStage`] — late-bound stages
//! - [`harness::Pipeline`] — runs stages in order, skipping dependents of failures
//! - [`builtin`] — the built-in mining stages and [`builtin::standard_pipeline`]
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rolemine_core::pipeline::{standard_pipeline, StageContext};
//! use rolemine_core::{DirectoryCorpus, MineOptions};
//!
//! let ctx = StageContext::new(Arc::new(DirectoryCorpus::new("roles")), MineOptions::default());
//! let run = standard_pipeline()?.run(&ctx)?;
//! ```

pub mod builtin;
pub mod error;
pub mod graph;
pub mod harness;
pub mod registry;
pub mod result_map;
pub mod stage;

pub use builtin::standard_pipeline;
pub use error::{PipelineError, PipelineResult};
pub use graph::StageGraph;
pub use harness::{Pipeline, PipelineRun, PlannedStage, RunOutcome};
pub use registry::{ExternalStage, PluginRegistry, PluginUnit, RunFn, StoreFn};
pub use result_map::{output, ResultMap, StageOutput};
pub use stage::{FailureCause, Stage, StageContext, StageStatus};
