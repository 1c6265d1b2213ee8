//! rolemine core library
//!
//! Mines a corpus of role documents for action usage statistics: frequency,
//! guard and loop usage, argument and condition vocabularies, cross-role
//! correlation and action transition probabilities. The aggregators are
//! sequenced by a small dependency-ordered stage pipeline.

pub mod corpus;
pub mod domain;
pub mod obs;
pub mod options;
pub mod pipeline;
pub mod reporting;
pub mod stats;
pub mod telemetry;

pub use corpus::{
    extract, extract_corpus, parse_document, select, CorpusSequences, CorpusSource,
    DirectoryCorpus, InMemoryCorpus, LoadedCorpus, RoleSequence,
};

pub use domain::{
    ActionOccurrence, Block, Guard, MalformedDocument, MineError, MineResult, RoleDocument,
    RoleRevision, Task, TaskFile, HEAD_REVISION,
};

pub use options::{MineOptions, RankedList};

pub use pipeline::{
    standard_pipeline, ExternalStage, Pipeline, PipelineError, PipelineResult, PipelineRun,
    PluginRegistry, PluginUnit, ResultMap, RunOutcome, Stage, StageContext, StageStatus,
};

pub use reporting::{render_outcome_md, render_report_md, MiningReport};

pub use stats::{
    aggregate_arguments, aggregate_conditions, aggregate_correlations, aggregate_transitions,
    aggregate_usage, top_n, ArgumentReport, ConditionReport, CorrelationReport, TransitionReport,
    UsageReport,
};

/// Crate version, for reports and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
