//! Structured observability hooks for pipeline runs.
//!
//! This module provides:
//! - Run-scoped tracing spans via the `PipelineSpan` RAII guard
//! - Emission functions for stage lifecycle events
//!
//! Events are emitted at `info!` level, failures at `warn!`. Verbosity and
//! format are configured through [`crate::telemetry::init_tracing`].

use tracing::{info, warn};

/// RAII guard that enters a run-scoped tracing span for the duration of a
/// pipeline run.
///
/// ```ignore
/// let _span = PipelineSpan::enter("standard", "directory ./roles");
/// // every event below carries pipeline = "standard"
/// ```
pub struct PipelineSpan {
    _span: tracing::span::EnteredSpan,
}

impl PipelineSpan {
    pub fn enter(pipeline: &str, source: &str) -> Self {
        let span = tracing::info_span!("rolemine.pipeline", pipeline = %pipeline, source = %source);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_pipeline_started(pipeline: &str, stage_count: usize) {
    info!(event = "pipeline.started", pipeline = %pipeline, stage_count = stage_count);
}

pub fn emit_pipeline_finished(
    pipeline: &str,
    duration_ms: u64,
    completed: usize,
    failed: usize,
    skipped: usize,
) {
    info!(
        event = "pipeline.finished",
        pipeline = %pipeline,
        duration_ms = duration_ms,
        completed = completed,
        failed = failed,
        skipped = skipped,
        success = failed == 0,
    );
}

pub fn emit_stage_started(stage: &str) {
    info!(event = "stage.started", stage = %stage);
}

pub fn emit_stage_completed(stage: &str, duration_ms: u64) {
    info!(event = "stage.completed", stage = %stage, duration_ms = duration_ms);
}

/// A stage whose result was already present in the result map.
pub fn emit_stage_cached(stage: &str) {
    info!(event = "stage.cached", stage = %stage);
}

pub fn emit_stage_failed(stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "stage.failed", stage = %stage, error = %error);
}

pub fn emit_stage_skipped(stage: &str, upstream: &str) {
    warn!(event = "stage.skipped", stage = %stage, upstream = %upstream);
}

/// Persisting a stage output failed; the result itself is kept.
pub fn emit_stage_store_failed(stage: &str, error: &dyn std::fmt::Display) {
    warn!(event = "stage.store_failed", stage = %stage, error = %error);
}
