//! Error types for the stage pipeline.

use thiserror::Error;

/// Errors produced while building or running a stage pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The stage graph contains a dependency cycle.
    #[error("dependency cycle detected involving stages: {stages:?}")]
    DependencyCycle { stages: Vec<String> },

    /// A referenced stage was not found in the graph.
    #[error("stage not found in pipeline: {stage}")]
    StageNotFound { stage: String },

    /// Two stages were registered under the same name.
    #[error("duplicate stage name: {stage}")]
    DuplicateStage { stage: String },

    /// A stage requires a stage that was never registered.
    #[error("stage {stage} requires unknown stage {dependency}")]
    UnknownDependency { stage: String, dependency: String },

    /// A stage returned an error while running.
    #[error("stage {stage} failed: {reason}")]
    StageFailed { stage: String, reason: String },

    /// Two plugin units were registered at the same location.
    #[error("plugin location already registered: {location}")]
    DuplicatePlugin { location: String },

    /// A late-bound stage's plugin unit does not honour the stage contract.
    #[error("external stage {stage} at {location} violates the stage contract: {reason}")]
    ContractViolation {
        stage: String,
        location: String,
        reason: String,
    },

    /// A stage result was written twice.
    #[error("result for stage {stage} is already written")]
    ResultAlreadyWritten { stage: String },

    /// A stage result was read with the wrong type.
    #[error("result for stage {stage} is not a {expected}")]
    ResultTypeMismatch { stage: String, expected: String },
}

/// Convenience result alias.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_cycle_error_displays_stage_names() {
        let err = PipelineError::DependencyCycle {
            stages: vec!["usage".to_string(), "ranking".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("usage"));
        assert!(msg.contains("ranking"));
    }

    #[test]
    fn test_contract_violation_displays_location() {
        let err = PipelineError::ContractViolation {
            stage: "heatmap".to_string(),
            location: "plugins/heatmap".to_string(),
            reason: "unit has no run entry point".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("heatmap"));
        assert!(msg.contains("plugins/heatmap"));
        assert!(msg.contains("run entry point"));
    }

    #[test]
    fn test_unknown_dependency_displays_both_stages() {
        let err = PipelineError::UnknownDependency {
            stage: "transitions".to_string(),
            dependency: "extract".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("transitions"));
        assert!(msg.contains("extract"));
    }
}
