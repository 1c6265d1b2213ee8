//! Write-once map of stage results.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::pipeline::error::{PipelineError, PipelineResult};

/// Type-erased, immutable stage output.
pub type StageOutput = Arc<dyn Any + Send + Sync>;

/// Wrap a value as a [`StageOutput`].
pub fn output<T: Any + Send + Sync>(value: T) -> StageOutput {
    Arc::new(value)
}

/// Stage name → output. Each key is written at most once; readers share the
/// stored value through `Arc`.
#[derive(Clone, Default)]
pub struct ResultMap {
    entries: BTreeMap<String, StageOutput>,
}

impl std::fmt::Debug for ResultMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `output` under `stage`. A second write for the same stage is
    /// rejected and the first value kept.
    pub fn insert(&mut self, stage: &str, output: StageOutput) -> PipelineResult<()> {
        if self.entries.contains_key(stage) {
            return Err(PipelineError::ResultAlreadyWritten {
                stage: stage.to_string(),
            });
        }
        self.entries.insert(stage.to_string(), output);
        Ok(())
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.entries.contains_key(stage)
    }

    pub fn raw(&self, stage: &str) -> Option<&StageOutput> {
        self.entries.get(stage)
    }

    /// Typed read of a stage result. `Ok(None)` when the stage has no result.
    pub fn get<T: Any + Send + Sync>(&self, stage: &str) -> PipelineResult<Option<&T>> {
        match self.entries.get(stage) {
            None => Ok(None),
            Some(out) => out
                .downcast_ref::<T>()
                .map(Some)
                .ok_or_else(|| PipelineError::ResultTypeMismatch {
                    stage: stage.to_string(),
                    expected: type_name::<T>().to_string(),
                }),
        }
    }

    /// Typed read of a result a stage depends on; absence is an error.
    pub fn require<T: Any + Send + Sync>(&self, stage: &str) -> PipelineResult<&T> {
        self.get::<T>(stage)?.ok_or_else(|| PipelineError::StageNotFound {
            stage: stage.to_string(),
        })
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
