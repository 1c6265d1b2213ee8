//! Plugin registry for late-bound external stages.
//!
//! External algorithms are not loaded dynamically. They are registered up
//! front as [`PluginUnit`]s under a location name, and an [`ExternalStage`]
//! resolves its unit from the registry only when it runs. A missing unit, or
//! one without a `run` entry point, fails that stage alone.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::result_map::{ResultMap, StageOutput};
use crate::pipeline::stage::{Stage, StageContext};

pub type RunFn =
    Arc<dyn Fn(&StageContext, &ResultMap) -> anyhow::Result<StageOutput> + Send + Sync>;
pub type StoreFn = Arc<dyn Fn(&StageOutput, &StageContext) -> anyhow::Result<()> + Send + Sync>;

/// Entry points exposed by one external algorithm.
#[derive(Clone, Default)]
pub struct PluginUnit {
    run: Option<RunFn>,
    store: Option<StoreFn>,
}

impl PluginUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run<F>(mut self, run: F) -> Self
    where
        F: Fn(&StageContext, &ResultMap) -> anyhow::Result<StageOutput> + Send + Sync + 'static,
    {
        self.run = Some(Arc::new(run));
        self
    }

    pub fn with_store<F>(mut self, store: F) -> Self
    where
        F: Fn(&StageOutput, &StageContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn has_run(&self) -> bool {
        self.run.is_some()
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }
}

impl std::fmt::Debug for PluginUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginUnit")
            .field("run", &self.has_run())
            .field("store", &self.has_store())
            .finish()
    }
}

/// Location name → plugin unit.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    units: BTreeMap<String, PluginUnit>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        location: impl Into<String>,
        unit: PluginUnit,
    ) -> PipelineResult<()> {
        let location = location.into();
        if self.units.contains_key(&location) {
            return Err(PipelineError::DuplicatePlugin { location });
        }
        self.units.insert(location, unit);
        Ok(())
    }

    pub fn get(&self, location: &str) -> Option<&PluginUnit> {
        self.units.get(location)
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }
}

/// A stage whose implementation is looked up in a [`PluginRegistry`].
#[derive(Debug, Clone)]
pub struct ExternalStage {
    name: String,
    location: String,
    requires: Vec<String>,
    registry: Arc<PluginRegistry>,
}

impl ExternalStage {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        registry: Arc<PluginRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            requires: Vec::new(),
            registry,
        }
    }

    pub fn requiring<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(stages.into_iter().map(Into::into));
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    fn violation(&self, reason: &str) -> PipelineError {
        PipelineError::ContractViolation {
            stage: self.name.clone(),
            location: self.location.clone(),
            reason: reason.to_string(),
        }
    }

    fn resolve_run(&self) -> PipelineResult<&RunFn> {
        let unit = self
            .registry
            .get(&self.location)
            .ok_or_else(|| self.violation("no unit registered at this location"))?;
        unit.run
            .as_ref()
            .ok_or_else(|| self.violation("unit has no run entry point"))
    }
}

impl Stage for ExternalStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> Vec<String> {
        self.requires.clone()
    }

    fn run(&self, ctx: &StageContext, results: &ResultMap) -> anyhow::Result<StageOutput> {
        let run = self.resolve_run()?;
        run(ctx, results)
    }

    fn store(&self, output: &StageOutput, ctx: &StageContext) -> anyhow::Result<()> {
        match self.registry.get(&self.location).and_then(|u| u.store.as_ref()) {
            Some(store) => store(output, ctx),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::InMemoryCorpus;
    use crate::options::MineOptions;
    use crate::pipeline::result_map::output;

    fn ctx() -> StageContext {
        StageContext::new(Arc::new(InMemoryCorpus::default()), MineOptions::default())
    }

    #[test]
    fn test_register_rejects_duplicate_location() {
        let mut registry = PluginRegistry::new();
        registry.register("plugins/a", PluginUnit::new()).unwrap();
        assert!(matches!(
            registry.register("plugins/a", PluginUnit::new()),
            Err(PipelineError::DuplicatePlugin { .. })
        ));
    }

    #[test]
    fn test_external_stage_runs_registered_unit() {
        let mut registry = PluginRegistry::new();
        registry
            .register("plugins/answer", PluginUnit::new().with_run(|_, _| Ok(output(42u32))))
            .unwrap();
        let stage = ExternalStage::new("answer", "plugins/answer", Arc::new(registry));
        let out = stage.run(&ctx(), &ResultMap::new()).unwrap();
        assert_eq!(out.downcast_ref::<u32>(), Some(&42));
        assert!(stage.store(&out, &ctx()).is_ok());
    }

    #[test]
    fn test_missing_run_is_contract_violation() {
        let mut registry = PluginRegistry::new();
        registry
            .register("plugins/store-only", PluginUnit::new().with_store(|_, _| Ok(())))
            .unwrap();
        let registry = Arc::new(registry);

        for location in ["plugins/store-only", "plugins/unregistered"] {
            let stage = ExternalStage::new("ext", location, Arc::clone(&registry));
            let err = stage.run(&ctx(), &ResultMap::new()).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<PipelineError>(),
                Some(PipelineError::ContractViolation { .. })
            ));
        }
    }
}
