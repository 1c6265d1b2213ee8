//! Run options shared by every stage.
//!
//! Options arrive as a string-keyed mapping (from a YAML / JSON file or built
//! in code). The four recognized keys are validated; anything else is kept
//! verbatim in [`MineOptions::extra`] for external stages.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{MineError, MineResult};
use crate::stats::{DEFAULT_CORRELATION_THRESHOLD, DEFAULT_TRANSITION_THRESHOLD};

/// A ranked listing whose length is capped by the options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankedList {
    MostUsed,
    GuardPercentage,
    LoopPercentage,
    ConditionedActions,
    ArgumentFrequency,
    Correlations,
    Transitions,
}

impl RankedList {
    pub const ALL: [RankedList; 7] = [
        RankedList::MostUsed,
        RankedList::GuardPercentage,
        RankedList::LoopPercentage,
        RankedList::ConditionedActions,
        RankedList::ArgumentFrequency,
        RankedList::Correlations,
        RankedList::Transitions,
    ];

    /// Length used when no option overrides it.
    pub fn default_limit(self) -> usize {
        match self {
            RankedList::MostUsed => 20,
            RankedList::GuardPercentage
            | RankedList::LoopPercentage
            | RankedList::ConditionedActions
            | RankedList::ArgumentFrequency => 25,
            RankedList::Correlations | RankedList::Transitions => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MineOptions {
    /// Caps every ranked listing except argument frequency.
    pub num_modules: Option<usize>,
    pub correlation_threshold: f64,
    pub transition_threshold: f64,
    /// Caps the argument frequency listing.
    pub num_arguments: Option<usize>,
    /// Unrecognized keys, passed through to external stages.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for MineOptions {
    fn default() -> Self {
        Self {
            num_modules: None,
            correlation_threshold: DEFAULT_CORRELATION_THRESHOLD,
            transition_threshold: DEFAULT_TRANSITION_THRESHOLD,
            num_arguments: None,
            extra: BTreeMap::new(),
        }
    }
}

impl MineOptions {
    /// Parse and validate a string-keyed option mapping.
    pub fn from_map(map: &Map<String, Value>) -> MineResult<Self> {
        let mut options = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "num_modules" => options.num_modules = optional_count(key, value)?,
                "num_arguments" => options.num_arguments = optional_count(key, value)?,
                "correlation_threshold" => {
                    options.correlation_threshold = threshold(key, value)?
                }
                "transition_threshold" => options.transition_threshold = threshold(key, value)?,
                _ => {
                    options.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(options)
    }

    /// Read options from a YAML or JSON file (chosen by extension, YAML
    /// otherwise). A document holding only `null` yields the defaults.
    pub fn from_path(path: &Path) -> MineResult<Self> {
        let data = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let value: Value = if is_json {
            serde_json::from_str(&data)?
        } else {
            serde_yaml::from_str(&data)?
        };
        match value {
            Value::Object(map) => Self::from_map(&map),
            Value::Null => Ok(Self::default()),
            other => Err(MineError::InvalidOption {
                key: path.display().to_string(),
                reason: format!("expected a mapping of options, found {}", kind(&other)),
            }),
        }
    }

    /// Check the thresholds of options built in code.
    pub fn validate(&self) -> MineResult<()> {
        check_threshold("correlation_threshold", self.correlation_threshold)?;
        check_threshold("transition_threshold", self.transition_threshold)
    }

    /// Length of the given ranked listing.
    pub fn limit(&self, list: RankedList) -> usize {
        let configured = match list {
            RankedList::ArgumentFrequency => self.num_arguments,
            _ => self.num_modules,
        };
        configured.unwrap_or_else(|| list.default_limit())
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

fn optional_count(key: &str, value: &Value) -> MineResult<Option<usize>> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| MineError::InvalidOption {
            key: key.to_string(),
            reason: format!("expected a non-negative integer, found {}", value),
        })
}

fn threshold(key: &str, value: &Value) -> MineResult<f64> {
    let t = value.as_f64().ok_or_else(|| MineError::InvalidOption {
        key: key.to_string(),
        reason: format!("expected a number, found {}", value),
    })?;
    check_threshold(key, t)?;
    Ok(t)
}

fn check_threshold(key: &str, t: f64) -> MineResult<()> {
    if t.is_finite() && (0.0..=1.0).contains(&t) {
        Ok(())
    } else {
        Err(MineError::InvalidOption {
            key: key.to_string(),
            reason: format!("expected a value in [0, 1], found {}", t),
        })
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
