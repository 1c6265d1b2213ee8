//! Aggregators over extracted action sequences.
//!
//! Every aggregator is an independent pure function of extractor output and
//! returns a fresh report; nothing is accumulated across runs.
//!
//! - [`usage`] — frequency, guard and loop percentages
//! - [`arguments`] — argument vocabularies (HEAD revisions only)
//! - [`conditions`] — guard-condition vocabularies (HEAD revisions only)
//! - [`correlation`] — cross-role co-occurrence correlation
//! - [`transition`] — first-order action transition probabilities
//! - [`ranking`] — deterministic Top-N selection

pub mod arguments;
pub mod conditions;
pub mod correlation;
pub mod ranking;
pub mod transition;
pub mod usage;

pub use arguments::{aggregate_arguments, ArgumentReport};
pub use conditions::{aggregate_conditions, split_condition, ConditionClauses, ConditionReport};
pub use correlation::{
    aggregate_correlations, pearson, CorrelationMatrix, CorrelationPair, CorrelationReport,
    PresenceMatrix, DEFAULT_CORRELATION_THRESHOLD,
};
pub use ranking::{top_n, Score};
pub use transition::{
    aggregate_transitions, TransitionMatrix, TransitionPair, TransitionReport,
    DEFAULT_TRANSITION_THRESHOLD,
};
pub use usage::{aggregate_usage, ActionUsage, UsageAggregator, UsageReport};
