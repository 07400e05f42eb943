//! # Experiment Configuration
//!
//! Everything an experiment needs to decide how to run: identity, sampling
//! percentage, the enabled/test-mode switches, the optional comparison
//! predicate, and the ordered before-filter and publisher sequences.
//!
//! Options are chainable and the append options (`before`, `publish`) are
//! additive — calling them repeatedly never overwrites earlier entries. A
//! `Config` is assembled fully before a run starts and is read-only while
//! any run is in flight; it is not meant for concurrent mutation.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::context::Context;
use crate::observation::Observation;
use crate::publish::Publisher;

/// Sampling percentage applied when none is configured.
pub const DEFAULT_PERCENTAGE: f64 = 10.0;

/// Adjusts the run context before any variant executes. Filters run in
/// configured order; each receives the previous filter's output.
pub type BeforeFilter = Arc<dyn Fn(Context) -> Context + Send + Sync>;

/// Judges whether a candidate observation matches the control observation.
pub type Comparison<T, E> =
    Arc<dyn Fn(&Observation<T, E>, &Observation<T, E>) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for one experiment. Not safe for concurrent mutation.
pub struct Config<T, E> {
    pub(crate) name: String,
    pub(crate) percentage: f64,
    pub(crate) enabled: bool,
    pub(crate) test_mode: bool,
    pub(crate) comparison: Option<Comparison<T, E>>,
    pub(crate) before: Vec<BeforeFilter>,
    pub(crate) publishers: Vec<Arc<dyn Publisher<T, E>>>,
}

impl<T, E> Default for Config<T, E> {
    fn default() -> Self {
        Self {
            name: String::new(),
            percentage: DEFAULT_PERCENTAGE,
            enabled: true,
            test_mode: false,
            comparison: None,
            before: Vec::new(),
            publishers: Vec::new(),
        }
    }
}

impl<T, E> Config<T, E> {
    /// A named configuration with the defaults: percentage 10, enabled, not
    /// in test mode, no comparison, no filters, no publishers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the sampling percentage, clamped into `[0, 100]`. A non-finite
    /// value clamps to 0.
    pub fn percentage(mut self, percentage: f64) -> Self {
        self.percentage = if percentage.is_nan() {
            0.0
        } else {
            percentage.clamp(0.0, 100.0)
        };
        self
    }

    /// Master switch. When disabled, candidates never run.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Force candidates to run on every invocation, bypassing the sampling
    /// draw. Meant for deterministic test harnesses.
    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Install the comparison predicate. Without one, every executed
    /// candidate is reported as a match.
    pub fn compare<F>(mut self, comparison: F) -> Self
    where
        F: Fn(&Observation<T, E>, &Observation<T, E>) -> bool + Send + Sync + 'static,
    {
        self.comparison = Some(Arc::new(comparison));
        self
    }

    /// Append a before-filter. Additive across calls.
    pub fn before<F>(mut self, filter: F) -> Self
    where
        F: Fn(Context) -> Context + Send + Sync + 'static,
    {
        self.before.push(Arc::new(filter));
        self
    }

    /// Append a result publisher. Additive across calls.
    pub fn publish<P>(mut self, publisher: P) -> Self
    where
        P: Publisher<T, E> + 'static,
    {
        self.publishers.push(Arc::new(publisher));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plain-field view of this configuration, for logs and publishers.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            name: self.name.clone(),
            percentage: self.percentage,
            enabled: self.enabled,
            test_mode: self.test_mode,
            comparison_configured: self.comparison.is_some(),
            before_filters: self.before.len(),
            publishers: self.publishers.len(),
        }
    }

    /// Thread the base context through every before-filter, in order.
    pub(crate) fn apply_filters(&self, ctx: Context) -> Context {
        self.before.iter().fold(ctx, |ctx, filter| filter(ctx))
    }
}

impl<T, E> fmt::Debug for Config<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("percentage", &self.percentage)
            .field("enabled", &self.enabled)
            .field("test_mode", &self.test_mode)
            .field("comparison_configured", &self.comparison.is_some())
            .field("before_filters", &self.before.len())
            .field("publishers", &self.publishers.len())
            .finish()
    }
}

/// The serializable part of a [`Config`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSummary {
    pub name: String,
    pub percentage: f64,
    pub enabled: bool,
    pub test_mode: bool,
    pub comparison_configured: bool,
    pub before_filters: usize,
    pub publishers: usize,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
