//! # Observation Capture
//!
//! ## Responsibility
//! Execute exactly one variant function once and record what happened: its
//! value or error, when it started, and how long it took. [`capture`] is the
//! sole fault boundary of the engine — a panicking variant becomes a
//! [`VariantError::Panicked`] on its observation and nothing else; it cannot
//! crash the host or touch any other variant's path.
//!
//! ## Guarantees
//! - The elapsed duration is recorded unconditionally, panic or not.
//! - An [`Observation`] is created exactly once per execution and is
//!   immutable afterwards.
//! - An [`ObservationSet`] always holds a control observation; candidate
//!   observations keep their assembly order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant, SystemTime};

use crate::context::Context;
use crate::error::{panic_message, VariantError};

/// Name assigned to the control variant's observation.
pub const CONTROL_NAME: &str = "control";

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// The recorded outcome of executing one named variant once.
#[derive(Debug, Clone)]
pub struct Observation<T, E> {
    name: String,
    value: Option<T>,
    error: Option<VariantError<E>>,
    started_at: SystemTime,
    duration: Duration,
}

impl<T, E> Observation<T, E> {
    /// The variant name: [`CONTROL_NAME`] or a candidate's assigned name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variant's successful output, if it produced one.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The variant's error, if it returned one or panicked.
    pub fn error(&self) -> Option<&VariantError<E>> {
        self.error.as_ref()
    }

    /// Wall-clock time the execution started.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// How long the execution took, recorded even when the variant panicked.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_control(&self) -> bool {
        self.name == CONTROL_NAME
    }

    pub fn ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_panic(&self) -> bool {
        self.error.as_ref().is_some_and(VariantError::is_panic)
    }

    /// Observation for a variant whose task never reported back (e.g. its
    /// runtime task was cancelled). Treated like a captured crash.
    pub(crate) fn from_join_failure(name: &str, reason: String) -> Self {
        Self {
            name: name.to_string(),
            value: None,
            error: Some(VariantError::Panicked(reason)),
            started_at: SystemTime::now(),
            duration: Duration::ZERO,
        }
    }
}

/// Run one variant function inside the fault boundary and record the outcome.
pub(crate) fn capture<T, E, F>(name: &str, ctx: Context, f: F) -> Observation<T, E>
where
    F: FnOnce(Context) -> Result<T, E>,
{
    let started_at = SystemTime::now();
    let clock = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(move || f(ctx)));
    let duration = clock.elapsed();

    let (value, error) = match outcome {
        Ok(Ok(v)) => (Some(v), None),
        Ok(Err(e)) => (None, Some(VariantError::Returned(e))),
        Err(payload) => (None, Some(VariantError::Panicked(panic_message(payload)))),
    };

    Observation {
        name: name.to_string(),
        value,
        error,
        started_at,
        duration,
    }
}

// ---------------------------------------------------------------------------
// ObservationSet
// ---------------------------------------------------------------------------

/// All observations of one experiment run: exactly one control plus zero or
/// more candidates, in assembly order.
#[derive(Debug, Clone)]
pub struct ObservationSet<T, E> {
    control: Observation<T, E>,
    tests: Vec<Observation<T, E>>,
}

impl<T, E> ObservationSet<T, E> {
    pub(crate) fn new(control: Observation<T, E>, tests: Vec<Observation<T, E>>) -> Self {
        Self { control, tests }
    }

    pub fn control(&self) -> &Observation<T, E> {
        &self.control
    }

    /// Candidate observations. Empty when candidates were skipped for this
    /// run — a valid, non-error state.
    pub fn tests(&self) -> &[Observation<T, E>] {
        &self.tests
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
