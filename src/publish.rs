//! # Result Publishing
//!
//! Publishers receive every completed run's [`ExperimentResult`] after the
//! caller already has the control's outcome. Dispatch is fire-and-forget on
//! detached tasks: a slow or panicking publisher delays nothing and breaks
//! nothing, so implementations are free to write to logs, metrics pipes, or
//! storage without affecting the experimenting code path.

use crate::result::ExperimentResult;

/// Receives the result of a completed experiment run.
///
/// Called once per run per registered publisher, on a detached task. A panic
/// inside `publish` is contained and logged by the engine.
pub trait Publisher<T, E>: Send + Sync {
    fn publish(&self, experiment: &str, result: &ExperimentResult<T, E>);
}

// ---------------------------------------------------------------------------
// LogPublisher
// ---------------------------------------------------------------------------

/// Publisher that reports each run through `tracing`: one warning line when
/// the run observed mismatches, one info line otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

impl<T, E> Publisher<T, E> for LogPublisher
where
    T: Clone,
    E: Clone,
{
    fn publish(&self, experiment: &str, result: &ExperimentResult<T, E>) {
        let candidates = result.candidates().len();
        let mismatches = result.mismatches().len();
        let control_ok = result.control().ok();
        let control_ms = result.control().duration().as_millis() as u64;

        if mismatches > 0 {
            tracing::warn!(
                target: "labrat::publish",
                experiment,
                candidates,
                mismatches,
                control_ok,
                control_ms,
                "experiment observed mismatches"
            );
        } else {
            tracing::info!(
                target: "labrat::publish",
                experiment,
                candidates,
                control_ok,
                control_ms,
                "experiment run clean"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Comparison;
    use crate::context::Context;
    use crate::observation::{capture, ObservationSet, CONTROL_NAME};
    use std::sync::Arc;

    fn result_with_mismatch(mismatch: bool) -> ExperimentResult<i32, String> {
        let control = capture(CONTROL_NAME, Context::new(), |_| Ok(1));
        let candidate_value = if mismatch { 2 } else { 1 };
        let tests = vec![capture("alt", Context::new(), move |_| Ok(candidate_value))];
        let cmp: Comparison<i32, String> =
            Arc::new(|control, candidate| control.value() == candidate.value());
        ExperimentResult::new(ObservationSet::new(control, tests), Some(cmp))
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    // The tracing output itself is not asserted here; these verify that
    // LogPublisher can consume both result shapes without classifying wrong.

    #[test]
    fn test_log_publisher_handles_clean_run() {
        init_tracing();
        let result = result_with_mismatch(false);
        Publisher::publish(&LogPublisher, "clean", &result);
        assert!(!result.mismatched());
    }

    #[test]
    fn test_log_publisher_handles_mismatched_run() {
        init_tracing();
        let result = result_with_mismatch(true);
        Publisher::publish(&LogPublisher, "dirty", &result);
        assert!(result.mismatched());
    }
}
