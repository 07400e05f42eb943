//! # Experiment Results
//!
//! ## Responsibility
//! Hold the observations of one run and classify the candidates into
//! matches and mismatches against the control, on demand.
//!
//! ## Guarantees
//! - Classification is lazy: nothing is compared until [`candidates`] or
//!   [`mismatches`] is first called. [`control`] never triggers it.
//! - Classification runs at most once per result; every later call returns
//!   the memoized partition, even when the first call raced another.
//! - A comparison predicate that panics marks that one pair as a mismatch
//!   and affects nothing else. The partition is still committed.
//!
//! [`candidates`]: ExperimentResult::candidates
//! [`mismatches`]: ExperimentResult::mismatches
//! [`control`]: ExperimentResult::control

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use once_cell::sync::OnceCell;

use crate::config::Comparison;
use crate::observation::{Observation, ObservationSet};

// ---------------------------------------------------------------------------
// ExperimentResult
// ---------------------------------------------------------------------------

/// The outcome of one experiment run, handed to every publisher.
pub struct ExperimentResult<T, E> {
    observations: ObservationSet<T, E>,
    comparison: Option<Comparison<T, E>>,
    partition: OnceCell<Partition<T, E>>,
}

struct Partition<T, E> {
    candidates: Vec<Observation<T, E>>,
    mismatches: Vec<Observation<T, E>>,
}

impl<T, E> ExperimentResult<T, E>
where
    T: Clone,
    E: Clone,
{
    pub(crate) fn new(
        observations: ObservationSet<T, E>,
        comparison: Option<Comparison<T, E>>,
    ) -> Self {
        Self {
            observations,
            comparison,
            partition: OnceCell::new(),
        }
    }

    /// The control's observation. Does not trigger classification.
    pub fn control(&self) -> &Observation<T, E> {
        self.observations.control()
    }

    /// Every observation of the run, unclassified.
    pub fn observations(&self) -> &ObservationSet<T, E> {
        &self.observations
    }

    /// Candidate observations that matched the control, in execution order.
    pub fn candidates(&self) -> &[Observation<T, E>] {
        &self.partition().candidates
    }

    /// Candidate observations that did not match the control, in execution
    /// order.
    pub fn mismatches(&self) -> &[Observation<T, E>] {
        &self.partition().mismatches
    }

    /// Whether any executed candidate disagreed with the control.
    pub fn mismatched(&self) -> bool {
        !self.mismatches().is_empty()
    }

    fn partition(&self) -> &Partition<T, E> {
        self.partition.get_or_init(|| self.classify())
    }

    fn classify(&self) -> Partition<T, E> {
        let control = self.observations.control();
        let mut candidates = Vec::new();
        let mut mismatches = Vec::new();

        for obs in self.observations.tests() {
            let matched = match &self.comparison {
                // No predicate configured: every executed candidate counts
                // as a match.
                None => true,
                Some(cmp) => {
                    catch_unwind(AssertUnwindSafe(|| cmp(control, obs))).unwrap_or(false)
                }
            };
            if matched {
                candidates.push(obs.clone());
            } else {
                mismatches.push(obs.clone());
            }
        }

        Partition {
            candidates,
            mismatches,
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for ExperimentResult<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentResult")
            .field("observations", &self.observations)
            .field("comparison_configured", &self.comparison.is_some())
            .field("classified", &self.partition.get().is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::observation::{capture, CONTROL_NAME};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn observe(name: &str, value: i32) -> Observation<i32, String> {
        capture(name, Context::new(), move |_| Ok(value))
    }

    fn result_of(
        control_value: i32,
        candidate_values: &[(&str, i32)],
        comparison: Option<Comparison<i32, String>>,
    ) -> ExperimentResult<i32, String> {
        let control = observe(CONTROL_NAME, control_value);
        let tests = candidate_values
            .iter()
            .map(|(name, v)| observe(name, *v))
            .collect();
        ExperimentResult::new(ObservationSet::new(control, tests), comparison)
    }

    fn values_match() -> Comparison<i32, String> {
        Arc::new(|control, candidate| control.value() == candidate.value())
    }

    // -- classification --

    #[test]
    fn test_partition_splits_matches_from_mismatches() {
        let result = result_of(
            42,
            &[("same", 42), ("off-by-one", 43), ("also-same", 42)],
            Some(values_match()),
        );
        let matched: Vec<&str> = result.candidates().iter().map(Observation::name).collect();
        let missed: Vec<&str> = result.mismatches().iter().map(Observation::name).collect();
        assert_eq!(matched, ["same", "also-same"]);
        assert_eq!(missed, ["off-by-one"]);
        assert!(result.mismatched());
    }

    #[test]
    fn test_always_true_comparison_keeps_test_order_in_candidates() {
        let result = result_of(
            0,
            &[("a", 1), ("b", 2), ("c", 3)],
            Some(Arc::new(|_, _| true)),
        );
        let matched: Vec<&str> = result.candidates().iter().map(Observation::name).collect();
        assert_eq!(matched, ["a", "b", "c"]);
        assert!(result.mismatches().is_empty());
    }

    #[test]
    fn test_always_false_comparison_keeps_test_order_in_mismatches() {
        let result = result_of(
            0,
            &[("a", 1), ("b", 2), ("c", 3)],
            Some(Arc::new(|_, _| false)),
        );
        let missed: Vec<&str> = result.mismatches().iter().map(Observation::name).collect();
        assert_eq!(missed, ["a", "b", "c"]);
        assert!(result.candidates().is_empty());
    }

    #[test]
    fn test_no_comparison_means_all_match() {
        let result = result_of(1, &[("a", 2), ("b", 3)], None);
        let matched: Vec<&str> = result.candidates().iter().map(Observation::name).collect();
        assert_eq!(matched, ["a", "b"]);
        assert!(result.mismatches().is_empty());
        assert!(!result.mismatched());
    }

    #[test]
    fn test_no_candidates_yields_empty_partition() {
        let result = result_of(7, &[], Some(values_match()));
        assert!(result.candidates().is_empty());
        assert!(result.mismatches().is_empty());
        assert!(!result.mismatched());
    }

    // -- memoization --

    #[test]
    fn test_comparison_runs_once_per_candidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = Arc::clone(&calls);
            Arc::new(move |c: &Observation<i32, String>, o: &Observation<i32, String>| {
                calls.fetch_add(1, Ordering::SeqCst);
                c.value() == o.value()
            }) as Comparison<i32, String>
        };
        let result = result_of(5, &[("x", 5), ("y", 6)], Some(counted));

        result.mismatches();
        result.candidates();
        result.mismatches();
        result.mismatched();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_control_does_not_trigger_classification() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &Observation<i32, String>, _: &Observation<i32, String>| {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            }) as Comparison<i32, String>
        };
        let result = result_of(1, &[("a", 1)], Some(counted));

        let _ = result.control();
        let _ = result.observations();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        result.candidates();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // -- comparison fault boundary --

    #[test]
    fn test_panicking_comparison_marks_only_its_pair_mismatched() {
        let explosive = Arc::new(
            |_: &Observation<i32, String>, candidate: &Observation<i32, String>| {
                if candidate.name() == "bad" {
                    panic!("comparator bug");
                }
                true
            },
        ) as Comparison<i32, String>;
        let result = result_of(0, &[("good", 0), ("bad", 0), ("fine", 0)], Some(explosive));

        let missed: Vec<&str> = result.mismatches().iter().map(Observation::name).collect();
        let matched: Vec<&str> = result.candidates().iter().map(Observation::name).collect();
        assert_eq!(missed, ["bad"]);
        assert_eq!(matched, ["good", "fine"]);
    }

    #[test]
    fn test_partition_commits_even_when_comparison_panics() {
        let calls = Arc::new(AtomicUsize::new(0));
        let explosive = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &Observation<i32, String>, _: &Observation<i32, String>| -> bool {
                calls.fetch_add(1, Ordering::SeqCst);
                panic!("always broken")
            }) as Comparison<i32, String>
        };
        let result = result_of(0, &[("only", 0)], Some(explosive));

        assert_eq!(result.mismatches().len(), 1);
        assert_eq!(result.mismatches().len(), 1);
        // Memoized despite the fault: the predicate ran exactly once.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // -- partition shape --

    proptest! {
        #[test]
        fn prop_partition_preserves_count_and_order(values in proptest::collection::vec(0i32..4, 0..12)) {
            let named: Vec<(String, i32)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("candidate-{i}"), *v))
                .collect();
            let refs: Vec<(&str, i32)> = named.iter().map(|(n, v)| (n.as_str(), *v)).collect();
            let result = result_of(0, &refs, Some(values_match()));

            prop_assert_eq!(
                result.candidates().len() + result.mismatches().len(),
                values.len()
            );
            // Execution order survives within each half of the partition.
            for half in [result.candidates(), result.mismatches()] {
                let indices: Vec<usize> = half
                    .iter()
                    .map(|o| o.name().trim_start_matches("candidate-").parse().unwrap())
                    .collect();
                let mut sorted = indices.clone();
                sorted.sort_unstable();
                prop_assert_eq!(indices, sorted);
            }
        }
    }
}
