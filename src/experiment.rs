//! # Experiment Orchestrator
//!
//! ## Responsibility
//! Run the control and any sampled-in candidates for one invocation, collect
//! their observations, and hand the assembled result to the publishers.
//!
//! ## Guarantees
//! - The caller receives exactly the control's outcome. Candidate behavior,
//!   comparison results and publisher failures never change it.
//! - The control runs on every invocation. Candidates run only when the
//!   sampling decision says so: disabled wins over everything, test mode
//!   wins over the percentage draw.
//! - Before-filters run once per invocation; every variant receives a clone
//!   of the same filtered context.
//! - [`run`] itself never fails: every variant fault is captured into that
//!   variant's observation.
//!
//! [`run`]: Experiment::run

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rand::Rng;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::context::Context;
use crate::error::VariantError;
use crate::observation::{capture, Observation, ObservationSet, CONTROL_NAME};
use crate::result::ExperimentResult;

type VariantFn<T, E> = Arc<dyn Fn(Context) -> Result<T, E> + Send + Sync>;

// ---------------------------------------------------------------------------
// Experiment
// ---------------------------------------------------------------------------

/// A configured experiment: one control plus any number of named candidates.
pub struct Experiment<T, E> {
    config: Config<T, E>,
    control: VariantFn<T, E>,
    candidates: Vec<(String, VariantFn<T, E>)>,
}

impl<T, E> Experiment<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// An experiment around an existing, trusted code path.
    pub fn new<F>(config: Config<T, E>, control: F) -> Self
    where
        F: Fn(Context) -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            config,
            control: Arc::new(control),
            candidates: Vec::new(),
        }
    }

    /// Register a named candidate. Chainable; candidates run and are
    /// reported in registration order.
    pub fn candidate<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context) -> Result<T, E> + Send + Sync + 'static,
    {
        self.candidates.push((name.into(), Arc::new(f)));
        self
    }

    pub fn config(&self) -> &Config<T, E> {
        &self.config
    }

    /// Execute one invocation and return the control's outcome.
    ///
    /// The context is passed through the configured before-filters once,
    /// then cloned into every variant. All variants of the run execute
    /// concurrently on blocking tasks; `run` resolves after every one of
    /// them has reported back, with publishers dispatched fire-and-forget.
    pub async fn run(&self, ctx: Context) -> Result<T, VariantError<E>> {
        let ctx = self.config.apply_filters(ctx);
        let run_candidates = self.should_run_candidates();

        let candidate_handles: Vec<(String, JoinHandle<Observation<T, E>>)> = if run_candidates {
            self.candidates
                .iter()
                .map(|(name, f)| {
                    (
                        name.clone(),
                        spawn_observation(name.clone(), Arc::clone(f), ctx.clone()),
                    )
                })
                .collect()
        } else {
            tracing::debug!(
                target: "labrat::experiment",
                experiment = %self.config.name,
                enabled = self.config.enabled,
                "candidates skipped for this invocation"
            );
            Vec::new()
        };
        let control_handle = spawn_observation(
            CONTROL_NAME.to_string(),
            Arc::clone(&self.control),
            ctx.clone(),
        );

        let control = join_observation(CONTROL_NAME, control_handle).await;
        let mut tests = Vec::with_capacity(candidate_handles.len());
        for (name, handle) in candidate_handles {
            tests.push(join_observation(&name, handle).await);
        }

        // The caller's outcome is fixed here, before comparison or
        // publishing can run.
        let outcome = match (control.value(), control.error()) {
            (Some(v), None) => Ok(v.clone()),
            (_, Some(e)) => Err(e.clone()),
            (None, None) => Err(VariantError::Panicked(
                "control produced neither value nor error".to_string(),
            )),
        };

        let result = Arc::new(ExperimentResult::new(
            ObservationSet::new(control, tests),
            self.config.comparison.clone(),
        ));
        self.dispatch_publishers(result);

        outcome
    }

    /// Sampling decision for one invocation. Disabled beats test mode beats
    /// the percentage draw.
    fn should_run_candidates(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        if self.config.test_mode {
            return true;
        }
        rand::thread_rng().gen_range(0.0..100.0) < self.config.percentage
    }

    /// Hand the result to every publisher on its own detached task. A
    /// panicking publisher is contained and logged; nothing waits on them.
    fn dispatch_publishers(&self, result: Arc<ExperimentResult<T, E>>) {
        for publisher in &self.config.publishers {
            let publisher = Arc::clone(publisher);
            let result = Arc::clone(&result);
            let experiment = self.config.name.clone();
            tokio::spawn(async move {
                let dispatched =
                    catch_unwind(AssertUnwindSafe(|| publisher.publish(&experiment, &result)));
                if dispatched.is_err() {
                    tracing::warn!(
                        target: "labrat::experiment",
                        experiment = %experiment,
                        "publisher panicked; result dropped for this publisher"
                    );
                }
            });
        }
    }
}

/// Run one variant on a blocking task, inside the per-variant fault boundary.
fn spawn_observation<T, E>(
    name: String,
    f: VariantFn<T, E>,
    ctx: Context,
) -> JoinHandle<Observation<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    tokio::task::spawn_blocking(move || capture(&name, ctx, |c| f(c)))
}

/// Await a variant task. The fault boundary lives inside the task, so a
/// join error only means the runtime dropped it (shutdown, cancellation).
async fn join_observation<T, E>(
    name: &str,
    handle: JoinHandle<Observation<T, E>>,
) -> Observation<T, E> {
    match handle.await {
        Ok(obs) => obs,
        Err(err) => Observation::from_join_failure(name, err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
