//! # labrat — controlled experiments on live code paths
//!
//! Validate a new code path (the "candidate") against an existing, trusted
//! one (the "control") on real traffic. Both run, both are observed, the
//! observations are compared and reported — and the caller always receives
//! exactly the control's outcome, no matter what the candidates did.
//!
//! ```rust,ignore
//! use labrat::{Config, Context, Experiment, LogPublisher};
//!
//! let experiment = Experiment::new(
//!     Config::new("user-lookup-rewrite")
//!         .percentage(25.0)
//!         .compare(|control, candidate| control.value() == candidate.value())
//!         .publish(LogPublisher),
//!     |ctx| lookup_user_old(&ctx),
//! )
//! .candidate("rewrite", |ctx| lookup_user_new(&ctx));
//!
//! // Returns lookup_user_old's outcome, always.
//! let user = experiment.run(Context::new()).await?;
//! ```
//!
//! Candidate panics, slow candidates, failing comparisons and failing
//! publishers are all contained at their own fault boundaries; none of them
//! can change what the caller sees.

pub mod config;
pub mod context;
pub mod error;
pub mod experiment;
pub mod observation;
pub mod publish;
pub mod result;

pub use config::{BeforeFilter, Comparison, Config, ConfigSummary, DEFAULT_PERCENTAGE};
pub use context::Context;
pub use error::VariantError;
pub use experiment::Experiment;
pub use observation::{Observation, ObservationSet, CONTROL_NAME};
pub use publish::{LogPublisher, Publisher};
pub use result::ExperimentResult;
