//! # Variant Errors
//!
//! The failure side of an observation: either the variant function's own
//! error value, or a panic captured at the per-variant fault boundary. The
//! engine never interprets either — they are recorded and, for the control
//! only, surfaced to the caller unchanged.

use std::any::Any;

use thiserror::Error;

/// Why a variant execution did not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariantError<E> {
    /// The variant function returned an error. For the control variant this
    /// is exactly what the caller receives from [`crate::Experiment::run`].
    #[error("{0}")]
    Returned(E),

    /// The variant function panicked. The payload was converted to a string
    /// at the fault boundary; the panic never crosses it.
    #[error("variant panicked: {0}")]
    Panicked(String),
}

impl<E> VariantError<E> {
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// The variant's own error value, if it returned one.
    pub fn returned(&self) -> Option<&E> {
        match self {
            Self::Returned(e) => Some(e),
            Self::Panicked(_) => None,
        }
    }

    pub fn into_returned(self) -> Option<E> {
        match self {
            Self::Returned(e) => Some(e),
            Self::Panicked(_) => None,
        }
    }
}

/// Extract a readable message from a panic payload. Panics raised via
/// `panic!("...")` carry a `&str` or `String`; anything else is opaque.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
