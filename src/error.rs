//! Error taxonomy for the layout engine.
//!
//! Three failure classes exist, and they are handled very differently:
//!
//! - [`EngineError::Invariant`] — a precondition violated by the caller
//!   (empty segment list, layout requested before validation).  Fatal for
//!   the current measure; never silently recovered.
//! - [`EngineError::Deferred`] — a model cannot fully validate because
//!   prerequisite context (e.g. divisions per quarter note) is not yet
//!   known.  Recoverable: the model stays in a provisional state and is
//!   revisited once the prerequisite becomes available in the same pass.
//! - [`EngineError::UnknownType`] — the factory was asked for a model
//!   kind with no registered constructor.  Fatal at the call site.

use thiserror::Error;

use crate::model::ModelKind;

/// Errors produced by validation, layout and model construction.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A caller-side precondition was violated.  Aborts the current
    /// measure's processing.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Prerequisite context is missing; validation is left provisional
    /// and should be retried once the named prerequisite is known.
    #[error("validation deferred: missing {0}")]
    Deferred(&'static str),

    /// No constructor is registered for this model kind.
    #[error("unknown model type: {0}")]
    UnknownType(ModelKind),

    /// A raw model spec could not be decoded, or a model could not be
    /// written back to its serialized form.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// True for the recoverable deferred-validation signal.
    pub fn is_deferred(&self) -> bool {
        matches!(self, EngineError::Deferred(_))
    }
}
