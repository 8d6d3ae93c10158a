//! Error types for the turn pipeline.

use loom_core::CoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal engine errors.
///
/// Per-turn refusals are not errors; they come back as
/// [`Verdict`](crate::validator::Verdict) values and player-facing text.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A catalog, resolver or persistence error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An approved effect could not be applied; nothing was committed.
    #[error("internal consistency error applying {effect}: {reason}")]
    InternalConsistency {
        /// Rendered effect.
        effect: String,
        /// Why it failed.
        reason: String,
    },

    /// The engine configuration could not be parsed.
    #[error("invalid engine config: {0}")]
    Config(#[from] toml::de::Error),
}
