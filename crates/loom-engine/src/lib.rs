//! The Storyloom turn pipeline.
//!
//! Each line of player input runs through the same stages: the intent
//! interpreter maps it to a structured [`Intent`], the planner looks up the
//! effects it would produce, the validator approves or refuses them, the
//! applicator commits them, the beat detector and act controller react to
//! the new state, and the narration gateway turns the result into text.
//! [`GameSession`] drives the whole pipeline.

/// The act state machine and victory check.
pub mod acts;
/// Atomic effect application.
pub mod applicator;
/// Story beat detection.
pub mod beats;
/// Engine configuration.
pub mod config;
/// Error types for the engine.
pub mod error;
/// Free text to structured intents.
pub mod intent;
/// Narration requests, the collaborator contract and template fallback.
pub mod narration;
/// Intent to effect planning.
pub mod planner;
/// Game sessions and the per-turn pipeline.
pub mod session;
/// Intent validation and the safety check.
pub mod validator;

mod scope;

#[cfg(test)]
pub(crate) mod testing;

pub use acts::ActTransition;
pub use beats::FiredBeat;
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use intent::{Intent, IntentCollaborator, Interpretation, Interpreter};
pub use narration::{Narration, NarrationGateway, NarrationRequest, NarrationSource, Narrator};
pub use planner::Plan;
pub use session::{GameSession, SessionHandle, SessionStatus, TurnOutcome, TurnStatus};
pub use validator::{Rejection, RejectionCode, Verdict};
