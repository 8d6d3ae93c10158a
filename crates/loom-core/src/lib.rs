//! Core types for Storyloom: the catalog, runtime state, and persistence.
//!
//! Authored content lives in an immutable [`Catalog`]. Everything that
//! changes during play lives in a [`StateStore`] as sparse overrides, and
//! the two only meet inside the [`Resolver`]. The engine crate builds the
//! turn pipeline on top of these types.

/// Identifier-keyed lookup tables and the validated world catalog.
pub mod catalog;
/// Boolean expressions over session state.
pub mod condition;
/// Authored entity definitions and world documents.
pub mod definition;
/// Sparse runtime overrides of catalog entities.
pub mod delta;
/// Declared state mutations.
pub mod effect;
/// Entity identifiers, kinds, keys and flag values.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// The load-time referential-integrity pass.
pub mod integrity;
/// Save files and catalog-version migration.
pub mod persist;
/// Effective-state queries over catalog plus deltas.
pub mod resolver;
/// The per-session mutable store.
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

/// Re-export catalog types.
pub use catalog::{Catalog, Table};
/// Re-export condition and effect types.
pub use condition::{Comparison, Condition};
pub use effect::Effect;
/// Re-export delta types.
pub use delta::{EntityDelta, Placement};
/// Re-export entity types.
pub use entity::{EntityId, EntityKey, EntityKind, FlagValue};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
pub use integrity::IntegrityError;
/// Re-export persistence types.
pub use persist::{SAVE_FORMAT, SaveGame};
/// Re-export resolver types.
pub use resolver::{ResolvedEntity, Resolver};
/// Re-export the state store.
pub use state::StateStore;
