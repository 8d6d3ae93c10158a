//! Shared fixtures for unit tests.

use loom_core::{Catalog, EntityId, StateStore};
use loom_loader::Format;

/// The lighthouse world shared with the integration tests.
pub(crate) const LIGHTHOUSE: &str = include_str!("../tests/fixtures/lighthouse.toml");

/// [`LIGHTHOUSE`] built into a catalog.
pub(crate) fn lighthouse() -> Catalog {
    loom_loader::load_str(LIGHTHOUSE, Format::Toml).expect("fixture world is valid")
}

/// A fresh state with the player moved to `location`.
pub(crate) fn state_at(catalog: &Catalog, location: &str) -> StateStore {
    let mut state = StateStore::new(catalog);
    state.set_location(EntityId::new(location));
    state
}

/// Shorthand for an identifier.
pub(crate) fn id(s: &str) -> EntityId {
    EntityId::new(s)
}
