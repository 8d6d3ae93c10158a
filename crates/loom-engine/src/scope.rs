//! What the player can see and touch from where they stand.

use loom_core::definition::InteractionDef;
use loom_core::{EntityKey, EntityKind, Placement, Resolver, StateStore};

/// Whether an interaction is offered at the player's location.
pub(crate) fn interaction_in_scope(def: &InteractionDef, state: &StateStore) -> bool {
    def.location
        .as_ref()
        .is_none_or(|location| location == state.location())
}

/// Whether a non-repeatable interaction has already run.
pub(crate) fn interaction_spent(def: &InteractionDef, state: &StateStore) -> bool {
    !def.repeatable && state.interaction_used(&def.id)
}

/// Whether an interaction could run right now, ignoring its target.
pub(crate) fn interaction_ready(def: &InteractionDef, resolver: &Resolver<'_>) -> bool {
    let state = resolver.state();
    interaction_in_scope(def, state)
        && !interaction_spent(def, state)
        && def.requires.as_ref().is_none_or(|c| resolver.evaluate(c))
}

/// Whether the entity is present for the player to act on.
pub(crate) fn is_present(resolver: &Resolver<'_>, key: &EntityKey) -> bool {
    let here = resolver.state().location();
    match key.kind {
        EntityKind::Location => &key.id == here,
        EntityKind::Item => match resolver.item_placement(&key.id) {
            Placement::Carried => true,
            Placement::Location(location) => &location == here,
            _ => false,
        },
        EntityKind::Character => resolver
            .characters_at(here)
            .iter()
            .any(|c| c.id == key.id),
        EntityKind::Exit => resolver
            .exit(key.id.as_str())
            .is_some_and(|exit| &exit.from == here && resolver.exit_visible(&exit)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id, lighthouse, state_at};

    #[test]
    fn presence_follows_location() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "cottage");
        let resolver = Resolver::new(&catalog, &state);
        assert!(is_present(&resolver, &EntityKey::character("jenkins")));
        assert!(is_present(&resolver, &EntityKey::item("letter")));
        assert!(is_present(&resolver, &EntityKey::item("iron_key")));
        assert!(!is_present(&resolver, &EntityKey::item("lamp")));
        assert!(is_present(&resolver, &EntityKey::location("cottage")));
    }

    #[test]
    fn hidden_exits_are_not_present() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "base");
        let resolver = Resolver::new(&catalog, &state);
        assert!(is_present(&resolver, &EntityKey::exit("base_south")));
        assert!(!is_present(&resolver, &EntityKey::exit("cellar_hatch")));
    }

    #[test]
    fn interaction_scope_and_use() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "dock");
        let survey = catalog.interactions().get("survey_dock").unwrap();
        assert!(interaction_ready(survey, &Resolver::new(&catalog, &state)));

        state.mark_interaction_used(id("survey_dock"));
        assert!(interaction_spent(survey, &state));
        assert!(!interaction_ready(survey, &Resolver::new(&catalog, &state)));

        let state = state_at(&catalog, "path");
        assert!(!interaction_in_scope(survey, &state));
    }
}
