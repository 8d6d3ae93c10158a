//! Effect application.
//!
//! Approved effects are applied to a working copy of the store. Only when
//! every effect succeeds does the copy replace the live store, so a turn is
//! committed completely or not at all.

use loom_core::{
    Catalog, Effect, EntityDelta, EntityId, EntityKey, Placement, Resolver, StateStore,
};

use crate::error::{EngineError, EngineResult};

/// Apply `effects` to a copy of `state` and return the result.
pub fn apply(catalog: &Catalog, state: &StateStore, effects: &[Effect]) -> EngineResult<StateStore> {
    let mut working = state.clone();
    for effect in effects {
        apply_effect(catalog, &mut working, effect)?;
    }
    Ok(working)
}

/// Apply `effects` atomically to `state`.
///
/// On error `state` is left untouched.
pub fn commit(catalog: &Catalog, state: &mut StateStore, effects: &[Effect]) -> EngineResult<()> {
    if effects.is_empty() {
        return Ok(());
    }
    *state = apply(catalog, state, effects)?;
    tracing::debug!(effects = effects.len(), turn = state.turn(), "committed effects");
    Ok(())
}

fn apply_effect(catalog: &Catalog, state: &mut StateStore, effect: &Effect) -> EngineResult<()> {
    let mut refs = Vec::new();
    effect.references(&mut refs);
    if let Some(missing) = refs.iter().find(|key| !catalog.contains(key)) {
        return Err(inconsistent(effect, format!("unknown entity {missing}")));
    }

    match effect {
        Effect::SetFlag { flag, value } => state.set_flag(flag.clone(), value.clone()),
        Effect::ClearFlag(flag) => {
            state.clear_flag(flag);
        }
        Effect::GiveItem(item) => {
            ensure_not_destroyed(catalog, state, effect, item)?;
            state.add_to_inventory(item.clone());
            state.set_item_placement(catalog, item, Placement::Carried);
        }
        Effect::RemoveItem(item) => {
            if state.remove_from_inventory(item) {
                state.set_item_placement(catalog, item, Placement::Limbo);
            } else {
                tracing::debug!(%item, "remove_item on an item that is not carried");
            }
        }
        Effect::DestroyItem(item) => {
            state.remove_from_inventory(item);
            state.set_item_placement(catalog, item, Placement::Destroyed);
        }
        Effect::PlaceItem { item, location } => {
            ensure_not_destroyed(catalog, state, effect, item)?;
            state.remove_from_inventory(item);
            state.set_item_placement(catalog, item, Placement::Location(location.clone()));
        }
        Effect::HandItem { item, character } => {
            ensure_not_destroyed(catalog, state, effect, item)?;
            state.remove_from_inventory(item);
            state.set_item_placement(catalog, item, Placement::Holder(character.clone()));
        }
        Effect::MovePlayer(location) => state.set_location(location.clone()),
        Effect::MoveCharacter {
            character,
            location,
        } => state.set_character_location(catalog, character, location.clone()),
        Effect::AdjustCounter {
            character,
            counter,
            delta,
        } => {
            let current = Resolver::new(catalog, state).counter(character, counter);
            state.set_counter(catalog, character, counter, current.saturating_add(*delta));
        }
        Effect::SetCounter {
            character,
            counter,
            value,
        } => state.set_counter(catalog, character, counter, *value),
        Effect::UnlockExit(exit) => state.set_exit_locked(catalog, exit, false),
        Effect::LockExit(exit) => state.set_exit_locked(catalog, exit, true),
        Effect::RevealExit(exit) => state.set_exit_hidden(catalog, exit, false),
        Effect::HideExit(exit) => state.set_exit_hidden(catalog, exit, true),
        Effect::Describe { kind, id, text } => {
            let key = EntityKey::new(*kind, id.clone());
            if EntityDelta::empty(*kind).is_none() {
                return Err(inconsistent(effect, format!("{kind} descriptions cannot change")));
            }
            state.set_description(catalog, &key, text.clone());
        }
        Effect::CompleteSpoke(spoke) => {
            state.complete_spoke(spoke.clone());
        }
        Effect::AdvanceAct(act) => advance_to(catalog, state, act),
    }
    Ok(())
}

/// Enter every act between the current one and `act`, in order.
///
/// Acts only move forward; advancing to the current or an earlier act does
/// nothing.
fn advance_to(catalog: &Catalog, state: &mut StateStore, act: &EntityId) {
    let acts = catalog.acts();
    let (Some(current), Some(target)) = (
        acts.position(state.act().as_str()),
        acts.position(act.as_str()),
    ) else {
        return;
    };
    if target <= current {
        tracing::debug!(%act, "ignoring advance to an act already passed");
        return;
    }
    let skipped: Vec<EntityId> = acts
        .iter()
        .skip(current + 1)
        .take(target - current)
        .map(|a| a.id.clone())
        .collect();
    for id in skipped {
        state.enter_act(id);
    }
}

fn ensure_not_destroyed(
    catalog: &Catalog,
    state: &StateStore,
    effect: &Effect,
    item: &EntityId,
) -> EngineResult<()> {
    if Resolver::new(catalog, state).item_placement(item) == Placement::Destroyed {
        return Err(inconsistent(effect, format!("item `{item}` was destroyed")));
    }
    Ok(())
}

fn inconsistent(effect: &Effect, reason: String) -> EngineError {
    EngineError::InternalConsistency {
        effect: effect.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use loom_core::{EntityKind, FlagValue};

    use super::*;
    use crate::testing::{id, lighthouse, state_at};

    #[test]
    fn give_and_place_items() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");

        let taken = apply(&catalog, &state, &[Effect::GiveItem(id("lamp"))]).unwrap();
        assert!(taken.has_item(&id("lamp")));
        let resolver = Resolver::new(&catalog, &taken);
        assert!(resolver.items_at(&id("dock")).iter().all(|i| i.id != id("lamp")));

        let dropped = apply(
            &catalog,
            &taken,
            &[Effect::PlaceItem {
                item: id("lamp"),
                location: id("dock"),
            }],
        )
        .unwrap();
        // Back where it was authored, so nothing is stored.
        assert_eq!(dropped.deltas().len(), 0);
        assert_eq!(dropped.inventory(), &[id("iron_key")]);
    }

    #[test]
    fn counters_accumulate_and_prune() {
        let catalog = lighthouse();
        let state = StateStore::new(&catalog);
        let adjust = |delta| Effect::AdjustCounter {
            character: id("jenkins"),
            counter: "trust".to_string(),
            delta,
        };
        let up = apply(&catalog, &state, &[adjust(1), adjust(1)]).unwrap();
        assert_eq!(Resolver::new(&catalog, &up).counter(&id("jenkins"), "trust"), 2);

        let back = apply(&catalog, &up, &[adjust(-2)]).unwrap();
        assert!(back.counters().is_empty());
    }

    #[test]
    fn failure_leaves_state_untouched() {
        let catalog = lighthouse();
        let mut state = StateStore::new(&catalog);
        let before = state.clone();
        let effects = [
            Effect::SetFlag {
                flag: "explored_dock".to_string(),
                value: FlagValue::Bool(true),
            },
            Effect::MovePlayer(id("atlantis")),
        ];
        let err = commit(&catalog, &mut state, &effects).unwrap_err();
        assert!(matches!(err, EngineError::InternalConsistency { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn destroyed_items_cannot_come_back() {
        let catalog = lighthouse();
        let state = StateStore::new(&catalog);
        let gone = apply(&catalog, &state, &[Effect::DestroyItem(id("lamp"))]).unwrap();
        assert_eq!(
            Resolver::new(&catalog, &gone).item_placement(&id("lamp")),
            Placement::Destroyed
        );
        assert!(apply(&catalog, &gone, &[Effect::GiveItem(id("lamp"))]).is_err());
    }

    #[test]
    fn exits_and_descriptions() {
        let catalog = lighthouse();
        let state = StateStore::new(&catalog);
        let next = apply(
            &catalog,
            &state,
            &[
                Effect::UnlockExit(id("stair_up")),
                Effect::RevealExit(id("cellar_hatch")),
                Effect::Describe {
                    kind: EntityKind::Location,
                    id: id("dock"),
                    text: "Empty.".to_string(),
                },
            ],
        )
        .unwrap();
        let resolver = Resolver::new(&catalog, &next);
        assert!(!resolver.exit("stair_up").unwrap().locked);
        assert!(!resolver.exit("cellar_hatch").unwrap().hidden);
        assert_eq!(resolver.location("dock").unwrap().description, "Empty.");
        assert_eq!(next.delta_field_count(), 3);
    }

    #[test]
    fn act_advance_is_forward_only() {
        let catalog = lighthouse();
        let state = StateStore::new(&catalog);
        let next = apply(&catalog, &state, &[Effect::AdvanceAct(id("act2"))]).unwrap();
        assert_eq!(next.act(), &id("act2"));
        assert_eq!(next.reached_acts(), &[id("act1"), id("act2")]);

        let again = apply(&catalog, &next, &[Effect::AdvanceAct(id("act1"))]).unwrap();
        assert_eq!(again.act(), &id("act2"));
    }

    #[test]
    fn remove_item_sends_it_to_limbo() {
        let catalog = lighthouse();
        let state = StateStore::new(&catalog);
        let taken = apply(&catalog, &state, &[Effect::GiveItem(id("lamp"))]).unwrap();
        let removed = apply(&catalog, &taken, &[Effect::RemoveItem(id("lamp"))]).unwrap();
        assert!(!removed.has_item(&id("lamp")));
        assert_eq!(
            Resolver::new(&catalog, &removed).item_placement(&id("lamp")),
            Placement::Limbo
        );
    }
}
