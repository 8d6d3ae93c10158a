//! The act state machine and the victory check.
//!
//! Acts run strictly forward in declaration order. After each turn's beats
//! the current act's newly satisfied spokes are recorded for good, and if
//! the act's gate holds the machine moves on exactly once: the gate beat
//! fires, then the next act is entered.

use loom_core::definition::{ActDef, VictoryDef};
use loom_core::{Catalog, EntityId, Resolver, StateStore};
use serde::Serialize;

use crate::beats::{self, FiredBeat};
use crate::error::EngineResult;

/// A completed act transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActTransition {
    /// The act left behind.
    pub from: EntityId,
    /// The act entered.
    pub to: EntityId,
    /// Display name of the act entered.
    pub name: Option<String>,
    /// The gate beat, if the act declared one.
    pub gate_beat: Option<FiredBeat>,
    /// Guidance for the prose collaborator.
    pub narrative: Option<String>,
}

/// Record the current act's spokes whose conditions now hold.
///
/// Returns the spokes recorded this call.
pub fn record_spokes(catalog: &Catalog, state: &mut StateStore) -> Vec<EntityId> {
    let satisfied: Vec<EntityId> = {
        let resolver = Resolver::new(catalog, state);
        catalog
            .spokes_of(state.act().as_str())
            .filter(|s| !state.spoke_completed(&s.id) && resolver.evaluate(&s.condition))
            .map(|s| s.id.clone())
            .collect()
    };
    for spoke in &satisfied {
        tracing::info!(%spoke, "spoke completed");
        state.complete_spoke(spoke.clone());
    }
    satisfied
}

/// Whether the act's gate holds.
///
/// Without an explicit gate, every spoke of the act must be satisfied. An
/// act with neither gate nor spokes never closes on its own.
pub fn gate_holds(catalog: &Catalog, state: &StateStore, act: &ActDef) -> bool {
    let resolver = Resolver::new(catalog, state);
    match &act.gate {
        Some(gate) => resolver.evaluate(gate),
        None => {
            let mut spokes = catalog.spokes_of(act.id.as_str()).peekable();
            spokes.peek().is_some() && spokes.all(|s| resolver.spoke_satisfied(&s.id))
        }
    }
}

/// Advance to the next act if the current gate holds.
pub fn advance(catalog: &Catalog, state: &mut StateStore) -> EngineResult<Option<ActTransition>> {
    let Some(current) = catalog.acts().get(state.act().as_str()) else {
        return Ok(None);
    };
    let Some(next) = catalog.next_act(current.id.as_str()) else {
        return Ok(None);
    };
    if !gate_holds(catalog, state, current) {
        return Ok(None);
    }

    let pending = current
        .gate_beat
        .as_ref()
        .and_then(|id| catalog.beats().get(id.as_str()))
        .filter(|beat| !state.beat_fired(&beat.id));
    let gate_beat = pending
        .map(|beat| beats::fire(catalog, state, beat))
        .transpose()?;
    state.enter_act(next.id.clone());
    tracing::info!(from = %current.id, to = %next.id, "act transition");

    Ok(Some(ActTransition {
        from: current.id.clone(),
        to: next.id.clone(),
        name: next.name.clone(),
        gate_beat,
        narrative: next.narrative.clone(),
    }))
}

/// Record and return the first victory condition that now holds.
///
/// A session is won at most once.
pub fn check_victory<'c>(catalog: &'c Catalog, state: &mut StateStore) -> Option<&'c VictoryDef> {
    if state.victory().is_some() {
        return None;
    }
    let won = {
        let resolver = Resolver::new(catalog, state);
        catalog.victory().iter().find(|v| resolver.evaluate(&v.condition))
    }?;
    tracing::info!(victory = %won.id, "victory");
    state.set_victory(won.id.clone());
    Some(won)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::testing::{id, lighthouse, state_at};

    fn trust(state: &mut StateStore, catalog: &Catalog, value: i64) {
        state.set_counter(catalog, &id("jenkins"), "trust", value);
    }

    #[test]
    fn spokes_stay_completed() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "dock");
        state.set_flag("explored_dock", true.into());
        assert_eq!(record_spokes(&catalog, &mut state), vec![id("spoke_explore")]);

        state.clear_flag("explored_dock");
        assert!(record_spokes(&catalog, &mut state).is_empty());
        assert!(Resolver::new(&catalog, &state).spoke_satisfied(&id("spoke_explore")));
    }

    #[test]
    fn gate_opens_once() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "cottage");
        state.set_flag("explored_dock", true.into());
        assert!(advance(&catalog, &mut state).unwrap().is_none());

        trust(&mut state, &catalog, 2);
        let transition = advance(&catalog, &mut state).unwrap().unwrap();
        assert_eq!(transition.from, id("act1"));
        assert_eq!(transition.to, id("act2"));
        assert_eq!(transition.gate_beat.map(|b| b.id), Some(id("gate_open")));
        assert_eq!(state.act(), &id("act2"));
        assert!(Resolver::new(&catalog, &state).reachable_locations().contains(&id("lantern")));
        let stair = Resolver::new(&catalog, &state).exit("stair_up").unwrap();
        assert!(!stair.locked);

        // The final act has nowhere to go.
        assert!(advance(&catalog, &mut state).unwrap().is_none());
    }

    #[test]
    fn victory_is_recorded_once() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "lantern");
        assert!(check_victory(&catalog, &mut state).is_none());
        state.set_flag("lamp_lit", true.into());
        assert_eq!(check_victory(&catalog, &mut state).map(|v| v.id.clone()), Some(id("light_restored")));
        assert_eq!(state.victory(), Some(&id("light_restored")));
        assert!(check_victory(&catalog, &mut state).is_none());
    }

    proptest! {
        #[test]
        fn reached_acts_stay_reachable(steps in proptest::collection::vec((any::<bool>(), 0i64..4), 1..12)) {
            let catalog = lighthouse();
            let mut state = state_at(&catalog, "cottage");
            let mut entered = false;
            for (explored, value) in steps {
                if explored {
                    state.set_flag("explored_dock", true.into());
                } else {
                    state.clear_flag("explored_dock");
                }
                trust(&mut state, &catalog, value);
                record_spokes(&catalog, &mut state);
                advance(&catalog, &mut state).unwrap();

                let reachable = Resolver::new(&catalog, &state).reachable_locations();
                if entered {
                    prop_assert_eq!(state.act(), &id("act2"));
                    prop_assert!(reachable.contains(&id("lantern")));
                }
                entered |= reachable.contains(&id("lantern"));
            }
            let fired = state.fired_beats().iter().filter(|b| b.as_str() == "gate_open").count();
            prop_assert!(fired <= 1);
        }
    }
}
