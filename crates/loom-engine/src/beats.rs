//! Story beat detection.
//!
//! Runs once per committed turn. Every non-gate beat is evaluated against
//! the same post-commit state, in declaration order, and the satisfied ones
//! then fire in that order. Effects of a beat fired this turn are not seen
//! by the other beats until the next turn.

use loom_core::definition::BeatDef;
use loom_core::{Catalog, Effect, EntityId, Resolver, StateStore};
use serde::Serialize;

use crate::applicator;
use crate::error::EngineResult;

/// A beat that fired this turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiredBeat {
    /// Beat identifier.
    pub id: EntityId,
    /// Display name.
    pub name: Option<String>,
    /// Effects it committed.
    pub effects: Vec<Effect>,
    /// Guidance for the prose collaborator.
    pub narrative: Option<String>,
}

/// Evaluate and fire due beats.
pub fn detect(catalog: &Catalog, state: &mut StateStore) -> EngineResult<Vec<FiredBeat>> {
    let mut due = Vec::new();
    let mut latches = Vec::new();
    {
        let resolver = Resolver::new(catalog, state);
        for beat in catalog.beats() {
            if catalog.is_gate_beat(beat.id.as_str()) {
                continue;
            }
            let holds = resolver.evaluate(&beat.trigger);
            if beat.repeatable {
                // Fire on the rising edge only; re-arm once the trigger lapses.
                if holds && !state.beat_latched(&beat.id) {
                    due.push(beat);
                }
                latches.push((&beat.id, holds));
            } else if holds && !state.beat_fired(&beat.id) {
                due.push(beat);
            }
        }
    }

    let mut fired = Vec::with_capacity(due.len());
    for beat in due {
        fired.push(fire(catalog, state, beat)?);
    }
    for (beat, latched) in latches {
        state.set_beat_latch(beat, latched);
    }
    Ok(fired)
}

/// Commit a beat's effects and record it as fired.
pub fn fire(catalog: &Catalog, state: &mut StateStore, beat: &BeatDef) -> EngineResult<FiredBeat> {
    applicator::commit(catalog, state, &beat.effects)?;
    state.mark_beat_fired(beat.id.clone());
    tracing::info!(beat = %beat.id, effects = beat.effects.len(), "beat fired");
    Ok(FiredBeat {
        id: beat.id.clone(),
        name: beat.name.clone(),
        effects: beat.effects.clone(),
        narrative: beat.narrative.clone(),
    })
}

#[cfg(test)]
mod tests {
    use loom_core::{EntityKey, EntityKind};

    use super::*;
    use crate::testing::{id, lighthouse, state_at};

    fn ids(fired: &[FiredBeat]) -> Vec<&str> {
        fired.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn beats_fire_once() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "cottage");

        let first = detect(&catalog, &mut state).unwrap();
        assert_eq!(ids(&first), ["meet_jenkins"]);
        assert!(state.flag("met_jenkins").is_some());

        let again = detect(&catalog, &mut state).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn gate_beats_are_left_to_the_act_controller() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "path");
        // gate_open has an always-true trigger.
        let fired = detect(&catalog, &mut state).unwrap();
        assert!(fired.is_empty());
        assert!(!state.beat_fired(&id("gate_open")));
    }

    #[test]
    fn repeatable_beats_fire_on_each_arrival() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "dock");

        assert_eq!(ids(&detect(&catalog, &mut state).unwrap()), ["gull_cry"]);
        // Still on the dock: latched.
        assert!(detect(&catalog, &mut state).unwrap().is_empty());

        state.set_location(id("path"));
        assert!(detect(&catalog, &mut state).unwrap().is_empty());
        state.set_location(id("dock"));
        assert_eq!(ids(&detect(&catalog, &mut state).unwrap()), ["gull_cry"]);
    }

    #[test]
    fn beat_effects_are_committed() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "path");
        state.set_flag("letter_read", true.into());

        let fired = detect(&catalog, &mut state).unwrap();
        assert_eq!(ids(&fired), ["storm_gathers"]);
        let dock = EntityKey::new(EntityKind::Location, "dock");
        assert_eq!(
            state.delta(&dock).and_then(|d| d.description()),
            Some("Storm clouds pile up over the dock.")
        );
    }
}
