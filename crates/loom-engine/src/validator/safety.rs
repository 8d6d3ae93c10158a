//! Can the player still win?
//!
//! Starting from a candidate state, an [`Outlook`] collects everything that
//! could still happen: flags that could be set, items that could be
//! obtained, places that could be visited, exits that could open, and so
//! on. Interactions and beats whose conditions could hold contribute their
//! effects, and the process repeats until nothing new is learned. The
//! result over-approximates the future, so a victory condition the outlook
//! cannot satisfy is out of reach for good.
//!
//! Negated conditions are always treated as satisfiable, and removals are
//! never tracked.

use std::collections::BTreeSet;

use loom_core::definition::{ActDef, InteractionDef, InteractionKind};
use loom_core::{
    Catalog, Comparison, Condition, Effect, EntityId, EntityKey, EntityKind, FlagValue, Placement,
    Resolver, StateStore,
};

/// Whether some declared victory condition is still reachable from `state`.
///
/// Worlds without victory conditions, and sessions already won, always pass.
pub fn victory_reachable(catalog: &Catalog, state: &StateStore) -> bool {
    if catalog.victory().is_empty() || state.victory().is_some() {
        return true;
    }
    let resolver = Resolver::new(catalog, state);
    if catalog.victory().iter().any(|v| resolver.evaluate(&v.condition)) {
        return true;
    }
    let outlook = Outlook::explore(resolver);
    let reachable = catalog.victory().iter().any(|v| outlook.may(&v.condition));
    tracing::trace!(reachable, visitable = outlook.visitable.len(), "victory outlook");
    reachable
}

/// Everything that may still come about.
#[derive(Debug)]
struct Outlook<'a> {
    resolver: Resolver<'a>,
    /// Index of the furthest act that may be reached.
    furthest_act: usize,
    /// Locations inside the reachable act bounds.
    bounds: BTreeSet<EntityId>,
    visitable: BTreeSet<EntityId>,
    truthy_flags: BTreeSet<String>,
    flag_values: Vec<(String, FlagValue)>,
    obtainable: BTreeSet<EntityId>,
    placements: BTreeSet<(EntityId, EntityId)>,
    character_moves: BTreeSet<(EntityId, EntityId)>,
    opened: BTreeSet<EntityId>,
    shown: BTreeSet<EntityId>,
    raised: BTreeSet<(EntityId, String)>,
    lowered: BTreeSet<(EntityId, String)>,
    counter_values: BTreeSet<(EntityId, String, i64)>,
    spokes: BTreeSet<EntityId>,
    beats: BTreeSet<EntityId>,
    interactions: BTreeSet<EntityId>,
}

impl<'a> Outlook<'a> {
    fn explore(resolver: Resolver<'a>) -> Self {
        let catalog = resolver.catalog();
        let state = resolver.state();
        let furthest_act = catalog.acts().position(state.act().as_str()).unwrap_or(0);
        let mut outlook = Self {
            furthest_act,
            bounds: resolver.reachable_locations(),
            visitable: BTreeSet::from([state.location().clone()]),
            truthy_flags: BTreeSet::new(),
            flag_values: Vec::new(),
            obtainable: state.inventory().iter().cloned().collect(),
            placements: BTreeSet::new(),
            character_moves: BTreeSet::new(),
            opened: BTreeSet::new(),
            shown: BTreeSet::new(),
            raised: BTreeSet::new(),
            lowered: BTreeSet::new(),
            counter_values: BTreeSet::new(),
            spokes: state.completed_spokes().clone(),
            beats: state.fired_beats().iter().cloned().collect(),
            interactions: state.used_interactions().clone(),
            resolver,
        };

        let mut rounds = 0;
        loop {
            let before = outlook.size();
            outlook.walk_exits();
            outlook.collect_items();
            outlook.run_interactions();
            outlook.run_beats();
            outlook.pass_gates();
            rounds += 1;
            if outlook.size() == before {
                break;
            }
        }
        tracing::trace!(rounds, "outlook settled");
        outlook
    }

    fn size(&self) -> usize {
        self.furthest_act
            + self.bounds.len()
            + self.visitable.len()
            + self.truthy_flags.len()
            + self.flag_values.len()
            + self.obtainable.len()
            + self.placements.len()
            + self.character_moves.len()
            + self.opened.len()
            + self.shown.len()
            + self.raised.len()
            + self.lowered.len()
            + self.counter_values.len()
            + self.spokes.len()
            + self.beats.len()
            + self.interactions.len()
    }

    // -----------------------------------------------------------------------
    // Exploration steps
    // -----------------------------------------------------------------------

    fn walk_exits(&mut self) {
        let resolver = &self.resolver;
        let mut found = Vec::new();
        for exit in resolver.catalog().exits() {
            if !self.visitable.contains(&exit.from) || !self.bounds.contains(&exit.to) {
                continue;
            }
            let Some(exit) = resolver.exit(exit.id.as_str()) else {
                continue;
            };
            let visible = (!exit.hidden || self.shown.contains(&exit.id))
                && exit.visible_when.as_ref().is_none_or(|c| self.may(c));
            let open = (!exit.locked || self.opened.contains(&exit.id))
                && exit.open_when.as_ref().is_none_or(|c| self.may(c));
            if visible && open {
                found.push(exit.to);
            }
        }
        self.visitable.extend(found);
    }

    fn collect_items(&mut self) {
        let items = self.resolver.catalog().items();
        let found: Vec<EntityId> = items
            .iter()
            .filter(|item| item.portable && self.lies_visitable(&item.id))
            .map(|item| item.id.clone())
            .collect();
        let placed: Vec<EntityId> = self
            .placements
            .iter()
            .filter(|(item, location)| {
                self.visitable.contains(location)
                    && items.get(item.as_str()).is_some_and(|def| def.portable)
            })
            .map(|(item, _)| item.clone())
            .collect();
        self.obtainable.extend(found);
        self.obtainable.extend(placed);
    }

    fn run_interactions(&mut self) {
        let catalog = self.resolver.catalog();
        let state = self.resolver.state();
        let mut effects = Vec::new();
        let mut ran = Vec::new();
        for interaction in catalog.interactions() {
            if self.interactions.contains(&interaction.id) && !interaction.repeatable {
                continue;
            }
            if !interaction.repeatable && state.interaction_used(&interaction.id) {
                continue;
            }
            if !self.interaction_possible(interaction) {
                continue;
            }
            effects.extend(interaction.effects.iter().cloned());
            ran.push(interaction.id.clone());
        }
        for effect in &effects {
            self.absorb(effect);
        }
        self.interactions.extend(ran);
    }

    fn run_beats(&mut self) {
        let catalog = self.resolver.catalog();
        let state = self.resolver.state();
        let mut effects = Vec::new();
        let mut fired = Vec::new();
        for beat in catalog.beats() {
            if catalog.is_gate_beat(beat.id.as_str()) || self.beats.contains(&beat.id) {
                continue;
            }
            if !beat.repeatable && state.beat_fired(&beat.id) {
                continue;
            }
            if self.may(&beat.trigger) {
                effects.extend(beat.effects.iter().cloned());
                fired.push(beat.id.clone());
            }
        }
        for effect in &effects {
            self.absorb(effect);
        }
        self.beats.extend(fired);
    }

    fn pass_gates(&mut self) {
        let catalog = self.resolver.catalog();
        let Some(act) = catalog.acts().iter().nth(self.furthest_act) else {
            return;
        };
        if catalog.next_act(act.id.as_str()).is_none() || !self.gate_may_hold(act) {
            return;
        }
        let gate_beat = act
            .gate_beat
            .as_ref()
            .and_then(|b| catalog.beats().get(b.as_str()))
            .filter(|beat| !self.beats.contains(&beat.id));
        if let Some(beat) = gate_beat {
            for effect in &beat.effects {
                self.absorb(effect);
            }
            self.beats.insert(beat.id.clone());
        }
        self.open_act(self.furthest_act + 1);
    }

    fn gate_may_hold(&self, act: &ActDef) -> bool {
        let catalog = self.resolver.catalog();
        match &act.gate {
            Some(gate) => self.may(gate),
            None => {
                let mut spokes = catalog.spokes_of(act.id.as_str()).peekable();
                spokes.peek().is_some() && spokes.all(|s| self.may(&Condition::Spoke(s.id.clone())))
            }
        }
    }

    /// Widen the bounds through act `index`.
    fn open_act(&mut self, index: usize) {
        let catalog = self.resolver.catalog();
        while self.furthest_act < index {
            self.furthest_act += 1;
            let Some(act) = catalog.acts().iter().nth(self.furthest_act) else {
                break;
            };
            self.bounds.extend(act.locations.iter().cloned());
        }
    }

    fn interaction_possible(&self, def: &InteractionDef) -> bool {
        if def.location.as_ref().is_some_and(|l| !self.visitable.contains(l)) {
            return false;
        }
        if def.requires.as_ref().is_some_and(|c| !self.may(c)) {
            return false;
        }
        let item_ready = |item: &EntityId| match def.kind {
            InteractionKind::Use => self.obtainable.contains(item) || self.lies_visitable(item),
            _ => self.obtainable.contains(item),
        };
        if def.kind != InteractionKind::Interact && !def.item.as_ref().is_none_or(item_ready) {
            return false;
        }
        def.target.as_ref().is_none_or(|target| self.reachable_target(target))
    }

    fn lies_visitable(&self, item: &EntityId) -> bool {
        match self.resolver.item_placement(item) {
            Placement::Location(location) => self.visitable.contains(&location),
            _ => false,
        }
    }

    fn reachable_target(&self, target: &EntityKey) -> bool {
        match target.kind {
            EntityKind::Item => self.obtainable.contains(&target.id) || self.lies_visitable(&target.id),
            EntityKind::Character => {
                let here = self
                    .resolver
                    .character(target.id.as_str())
                    .and_then(|c| c.location)
                    .is_some_and(|l| self.visitable.contains(&l));
                here || self
                    .character_moves
                    .iter()
                    .any(|(c, l)| c == &target.id && self.visitable.contains(l))
            }
            EntityKind::Location => self.visitable.contains(&target.id),
            EntityKind::Exit => self
                .resolver
                .catalog()
                .exits()
                .get(target.id.as_str())
                .is_some_and(|e| self.visitable.contains(&e.from)),
            _ => true,
        }
    }

    fn absorb(&mut self, effect: &Effect) {
        match effect {
            Effect::SetFlag { flag, value } => {
                if value.is_truthy() {
                    self.truthy_flags.insert(flag.clone());
                }
                let entry = (flag.clone(), value.clone());
                if !self.flag_values.contains(&entry) {
                    self.flag_values.push(entry);
                }
            }
            Effect::GiveItem(item) => {
                if self.resolver.item_placement(item) != Placement::Destroyed {
                    self.obtainable.insert(item.clone());
                }
            }
            Effect::PlaceItem { item, location } => {
                self.placements.insert((item.clone(), location.clone()));
            }
            Effect::MovePlayer(location) => {
                self.visitable.insert(location.clone());
            }
            Effect::MoveCharacter {
                character,
                location,
            } => {
                self.character_moves.insert((character.clone(), location.clone()));
            }
            Effect::AdjustCounter {
                character,
                counter,
                delta,
            } => {
                let key = (character.clone(), counter.clone());
                if *delta > 0 {
                    self.raised.insert(key);
                } else if *delta < 0 {
                    self.lowered.insert(key);
                }
            }
            Effect::SetCounter {
                character,
                counter,
                value,
            } => {
                self.counter_values
                    .insert((character.clone(), counter.clone(), *value));
            }
            Effect::UnlockExit(exit) => {
                self.opened.insert(exit.clone());
            }
            Effect::RevealExit(exit) => {
                self.shown.insert(exit.clone());
            }
            Effect::CompleteSpoke(spoke) => {
                self.spokes.insert(spoke.clone());
            }
            Effect::AdvanceAct(act) => {
                if let Some(index) = self.resolver.catalog().acts().position(act.as_str()) {
                    self.open_act(index);
                }
            }
            Effect::ClearFlag(_)
            | Effect::RemoveItem(_)
            | Effect::DestroyItem(_)
            | Effect::HandItem { .. }
            | Effect::LockExit(_)
            | Effect::HideExit(_)
            | Effect::Describe { .. } => {}
        }
    }

    // -----------------------------------------------------------------------
    // Optimistic evaluation
    // -----------------------------------------------------------------------

    /// Whether `condition` could hold at some point from here on.
    fn may(&self, condition: &Condition) -> bool {
        if self.resolver.evaluate(condition) {
            return true;
        }
        match condition {
            Condition::Always | Condition::Not(_) => true,
            Condition::Flag(flag) => self.truthy_flags.contains(flag),
            Condition::FlagEquals { flag, value } => self
                .flag_values
                .iter()
                .any(|(f, v)| f == flag && v == value),
            Condition::HasItem(item) => self.obtainable.contains(item),
            Condition::ItemAt { item, location } => {
                self.placements.contains(&(item.clone(), location.clone()))
                    || (self.obtainable.contains(item) && self.visitable.contains(location))
            }
            Condition::At(location) => self.visitable.contains(location),
            Condition::Counter {
                character,
                counter,
                cmp,
                value,
            } => self.counter_may(character, counter, *cmp, *value),
            Condition::Spoke(spoke) => {
                self.spokes.contains(spoke)
                    || self
                        .resolver
                        .catalog()
                        .spokes()
                        .get(spoke.as_str())
                        .is_some_and(|s| self.may(&s.condition))
            }
            Condition::BeatFired(beat) => self.beats.contains(beat),
            Condition::ActReached(act) => self
                .resolver
                .catalog()
                .acts()
                .position(act.as_str())
                .is_some_and(|i| i <= self.furthest_act),
            Condition::InteractionUsed(interaction) => self.interactions.contains(interaction),
            Condition::All(conditions) => conditions.iter().all(|c| self.may(c)),
            Condition::Any(conditions) => conditions.iter().any(|c| self.may(c)),
        }
    }

    fn counter_may(&self, character: &EntityId, counter: &str, cmp: Comparison, value: i64) -> bool {
        let key = (character.clone(), counter.to_string());
        let up = self.raised.contains(&key);
        let down = self.lowered.contains(&key);
        let mut starts = vec![self.resolver.counter(character, counter)];
        starts.extend(
            self.counter_values
                .iter()
                .filter(|(c, n, _)| c == character && n == counter)
                .map(|(_, _, v)| *v),
        );
        // An exact target counts as reachable when moving toward it.
        let reach = |extreme: i64, toward: bool| match cmp {
            Comparison::Eq => toward,
            _ => cmp.holds(extreme, value),
        };
        starts.iter().any(|&start| {
            cmp.holds(start, value)
                || (up && reach(i64::MAX, start < value))
                || (down && reach(i64::MIN, start > value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id, lighthouse, state_at};

    #[test]
    fn fresh_world_is_winnable() {
        let catalog = lighthouse();
        let state = StateStore::new(&catalog);
        assert!(victory_reachable(&catalog, &state));
    }

    #[test]
    fn destroyed_lamp_is_not() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "dock");
        state.set_item_placement(&catalog, &id("lamp"), Placement::Destroyed);
        assert!(!victory_reachable(&catalog, &state));
    }

    #[test]
    fn outlook_passes_the_act_gate() {
        let catalog = lighthouse();
        let state = StateStore::new(&catalog);
        let outlook = Outlook::explore(Resolver::new(&catalog, &state));
        assert!(outlook.visitable.contains(&id("lantern")));
        assert!(outlook.beats.contains(&id("gate_open")));
        assert!(outlook.opened.contains(&id("stair_up")));
        // The cellar hatch is revealed by searching the base.
        assert!(outlook.visitable.contains(&id("cellar")));
    }

    #[test]
    fn counters_move_in_the_right_direction() {
        let catalog = lighthouse();
        let state = StateStore::new(&catalog);
        let mut outlook = Outlook::explore(Resolver::new(&catalog, &state));
        let jenkins = id("jenkins");
        assert!(outlook.counter_may(&jenkins, "trust", Comparison::Ge, 5));
        assert!(outlook.counter_may(&jenkins, "trust", Comparison::Eq, 3));
        assert!(!outlook.counter_may(&jenkins, "trust", Comparison::Lt, 0));

        outlook.raised.clear();
        assert!(!outlook.counter_may(&jenkins, "trust", Comparison::Ge, 1));
        outlook
            .counter_values
            .insert((jenkins.clone(), "trust".to_string(), 7));
        assert!(outlook.counter_may(&jenkins, "trust", Comparison::Eq, 7));
    }

    #[test]
    fn worlds_without_victory_always_pass() {
        let world = r#"
[world]
title = "Empty Room"

[start]
location = "room"

[[locations]]
id = "room"
name = "Room"

[[acts]]
id = "only"
locations = ["room"]
"#;
        let catalog = loom_loader::load_str(world, loom_loader::Format::Toml).unwrap();
        let state = StateStore::new(&catalog);
        assert!(victory_reachable(&catalog, &state));
    }
}
