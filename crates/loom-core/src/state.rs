//! The per-session mutable store.
//!
//! The store never copies catalog data. It holds the player's position,
//! inventory, flags, sparse counters, entity deltas and progression sets.
//! Mutators that touch authored values take the [`Catalog`] so they can
//! prune overrides that equal the authored value.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::delta::{EntityDelta, Placement};
use crate::entity::{EntityId, EntityKey, EntityKind, FlagValue};

/// Mutable per-session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateStore {
    pub(crate) turn: u64,
    pub(crate) location: EntityId,
    pub(crate) inventory: Vec<EntityId>,
    pub(crate) flags: BTreeMap<String, FlagValue>,
    pub(crate) counters: BTreeMap<EntityId, BTreeMap<String, i64>>,
    pub(crate) deltas: BTreeMap<EntityKey, EntityDelta>,
    pub(crate) act: EntityId,
    pub(crate) reached_acts: Vec<EntityId>,
    pub(crate) completed_spokes: BTreeSet<EntityId>,
    pub(crate) fired_beats: Vec<EntityId>,
    pub(crate) latched_beats: BTreeSet<EntityId>,
    pub(crate) used_interactions: BTreeSet<EntityId>,
    pub(crate) victory: Option<EntityId>,
}

impl StateStore {
    /// Initial state for a new session.
    pub fn new(catalog: &Catalog) -> Self {
        let start = catalog.start();
        Self {
            turn: 0,
            location: start.location.clone(),
            inventory: start.inventory.clone(),
            flags: BTreeMap::new(),
            counters: BTreeMap::new(),
            deltas: BTreeMap::new(),
            act: catalog.initial_act().clone(),
            reached_acts: vec![catalog.initial_act().clone()],
            completed_spokes: BTreeSet::new(),
            fired_beats: Vec::new(),
            latched_beats: BTreeSet::new(),
            used_interactions: BTreeSet::new(),
            victory: None,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Number of actions taken.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// The player's location.
    pub fn location(&self) -> &EntityId {
        &self.location
    }

    /// Carried items, in pickup order.
    pub fn inventory(&self) -> &[EntityId] {
        &self.inventory
    }

    /// Whether the item is carried.
    pub fn has_item(&self, item: &EntityId) -> bool {
        self.inventory.contains(item)
    }

    /// A flag's value, if set.
    pub fn flag(&self, name: &str) -> Option<&FlagValue> {
        self.flags.get(name)
    }

    /// All set flags.
    pub fn flags(&self) -> &BTreeMap<String, FlagValue> {
        &self.flags
    }

    /// A counter override, if it differs from the authored value.
    pub fn counter_override(&self, character: &str, counter: &str) -> Option<i64> {
        self.counters.get(character)?.get(counter).copied()
    }

    /// All counter overrides.
    pub fn counters(&self) -> &BTreeMap<EntityId, BTreeMap<String, i64>> {
        &self.counters
    }

    /// The delta for an entity, if any.
    pub fn delta(&self, key: &EntityKey) -> Option<&EntityDelta> {
        self.deltas.get(key)
    }

    /// All deltas.
    pub fn deltas(&self) -> &BTreeMap<EntityKey, EntityDelta> {
        &self.deltas
    }

    /// Total number of overridden delta fields.
    pub fn delta_field_count(&self) -> usize {
        self.deltas.values().map(EntityDelta::field_count).sum()
    }

    /// The current act.
    pub fn act(&self) -> &EntityId {
        &self.act
    }

    /// Acts entered so far, in order.
    pub fn reached_acts(&self) -> &[EntityId] {
        &self.reached_acts
    }

    /// Whether the act is current or has been passed.
    pub fn act_reached(&self, act: &EntityId) -> bool {
        self.reached_acts.contains(act)
    }

    /// Spokes recorded as complete.
    pub fn completed_spokes(&self) -> &BTreeSet<EntityId> {
        &self.completed_spokes
    }

    /// Whether the spoke has been recorded as complete.
    pub fn spoke_completed(&self, spoke: &EntityId) -> bool {
        self.completed_spokes.contains(spoke)
    }

    /// Beats that have fired, in firing order.
    pub fn fired_beats(&self) -> &[EntityId] {
        &self.fired_beats
    }

    /// Whether the beat has fired at least once.
    pub fn beat_fired(&self, beat: &EntityId) -> bool {
        self.fired_beats.contains(beat)
    }

    /// Whether a repeatable beat's trigger held at its last evaluation.
    pub fn beat_latched(&self, beat: &EntityId) -> bool {
        self.latched_beats.contains(beat)
    }

    /// Whether a non-repeatable interaction has been used.
    pub fn interaction_used(&self, interaction: &EntityId) -> bool {
        self.used_interactions.contains(interaction)
    }

    /// Non-repeatable interactions used so far.
    pub fn used_interactions(&self) -> &BTreeSet<EntityId> {
        &self.used_interactions
    }

    /// The victory reached, if the game is won.
    pub fn victory(&self) -> Option<&EntityId> {
        self.victory.as_ref()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Count one more action.
    pub fn advance_turn(&mut self) {
        self.turn += 1;
    }

    /// Move the player.
    pub fn set_location(&mut self, location: EntityId) {
        self.location = location;
    }

    /// Add an item to the inventory. Returns `false` if already carried.
    pub fn add_to_inventory(&mut self, item: EntityId) -> bool {
        if self.inventory.contains(&item) {
            return false;
        }
        self.inventory.push(item);
        true
    }

    /// Remove an item from the inventory. Returns `false` if not carried.
    pub fn remove_from_inventory(&mut self, item: &EntityId) -> bool {
        let before = self.inventory.len();
        self.inventory.retain(|i| i != item);
        self.inventory.len() != before
    }

    /// Set a flag.
    pub fn set_flag(&mut self, name: impl Into<String>, value: FlagValue) {
        self.flags.insert(name.into(), value);
    }

    /// Clear a flag. Returns `false` if it was not set.
    pub fn clear_flag(&mut self, name: &str) -> bool {
        self.flags.remove(name).is_some()
    }

    /// Set a counter, dropping the override when it equals the authored value.
    pub fn set_counter(&mut self, catalog: &Catalog, character: &EntityId, counter: &str, value: i64) {
        let authored = catalog
            .characters()
            .get(character.as_str())
            .and_then(|c| c.counters.get(counter).copied())
            .unwrap_or(0);
        if value == authored {
            if let Some(map) = self.counters.get_mut(character) {
                map.remove(counter);
                if map.is_empty() {
                    self.counters.remove(character);
                }
            }
        } else {
            self.counters
                .entry(character.clone())
                .or_default()
                .insert(counter.to_string(), value);
        }
    }

    /// Set an item's placement.
    pub fn set_item_placement(&mut self, catalog: &Catalog, item: &EntityId, placement: Placement) {
        let value = (catalog.initial_placement(item.as_str()) != placement).then_some(placement);
        self.update_delta(EntityKey::item(item.clone()), |delta| {
            if let EntityDelta::Item(d) = delta {
                d.placement = value;
            }
        });
    }

    /// Move a character.
    pub fn set_character_location(
        &mut self,
        catalog: &Catalog,
        character: &EntityId,
        location: EntityId,
    ) {
        let authored = catalog
            .characters()
            .get(character.as_str())
            .and_then(|c| c.location.as_ref());
        let value = (authored != Some(&location)).then_some(location);
        self.update_delta(EntityKey::character(character.clone()), |delta| {
            if let EntityDelta::Character(d) = delta {
                d.location = value;
            }
        });
    }

    /// Lock or unlock an exit.
    pub fn set_exit_locked(&mut self, catalog: &Catalog, exit: &EntityId, locked: bool) {
        let authored = catalog.exits().get(exit.as_str()).is_some_and(|e| e.locked);
        let value = (authored != locked).then_some(locked);
        self.update_delta(EntityKey::exit(exit.clone()), |delta| {
            if let EntityDelta::Exit(d) = delta {
                d.locked = value;
            }
        });
    }

    /// Hide or reveal an exit.
    pub fn set_exit_hidden(&mut self, catalog: &Catalog, exit: &EntityId, hidden: bool) {
        let authored = catalog.exits().get(exit.as_str()).is_some_and(|e| e.hidden);
        let value = (authored != hidden).then_some(hidden);
        self.update_delta(EntityKey::exit(exit.clone()), |delta| {
            if let EntityDelta::Exit(d) = delta {
                d.hidden = value;
            }
        });
    }

    /// Override a description. Kinds without deltas are ignored.
    pub fn set_description(&mut self, catalog: &Catalog, key: &EntityKey, text: String) {
        let id = key.id.as_str();
        let authored = match key.kind {
            EntityKind::Location => catalog.locations().get(id).map(|d| d.description.as_str()),
            EntityKind::Item => catalog.items().get(id).map(|d| d.description.as_str()),
            EntityKind::Character => catalog.characters().get(id).map(|d| d.description.as_str()),
            EntityKind::Exit => catalog.exits().get(id).map(|d| d.description.as_str()),
            _ => return,
        };
        let value = (authored != Some(text.as_str())).then_some(text);
        self.update_delta(key.clone(), |delta| *delta.description_mut() = value);
    }

    /// Enter an act.
    pub fn enter_act(&mut self, act: EntityId) {
        if !self.reached_acts.contains(&act) {
            self.reached_acts.push(act.clone());
        }
        self.act = act;
    }

    /// Record a spoke as complete. Returns `false` if already recorded.
    pub fn complete_spoke(&mut self, spoke: EntityId) -> bool {
        self.completed_spokes.insert(spoke)
    }

    /// Record a beat firing.
    pub fn mark_beat_fired(&mut self, beat: EntityId) {
        if !self.fired_beats.contains(&beat) {
            self.fired_beats.push(beat);
        }
    }

    /// Set or clear a repeatable beat's latch.
    pub fn set_beat_latch(&mut self, beat: &EntityId, latched: bool) {
        if latched {
            self.latched_beats.insert(beat.clone());
        } else {
            self.latched_beats.remove(beat);
        }
    }

    /// Record a non-repeatable interaction as used.
    pub fn mark_interaction_used(&mut self, interaction: EntityId) {
        self.used_interactions.insert(interaction);
    }

    /// Record a victory.
    pub fn set_victory(&mut self, victory: EntityId) {
        self.victory = Some(victory);
    }

    fn update_delta(&mut self, key: EntityKey, f: impl FnOnce(&mut EntityDelta)) {
        let Some(mut delta) = self
            .deltas
            .remove(&key)
            .or_else(|| EntityDelta::empty(key.kind))
        else {
            return;
        };
        f(&mut delta);
        if !delta.is_empty() {
            self.deltas.insert(key, delta);
        }
    }
}
