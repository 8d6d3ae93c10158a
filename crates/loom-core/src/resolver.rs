//! Effective-state queries: catalog definitions merged with deltas.
//!
//! Every consumer that needs "what is true now" goes through [`Resolver`].
//! With no delta for an entity, resolution returns a value equal to its
//! catalog definition.

use std::collections::BTreeSet;

use crate::catalog::Catalog;
use crate::condition::Condition;
use crate::definition::{ActDef, ActMode, CharacterDef, ExitDef, ItemDef, LocationDef};
use crate::delta::{EntityDelta, ItemDelta, Placement};
use crate::entity::{EntityId, EntityKey, EntityKind};
use crate::error::{CoreError, CoreResult};
use crate::state::StateStore;

/// An entity's effective definition.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedEntity {
    /// Effective location.
    Location(LocationDef),
    /// Effective item.
    Item(ItemDef),
    /// Effective character.
    Character(CharacterDef),
    /// Effective exit.
    Exit(ExitDef),
}

/// Read-only view over a catalog and one session's state.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    state: &'a StateStore,
}

impl<'a> Resolver<'a> {
    /// Create a resolver.
    pub fn new(catalog: &'a Catalog, state: &'a StateStore) -> Self {
        Self { catalog, state }
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// The underlying state.
    pub fn state(&self) -> &'a StateStore {
        self.state
    }

    /// Resolve any overridable entity.
    pub fn resolve(&self, key: &EntityKey) -> CoreResult<ResolvedEntity> {
        let id = key.id.as_str();
        let resolved = match key.kind {
            EntityKind::Location => self.location(id).map(ResolvedEntity::Location),
            EntityKind::Item => self.item(id).map(ResolvedEntity::Item),
            EntityKind::Character => self.character(id).map(ResolvedEntity::Character),
            EntityKind::Exit => self.exit(id).map(ResolvedEntity::Exit),
            _ => None,
        };
        resolved.ok_or_else(|| CoreError::UnknownEntity(key.clone()))
    }

    /// Effective location.
    pub fn location(&self, id: &str) -> Option<LocationDef> {
        let mut def = self.catalog.locations().get(id)?.clone();
        if let Some(text) = self.description_override(EntityKind::Location, id) {
            def.description = text.to_string();
        }
        Some(def)
    }

    /// Effective item. `location` and `holder` reflect its current placement.
    pub fn item(&self, id: &str) -> Option<ItemDef> {
        let mut def = self.catalog.items().get(id)?.clone();
        let key = EntityKey::item(id);
        if let Some(EntityDelta::Item(delta)) = self.state.delta(&key) {
            if let Some(placement) = &delta.placement {
                def.location = None;
                def.holder = None;
                match placement {
                    Placement::Location(l) => def.location = Some(l.clone()),
                    Placement::Holder(c) => def.holder = Some(c.clone()),
                    Placement::Carried | Placement::Limbo | Placement::Destroyed => {}
                }
            }
            if let Some(text) = &delta.description {
                def.description = text.clone();
            }
        }
        Some(def)
    }

    /// Effective character.
    pub fn character(&self, id: &str) -> Option<CharacterDef> {
        let mut def = self.catalog.characters().get(id)?.clone();
        if let Some(EntityDelta::Character(delta)) = self.state.delta(&EntityKey::character(id)) {
            if let Some(location) = &delta.location {
                def.location = Some(location.clone());
            }
            if let Some(text) = &delta.description {
                def.description = text.clone();
            }
        }
        if let Some(overrides) = self.state.counters().get(id) {
            for (name, value) in overrides {
                def.counters.insert(name.clone(), *value);
            }
        }
        Some(def)
    }

    /// Effective exit.
    pub fn exit(&self, id: &str) -> Option<ExitDef> {
        let mut def = self.catalog.exits().get(id)?.clone();
        if let Some(EntityDelta::Exit(delta)) = self.state.delta(&EntityKey::exit(id)) {
            if let Some(locked) = delta.locked {
                def.locked = locked;
            }
            if let Some(hidden) = delta.hidden {
                def.hidden = hidden;
            }
            if let Some(text) = &delta.description {
                def.description = text.clone();
            }
        }
        Some(def)
    }

    fn description_override(&self, kind: EntityKind, id: &str) -> Option<&'a str> {
        self.state
            .delta(&EntityKey::new(kind, id))
            .and_then(EntityDelta::description)
    }

    // -----------------------------------------------------------------------
    // Derived queries
    // -----------------------------------------------------------------------

    /// Evaluate a condition.
    pub fn evaluate(&self, condition: &Condition) -> bool {
        condition.evaluate(self)
    }

    /// Whether the flag is set to a truthy value.
    pub fn flag_is_set(&self, flag: &str) -> bool {
        self.state.flag(flag).is_some_and(|v| v.is_truthy())
    }

    /// Current placement of an item.
    pub fn item_placement(&self, item: &EntityId) -> Placement {
        if self.state.has_item(item) {
            return Placement::Carried;
        }
        let placement = match self.state.delta(&EntityKey::item(item.clone())) {
            Some(EntityDelta::Item(ItemDelta {
                placement: Some(placement),
                ..
            })) => placement.clone(),
            _ => self.catalog.initial_placement(item.as_str()),
        };
        match placement {
            // Not in the inventory, so it left play.
            Placement::Carried => Placement::Limbo,
            other => other,
        }
    }

    /// Effective value of a relational counter (unset counters read 0).
    pub fn counter(&self, character: &EntityId, counter: &str) -> i64 {
        self.state
            .counter_override(character.as_str(), counter)
            .or_else(|| {
                self.catalog
                    .characters()
                    .get(character.as_str())
                    .and_then(|c| c.counters.get(counter).copied())
            })
            .unwrap_or(0)
    }

    /// A spoke is satisfied once recorded, or while its condition holds.
    pub fn spoke_satisfied(&self, spoke: &EntityId) -> bool {
        self.state.spoke_completed(spoke)
            || self
                .catalog
                .spokes()
                .get(spoke.as_str())
                .is_some_and(|s| s.condition.evaluate(self))
    }

    /// Whether an exit is visible to the player.
    pub fn exit_visible(&self, exit: &ExitDef) -> bool {
        !exit.hidden
            && exit
                .visible_when
                .as_ref()
                .is_none_or(|cond| cond.evaluate(self))
    }

    /// Whether an exit can be traversed.
    pub fn exit_open(&self, exit: &ExitDef) -> bool {
        !exit.locked
            && exit
                .open_when
                .as_ref()
                .is_none_or(|cond| cond.evaluate(self))
    }

    /// Effective exits leaving a location, in declaration order.
    pub fn exits_from(&self, location: &EntityId) -> Vec<ExitDef> {
        self.catalog
            .exits()
            .iter()
            .filter(|e| &e.from == location)
            .filter_map(|e| self.exit(e.id.as_str()))
            .collect()
    }

    /// Effective items lying in a location.
    pub fn items_at(&self, location: &EntityId) -> Vec<ItemDef> {
        self.catalog
            .items()
            .iter()
            .filter(|i| self.item_placement(&i.id).is_in_location(location))
            .filter_map(|i| self.item(i.id.as_str()))
            .collect()
    }

    /// Effective characters standing in a location, if reachable.
    pub fn characters_at(&self, location: &EntityId) -> Vec<CharacterDef> {
        let reachable = self.reachable_characters();
        self.catalog
            .characters()
            .iter()
            .filter(|c| reachable.contains(&c.id))
            .filter_map(|c| self.character(c.id.as_str()))
            .filter(|c| c.location.as_ref() == Some(location))
            .collect()
    }

    /// Effective items in the inventory.
    pub fn inventory(&self) -> Vec<ItemDef> {
        self.state
            .inventory()
            .iter()
            .filter_map(|i| self.item(i.as_str()))
            .collect()
    }

    /// Effective current location.
    pub fn current_location(&self) -> Option<LocationDef> {
        self.location(self.state.location().as_str())
    }

    /// Locations reachable under the act history.
    pub fn reachable_locations(&self) -> BTreeSet<EntityId> {
        self.reachable(|act| (&act.locations, &act.exclude_locations))
    }

    /// Characters reachable under the act history.
    pub fn reachable_characters(&self) -> BTreeSet<EntityId> {
        self.reachable(|act| (&act.characters, &act.exclude_characters))
    }

    fn reachable(
        &self,
        sets: impl Fn(&ActDef) -> (&Vec<EntityId>, &Vec<EntityId>),
    ) -> BTreeSet<EntityId> {
        let mut out = BTreeSet::new();
        for act_id in self.state.reached_acts() {
            let Some(act) = self.catalog.acts().get(act_id.as_str()) else {
                continue;
            };
            let (include, exclude) = sets(act);
            if act.mode == ActMode::Replace {
                out.clear();
            }
            out.extend(include.iter().cloned());
            for id in exclude {
                out.remove(id);
            }
        }
        out
    }

    /// Display name of any entity, falling back to its identifier.
    pub fn display_name(&self, key: &EntityKey) -> String {
        self.catalog
            .display_name(key)
            .unwrap_or(key.id.as_str())
            .to_string()
    }
}
