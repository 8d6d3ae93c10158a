//! Save and restore of session state, with catalog-version migration.
//!
//! A save holds only the [`StateStore`] plus a header naming the catalog
//! version it was written against. Restoring into a different catalog
//! version applies the catalog's [`MigrationRule`] for the saved version,
//! then re-validates every reference; anything left dangling is a
//! [`CoreError::PersistenceVersionMismatch`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::definition::MigrationRule;
use crate::delta::{EntityDelta, Placement};
use crate::entity::{EntityId, EntityKey, EntityKind};
use crate::error::{CoreError, CoreResult};
use crate::state::StateStore;

/// Current save format revision.
pub const SAVE_FORMAT: u32 = 1;

/// A serialized session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    /// Save format revision.
    pub format: u32,
    /// Session the save was taken from.
    pub session_id: Uuid,
    /// Catalog version the state refers to.
    pub catalog_version: String,
    /// When the save was written.
    pub saved_at: DateTime<Utc>,
    /// The session state.
    pub state: StateStore,
}

impl SaveGame {
    /// Capture a session's state.
    pub fn capture(session_id: Uuid, catalog: &Catalog, state: &StateStore) -> Self {
        Self {
            format: SAVE_FORMAT,
            session_id,
            catalog_version: catalog.version().to_string(),
            saved_at: Utc::now(),
            state: state.clone(),
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a save from JSON.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild session state against `catalog`, migrating if needed.
    pub fn restore(self, catalog: &Catalog) -> CoreResult<StateStore> {
        if self.format != SAVE_FORMAT {
            return Err(CoreError::SaveFormat(self.format));
        }
        let current = catalog.version().to_string();
        if self.catalog_version == current {
            let missing = dangling_references(catalog, &self.state);
            if !missing.is_empty() {
                return Err(CoreError::CorruptSave(format!(
                    "unknown references: {}",
                    join(&missing)
                )));
            }
            return Ok(self.state);
        }

        let mismatch = |detail: String| CoreError::PersistenceVersionMismatch {
            saved: self.catalog_version.clone(),
            current: current.clone(),
            detail,
        };
        let Some(rule) = catalog.migration_from(&self.catalog_version) else {
            return Err(mismatch("no migration rule for this version".to_string()));
        };

        let mut state = self.state.clone();
        apply_renames(&mut state, rule);
        if rule.discard_missing {
            discard_missing(catalog, &mut state);
        }
        let relocate = rule
            .relocate
            .as_ref()
            .filter(|_| !catalog.locations().contains(state.location.as_str()));
        if let Some(relocate) = relocate {
            tracing::info!(from = %state.location, to = %relocate, "relocating player");
            state.location = relocate.clone();
        }
        let missing = dangling_references(catalog, &state);
        if !missing.is_empty() {
            return Err(mismatch(format!("unknown references: {}", join(&missing))));
        }
        let history: Vec<&EntityId> = catalog
            .acts_through(state.act.as_str())
            .into_iter()
            .map(|a| &a.id)
            .collect();
        if history != state.reached_acts.iter().collect::<Vec<_>>() {
            return Err(mismatch(format!(
                "act history does not lead to `{}`",
                state.act
            )));
        }

        tracing::info!(
            from = %self.catalog_version,
            to = %current,
            turn = state.turn,
            "migrated save"
        );
        Ok(state)
    }
}

fn join(keys: &[String]) -> String {
    keys.join(", ")
}

fn rename(rule: &MigrationRule, kind: EntityKind, id: &mut EntityId) {
    let renamed = rule
        .rename
        .for_kind(kind)
        .and_then(|map| map.get(id.as_str()));
    if let Some(new_id) = renamed {
        *id = EntityId::new(new_id.as_str());
    }
}

fn rename_set(rule: &MigrationRule, kind: EntityKind, set: &mut BTreeSet<EntityId>) {
    *set = std::mem::take(set)
        .into_iter()
        .map(|mut id| {
            rename(rule, kind, &mut id);
            id
        })
        .collect();
}

fn apply_renames(state: &mut StateStore, rule: &MigrationRule) {
    rename(rule, EntityKind::Location, &mut state.location);
    for item in &mut state.inventory {
        rename(rule, EntityKind::Item, item);
    }

    let flags = std::mem::take(&mut state.flags);
    for (name, value) in flags {
        if rule.drop_flags.contains(&name) {
            continue;
        }
        let name = rule.rename.flags.get(&name).cloned().unwrap_or(name);
        state.flags.insert(name, value);
    }

    let counters = std::mem::take(&mut state.counters);
    for (mut character, values) in counters {
        rename(rule, EntityKind::Character, &mut character);
        state.counters.insert(character, values);
    }

    let deltas = std::mem::take(&mut state.deltas);
    for (mut key, mut delta) in deltas {
        rename(rule, key.kind, &mut key.id);
        match &mut delta {
            EntityDelta::Item(d) => match &mut d.placement {
                Some(Placement::Location(l)) => rename(rule, EntityKind::Location, l),
                Some(Placement::Holder(c)) => rename(rule, EntityKind::Character, c),
                _ => {}
            },
            EntityDelta::Character(d) => {
                if let Some(l) = &mut d.location {
                    rename(rule, EntityKind::Location, l);
                }
            }
            EntityDelta::Location(_) | EntityDelta::Exit(_) => {}
        }
        state.deltas.insert(key, delta);
    }

    rename(rule, EntityKind::Act, &mut state.act);
    for act in &mut state.reached_acts {
        rename(rule, EntityKind::Act, act);
    }
    for beat in &mut state.fired_beats {
        rename(rule, EntityKind::Beat, beat);
    }
    rename_set(rule, EntityKind::Spoke, &mut state.completed_spokes);
    rename_set(rule, EntityKind::Beat, &mut state.latched_beats);
    rename_set(rule, EntityKind::Interaction, &mut state.used_interactions);
}

fn discard_missing(catalog: &Catalog, state: &mut StateStore) {
    let has = |kind: EntityKind, id: &EntityId| catalog.contains(&EntityKey::new(kind, id.clone()));
    state.inventory.retain(|i| has(EntityKind::Item, i));
    state
        .counters
        .retain(|c, _| has(EntityKind::Character, c));
    state.deltas.retain(|key, delta| {
        catalog.contains(key) && delta_targets(delta).iter().all(|t| catalog.contains(t))
    });
    state.fired_beats.retain(|b| has(EntityKind::Beat, b));
    state.latched_beats.retain(|b| has(EntityKind::Beat, b));
    state.completed_spokes.retain(|s| has(EntityKind::Spoke, s));
    state
        .used_interactions
        .retain(|i| has(EntityKind::Interaction, i));
    if state.victory.as_ref().is_some_and(|v| !has(EntityKind::Victory, v)) {
        state.victory = None;
    }
}

fn delta_targets(delta: &EntityDelta) -> Vec<EntityKey> {
    match delta {
        EntityDelta::Item(d) => match &d.placement {
            Some(Placement::Location(l)) => vec![EntityKey::location(l.clone())],
            Some(Placement::Holder(c)) => vec![EntityKey::character(c.clone())],
            _ => Vec::new(),
        },
        EntityDelta::Character(d) => d
            .location
            .iter()
            .map(|l| EntityKey::location(l.clone()))
            .collect(),
        EntityDelta::Location(_) | EntityDelta::Exit(_) => Vec::new(),
    }
}

/// Every reference in `state` that `catalog` cannot resolve, rendered.
fn dangling_references(catalog: &Catalog, state: &StateStore) -> Vec<String> {
    let mut keys: Vec<EntityKey> = Vec::new();
    keys.push(EntityKey::location(state.location.clone()));
    keys.extend(state.inventory.iter().cloned().map(EntityKey::item));
    keys.extend(state.counters.keys().cloned().map(EntityKey::character));
    for (key, delta) in &state.deltas {
        keys.push(key.clone());
        keys.extend(delta_targets(delta));
    }
    keys.push(EntityKey::new(EntityKind::Act, state.act.clone()));
    let act = |id: &EntityId| EntityKey::new(EntityKind::Act, id.clone());
    keys.extend(state.reached_acts.iter().map(act));
    let beat = |id: &EntityId| EntityKey::new(EntityKind::Beat, id.clone());
    keys.extend(state.fired_beats.iter().map(beat));
    keys.extend(state.latched_beats.iter().map(beat));
    keys.extend(
        state
            .completed_spokes
            .iter()
            .map(|id| EntityKey::new(EntityKind::Spoke, id.clone())),
    );
    keys.extend(
        state
            .used_interactions
            .iter()
            .map(|id| EntityKey::new(EntityKind::Interaction, id.clone())),
    );
    if let Some(victory) = &state.victory {
        keys.push(EntityKey::new(EntityKind::Victory, victory.clone()));
    }

    let unique: BTreeMap<String, ()> = keys
        .into_iter()
        .filter(|k| !catalog.contains(k))
        .map(|k| (k.to_string(), ()))
        .collect();
    unique.into_keys().collect()
}
