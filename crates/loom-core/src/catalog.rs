//! The immutable, cross-referenced index of authored entities.

use std::collections::{HashMap, HashSet};
use std::slice;

use crate::definition::{
    ActDef, BeatDef, CharacterDef, Definition, ExitDef, InteractionDef, ItemDef, LocationDef,
    MigrationRule, SpokeDef, StartDef, VictoryDef, WorldDocument, WorldInfo,
};
use crate::delta::Placement;
use crate::entity::{EntityId, EntityKey, EntityKind};
use crate::error::{CoreError, CoreResult};
use crate::integrity::{self, IntegrityError};

/// Definitions of one kind, in declaration order, indexed by identifier.
#[derive(Debug, Clone)]
pub struct Table<T> {
    entries: Vec<T>,
    index: HashMap<EntityId, usize>,
}

impl<T: Definition> Table<T> {
    /// Index `entries`, reporting duplicate identifiers. The first
    /// declaration of a duplicated identifier wins.
    fn build(entries: Vec<T>, errors: &mut Vec<IntegrityError>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        let mut kept = Vec::with_capacity(entries.len());
        for entry in entries {
            if index.contains_key(entry.id()) {
                errors.push(IntegrityError::DuplicateId(entry.key()));
                continue;
            }
            index.insert(entry.id().clone(), kept.len());
            kept.push(entry);
        }
        Self {
            entries: kept,
            index,
        }
    }

    /// Look up a definition by identifier.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).and_then(|&i| self.entries.get(i))
    }

    /// Whether an identifier is declared.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Declaration position of an identifier.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Definitions in declaration order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a Table<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The validated world definition. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct Catalog {
    info: WorldInfo,
    start: StartDef,
    initial_act: EntityId,
    locations: Table<LocationDef>,
    items: Table<ItemDef>,
    characters: Table<CharacterDef>,
    exits: Table<ExitDef>,
    interactions: Table<InteractionDef>,
    beats: Table<BeatDef>,
    spokes: Table<SpokeDef>,
    acts: Table<ActDef>,
    victory: Table<VictoryDef>,
    migrations: Vec<MigrationRule>,
    gate_beats: HashSet<EntityId>,
}

impl Catalog {
    /// Build a catalog from a merged document, running the referential
    /// integrity pass. Any failure rejects the whole world.
    pub fn from_document(doc: WorldDocument) -> CoreResult<Self> {
        let mut errors = Vec::new();

        let info = doc.world.unwrap_or_else(|| {
            errors.push(IntegrityError::MissingSection("world"));
            WorldInfo {
                title: String::new(),
                version: String::new(),
                description: String::new(),
            }
        });
        let start = match doc.start {
            Some(start) => start,
            None => {
                errors.push(IntegrityError::MissingSection("start"));
                StartDef {
                    location: EntityId::new(""),
                    act: None,
                    inventory: Vec::new(),
                }
            }
        };

        let acts = Table::build(doc.acts, &mut errors);
        let initial_act = match (&start.act, acts.iter().next()) {
            (Some(act), _) => act.clone(),
            (None, Some(first)) => first.id.clone(),
            (None, None) => {
                errors.push(IntegrityError::NoActs);
                EntityId::new("")
            }
        };

        let gate_beats = acts.iter().filter_map(|a| a.gate_beat.clone()).collect();

        let catalog = Self {
            info,
            start,
            initial_act,
            locations: Table::build(doc.locations, &mut errors),
            items: Table::build(doc.items, &mut errors),
            characters: Table::build(doc.characters, &mut errors),
            exits: Table::build(doc.exits, &mut errors),
            interactions: Table::build(doc.interactions, &mut errors),
            beats: Table::build(doc.beats, &mut errors),
            spokes: Table::build(doc.spokes, &mut errors),
            acts,
            victory: Table::build(doc.victory, &mut errors),
            migrations: doc.migrations,
            gate_beats,
        };

        integrity::check(&catalog, &mut errors);

        if errors.is_empty() {
            tracing::debug!(
                title = %catalog.info.title,
                version = %catalog.info.version,
                locations = catalog.locations.len(),
                beats = catalog.beats.len(),
                acts = catalog.acts.len(),
                "catalog built"
            );
            Ok(catalog)
        } else {
            Err(CoreError::Integrity(errors))
        }
    }

    // -----------------------------------------------------------------------
    // Sections
    // -----------------------------------------------------------------------

    /// World metadata.
    pub fn info(&self) -> &WorldInfo {
        &self.info
    }

    /// Catalog version identifier.
    pub fn version(&self) -> &str {
        &self.info.version
    }

    /// Session start definition.
    pub fn start(&self) -> &StartDef {
        &self.start
    }

    /// The act every session starts in.
    pub fn initial_act(&self) -> &EntityId {
        &self.initial_act
    }

    /// Locations.
    pub fn locations(&self) -> &Table<LocationDef> {
        &self.locations
    }

    /// Items.
    pub fn items(&self) -> &Table<ItemDef> {
        &self.items
    }

    /// Characters.
    pub fn characters(&self) -> &Table<CharacterDef> {
        &self.characters
    }

    /// Exits.
    pub fn exits(&self) -> &Table<ExitDef> {
        &self.exits
    }

    /// Interactions.
    pub fn interactions(&self) -> &Table<InteractionDef> {
        &self.interactions
    }

    /// Story beats in declaration order.
    pub fn beats(&self) -> &Table<BeatDef> {
        &self.beats
    }

    /// Spokes.
    pub fn spokes(&self) -> &Table<SpokeDef> {
        &self.spokes
    }

    /// Acts in sequence order.
    pub fn acts(&self) -> &Table<ActDef> {
        &self.acts
    }

    /// Victory conditions.
    pub fn victory(&self) -> &Table<VictoryDef> {
        &self.victory
    }

    /// Declared migration rules.
    pub fn migrations(&self) -> &[MigrationRule] {
        &self.migrations
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// Whether the key names a declared entity.
    pub fn contains(&self, key: &EntityKey) -> bool {
        let id = key.id.as_str();
        match key.kind {
            EntityKind::Location => self.locations.contains(id),
            EntityKind::Item => self.items.contains(id),
            EntityKind::Character => self.characters.contains(id),
            EntityKind::Exit => self.exits.contains(id),
            EntityKind::Interaction => self.interactions.contains(id),
            EntityKind::Beat => self.beats.contains(id),
            EntityKind::Spoke => self.spokes.contains(id),
            EntityKind::Act => self.acts.contains(id),
            EntityKind::Victory => self.victory.contains(id),
        }
    }

    /// Display name of any declared entity.
    pub fn display_name(&self, key: &EntityKey) -> Option<&str> {
        let id = key.id.as_str();
        match key.kind {
            EntityKind::Location => self.locations.get(id).map(Definition::display_name),
            EntityKind::Item => self.items.get(id).map(Definition::display_name),
            EntityKind::Character => self.characters.get(id).map(Definition::display_name),
            EntityKind::Exit => self.exits.get(id).map(Definition::display_name),
            EntityKind::Interaction => self.interactions.get(id).map(Definition::display_name),
            EntityKind::Beat => self.beats.get(id).map(Definition::display_name),
            EntityKind::Spoke => self.spokes.get(id).map(Definition::display_name),
            EntityKind::Act => self.acts.get(id).map(Definition::display_name),
            EntityKind::Victory => self.victory.get(id).map(Definition::display_name),
        }
    }

    /// Where an item is before anything has moved it.
    pub fn initial_placement(&self, item: &str) -> Placement {
        if self.start.inventory.iter().any(|i| i.as_str() == item) {
            return Placement::Carried;
        }
        match self.items.get(item) {
            Some(ItemDef {
                location: Some(location),
                ..
            }) => Placement::Location(location.clone()),
            Some(ItemDef {
                holder: Some(holder),
                ..
            }) => Placement::Holder(holder.clone()),
            _ => Placement::Limbo,
        }
    }

    /// The act following `act` in the sequence.
    pub fn next_act(&self, act: &str) -> Option<&ActDef> {
        self.acts
            .position(act)
            .and_then(|i| self.acts.entries.get(i + 1))
    }

    /// Acts from the initial act up to and including `act`.
    pub fn acts_through(&self, act: &str) -> Vec<&ActDef> {
        let start = self.acts.position(self.initial_act.as_str()).unwrap_or(0);
        match self.acts.position(act) {
            Some(end) if end >= start => self.acts.entries[start..=end].iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Spokes belonging to an act, in declaration order.
    pub fn spokes_of<'a>(&'a self, act: &'a str) -> impl Iterator<Item = &'a SpokeDef> + 'a {
        self.spokes.iter().filter(move |s| s.act.as_str() == act)
    }

    /// Whether a beat is some act's designated gate beat.
    pub fn is_gate_beat(&self, beat: &str) -> bool {
        self.gate_beats.contains(beat)
    }

    /// The migration rule for saves written against `version`.
    pub fn migration_from(&self, version: &str) -> Option<&MigrationRule> {
        self.migrations.iter().find(|m| m.from == version)
    }

    /// Total number of declared entities.
    pub fn entity_count(&self) -> usize {
        self.locations.len()
            + self.items.len()
            + self.characters.len()
            + self.exits.len()
            + self.interactions.len()
            + self.beats.len()
            + self.spokes.len()
            + self.acts.len()
            + self.victory.len()
    }

    /// Count of declared entities per kind.
    pub fn counts_by_kind(&self) -> Vec<(EntityKind, usize)> {
        vec![
            (EntityKind::Location, self.locations.len()),
            (EntityKind::Item, self.items.len()),
            (EntityKind::Character, self.characters.len()),
            (EntityKind::Exit, self.exits.len()),
            (EntityKind::Interaction, self.interactions.len()),
            (EntityKind::Beat, self.beats.len()),
            (EntityKind::Spoke, self.spokes.len()),
            (EntityKind::Act, self.acts.len()),
            (EntityKind::Victory, self.victory.len()),
        ]
    }
}
