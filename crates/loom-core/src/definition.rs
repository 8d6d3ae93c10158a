//! Authored entity definitions.
//!
//! One struct per entity kind, with explicit optional fields. These are the
//! immutable records the [`Catalog`](crate::catalog::Catalog) owns; runtime
//! changes never touch them and live in [`EntityDelta`](crate::delta::EntityDelta).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::effect::Effect;
use crate::entity::{EntityId, EntityKey, EntityKind};

/// Common access to every definition type.
pub trait Definition {
    /// The kind this definition belongs to.
    const KIND: EntityKind;

    /// The definition's identifier.
    fn id(&self) -> &EntityId;

    /// Display name, falling back to the identifier.
    fn display_name(&self) -> &str {
        self.id().as_str()
    }

    /// The key addressing this definition.
    fn key(&self) -> EntityKey {
        EntityKey::new(Self::KIND, self.id().clone())
    }
}

fn yes() -> bool {
    true
}

fn default_version() -> String {
    "1.0".to_string()
}

// ---------------------------------------------------------------------------
// World-level sections
// ---------------------------------------------------------------------------

/// Metadata about the authored world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldInfo {
    /// Title shown to the player.
    pub title: String,
    /// Catalog version identifier, recorded in saves.
    #[serde(default = "default_version")]
    pub version: String,
    /// Free-text blurb.
    #[serde(default)]
    pub description: String,
}

/// Where and how a new session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartDef {
    /// Starting location.
    pub location: EntityId,
    /// Starting act; defaults to the first declared act.
    #[serde(default)]
    pub act: Option<EntityId>,
    /// Items carried at the start.
    #[serde(default)]
    pub inventory: Vec<EntityId>,
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A place the player can stand in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationDef {
    /// Identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Description shown on arrival.
    #[serde(default)]
    pub description: String,
    /// Extra names the player may type.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Guidance for the prose collaborator.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl Definition for LocationDef {
    const KIND: EntityKind = EntityKind::Location;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A physical object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemDef {
    /// Identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Description shown when examined.
    #[serde(default)]
    pub description: String,
    /// Extra names the player may type.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Initial location, if the item starts lying somewhere.
    #[serde(default)]
    pub location: Option<EntityId>,
    /// Initial holder, if a character starts with it.
    #[serde(default)]
    pub holder: Option<EntityId>,
    /// Whether the player can pick it up.
    #[serde(default = "yes")]
    pub portable: bool,
    /// Critical items can never be removed or destroyed.
    #[serde(default)]
    pub critical: bool,
    /// Guidance for the prose collaborator.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl Definition for ItemDef {
    const KIND: EntityKind = EntityKind::Item;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

/// A person or creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterDef {
    /// Identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Description shown when examined.
    #[serde(default)]
    pub description: String,
    /// Extra names the player may type.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Initial location.
    #[serde(default)]
    pub location: Option<EntityId>,
    /// Initial relational counters, e.g. `trust = 0`.
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
    /// Guidance for the prose collaborator.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl Definition for CharacterDef {
    const KIND: EntityKind = EntityKind::Character;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Exit
// ---------------------------------------------------------------------------

/// A one-way passage from one location to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExitDef {
    /// Identifier.
    pub id: EntityId,
    /// Origin location.
    pub from: EntityId,
    /// Destination location.
    pub to: EntityId,
    /// Compass direction, e.g. `north`.
    #[serde(default)]
    pub direction: Option<String>,
    /// Extra phrases that take this exit, e.g. `climb the stairs`.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Description shown when examined.
    #[serde(default)]
    pub description: String,
    /// Initially locked.
    #[serde(default)]
    pub locked: bool,
    /// Initially hidden.
    #[serde(default)]
    pub hidden: bool,
    /// The exit is only visible while this holds.
    #[serde(default)]
    pub visible_when: Option<Condition>,
    /// The exit only opens while this holds.
    #[serde(default)]
    pub open_when: Option<Condition>,
    /// Refusal text when locked.
    #[serde(default)]
    pub locked_message: Option<String>,
    /// Guidance for the prose collaborator.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl Definition for ExitDef {
    const KIND: EntityKind = EntityKind::Exit;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Interaction
// ---------------------------------------------------------------------------

/// Which intent an interaction answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// Triggered only by its own phrases.
    #[default]
    Interact,
    /// Runs when the target is examined.
    Examine,
    /// Runs when the item is taken.
    Take,
    /// Runs when the item is used (optionally on the target).
    Use,
    /// Runs when the target character is talked to.
    Talk,
}

/// An authored action with effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InteractionDef {
    /// Identifier.
    pub id: EntityId,
    /// Which intent it answers to.
    #[serde(default)]
    pub kind: InteractionKind,
    /// Phrases that trigger it directly, e.g. `pull the lever`.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Only available in this location.
    #[serde(default)]
    pub location: Option<EntityId>,
    /// Examined, talked-to or used-on entity.
    #[serde(default)]
    pub target: Option<EntityKey>,
    /// Item taken or used.
    #[serde(default)]
    pub item: Option<EntityId>,
    /// Precondition.
    #[serde(default)]
    pub requires: Option<Condition>,
    /// Refusal text when the precondition fails.
    #[serde(default)]
    pub refusal: Option<String>,
    /// Effects applied when approved.
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Authored response text.
    #[serde(default)]
    pub response: Option<String>,
    /// Non-repeatable interactions run once.
    #[serde(default)]
    pub repeatable: bool,
    /// Guidance for the prose collaborator.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl Definition for InteractionDef {
    const KIND: EntityKind = EntityKind::Interaction;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Beats, spokes, acts, victory
// ---------------------------------------------------------------------------

/// A story beat: a trigger condition plus effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeatDef {
    /// Identifier.
    pub id: EntityId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Fires when this holds. Gate beats ignore it.
    #[serde(default)]
    pub trigger: Condition,
    /// Effects applied when fired.
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Repeatable beats fire on every rising edge of the trigger.
    #[serde(default)]
    pub repeatable: bool,
    /// Guidance for the prose collaborator.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl Definition for BeatDef {
    const KIND: EntityKind = EntityKind::Beat;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// An objective inside an act.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpokeDef {
    /// Identifier.
    pub id: EntityId,
    /// Owning act.
    pub act: EntityId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Satisfied when this holds.
    pub condition: Condition,
}

impl Definition for SpokeDef {
    const KIND: EntityKind = EntityKind::Spoke;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// How an act's sets combine with the previous reachable sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActMode {
    /// Union with what was reachable before.
    #[default]
    Additive,
    /// Replace what was reachable before.
    Replace,
}

/// A reachable-content scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActDef {
    /// Identifier.
    pub id: EntityId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Locations reachable in this act.
    #[serde(default)]
    pub locations: Vec<EntityId>,
    /// Characters reachable in this act.
    #[serde(default)]
    pub characters: Vec<EntityId>,
    /// How the sets combine with earlier acts.
    #[serde(default)]
    pub mode: ActMode,
    /// Locations explicitly removed on entry.
    #[serde(default)]
    pub exclude_locations: Vec<EntityId>,
    /// Characters explicitly removed on entry.
    #[serde(default)]
    pub exclude_characters: Vec<EntityId>,
    /// Gate over this act's spokes; defaults to all of them.
    #[serde(default)]
    pub gate: Option<Condition>,
    /// Beat fired exactly once on the transition out of this act.
    #[serde(default)]
    pub gate_beat: Option<EntityId>,
    /// Guidance for the prose collaborator.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl Definition for ActDef {
    const KIND: EntityKind = EntityKind::Act;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }
}

/// A declared victory condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VictoryDef {
    /// Identifier.
    pub id: EntityId,
    /// Won when this holds.
    pub condition: Condition,
    /// Guidance for the prose collaborator.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl Definition for VictoryDef {
    const KIND: EntityKind = EntityKind::Victory;

    fn id(&self) -> &EntityId {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Migration rules
// ---------------------------------------------------------------------------

/// Identifier renames, per kind, from an older catalog version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameTable {
    /// Location renames.
    #[serde(default)]
    pub locations: BTreeMap<String, String>,
    /// Item renames.
    #[serde(default)]
    pub items: BTreeMap<String, String>,
    /// Character renames.
    #[serde(default)]
    pub characters: BTreeMap<String, String>,
    /// Exit renames.
    #[serde(default)]
    pub exits: BTreeMap<String, String>,
    /// Interaction renames.
    #[serde(default)]
    pub interactions: BTreeMap<String, String>,
    /// Beat renames.
    #[serde(default)]
    pub beats: BTreeMap<String, String>,
    /// Spoke renames.
    #[serde(default)]
    pub spokes: BTreeMap<String, String>,
    /// Act renames.
    #[serde(default)]
    pub acts: BTreeMap<String, String>,
    /// Flag renames.
    #[serde(default)]
    pub flags: BTreeMap<String, String>,
}

impl RenameTable {
    /// The rename map for an entity kind, if that kind can be renamed.
    pub fn for_kind(&self, kind: EntityKind) -> Option<&BTreeMap<String, String>> {
        match kind {
            EntityKind::Location => Some(&self.locations),
            EntityKind::Item => Some(&self.items),
            EntityKind::Character => Some(&self.characters),
            EntityKind::Exit => Some(&self.exits),
            EntityKind::Interaction => Some(&self.interactions),
            EntityKind::Beat => Some(&self.beats),
            EntityKind::Spoke => Some(&self.spokes),
            EntityKind::Act => Some(&self.acts),
            EntityKind::Victory => None,
        }
    }
}

/// How to carry a save from an older catalog version into this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationRule {
    /// Catalog version this rule migrates from.
    pub from: String,
    /// Identifier renames.
    #[serde(default)]
    pub rename: RenameTable,
    /// Flags that no longer exist.
    #[serde(default)]
    pub drop_flags: Vec<String>,
    /// Where to put the player if their location no longer exists.
    #[serde(default)]
    pub relocate: Option<EntityId>,
    /// Silently drop progress that refers to removed entities.
    #[serde(default)]
    pub discard_missing: bool,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// One authored document. A world is the merge of one or more documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldDocument {
    /// World metadata (at most one document may declare it).
    #[serde(default)]
    pub world: Option<WorldInfo>,
    /// Session start (at most one document may declare it).
    #[serde(default)]
    pub start: Option<StartDef>,
    /// Locations.
    #[serde(default)]
    pub locations: Vec<LocationDef>,
    /// Items.
    #[serde(default)]
    pub items: Vec<ItemDef>,
    /// Characters.
    #[serde(default)]
    pub characters: Vec<CharacterDef>,
    /// Exits.
    #[serde(default)]
    pub exits: Vec<ExitDef>,
    /// Interactions.
    #[serde(default)]
    pub interactions: Vec<InteractionDef>,
    /// Story beats, in firing order.
    #[serde(default)]
    pub beats: Vec<BeatDef>,
    /// Spokes.
    #[serde(default)]
    pub spokes: Vec<SpokeDef>,
    /// Acts, in sequence order.
    #[serde(default)]
    pub acts: Vec<ActDef>,
    /// Victory conditions.
    #[serde(default)]
    pub victory: Vec<VictoryDef>,
    /// Save migration rules.
    #[serde(default)]
    pub migrations: Vec<MigrationRule>,
}

impl WorldDocument {
    /// Append another document's sections to this one, preserving order.
    ///
    /// Returns the names of singleton sections declared by both.
    pub fn merge(&mut self, other: WorldDocument) -> Vec<&'static str> {
        let mut duplicates = Vec::new();
        match (&self.world, other.world) {
            (Some(_), Some(_)) => duplicates.push("world"),
            (None, Some(w)) => self.world = Some(w),
            _ => {}
        }
        match (&self.start, other.start) {
            (Some(_), Some(_)) => duplicates.push("start"),
            (None, Some(s)) => self.start = Some(s),
            _ => {}
        }
        self.locations.extend(other.locations);
        self.items.extend(other.items);
        self.characters.extend(other.characters);
        self.exits.extend(other.exits);
        self.interactions.extend(other.interactions);
        self.beats.extend(other.beats);
        self.spokes.extend(other.spokes);
        self.acts.extend(other.acts);
        self.victory.extend(other.victory);
        self.migrations.extend(other.migrations);
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_defaults() {
        let item: ItemDef =
            serde_json::from_str(r#"{"id": "lamp", "name": "brass lamp"}"#).unwrap();
        assert!(item.portable);
        assert!(!item.critical);
        assert!(item.location.is_none());
        assert_eq!(item.display_name(), "brass lamp");
        assert_eq!(item.key(), EntityKey::item("lamp"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<LocationDef, _> =
            serde_json::from_str(r#"{"id": "L0", "name": "Dock", "colour": "blue"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn interaction_target_is_a_key_string() {
        let interaction: InteractionDef = serde_json::from_str(
            r#"{"id": "greet", "kind": "talk", "target": "character:jenkins"}"#,
        )
        .unwrap();
        assert_eq!(interaction.kind, InteractionKind::Talk);
        assert_eq!(interaction.target, Some(EntityKey::character("jenkins")));
        assert!(!interaction.repeatable);
    }

    #[test]
    fn merge_reports_duplicate_singletons() {
        let info = WorldInfo {
            title: "A".to_string(),
            version: "1.0".to_string(),
            description: String::new(),
        };
        let mut a = WorldDocument {
            world: Some(info.clone()),
            ..Default::default()
        };
        let b = WorldDocument {
            world: Some(info),
            locations: vec![LocationDef {
                id: EntityId::new("L0"),
                name: "Dock".to_string(),
                description: String::new(),
                aliases: vec![],
                narrative: None,
            }],
            ..Default::default()
        };
        assert_eq!(a.merge(b), vec!["world"]);
        assert_eq!(a.locations.len(), 1);
    }

    #[test]
    fn rename_table_lookup_by_kind() {
        let mut table = RenameTable::default();
        table
            .locations
            .insert("old_dock".to_string(), "dock".to_string());
        assert_eq!(
            table
                .for_kind(EntityKind::Location)
                .and_then(|m| m.get("old_dock"))
                .map(String::as_str),
            Some("dock")
        );
        assert!(table.for_kind(EntityKind::Victory).is_none());
    }
}
