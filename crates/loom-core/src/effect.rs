//! Effects: single declared state mutations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityKey, EntityKind, FlagValue};

/// A single state mutation. Effects are declared by interactions and beats,
/// or synthesised by the planner from an intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Set a flag (default value `true`).
    SetFlag {
        /// Flag name.
        flag: String,
        /// Value to set.
        #[serde(default)]
        value: FlagValue,
    },
    /// Remove a flag.
    ClearFlag(String),
    /// Put an item into the inventory.
    GiveItem(EntityId),
    /// Take an item out of the inventory; it leaves play until placed again.
    RemoveItem(EntityId),
    /// Destroy an item wherever it is.
    DestroyItem(EntityId),
    /// Move an item into a location.
    PlaceItem {
        /// Item identifier.
        item: EntityId,
        /// Destination location.
        location: EntityId,
    },
    /// Hand an item to a character.
    HandItem {
        /// Item identifier.
        item: EntityId,
        /// Receiving character.
        character: EntityId,
    },
    /// Move the player.
    MovePlayer(EntityId),
    /// Move a character.
    MoveCharacter {
        /// Character identifier.
        character: EntityId,
        /// Destination location.
        location: EntityId,
    },
    /// Add `delta` to a relational counter.
    AdjustCounter {
        /// Character owning the counter.
        character: EntityId,
        /// Counter name.
        counter: String,
        /// Signed change.
        delta: i64,
    },
    /// Overwrite a relational counter.
    SetCounter {
        /// Character owning the counter.
        character: EntityId,
        /// Counter name.
        counter: String,
        /// New value.
        value: i64,
    },
    /// Unlock an exit.
    UnlockExit(EntityId),
    /// Lock an exit.
    LockExit(EntityId),
    /// Make a hidden exit visible.
    RevealExit(EntityId),
    /// Hide an exit.
    HideExit(EntityId),
    /// Override the description of a location, item or character.
    Describe {
        /// Kind of the described entity.
        kind: EntityKind,
        /// Identifier of the described entity.
        id: EntityId,
        /// New description.
        text: String,
    },
    /// Record a spoke as complete.
    CompleteSpoke(EntityId),
    /// Advance the act state machine to the given act.
    AdvanceAct(EntityId),
}

impl Effect {
    /// Collect every entity this effect refers to.
    pub fn references(&self, out: &mut Vec<EntityKey>) {
        match self {
            Effect::SetFlag { .. } | Effect::ClearFlag(_) => {}
            Effect::GiveItem(item) | Effect::RemoveItem(item) | Effect::DestroyItem(item) => {
                out.push(EntityKey::item(item.clone()))
            }
            Effect::PlaceItem { item, location } => {
                out.push(EntityKey::item(item.clone()));
                out.push(EntityKey::location(location.clone()));
            }
            Effect::HandItem { item, character } => {
                out.push(EntityKey::item(item.clone()));
                out.push(EntityKey::character(character.clone()));
            }
            Effect::MovePlayer(location) => out.push(EntityKey::location(location.clone())),
            Effect::MoveCharacter {
                character,
                location,
            } => {
                out.push(EntityKey::character(character.clone()));
                out.push(EntityKey::location(location.clone()));
            }
            Effect::AdjustCounter { character, .. } | Effect::SetCounter { character, .. } => {
                out.push(EntityKey::character(character.clone()))
            }
            Effect::UnlockExit(exit)
            | Effect::LockExit(exit)
            | Effect::RevealExit(exit)
            | Effect::HideExit(exit) => out.push(EntityKey::exit(exit.clone())),
            Effect::Describe { kind, id, .. } => out.push(EntityKey::new(*kind, id.clone())),
            Effect::CompleteSpoke(spoke) => {
                out.push(EntityKey::new(EntityKind::Spoke, spoke.clone()))
            }
            Effect::AdvanceAct(act) => out.push(EntityKey::new(EntityKind::Act, act.clone())),
        }
    }

    /// The flag this effect writes, if any.
    pub fn flag_written(&self) -> Option<&str> {
        match self {
            Effect::SetFlag { flag, .. } => Some(flag),
            _ => None,
        }
    }

    /// The item this effect unconditionally takes out of play.
    ///
    /// Drops and hand-overs only remove an item when it is carried, which
    /// depends on state; see the validator for the runtime check.
    pub fn unconditional_removal(&self) -> Option<&EntityId> {
        match self {
            Effect::RemoveItem(item) | Effect::DestroyItem(item) => Some(item),
            _ => None,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::SetFlag { flag, value } => write!(f, "set_flag({flag}={value})"),
            Effect::ClearFlag(flag) => write!(f, "clear_flag({flag})"),
            Effect::GiveItem(item) => write!(f, "give_item({item})"),
            Effect::RemoveItem(item) => write!(f, "remove_item({item})"),
            Effect::DestroyItem(item) => write!(f, "destroy_item({item})"),
            Effect::PlaceItem { item, location } => write!(f, "place_item({item} -> {location})"),
            Effect::HandItem { item, character } => write!(f, "hand_item({item} -> {character})"),
            Effect::MovePlayer(location) => write!(f, "move_player({location})"),
            Effect::MoveCharacter {
                character,
                location,
            } => write!(f, "move_character({character} -> {location})"),
            Effect::AdjustCounter {
                character,
                counter,
                delta,
            } => write!(f, "adjust_counter({character}.{counter} {delta:+})"),
            Effect::SetCounter {
                character,
                counter,
                value,
            } => write!(f, "set_counter({character}.{counter}={value})"),
            Effect::UnlockExit(exit) => write!(f, "unlock_exit({exit})"),
            Effect::LockExit(exit) => write!(f, "lock_exit({exit})"),
            Effect::RevealExit(exit) => write!(f, "reveal_exit({exit})"),
            Effect::HideExit(exit) => write!(f, "hide_exit({exit})"),
            Effect::Describe { kind, id, .. } => write!(f, "describe({kind}:{id})"),
            Effect::CompleteSpoke(spoke) => write!(f, "complete_spoke({spoke})"),
            Effect::AdvanceAct(act) => write!(f, "advance_act({act})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_flag_defaults_to_true() {
        let effect: Effect = serde_json::from_str(r#"{"set_flag": {"flag": "explored_L0"}}"#).unwrap();
        assert_eq!(
            effect,
            Effect::SetFlag {
                flag: "explored_L0".to_string(),
                value: FlagValue::Bool(true),
            }
        );
        assert_eq!(effect.flag_written(), Some("explored_L0"));
    }

    #[test]
    fn newtype_effects_deserialize() {
        let effect: Effect = serde_json::from_str(r#"{"destroy_item": "letter"}"#).unwrap();
        assert_eq!(effect, Effect::DestroyItem(EntityId::new("letter")));
        assert_eq!(
            effect.unconditional_removal(),
            Some(&EntityId::new("letter"))
        );
    }

    #[test]
    fn references_cover_both_ends() {
        let mut refs = Vec::new();
        Effect::HandItem {
            item: EntityId::new("coin"),
            character: EntityId::new("jenkins"),
        }
        .references(&mut refs);
        assert_eq!(
            refs,
            vec![EntityKey::item("coin"), EntityKey::character("jenkins")]
        );
    }

    #[test]
    fn display_is_compact() {
        let effect = Effect::AdjustCounter {
            character: EntityId::new("jenkins"),
            counter: "trust".to_string(),
            delta: 2,
        };
        assert_eq!(effect.to_string(), "adjust_counter(jenkins.trust +2)");
    }
}
