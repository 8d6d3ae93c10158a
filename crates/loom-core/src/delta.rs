//! Sparse runtime overrides of catalog entities.
//!
//! A delta only holds the fields that differ from the catalog. Setting a
//! field back to its authored value removes it; a delta with no fields is
//! removed from the store.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityKind};

/// Where an item currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Lying in a location.
    Location(EntityId),
    /// In the player's inventory.
    Carried,
    /// Held by a character.
    Holder(EntityId),
    /// Out of play but not destroyed.
    Limbo,
    /// Destroyed.
    Destroyed,
}

impl Placement {
    /// Whether the item lies in `location`.
    pub fn is_in_location(&self, location: &EntityId) -> bool {
        matches!(self, Placement::Location(l) if l == location)
    }

    /// Whether the item is still in play.
    pub fn in_play(&self) -> bool {
        !matches!(self, Placement::Limbo | Placement::Destroyed)
    }
}

/// Override of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationDelta {
    /// Replacement description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Override of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDelta {
    /// Current placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    /// Replacement description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Override of a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDelta {
    /// Current location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<EntityId>,
    /// Replacement description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Override of an exit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitDelta {
    /// Current lock state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    /// Current hidden state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    /// Replacement description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A runtime override of one catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDelta {
    /// Location override.
    Location(LocationDelta),
    /// Item override.
    Item(ItemDelta),
    /// Character override.
    Character(CharacterDelta),
    /// Exit override.
    Exit(ExitDelta),
}

impl EntityDelta {
    /// An empty delta for `kind`, if that kind can be overridden.
    pub fn empty(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Location => Some(Self::Location(LocationDelta::default())),
            EntityKind::Item => Some(Self::Item(ItemDelta::default())),
            EntityKind::Character => Some(Self::Character(CharacterDelta::default())),
            EntityKind::Exit => Some(Self::Exit(ExitDelta::default())),
            _ => None,
        }
    }

    /// Number of overridden fields.
    pub fn field_count(&self) -> usize {
        match self {
            Self::Location(d) => usize::from(d.description.is_some()),
            Self::Item(d) => usize::from(d.placement.is_some()) + usize::from(d.description.is_some()),
            Self::Character(d) => {
                usize::from(d.location.is_some()) + usize::from(d.description.is_some())
            }
            Self::Exit(d) => {
                usize::from(d.locked.is_some())
                    + usize::from(d.hidden.is_some())
                    + usize::from(d.description.is_some())
            }
        }
    }

    /// Whether no field is overridden.
    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    /// The overridden description, if any.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Location(d) => d.description.as_deref(),
            Self::Item(d) => d.description.as_deref(),
            Self::Character(d) => d.description.as_deref(),
            Self::Exit(d) => d.description.as_deref(),
        }
    }

    /// Mutable access to the description slot.
    pub(crate) fn description_mut(&mut self) -> &mut Option<String> {
        match self {
            Self::Location(d) => &mut d.description,
            Self::Item(d) => &mut d.description,
            Self::Character(d) => &mut d.description,
            Self::Exit(d) => &mut d.description,
        }
    }
}
