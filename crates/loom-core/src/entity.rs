use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of an authored entity. Unique within its [`EntityKind`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an authored identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as written in the world documents.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The kind of an authored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A place the player can stand in.
    Location,
    /// A physical object.
    Item,
    /// A person or creature.
    Character,
    /// A one-way passage between two locations.
    Exit,
    /// An authored action with effects.
    Interaction,
    /// A story beat: trigger condition plus effects.
    Beat,
    /// An objective inside an act.
    Spoke,
    /// A reachable-content scope.
    Act,
    /// A declared victory condition.
    Victory,
}

impl EntityKind {
    /// All kinds, in catalog section order.
    pub const ALL: [EntityKind; 9] = [
        Self::Location,
        Self::Item,
        Self::Character,
        Self::Exit,
        Self::Interaction,
        Self::Beat,
        Self::Spoke,
        Self::Act,
        Self::Victory,
    ];

    /// Lowercase name used in keys and documents.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Item => "item",
            Self::Character => "character",
            Self::Exit => "exit",
            Self::Interaction => "interaction",
            Self::Beat => "beat",
            Self::Spoke => "spoke",
            Self::Act => "act",
            Self::Victory => "victory",
        }
    }

    /// Parse a kind from its lowercase name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == s)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `(kind, id)` pair addressing one catalog entity, rendered `kind:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityKey {
    /// Entity kind.
    pub kind: EntityKind,
    /// Entity identifier.
    pub id: EntityId,
}

impl EntityKey {
    /// Build a key.
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a location key.
    pub fn location(id: impl Into<EntityId>) -> Self {
        Self::new(EntityKind::Location, id)
    }

    /// Shorthand for an item key.
    pub fn item(id: impl Into<EntityId>) -> Self {
        Self::new(EntityKind::Item, id)
    }

    /// Shorthand for a character key.
    pub fn character(id: impl Into<EntityId>) -> Self {
        Self::new(EntityKind::Character, id)
    }

    /// Shorthand for an exit key.
    pub fn exit(id: impl Into<EntityId>) -> Self {
        Self::new(EntityKind::Exit, id)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for EntityKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("expected `kind:id`, got `{s}`"))?;
        let kind = EntityKind::parse(kind).ok_or_else(|| format!("unknown entity kind `{kind}`"))?;
        if id.is_empty() {
            return Err(format!("empty identifier in `{s}`"));
        }
        Ok(Self::new(kind, id))
    }
}

impl TryFrom<String> for EntityKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityKey> for String {
    fn from(key: EntityKey) -> Self {
        key.to_string()
    }
}

/// A session flag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// A boolean marker.
    Bool(bool),
    /// An integer marker.
    Integer(i64),
    /// A text marker.
    Text(String),
}

impl FlagValue {
    /// `false`, `0` and the empty string are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Integer(n) => *n != 0,
            Self::Text(s) => !s.is_empty(),
        }
    }
}

impl Default for FlagValue {
    fn default() -> Self {
        Self::Bool(true)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FlagValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
