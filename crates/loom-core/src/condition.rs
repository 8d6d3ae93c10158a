//! Boolean expressions over session state.
//!
//! Conditions gate exits, interactions, beats, spokes, act gates and
//! victory. They are evaluated through the [`Resolver`], never against the
//! raw store.

use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, EntityKey, EntityKind, FlagValue};
use crate::resolver::Resolver;

/// Comparison operator for counter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparison {
    /// Equal.
    #[serde(rename = "==")]
    Eq,
    /// Not equal.
    #[serde(rename = "!=")]
    Ne,
    /// Less than.
    #[serde(rename = "<")]
    Lt,
    /// Less than or equal.
    #[serde(rename = "<=")]
    Le,
    /// Greater than.
    #[serde(rename = ">")]
    Gt,
    /// Greater than or equal.
    #[default]
    #[serde(rename = ">=")]
    Ge,
}

impl Comparison {
    /// Apply the operator to `lhs` and `rhs`.
    pub fn holds(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// A condition that can be evaluated against the effective session state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Always true.
    #[default]
    Always,
    /// The flag is set to a truthy value.
    Flag(String),
    /// The flag is set to exactly this value.
    FlagEquals {
        /// Flag name.
        flag: String,
        /// Expected value.
        value: FlagValue,
    },
    /// The item is in the inventory.
    HasItem(EntityId),
    /// The item lies in the given location.
    ItemAt {
        /// Item identifier.
        item: EntityId,
        /// Location identifier.
        location: EntityId,
    },
    /// The player stands in the given location.
    At(EntityId),
    /// A relational counter compares against a value.
    Counter {
        /// Character owning the counter.
        character: EntityId,
        /// Counter name, e.g. `trust`.
        counter: String,
        /// Comparison operator (default `>=`).
        #[serde(default)]
        cmp: Comparison,
        /// Right-hand side.
        value: i64,
    },
    /// The spoke is complete or its condition currently holds.
    Spoke(EntityId),
    /// The beat has fired at least once.
    BeatFired(EntityId),
    /// The act is current or has been passed.
    ActReached(EntityId),
    /// The non-repeatable interaction has been used.
    InteractionUsed(EntityId),
    /// Logical NOT.
    Not(Box<Condition>),
    /// Logical AND.
    All(Vec<Condition>),
    /// Logical OR.
    Any(Vec<Condition>),
}

impl Condition {
    /// Evaluate the condition against the current effective state.
    pub fn evaluate(&self, resolver: &Resolver<'_>) -> bool {
        let state = resolver.state();
        match self {
            Condition::Always => true,
            Condition::Flag(flag) => resolver.flag_is_set(flag),
            Condition::FlagEquals { flag, value } => state.flag(flag) == Some(value),
            Condition::HasItem(item) => state.has_item(item),
            Condition::ItemAt { item, location } => {
                resolver.item_placement(item).is_in_location(location)
            }
            Condition::At(location) => state.location() == location,
            Condition::Counter {
                character,
                counter,
                cmp,
                value,
            } => cmp.holds(resolver.counter(character, counter), *value),
            Condition::Spoke(spoke) => resolver.spoke_satisfied(spoke),
            Condition::BeatFired(beat) => state.beat_fired(beat),
            Condition::ActReached(act) => state.act_reached(act),
            Condition::InteractionUsed(interaction) => state.interaction_used(interaction),
            Condition::Not(inner) => !inner.evaluate(resolver),
            Condition::All(conditions) => conditions.iter().all(|c| c.evaluate(resolver)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.evaluate(resolver)),
        }
    }

    /// Collect every entity this condition refers to.
    pub fn references(&self, out: &mut Vec<EntityKey>) {
        match self {
            Condition::Always | Condition::Flag(_) | Condition::FlagEquals { .. } => {}
            Condition::HasItem(item) => out.push(EntityKey::item(item.clone())),
            Condition::ItemAt { item, location } => {
                out.push(EntityKey::item(item.clone()));
                out.push(EntityKey::location(location.clone()));
            }
            Condition::At(location) => out.push(EntityKey::location(location.clone())),
            Condition::Counter { character, .. } => {
                out.push(EntityKey::character(character.clone()))
            }
            Condition::Spoke(spoke) => out.push(EntityKey::new(EntityKind::Spoke, spoke.clone())),
            Condition::BeatFired(beat) => out.push(EntityKey::new(EntityKind::Beat, beat.clone())),
            Condition::ActReached(act) => out.push(EntityKey::new(EntityKind::Act, act.clone())),
            Condition::InteractionUsed(interaction) => {
                out.push(EntityKey::new(EntityKind::Interaction, interaction.clone()))
            }
            Condition::Not(inner) => inner.references(out),
            Condition::All(conditions) | Condition::Any(conditions) => {
                for c in conditions {
                    c.references(out);
                }
            }
        }
    }

    /// Collect every flag name this condition reads.
    pub fn flags_read<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Flag(flag) | Condition::FlagEquals { flag, .. } => out.push(flag),
            Condition::Not(inner) => inner.flags_read(out),
            Condition::All(conditions) | Condition::Any(conditions) => {
                for c in conditions {
                    c.flags_read(out);
                }
            }
            _ => {}
        }
    }

    /// Spokes this condition mentions, in order of appearance.
    pub fn spokes(&self) -> Vec<&EntityId> {
        let mut out = Vec::new();
        self.collect_spokes(&mut out);
        out
    }

    fn collect_spokes<'a>(&'a self, out: &mut Vec<&'a EntityId>) {
        match self {
            Condition::Spoke(spoke) => out.push(spoke),
            Condition::Not(inner) => inner.collect_spokes(out),
            Condition::All(conditions) | Condition::Any(conditions) => {
                for c in conditions {
                    c.collect_spokes(out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_operators() {
        assert!(Comparison::Ge.holds(3, 3));
        assert!(!Comparison::Gt.holds(3, 3));
        assert!(Comparison::Lt.holds(1, 3));
        assert!(Comparison::Le.holds(3, 3));
        assert!(Comparison::Eq.holds(2, 2));
        assert!(Comparison::Ne.holds(2, 4));
    }

    #[test]
    fn condition_json_shape() {
        let cond: Condition = serde_json::from_str(
            r#"{"all": [{"flag": "explored_L0"},
                        {"counter": {"character": "jenkins", "counter": "trust", "value": 3}}]}"#,
        )
        .unwrap();
        assert_eq!(
            cond,
            Condition::All(vec![
                Condition::Flag("explored_L0".to_string()),
                Condition::Counter {
                    character: EntityId::new("jenkins"),
                    counter: "trust".to_string(),
                    cmp: Comparison::Ge,
                    value: 3,
                },
            ])
        );
    }

    #[test]
    fn unit_variant_is_a_bare_string() {
        let cond: Condition = serde_json::from_str("\"always\"").unwrap();
        assert_eq!(cond, Condition::Always);
    }

    #[test]
    fn references_walk_nested_expressions() {
        let cond = Condition::Any(vec![
            Condition::HasItem(EntityId::new("lamp")),
            Condition::Not(Box::new(Condition::At(EntityId::new("cellar")))),
            Condition::Spoke(EntityId::new("spoke_trust")),
        ]);
        let mut refs = Vec::new();
        cond.references(&mut refs);
        assert_eq!(
            refs,
            vec![
                EntityKey::item("lamp"),
                EntityKey::location("cellar"),
                EntityKey::new(EntityKind::Spoke, "spoke_trust"),
            ]
        );
        assert_eq!(cond.spokes(), vec![&EntityId::new("spoke_trust")]);
    }

    #[test]
    fn flags_read_collects_names() {
        let cond = Condition::All(vec![
            Condition::Flag("a".to_string()),
            Condition::Not(Box::new(Condition::FlagEquals {
                flag: "b".to_string(),
                value: FlagValue::Integer(2),
            })),
        ]);
        let mut flags = Vec::new();
        cond.flags_read(&mut flags);
        assert_eq!(flags, vec!["a", "b"]);
    }
}
