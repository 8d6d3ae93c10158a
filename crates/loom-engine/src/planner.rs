//! Effect planning.
//!
//! A pure lookup from an [`Intent`] to the effects it would commit if
//! approved. Nothing here checks whether the intent is allowed; that is the
//! validator's job.

use loom_core::definition::{InteractionDef, InteractionKind};
use loom_core::{Catalog, Effect, EntityId, EntityKey, EntityKind, Resolver, StateStore};

use crate::intent::Intent;
use crate::scope;

/// The effects an intent would produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// The intent being planned.
    pub intent: Intent,
    /// Effects to commit, in order.
    pub effects: Vec<Effect>,
    /// The authored interaction contributing effects, if any.
    pub interaction: Option<EntityId>,
    /// Authored response text, if any.
    pub response: Option<String>,
}

impl Plan {
    fn bare(intent: Intent, effects: Vec<Effect>) -> Self {
        Self {
            intent,
            effects,
            interaction: None,
            response: None,
        }
    }

    fn with_interaction(mut self, def: Option<&InteractionDef>) -> Self {
        if let Some(def) = def {
            self.effects.extend(def.effects.iter().cloned());
            self.interaction = Some(def.id.clone());
            self.response = def.response.clone();
        }
        self
    }
}

/// Plan an intent against the current state.
pub fn plan(catalog: &Catalog, state: &StateStore, intent: &Intent) -> Plan {
    let resolver = Resolver::new(catalog, state);
    let here = state.location().clone();
    match intent {
        Intent::Move { exit } => {
            let effects = catalog
                .exits()
                .get(exit.as_str())
                .map(|def| vec![Effect::MovePlayer(def.to.clone())])
                .unwrap_or_default();
            Plan::bare(intent.clone(), effects)
        }
        Intent::Examine { target: None } => Plan::bare(intent.clone(), Vec::new()),
        Intent::Examine {
            target: Some(target),
        } => {
            // Examining only runs a rider when it can actually happen.
            let rider = interactions(&resolver, InteractionKind::Examine)
                .find(|i| i.target.as_ref() == Some(target) && scope::interaction_ready(i, &resolver));
            Plan::bare(intent.clone(), Vec::new()).with_interaction(rider)
        }
        Intent::Take { target } => {
            let effects = match target.kind {
                EntityKind::Item => vec![Effect::GiveItem(target.id.clone())],
                _ => Vec::new(),
            };
            let rider = preferred(
                &resolver,
                interactions(&resolver, InteractionKind::Take)
                    .filter(|i| i.item.as_ref() == Some(&target.id)),
            );
            Plan::bare(intent.clone(), effects).with_interaction(rider)
        }
        Intent::Drop { target } => {
            let effects = match target.kind {
                EntityKind::Item => vec![Effect::PlaceItem {
                    item: target.id.clone(),
                    location: here,
                }],
                _ => Vec::new(),
            };
            Plan::bare(intent.clone(), effects)
        }
        Intent::Use { item, on } => {
            let def = preferred(
                &resolver,
                interactions(&resolver, InteractionKind::Use).filter(|i| {
                    i.item.as_ref() == Some(&item.id)
                        && item.kind == EntityKind::Item
                        && i.target.as_ref() == on.as_ref()
                }),
            );
            Plan::bare(intent.clone(), Vec::new()).with_interaction(def)
        }
        Intent::Talk { target } => {
            let def = preferred(
                &resolver,
                interactions(&resolver, InteractionKind::Talk)
                    .filter(|i| i.target.as_ref() == Some(target)),
            );
            Plan::bare(intent.clone(), Vec::new()).with_interaction(def)
        }
        Intent::Interact { interaction } => {
            let def = catalog.interactions().get(interaction.as_str());
            Plan::bare(intent.clone(), Vec::new()).with_interaction(def)
        }
    }
}

/// Interactions of one kind offered here, in declaration order.
fn interactions<'a>(
    resolver: &Resolver<'a>,
    kind: InteractionKind,
) -> impl Iterator<Item = &'a InteractionDef> + 'a {
    let state = resolver.state();
    resolver
        .catalog()
        .interactions()
        .iter()
        .filter(move |i| i.kind == kind && scope::interaction_in_scope(i, state))
}

/// The first interaction that can run; failing that, the first unspent one
/// (so its unmet requirement is reported); failing that, none.
fn preferred<'a>(
    resolver: &Resolver<'_>,
    candidates: impl Iterator<Item = &'a InteractionDef>,
) -> Option<&'a InteractionDef> {
    let state = resolver.state();
    let unspent: Vec<&InteractionDef> = candidates
        .filter(|i| !scope::interaction_spent(i, state))
        .collect();
    unspent
        .iter()
        .find(|i| scope::interaction_ready(i, resolver))
        .or_else(|| unspent.first())
        .copied()
}

/// The key an interaction is about, for narration.
pub fn interaction_subject(def: &InteractionDef) -> Option<EntityKey> {
    def.target
        .clone()
        .or_else(|| def.item.clone().map(EntityKey::item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id, lighthouse, state_at};

    #[test]
    fn move_plans_the_destination() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");
        let plan = plan(
            &catalog,
            &state,
            &Intent::Move {
                exit: id("dock_north"),
            },
        );
        assert_eq!(plan.effects, vec![Effect::MovePlayer(id("path"))]);
        assert!(plan.interaction.is_none());
    }

    #[test]
    fn take_and_drop_are_synthesised() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");
        let take = plan(
            &catalog,
            &state,
            &Intent::Take {
                target: EntityKey::item("lamp"),
            },
        );
        assert_eq!(take.effects, vec![Effect::GiveItem(id("lamp"))]);

        let drop = plan(
            &catalog,
            &state,
            &Intent::Drop {
                target: EntityKey::item("iron_key"),
            },
        );
        assert_eq!(
            drop.effects,
            vec![Effect::PlaceItem {
                item: id("iron_key"),
                location: id("dock"),
            }]
        );
    }

    #[test]
    fn examine_picks_up_a_ready_rider() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "cottage");
        let intent = Intent::Examine {
            target: Some(EntityKey::item("letter")),
        };
        let first = plan(&catalog, &state, &intent);
        assert_eq!(first.interaction, Some(id("read_letter")));
        assert_eq!(first.effects.len(), 1);
        assert!(first.response.is_some());

        state.mark_interaction_used(id("read_letter"));
        let again = plan(&catalog, &state, &intent);
        assert!(again.interaction.is_none());
        assert!(again.effects.is_empty());
    }

    #[test]
    fn talk_uses_the_authored_conversation() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "cottage");
        let plan = plan(
            &catalog,
            &state,
            &Intent::Talk {
                target: EntityKey::character("jenkins"),
            },
        );
        assert_eq!(plan.interaction, Some(id("talk_jenkins")));
        assert_eq!(plan.effects.len(), 1);
    }

    #[test]
    fn use_matches_item_and_location() {
        let catalog = lighthouse();
        let intent = Intent::Use {
            item: EntityKey::item("lamp"),
            on: None,
        };
        let elsewhere = plan(&catalog, &state_at(&catalog, "dock"), &intent);
        assert!(elsewhere.interaction.is_none());
        assert!(elsewhere.effects.is_empty());

        let lantern = plan(&catalog, &state_at(&catalog, "lantern"), &intent);
        assert_eq!(lantern.interaction, Some(id("light_lamp")));
    }

    #[test]
    fn interaction_subject_prefers_target() {
        let catalog = lighthouse();
        let talk = catalog.interactions().get("talk_jenkins").unwrap();
        assert_eq!(interaction_subject(talk), Some(EntityKey::character("jenkins")));
        let light = catalog.interactions().get("light_lamp").unwrap();
        assert_eq!(interaction_subject(light), Some(EntityKey::item("lamp")));
    }
}
