//! Intent validation.
//!
//! A pure function of the intent, its planned effects, the catalog and the
//! current state. Checks run in a fixed order: the verb must fit its
//! target, then accessibility, ownership, critical-item protection and
//! finally the winnability check in [`safety`].

/// Optimistic reachability of the victory conditions.
pub mod safety;

use std::collections::BTreeSet;
use std::fmt;

use loom_core::{Catalog, Effect, EntityId, EntityKey, EntityKind, Resolver, StateStore};
use serde::Serialize;

use crate::applicator;
use crate::intent::Intent;
use crate::planner::Plan;
use crate::scope;

/// Why an intent was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    /// The destination belongs to an act not yet reached.
    ActBoundaryViolation,
    /// The exit is not visible.
    ExitHidden,
    /// The exit is locked.
    ExitLocked,
    /// An interaction's requirement does not hold.
    RequirementUnmet,
    /// A one-off interaction already ran.
    AlreadyDone,
    /// The item is not in the inventory.
    NotCarried,
    /// The target is not here.
    NotHere,
    /// The item is already in the inventory.
    AlreadyCarried,
    /// The item cannot be picked up.
    NotPortable,
    /// A critical item would be removed or destroyed.
    CriticalItemProtectionTriggered,
    /// The world would become unwinnable.
    SafetyInvariantViolation,
}

impl RejectionCode {
    /// Stable snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActBoundaryViolation => "act_boundary_violation",
            Self::ExitHidden => "exit_hidden",
            Self::ExitLocked => "exit_locked",
            Self::RequirementUnmet => "requirement_unmet",
            Self::AlreadyDone => "already_done",
            Self::NotCarried => "not_carried",
            Self::NotHere => "not_here",
            Self::AlreadyCarried => "already_carried",
            Self::NotPortable => "not_portable",
            Self::CriticalItemProtectionTriggered => "critical_item_protection_triggered",
            Self::SafetyInvariantViolation => "safety_invariant_violation",
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refusal with a player-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Machine-readable code.
    pub code: RejectionCode,
    /// Human reason.
    pub reason: String,
}

/// Outcome of validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Commit these effects.
    Approved(Vec<Effect>),
    /// Refuse the intent.
    Rejected(Rejection),
    /// The verb does not fit its target; ask the player to rephrase.
    Reinterpret(String),
}

impl Verdict {
    /// Whether the verdict approves the plan.
    pub fn is_approved(&self) -> bool {
        matches!(self, Verdict::Approved(_))
    }

    /// The rejection code, if rejected.
    pub fn rejection_code(&self) -> Option<RejectionCode> {
        match self {
            Verdict::Rejected(rejection) => Some(rejection.code),
            _ => None,
        }
    }
}

type Check = Result<(), Verdict>;

fn reject(code: RejectionCode, reason: impl Into<String>) -> Verdict {
    Verdict::Rejected(Rejection {
        code,
        reason: reason.into(),
    })
}

/// Validate a plan against the current state.
pub fn validate(catalog: &Catalog, state: &StateStore, plan: &Plan) -> Verdict {
    let resolver = Resolver::new(catalog, state);
    let checks = kind_fit(&resolver, &plan.intent)
        .and_then(|()| accessibility(&resolver, plan))
        .and_then(|()| ownership(&resolver, &plan.intent))
        .and_then(|()| critical_protection(&resolver, &plan.effects))
        .and_then(|()| winnability(catalog, state, &plan.effects));
    let verdict = match checks {
        Ok(()) => Verdict::Approved(plan.effects.clone()),
        Err(verdict) => verdict,
    };
    match &verdict {
        Verdict::Approved(effects) => {
            tracing::debug!(intent = %plan.intent, effects = effects.len(), "intent approved")
        }
        Verdict::Rejected(rejection) => {
            tracing::debug!(intent = %plan.intent, code = %rejection.code, "intent rejected")
        }
        Verdict::Reinterpret(reason) => {
            tracing::debug!(intent = %plan.intent, %reason, "intent needs reinterpretation")
        }
    }
    verdict
}

fn kind_fit(resolver: &Resolver<'_>, intent: &Intent) -> Check {
    let (key, wanted, verb) = match intent {
        Intent::Take { target } => (target, EntityKind::Item, "pick up"),
        Intent::Drop { target } => (target, EntityKind::Item, "drop"),
        Intent::Use { item, .. } => (item, EntityKind::Item, "use"),
        Intent::Talk { target } => (target, EntityKind::Character, "talk to"),
        _ => return Ok(()),
    };
    if key.kind == wanted {
        return Ok(());
    }
    Err(Verdict::Reinterpret(format!(
        "The {} is not something you can {verb}.",
        resolver.display_name(key)
    )))
}

fn accessibility(resolver: &Resolver<'_>, plan: &Plan) -> Check {
    let here = resolver.state().location();
    match &plan.intent {
        Intent::Move { exit } => {
            let Some(exit) = resolver.exit(exit.as_str()).filter(|e| &e.from == here) else {
                return Err(reject(RejectionCode::NotHere, "You can't go that way."));
            };
            if !resolver.exit_visible(&exit) {
                return Err(reject(RejectionCode::ExitHidden, "You can't go that way."));
            }
            if !resolver.reachable_locations().contains(&exit.to) {
                return Err(reject(
                    RejectionCode::ActBoundaryViolation,
                    "Something tells you it is not yet time to go there.",
                ));
            }
            if !resolver.exit_open(&exit) {
                let reason = exit
                    .locked_message
                    .unwrap_or_else(|| "The way is locked.".to_string());
                return Err(reject(RejectionCode::ExitLocked, reason));
            }
        }
        Intent::Examine {
            target: Some(target),
        }
        | Intent::Talk { target } => present(resolver, target)?,
        Intent::Use { on: Some(on), .. } => present(resolver, on)?,
        _ => {}
    }

    let Some(def) = plan
        .interaction
        .as_ref()
        .and_then(|id| resolver.catalog().interactions().get(id.as_str()))
    else {
        return Ok(());
    };
    let state = resolver.state();
    if !scope::interaction_in_scope(def, state) {
        return Err(reject(RejectionCode::NotHere, "That can't be done here."));
    }
    if let (Intent::Interact { .. }, Some(target)) = (&plan.intent, &def.target) {
        present(resolver, target)?;
    }
    if def.requires.as_ref().is_some_and(|c| !resolver.evaluate(c)) {
        let reason = def
            .refusal
            .clone()
            .unwrap_or_else(|| "You can't do that yet.".to_string());
        return Err(reject(RejectionCode::RequirementUnmet, reason));
    }
    if scope::interaction_spent(def, state) {
        return Err(reject(RejectionCode::AlreadyDone, "You have already done that."));
    }
    Ok(())
}

fn present(resolver: &Resolver<'_>, key: &EntityKey) -> Check {
    if scope::is_present(resolver, key) {
        return Ok(());
    }
    Err(reject(
        RejectionCode::NotHere,
        format!("The {} is not here.", resolver.display_name(key)),
    ))
}

fn ownership(resolver: &Resolver<'_>, intent: &Intent) -> Check {
    let state = resolver.state();
    let here = state.location();
    let name = |key: &EntityKey| resolver.display_name(key);
    match intent {
        Intent::Drop { target } => {
            if !state.has_item(&target.id) {
                return Err(reject(
                    RejectionCode::NotCarried,
                    format!("You aren't carrying the {}.", name(target)),
                ));
            }
        }
        Intent::Use { item, .. } => {
            let usable_here = resolver.item(item.id.as_str()).is_some_and(|def| {
                !def.portable && resolver.item_placement(&item.id).is_in_location(here)
            });
            if !state.has_item(&item.id) && !usable_here {
                return Err(reject(
                    RejectionCode::NotCarried,
                    format!("You aren't carrying the {}.", name(item)),
                ));
            }
        }
        Intent::Take { target } => {
            if state.has_item(&target.id) {
                return Err(reject(
                    RejectionCode::AlreadyCarried,
                    format!("You already have the {}.", name(target)),
                ));
            }
            if !resolver.item_placement(&target.id).is_in_location(here) {
                return Err(reject(
                    RejectionCode::NotHere,
                    format!("The {} is not here.", name(target)),
                ));
            }
            if resolver.item(target.id.as_str()).is_some_and(|def| !def.portable) {
                return Err(reject(
                    RejectionCode::NotPortable,
                    format!("The {} won't budge.", name(target)),
                ));
            }
        }
        _ => {}
    }
    Ok(())
}

fn critical_protection(resolver: &Resolver<'_>, effects: &[Effect]) -> Check {
    let catalog = resolver.catalog();
    let critical = |item: &EntityId| catalog.items().get(item.as_str()).is_some_and(|i| i.critical);
    let mut carried: BTreeSet<EntityId> = resolver.state().inventory().iter().cloned().collect();

    for effect in effects {
        let lost = match effect {
            Effect::RemoveItem(item) | Effect::DestroyItem(item) => Some(item.clone()),
            // Drops and hand-overs only lose what is carried at that point.
            Effect::PlaceItem { item, .. } | Effect::HandItem { item, .. } => carried.take(item),
            Effect::GiveItem(item) => {
                carried.insert(item.clone());
                None
            }
            _ => None,
        };
        if let Some(item) = lost.filter(|item| critical(item)) {
            tracing::info!(%item, %effect, "critical item protected");
            return Err(reject(
                RejectionCode::CriticalItemProtectionTriggered,
                format!(
                    "You think better of it; the {} is far too important to part with.",
                    resolver.display_name(&EntityKey::item(item.clone()))
                ),
            ));
        }
    }
    Ok(())
}

fn winnability(catalog: &Catalog, state: &StateStore, effects: &[Effect]) -> Check {
    if effects.is_empty() {
        return Ok(());
    }
    let after = match applicator::apply(catalog, state, effects) {
        Ok(after) => after,
        // The commit reports the inconsistency.
        Err(_) => return Ok(()),
    };
    if safety::victory_reachable(catalog, &after) || !safety::victory_reachable(catalog, state) {
        return Ok(());
    }
    tracing::info!(effects = effects.len(), "effects would make the world unwinnable");
    Err(reject(
        RejectionCode::SafetyInvariantViolation,
        "Some instinct stays your hand.",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan;
    use crate::testing::{id, lighthouse, state_at};

    fn verdict(catalog: &Catalog, state: &StateStore, intent: Intent) -> Verdict {
        validate(catalog, state, &plan(catalog, state, &intent))
    }

    fn code(verdict: &Verdict) -> Option<RejectionCode> {
        verdict.rejection_code()
    }

    #[test]
    fn act_boundary_before_lock() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "base");
        let v = verdict(&catalog, &state, Intent::Move { exit: id("stair_up") });
        assert_eq!(code(&v), Some(RejectionCode::ActBoundaryViolation));
    }

    #[test]
    fn locked_exit_uses_authored_message() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "base");
        state.enter_act(id("act2"));
        let v = verdict(&catalog, &state, Intent::Move { exit: id("stair_up") });
        match v {
            Verdict::Rejected(rejection) => {
                assert_eq!(rejection.code, RejectionCode::ExitLocked);
                assert_eq!(rejection.reason, "The stair door is bolted from above.");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn hidden_exit_is_refused() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "base");
        let v = verdict(&catalog, &state, Intent::Move { exit: id("cellar_hatch") });
        assert_eq!(code(&v), Some(RejectionCode::ExitHidden));
    }

    #[test]
    fn open_exit_is_approved() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");
        let v = verdict(&catalog, &state, Intent::Move { exit: id("dock_north") });
        assert_eq!(v, Verdict::Approved(vec![Effect::MovePlayer(id("path"))]));
    }

    #[test]
    fn ownership_rules() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");

        let take_key = verdict(&catalog, &state, Intent::Take { target: EntityKey::item("iron_key") });
        assert_eq!(code(&take_key), Some(RejectionCode::AlreadyCarried));

        let take_letter = verdict(&catalog, &state, Intent::Take { target: EntityKey::item("letter") });
        assert_eq!(code(&take_letter), Some(RejectionCode::NotHere));

        let take_anchor = verdict(&catalog, &state, Intent::Take { target: EntityKey::item("anchor") });
        assert_eq!(code(&take_anchor), Some(RejectionCode::NotPortable));

        let drop_lamp = verdict(&catalog, &state, Intent::Drop { target: EntityKey::item("lamp") });
        assert_eq!(code(&drop_lamp), Some(RejectionCode::NotCarried));

        let take_lamp = verdict(&catalog, &state, Intent::Take { target: EntityKey::item("lamp") });
        assert!(take_lamp.is_approved());
    }

    #[test]
    fn verb_must_fit_target() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "cottage");
        let v = verdict(
            &catalog,
            &state,
            Intent::Take {
                target: EntityKey::character("jenkins"),
            },
        );
        assert!(matches!(v, Verdict::Reinterpret(_)));
    }

    #[test]
    fn critical_items_cannot_leave() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");
        let v = verdict(&catalog, &state, Intent::Drop { target: EntityKey::item("iron_key") });
        assert_eq!(code(&v), Some(RejectionCode::CriticalItemProtectionTriggered));

        let resolver = Resolver::new(&catalog, &state);
        for effect in [
            Effect::DestroyItem(id("iron_key")),
            Effect::RemoveItem(id("iron_key")),
            Effect::HandItem {
                item: id("iron_key"),
                character: id("jenkins"),
            },
        ] {
            assert!(critical_protection(&resolver, &[effect]).is_err());
        }
        // Taking the lamp then dropping it is fine.
        let lamp = [
            Effect::GiveItem(id("lamp")),
            Effect::PlaceItem {
                item: id("lamp"),
                location: id("dock"),
            },
        ];
        assert!(critical_protection(&resolver, &lamp).is_ok());
    }

    #[test]
    fn requirement_and_reuse() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");
        let smash = verdict(
            &catalog,
            &state,
            Intent::Interact {
                interaction: id("smash_lamp"),
            },
        );
        match smash {
            Verdict::Rejected(rejection) => {
                assert_eq!(rejection.code, RejectionCode::RequirementUnmet);
                assert_eq!(rejection.reason, "You have nothing to smash.");
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        let mut state = state;
        state.mark_interaction_used(id("survey_dock"));
        let again = verdict(
            &catalog,
            &state,
            Intent::Interact {
                interaction: id("survey_dock"),
            },
        );
        assert_eq!(code(&again), Some(RejectionCode::AlreadyDone));
    }

    #[test]
    fn destroying_the_only_lamp_is_unwinnable() {
        let catalog = lighthouse();
        let mut state = state_at(&catalog, "dock");
        state.add_to_inventory(id("lamp"));
        let v = verdict(
            &catalog,
            &state,
            Intent::Interact {
                interaction: id("smash_lamp"),
            },
        );
        assert_eq!(code(&v), Some(RejectionCode::SafetyInvariantViolation));
    }

    #[test]
    fn absent_character_cannot_be_addressed() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");
        let v = verdict(
            &catalog,
            &state,
            Intent::Talk {
                target: EntityKey::character("jenkins"),
            },
        );
        assert_eq!(code(&v), Some(RejectionCode::NotHere));
    }
}
