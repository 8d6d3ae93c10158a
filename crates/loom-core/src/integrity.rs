//! The load-time referential-integrity pass.
//!
//! Every reference in the catalog must resolve, authored effects must not
//! remove critical items, and every flag that is read must be written
//! somewhere. All failures are collected so authors see them at once.

use std::collections::HashSet;
use std::fmt;

use crate::catalog::Catalog;
use crate::condition::Condition;
use crate::definition::{Definition, InteractionKind};
use crate::effect::Effect;
use crate::entity::{EntityId, EntityKey, EntityKind};

/// A single integrity failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// A reference names an entity the catalog does not declare.
    #[error("{from} ({field}) refers to unknown {target}")]
    UnresolvedReference {
        /// The referring definition, or a section name.
        from: String,
        /// Field holding the reference.
        field: &'static str,
        /// The missing entity.
        target: EntityKey,
    },

    /// Two definitions of one kind share an identifier.
    #[error("duplicate identifier {0}")]
    DuplicateId(EntityKey),

    /// A singleton section is declared by more than one document.
    #[error("section `{0}` is declared more than once")]
    DuplicateSection(&'static str),

    /// A required singleton section is missing.
    #[error("missing `{0}` section")]
    MissingSection(&'static str),

    /// The world declares no acts.
    #[error("world declares no acts")]
    NoActs,

    /// An authored effect unconditionally removes a critical item.
    #[error("{from} removes critical item `{item}` via {effect}")]
    CriticalRemoval {
        /// The declaring definition.
        from: String,
        /// The critical item.
        item: EntityId,
        /// Rendered effect.
        effect: String,
    },

    /// A flag is read but no effect ever writes it.
    #[error("{from} reads flag `{flag}` which no effect sets")]
    UnwrittenFlag {
        /// The reading definition.
        from: String,
        /// Flag name.
        flag: String,
    },

    /// A spoke condition refers to another spoke.
    #[error("spoke `{0}` refers to another spoke in its condition")]
    NestedSpoke(EntityId),

    /// A definition is internally inconsistent.
    #[error("{key}: {message}")]
    Invalid {
        /// The offending definition, or a section name.
        key: String,
        /// What is wrong.
        message: String,
    },
}

struct Checker<'a> {
    catalog: &'a Catalog,
    errors: &'a mut Vec<IntegrityError>,
    written_flags: HashSet<&'a str>,
}

impl<'a> Checker<'a> {
    fn reference(&mut self, from: &dyn fmt::Display, field: &'static str, target: EntityKey) {
        if !self.catalog.contains(&target) {
            self.errors.push(IntegrityError::UnresolvedReference {
                from: from.to_string(),
                field,
                target,
            });
        }
    }

    fn location(&mut self, from: &dyn fmt::Display, field: &'static str, id: &EntityId) {
        self.reference(from, field, EntityKey::location(id.clone()));
    }

    fn invalid(&mut self, key: &dyn fmt::Display, message: impl Into<String>) {
        self.errors.push(IntegrityError::Invalid {
            key: key.to_string(),
            message: message.into(),
        });
    }

    fn condition(&mut self, from: &EntityKey, field: &'static str, condition: &'a Condition) {
        let mut refs = Vec::new();
        condition.references(&mut refs);
        for target in refs {
            self.reference(from, field, target);
        }
        let mut flags = Vec::new();
        condition.flags_read(&mut flags);
        for flag in flags {
            if !self.written_flags.contains(flag) {
                self.errors.push(IntegrityError::UnwrittenFlag {
                    from: from.to_string(),
                    flag: flag.to_string(),
                });
            }
        }
    }

    fn effects(&mut self, from: &EntityKey, effects: &[Effect]) {
        for effect in effects {
            let mut refs = Vec::new();
            effect.references(&mut refs);
            for target in refs {
                self.reference(from, "effects", target);
            }
            if let Some(item) = self.critical_removal(effect) {
                self.errors.push(IntegrityError::CriticalRemoval {
                    from: from.to_string(),
                    item: item.clone(),
                    effect: effect.to_string(),
                });
            }
            match effect {
                Effect::Describe { kind, .. } if !kind_has_delta(*kind) => {
                    self.invalid(from, format!("cannot describe a {kind}"));
                }
                _ => {}
            }
        }
    }

    fn critical_removal<'e>(&self, effect: &'e Effect) -> Option<&'e EntityId> {
        let item = match effect {
            Effect::HandItem { item, .. } => item,
            other => other.unconditional_removal()?,
        };
        self.catalog
            .items()
            .get(item.as_str())
            .filter(|def| def.critical)
            .map(|_| item)
    }
}

/// Run every check against a freshly built catalog.
pub(crate) fn check(catalog: &Catalog, errors: &mut Vec<IntegrityError>) {
    let written_flags = catalog
        .interactions()
        .iter()
        .flat_map(|i| i.effects.iter())
        .chain(catalog.beats().iter().flat_map(|b| b.effects.iter()))
        .filter_map(Effect::flag_written)
        .collect();
    let mut c = Checker {
        catalog,
        errors,
        written_flags,
    };

    check_start(&mut c);

    for item in catalog.items() {
        let key = item.key();
        if let Some(location) = &item.location {
            c.location(&key, "location", location);
        }
        if let Some(holder) = &item.holder {
            c.reference(&key, "holder", EntityKey::character(holder.clone()));
        }
        if item.location.is_some() && item.holder.is_some() {
            c.invalid(&key, "declares both a location and a holder");
        }
    }

    for character in catalog.characters() {
        if let Some(location) = &character.location {
            c.location(&character.key(), "location", location);
        }
    }

    for exit in catalog.exits() {
        let key = exit.key();
        c.location(&key, "from", &exit.from);
        c.location(&key, "to", &exit.to);
        if let Some(cond) = &exit.visible_when {
            c.condition(&key, "visible_when", cond);
        }
        if let Some(cond) = &exit.open_when {
            c.condition(&key, "open_when", cond);
        }
        if exit.direction.is_none() && exit.triggers.is_empty() {
            c.invalid(&key, "needs a direction or at least one trigger phrase");
        }
    }

    for interaction in catalog.interactions() {
        let key = interaction.key();
        if let Some(location) = &interaction.location {
            c.location(&key, "location", location);
        }
        if let Some(target) = &interaction.target {
            c.reference(&key, "target", target.clone());
        }
        if let Some(item) = &interaction.item {
            c.reference(&key, "item", EntityKey::item(item.clone()));
        }
        if let Some(cond) = &interaction.requires {
            c.condition(&key, "requires", cond);
        }
        c.effects(&key, &interaction.effects);
        match interaction.kind {
            InteractionKind::Interact if interaction.triggers.is_empty() => {
                c.invalid(&key, "interact needs at least one trigger phrase")
            }
            InteractionKind::Take | InteractionKind::Use if interaction.item.is_none() => {
                c.invalid(&key, "take/use needs an `item`")
            }
            InteractionKind::Examine if interaction.target.is_none() => {
                c.invalid(&key, "examine needs a `target`")
            }
            InteractionKind::Talk => match &interaction.target {
                Some(t) if t.kind == EntityKind::Character => {}
                _ => c.invalid(&key, "talk needs a character `target`"),
            },
            _ => {}
        }
    }

    for beat in catalog.beats() {
        let key = beat.key();
        if !catalog.is_gate_beat(beat.id.as_str()) {
            c.condition(&key, "trigger", &beat.trigger);
        }
        c.effects(&key, &beat.effects);
    }

    for spoke in catalog.spokes() {
        let key = spoke.key();
        c.reference(&key, "act", EntityKey::new(EntityKind::Act, spoke.act.clone()));
        if !spoke.condition.spokes().is_empty() {
            c.errors.push(IntegrityError::NestedSpoke(spoke.id.clone()));
        }
        c.condition(&key, "condition", &spoke.condition);
    }

    let mut gate_beats_seen = HashSet::new();
    for act in catalog.acts() {
        let key = act.key();
        for location in act.locations.iter().chain(&act.exclude_locations) {
            c.location(&key, "locations", location);
        }
        for character in act.characters.iter().chain(&act.exclude_characters) {
            c.reference(&key, "characters", EntityKey::character(character.clone()));
        }
        if let Some(cond) = &act.gate {
            c.condition(&key, "gate", cond);
        }
        if let Some(beat) = &act.gate_beat {
            c.reference(&key, "gate_beat", EntityKey::new(EntityKind::Beat, beat.clone()));
            if !gate_beats_seen.insert(beat) {
                c.invalid(&key, format!("gate beat `{beat}` is shared with another act"));
            }
        }
    }

    for victory in catalog.victory() {
        c.condition(&victory.key(), "condition", &victory.condition);
    }

    for rule in catalog.migrations() {
        let label = format!("migration from {}", rule.from);
        if rule.from == catalog.version() {
            c.invalid(&label, "migrates from the current version");
        }
        if let Some(relocate) = &rule.relocate {
            c.location(&label, "relocate", relocate);
        }
        for kind in EntityKind::ALL {
            let Some(renames) = rule.rename.for_kind(kind) else {
                continue;
            };
            for new_id in renames.values() {
                c.reference(&label, "rename", EntityKey::new(kind, new_id.as_str()));
            }
        }
    }
}

fn kind_has_delta(kind: EntityKind) -> bool {
    matches!(
        kind,
        EntityKind::Location | EntityKind::Item | EntityKind::Character | EntityKind::Exit
    )
}

fn check_start(c: &mut Checker<'_>) {
    let catalog = c.catalog;
    let start = catalog.start();
    if start.location.as_str().is_empty() {
        return;
    }
    c.location(&"start", "location", &start.location);
    if let Some(act) = &start.act {
        c.reference(&"start", "act", EntityKey::new(EntityKind::Act, act.clone()));
    }
    for item in &start.inventory {
        c.reference(&"start", "inventory", EntityKey::item(item.clone()));
        let placed = catalog
            .items()
            .get(item.as_str())
            .filter(|def| def.location.is_some() || def.holder.is_some());
        if let Some(def) = placed {
            c.invalid(
                &def.key(),
                "starts in the inventory but also declares a location or holder",
            );
        }
    }
    let unreachable = catalog
        .acts()
        .get(catalog.initial_act().as_str())
        .is_some_and(|act| !act.locations.contains(&start.location));
    if unreachable {
        c.invalid(&"start", "start location is not reachable in the initial act");
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::condition::Condition;
    use crate::definition::{ExitDef, InteractionDef, InteractionKind};
    use crate::effect::Effect;
    use crate::entity::{EntityId, EntityKey};
    use crate::error::CoreError;
    use crate::testing::sample_document;

    use super::IntegrityError;

    fn errors_of(result: Result<Catalog, CoreError>) -> Vec<IntegrityError> {
        match result {
            Err(CoreError::Integrity(errors)) => errors,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("catalog unexpectedly valid"),
        }
    }

    fn interaction(id: &str, effects: Vec<Effect>) -> InteractionDef {
        InteractionDef {
            id: EntityId::new(id),
            kind: InteractionKind::Interact,
            triggers: vec![id.replace('_', " ")],
            location: None,
            target: None,
            item: None,
            requires: None,
            refusal: None,
            effects,
            response: None,
            repeatable: false,
            narrative: None,
        }
    }

    #[test]
    fn dangling_exit_target_is_reported() {
        let mut doc = sample_document();
        doc.exits.push(ExitDef {
            id: EntityId::new("to_nowhere"),
            from: EntityId::new("L0"),
            to: EntityId::new("L9"),
            direction: Some("west".to_string()),
            triggers: vec![],
            description: String::new(),
            locked: false,
            hidden: false,
            visible_when: None,
            open_when: None,
            locked_message: None,
            narrative: None,
        });
        let errors = errors_of(Catalog::from_document(doc));
        assert_eq!(
            errors,
            vec![IntegrityError::UnresolvedReference {
                from: "exit:to_nowhere".to_string(),
                field: "to",
                target: EntityKey::location("L9"),
            }]
        );
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let mut doc = sample_document();
        let copy = doc.locations[0].clone();
        doc.locations.push(copy);
        let errors = errors_of(Catalog::from_document(doc));
        assert!(errors.contains(&IntegrityError::DuplicateId(EntityKey::location("L0"))));
    }

    #[test]
    fn authored_destruction_of_critical_item_is_rejected() {
        let mut doc = sample_document();
        doc.interactions.push(interaction(
            "melt_key",
            vec![Effect::DestroyItem(EntityId::new("iron_key"))],
        ));
        let errors = errors_of(Catalog::from_document(doc));
        assert!(matches!(
            &errors[0],
            IntegrityError::CriticalRemoval { item, .. } if item.as_str() == "iron_key"
        ));
    }

    #[test]
    fn unwritten_flags_are_reported() {
        let mut doc = sample_document();
        let mut i = interaction("wave", vec![]);
        i.requires = Some(Condition::Flag("never_set".to_string()));
        doc.interactions.push(i);
        let errors = errors_of(Catalog::from_document(doc));
        assert_eq!(
            errors,
            vec![IntegrityError::UnwrittenFlag {
                from: "interaction:wave".to_string(),
                flag: "never_set".to_string(),
            }]
        );
    }

    #[test]
    fn spokes_may_not_reference_spokes() {
        let mut doc = sample_document();
        doc.spokes[0].condition = Condition::Spoke(EntityId::new("spoke_trust"));
        let errors = errors_of(Catalog::from_document(doc));
        assert!(errors.contains(&IntegrityError::NestedSpoke(EntityId::new("spoke_explore"))));
    }

    #[test]
    fn missing_acts_and_start() {
        let mut doc = sample_document();
        doc.acts.clear();
        doc.spokes.clear();
        doc.start = None;
        let errors = errors_of(Catalog::from_document(doc));
        assert!(errors.contains(&IntegrityError::MissingSection("start")));
        assert!(errors.contains(&IntegrityError::NoActs));
    }
}
