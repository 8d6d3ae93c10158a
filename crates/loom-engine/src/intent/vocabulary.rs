//! Scoped name matching.
//!
//! Only entities the player could plausibly mean from where they stand are
//! candidates: the current location, exits leaving it, items lying here or
//! carried, and reachable characters standing here.

use std::collections::BTreeSet;

use loom_core::{EntityKey, EntityKind, Resolver};
use serde::Serialize;
use strsim::jaro_winkler;

/// One thing the player may refer to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// The entity.
    pub key: EntityKey,
    /// Display name.
    pub name: String,
    /// Normalized names the entity answers to.
    pub names: Vec<String>,
}

/// Outcome of looking a phrase up.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Exactly one best candidate.
    Found(EntityKey),
    /// Several equally good candidates (display names).
    Ambiguous(Vec<String>),
    /// Nothing matched.
    Missing,
}

/// Names in scope for one turn.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entries: Vec<Candidate>,
}

impl Vocabulary {
    /// Build the vocabulary for the player's current position.
    pub fn scoped(resolver: &Resolver<'_>) -> Self {
        let mut entries = Vec::new();
        let here = resolver.state().location().clone();

        if let Some(location) = resolver.location(here.as_str()) {
            let mut names = vec![normalize(&location.name), "here".to_string()];
            names.extend(location.aliases.iter().map(|a| normalize(a)));
            entries.push(Candidate {
                key: EntityKey::location(here.clone()),
                name: location.name,
                names,
            });
        }

        for exit in resolver.exits_from(&here) {
            let mut names: Vec<String> = exit.triggers.iter().map(|t| normalize(t)).collect();
            if let Some(direction) = &exit.direction {
                names.push(normalize(direction));
            }
            let destination = resolver.location(exit.to.as_str());
            if let Some(dest) = &destination {
                names.push(normalize(&dest.name));
                names.extend(dest.aliases.iter().map(|a| normalize(a)));
            }
            let name = exit
                .direction
                .clone()
                .or_else(|| destination.map(|d| d.name))
                .unwrap_or_else(|| exit.id.to_string());
            entries.push(Candidate {
                key: EntityKey::exit(exit.id.clone()),
                name,
                names,
            });
        }

        let items = resolver
            .items_at(&here)
            .into_iter()
            .chain(resolver.inventory());
        let mut seen = BTreeSet::new();
        for item in items {
            if !seen.insert(item.id.clone()) {
                continue;
            }
            let mut names = vec![normalize(&item.name)];
            names.extend(item.aliases.iter().map(|a| normalize(a)));
            entries.push(Candidate {
                key: EntityKey::item(item.id.clone()),
                name: item.name,
                names,
            });
        }

        for character in resolver.characters_at(&here) {
            let mut names = vec![normalize(&character.name)];
            names.extend(character.aliases.iter().map(|a| normalize(a)));
            entries.push(Candidate {
                key: EntityKey::character(character.id.clone()),
                name: character.name,
                names,
            });
        }

        Self { entries }
    }

    /// All candidates.
    pub fn entries(&self) -> &[Candidate] {
        &self.entries
    }

    /// Whether nothing is in scope.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a phrase against candidates of the given kinds (all kinds if
    /// `kinds` is empty).
    ///
    /// Exact names beat whole-word matches, which beat fuzzy matches scoring
    /// at least `fuzzy_threshold`. Distinct candidates tied at the best
    /// score are ambiguous.
    pub fn find(&self, phrase: &str, kinds: &[EntityKind], fuzzy_threshold: f64) -> Lookup {
        let phrase = normalize(phrase);
        if phrase.is_empty() {
            return Lookup::Missing;
        }

        let mut best: Vec<&Candidate> = Vec::new();
        let mut best_score = 0.0;
        for candidate in &self.entries {
            if !kinds.is_empty() && !kinds.contains(&candidate.key.kind) {
                continue;
            }
            let score = candidate
                .names
                .iter()
                .map(|name| score(&phrase, name, fuzzy_threshold))
                .fold(0.0, f64::max);
            if score <= 0.0 {
                continue;
            }
            if score > best_score + f64::EPSILON {
                best_score = score;
                best.clear();
                best.push(candidate);
            } else if (score - best_score).abs() <= f64::EPSILON
                && !best.iter().any(|b| b.key == candidate.key)
            {
                best.push(candidate);
            }
        }

        match best.as_slice() {
            [] => Lookup::Missing,
            [one] => Lookup::Found(one.key.clone()),
            many => Lookup::Ambiguous(many.iter().map(|c| c.name.clone()).collect()),
        }
    }
}

/// Lowercase, collapse whitespace and drop a leading article.
pub fn normalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() > 1 && matches!(words[0], "the" | "a" | "an" | "some") {
        words.remove(0);
    }
    words.join(" ")
}

/// Match quality: 3 exact, 2 whole-word, 1 + similarity for fuzzy, 0 none.
fn score(phrase: &str, name: &str, fuzzy_threshold: f64) -> f64 {
    if phrase == name {
        return 3.0;
    }
    let name_words: Vec<&str> = name.split_whitespace().collect();
    if phrase
        .split_whitespace()
        .all(|word| name_words.contains(&word))
    {
        return 2.0;
    }
    let similarity = jaro_winkler(phrase, name);
    if similarity >= fuzzy_threshold {
        1.0 + similarity
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{lighthouse, state_at};

    #[test]
    fn normalize_strips_articles() {
        assert_eq!(normalize("  The   Brass Lamp "), "brass lamp");
        assert_eq!(normalize("a"), "a");
    }

    #[test]
    fn finds_by_name_alias_and_word() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "dock");
        let vocab = Vocabulary::scoped(&Resolver::new(&catalog, &state));

        assert_eq!(
            vocab.find("the brass lamp", &[], 0.8),
            Lookup::Found(EntityKey::item("lamp"))
        );
        assert_eq!(
            vocab.find("key", &[EntityKind::Item], 0.8),
            Lookup::Found(EntityKey::item("iron_key"))
        );
        assert_eq!(
            vocab.find("north", &[EntityKind::Exit], 0.8),
            Lookup::Found(EntityKey::exit("dock_north"))
        );
        assert_eq!(
            vocab.find("cliff path", &[EntityKind::Exit], 0.8),
            Lookup::Found(EntityKey::exit("dock_north"))
        );
    }

    #[test]
    fn fuzzy_match_typo() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "cottage");
        let vocab = Vocabulary::scoped(&Resolver::new(&catalog, &state));
        assert_eq!(
            vocab.find("old jenkens", &[], 0.8),
            Lookup::Found(EntityKey::character("jenkins"))
        );
        assert_eq!(vocab.find("zeppelin", &[], 0.8), Lookup::Missing);
    }

    #[test]
    fn out_of_scope_entities_are_not_candidates() {
        let catalog = lighthouse();
        let state = state_at(&catalog, "path");
        let vocab = Vocabulary::scoped(&Resolver::new(&catalog, &state));
        assert_eq!(vocab.find("jenkins", &[EntityKind::Character], 0.8), Lookup::Missing);
        assert_eq!(vocab.find("lamp", &[EntityKind::Item], 0.8), Lookup::Missing);
    }

    #[test]
    fn equal_candidates_are_ambiguous() {
        let candidate = |item: &str, name: &str| Candidate {
            key: EntityKey::item(item),
            name: name.to_string(),
            names: vec![normalize(name)],
        };
        let vocab = Vocabulary {
            entries: vec![
                candidate("lamp", "brass lamp"),
                candidate("oil_lamp", "oil lamp"),
            ],
        };
        assert_eq!(
            vocab.find("lamp", &[], 0.8),
            Lookup::Ambiguous(vec!["brass lamp".to_string(), "oil lamp".to_string()])
        );
        assert_eq!(
            vocab.find("oil lamp", &[], 0.8),
            Lookup::Found(EntityKey::item("oil_lamp"))
        );
    }
}
