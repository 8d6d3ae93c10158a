//! Intent interpretation: free text to one structured intent.
//!
//! Matching is deterministic and scoped to the player's location: exact
//! interaction triggers, then verb parsing, then exit phrases, then fuzzy
//! interaction triggers. Only when all of those fail is an optional
//! [`IntentCollaborator`] consulted, and its answer is still bounded to an
//! [`Intent`] with a confidence.

/// Verb parsing.
pub mod command;
/// Scoped name matching.
pub mod vocabulary;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use loom_core::{Catalog, EntityId, EntityKey, EntityKind, Resolver, StateStore};
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::config::EngineConfig;
use crate::scope;

pub use command::{Command, Direction, parse_command};
pub use vocabulary::{Candidate, Lookup, Vocabulary, normalize};

/// A structured player intent with resolved targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Take an exit.
    Move {
        /// The exit.
        exit: EntityId,
    },
    /// Look around, or at something.
    Examine {
        /// What to look at; `None` looks around.
        target: Option<EntityKey>,
    },
    /// Pick something up.
    Take {
        /// What to take.
        target: EntityKey,
    },
    /// Put something down here.
    Drop {
        /// What to drop.
        target: EntityKey,
    },
    /// Use an item, optionally on something.
    Use {
        /// The item.
        item: EntityKey,
        /// What it is used on.
        on: Option<EntityKey>,
    },
    /// Talk to someone.
    Talk {
        /// Who to talk to.
        target: EntityKey,
    },
    /// Run an authored interaction.
    Interact {
        /// The interaction.
        interaction: EntityId,
    },
}

impl Intent {
    /// Short verb name for logs.
    pub fn verb(&self) -> &'static str {
        match self {
            Intent::Move { .. } => "move",
            Intent::Examine { .. } => "examine",
            Intent::Take { .. } => "take",
            Intent::Drop { .. } => "drop",
            Intent::Use { .. } => "use",
            Intent::Talk { .. } => "talk",
            Intent::Interact { .. } => "interact",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Move { exit } => write!(f, "move({exit})"),
            Intent::Examine { target: None } => f.write_str("examine(here)"),
            Intent::Examine {
                target: Some(target),
            } => write!(f, "examine({target})"),
            Intent::Take { target } => write!(f, "take({target})"),
            Intent::Drop { target } => write!(f, "drop({target})"),
            Intent::Use { item, on: None } => write!(f, "use({item})"),
            Intent::Use { item, on: Some(on) } => write!(f, "use({item} on {on})"),
            Intent::Talk { target } => write!(f, "talk({target})"),
            Intent::Interact { interaction } => write!(f, "interact({interaction})"),
        }
    }
}

/// Why no intent could be produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Unrecognized {
    /// Nothing matched at all.
    NoMatch,
    /// A direction with no exit.
    NoExit(Direction),
    /// A verb whose object names nothing in scope.
    UnknownTarget(String),
    /// A verb with no object; carries a follow-up question.
    Incomplete(&'static str),
}

/// Result of interpreting one line of input.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// One structured intent.
    Intent(Intent),
    /// Several readings were equally plausible.
    Ambiguous {
        /// Display names of the competing candidates.
        candidates: Vec<String>,
    },
    /// No reading at all.
    Unrecognized(Unrecognized),
}

// ---------------------------------------------------------------------------
// Free-text collaborator
// ---------------------------------------------------------------------------

/// What the free-text collaborator is given.
#[derive(Debug, Clone, Serialize)]
pub struct IntentRequest {
    /// Raw player text.
    pub text: String,
    /// Entities in scope.
    pub vocabulary: Vec<Candidate>,
    /// Interaction trigger phrases in scope.
    pub phrases: Vec<(EntityId, String)>,
    /// Carried items.
    pub inventory: Vec<EntityId>,
}

/// What the free-text collaborator returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentReply {
    /// The proposed intent.
    pub intent: Intent,
    /// Confidence between 0.0 and 1.0.
    pub confidence: f64,
}

/// Collaborator failure.
#[derive(Debug, thiserror::Error)]
#[error("intent collaborator failed: {0}")]
pub struct CollaboratorError(pub String);

/// An external interpreter for text the deterministic matcher cannot place.
#[async_trait]
pub trait IntentCollaborator: Send + Sync {
    /// Propose one intent for the request.
    async fn interpret(&self, request: &IntentRequest) -> Result<IntentReply, CollaboratorError>;
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Maps raw text to an [`Interpretation`].
#[derive(Clone)]
pub struct Interpreter {
    fuzzy_threshold: f64,
    ambiguity_threshold: f64,
    collaborator: Option<Arc<dyn IntentCollaborator>>,
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("fuzzy_threshold", &self.fuzzy_threshold)
            .field("ambiguity_threshold", &self.ambiguity_threshold)
            .field("collaborator", &self.collaborator.is_some())
            .finish()
    }
}

impl Interpreter {
    /// Create an interpreter with the thresholds from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fuzzy_threshold: config.fuzzy_threshold,
            ambiguity_threshold: config.ambiguity_threshold,
            collaborator: None,
        }
    }

    /// Attach a free-text collaborator.
    pub fn with_collaborator(mut self, collaborator: Arc<dyn IntentCollaborator>) -> Self {
        self.collaborator = Some(collaborator);
        self
    }

    /// Interpret one line of input.
    pub async fn interpret(
        &self,
        catalog: &Catalog,
        state: &StateStore,
        text: &str,
    ) -> Interpretation {
        let resolver = Resolver::new(catalog, state);
        let phrase = normalize(text);
        if phrase.is_empty() {
            return Interpretation::Intent(Intent::Examine { target: None });
        }

        if let Some(interaction) = self.exact_interaction(&resolver, &phrase) {
            return Interpretation::Intent(Intent::Interact { interaction });
        }

        let vocabulary = Vocabulary::scoped(&resolver);
        let mut missing = None;
        match self.read_command(&resolver, &vocabulary, parse_command(text)) {
            Some(Interpretation::Unrecognized(Unrecognized::UnknownTarget(target))) => {
                missing = Some(target)
            }
            Some(found) => return found,
            None => {}
        }

        if let Some(exit) = exit_phrase(&resolver, &phrase) {
            return Interpretation::Intent(Intent::Move { exit });
        }

        match self.fuzzy_interaction(&resolver, &phrase) {
            Lookup::Found(key) => {
                return Interpretation::Intent(Intent::Interact {
                    interaction: key.id,
                });
            }
            Lookup::Ambiguous(candidates) => return Interpretation::Ambiguous { candidates },
            Lookup::Missing => {}
        }

        if let Some(found) = self.ask_collaborator(&resolver, vocabulary, text).await {
            return found;
        }

        match missing {
            Some(target) => Interpretation::Unrecognized(Unrecognized::UnknownTarget(target)),
            None => Interpretation::Unrecognized(Unrecognized::NoMatch),
        }
    }

    /// First in-scope interaction whose trigger is exactly `phrase`,
    /// preferring ones that have not run yet.
    fn exact_interaction(&self, resolver: &Resolver<'_>, phrase: &str) -> Option<EntityId> {
        let state = resolver.state();
        let matching: Vec<_> = resolver
            .catalog()
            .interactions()
            .iter()
            .filter(|i| scope::interaction_in_scope(i, state))
            .filter(|i| i.triggers.iter().any(|t| normalize(t) == phrase))
            .collect();
        matching
            .iter()
            .find(|i| !scope::interaction_spent(i, state))
            .or_else(|| matching.first())
            .map(|i| i.id.clone())
    }

    fn fuzzy_interaction(&self, resolver: &Resolver<'_>, phrase: &str) -> Lookup {
        let state = resolver.state();
        let mut best: Vec<&EntityId> = Vec::new();
        let mut best_score = self.fuzzy_threshold;
        for interaction in resolver.catalog().interactions() {
            if !scope::interaction_in_scope(interaction, state) {
                continue;
            }
            let score = interaction
                .triggers
                .iter()
                .map(|t| jaro_winkler(phrase, &normalize(t)))
                .fold(0.0, f64::max);
            if score > best_score + f64::EPSILON {
                best_score = score;
                best = vec![&interaction.id];
            } else if score >= best_score - f64::EPSILON {
                best.push(&interaction.id);
            }
        }
        match best.as_slice() {
            [] => Lookup::Missing,
            [one] => Lookup::Found(EntityKey::new(EntityKind::Interaction, (*one).clone())),
            many => Lookup::Ambiguous(
                many.iter()
                    .filter_map(|id| {
                        resolver
                            .catalog()
                            .interactions()
                            .get(id.as_str())
                            .and_then(|i| i.triggers.first().cloned())
                    })
                    .collect(),
            ),
        }
    }

    /// Map a parsed verb command onto an intent. `None` means the verb was
    /// not recognised and later stages should try.
    fn read_command(
        &self,
        resolver: &Resolver<'_>,
        vocabulary: &Vocabulary,
        command: Command,
    ) -> Option<Interpretation> {
        let find = |phrase: &str, kinds: &[EntityKind]| {
            vocabulary.find(phrase, kinds, self.fuzzy_threshold)
        };
        let interpretation = match command {
            Command::Move { direction } => {
                let here = resolver.state().location();
                let exit = resolver
                    .exits_from(here)
                    .into_iter()
                    .filter(|e| e.direction.as_deref().is_some_and(|d| direction.matches(d)))
                    .min_by_key(|e| !resolver.exit_visible(e));
                match exit {
                    Some(exit) => Interpretation::Intent(Intent::Move { exit: exit.id }),
                    None => Interpretation::Unrecognized(Unrecognized::NoExit(direction)),
                }
            }
            Command::Go { target } => {
                resolve_one(find(&target, &[EntityKind::Exit]), &target, |key| {
                    Intent::Move { exit: key.id }
                })
            }
            Command::Look { target: None } => Interpretation::Intent(Intent::Examine { target: None }),
            Command::Look {
                target: Some(target),
            } => resolve_one(find(&target, &[]), &target, |key| Intent::Examine {
                target: Some(key),
            }),
            Command::Take { item } => {
                resolve_one(find(&item, &[]), &item, |key| Intent::Take { target: key })
            }
            Command::Drop { item } => {
                resolve_one(find(&item, &[]), &item, |key| Intent::Drop { target: key })
            }
            Command::Talk { character, topic } => {
                if let Some(topic) = &topic {
                    tracing::debug!(%topic, "talk topics are not modelled; ignoring");
                }
                resolve_one(find(&character, &[]), &character, |key| Intent::Talk {
                    target: key,
                })
            }
            Command::Use { item, target } => {
                let item_key = match find(&item, &[]) {
                    Lookup::Found(key) => key,
                    other => return Some(unresolved(other, &item)),
                };
                let on = match target {
                    Some(target) => match find(&target, &[]) {
                        Lookup::Found(key) => Some(key),
                        other => return Some(unresolved(other, &target)),
                    },
                    None => None,
                };
                Interpretation::Intent(Intent::Use { item: item_key, on })
            }
            Command::Incomplete { prompt } => {
                Interpretation::Unrecognized(Unrecognized::Incomplete(prompt))
            }
            Command::Unknown { .. } => return None,
        };
        Some(interpretation)
    }

    async fn ask_collaborator(
        &self,
        resolver: &Resolver<'_>,
        vocabulary: Vocabulary,
        text: &str,
    ) -> Option<Interpretation> {
        let collaborator = self.collaborator.as_ref()?;
        let state = resolver.state();
        let phrases = resolver
            .catalog()
            .interactions()
            .iter()
            .filter(|i| scope::interaction_in_scope(i, state))
            .flat_map(|i| i.triggers.iter().map(|t| (i.id.clone(), t.clone())))
            .collect();
        let request = IntentRequest {
            text: text.to_string(),
            vocabulary: vocabulary.entries().to_vec(),
            phrases,
            inventory: state.inventory().to_vec(),
        };
        match collaborator.interpret(&request).await {
            Ok(reply) if reply.confidence < self.ambiguity_threshold => {
                tracing::debug!(
                    intent = %reply.intent,
                    confidence = reply.confidence,
                    "collaborator intent below threshold"
                );
                Some(Interpretation::Ambiguous {
                    candidates: vec![describe_intent(resolver, &reply.intent)],
                })
            }
            Ok(reply) => {
                tracing::debug!(intent = %reply.intent, confidence = reply.confidence, "collaborator intent");
                Some(Interpretation::Intent(reply.intent))
            }
            Err(err) => {
                tracing::warn!(error = %err, "intent collaborator failed");
                None
            }
        }
    }
}

fn resolve_one(lookup: Lookup, phrase: &str, build: impl FnOnce(EntityKey) -> Intent) -> Interpretation {
    match lookup {
        Lookup::Found(key) => Interpretation::Intent(build(key)),
        other => unresolved(other, phrase),
    }
}

fn unresolved(lookup: Lookup, phrase: &str) -> Interpretation {
    match lookup {
        Lookup::Ambiguous(candidates) => Interpretation::Ambiguous { candidates },
        _ => Interpretation::Unrecognized(Unrecognized::UnknownTarget(phrase.to_string())),
    }
}

/// An exit from here whose trigger phrase or destination name is `phrase`.
fn exit_phrase(resolver: &Resolver<'_>, phrase: &str) -> Option<EntityId> {
    let here = resolver.state().location();
    let exits = resolver.exits_from(here);
    let by_trigger = exits
        .iter()
        .find(|e| e.triggers.iter().any(|t| normalize(t) == phrase));
    let by_destination = || {
        exits.iter().find(|e| {
            resolver.location(e.to.as_str()).is_some_and(|dest| {
                normalize(&dest.name) == phrase || dest.aliases.iter().any(|a| normalize(a) == phrase)
            })
        })
    };
    by_trigger.or_else(by_destination).map(|e| e.id.clone())
}

/// A human reading of an intent, for clarification prompts.
pub fn describe_intent(resolver: &Resolver<'_>, intent: &Intent) -> String {
    let name = |key: &EntityKey| resolver.display_name(key);
    match intent {
        Intent::Move { exit } => match resolver.exit(exit.as_str()) {
            Some(def) => match def.direction {
                Some(direction) => format!("go {direction}"),
                None => format!("go to {}", name(&EntityKey::location(def.to))),
            },
            None => format!("go {exit}"),
        },
        Intent::Examine { target: None } => "look around".to_string(),
        Intent::Examine {
            target: Some(target),
        } => format!("examine the {}", name(target)),
        Intent::Take { target } => format!("take the {}", name(target)),
        Intent::Drop { target } => format!("drop the {}", name(target)),
        Intent::Use { item, on: None } => format!("use the {}", name(item)),
        Intent::Use { item, on: Some(on) } => {
            format!("use the {} on the {}", name(item), name(on))
        }
        Intent::Talk { target } => format!("talk to {}", name(target)),
        Intent::Interact { interaction } => resolver
            .catalog()
            .interactions()
            .get(interaction.as_str())
            .and_then(|i| i.triggers.first().cloned())
            .unwrap_or_else(|| interaction.to_string()),
    }
}
