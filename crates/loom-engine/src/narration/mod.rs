//! The narration gateway.
//!
//! Committed turns are packaged into a self-contained [`NarrationRequest`]
//! and handed to an external [`Narrator`] when one is configured. The call
//! is bounded by a timeout; on timeout or failure the deterministic
//! [`TemplateNarrator`] renders the same request instead. Committed effects
//! are never rolled back because of narration.

/// Fallback narrator configuration.
pub mod config;
/// The deterministic template narrator.
pub mod templates;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loom_core::definition::ExitDef;
use loom_core::{Effect, EntityId, EntityKey, EntityKind, Resolver};
use serde::Serialize;

use crate::acts::ActTransition;
use crate::beats::FiredBeat;

pub use config::{NarratorConfig, NarratorTone, Perspective, PlayerCase, Verbosity};
pub use templates::TemplateNarrator;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// The player's situation before the turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriorState {
    /// Location name.
    pub location: String,
    /// Act name.
    pub act: String,
    /// Names of carried items.
    pub inventory: Vec<String>,
}

impl PriorState {
    /// Capture the current situation.
    pub fn capture(resolver: &Resolver<'_>) -> Self {
        let state = resolver.state();
        let act = resolver
            .catalog()
            .acts()
            .get(state.act().as_str())
            .and_then(|a| a.name.clone())
            .unwrap_or_else(|| state.act().to_string());
        Self {
            location: resolver.display_name(&EntityKey::location(state.location().clone())),
            act,
            inventory: resolver.inventory().into_iter().map(|i| i.name).collect(),
        }
    }
}

/// One committed effect with the names it mentions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarratedEffect {
    /// The effect.
    pub effect: Effect,
    /// Name of the entity the effect is about.
    pub subject: Option<String>,
    /// Name of the secondary entity: a destination or recipient.
    pub object: Option<String>,
    /// Authored guidance for the subject.
    pub guidance: Option<String>,
}

impl NarratedEffect {
    /// Resolve the names an effect mentions.
    pub fn describe(resolver: &Resolver<'_>, effect: &Effect) -> Self {
        let catalog = resolver.catalog();
        let name = |key: EntityKey| Some(resolver.display_name(&key));
        let item_guidance = |item: &EntityId| {
            catalog
                .items()
                .get(item.as_str())
                .and_then(|i| i.narrative.clone())
        };
        let (subject, object, guidance) = match effect {
            Effect::GiveItem(item) | Effect::RemoveItem(item) | Effect::DestroyItem(item) => {
                (name(EntityKey::item(item.clone())), None, item_guidance(item))
            }
            Effect::PlaceItem { item, location } => (
                name(EntityKey::item(item.clone())),
                name(EntityKey::location(location.clone())),
                item_guidance(item),
            ),
            Effect::HandItem { item, character } => (
                name(EntityKey::item(item.clone())),
                name(EntityKey::character(character.clone())),
                item_guidance(item),
            ),
            Effect::MovePlayer(location) => (
                name(EntityKey::location(location.clone())),
                None,
                catalog
                    .locations()
                    .get(location.as_str())
                    .and_then(|l| l.narrative.clone()),
            ),
            Effect::MoveCharacter {
                character,
                location,
            } => (
                name(EntityKey::character(character.clone())),
                name(EntityKey::location(location.clone())),
                catalog
                    .characters()
                    .get(character.as_str())
                    .and_then(|c| c.narrative.clone()),
            ),
            Effect::UnlockExit(exit)
            | Effect::LockExit(exit)
            | Effect::RevealExit(exit)
            | Effect::HideExit(exit) => {
                let def = catalog.exits().get(exit.as_str());
                let label = def.map(|e| exit_label(resolver, e));
                (label, None, def.and_then(|e| e.narrative.clone()))
            }
            Effect::AdjustCounter { character, .. } | Effect::SetCounter { character, .. } => {
                (name(EntityKey::character(character.clone())), None, None)
            }
            Effect::Describe { kind, id, .. } => (name(EntityKey::new(*kind, id.clone())), None, None),
            Effect::CompleteSpoke(spoke) => (
                catalog
                    .spokes()
                    .get(spoke.as_str())
                    .and_then(|s| s.name.clone()),
                None,
                None,
            ),
            Effect::AdvanceAct(act) => (name(EntityKey::new(EntityKind::Act, act.clone())), None, None),
            Effect::SetFlag { .. } | Effect::ClearFlag(_) => (None, None, None),
        };
        Self {
            effect: effect.clone(),
            subject,
            object,
            guidance,
        }
    }
}

/// What the player sees around them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    /// Location name.
    pub name: String,
    /// Effective description.
    pub description: String,
    /// Characters present.
    pub characters: Vec<String>,
    /// Items lying here.
    pub items: Vec<String>,
    /// Visible exits.
    pub exits: Vec<String>,
    /// Authored guidance for the location.
    pub guidance: Option<String>,
}

impl Scene {
    /// The scene at the player's current location.
    pub fn here(resolver: &Resolver<'_>) -> Self {
        let here = resolver.state().location().clone();
        let Some(location) = resolver.location(here.as_str()) else {
            return Self {
                name: here.to_string(),
                ..Self::default()
            };
        };
        Self {
            name: location.name,
            description: location.description,
            characters: resolver.characters_at(&here).into_iter().map(|c| c.name).collect(),
            items: resolver.items_at(&here).into_iter().map(|i| i.name).collect(),
            exits: resolver
                .exits_from(&here)
                .iter()
                .filter(|e| resolver.exit_visible(e))
                .map(|e| exit_label(resolver, e))
                .collect(),
            guidance: location.narrative,
        }
    }
}

/// A closer look at one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Examined {
    /// Entity kind.
    pub kind: Option<EntityKind>,
    /// Display name.
    pub name: String,
    /// Effective description.
    pub description: String,
    /// Authored guidance.
    pub guidance: Option<String>,
}

impl Examined {
    /// Look at `key` through the resolver.
    pub fn of(resolver: &Resolver<'_>, key: &EntityKey) -> Self {
        let name = resolver.display_name(key);
        let (description, guidance) = match key.kind {
            EntityKind::Location => resolver
                .location(key.id.as_str())
                .map(|l| (l.description, l.narrative)),
            EntityKind::Item => resolver
                .item(key.id.as_str())
                .map(|i| (i.description, i.narrative)),
            EntityKind::Character => resolver
                .character(key.id.as_str())
                .map(|c| (c.description, c.narrative)),
            EntityKind::Exit => resolver
                .exit(key.id.as_str())
                .map(|e| (e.description, e.narrative)),
            _ => None,
        }
        .unwrap_or_default();
        Self {
            kind: Some(key.kind),
            name,
            description,
            guidance,
        }
    }
}

/// A victory reached this turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VictoryNote {
    /// Victory identifier.
    pub id: EntityId,
    /// Authored guidance.
    pub narrative: Option<String>,
}

/// Everything the prose collaborator needs to narrate one committed turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NarrationRequest {
    /// Turn number after the action.
    pub turn: u64,
    /// The situation before the action.
    pub prior: PriorState,
    /// A short reading of what the player did, e.g. `take the brass lamp`.
    pub action: String,
    /// Committed effects, in order.
    pub effects: Vec<NarratedEffect>,
    /// Beats fired this turn, in order.
    pub beats: Vec<FiredBeat>,
    /// Act transition this turn.
    pub transition: Option<ActTransition>,
    /// Authored response text of the interaction that ran.
    pub response: Option<String>,
    /// The scene, when the player arrived somewhere or looked around.
    pub scene: Option<Scene>,
    /// The entity examined, if any.
    pub examined: Option<Examined>,
    /// Victory reached this turn.
    pub victory: Option<VictoryNote>,
}

/// Label for an exit: its direction, else its destination's name.
pub fn exit_label(resolver: &Resolver<'_>, exit: &ExitDef) -> String {
    exit.direction
        .clone()
        .unwrap_or_else(|| resolver.display_name(&EntityKey::location(exit.to.clone())))
}

// ---------------------------------------------------------------------------
// Collaborator contract
// ---------------------------------------------------------------------------

/// Narration failure.
#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    /// The collaborator did not answer in time.
    #[error("narration timed out after {0:?}")]
    Timeout(Duration),
    /// The collaborator failed.
    #[error("narration failed: {0}")]
    Failed(String),
}

/// An external prose generator.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Turn a request into prose.
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError>;
}

/// Where narration text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrationSource {
    /// The external collaborator.
    Collaborator,
    /// The template narrator; no collaborator is configured.
    Template,
    /// The template narrator after the collaborator timed out or failed.
    Fallback,
}

impl fmt::Display for NarrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Collaborator => "collaborator",
            Self::Template => "template",
            Self::Fallback => "fallback",
        })
    }
}

/// Rendered narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Narration {
    /// Player-facing text.
    pub text: String,
    /// Who wrote it.
    pub source: NarrationSource,
}

impl Narration {
    /// Template-rendered text.
    pub fn template(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: NarrationSource::Template,
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Routes requests to the collaborator, bounded by a timeout.
#[derive(Clone)]
pub struct NarrationGateway {
    templates: TemplateNarrator,
    collaborator: Option<Arc<dyn Narrator>>,
    timeout: Duration,
}

impl fmt::Debug for NarrationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationGateway")
            .field("templates", &self.templates)
            .field("collaborator", &self.collaborator.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl NarrationGateway {
    /// A gateway rendering with `templates` only.
    pub fn new(templates: TemplateNarrator, timeout: Duration) -> Self {
        Self {
            templates,
            collaborator: None,
            timeout,
        }
    }

    /// Attach an external narrator.
    pub fn with_collaborator(mut self, collaborator: Arc<dyn Narrator>) -> Self {
        self.collaborator = Some(collaborator);
        self
    }

    /// The template narrator used for refusals and fallbacks.
    pub fn templates(&self) -> &TemplateNarrator {
        &self.templates
    }

    /// Narrate a committed turn.
    pub async fn narrate(&self, request: &NarrationRequest) -> Narration {
        let Some(collaborator) = &self.collaborator else {
            return Narration::template(self.templates.render(request));
        };
        let outcome = match tokio::time::timeout(self.timeout, collaborator.narrate(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(NarrationError::Timeout(self.timeout)),
        };
        match outcome {
            Ok(text) => Narration {
                text,
                source: NarrationSource::Collaborator,
            },
            Err(err) => {
                tracing::warn!(error = %err, turn = request.turn, "narration fell back to templates");
                Narration {
                    text: self.templates.render(request),
                    source: NarrationSource::Fallback,
                }
            }
        }
    }
}
