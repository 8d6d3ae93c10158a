//! Game session management.
//!
//! A [`GameSession`] owns one state store and runs the turn pipeline:
//! interpret, plan, validate, commit, beats, acts, victory, narration.
//! Turns take `&mut self`, so one action occupies the whole pipeline before
//! the next begins. [`SessionHandle`] queues submissions from several tasks.

use std::sync::Arc;

use loom_core::{Catalog, Effect, EntityId, EntityKey, Resolver, SaveGame, StateStore};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::acts::{self, ActTransition};
use crate::applicator;
use crate::beats::{self, FiredBeat};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::intent::{Intent, IntentCollaborator, Interpretation, Interpreter, describe_intent};
use crate::narration::{
    Examined, NarratedEffect, Narration, NarrationGateway, NarrationRequest, Narrator, PriorState,
    Scene, TemplateNarrator, VictoryNote,
};
use crate::planner;
use crate::validator::{self, Rejection, Verdict};

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnStatus {
    /// Effects were committed.
    Committed,
    /// The validator refused the intent.
    Rejected(Rejection),
    /// Several readings fit; the player is asked to choose.
    Ambiguous(Vec<String>),
    /// No reading fit.
    Unrecognized,
    /// The verb did not fit its target.
    Reinterpret,
}

/// Everything that came out of one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Turn number.
    pub turn: u64,
    /// How the turn ended.
    pub status: TurnStatus,
    /// Text for the player.
    pub narration: Narration,
    /// Committed intent effects, in order.
    pub effects: Vec<Effect>,
    /// Beats fired this turn.
    pub beats: Vec<FiredBeat>,
    /// Act transition this turn.
    pub transition: Option<ActTransition>,
    /// Victory reached this turn.
    pub victory: Option<EntityId>,
}

impl TurnOutcome {
    fn uncommitted(turn: u64, status: TurnStatus, text: String) -> Self {
        Self {
            turn,
            status,
            narration: Narration::template(text),
            effects: Vec::new(),
            beats: Vec::new(),
            transition: None,
            victory: None,
        }
    }

    /// Whether the turn committed effects.
    pub fn is_committed(&self) -> bool {
        self.status == TurnStatus::Committed
    }
}

/// Progress on one spoke of the current act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpokeProgress {
    /// Spoke name.
    pub name: String,
    /// Whether it is completed.
    pub completed: bool,
}

/// A summary of the session for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Session identifier.
    pub session_id: Uuid,
    /// Turns taken.
    pub turn: u64,
    /// Current location name.
    pub location: String,
    /// Current act name.
    pub act: String,
    /// Spokes of the current act.
    pub spokes: Vec<SpokeProgress>,
    /// Names of carried items.
    pub inventory: Vec<String>,
    /// Victory reached, if any.
    pub victory: Option<EntityId>,
}

/// One player's game against a shared catalog.
#[derive(Debug)]
pub struct GameSession {
    id: Uuid,
    catalog: Arc<Catalog>,
    state: StateStore,
    interpreter: Interpreter,
    gateway: NarrationGateway,
}

impl GameSession {
    /// Start a fresh session at the catalog's start.
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        let state = StateStore::new(&catalog);
        Self::assemble(Uuid::new_v4(), catalog, state, &config)
    }

    /// Resume a saved session, migrating it if the catalog version moved on.
    pub fn from_save(catalog: Arc<Catalog>, config: EngineConfig, save: SaveGame) -> EngineResult<Self> {
        let id = save.session_id;
        let state = save.restore(&catalog)?;
        tracing::info!(session = %id, turn = state.turn(), "session restored");
        Ok(Self::assemble(id, catalog, state, &config))
    }

    fn assemble(id: Uuid, catalog: Arc<Catalog>, state: StateStore, config: &EngineConfig) -> Self {
        Self {
            id,
            catalog,
            state,
            interpreter: Interpreter::new(config),
            gateway: NarrationGateway::new(
                TemplateNarrator::new(config.narrator.clone()),
                config.narration_timeout(),
            ),
        }
    }

    /// Attach a prose collaborator.
    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.gateway = self.gateway.with_collaborator(narrator);
        self
    }

    /// Attach a free-text intent collaborator.
    pub fn with_collaborator(mut self, collaborator: Arc<dyn IntentCollaborator>) -> Self {
        self.interpreter = self.interpreter.with_collaborator(collaborator);
        self
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The shared catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The session state.
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// A resolver over the current state.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.catalog, &self.state)
    }

    /// Process one line of player input.
    ///
    /// The turn counter advances whatever the outcome. Only load-time and
    /// internal consistency failures are errors; on such a failure the state
    /// is left as it was before the turn, apart from the counter.
    pub async fn turn(&mut self, input: &str) -> EngineResult<TurnOutcome> {
        self.state.advance_turn();
        let turn = self.state.turn();
        let templates = self.gateway.templates();

        let interpretation = self
            .interpreter
            .interpret(&self.catalog, &self.state, input)
            .await;
        let intent = match interpretation {
            Interpretation::Intent(intent) => intent,
            Interpretation::Ambiguous { candidates } => {
                tracing::debug!(turn, ?candidates, "ambiguous input");
                let text = templates.clarify(&candidates);
                return Ok(TurnOutcome::uncommitted(turn, TurnStatus::Ambiguous(candidates), text));
            }
            Interpretation::Unrecognized(reason) => {
                tracing::debug!(turn, ?reason, "unrecognized input");
                let text = templates.deflection(&reason);
                return Ok(TurnOutcome::uncommitted(turn, TurnStatus::Unrecognized, text));
            }
        };
        tracing::debug!(turn, %intent, "intent resolved");

        let plan = planner::plan(&self.catalog, &self.state, &intent);
        let effects = match validator::validate(&self.catalog, &self.state, &plan) {
            Verdict::Approved(effects) => effects,
            Verdict::Rejected(rejection) => {
                tracing::info!(turn, %intent, code = %rejection.code, "intent rejected");
                let text = templates.refusal(&rejection);
                return Ok(TurnOutcome::uncommitted(turn, TurnStatus::Rejected(rejection), text));
            }
            Verdict::Reinterpret(text) => {
                return Ok(TurnOutcome::uncommitted(turn, TurnStatus::Reinterpret, text));
            }
        };

        let (prior, action) = {
            let resolver = self.resolver();
            (PriorState::capture(&resolver), describe_intent(&resolver, &intent))
        };

        // Intent effects, beats, spokes, act and victory land together or not at all.
        let mut working = applicator::apply(&self.catalog, &self.state, &effects)?;
        let spent = plan
            .interaction
            .as_ref()
            .and_then(|id| self.catalog.interactions().get(id.as_str()))
            .filter(|def| !def.repeatable);
        if let Some(def) = spent {
            working.mark_interaction_used(def.id.clone());
        }
        let fired = beats::detect(&self.catalog, &mut working)?;
        acts::record_spokes(&self.catalog, &mut working);
        let transition = acts::advance(&self.catalog, &mut working)?;
        let victory = acts::check_victory(&self.catalog, &mut working).map(|v| VictoryNote {
            id: v.id.clone(),
            narrative: v.narrative.clone(),
        });
        self.state = working;
        tracing::info!(turn, %intent, effects = effects.len(), beats = fired.len(), "turn committed");

        let request = {
            let resolver = self.resolver();
            let scene = matches!(intent, Intent::Move { .. } | Intent::Examine { target: None })
                .then(|| Scene::here(&resolver));
            let examined = match &intent {
                Intent::Examine { target: Some(key) } => Some(Examined::of(&resolver, key)),
                _ => None,
            };
            NarrationRequest {
                turn,
                prior,
                action,
                effects: effects
                    .iter()
                    .map(|effect| NarratedEffect::describe(&resolver, effect))
                    .collect(),
                beats: fired.clone(),
                transition: transition.clone(),
                response: plan.response.clone(),
                scene,
                examined,
                victory: victory.clone(),
            }
        };
        let narration = self.gateway.narrate(&request).await;

        Ok(TurnOutcome {
            turn,
            status: TurnStatus::Committed,
            narration,
            effects,
            beats: fired,
            transition,
            victory: victory.map(|v| v.id),
        })
    }

    /// Describe the player's surroundings without taking a turn.
    pub fn describe_here(&self) -> String {
        self.gateway
            .templates()
            .describe_scene(&Scene::here(&self.resolver()))
    }

    /// List carried items without taking a turn.
    pub fn inventory_listing(&self) -> String {
        let names: Vec<String> = self
            .resolver()
            .inventory()
            .into_iter()
            .map(|item| item.name)
            .collect();
        self.gateway.templates().inventory_listing(&names)
    }

    /// Summarise the session.
    pub fn status(&self) -> SessionStatus {
        let resolver = self.resolver();
        let act = self.state.act();
        let spokes = self
            .catalog
            .spokes_of(act.as_str())
            .map(|spoke| SpokeProgress {
                name: spoke.name.clone().unwrap_or_else(|| spoke.id.to_string()),
                completed: self.state.spoke_completed(&spoke.id),
            })
            .collect();
        SessionStatus {
            session_id: self.id,
            turn: self.state.turn(),
            location: resolver.display_name(&EntityKey::location(self.state.location().clone())),
            act: self
                .catalog
                .acts()
                .get(act.as_str())
                .and_then(|a| a.name.clone())
                .unwrap_or_else(|| act.to_string()),
            spokes,
            inventory: resolver.inventory().into_iter().map(|item| item.name).collect(),
            victory: self.state.victory().cloned(),
        }
    }

    /// Capture the session for saving.
    pub fn save(&self) -> SaveGame {
        SaveGame::capture(self.id, &self.catalog, &self.state)
    }
}

/// A shareable session that serialises concurrent submissions.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<Mutex<GameSession>>);

impl SessionHandle {
    /// Wrap a session.
    pub fn new(session: GameSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Submit input; waits for any turn already in flight.
    pub async fn submit(&self, input: &str) -> EngineResult<TurnOutcome> {
        self.0.lock().await.turn(input).await
    }

    /// Lock the session for inspection.
    pub async fn lock(&self) -> MutexGuard<'_, GameSession> {
        self.0.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narration::NarrationSource;
    use crate::testing::{id, lighthouse};
    use crate::validator::RejectionCode;

    fn session() -> GameSession {
        GameSession::new(Arc::new(lighthouse()), EngineConfig::default())
    }

    #[tokio::test]
    async fn every_turn_counts() {
        let mut session = session();
        let outcome = session.turn("xyzzy").await.unwrap();
        assert_eq!(outcome.turn, 1);
        assert_eq!(outcome.status, TurnStatus::Unrecognized);

        let outcome = session.turn("drop key").await.unwrap();
        assert_eq!(outcome.turn, 2);
        assert_eq!(
            outcome.status,
            TurnStatus::Rejected(Rejection {
                code: RejectionCode::CriticalItemProtectionTriggered,
                reason: outcome.narration.text.clone(),
            })
        );
        assert!(session.state().has_item(&id("iron_key")));
        assert_eq!(session.state().turn(), 2);
    }

    #[tokio::test]
    async fn taking_the_lamp() {
        let mut session = session();
        let outcome = session.turn("take lamp").await.unwrap();
        assert!(outcome.is_committed());
        assert_eq!(outcome.effects, vec![Effect::GiveItem(id("lamp"))]);
        assert_eq!(outcome.narration.source, NarrationSource::Template);
        assert!(outcome.narration.text.starts_with("You take the brass lamp."));
        assert!(session.inventory_listing().contains("brass lamp"));
    }

    #[tokio::test]
    async fn arrival_fires_beats() {
        let mut session = session();
        session.turn("north").await.unwrap();
        let outcome = session.turn("east").await.unwrap();
        let fired: Vec<_> = outcome.beats.iter().map(|b| b.id.clone()).collect();
        assert_eq!(fired, vec![id("meet_jenkins")]);
        assert!(outcome.narration.text.contains("**Keeper's Cottage**"));
        assert!(outcome.narration.text.contains("The keeper looks up from his charts."));
    }

    #[tokio::test]
    async fn status_reports_spokes() {
        let mut session = session();
        session.turn("survey the dock").await.unwrap();
        let status = session.status();
        assert_eq!(status.act, "The Shore");
        assert_eq!(status.location, "Dock");
        assert_eq!(
            status.spokes,
            vec![
                SpokeProgress {
                    name: "Explore the dock".to_string(),
                    completed: true,
                },
                SpokeProgress {
                    name: "Earn the keeper's trust".to_string(),
                    completed: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn saves_resume() {
        let catalog = Arc::new(lighthouse());
        let mut session = GameSession::new(catalog.clone(), EngineConfig::default());
        session.turn("take lamp").await.unwrap();
        let json = session.save().to_json().unwrap();

        let resumed =
            GameSession::from_save(catalog, EngineConfig::default(), SaveGame::from_json(&json).unwrap())
                .unwrap();
        assert_eq!(resumed.id(), session.id());
        assert_eq!(resumed.state().turn(), 1);
        assert!(resumed.state().has_item(&id("lamp")));
    }
}
