//! Scenario tests for the loom engine.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loom_core::definition::MigrationRule;
use loom_core::{Catalog, CoreError, EntityId, Resolver, SaveGame, StateStore};
use loom_engine::narration::{NarrationError, Narrator};
use loom_engine::{
    EngineConfig, EngineError, GameSession, NarrationRequest, NarrationSource, RejectionCode,
    SessionHandle, TurnOutcome, TurnStatus,
};
use loom_loader::Format;

const LIGHTHOUSE: &str = include_str!("fixtures/lighthouse.toml");

fn lighthouse() -> Arc<Catalog> {
    Arc::new(loom_loader::load_str(LIGHTHOUSE, Format::Toml).unwrap())
}

fn session() -> GameSession {
    GameSession::new(lighthouse(), EngineConfig::default())
}

fn id(s: &str) -> EntityId {
    EntityId::new(s)
}

async fn play(session: &mut GameSession, inputs: &[&str]) -> Vec<TurnOutcome> {
    let mut outcomes = Vec::new();
    for input in inputs {
        outcomes.push(session.turn(input).await.unwrap());
    }
    outcomes
}

fn rejection_code(outcome: &TurnOutcome) -> Option<RejectionCode> {
    match &outcome.status {
        TurnStatus::Rejected(rejection) => Some(rejection.code),
        _ => None,
    }
}

#[tokio::test]
async fn crossing_into_a_later_act_is_refused() {
    let mut session = session();
    play(&mut session, &["north", "north"]).await;
    assert_eq!(session.state().location(), &id("base"));

    let mut expected = session.state().clone();
    expected.advance_turn();

    let outcome = session.turn("up").await.unwrap();
    assert_eq!(rejection_code(&outcome), Some(RejectionCode::ActBoundaryViolation));
    assert_eq!(outcome.turn, 3);
    assert!(outcome.effects.is_empty());
    assert_eq!(session.state(), &expected);
}

#[tokio::test]
async fn critical_items_cannot_be_dropped() {
    let mut session = session();
    let outcome = session.turn("drop the iron key").await.unwrap();
    assert_eq!(
        rejection_code(&outcome),
        Some(RejectionCode::CriticalItemProtectionTriggered)
    );
    assert_eq!(session.state().inventory(), &[id("iron_key")]);
    assert_eq!(outcome.narration.source, NarrationSource::Template);
}

#[tokio::test]
async fn actions_that_doom_the_story_are_refused() {
    let mut session = session();
    play(&mut session, &["take lamp"]).await;

    let outcome = session.turn("smash the lamp").await.unwrap();
    assert_eq!(rejection_code(&outcome), Some(RejectionCode::SafetyInvariantViolation));
    assert!(session.state().has_item(&id("lamp")));
}

const BROKEN_VASE: &str = r#"
[world]
title = "The Vase"

[start]
location = "room"

[[locations]]
id = "room"
name = "Room"

[[items]]
id = "vase"
name = "vase"
location = "room"

[[interactions]]
id = "smash_vase"
triggers = ["smash the vase"]
effects = [{ destroy_item = "vase" }, { set_flag = { flag = "smashed" } }]

[[beats]]
id = "regret"
trigger = { flag = "smashed" }
effects = [{ give_item = "vase" }]

[[acts]]
id = "only"
locations = ["room"]
"#;

#[tokio::test]
async fn failing_beat_rolls_back_the_whole_turn() {
    let catalog = Arc::new(loom_loader::load_str(BROKEN_VASE, Format::Toml).unwrap());
    let mut session = GameSession::new(catalog, EngineConfig::default());
    let mut expected = session.state().clone();
    expected.advance_turn();

    let err = session.turn("smash the vase").await.unwrap_err();
    assert!(matches!(err, EngineError::InternalConsistency { .. }));
    assert_eq!(session.state(), &expected);
    assert!(session.state().flag("smashed").is_none());
    assert!(!session.state().beat_fired(&id("regret")));

    // The beat's trigger never took hold, so play carries on.
    let outcome = session.turn("look").await.unwrap();
    assert!(outcome.is_committed());
    assert!(outcome.beats.is_empty());
    assert_eq!(outcome.turn, 2);
}

#[tokio::test]
async fn repeated_talks_are_not_recorded_as_used() {
    let mut session = session();
    let outcomes = play(&mut session, &["north", "east", "talk to jenkins", "talk to jenkins"]).await;
    assert!(outcomes.iter().all(TurnOutcome::is_committed));
    let resolver = Resolver::new(session.catalog(), session.state());
    assert_eq!(resolver.counter(&id("jenkins"), "trust"), 2);
    assert!(!session.state().interaction_used(&id("talk_jenkins")));
}

#[tokio::test]
async fn completing_both_spokes_opens_the_second_act() {
    let mut session = session();
    let outcomes = play(
        &mut session,
        &["north", "east", "talk to jenkins", "west", "south", "survey the dock"],
    )
    .await;
    let surveyed = outcomes.last().unwrap();
    assert!(surveyed.transition.is_none());
    assert!(session.state().spoke_completed(&id("spoke_explore")));
    assert_eq!(session.state().act(), &id("act1"));

    let outcomes = play(&mut session, &["north", "east", "talk to jenkins"]).await;
    let last = outcomes.last().unwrap();
    let transition = last.transition.as_ref().unwrap();
    assert_eq!(transition.to, id("act2"));
    assert_eq!(
        transition.gate_beat.as_ref().map(|b| b.id.clone()),
        Some(id("gate_open"))
    );
    assert!(last.beats.iter().all(|b| b.id != id("gate_open")));
    assert_eq!(session.state().act(), &id("act2"));
    assert_eq!(
        session
            .state()
            .fired_beats()
            .iter()
            .filter(|b| **b == id("gate_open"))
            .count(),
        1
    );

    let reachable = Resolver::new(session.catalog(), session.state()).reachable_locations();
    assert!(reachable.contains(&id("lantern")));
    assert!(last.narration.text.contains("Somewhere above, a bolt slides back."));
    assert!(last.narration.text.contains("*The Lantern Room*"));
}

#[tokio::test]
async fn full_playthrough_reaches_victory() {
    let mut session = session();
    let outcomes = play(
        &mut session,
        &[
            "take lamp",
            "north",
            "east",
            "talk to jenkins",
            "west",
            "south",
            "survey the dock",
            "north",
            "east",
            "talk to jenkins",
            "west",
            "north",
            "up",
            "use lamp",
        ],
    )
    .await;
    assert!(outcomes.iter().all(TurnOutcome::is_committed));

    let last = outcomes.last().unwrap();
    assert_eq!(last.victory, Some(id("light_restored")));
    assert!(last.narration.text.contains("The lamp catches and the lens blazes."));
    assert!(last.narration.text.ends_with("The beam sweeps the water again.\n*** The End ***"));
    assert_eq!(session.status().victory, Some(id("light_restored")));
}

#[tokio::test]
async fn arrival_narration() {
    let mut session = session();
    let outcomes = play(&mut session, &["north", "east"]).await;
    insta::assert_snapshot!(outcomes[1].narration.text, @r"
    You arrive at Keeper's Cottage.

    **Keeper's Cottage**
    Pipe smoke and old charts.
    Old Jenkins is here.
    You see a sealed letter here.
    Exits: west

    The keeper looks up from his charts.
    ");
}

fn without_cellar(version: &str, migration: Option<MigrationRule>) -> Catalog {
    let mut doc = loom_loader::parse_document("lighthouse.toml", LIGHTHOUSE, Format::Toml).unwrap();
    if let Some(world) = doc.world.as_mut() {
        world.version = version.to_string();
    }
    doc.locations.retain(|l| l.id.as_str() != "cellar");
    doc.exits
        .retain(|e| e.from.as_str() != "cellar" && e.to.as_str() != "cellar");
    doc.interactions.retain(|i| i.id.as_str() != "search_floor");
    for act in &mut doc.acts {
        act.locations.retain(|l| l.as_str() != "cellar");
    }
    doc.migrations.extend(migration);
    loom_loader::load_documents(vec![doc]).unwrap()
}

fn saved_in_cellar(catalog: &Catalog) -> SaveGame {
    let mut state = StateStore::new(catalog);
    state.enter_act(id("act2"));
    state.set_location(id("cellar"));
    SaveGame::capture(uuid::Uuid::new_v4(), catalog, &state)
}

#[test]
fn removed_location_without_a_rule_is_a_version_mismatch() {
    let old = lighthouse();
    let save = saved_in_cellar(&old);
    let json = save.to_json().unwrap();

    let new = Arc::new(without_cellar("2.0", None));
    let err = GameSession::from_save(new, EngineConfig::default(), SaveGame::from_json(&json).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::PersistenceVersionMismatch { ref saved, ref current, .. })
            if saved == "1.0" && current == "2.0"
    ));
}

#[test]
fn removed_location_with_a_rule_relocates_the_player() {
    let old = lighthouse();
    let save = saved_in_cellar(&old);

    let rule = MigrationRule {
        from: "1.0".to_string(),
        rename: Default::default(),
        drop_flags: Vec::new(),
        relocate: Some(id("base")),
        discard_missing: false,
    };
    let new = Arc::new(without_cellar("2.0", Some(rule)));
    let session = GameSession::from_save(new, EngineConfig::default(), save).unwrap();
    assert_eq!(session.state().location(), &id("base"));
    assert_eq!(session.state().act(), &id("act2"));
}

struct Stalling;

#[async_trait]
impl Narrator for Stalling {
    async fn narrate(&self, _request: &NarrationRequest) -> Result<String, NarrationError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }
}

#[tokio::test]
async fn slow_narration_falls_back_without_undoing_the_turn() {
    let config = EngineConfig::default().with_narration_timeout(Duration::from_millis(20));
    let mut session = GameSession::new(lighthouse(), config).with_narrator(Arc::new(Stalling));

    let outcome = session.turn("take lamp").await.unwrap();
    assert_eq!(outcome.narration.source, NarrationSource::Fallback);
    assert!(outcome.narration.text.starts_with("You take the brass lamp."));
    assert!(session.state().has_item(&id("lamp")));
}

#[tokio::test]
async fn handle_queues_concurrent_turns() {
    let handle = SessionHandle::new(session());
    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.submit("north").await.unwrap().turn }
    });
    let second = tokio::spawn({
        let handle = handle.clone();
        async move { handle.submit("look").await.unwrap().turn }
    });

    let mut turns = vec![first.await.unwrap(), second.await.unwrap()];
    turns.sort_unstable();
    assert_eq!(turns, vec![1, 2]);
    assert_eq!(handle.lock().await.state().turn(), 2);
}
