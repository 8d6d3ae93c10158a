//! Deterministic narrative text.

use async_trait::async_trait;
use loom_core::{Effect, EntityKind};

use super::config::{NarratorConfig, NarratorTone, PlayerCase, Verbosity};
use super::{Examined, NarratedEffect, NarrationError, NarrationRequest, Narrator, PriorState, Scene};
use crate::intent::{Unrecognized, normalize};
use crate::validator::Rejection;

/// Renders narration from templates, according to a [`NarratorConfig`].
#[derive(Debug, Clone, Default)]
pub struct TemplateNarrator {
    config: NarratorConfig,
}

impl TemplateNarrator {
    /// Create a narrator with the given config.
    pub fn new(config: NarratorConfig) -> Self {
        Self { config }
    }

    /// The narrator's configuration.
    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    /// Render a committed turn.
    pub fn render(&self, request: &NarrationRequest) -> String {
        let mut blocks = Vec::new();

        if let Some(response) = &request.response {
            blocks.push(response.clone());
        }
        if let Some(examined) = &request.examined {
            blocks.push(self.describe_examined(examined));
        }

        let lines: Vec<String> = request
            .effects
            .iter()
            .filter_map(|effect| self.effect_line(effect, &request.prior))
            .collect();
        if !lines.is_empty() {
            blocks.push(lines.join("\n"));
        }

        if let Some(scene) = &request.scene {
            blocks.push(self.describe_scene(scene));
        }
        blocks.extend(request.beats.iter().filter_map(|b| b.narrative.clone()));

        if let Some(transition) = &request.transition {
            if let Some(text) = transition.gate_beat.as_ref().and_then(|b| b.narrative.clone()) {
                blocks.push(text);
            }
            let name = transition
                .name
                .clone()
                .unwrap_or_else(|| transition.to.to_string());
            let mut block = format!("*{name}*");
            if let Some(text) = &transition.narrative {
                block.push('\n');
                block.push_str(text);
            }
            blocks.push(block);
        }

        if let Some(victory) = &request.victory {
            let text = victory
                .narrative
                .clone()
                .unwrap_or_else(|| format!("{} {} won.", self.subject(), self.verb("have", "has")));
            blocks.push(format!("{text}\n*** The End ***"));
        }

        if blocks.is_empty() {
            return self.nothing_happens();
        }
        blocks.join("\n\n")
    }

    /// Describe a scene for the player.
    pub fn describe_scene(&self, scene: &Scene) -> String {
        let mut lines = vec![format!("**{}**", scene.name)];
        if self.config.verbosity != Verbosity::Terse && !scene.description.is_empty() {
            lines.push(scene.description.clone());
        }
        lines.extend(scene.characters.iter().map(|c| self.format_character_present(c)));
        lines.extend(scene.items.iter().map(|i| self.format_item_present(i)));
        if !scene.exits.is_empty() {
            lines.push(self.format_exits(&scene.exits));
        }
        if let Some(guidance) = scene.guidance.as_ref().filter(|_| self.verbose()) {
            lines.push(guidance.clone());
        }
        lines.join("\n")
    }

    /// Describe an examined entity.
    pub fn describe_examined(&self, examined: &Examined) -> String {
        let description = if examined.description.is_empty() {
            default_description(examined.kind)
        } else {
            examined.description.as_str()
        };
        let mut output = format!("**{}**\n{description}", examined.name);
        if let Some(guidance) = examined.guidance.as_ref().filter(|_| self.verbose()) {
            output.push('\n');
            output.push_str(guidance);
        }
        output
    }

    /// Narrate an arrival at a location.
    pub fn narrate_arrival(&self, location: &str) -> String {
        let subject = self.subject();
        match self.config.tone {
            NarratorTone::Formal => format!("{subject} {} at {location}.", self.verb("arrive", "arrives")),
            NarratorTone::Casual => format!("{subject} {} into {location}.", self.verb("head", "heads")),
            NarratorTone::Dramatic => {
                format!("{subject} {} foot upon {location}.", self.verb("set", "sets"))
            }
            NarratorTone::Humorous => {
                format!("{subject} {} into {location}. It's a place.", self.verb("wander", "wanders"))
            }
        }
    }

    /// Narrate taking an item.
    pub fn narrate_take(&self, item: &str) -> String {
        let subject = self.subject();
        match self.config.tone {
            NarratorTone::Formal => format!("{subject} {} the {item}.", self.verb("take", "takes")),
            NarratorTone::Casual => format!("{subject} {} the {item}.", self.verb("grab", "grabs")),
            NarratorTone::Dramatic => format!(
                "{subject} {} the {item} as {} own.",
                self.verb("claim", "claims"),
                self.config.player(PlayerCase::Possessive)
            ),
            NarratorTone::Humorous => format!(
                "{subject} {} the {item}. Five-finger discount.",
                self.verb("pocket", "pockets")
            ),
        }
    }

    /// Narrate dropping an item.
    pub fn narrate_drop(&self, item: &str) -> String {
        let subject = self.subject();
        match self.config.tone {
            NarratorTone::Formal => format!("{subject} {} down the {item}.", self.verb("set", "sets")),
            NarratorTone::Casual => format!("{subject} {} the {item}.", self.verb("drop", "drops")),
            NarratorTone::Dramatic => {
                format!("{subject} {} the {item}.", self.verb("relinquish", "relinquishes"))
            }
            NarratorTone::Humorous => format!(
                "{subject} {} the {item} aside. It wasn't that great anyway.",
                self.verb("toss", "tosses")
            ),
        }
    }

    /// Narrate a direction with no exit.
    pub fn narrate_no_exit(&self, direction: &str) -> String {
        let subject = self.subject();
        match self.config.tone {
            NarratorTone::Formal => format!("{subject} cannot go {direction} from here."),
            NarratorTone::Casual => format!("There's no way {direction}."),
            NarratorTone::Dramatic => format!(
                "The path {direction} is barred to {}.",
                self.config.player(PlayerCase::Object)
            ),
            NarratorTone::Humorous => format!(
                "{subject} {} {direction} into a wall. Ouch.",
                self.verb("walk", "walks")
            ),
        }
    }

    /// Text for a rejected intent.
    pub fn refusal(&self, rejection: &Rejection) -> String {
        rejection.reason.clone()
    }

    /// Text for input that produced no intent.
    pub fn deflection(&self, unrecognized: &Unrecognized) -> String {
        let subject = self.subject();
        match unrecognized {
            Unrecognized::NoMatch => match self.config.tone {
                NarratorTone::Formal => format!("{subject} cannot do that here."),
                NarratorTone::Casual => "Not sure what you mean.".to_string(),
                NarratorTone::Dramatic => "The world does not answer.".to_string(),
                NarratorTone::Humorous => format!(
                    "{subject} {} that. Nothing. Absolutely nothing.",
                    self.verb("try", "tries")
                ),
            },
            Unrecognized::NoExit(direction) => self.narrate_no_exit(direction.name()),
            Unrecognized::UnknownTarget(target) => format!(
                "{subject} {} no {} here.",
                self.verb("see", "sees"),
                normalize(target)
            ),
            Unrecognized::Incomplete(prompt) => (*prompt).to_string(),
        }
    }

    /// Ask the player to choose between readings.
    pub fn clarify(&self, candidates: &[String]) -> String {
        match candidates {
            [] => "Could you be more specific?".to_string(),
            [one] => format!("Did you mean: {one}?"),
            [rest @ .., last] => format!("Which do you mean: {} or {last}?", rest.join(", ")),
        }
    }

    /// List carried items.
    pub fn inventory_listing(&self, items: &[String]) -> String {
        let subject = self.subject();
        let verb = self.verb("are", "is");
        if items.is_empty() {
            format!("{subject} {verb} carrying nothing.")
        } else {
            format!("{subject} {verb} carrying: {}.", items.join(", "))
        }
    }

    /// Text when a committed action changed nothing visible.
    pub fn nothing_happens(&self) -> String {
        match self.config.tone {
            NarratorTone::Formal | NarratorTone::Casual => "Nothing happens.".to_string(),
            NarratorTone::Dramatic => "The moment passes in silence.".to_string(),
            NarratorTone::Humorous => "Nothing happens. Riveting.".to_string(),
        }
    }

    fn effect_line(&self, narrated: &NarratedEffect, prior: &PriorState) -> Option<String> {
        let subject = narrated.subject.as_deref()?;
        let object = narrated.object.as_deref().unwrap_or_default();
        let line = match &narrated.effect {
            Effect::MovePlayer(_) => self.narrate_arrival(subject),
            Effect::GiveItem(_) => self.narrate_take(subject),
            Effect::PlaceItem { .. } if prior.inventory.iter().any(|i| i == subject) => {
                self.narrate_drop(subject)
            }
            Effect::PlaceItem { .. } => format!("The {subject} turns up in {object}."),
            Effect::RemoveItem(_) => format!(
                "{} no longer {} the {subject}.",
                self.subject(),
                self.verb("have", "has")
            ),
            Effect::DestroyItem(_) => format!("The {subject} is destroyed."),
            Effect::HandItem { .. } => format!("The {subject} passes to {object}."),
            Effect::MoveCharacter { .. } => format!("{subject} heads for {object}."),
            Effect::UnlockExit(_) => format!("The way {subject} is open now."),
            Effect::LockExit(_) => format!("The way {subject} is shut."),
            Effect::RevealExit(_) => format!("A way {subject} is revealed."),
            _ => return None,
        };
        match narrated.guidance.as_ref().filter(|_| self.verbose()) {
            Some(guidance) => Some(format!("{line} {guidance}")),
            None => Some(line),
        }
    }

    fn subject(&self) -> &str {
        self.config.player(PlayerCase::Subject)
    }

    fn verb(&self, base: &'static str, third: &'static str) -> &'static str {
        self.config.agree(base, third)
    }

    fn verbose(&self) -> bool {
        self.config.verbosity == Verbosity::Verbose
    }

    fn format_character_present(&self, character: &str) -> String {
        match self.config.tone {
            NarratorTone::Formal => format!("{character} is here."),
            NarratorTone::Casual => format!("{character} is hanging around."),
            NarratorTone::Dramatic => {
                format!("{character} stands before {}.", self.config.player(PlayerCase::Object))
            }
            NarratorTone::Humorous => format!("{character} is here, doing... something."),
        }
    }

    fn format_item_present(&self, item: &str) -> String {
        match self.config.tone {
            NarratorTone::Formal => format!(
                "{} {} a {item} here.",
                self.subject(),
                self.verb("see", "sees")
            ),
            NarratorTone::Casual => format!("There's a {item} lying around."),
            NarratorTone::Dramatic => format!("A {item} gleams in the shadows."),
            NarratorTone::Humorous => format!("A {item} is just sitting here. Rude."),
        }
    }

    fn format_exits(&self, exits: &[String]) -> String {
        match self.config.verbosity {
            Verbosity::Terse => format!("[{}]", exits.join(", ")),
            Verbosity::Normal | Verbosity::Verbose => format!("Exits: {}", exits.join(", ")),
        }
    }
}

fn default_description(kind: Option<EntityKind>) -> &'static str {
    match kind {
        Some(EntityKind::Character) => "A quiet figure.",
        Some(EntityKind::Location) => "An unremarkable place.",
        Some(EntityKind::Item) => "An ordinary-looking object.",
        _ => "You see nothing special.",
    }
}

#[async_trait]
impl Narrator for TemplateNarrator {
    async fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError> {
        Ok(self.render(request))
    }
}

#[cfg(test)]
mod tests {
    use loom_core::EntityId;

    use super::*;
    use crate::beats::FiredBeat;
    use crate::intent::Direction;
    use crate::narration::Perspective;
    use crate::validator::RejectionCode;

    fn arrival() -> NarrationRequest {
        NarrationRequest {
            turn: 1,
            prior: PriorState {
                location: "Dock".to_string(),
                act: "The Shore".to_string(),
                inventory: vec!["iron key".to_string()],
            },
            action: "go north".to_string(),
            effects: vec![NarratedEffect {
                effect: Effect::MovePlayer(EntityId::new("path")),
                subject: Some("Cliff Path".to_string()),
                object: None,
                guidance: None,
            }],
            scene: Some(Scene {
                name: "Cliff Path".to_string(),
                description: "A narrow path winds along the cliff.".to_string(),
                exits: vec!["south".to_string(), "east".to_string(), "north".to_string()],
                ..Scene::default()
            }),
            ..NarrationRequest::default()
        }
    }

    #[test]
    fn arrival_snapshot() {
        let text = TemplateNarrator::default().render(&arrival());
        insta::assert_snapshot!(text, @r"
        You arrive at Cliff Path.

        **Cliff Path**
        A narrow path winds along the cliff.
        Exits: south, east, north
        ");
    }

    #[test]
    fn beats_follow_the_scene() {
        let mut request = arrival();
        request.beats.push(FiredBeat {
            id: EntityId::new("gull_cry"),
            name: None,
            effects: Vec::new(),
            narrative: Some("A gull cries overhead.".to_string()),
        });
        let text = TemplateNarrator::default().render(&request);
        assert!(text.ends_with("Exits: south, east, north\n\nA gull cries overhead."));
    }

    #[test]
    fn drops_are_told_apart_from_placements() {
        let narrator = TemplateNarrator::default();
        let prior = PriorState {
            inventory: vec!["brass lamp".to_string()],
            ..PriorState::default()
        };
        let placed = |subject: &str| NarratedEffect {
            effect: Effect::PlaceItem {
                item: EntityId::new("x"),
                location: EntityId::new("dock"),
            },
            subject: Some(subject.to_string()),
            object: Some("Dock".to_string()),
            guidance: None,
        };
        assert_eq!(
            narrator.effect_line(&placed("brass lamp"), &prior).as_deref(),
            Some("You set down the brass lamp.")
        );
        assert_eq!(
            narrator.effect_line(&placed("sealed letter"), &prior).as_deref(),
            Some("The sealed letter turns up in Dock.")
        );
    }

    #[test]
    fn tones_and_perspective() {
        let toned = |tone| {
            TemplateNarrator::new(NarratorConfig {
                tone,
                ..NarratorConfig::default()
            })
        };
        assert!(toned(NarratorTone::Dramatic).narrate_arrival("the Citadel").contains("set foot"));
        assert!(toned(NarratorTone::Humorous).narrate_arrival("the Citadel").contains("wander"));

        let third = TemplateNarrator::new(NarratorConfig {
            perspective: Perspective::ThirdPerson,
            player_name: Some("Kael".to_string()),
            ..NarratorConfig::default()
        });
        assert_eq!(third.narrate_take("lamp"), "Kael takes the lamp.");
        assert_eq!(third.inventory_listing(&[]), "Kael is carrying nothing.");
    }

    #[test]
    fn refusals_and_deflections() {
        let narrator = TemplateNarrator::default();
        let rejection = Rejection {
            code: RejectionCode::ExitLocked,
            reason: "The stair door is bolted from above.".to_string(),
        };
        assert_eq!(narrator.refusal(&rejection), "The stair door is bolted from above.");
        assert_eq!(
            narrator.deflection(&Unrecognized::NoExit(Direction::West)),
            "You cannot go west from here."
        );
        assert_eq!(
            narrator.deflection(&Unrecognized::UnknownTarget("the zeppelin".to_string())),
            "You see no zeppelin here."
        );
        assert_eq!(
            narrator.clarify(&["brass lamp".to_string(), "oil lamp".to_string()]),
            "Which do you mean: brass lamp or oil lamp?"
        );
    }

    #[test]
    fn empty_turn_says_so() {
        let narrator = TemplateNarrator::default();
        assert_eq!(narrator.render(&NarrationRequest::default()), "Nothing happens.");
    }

    #[test]
    fn terse_scene() {
        let narrator = TemplateNarrator::new(NarratorConfig {
            verbosity: Verbosity::Terse,
            ..NarratorConfig::default()
        });
        let scene = Scene {
            name: "Dock".to_string(),
            description: "Planks.".to_string(),
            exits: vec!["north".to_string()],
            ..Scene::default()
        };
        assert_eq!(narrator.describe_scene(&scene), "**Dock**\n[north]");
    }
}
