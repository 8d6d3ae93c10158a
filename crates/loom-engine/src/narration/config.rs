//! Settings for the template narrator, read from the `[narrator]` table of
//! the engine config.

use serde::{Deserialize, Serialize};

/// Register of the templated lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarratorTone {
    /// Plain and measured.
    #[default]
    Formal,
    /// Conversational.
    Casual,
    /// Grand.
    Dramatic,
    /// Wry.
    Humorous,
}

/// Who the player is in the prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    /// "You take the lamp."
    #[default]
    SecondPerson,
    /// "Kael takes the lamp."
    ThirdPerson,
}

/// How much of a scene is spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Heading, occupants and a bracketed exit list.
    Terse,
    /// Adds the location description.
    #[default]
    Normal,
    /// Adds authored guidance text as well.
    Verbose,
}

/// Grammatical slot the player reference fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCase {
    /// Sentence subject, capitalised.
    Subject,
    /// Object of a verb or preposition.
    Object,
    /// Possessive determiner.
    Possessive,
}

/// Template narrator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NarratorConfig {
    /// Register of the lines.
    pub tone: NarratorTone,
    /// Grammatical person used for the player.
    pub perspective: Perspective,
    /// Scene detail.
    pub verbosity: Verbosity,
    /// Player name in third person; "the traveller" when unset.
    pub player_name: Option<String>,
}

impl NarratorConfig {
    /// How the player is referred to in `case`.
    pub fn player(&self, case: PlayerCase) -> &str {
        let name = self.player_name.as_deref();
        match (self.perspective, case) {
            (Perspective::SecondPerson, PlayerCase::Subject) => "You",
            (Perspective::SecondPerson, PlayerCase::Object) => "you",
            (Perspective::SecondPerson, PlayerCase::Possessive) => "your",
            (Perspective::ThirdPerson, PlayerCase::Subject) => name.unwrap_or("The traveller"),
            (Perspective::ThirdPerson, PlayerCase::Object) => name.unwrap_or("the traveller"),
            (Perspective::ThirdPerson, PlayerCase::Possessive) => "their",
        }
    }

    /// Pick the verb form agreeing with the player (`take` / `takes`).
    pub fn agree<'a>(&self, second: &'a str, third: &'a str) -> &'a str {
        match self.perspective {
            Perspective::SecondPerson => second,
            Perspective::ThirdPerson => third,
        }
    }
}
