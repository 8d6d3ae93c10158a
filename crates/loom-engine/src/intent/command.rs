//! Verb parsing for player input.

use std::fmt;

/// Direction for movement commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// North.
    North,
    /// South.
    South,
    /// East.
    East,
    /// West.
    West,
    /// Up.
    Up,
    /// Down.
    Down,
    /// Northeast.
    Northeast,
    /// Northwest.
    Northwest,
    /// Southeast.
    Southeast,
    /// Southwest.
    Southwest,
    /// In.
    In,
    /// Out.
    Out,
}

impl Direction {
    /// Parse a direction from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "n" | "north" => Some(Self::North),
            "s" | "south" => Some(Self::South),
            "e" | "east" => Some(Self::East),
            "w" | "west" => Some(Self::West),
            "u" | "up" => Some(Self::Up),
            "d" | "down" => Some(Self::Down),
            "ne" | "northeast" => Some(Self::Northeast),
            "nw" | "northwest" => Some(Self::Northwest),
            "se" | "southeast" => Some(Self::Southeast),
            "sw" | "southwest" => Some(Self::Southwest),
            "in" | "inside" => Some(Self::In),
            "out" | "outside" => Some(Self::Out),
            _ => None,
        }
    }

    /// Get the display name for this direction.
    pub fn name(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
            Self::Up => "up",
            Self::Down => "down",
            Self::Northeast => "northeast",
            Self::Northwest => "northwest",
            Self::Southeast => "southeast",
            Self::Southwest => "southwest",
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// Whether an authored exit direction names this direction.
    pub fn matches(&self, authored: &str) -> bool {
        Self::parse(authored.trim()) == Some(*self)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed player command. Object phrases are still raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Move in a compass direction.
    Move {
        /// The direction to move.
        direction: Direction,
    },
    /// Go somewhere by name.
    Go {
        /// The destination phrase.
        target: String,
    },
    /// Look at the current location or a specific target.
    Look {
        /// Optional target to examine.
        target: Option<String>,
    },
    /// Take an item.
    Take {
        /// The item phrase.
        item: String,
    },
    /// Drop an item.
    Drop {
        /// The item phrase.
        item: String,
    },
    /// Talk to a character.
    Talk {
        /// The character phrase.
        character: String,
        /// Optional topic.
        topic: Option<String>,
    },
    /// Use an item, optionally on a target.
    Use {
        /// The item phrase.
        item: String,
        /// Optional target phrase.
        target: Option<String>,
    },
    /// A known verb with its object missing.
    Incomplete {
        /// Follow-up question for the player, e.g. `Take what?`.
        prompt: &'static str,
    },
    /// No known verb.
    Unknown {
        /// The original input.
        input: String,
    },
}

/// Verb synonyms for command parsing.
const MOVE_VERBS: &[&str] = &["go", "move", "walk", "head", "travel", "run"];
const LOOK_VERBS: &[&str] = &[
    "look", "l", "examine", "ex", "x", "describe", "inspect", "read", "search",
];
const TAKE_VERBS: &[&str] = &["take", "get", "pick", "grab"];
const DROP_VERBS: &[&str] = &["drop", "put", "leave", "discard"];
const TALK_VERBS: &[&str] = &["talk", "speak", "ask", "chat", "converse", "greet"];
const USE_VERBS: &[&str] = &["use", "apply", "activate", "light"];

/// Parse a player input string into a command.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if input.is_empty() {
        return Command::Look { target: None };
    }

    let words: Vec<&str> = input.split_whitespace().collect();
    let verb = words[0].to_lowercase();
    let rest = words.get(1..).unwrap_or(&[]);

    // Bare direction
    if let Some(dir) = Direction::parse(&verb).filter(|_| rest.is_empty()) {
        return Command::Move { direction: dir };
    }

    let verb = verb.as_str();
    if MOVE_VERBS.contains(&verb) {
        return parse_move(rest);
    }
    if LOOK_VERBS.contains(&verb) {
        return parse_look(rest);
    }
    if TAKE_VERBS.contains(&verb) {
        return parse_take(rest);
    }
    if DROP_VERBS.contains(&verb) {
        return parse_drop(rest);
    }
    if TALK_VERBS.contains(&verb) {
        return parse_talk(rest);
    }
    if USE_VERBS.contains(&verb) {
        return parse_use(rest);
    }

    Command::Unknown {
        input: input.to_string(),
    }
}

/// Drop a leading preposition such as `to` or `at`.
fn skip_word<'a, 'b>(rest: &'a [&'b str], words: &[&str]) -> &'a [&'b str] {
    match rest.first() {
        Some(first) if words.iter().any(|w| first.eq_ignore_ascii_case(w)) => &rest[1..],
        _ => rest,
    }
}

fn parse_move(rest: &[&str]) -> Command {
    let rest = skip_word(rest, &["to", "towards", "into"]);
    if rest.is_empty() {
        return Command::Incomplete {
            prompt: "Go where?",
        };
    }

    if let Some(dir) = Direction::parse(rest[0]).filter(|_| rest.len() == 1) {
        return Command::Move { direction: dir };
    }

    Command::Go {
        target: rest.join(" "),
    }
}

fn parse_look(rest: &[&str]) -> Command {
    let target_words = skip_word(rest, &["at", "around", "in"]);
    if target_words.is_empty() {
        Command::Look { target: None }
    } else {
        Command::Look {
            target: Some(target_words.join(" ")),
        }
    }
}

fn parse_take(rest: &[&str]) -> Command {
    // "pick up"
    let item_words = skip_word(rest, &["up"]);
    if item_words.is_empty() {
        Command::Incomplete {
            prompt: "Take what?",
        }
    } else {
        Command::Take {
            item: item_words.join(" "),
        }
    }
}

fn parse_drop(rest: &[&str]) -> Command {
    let item_words = match rest.last() {
        Some(last) if last.eq_ignore_ascii_case("down") => &rest[..rest.len() - 1],
        _ => rest,
    };
    if item_words.is_empty() {
        return Command::Incomplete {
            prompt: "Drop what?",
        };
    }

    Command::Drop {
        item: item_words.join(" "),
    }
}

fn parse_talk(rest: &[&str]) -> Command {
    let remaining = skip_word(rest, &["to", "with"]);
    if remaining.is_empty() {
        return Command::Incomplete {
            prompt: "Talk to whom?",
        };
    }

    // "ask X about Y"
    if let Some(about_pos) = remaining
        .iter()
        .position(|w| w.eq_ignore_ascii_case("about"))
    {
        let character = remaining[..about_pos].join(" ");
        let topic = remaining[about_pos + 1..].join(" ");
        Command::Talk {
            character,
            topic: if topic.is_empty() { None } else { Some(topic) },
        }
    } else {
        Command::Talk {
            character: remaining.join(" "),
            topic: None,
        }
    }
}

fn parse_use(rest: &[&str]) -> Command {
    if rest.is_empty() {
        return Command::Incomplete {
            prompt: "Use what?",
        };
    }

    // "use X on Y" / "use X with Y"
    if let Some(split_pos) = rest
        .iter()
        .position(|w| w.eq_ignore_ascii_case("on") || w.eq_ignore_ascii_case("with"))
    {
        let item = rest[..split_pos].join(" ");
        let target = rest[split_pos + 1..].join(" ");
        if item.is_empty() {
            return Command::Incomplete {
                prompt: "Use what?",
            };
        }
        Command::Use {
            item,
            target: if target.is_empty() {
                None
            } else {
                Some(target)
            },
        }
    } else {
        Command::Use {
            item: rest.join(" "),
            target: None,
        }
    }
}
