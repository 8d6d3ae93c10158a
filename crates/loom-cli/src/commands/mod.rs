pub mod check;
pub mod play;
pub mod replay;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use loom_core::{Catalog, SaveGame};
use loom_engine::{EngineConfig, GameSession, TurnOutcome, TurnStatus};

const HELP: &str = "\
  Type what you want to do, e.g. `go north`, `take the lamp`, `talk to jenkins`.
  look             describe your surroundings
  inventory, i     list what you carry
  status           show progress in the current act
  save <path>      write a save file
  help             show this help
  quit             leave the game";

/// Load a world and print diagnostics to stderr on failure.
fn load_world(dir: &Path) -> Result<Catalog, String> {
    loom_loader::load_path(dir).map_err(|err| {
        let problems = err.integrity_problems().len();
        eprintln!("{:?}", miette::Report::new(err));
        if problems > 0 {
            format!(
                "world failed to load with {problems} integrity problem{}",
                if problems == 1 { "" } else { "s" }
            )
        } else {
            "world failed to load".into()
        }
    })
}

/// Read the engine config, or the defaults if no file is given.
fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    EngineConfig::from_toml_str(&source).map_err(|e| format!("{}: {e}", path.display()))
}

/// Start a session, resuming from `load` if given.
fn open_session(dir: &Path, load: Option<&Path>, config: Option<&Path>) -> Result<GameSession, String> {
    let catalog = Arc::new(load_world(dir)?);
    let config = load_config(config)?;
    let Some(path) = load else {
        return Ok(GameSession::new(catalog, config));
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let save = SaveGame::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))?;
    GameSession::from_save(catalog, config, save)
        .map_err(|e| format!("cannot resume {}: {e}", path.display()))
}

/// Write the session to a save file.
fn write_save(session: &GameSession, path: &Path) -> Result<(), String> {
    let json = session.save().to_json().map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| format!("cannot write {}: {e}", path.display()))
}

/// Commands handled by the front end rather than the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Meta {
    Inventory,
    Status,
    Save(Option<PathBuf>),
    Help,
    Quit,
}

fn parse_meta(line: &str) -> Option<Meta> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    match (word.to_lowercase().as_str(), rest.is_empty()) {
        ("inventory" | "i" | "inv", true) => Some(Meta::Inventory),
        ("status", true) => Some(Meta::Status),
        ("save", _) => Some(Meta::Save((!rest.is_empty()).then(|| PathBuf::from(rest)))),
        ("help" | "?", true) => Some(Meta::Help),
        ("quit" | "exit" | "q", true) => Some(Meta::Quit),
        _ => None,
    }
}

/// Handle a meta command. Returns `false` when the player quits.
fn run_meta(session: &GameSession, meta: Meta) -> Result<bool, String> {
    match meta {
        Meta::Inventory => println!("{}\n", session.inventory_listing()),
        Meta::Status => print_status(session),
        Meta::Save(Some(path)) => {
            write_save(session, &path)?;
            println!("  Saved to {}\n", path.display());
        }
        Meta::Save(None) => println!("  usage: save <path>\n"),
        Meta::Help => println!("{HELP}\n"),
        Meta::Quit => return Ok(false),
    }
    Ok(true)
}

fn print_outcome(outcome: &TurnOutcome) {
    match &outcome.status {
        TurnStatus::Committed => println!("{}", outcome.narration.text),
        TurnStatus::Rejected(rejection) => println!(
            "{} {}",
            outcome.narration.text.yellow(),
            format!("[{}]", rejection.code).dimmed()
        ),
        _ => println!("{}", outcome.narration.text.yellow()),
    }
    if let Some(victory) = &outcome.victory {
        println!("{}", format!("Victory: {victory}").green().bold());
    }
    println!();
}

fn print_status(session: &GameSession) {
    let status = session.status();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Turn".to_string(), status.turn.to_string()]);
    table.add_row(vec!["Location".to_string(), status.location]);
    table.add_row(vec!["Act".to_string(), status.act]);
    let carried = if status.inventory.is_empty() {
        "-".to_string()
    } else {
        status.inventory.join(", ")
    };
    table.add_row(vec!["Carrying".to_string(), carried]);
    if let Some(victory) = status.victory {
        table.add_row(vec!["Victory".to_string(), victory.to_string()]);
    }
    println!("{table}");

    if !status.spokes.is_empty() {
        let mut spokes = Table::new();
        spokes.set_content_arrangement(ContentArrangement::Dynamic);
        spokes.set_header(vec!["Goal", "Done"]);
        for spoke in status.spokes {
            spokes.add_row(vec![spoke.name, if spoke.completed { "yes" } else { "no" }.to_string()]);
        }
        println!("{spokes}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_commands() {
        assert_eq!(parse_meta("i"), Some(Meta::Inventory));
        assert_eq!(parse_meta("  Status "), Some(Meta::Status));
        assert_eq!(parse_meta("save run.json"), Some(Meta::Save(Some(PathBuf::from("run.json")))));
        assert_eq!(parse_meta("save"), Some(Meta::Save(None)));
        assert_eq!(parse_meta("quit"), Some(Meta::Quit));
        assert_eq!(parse_meta("look"), None);
        assert_eq!(parse_meta("inventory of the cellar"), None);
    }
}
