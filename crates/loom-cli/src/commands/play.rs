use std::io::Write;
use std::path::Path;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(dir: &Path, load: Option<&Path>, config: Option<&Path>) -> Result<(), String> {
    let mut session = super::open_session(dir, load, config)?;

    let title = session.catalog().info().title.clone();
    println!("  {} {}", "Playing".bold(), title);
    println!("  {}\n", "Type `help` for commands.".dimmed());
    println!("{}\n", session.describe_here());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().map_err(|e| e.to_string())?;

        let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(meta) = super::parse_meta(line) {
            if super::run_meta(&session, meta)? {
                continue;
            }
            break;
        }

        let outcome = session.turn(line).await.map_err(|e| e.to_string())?;
        super::print_outcome(&outcome);
        if outcome.victory.is_some() {
            println!("  {}", "The story is complete.".bold());
            break;
        }
    }

    Ok(())
}
