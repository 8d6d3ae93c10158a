use std::path::Path;

use colored::Colorize;

/// Script lines worth running: blank lines and `#` comments are skipped.
fn script_lines(source: &str) -> impl Iterator<Item = &str> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

pub async fn run(
    script: &Path,
    dir: &Path,
    load: Option<&Path>,
    save: Option<&Path>,
    config: Option<&Path>,
) -> Result<(), String> {
    let source = std::fs::read_to_string(script)
        .map_err(|e| format!("cannot read {}: {e}", script.display()))?;
    let mut session = super::open_session(dir, load, config)?;

    let mut rejected = 0;
    for line in script_lines(&source) {
        println!("{}", format!("> {line}").bold());
        if let Some(meta) = super::parse_meta(line) {
            if super::run_meta(&session, meta)? {
                continue;
            }
            break;
        }
        let outcome = session.turn(line).await.map_err(|e| e.to_string())?;
        if !outcome.is_committed() {
            rejected += 1;
        }
        super::print_outcome(&outcome);
    }

    println!(
        "  {} turns, {} not committed",
        session.state().turn(),
        rejected
    );

    if let Some(path) = save {
        super::write_save(&session, path)?;
        println!("  Saved to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blanks_are_skipped() {
        let script = "# opening\nnorth\n\n   take lamp  \n#east\n";
        assert_eq!(script_lines(script).collect::<Vec<_>>(), ["north", "take lamp"]);
    }
}
