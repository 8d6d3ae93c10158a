//! CLI frontend for the Storyloom game engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "loom",
    about = "Storyloom - play and check authored story worlds",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log pipeline decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a world and report integrity problems
    Check {
        /// World directory or document (default: current directory)
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Play a world interactively
    Play {
        /// World directory or document
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Resume from a save file
        #[arg(short, long)]
        load: Option<PathBuf>,

        /// Engine config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run actions from a script, one per line
    Replay {
        /// Script file; blank lines and `#` comments are skipped
        #[arg(short, long)]
        script: PathBuf,

        /// World directory or document
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Resume from a save file
        #[arg(short, long)]
        load: Option<PathBuf>,

        /// Write the final state to this file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Engine config (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { dir } => commands::check::run(&dir),
        Commands::Play { dir, load, config } => {
            commands::play::run(&dir, load.as_deref(), config.as_deref()).await
        }
        Commands::Replay {
            script,
            dir,
            load,
            save,
            config,
        } => {
            commands::replay::run(
                &script,
                &dir,
                load.as_deref(),
                save.as_deref(),
                config.as_deref(),
            )
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
