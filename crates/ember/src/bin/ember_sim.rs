//! # ember-sim
//!
//! Headless scenario runner: loads a scenario file, runs it at a fixed step
//! and prints what is alive at the end.
//!
//! ```text
//! ember-sim --scenario data/scenarios/meadow.toml --frames 1200
//! RUST_LOG=ember=debug ember-sim --scenario data/scenarios/meadow.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ember::Scenario;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "ember-sim", about = "Run an Ember scenario headless", version)]
struct Cli {
    /// Scenario file (TOML)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Frames to run, overriding the scenario
    #[arg(short, long)]
    frames: Option<usize>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to install the log subscriber");
    }

    let summary = Scenario::load(&cli.scenario).and_then(|scenario| scenario.run(cli.frames));
    match summary {
        Ok(summary) => {
            print!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}: {}", cli.scenario.display(), e);
            ExitCode::FAILURE
        }
    }
}
