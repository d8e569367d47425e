//! Calico charm hook runner
//!
//! Invoked once per hook by the orchestration framework, usually through a
//! symlink named after the hook. Resolves contexts from current relation
//! state, rewrites the config files whose content changed, and restarts
//! their services.

mod actions;
mod config;
mod error;
mod generators;
mod handlers;
mod hook;
mod registry;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use error::Result;
use hook::HookKind;

#[derive(Parser)]
#[command(name = "calico-hook", about = "Run one Calico charm hook")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Hook name to run (e.g. `config-changed`)
    hook: String,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // A test harness may have installed one already.
        tracing::debug!("Tracing subscriber already set");
    }

    match HookKind::parse(&cli.hook) {
        Some(kind) => handlers::execute(kind),
        None => {
            tracing::warn!(hook = %cli.hook, "Unknown hook, skipping");
            Ok(())
        }
    }
}
