//! habit-push binary.

use mimalloc::MiMalloc;

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use habit_push::commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "habit-push")]
#[command(version = VERSION)]
#[command(about = "Sends Web Push habit reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP trigger
    Serve,
    /// Run the reminder job once and print the report
    Send {
        /// Send a test notification to every subscription
        #[arg(long)]
        test: bool,
    },
    /// Generate a VAPID key pair
    Keygen,
}

fn main() -> Result<()> {
    // stdout carries command output; logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen => commands::keygen::run(),
        Commands::Serve => runtime()?.block_on(commands::serve::run()),
        Commands::Send { test } => runtime()?.block_on(commands::send::run(test)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")
}
