//! Ticket machine CLI
//!
//! Issues and validates transit tickets on virtual MIFARE Ultralight C cards kept
//! as JSON memory images.

use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod utils;

use commands::*;

#[derive(Debug, Parser)]
#[command(version, about = "Ticket machine for Ultralight C transit cards")]
struct Cli {
    /// Card image to operate on
    #[arg(short, long, global = true, default_value = "card.json")]
    tag: PathBuf,

    /// Configuration file (defaults to ~/.nxm/ticket.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug level output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Blank { uid, force } => blank_command(&cli.tag, uid.as_deref(), force),
        Commands::Issue { rides } => issue_command(&cli.tag, &config, rides),
        Commands::Use => use_command(&cli.tag, &config),
        Commands::Inspect => inspect_command(&cli.tag, &config),
        Commands::Dump => dump_command(&cli.tag),
        Commands::Config => config_command(&config),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .init();
}
