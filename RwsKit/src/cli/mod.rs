//! RwsKit CLI - Command-line interface for RWS containers and stream bundles

pub mod commands;
pub mod progress;

use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "rwskit")]
#[command(version = crate::VERSION)]
#[command(about = "RwsKit: RenderWare audio stream unpacker and repacker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Run the RwsKit CLI
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
