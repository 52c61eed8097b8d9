//! eddy CLI - validate loop node configurations and run messages through them.

mod commands;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use logging::{LoggingConfig, init_logging};

/// eddy - per-message loop nodes for flow-based message graphs.
#[derive(Parser)]
#[command(name = "eddy")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a node YAML file
    Validate {
        /// Path to the node YAML file
        file: String,
    },

    /// Run one message through a node, feeding `continue` straight back
    Run {
        /// Path to the node YAML file
        file: String,

        /// Message payload as JSON
        #[arg(short, long)]
        payload: Option<String>,

        /// Give up after this many activations
        #[arg(short, long, default_value = "10000")]
        max_activations: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LoggingConfig::from_verbosity(cli.verbose))?;

    match cli.command {
        Commands::Validate { file } => commands::validate::run(&file),
        Commands::Run {
            file,
            payload,
            max_activations,
        } => commands::run::run(&file, payload.as_deref(), max_activations).await,
    }
}
