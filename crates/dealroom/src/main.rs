//! Dealroom launcher
//!
//! Two teams negotiate a fixed set of terms from separate terminals:
//! - `dealroom play --team 1` proposes values
//! - `dealroom play --team 2` approves or rejects them
//! - `dealroom relay` forwards live update notifications between them
//!
//! The shared SQLite store is the source of truth; without a relay the
//! sessions still work, with manual refresh.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dealroom_logging::{init_logging, LogConfig};
use dealroom_protocol::Role;
use tracing::error;

mod cli;

use cli::settings::GlobalArgs;

/// Blocking work (the stdin reader) is not waited on past this.
const SHUTDOWN_TIMEOUT_MS: u64 = 500;

#[derive(Parser, Debug)]
#[command(name = "dealroom", about = "Two-team term negotiation over a shared store")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the store and seed the selected game (idempotent)
    Init,

    /// Join a negotiation as Team 1 (proposer) or Team 2 (counterparty)
    Play {
        /// Team number: 1 proposes values, 2 approves them
        #[arg(short, long)]
        team: Role,
    },

    /// Show the shared terms and settlement
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clear all values and approvals of the selected game
    Reset {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },

    /// Run the notification relay until Ctrl-C
    Relay,

    /// Show resolved configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, Commands::Play { .. });
    if let Err(err) = init_logging(LogConfig {
        app_name: "dealroom",
        verbose: cli.verbose,
        interactive,
        log_dir: None,
    }) {
        eprintln!("Warning: failed to initialize logging: {}", err);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run_command(cli));
    runtime.shutdown_timeout(Duration::from_millis(SHUTDOWN_TIMEOUT_MS));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run_command(cli: Cli) -> Result<()> {
    let config = cli.global.resolve()?;

    match cli.command {
        Commands::Init => cli::store::init(&config).await,
        Commands::Play { team } => cli::play::run(&config, team).await,
        Commands::Status { json } => cli::store::status(&config, json).await,
        Commands::Reset { yes } => cli::store::reset(&config, yes).await,
        Commands::Relay => cli::relay::run(&cli.global).await,
        Commands::Config { json } => cli::settings::show(&config, json),
    }
}
