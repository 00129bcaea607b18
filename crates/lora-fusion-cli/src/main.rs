//! LoRA Fusion CLI
//!
//! Drives the clause-level fusion engine over the deterministic stub
//! collaborators.
//!
//! # Commands
//!
//! - `fuse`: Segment, route and generate a request end to end
//! - `segment`: Show units, perplexities and clause boundaries
//! - `route`: Show logits, affinity penalties and Sparsegen weights for one clause
//! - `affinity`: Embed a performance matrix and print positions and fusion costs
//!
//! # Exit Codes
//! - 0: Success
//! - 1: Runtime failure
//! - 2: Invalid input or configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod error;

pub use error::{exit_code_for_error, CliExitCode};

/// LoRA Fusion CLI - clause-level dynamic adapter fusion
#[derive(Parser)]
#[command(name = "lora-fusion")]
#[command(version)]
#[command(about = "Clause-level dynamic adapter fusion over stub collaborators")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (TOML)
    #[arg(short, long, env = "LORA_FUSION_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a request through the whole engine
    Fuse(commands::fuse::FuseArgs),
    /// Split text into clauses at perplexity minima
    Segment(commands::segment::SegmentArgs),
    /// Route a single clause to fusion weights
    Route(commands::route::RouteArgs),
    /// Compute task-affinity positions from a performance matrix
    Affinity(commands::affinity::AffinityArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    let outcome = match cli.command {
        Commands::Fuse(args) => commands::fuse::fuse_command(args, config_path).await,
        Commands::Segment(args) => commands::segment::segment_command(args, config_path).await,
        Commands::Route(args) => commands::route::route_command(args, config_path).await,
        Commands::Affinity(args) => commands::affinity::affinity_command(args),
    };

    let code = match outcome {
        Ok(()) => CliExitCode::Success,
        Err(e) => {
            eprintln!("error: {:#}", e);
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code.into());
}
