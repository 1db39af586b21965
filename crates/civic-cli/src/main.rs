//! # civic CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use civic_cli::catalog::{run_migrate, run_seed, MigrateArgs, SeedArgs};
use civic_cli::reference::{run_ref, RefArgs};

/// Civic services operator CLI.
///
/// Seeds the document type catalog, runs one-off data migrations, and
/// inspects reference codes. Storage commands read `DATABASE_URL`.
#[derive(Parser, Debug)]
#[command(name = "civic", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upsert the document type catalog (never deletes).
    Seed(SeedArgs),

    /// One-off data migrations.
    Migrate(MigrateArgs),

    /// Reference code utilities.
    #[command(name = "ref")]
    Reference(RefArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match &cli.command {
        Commands::Seed(args) => run_seed(args).await,
        Commands::Migrate(args) => run_migrate(args).await,
        Commands::Reference(args) => run_ref(args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
