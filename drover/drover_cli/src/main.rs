use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Drover session pool command line interface
///
/// Inspect a driver configuration or exercise a pool of browser sessions.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print the resolved backend and capabilities
    Check {
        /// Path to the configuration file (defaults to $DROVER_CONFIG, then drover.toml)
        #[clap(long)]
        config: Option<PathBuf>,
    },

    /// Run consumers against a session pool, then shut it down
    Run {
        /// Path to the configuration file (defaults to $DROVER_CONFIG, then drover.toml)
        #[clap(long)]
        config: Option<PathBuf>,

        /// Override the pool capacity
        #[clap(long)]
        capacity: Option<usize>,

        /// Number of consumer threads
        #[clap(long, default_value_t = 4)]
        consumers: usize,

        /// How long each consumer holds a session, in milliseconds
        #[clap(long, default_value_t = 50)]
        hold_ms: u64,

        /// Acquire/release rounds per consumer
        #[clap(long, default_value_t = 3)]
        rounds: usize,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Diagnostics go to stderr; stdout carries the JSON reports
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { config } => commands::check::run(config.as_deref()),
        Commands::Run {
            config,
            capacity,
            consumers,
            hold_ms,
            rounds,
        } => commands::run::run(commands::run::RunOptions {
            config,
            capacity,
            consumers,
            hold_ms,
            rounds,
        }),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
