//! tatty - a terminal coding agent

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{config_command, init_command, run_command, RunArgs};

/// Exit status after a user interrupt
const EXIT_INTERRUPTED: i32 = 130;

/// tatty - coding agent for your terminal
#[derive(Parser)]
#[command(name = "tatty")]
#[command(about = "◆ A terminal coding agent with nested sub-agents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent on a task
    Run {
        /// Task for the agent
        #[arg(required_unless_present = "interactive")]
        query: Option<String>,
        /// Working directory
        #[arg(short = 'd', long = "dir")]
        dir: Option<String>,
        /// Iteration budget per agent
        #[arg(short = 'n', long)]
        max_iterations: Option<u32>,
        /// Deepest allowed sub-agent level
        #[arg(long)]
        max_depth: Option<u32>,
        /// Model name
        #[arg(short, long)]
        model: Option<String>,
        /// Config file (default: ~/.tatty/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
        /// Keep asking for tasks until `exit`
        #[arg(short, long)]
        interactive: bool,
    },
    /// Show the effective configuration
    Config {
        /// Config file (default: ~/.tatty/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Create the default config file
    Init,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(matches!(cli.command, Commands::Run { verbose: true, .. }));

    match cli.command {
        Commands::Run {
            query,
            dir,
            max_iterations,
            max_depth,
            model,
            config,
            verbose,
            interactive,
        } => {
            let args = RunArgs {
                query,
                dir,
                max_iterations,
                max_depth,
                model,
                config,
                verbose,
                interactive,
            };
            match run_command(args).await {
                Ok(true) => std::process::exit(EXIT_INTERRUPTED),
                Ok(false) => {}
                Err(e) => {
                    error!("Run failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Config { config } => {
            if let Err(e) = config_command(config).await {
                error!("Config failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Init => {
            if let Err(e) = init_command().await {
                error!("Init failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
