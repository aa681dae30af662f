//! depwalk CLI - Dependency graphs from the command line.
//!
//! Resolves a Python file or notebook and prints the units it depends on,
//! the problems found on the way, or the cycles among them.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Request, RootKind};

/// depwalk: Dependency graph resolver for Python files and notebooks.
#[derive(Parser)]
#[command(name = "depwalk")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to the nearest .depwalk.yaml above the root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// How to load the root
    #[arg(long = "as", value_enum, default_value_t = RootKind::Auto, global = true)]
    kind: RootKind,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every unit the root depends on
    Graph {
        /// Root file or notebook
        root: PathBuf,

        /// Emit JSON instead of a tree
        #[arg(long)]
        json: bool,
    },

    /// List resolution problems; exits non-zero if there are any
    Problems {
        /// Root file or notebook
        root: PathBuf,
    },

    /// Detect circular dependencies
    Cycles {
        /// Root file or notebook
        root: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = match &cli.command {
        Commands::Graph { root, .. } | Commands::Problems { root } | Commands::Cycles { root } => {
            root
        }
    };
    let request = Request {
        root,
        config: cli.config.as_deref(),
        kind: cli.kind,
    };

    let result = match &cli.command {
        Commands::Graph { json, .. } => cli::graph::run(&request, *json).map(|()| true),
        Commands::Problems { .. } => cli::problems::run(&request),
        Commands::Cycles { .. } => cli::cycles::run(&request).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
