//! # Loci CLI
//!
//! Command-line interface for resolving location patterns.
//!
//! ## Commands
//!
//! - `loci resolve <pattern>...` - List the resources a pattern addresses
//! - `loci match <pattern> <path>...` - Test paths against a pattern
//! - `loci root <pattern>` - Show the search root and sub-pattern of a location
//! - `loci cat <location>` - Print the contents of a single resource
//! - `loci status` - Show the effective configuration
//!
//! ## Example Usage
//!
//! ```bash
//! # All markdown files under META-INF on the class path
//! loci --classpath target/classes --classpath lib/commons.jar resolve 'classpath*:META-INF/*.md'
//!
//! # Entries inside an archive, with sizes
//! loci resolve --stat 'jar:file:/srv/app/lib/commons.jar!/org/**/*.class'
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Loci - resolve location patterns to resources
#[derive(Parser)]
#[command(name = "loci")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Class path entry, searched in order (can be used multiple times)
    #[arg(long = "classpath", global = true, env = "LOCI_CLASSPATH", value_delimiter = ':')]
    class_path: Vec<PathBuf>,

    /// Base directory for relative locations
    #[arg(short, long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the resources each pattern addresses
    Resolve {
        /// Location patterns (e.g. "classpath*:META-INF/*.xml")
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Maximum number of results to show per pattern
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show size and modification time of each resource
        #[arg(short, long)]
        stat: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Test paths against a pattern
    Match {
        /// Pattern to test
        pattern: String,

        /// Paths to test
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Show the search root and sub-pattern of a location
    Root {
        /// Location pattern
        pattern: String,
    },

    /// Print the contents of a single resource
    Cat {
        /// Literal location
        location: String,
    },

    /// Show the effective configuration
    Status,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => loci_core::Config::load_from(path)?,
        None => loci_core::Config::load()?,
    };

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)))
        .init();

    let overrides = app::Overrides {
        base_dir: cli.base_dir,
        class_path: cli.class_path,
    };

    // Execute command
    match cli.command {
        Commands::Resolve {
            patterns,
            limit,
            stat,
            output,
        } => commands::resolve::run(config, overrides, &patterns, limit, stat, output),
        Commands::Match { pattern, paths } => commands::match_cmd::run(config, &pattern, &paths),
        Commands::Root { pattern } => commands::root::run(&pattern),
        Commands::Cat { location } => commands::cat::run(config, overrides, &location),
        Commands::Status => commands::status::run(config, overrides, cli.config.as_deref()),
    }
}
