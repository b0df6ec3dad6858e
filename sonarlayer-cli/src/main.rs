//! SonarLayer CLI - Command-line interface
//!
//! Diagnostic driver for the SonarLayer tile pipeline: runs synthetic
//! surveys through a layer, and inspects configuration and the disk cache.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Debug, Parser)]
#[command(name = "sonarlayer")]
#[command(version, about = "Tile cache and generation pipeline for survey layers")]
struct Cli {
    /// Configuration file (default: ~/.sonarlayer/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Feed a synthetic survey track through a tile layer
    Simulate {
        /// Number of pings to generate
        #[arg(long, default_value_t = 2_000)]
        points: usize,

        /// Pings appended between draw passes
        #[arg(long, default_value_t = 50)]
        batch: usize,

        /// Zoom index to draw at
        #[arg(long, default_value_t = 0)]
        zoom: u32,

        /// Concurrent fills (default: from config)
        #[arg(long)]
        workers: Option<usize>,

        /// Use a disk cache in this directory instead of the configured cache
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Write the final composite as a PNG
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Maintain the disk cache
    Cache {
        /// Cache directory (default: from config)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        #[command(subcommand)]
        action: CacheAction,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Simulate {
            points,
            batch,
            zoom,
            workers,
            cache_dir,
            output,
            json,
        } => {
            let runner = CliRunner::new(cli.config.as_deref(), cli.verbose)?;
            commands::simulate::run(
                runner,
                SimulateArgs {
                    points,
                    batch,
                    zoom,
                    workers,
                    cache_dir,
                    output,
                    json,
                },
            )
        }
        Commands::Config { command } => commands::config::run(command, cli.config),
        Commands::Cache { cache_dir, action } => {
            let runner = CliRunner::new(cli.config.as_deref(), cli.verbose)?;
            runner.log_startup("cache");
            commands::cache::run(action, runner.config(), cache_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::parse_from([
            "sonarlayer",
            "simulate",
            "--points",
            "100",
            "--json",
            "--config",
            "/tmp/layer.ini",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/layer.ini")));
        match cli.command {
            Commands::Simulate {
                points, batch, json, ..
            } => {
                assert_eq!(points, 100);
                assert_eq!(batch, 50);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
