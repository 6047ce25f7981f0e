//! Command-line interface definitions.

pub mod check;
pub mod ledger;
pub mod output;
pub mod plan;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Seedpool - bootstrap AMM pools and register them with the price oracle.
#[derive(Parser, Debug)]
#[command(name = "seedpool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap every configured pair and write the ledger
    Run(RunArgs),

    /// Show what a run would do, without touching the chain
    Plan(ConfigPathArg),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Summarise a ledger written by a previous run
    Ledger(LedgerArgs),
}

/// Subcommands for `seedpool check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override ledger output path
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Fail pairs that are not registered with the factory instead of creating them
    #[arg(long)]
    pub no_create: bool,

    /// Walk every pair even if it is already bootstrapped
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `ledger` subcommand.
#[derive(Parser, Debug)]
pub struct LedgerArgs {
    /// Path to a ledger JSON file
    pub path: PathBuf,

    /// List every step, not only the terminal state
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "seedpool",
            "run",
            "--config",
            "pools.toml",
            "--no-create",
            "--force",
            "--ledger",
            "out/ledger.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("pools.toml"));
                assert!(args.no_create);
                assert!(args.force);
                assert_eq!(args.ledger, Some(PathBuf::from("out/ledger.json")));
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn config_path_defaults() {
        let cli = Cli::try_parse_from(["seedpool", "check", "config"]).unwrap();
        match cli.command {
            Commands::Check(CheckCommand::Config(args)) => {
                assert_eq!(args.config, PathBuf::from("config.toml"));
            }
            other => panic!("expected check config, got {other:?}"),
        }
    }

    #[test]
    fn ledger_requires_path() {
        assert!(Cli::try_parse_from(["seedpool", "ledger"]).is_err());
        assert!(Cli::try_parse_from(["seedpool", "ledger", "-v", "run.json"]).is_ok());
    }
}
