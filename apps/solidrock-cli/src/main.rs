//! solidrock - Command-line triggers for the Solidrock sync engine
//!
//! This CLI enables operators to:
//! - Reconcile remote churches and jobs into the local store
//! - Re-fetch and rewrite every existing local entry
//! - Run the worker with periodic syncs as a long-lived process
//! - Validate configuration without touching the network

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod commands;
mod error;
mod logging;

use commands::GlobalArgs;
use error::CliResult;

/// solidrock - Solidrock church and job synchronization
#[derive(Parser)]
#[command(name = "solidrock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log filter directive, overridden by RUST_LOG
    #[arg(long, env = "SOLIDROCK_LOG", default_value = logging::DEFAULT_FILTER, global = true)]
    log_filter: String,

    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile remote records into local entries and execute the work
    Sync(commands::sync::SyncArgs),

    /// Re-fetch and rewrite every existing local entry
    Update(commands::update::UpdateArgs),

    /// Run the worker and periodic syncs until interrupted
    Work(commands::work::WorkArgs),

    /// Validate settings without touching the network
    CheckConfig(commands::check_config::CheckConfigArgs),
}

/// Load variables from an env file into the process environment.
///
/// Reads `path` when given, otherwise `.env` in the working directory or a
/// parent. Variables already set keep their value.
fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

#[tokio::main]
async fn main() {
    let env_path = std::env::var_os("SOLIDROCK_ENV_FILE").map(PathBuf::from);
    let env_file = load_env_file(env_path.as_deref());

    let cli = Cli::parse();
    logging::init_logging(&cli.log_filter);
    if let Some(path) = env_file {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Sync(args) => commands::sync::execute(&cli.global, args).await,
        Commands::Update(args) => commands::update::execute(&cli.global, args).await,
        Commands::Work(args) => commands::work::execute(&cli.global, args).await,
        Commands::CheckConfig(args) => commands::check_config::execute(args),
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
    fn test_parse_sync_plan_only() {
        let cli = Cli::try_parse_from(["solidrock", "sync", "churches", "--plan-only"]).unwrap();
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.collection, commands::CollectionArg::Churches);
                assert!(args.plan_only);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_parse_global_store_after_subcommand() {
        let cli =
            Cli::try_parse_from(["solidrock", "update", "jobs", "--store", "/tmp/s.json"]).unwrap();
        assert_eq!(cli.global.store, std::path::PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn test_env_file_feeds_arguments_without_overriding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solidrock.env");
        std::fs::write(
            &path,
            "SOLIDROCK_STORE=/tmp/from-env-file.json\nSOLIDROCK_CLI_TEST_PRESET=file\n",
        )
        .unwrap();
        std::env::set_var("SOLIDROCK_CLI_TEST_PRESET", "process");

        assert_eq!(load_env_file(Some(&path)), Some(path.clone()));

        let cli = Cli::try_parse_from(["solidrock", "check-config"]).unwrap();
        assert_eq!(cli.global.store, PathBuf::from("/tmp/from-env-file.json"));
        assert_eq!(
            std::env::var("SOLIDROCK_CLI_TEST_PRESET").unwrap(),
            "process"
        );
    }

    #[test]
    fn test_missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_env_file(Some(&dir.path().join("absent.env"))), None);
    }
}
