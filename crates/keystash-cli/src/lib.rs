//! Keystash command-line interface.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keystash_core::Config;
use tracing::debug;

/// Keystash - alias-addressed key and secret storage
#[derive(Parser)]
#[command(name = "keystash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = "KEYSTASH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Namespace to operate in (overrides the config file)
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate, inspect and use keys
    Keys(commands::keys::KeysArgs),

    /// Store and read encrypted values
    Values(commands::values::ValuesArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

impl Cli {
    /// Resolve the effective configuration: file (or defaults), then
    /// environment overrides, then command-line flags.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = Config::load(path)?;
                config.apply_env_overrides();
                config
            }
            None => Config::load_or_default()?,
        };
        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        config.validate()?;
        debug!(
            namespace = %config.namespace,
            backend = ?config.backend.kind,
            engine = ?config.engine,
            "loaded configuration"
        );
        Ok(config)
    }
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Keys(args) => commands::keys::run(args, &cli.load_config()?).await,
        Commands::Values(args) => commands::values::run(args, &cli.load_config()?).await,
        Commands::Config(args) => commands::config::run(args, cli.config.as_deref()).await,
        Commands::Version => {
            println!("keystash {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
