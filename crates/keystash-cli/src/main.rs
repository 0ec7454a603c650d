//! Keystash CLI entry point.

use clap::Parser;
use keystash_cli::{run, Cli};
use keystash_core::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = match cli.verbose {
        0 => env::get_var_or(env::vars::KEYSTASH_LOG, "keystash=info"),
        1 => "keystash=debug".to_string(),
        _ => "keystash=trace".to_string(),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Run the command
    run(cli).await
}
