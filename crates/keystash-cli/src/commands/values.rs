//! Encrypted value commands.
//!
//! Provides `keystash values set|get|refresh|remove` over the hybrid value
//! store of the configured namespace.

use clap::Args;
use keystash_core::Config;
use keystash_keystore::HybridStore;

/// Values command arguments.
#[derive(Args)]
pub struct ValuesArgs {
    #[command(subcommand)]
    pub command: ValuesCommand,
}

#[derive(clap::Subcommand)]
pub enum ValuesCommand {
    /// Encrypt and store a value
    Set {
        /// Value key
        key: String,

        /// Value to store
        value: String,
    },

    /// Print a decrypted value
    Get {
        /// Value key
        key: String,
    },

    /// Replace an existing value
    Refresh {
        /// Value key
        key: String,

        /// New value
        value: String,
    },

    /// Remove an existing value
    Remove {
        /// Value key
        key: String,
    },
}

/// Run the values command.
pub async fn run(args: &ValuesArgs, config: &Config) -> anyhow::Result<()> {
    let store = HybridStore::open(config).await?;

    match &args.command {
        ValuesCommand::Set { key, value } => {
            store.safeguard(key, value.as_str()).await?.wait().await?;
            println!("Value '{}' stored.", key);
        }

        ValuesCommand::Get { key } => match store.withdraw(key).await? {
            Some(value) => println!("{}", value.expose_secret()),
            None => anyhow::bail!("Value '{}' not found", key),
        },

        ValuesCommand::Refresh { key, value } => {
            store.refresh(key, value.as_str()).await?.wait().await?;
            println!("Value '{}' updated.", key);
        }

        ValuesCommand::Remove { key } => {
            store.remove(key).await?;
            println!("Value '{}' removed.", key);
        }
    }

    store.shutdown().await?;
    Ok(())
}
