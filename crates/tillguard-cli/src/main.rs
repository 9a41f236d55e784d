//! Tillguard - PIN guard for the back-office dashboard

mod config;
mod shell;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use tillguard_core::auth::format_countdown;
use tillguard_core::{
    hash_pin, validate_pin_input, AccessGuard, Argon2Verifier, Clock, GuardConfig, GuardDriver,
    JsonFileStore, SharedRoute, SystemClock, UnlockRecord,
};

use crate::config::CliConfig;

/// Tillguard - PIN-gated access to sensitive dashboard sections
#[derive(Parser)]
#[command(name = "tillguard")]
#[command(about = "Time-gated PIN guard for the back-office dashboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a manager PIN for the config file
    HashPin {
        /// PIN to hash (prompted for if omitted)
        #[arg(long)]
        pin: Option<String>,

        /// Write the hash into the config file
        #[arg(long)]
        save: bool,
    },

    /// Show the persisted temporary unlock, if any
    Status,

    /// Delete the persisted temporary unlock
    Revoke,

    /// Run an interactive guarded session
    Shell {
        /// Section to start on
        #[arg(long, default_value = "/")]
        route: String,
    },
}

fn read_pin_from_stdin() -> anyhow::Result<Zeroizing<String>> {
    print!("PIN: ");
    io::stdout().flush()?;

    let mut line = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut line)?;
    Ok(Zeroizing::new(line.trim().to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tillguard=info,tillguard_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Commands::HashPin { pin, save } => {
            let pin = match pin {
                Some(pin) => Zeroizing::new(pin),
                None => read_pin_from_stdin()?,
            };
            validate_pin_input(&pin, config.guard.pin_length)?;

            let hash = hash_pin(&pin)?;
            if save {
                let path = match cli.config.clone() {
                    Some(path) => path,
                    None => GuardConfig::config_file_path()?,
                };
                config.pin_hash = Some(hash);
                config.save(&path)?;
                info!("PIN hash saved to {:?}", path);
            } else {
                println!("pin_hash = \"{}\"", hash);
            }
        }

        Commands::Status => {
            let store = JsonFileStore::new(config.store_path())?;
            let key = config.guard.unlock_record_key.as_str();

            match UnlockRecord::load(&store, key)? {
                Some(record) => match record.remaining_secs(SystemClock.now_ms()) {
                    Some(remaining) => {
                        println!("\n=== Temporary Unlock ===\n");
                        println!("Remaining: {}", format_countdown(remaining));
                        if let Some(expires_at) = record.expires_at() {
                            println!("Expires:   {}", expires_at.with_timezone(&Local));
                        }
                    }
                    None => println!("Temporary unlock expired (record will be discarded on next start)"),
                },
                None => println!("No temporary unlock active"),
            }
        }

        Commands::Revoke => {
            let store = JsonFileStore::new(config.store_path())?;
            UnlockRecord::clear(&store, &config.guard.unlock_record_key)?;
            println!("Temporary unlock revoked");
        }

        Commands::Shell { route } => {
            let Some(pin_hash) = config.pin_hash.clone() else {
                bail!("No PIN configured. Run 'tillguard hash-pin --save' first.");
            };
            if !route.starts_with('/') {
                bail!("Routes start with '/'");
            }

            let verifier = Argon2Verifier::new(pin_hash)?;
            let store = config.open_store();
            let shared_route = SharedRoute::new(route);

            let guard = AccessGuard::builder(
                Arc::new(verifier),
                store,
                Arc::new(shared_route.clone()),
            )
            .config(config.guard.clone())
            .on_access_granted(|| info!("Access granted"))
            .mount();

            let (handle, task) = GuardDriver::spawn(guard);
            shell::run(handle, shared_route, &config.guard).await?;
            task.await?;
        }
    }

    Ok(())
}
