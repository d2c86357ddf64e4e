use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use oldreader_sync::config::Config;
use oldreader_sync::source::{migrate_subscription, ReaderSource};
use oldreader_sync::storage::{Database, DatabaseError};
use oldreader_sync::sync::{sync_all, NewItemCount, SyncOptions};

/// Get the config directory path (~/.config/oldreader-sync/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("oldreader-sync"))
}

#[derive(Parser, Debug)]
#[command(
    name = "oldreader-sync",
    about = "Sync read state of TheOldReader subscriptions into a local store"
)]
struct Args {
    /// Config file (default: ~/.config/oldreader-sync/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    /// Delete items whose ids did not come from TheOldReader before syncing
    #[arg(long)]
    migrate: bool,

    /// Print the sync summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config '{}'", config_path.display()))?;

    let db_path = match &config.database_path {
        Some(path) => {
            let path = PathBuf::from(path);
            if path.is_absolute() {
                path
            } else {
                config_dir.join(path)
            }
        }
        None => config_dir.join("oldreader-sync.db"),
    };

    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        eprintln!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: Another instance of oldreader-sync appears to be running. Please close it and try again.");
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    let subscriptions = config.subscriptions();
    if subscriptions.is_empty() {
        eprintln!(
            "Warning: No valid subscriptions in {}",
            config_path.display()
        );
    }
    db.sync_subscriptions(&subscriptions)
        .await
        .context("Failed to sync subscriptions")?;

    if args.migrate {
        let mut removed = 0;
        for sub in db.get_subscriptions().await? {
            removed += migrate_subscription(&db, sub.id)
                .await
                .with_context(|| format!("Failed to migrate '{}'", sub.source))?;
        }
        eprintln!("Migration removed {} items.", removed);
    }

    let source = ReaderSource::from_config(&config);
    let options = SyncOptions::from_config(&config);
    let client = reqwest::Client::builder()
        .user_agent(concat!("oldreader-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let counter = NewItemCount::new();

    let summary = sync_all(&db, &client, &source, &counter, &options)
        .await
        .context("Sync failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if summary.login_required {
        eprintln!(
            "Not logged in: set auth_token in {} or the THEOLDREADER_AUTH_TOKEN environment variable.",
            config_path.display()
        );
    } else {
        println!(
            "Synced {} subscriptions ({} failed, {} skipped), {} read-state changes.",
            summary.synced, summary.failed, summary.skipped, summary.changed
        );
    }

    if summary.login_required {
        std::process::exit(2);
    }
    Ok(())
}
