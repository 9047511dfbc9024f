//! deckhand — operator tools for source identities and the name cache.
//!
//! # Usage
//!
//! ```text
//! deckhand parse "github.com/acme/app,1.2.3,svc/api"
//! deckhand image-name "github.com/acme/app 1.2.3"
//! deckhand labels "github.com/acme/app 1.2.3+abc123"
//! deckhand --config deckhand.toml cache insert "github.com/acme/app 1.2.3" acme/app:1.2.3
//! deckhand --config deckhand.toml cache canonical acme/app:latest
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deckhand_core::DeckhandConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

const DEFAULT_LOG_FILTER: &str = "info,deckhand=debug";

#[derive(Parser)]
#[command(
    name = "deckhand",
    about = "Deckhand — source identities and the image name cache",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Configuration file (TOML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a source location or source version and print its parts as JSON.
    Parse {
        /// e.g. "github.com/acme/app,1.2.3,svc/api" or "github.com/acme/app,svc/api"
        name: String,
    },
    /// Print the Docker image name for a source version.
    ImageName { source_version: String },
    /// Print the Docker labels for a source version as JSON.
    Labels { source_version: String },
    /// Operate on the configured name cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Record an image name for a source version.
    Insert {
        source_version: String,
        image: String,
        /// Registry etag to store alongside the name.
        #[arg(long, default_value = "")]
        etag: String,
    },
    /// Print the canonical name of a cached image.
    Canonical { image: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = DeckhandConfig::load(cli.config.as_deref())?;
    init_tracing(&config)?;
    debug!(config = ?cli.config, "configuration loaded");

    let output = match cli.command {
        Command::Parse { name } => commands::identity::parse(&name)?,
        Command::ImageName { source_version } => commands::identity::image_name(&source_version)?,
        Command::Labels { source_version } => commands::identity::labels(&source_version)?,
        Command::Cache { action } => {
            let cache = commands::cache::open(&config.name_cache).await?;
            match action {
                CacheAction::Insert {
                    source_version,
                    image,
                    etag,
                } => commands::cache::insert(&cache, &source_version, &image, &etag).await?,
                CacheAction::Canonical { image } => {
                    commands::cache::canonical(&cache, &image).await?
                }
            }
        }
    };

    println!("{output}");
    Ok(())
}

/// `RUST_LOG` wins, then the configured filter, then the default.
fn init_tracing(config: &DeckhandConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))?,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    Ok(())
}
