mod cache;
mod entities;
mod errors;
mod media;
mod settings;
mod storage;
mod web;
mod wechat;

use crate::cache::TokenCache;
use crate::media::MediaStore;
use crate::web::AppState;
use crate::wechat::ComponentClient;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "steward",
    version,
    about = "WeChat Open Platform administration backend"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(server = ?settings.server, media = ?settings.media, "Loaded configuration");

    // init storage (database, runs migrations)
    let db = storage::init(&settings.database).await?;

    // staging area for local media
    tokio::fs::create_dir_all(&settings.media.root)
        .await
        .into_diagnostic()?;
    let media = MediaStore::new(settings.media.root.clone());

    // shared token cache feeds both the WeChat client and the media routes
    let tokens = TokenCache::new();
    let wechat = ComponentClient::new(tokens.clone());

    let state = AppState {
        settings: Arc::new(settings),
        db,
        wechat,
        media,
        tokens,
    };

    web::serve(state).await?;
    Ok(())
}
