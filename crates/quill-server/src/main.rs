mod config;

use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use quill_api::assets::AssetStore;
use quill_api::token::TokenKeys;
use quill_api::{AppState, AppStateInner};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quill=debug,quill_api=debug,quill_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and asset storage
    let db = quill_db::Database::open(&config.db_path)?;
    let assets = AssetStore::new(config.asset_dir.clone()).await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenKeys::new(&config.jwt_secret),
        assets,
        page_size: config.page_size,
        secure_cookie: config.secure_cookie,
    });

    let app = quill_api::router(state).layer(TraceLayer::new_for_http());

    info!("Quill listening on {}", config.addr);
    info!("Page size {}, assets in {}", config.page_size, config.asset_dir.display());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            ctrl_c.await.ok();
            info!("Received Ctrl+C, shutting down...");
            return;
        };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
