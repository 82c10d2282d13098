use std::sync::Arc;

use tracing::error;

use quill_db::Database;

use crate::assets::AssetStore;
use crate::error::{ApiError, ApiResult};
use crate::token::TokenKeys;

pub type AppState = Arc<AppStateInner>;

/// Handles built once at startup and shared by every handler.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenKeys,
    pub assets: AssetStore,
    pub page_size: u32,
    pub secure_cookie: bool,
}

/// Run a blocking DB closure off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
        .map_err(ApiError::Internal)
}
