//! Builds the backend's application state against the test containers

use anyhow::{Context, Result};
use backend::app::AppState;
use backend::config::{ReactionsConfig, SearchConfig};
use backend::storage::filesystem::FilesystemStore;
use backend::storage::object_store::ObjectStore;
use std::sync::Arc;
use tempfile::TempDir;

use super::TestEnvironment;

/// Application state plus the media directory backing it
pub struct TestApp {
    pub state: AppState,
    // Removed with the app
    _media: TempDir,
}

pub async fn setup_test_app(env: &TestEnvironment) -> Result<TestApp> {
    setup_test_app_with(env, ReactionsConfig::default()).await
}

/// Same as [`setup_test_app`] with custom batching settings
pub async fn setup_test_app_with(env: &TestEnvironment, reactions: ReactionsConfig) -> Result<TestApp> {
    let db = env.database().await?;
    let redis_client = env.redis_client()?;

    let media = TempDir::new().context("Failed to create media directory")?;
    let store = FilesystemStore::new(media.path(), "/media")
        .await
        .context("Failed to open filesystem store")?;

    let state = AppState::new(
        db,
        redis_client,
        Arc::new(store) as Arc<dyn ObjectStore>,
        &reactions,
        SearchConfig { cache_ttl_secs: 60 },
    );
    Ok(TestApp { state, _media: media })
}
