use crate::error::db_failure;
use arangors::client::reqwest::ReqwestClient;
use arangors::Database;
use chrono::Utc;
use shared::{ReactionSet, Result, VideoReaction};

#[derive(Clone)]
pub struct ReactionRepositoryImpl {
    pub db: Database<ReqwestClient>,
}

impl ReactionRepositoryImpl {
    pub fn new(db: Database<ReqwestClient>) -> Self {
        Self { db }
    }
}

/// One row per (user, video), kept unique by a persistent index
#[async_trait::async_trait]
pub trait ReactionRepository: Send + Sync {
    async fn find(&self, user_id: &str, video_id: &str) -> Result<Option<VideoReaction>>;
    async fn find_by_video(&self, video_id: &str) -> Result<Vec<VideoReaction>>;
    async fn upsert(&self, user_id: &str, video_id: &str, reactions: &ReactionSet) -> Result<()>;
    async fn remove(&self, user_id: &str, video_id: &str) -> Result<()>;
}

#[async_trait::async_trait]
impl ReactionRepository for ReactionRepositoryImpl {
    async fn find(&self, user_id: &str, video_id: &str) -> Result<Option<VideoReaction>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR r IN reaction FILTER r.userId == @user AND r.videoId == @video LIMIT 1 RETURN r",
            )
            .bind_var("user", user_id)
            .bind_var("video", video_id)
            .build();
        let mut rows: Vec<VideoReaction> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to load reaction", e))?;
        Ok(rows.pop())
    }

    async fn find_by_video(&self, video_id: &str) -> Result<Vec<VideoReaction>> {
        let query = arangors::AqlQuery::builder()
            .query("FOR r IN reaction FILTER r.videoId == @video SORT r.userId RETURN r")
            .bind_var("video", video_id)
            .build();
        self.db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to load video reactions", e))
    }

    async fn upsert(&self, user_id: &str, video_id: &str, reactions: &ReactionSet) -> Result<()> {
        let query = arangors::AqlQuery::builder()
            .query(
                "UPSERT { userId: @user, videoId: @video } \
                 INSERT { userId: @user, videoId: @video, reactions: @reactions, updatedAt: @now } \
                 REPLACE { userId: @user, videoId: @video, reactions: @reactions, updatedAt: @now } \
                 IN reaction",
            )
            .bind_var("user", user_id)
            .bind_var("video", video_id)
            .bind_var("reactions", serde_json::to_value(reactions)?)
            .bind_var("now", Utc::now().fixed_offset().to_rfc3339())
            .build();
        let _: Vec<serde_json::Value> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to write reaction", e))?;
        Ok(())
    }

    async fn remove(&self, user_id: &str, video_id: &str) -> Result<()> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR r IN reaction FILTER r.userId == @user AND r.videoId == @video REMOVE r IN reaction",
            )
            .bind_var("user", user_id)
            .bind_var("video", video_id)
            .build();
        let _: Vec<serde_json::Value> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to remove reaction", e))?;
        Ok(())
    }
}
