use crate::error::db_failure;
use arangors::client::reqwest::ReqwestClient;
use arangors::document::options::InsertOptions;
use arangors::Database;
use shared::models::tagging::TAGGING_COLLECTION;
use shared::{Result, Role, SharedError, TagTarget, TaggingRequest};

#[derive(Clone)]
pub struct TaggingRepositoryImpl {
    pub db: Database<ReqwestClient>,
}

impl TaggingRepositoryImpl {
    pub fn new(db: Database<ReqwestClient>) -> Self {
        Self { db }
    }

    async fn many(&self, query: arangors::AqlQuery<'_>, context: &str) -> Result<Vec<TaggingRequest>> {
        self.db.aql_query(query).await.map_err(|e| db_failure(context, e))
    }
}

#[async_trait::async_trait]
pub trait TaggingRepository: Send + Sync {
    async fn insert(&self, request: TaggingRequest) -> Result<TaggingRequest>;
    async fn find_by_id(&self, id: &str) -> Result<Option<TaggingRequest>>;
    /// A pending request for the same event, target, role and user
    async fn find_pending_claim(
        &self,
        event_id: &str,
        target: &TagTarget,
        role: Role,
        user_id: &str,
    ) -> Result<Option<TaggingRequest>>;
    async fn list_pending(&self, event_id: &str) -> Result<Vec<TaggingRequest>>;
    /// Requests about the user or made by them, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<TaggingRequest>>;
    /// Replace a request; fails with `Conflict` when `request.rev` is stale
    async fn update(&self, request: TaggingRequest) -> Result<TaggingRequest>;
}

#[async_trait::async_trait]
impl TaggingRepository for TaggingRepositoryImpl {
    async fn insert(&self, request: TaggingRequest) -> Result<TaggingRequest> {
        let collection = self
            .db
            .collection(TAGGING_COLLECTION)
            .await
            .map_err(|e| db_failure("Failed to get tagging collection", e))?;
        let result = collection
            .create_document(request, InsertOptions::builder().return_new(true).build())
            .await
            .map_err(|e| db_failure("Failed to create tagging request", e))?;
        result
            .new_doc()
            .cloned()
            .ok_or_else(|| SharedError::Database("No document returned after creation".to_string()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TaggingRequest>> {
        let id = if id.contains('/') {
            id.to_string()
        } else {
            format!("{}/{}", TAGGING_COLLECTION, id)
        };
        let query = arangors::AqlQuery::builder()
            .query("FOR r IN tagging_request FILTER r._id == @id LIMIT 1 RETURN r")
            .bind_var("id", id)
            .build();
        Ok(self.many(query, "Failed to load tagging request").await?.pop())
    }

    async fn find_pending_claim(
        &self,
        event_id: &str,
        target: &TagTarget,
        role: Role,
        user_id: &str,
    ) -> Result<Option<TaggingRequest>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR r IN tagging_request \
                 FILTER r.eventId == @event AND r.userId == @user AND r.role == @role \
                    AND r.target == @target AND r.status == 'pending' \
                 LIMIT 1 RETURN r",
            )
            .bind_var("event", event_id)
            .bind_var("user", user_id)
            .bind_var("role", serde_json::to_value(role)?)
            .bind_var("target", serde_json::to_value(target)?)
            .build();
        Ok(self.many(query, "Failed to look up tagging request").await?.pop())
    }

    async fn list_pending(&self, event_id: &str) -> Result<Vec<TaggingRequest>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR r IN tagging_request \
                 FILTER r.eventId == @event AND r.status == 'pending' \
                 SORT r.createdAt ASC \
                 RETURN r",
            )
            .bind_var("event", event_id)
            .build();
        self.many(query, "Failed to list pending tagging requests").await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<TaggingRequest>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR r IN tagging_request \
                 FILTER r.userId == @user OR r.requestedBy == @user \
                 SORT r.createdAt DESC \
                 RETURN r",
            )
            .bind_var("user", user_id)
            .build();
        self.many(query, "Failed to list tagging requests").await
    }

    async fn update(&self, request: TaggingRequest) -> Result<TaggingRequest> {
        let query = arangors::AqlQuery::builder()
            .query("REPLACE @doc IN tagging_request OPTIONS { ignoreRevs: false } RETURN NEW")
            .bind_var("doc", serde_json::to_value(&request)?)
            .build();
        let mut updated: Vec<TaggingRequest> = self.db.aql_query(query).await.map_err(|e| {
            let message = e.to_string();
            if message.to_lowercase().contains("conflict") {
                SharedError::Conflict("The request was decided concurrently".to_string())
            } else {
                db_failure("Failed to update tagging request", message)
            }
        })?;
        updated
            .pop()
            .ok_or_else(|| SharedError::NotFound(format!("Tagging request {} not found", request.id)))
    }
}
