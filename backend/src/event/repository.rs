use crate::error::db_failure;
use arangors::client::reqwest::ReqwestClient;
use arangors::Database;
use serde_json::json;
use shared::{Event, EventKind, Result, SharedError, TaggedRole};

/// Full document id for a key or id
pub fn event_id(key_or_id: &str) -> String {
    if key_or_id.contains('/') {
        key_or_id.to_string()
    } else {
        format!("event/{}", key_or_id)
    }
}

#[derive(Clone)]
pub struct EventRepositoryImpl {
    pub db: Database<ReqwestClient>,
}

impl EventRepositoryImpl {
    pub fn new(db: Database<ReqwestClient>) -> Self {
        Self { db }
    }
}

/// ArangoDB error number for a `_rev` mismatch
const ERROR_CONFLICT: u16 = 1200;

fn write_failure(context: &str, err: arangors::ClientError) -> SharedError {
    match err {
        arangors::ClientError::Arango(ref e) if e.error_num() == ERROR_CONFLICT => SharedError::Conflict(
            "The event was changed by someone else; reload and try again".to_string(),
        ),
        other => db_failure(context, other),
    }
}

#[async_trait::async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>>;
    /// Insert with a caller-chosen `_key`
    async fn insert(&self, event: Event) -> Result<Event>;
    /// Replace the stored document; fails with `Conflict` when `event.rev` is stale
    async fn replace(&self, event: Event) -> Result<Event>;
    /// Remove the event with its edges, tagging requests and reactions
    async fn delete_cascade(&self, event: &Event) -> Result<()>;
    /// Newest first by first date
    async fn list(
        &self,
        kind: Option<EventKind>,
        city_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Event>>;
    /// Events the user owns, helps run, or is tagged in
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Event>>;
    /// Events holding at least one video, newest first
    async fn list_with_videos(&self, offset: usize, limit: usize) -> Result<Vec<Event>>;
    async fn add_edges(&self, event_id: &str, roles: &[TaggedRole]) -> Result<()>;
    async fn remove_edges(&self, event_id: &str, roles: &[TaggedRole]) -> Result<()>;
    /// The given user ids with no user document behind them
    async fn missing_users(&self, user_ids: &[String]) -> Result<Vec<String>>;
    /// The event holding a video
    async fn find_by_video(&self, video_id: &str) -> Result<Option<Event>>;
}

#[async_trait::async_trait]
impl EventRepository for EventRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>> {
        let query = arangors::AqlQuery::builder()
            .query("FOR e IN event FILTER e._id == @id LIMIT 1 RETURN e")
            .bind_var("id", event_id(id))
            .build();
        let mut events: Vec<Event> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to load event", e))?;
        Ok(events.pop())
    }

    async fn insert(&self, event: Event) -> Result<Event> {
        let mut doc = serde_json::to_value(&event)?;
        if let Some(obj) = doc.as_object_mut() {
            obj.remove("_id");
            obj.remove("_rev");
        }
        let query = arangors::AqlQuery::builder()
            .query("INSERT @doc INTO event RETURN NEW")
            .bind_var("doc", doc)
            .build();
        let mut inserted: Vec<Event> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| write_failure("Failed to create event", e))?;
        inserted
            .pop()
            .ok_or_else(|| SharedError::Database("No document returned after creation".to_string()))
    }

    async fn replace(&self, event: Event) -> Result<Event> {
        let doc = serde_json::to_value(&event)?;
        let query = arangors::AqlQuery::builder()
            .query("REPLACE @doc IN event OPTIONS { ignoreRevs: false } RETURN NEW")
            .bind_var("doc", doc)
            .build();
        let mut replaced: Vec<Event> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| write_failure("Failed to update event", e))?;
        replaced
            .pop()
            .ok_or_else(|| SharedError::NotFound(format!("Event {} not found", event.id)))
    }

    async fn delete_cascade(&self, event: &Event) -> Result<()> {
        let videos: Vec<String> = event
            .sections
            .iter()
            .flat_map(|s| s.all_videos())
            .map(|v| v.id.clone())
            .collect();
        let query = arangors::AqlQuery::builder()
            .query(
                "LET edges = (FOR t IN tagged FILTER t._to == @event REMOVE t IN tagged RETURN 1) \
                 LET requests = (FOR r IN tagging_request FILTER r.eventId == @event REMOVE r IN tagging_request RETURN 1) \
                 LET reactions = (FOR r IN reaction FILTER r.videoId IN @videos REMOVE r IN reaction RETURN 1) \
                 REMOVE { _key: @key } IN event \
                 RETURN { edges: LENGTH(edges), requests: LENGTH(requests), reactions: LENGTH(reactions) }",
            )
            .bind_var("event", event.id.as_str())
            .bind_var("key", event.key.as_str())
            .bind_var("videos", videos)
            .build();
        let removed: Vec<serde_json::Value> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| write_failure("Failed to delete event", e))?;
        log::info!("Deleted {} with {:?}", event.id, removed.first());
        Ok(())
    }

    async fn list(
        &self,
        kind: Option<EventKind>,
        city_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR e IN event \
                 FILTER @kind == null OR e.kind == @kind \
                 FILTER @city == null OR e.details.cityId == @city \
                 SORT MIN(e.details.dates[*].date) DESC, e._key ASC \
                 LIMIT @offset, @limit \
                 RETURN e",
            )
            .bind_var("kind", json!(kind))
            .bind_var("city", json!(city_id))
            .bind_var("offset", offset)
            .bind_var("limit", limit)
            .build();
        self.db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to list events", e))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Event>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "LET owned = (FOR e IN event FILTER e.ownerId == @user OR @user IN e.teamMembers RETURN e) \
                 LET credited = (FOR e IN 1..1 OUTBOUND @user tagged RETURN e) \
                 FOR e IN UNION_DISTINCT(owned, credited) \
                 SORT MIN(e.details.dates[*].date) DESC, e._key ASC \
                 RETURN e",
            )
            .bind_var("user", user_id)
            .build();
        self.db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to list user events", e))
    }

    async fn list_with_videos(&self, offset: usize, limit: usize) -> Result<Vec<Event>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR e IN event \
                 FILTER LENGTH(FOR s IN e.sections FILTER LENGTH(s.videos) > 0 OR LENGTH(s.brackets[* FILTER LENGTH(CURRENT.videos) > 0]) > 0 RETURN 1) > 0 \
                 SORT MIN(e.details.dates[*].date) DESC, e._key ASC \
                 LIMIT @offset, @limit \
                 RETURN e",
            )
            .bind_var("offset", offset)
            .bind_var("limit", limit)
            .build();
        self.db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to list events with videos", e))
    }

    async fn add_edges(&self, event_id: &str, roles: &[TaggedRole]) -> Result<()> {
        if roles.is_empty() {
            return Ok(());
        }
        let query = arangors::AqlQuery::builder()
            .query("FOR r IN @added INSERT MERGE(r, { _from: r.userId, _to: @event }) INTO tagged")
            .bind_var("added", serde_json::to_value(roles)?)
            .bind_var("event", event_id)
            .build();
        let _: Vec<serde_json::Value> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to add tagged edges", e))?;
        Ok(())
    }

    async fn remove_edges(&self, event_id: &str, roles: &[TaggedRole]) -> Result<()> {
        if roles.is_empty() {
            return Ok(());
        }
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR r IN @removed \
                 FOR t IN tagged \
                 FILTER t._to == @event AND t._from == r.userId AND t.role == r.role \
                    AND t.scope == r.scope AND t.sectionId == r.sectionId AND t.videoId == r.videoId \
                 REMOVE t IN tagged",
            )
            .bind_var("removed", serde_json::to_value(roles)?)
            .bind_var("event", event_id)
            .build();
        let _: Vec<serde_json::Value> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to remove tagged edges", e))?;
        Ok(())
    }

    async fn missing_users(&self, user_ids: &[String]) -> Result<Vec<String>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = arangors::AqlQuery::builder()
            .query("FOR id IN @ids FILTER DOCUMENT(id) == null RETURN id")
            .bind_var("ids", json!(user_ids))
            .build();
        self.db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to look up users", e))
    }

    async fn find_by_video(&self, video_id: &str) -> Result<Option<Event>> {
        let query = arangors::AqlQuery::builder()
            .query(
                "FOR e IN event \
                 FILTER @video IN FLATTEN(e.sections[*].videos[*].id) \
                    OR @video IN FLATTEN(e.sections[*].brackets[*].videos[*].id, 2) \
                 LIMIT 1 \
                 RETURN e",
            )
            .bind_var("video", video_id)
            .build();
        let mut events: Vec<Event> = self
            .db
            .aql_query(query)
            .await
            .map_err(|e| db_failure("Failed to find event by video", e))?;
        Ok(events.pop())
    }
}
