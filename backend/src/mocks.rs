//! In-memory stand-ins for the database, object storage, cache and auth
//! used by the handler and usecase tests.

use crate::cache::Cache;
use crate::city::repository::CityRepository;
use crate::event::repository::{event_id, EventRepository};
use crate::reactions::repository::ReactionRepository;
use crate::storage::object_store::{
    public_url, validate_key, ObjectStore, StorageError, StorageResult, StoredObject,
};
use crate::tagging::repository::TaggingRepository;
use crate::user::repository::UserRepository;
use crate::user::session::SessionUser;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use argon2::{Argon2, PasswordHasher};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures_util::future::{ready, Ready};
use shared::{
    City, Event, EventDate, EventDetails, EventKind, FileUpload, ReactionSet, Result, Role,
    Section, SectionKind, SharedError, TagTarget, TaggedRole, TaggingRequest, TaggingStatus,
    User, Video, VideoReaction,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::Mutex;

pub const TEST_PASSWORD: &str = "password123";

#[derive(Default)]
struct State {
    users: Vec<User>,
    cities: Vec<City>,
    events: BTreeMap<String, Event>,
    edges: Vec<(String, TaggedRole)>,
    tagging: Vec<TaggingRequest>,
    reactions: BTreeMap<(String, String), VideoReaction>,
    sequence: u64,
    fail_event_writes: bool,
    fail_reaction_writes: bool,
    reaction_writes: usize,
}

impl State {
    fn next(&mut self) -> String {
        self.sequence += 1;
        self.sequence.to_string()
    }
}

/// One shared in-memory database implementing every repository trait, so
/// cascades across collections behave like the real thing.
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<State>>,
}

fn newest_first(events: &mut [Event]) {
    events.sort_by(|a, b| {
        b.details
            .first_date()
            .cmp(&a.details.first_date())
            .then_with(|| a.key.cmp(&b.key))
    });
}

fn hash(password: &str) -> String {
    let salt = argon2::password_hash::SaltString::generate(
        &mut argon2::password_hash::rand_core::OsRng,
    );
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

impl MemoryDb {
    pub fn with_cities(cities: Vec<City>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                cities,
                ..Default::default()
            })),
        }
    }

    pub async fn clear_cities(&self) {
        self.state.lock().await.cities.clear();
    }

    /// Stores a user whose password is [`TEST_PASSWORD`]
    pub async fn insert_user(&self, username: &str, email: &str) -> User {
        let mut user = User::new_for_db(
            username.to_string(),
            format!("Dancer {}", username),
            email.to_string(),
            hash(TEST_PASSWORD),
            None,
            Utc::now().fixed_offset(),
        )
        .unwrap();
        user.id = format!("user/{}", username);
        let mut state = self.state.lock().await;
        user.rev = state.next();
        state.users.push(user.clone());
        user
    }

    /// Store an event as-is, bypassing validation
    pub async fn put_event(&self, mut event: Event) {
        let mut state = self.state.lock().await;
        event.rev = state.next();
        state.events.insert(event.id.clone(), event);
    }

    pub async fn event_count(&self) -> usize {
        self.state.lock().await.events.len()
    }

    pub async fn edges_for(&self, event_id: &str) -> Vec<TaggedRole> {
        self.state
            .lock()
            .await
            .edges
            .iter()
            .filter(|(to, _)| to == event_id)
            .map(|(_, role)| role.clone())
            .collect()
    }

    pub async fn fail_event_writes(&self, fail: bool) {
        self.state.lock().await.fail_event_writes = fail;
    }

    pub async fn fail_reaction_writes(&self, fail: bool) {
        self.state.lock().await.fail_reaction_writes = fail;
    }

    /// Upserts and removals that reached the reaction collection
    pub async fn reaction_writes(&self) -> usize {
        self.state.lock().await.reaction_writes
    }

    pub async fn stored_reactions(&self, user_id: &str, video_id: &str) -> Option<ReactionSet> {
        self.state
            .lock()
            .await
            .reactions
            .get(&(user_id.to_string(), video_id.to_string()))
            .map(|r| r.reactions.clone())
    }

    pub async fn tagging_requests(&self) -> Vec<TaggingRequest> {
        self.state.lock().await.tagging.clone()
    }
}

#[async_trait]
impl UserRepository for MemoryDb {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn search(&self, term: &str, limit: usize) -> Result<Vec<User>> {
        let term = term.to_lowercase();
        let state = self.state.lock().await;
        let mut found: Vec<User> = state
            .users
            .iter()
            .filter(|u| {
                u.username.to_lowercase().contains(&term)
                    || u.display_name.to_lowercase().contains(&term)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        found.truncate(limit);
        Ok(found)
    }

    async fn create(&self, mut user: User) -> Result<User> {
        let mut state = self.state.lock().await;
        let key = state.next();
        user.id = format!("user/{}", key);
        user.rev = state.next();
        state.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl CityRepository for MemoryDb {
    async fn find_by_id(&self, id: &str) -> Result<Option<City>> {
        let state = self.state.lock().await;
        Ok(state.cities.iter().find(|c| c.id == id).cloned())
    }

    async fn search_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<City>> {
        let prefix = prefix.to_lowercase();
        let state = self.state.lock().await;
        let mut found: Vec<City> = state
            .cities
            .iter()
            .filter(|c| c.name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.population.cmp(&a.population).then_with(|| a.name.cmp(&b.name)));
        found.truncate(limit);
        Ok(found)
    }

    async fn create(&self, mut city: City) -> Result<City> {
        validator::Validate::validate(&city)?;
        let mut state = self.state.lock().await;
        if city.id.is_empty() {
            city.id = format!("city/{}", state.next());
        }
        state.cities.push(city.clone());
        Ok(city)
    }
}

#[async_trait]
impl EventRepository for MemoryDb {
    async fn find_by_id(&self, id: &str) -> Result<Option<Event>> {
        let state = self.state.lock().await;
        Ok(state.events.get(&event_id(id)).cloned())
    }

    async fn insert(&self, mut event: Event) -> Result<Event> {
        let mut state = self.state.lock().await;
        if state.fail_event_writes {
            return Err(SharedError::Database("event writes disabled".into()));
        }
        if state.events.contains_key(&event.id) {
            return Err(SharedError::Conflict(format!("{} exists", event.id)));
        }
        event.rev = state.next();
        state.events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn replace(&self, mut event: Event) -> Result<Event> {
        let mut state = self.state.lock().await;
        if state.fail_event_writes {
            return Err(SharedError::Database("event writes disabled".into()));
        }
        let current = state
            .events
            .get(&event.id)
            .ok_or_else(|| SharedError::NotFound(format!("Event {} not found", event.id)))?;
        if current.rev != event.rev {
            return Err(SharedError::Conflict("stale revision".into()));
        }
        event.rev = state.next();
        state.events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn delete_cascade(&self, event: &Event) -> Result<()> {
        let videos: Vec<String> = event
            .sections
            .iter()
            .flat_map(|s| s.all_videos())
            .map(|v| v.id.clone())
            .collect();
        let mut state = self.state.lock().await;
        state.events.remove(&event.id);
        state.edges.retain(|(to, _)| to != &event.id);
        state.tagging.retain(|r| r.event_id != event.id);
        state.reactions.retain(|(_, video), _| !videos.contains(video));
        Ok(())
    }

    async fn list(
        &self,
        kind: Option<EventKind>,
        city_id: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .filter(|e| city_id.map_or(true, |c| e.details.city_id.as_deref() == Some(c)))
            .cloned()
            .collect();
        newest_first(&mut events);
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| {
                e.owner_id == user_id
                    || e.team_members.iter().any(|m| m == user_id)
                    || state
                        .edges
                        .iter()
                        .any(|(to, role)| to == &e.id && role.user_id == user_id)
            })
            .cloned()
            .collect();
        newest_first(&mut events);
        Ok(events)
    }

    async fn list_with_videos(&self, offset: usize, limit: usize) -> Result<Vec<Event>> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.sections.iter().any(|s| s.video_count() > 0))
            .cloned()
            .collect();
        newest_first(&mut events);
        Ok(events.into_iter().skip(offset).take(limit).collect())
    }

    async fn add_edges(&self, event_id: &str, roles: &[TaggedRole]) -> Result<()> {
        let mut state = self.state.lock().await;
        for role in roles {
            state.edges.push((event_id.to_string(), role.clone()));
        }
        Ok(())
    }

    async fn remove_edges(&self, event_id: &str, roles: &[TaggedRole]) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .edges
            .retain(|(to, role)| !(to == event_id && roles.contains(role)));
        Ok(())
    }
    async fn missing_users(&self, user_ids: &[String]) -> Result<Vec<String>> {
        let state = self.state.lock().await;
        Ok(user_ids
            .iter()
            .filter(|id| !state.users.iter().any(|u| u.id == **id))
            .cloned()
            .collect())
    }

    async fn find_by_video(&self, video_id: &str) -> Result<Option<Event>> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .values()
            .find(|e| e.find_video(video_id).is_some())
            .cloned())
    }
}

#[async_trait]
impl TaggingRepository for MemoryDb {
    async fn insert(&self, mut request: TaggingRequest) -> Result<TaggingRequest> {
        let mut state = self.state.lock().await;
        request.key = state.next();
        request.id = format!("tagging_request/{}", request.key);
        request.rev = state.next();
        state.tagging.push(request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TaggingRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .tagging
            .iter()
            .find(|r| r.id == id || r.key == id)
            .cloned())
    }

    async fn find_pending_claim(
        &self,
        event_id: &str,
        target: &TagTarget,
        role: Role,
        user_id: &str,
    ) -> Result<Option<TaggingRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .tagging
            .iter()
            .find(|r| {
                r.is_pending()
                    && r.event_id == event_id
                    && &r.target == target
                    && r.role == role
                    && r.user_id == user_id
            })
            .cloned())
    }

    async fn list_pending(&self, event_id: &str) -> Result<Vec<TaggingRequest>> {
        let state = self.state.lock().await;
        let mut found: Vec<TaggingRequest> = state
            .tagging
            .iter()
            .filter(|r| r.event_id == event_id && r.status == TaggingStatus::Pending)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<TaggingRequest>> {
        let state = self.state.lock().await;
        let mut found: Vec<TaggingRequest> = state
            .tagging
            .iter()
            .filter(|r| r.user_id == user_id || r.requested_by == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update(&self, mut request: TaggingRequest) -> Result<TaggingRequest> {
        let mut state = self.state.lock().await;
        let rev = state.next();
        let slot = state
            .tagging
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| SharedError::NotFound(request.id.clone()))?;
        if slot.rev != request.rev {
            return Err(SharedError::Conflict("stale revision".into()));
        }
        request.rev = rev;
        *slot = request.clone();
        Ok(request)
    }
}

#[async_trait]
impl ReactionRepository for MemoryDb {
    async fn find(&self, user_id: &str, video_id: &str) -> Result<Option<VideoReaction>> {
        let state = self.state.lock().await;
        Ok(state
            .reactions
            .get(&(user_id.to_string(), video_id.to_string()))
            .cloned())
    }

    async fn find_by_video(&self, video_id: &str) -> Result<Vec<VideoReaction>> {
        let state = self.state.lock().await;
        Ok(state
            .reactions
            .values()
            .filter(|r| r.video_id == video_id)
            .cloned()
            .collect())
    }

    async fn upsert(&self, user_id: &str, video_id: &str, reactions: &ReactionSet) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_reaction_writes {
            return Err(SharedError::Database("reaction writes disabled".into()));
        }
        state.reaction_writes += 1;
        let key = (user_id.to_string(), video_id.to_string());
        let row = VideoReaction {
            id: String::new(),
            key: String::new(),
            rev: String::new(),
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
            reactions: reactions.clone(),
            updated_at: Utc::now().fixed_offset(),
        };
        state.reactions.insert(key, row);
        Ok(())
    }

    async fn remove(&self, user_id: &str, video_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_reaction_writes {
            return Err(SharedError::Database("reaction writes disabled".into()));
        }
        state.reaction_writes += 1;
        state
            .reactions
            .remove(&(user_id.to_string(), video_id.to_string()));
        Ok(())
    }
}

/// Object store backed by a map; urls point at `http://media.test`
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStore {
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<StoredObject> {
        validate_key(key)?;
        self.objects
            .lock()
            .await
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(StoredObject {
            key: key.to_string(),
            url: public_url("http://media.test", key),
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        self.objects
            .lock()
            .await
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().await.contains_key(key))
    }

    async fn health(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Accepts `n` puts, then fails every following one
pub struct FailingStore {
    pub inner: MemoryStore,
    remaining: AtomicUsize,
}

impl FailingStore {
    pub fn after(n: usize) -> Self {
        Self {
            inner: MemoryStore::default(),
            remaining: AtomicUsize::new(n),
        }
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<StoredObject> {
        let allowed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !allowed {
            return Err(StorageError::Gateway("simulated outage".into()));
        }
        self.inner.put(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn health(&self) -> StorageResult<()> {
        Err(StorageError::Gateway("simulated outage".into()))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Cache that never expires entries
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn set_raw(&self, key: &str, value: String, _ttl: Duration) {
        self.entries.lock().await.insert(key.to_string(), value);
    }

    async fn delete(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

/// Middleware that signs every request in as the given user
#[derive(Clone)]
pub struct InjectUser(pub SessionUser);

impl<S, B> Transform<S, ServiceRequest> for InjectUser
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = InjectUserService<S>;
    type InitError = ();
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(InjectUserService {
            service,
            user: self.0.clone(),
        }))
    }
}

pub struct InjectUserService<S> {
    service: S,
    user: SessionUser,
}

impl<S, B> Service<ServiceRequest> for InjectUserService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        req.extensions_mut().insert(self.user.clone());
        self.service.call(req)
    }
}

pub fn city(id: &str, name: &str, population: u64) -> City {
    City {
        id: id.to_string(),
        rev: String::new(),
        name: name.to_string(),
        region: String::new(),
        country_code: "DE".to_string(),
        population,
        timezone: "Europe/Berlin".to_string(),
    }
}

/// A tiny PNG-labelled upload ("hello")
pub fn png_upload() -> FileUpload {
    FileUpload {
        filename: "photo.png".to_string(),
        content_type: "image/png".to_string(),
        data: "aGVsbG8=".to_string(),
    }
}

pub fn video(id: &str) -> Video {
    Video {
        id: id.to_string(),
        title: format!("Round {}", id),
        src: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        styles: vec![],
        roles: vec![],
    }
}

/// A competition with one flat section `s1` holding videos `v1` and `v2`
pub fn sample_event(key: &str, owner: &str) -> Event {
    let now = Utc::now().fixed_offset();
    Event {
        id: format!("event/{}", key),
        key: key.to_string(),
        rev: String::new(),
        kind: EventKind::Competition,
        owner_id: owner.to_string(),
        team_members: vec![],
        details: EventDetails {
            title: format!("Jam {}", key),
            city_id: None,
            dates: vec![EventDate {
                date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
                start_time: None,
                end_time: None,
            }],
            address: None,
            description: None,
            prices: None,
            schedule: None,
            styles: vec![],
        },
        poster: None,
        gallery: vec![],
        roles: vec![],
        sections: vec![Section {
            id: "s1".to_string(),
            title: "Top 16".to_string(),
            kind: SectionKind::Battle,
            description: None,
            has_brackets: false,
            brackets: vec![],
            videos: vec![video("v1"), video("v2")],
            roles: vec![],
        }],
        created_at: now,
        updated_at: now,
    }
}
