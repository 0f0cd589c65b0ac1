use crate::error::ApiError;
use crate::event::repository::{EventRepository, EventRepositoryImpl};
use crate::reactions::batch::ReactionBatcher;
use crate::reactions::cache::{Lookup, ReactionCache};
use crate::reactions::repository::{ReactionRepository, ReactionRepositoryImpl};
use crate::user::session::SessionUser;
use actix_web::{get, put, web, HttpResponse};
use log::debug;
use shared::{ReactRequest, ReactionSet, VideoReactionsDto};
use std::collections::BTreeMap;
use validator::Validate;

/// Stored rows overlaid with sets the batcher has not written yet
async fn video_reactions<R: ReactionRepository>(
    video_id: &str,
    viewer: &str,
    repo: &R,
    cache: &ReactionCache,
    batcher: &ReactionBatcher,
) -> Result<VideoReactionsDto, ApiError> {
    // Pending first: a flush landing in between is then covered by the stored rows
    let pending = batcher.pending_for(video_id).await?;
    let rows = match cache.get(video_id).await {
        Lookup::Hit(rows) => rows,
        Lookup::Miss { generation } => {
            let rows = repo.find_by_video(video_id).await?;
            cache.put(video_id, rows.clone(), generation).await;
            rows
        }
    };

    let mut sets: BTreeMap<String, ReactionSet> = rows
        .into_iter()
        .map(|row| (row.user_id, row.reactions))
        .collect();
    for (user_id, set) in pending {
        sets.insert(user_id, set);
    }
    Ok(VideoReactionsDto::assemble(video_id, viewer, sets.into_iter().collect()))
}

pub async fn get_reactions_handler_impl<R: ReactionRepository + 'static>(
    user: SessionUser,
    path: web::Path<String>,
    repo: web::Data<R>,
    cache: web::Data<ReactionCache>,
    batcher: web::Data<ReactionBatcher>,
) -> Result<HttpResponse, ApiError> {
    let video_id = path.into_inner();
    let dto = video_reactions(&video_id, &user.user_id, repo.get_ref(), &cache, &batcher).await?;
    Ok(HttpResponse::Ok().json(dto))
}

#[get("/{video_id}/reactions")]
pub async fn get_reactions_handler(
    user: SessionUser,
    path: web::Path<String>,
    repo: web::Data<ReactionRepositoryImpl>,
    cache: web::Data<ReactionCache>,
    batcher: web::Data<ReactionBatcher>,
) -> Result<HttpResponse, ApiError> {
    get_reactions_handler_impl(user, path, repo, cache, batcher).await
}

pub async fn react_handler_impl<R: ReactionRepository + 'static, E: EventRepository + 'static>(
    user: SessionUser,
    path: web::Path<String>,
    body: web::Json<ReactRequest>,
    repo: web::Data<R>,
    events: web::Data<E>,
    cache: web::Data<ReactionCache>,
    batcher: web::Data<ReactionBatcher>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    let video_id = path.into_inner();
    let request = body.into_inner();

    if events.find_by_video(&video_id).await?.is_none() {
        return Err(ApiError::not_found(&format!("Video {} not found", video_id)));
    }

    batcher
        .enqueue(&user.user_id, &video_id, request.kind, request.timestamp)
        .await?;
    debug!("{} reacted {} on {}", user.user_id, request.kind, video_id);

    let dto = video_reactions(&video_id, &user.user_id, repo.get_ref(), &cache, &batcher).await?;
    Ok(HttpResponse::Ok().json(dto))
}

#[utoipa::path(
    put,
    path = "/api/videos/{video_id}/reactions",
    tag = "reactions",
    params(("video_id" = String, Path, description = "Video id")),
    responses(
        (status = 200, description = "Reactions on the video including the pending change"),
        (status = 400, description = "Timestamp out of range", body = ApiError),
        (status = 404, description = "No event holds this video", body = ApiError)
    )
)]
#[put("/{video_id}/reactions")]
pub async fn react_handler(
    user: SessionUser,
    path: web::Path<String>,
    body: web::Json<ReactRequest>,
    repo: web::Data<ReactionRepositoryImpl>,
    events: web::Data<EventRepositoryImpl>,
    cache: web::Data<ReactionCache>,
    batcher: web::Data<ReactionBatcher>,
) -> Result<HttpResponse, ApiError> {
    react_handler_impl(user, path, body, repo, events, cache, batcher).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReactionsConfig;
    use crate::mocks::{sample_event, InjectUser, MemoryDb};
    use actix_web::{test, App};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shared::{ReactionKind, VideoReaction};
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Reads rows, then holds them until released
    #[derive(Clone)]
    struct GatedRepo {
        db: MemoryDb,
        loaded: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl ReactionRepository for GatedRepo {
        async fn find(&self, user_id: &str, video_id: &str) -> shared::Result<Option<VideoReaction>> {
            ReactionRepository::find(&self.db, user_id, video_id).await
        }

        async fn find_by_video(&self, video_id: &str) -> shared::Result<Vec<VideoReaction>> {
            let rows = ReactionRepository::find_by_video(&self.db, video_id).await?;
            self.loaded.notify_one();
            self.release.notified().await;
            Ok(rows)
        }

        async fn upsert(&self, user_id: &str, video_id: &str, reactions: &ReactionSet) -> shared::Result<()> {
            ReactionRepository::upsert(&self.db, user_id, video_id, reactions).await
        }

        async fn remove(&self, user_id: &str, video_id: &str) -> shared::Result<()> {
            ReactionRepository::remove(&self.db, user_id, video_id).await
        }
    }

    /// A database whose only event holds videos `v1` and `v2`
    async fn db_with_videos() -> MemoryDb {
        let db = MemoryDb::default();
        db.put_event(sample_event("e1", "user/owner")).await;
        db
    }

    fn batcher(db: &MemoryDb, cache: &ReactionCache) -> ReactionBatcher {
        ReactionBatcher::spawn(
            Arc::new(db.clone()),
            cache.clone(),
            &ReactionsConfig::default(),
        )
    }

    macro_rules! app {
        ($db:expr, $cache:expr, $batcher:expr, $user:expr) => {
            test::init_service(
                App::new()
                    .wrap(InjectUser(SessionUser::new($user, false)))
                    .app_data(web::Data::new($db.clone()))
                    .app_data(web::Data::new($cache.clone()))
                    .app_data(web::Data::new($batcher.clone()))
                    .route(
                        "/videos/{video_id}/reactions",
                        web::get().to(get_reactions_handler_impl::<MemoryDb>),
                    )
                    .route(
                        "/videos/{video_id}/reactions",
                        web::put().to(react_handler_impl::<MemoryDb, MemoryDb>),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn pending_reactions_are_visible_before_flush() {
        let db = db_with_videos().await;
        let cache = ReactionCache::new(10);
        let batcher = batcher(&db, &cache);
        ReactionRepository::upsert(
            &db,
            "user/other",
            "v1",
            &ReactionSet {
                clap: Some(3.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let app = app!(db, cache, batcher, "user/me");
        let req = test::TestRequest::put()
            .uri("/videos/v1/reactions")
            .set_json(json!({ "kind": "fire", "timestamp": 42.5 }))
            .to_request();
        let dto: VideoReactionsDto = test::call_and_read_body_json(&app, req).await;

        assert_eq!(dto.mine.fire, Some(42.5));
        assert_eq!(dto.others.len(), 1);
        assert_eq!(dto.totals[&ReactionKind::Fire], 1);
        assert_eq!(dto.totals[&ReactionKind::Clap], 1);
        assert_eq!(db.stored_reactions("user/me", "v1").await, None);
    }

    #[actix_web::test]
    async fn clearing_a_reaction_hides_it() {
        let db = db_with_videos().await;
        let cache = ReactionCache::new(10);
        let batcher = batcher(&db, &cache);
        let app = app!(db, cache, batcher, "user/me");

        for body in [json!({ "kind": "wow", "timestamp": 1.0 }), json!({ "kind": "wow", "timestamp": null })] {
            let req = test::TestRequest::put()
                .uri("/videos/v1/reactions")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }

        let req = test::TestRequest::get().uri("/videos/v1/reactions").to_request();
        let dto: VideoReactionsDto = test::call_and_read_body_json(&app, req).await;
        assert!(dto.mine.is_empty());
        assert_eq!(dto.totals[&ReactionKind::Wow], 0);
    }

    #[actix_web::test]
    async fn out_of_range_timestamp_is_rejected() {
        let db = db_with_videos().await;
        let cache = ReactionCache::new(10);
        let batcher = batcher(&db, &cache);
        let app = app!(db, cache, batcher, "user/me");

        let req = test::TestRequest::put()
            .uri("/videos/v1/reactions")
            .set_json(json!({ "kind": "laugh", "timestamp": -3.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn unknown_video_is_404() {
        let db = db_with_videos().await;
        let cache = ReactionCache::new(10);
        let batcher = batcher(&db, &cache);
        let app = app!(db, cache, batcher, "user/me");

        let req = test::TestRequest::put()
            .uri("/videos/deleted/reactions")
            .set_json(json!({ "kind": "fire", "timestamp": 3.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);

        let stats = batcher.flush_now().await.unwrap();
        assert_eq!(stats.written, 0);
        assert_eq!(db.stored_reactions("user/me", "deleted").await, None);
    }

    #[actix_web::test]
    async fn stored_rows_are_cached_until_invalidated() {
        let db = db_with_videos().await;
        let cache = ReactionCache::new(10);
        let batcher = batcher(&db, &cache);
        let app = app!(db, cache, batcher, "user/me");
        let clap = ReactionSet {
            clap: Some(8.0),
            ..Default::default()
        };

        let req = test::TestRequest::get().uri("/videos/v2/reactions").to_request();
        let dto: VideoReactionsDto = test::call_and_read_body_json(&app, req).await;
        assert!(dto.others.is_empty());
        assert_eq!(cache.len().await, 1);

        ReactionRepository::upsert(&db, "user/other", "v2", &clap).await.unwrap();
        let req = test::TestRequest::get().uri("/videos/v2/reactions").to_request();
        let dto: VideoReactionsDto = test::call_and_read_body_json(&app, req).await;
        assert!(dto.others.is_empty());

        cache.invalidate(&["v2".to_string()]).await;
        let req = test::TestRequest::get().uri("/videos/v2/reactions").to_request();
        let dto: VideoReactionsDto = test::call_and_read_body_json(&app, req).await;
        assert_eq!(dto.others.len(), 1);
        assert_eq!(dto.totals[&ReactionKind::Clap], 1);
    }

    #[actix_web::test]
    async fn flush_during_a_read_does_not_cache_old_rows() {
        let db = db_with_videos().await;
        let cache = ReactionCache::new(10);
        let batcher = batcher(&db, &cache);
        batcher
            .enqueue("user/fan", "v1", ReactionKind::Fire, Some(1.0))
            .await
            .unwrap();

        let gated = GatedRepo {
            db: db.clone(),
            loaded: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        let read = {
            let (gated, cache, batcher) = (gated.clone(), cache.clone(), batcher.clone());
            tokio::spawn(async move {
                video_reactions("v1", "user/me", &gated, &cache, &batcher).await
            })
        };

        gated.loaded.notified().await;
        assert_eq!(batcher.flush_now().await.unwrap().written, 1);
        gated.release.notify_one();

        let first = read.await.unwrap().unwrap();
        assert_eq!(first.totals[&ReactionKind::Fire], 1);

        let later = video_reactions("v1", "user/me", &db, &cache, &batcher).await.unwrap();
        assert_eq!(later.totals[&ReactionKind::Fire], 1);
    }
}
