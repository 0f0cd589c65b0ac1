use crate::auth::AuthMiddleware;
use crate::cache::{Cache, RedisCache};
use crate::city::repository::CityRepositoryImpl;
use crate::config::{ReactionsConfig, SearchConfig};
use crate::event::repository::EventRepositoryImpl;
use crate::openapi::ApiDoc;
use crate::reactions::batch::ReactionBatcher;
use crate::reactions::cache::ReactionCache;
use crate::reactions::repository::{ReactionRepository, ReactionRepositoryImpl};
use crate::storage::object_store::ObjectStore;
use crate::tagging::repository::TaggingRepositoryImpl;
use crate::user::repository::UserRepositoryImpl;
use crate::user::session::{RedisSessionStore, SessionStore};
use crate::{event, health, metrics, reactions, search, storage, tagging, tv, user};
use actix_web::web;
use arangors::client::reqwest::ReqwestClient;
use arangors::Database;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Event forms carry base64 images inline
const EVENT_JSON_LIMIT: usize = 25 * 1024 * 1024;
const DEFAULT_JSON_LIMIT: usize = 64 * 1024;

/// Everything handlers pull out of app data
#[derive(Clone)]
pub struct AppState {
    pub db: web::Data<Database<ReqwestClient>>,
    pub redis: web::Data<redis::Client>,
    pub session_store: web::Data<RedisSessionStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub users: web::Data<UserRepositoryImpl>,
    pub cities: web::Data<CityRepositoryImpl>,
    pub events: web::Data<EventRepositoryImpl>,
    pub tagging: web::Data<TaggingRepositoryImpl>,
    pub reactions: web::Data<ReactionRepositoryImpl>,
    pub reaction_cache: web::Data<ReactionCache>,
    pub batcher: web::Data<ReactionBatcher>,
    pub store: web::Data<dyn ObjectStore>,
    pub cache: web::Data<dyn Cache>,
    pub search: web::Data<SearchConfig>,
}

impl AppState {
    /// Build repositories and start the reaction batcher; needs a running Tokio runtime
    pub fn new(
        db: Database<ReqwestClient>,
        redis_client: redis::Client,
        store: Arc<dyn ObjectStore>,
        reactions: &ReactionsConfig,
        search: SearchConfig,
    ) -> Self {
        let session_store = RedisSessionStore {
            client: redis_client.clone(),
        };
        let reaction_repo = ReactionRepositoryImpl::new(db.clone());
        let reaction_cache = ReactionCache::new(reactions.cache_capacity);
        let batcher = ReactionBatcher::spawn(
            Arc::new(reaction_repo.clone()) as Arc<dyn ReactionRepository>,
            reaction_cache.clone(),
            reactions,
        );
        let cache = Arc::new(RedisCache::new(redis_client.clone(), "dance".to_string())) as Arc<dyn Cache>;

        Self {
            users: web::Data::new(UserRepositoryImpl::new(db.clone())),
            cities: web::Data::new(CityRepositoryImpl::new(db.clone())),
            events: web::Data::new(EventRepositoryImpl::new(db.clone())),
            tagging: web::Data::new(TaggingRepositoryImpl::new(db.clone())),
            reactions: web::Data::new(reaction_repo),
            reaction_cache: web::Data::new(reaction_cache),
            batcher: web::Data::new(batcher),
            store: web::Data::from(store),
            cache: web::Data::from(cache),
            search: web::Data::new(search),
            sessions: Arc::new(session_store.clone()),
            session_store: web::Data::new(session_store),
            redis: web::Data::new(redis_client),
            db: web::Data::new(db),
        }
    }

    fn auth(&self) -> AuthMiddleware {
        AuthMiddleware {
            sessions: self.sessions.clone(),
        }
    }
}

/// Mount every route; used by the binary and by integration tests
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(state.db.clone())
        .app_data(state.redis.clone())
        .app_data(state.session_store.clone())
        .app_data(state.users.clone())
        .app_data(state.cities.clone())
        .app_data(state.events.clone())
        .app_data(state.tagging.clone())
        .app_data(state.reactions.clone())
        .app_data(state.reaction_cache.clone())
        .app_data(state.batcher.clone())
        .app_data(state.store.clone())
        .app_data(state.cache.clone())
        .app_data(state.search.clone())
        .app_data(web::JsonConfig::default().limit(DEFAULT_JSON_LIMIT))
        .service(health::health_check)
        .service(health::detailed_health_check)
        .service(health::version_info)
        .service(metrics::metrics_handler)
        .service(storage::controller::media_handler)
        .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .service(
            web::scope("/api/users")
                .service(user::controller::register_handler_prod)
                .service(user::controller::login_handler_prod)
                .service(user::controller::logout_handler_prod)
                .service(
                    web::scope("/me")
                        .wrap(state.auth())
                        .service(user::controller::me_handler_prod),
                )
                .service(
                    web::scope("")
                        .wrap(state.auth())
                        .service(search::controller::search_users_handler),
                ),
        )
        .service(
            web::scope("/api/cities")
                .wrap(state.auth())
                .service(search::controller::search_cities_handler),
        )
        .service(
            web::scope("/api/events")
                .wrap(state.auth())
                .app_data(web::JsonConfig::default().limit(EVENT_JSON_LIMIT))
                .service(event::controller::create_event_handler)
                .service(event::controller::list_events_handler)
                .service(event::controller::my_events_handler)
                .service(event::controller::user_events_handler)
                .service(event::controller::get_event_handler)
                .service(event::controller::update_event_handler)
                .service(event::controller::delete_event_handler)
                .service(event::controller::move_video_handler)
                .service(event::controller::reorder_brackets_handler),
        )
        .service(
            web::scope("/api/tagging")
                .wrap(state.auth())
                .service(tagging::controller::request_tag_handler)
                .service(tagging::controller::my_requests_handler)
                .service(tagging::controller::pending_requests_handler)
                .service(tagging::controller::decide_handler),
        )
        .service(
            web::scope("/api/videos")
                .wrap(state.auth())
                .service(reactions::controller::get_reactions_handler)
                .service(reactions::controller::react_handler),
        )
        .service(
            web::scope("/api/tv")
                .wrap(state.auth())
                .service(tv::controller::tv_sections_handler)
                .service(tv::controller::tv_event_handler),
        );
}
