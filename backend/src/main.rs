use actix_web::{App, HttpServer};
use backend::app::{configure, AppState};
use backend::config::Config;
use backend::middleware::{cors_middleware, Logger, SecurityHeaders};
use backend::schema::ensure_schema;
use backend::storage::object_store::from_config;
use log::{error, info};
use std::io::{Error, ErrorKind};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(Error::new(ErrorKind::Other, e.to_string()));
        }
    };

    let redis_client = redis::Client::open(config.redis.url.clone()).map_err(|e| {
        error!("Failed to create Redis client: {}", e);
        Error::new(ErrorKind::ConnectionRefused, e.to_string())
    })?;

    let conn = arangors::Connection::establish_basic_auth(
        &config.database.url,
        &config.database.username,
        &config.database.password,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to ArangoDB: {}", e);
        Error::new(ErrorKind::ConnectionRefused, e.to_string())
    })?;

    let db = conn.db(&config.database.name).await.map_err(|e| {
        error!("Failed to open database {}: {}", config.database.name, e);
        Error::new(ErrorKind::NotFound, e.to_string())
    })?;

    ensure_schema(&db).await.map_err(|e| {
        error!("Failed to prepare schema: {}", e);
        Error::new(ErrorKind::Other, e.to_string())
    })?;

    let store = from_config(&config.storage).await.map_err(|e| {
        error!("Failed to set up object storage: {}", e);
        Error::new(ErrorKind::Other, e.to_string())
    })?;

    let state = AppState::new(
        db,
        redis_client,
        store,
        &config.reactions,
        config.search.clone(),
    );
    let batcher = state.batcher.clone();

    info!("Starting server on {}:{}", config.server.host, config.server.port);
    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger)
            .wrap(SecurityHeaders)
            .wrap(cors_middleware())
            .configure(|cfg| configure(cfg, &state))
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await;

    // Reactions still pending in memory are written before exit
    match batcher.shutdown().await {
        Ok(stats) => info!(
            "Flushed reactions on shutdown: {} written, {} removed, {} failed",
            stats.written, stats.removed, stats.failed
        ),
        Err(e) => error!("Failed to flush reactions on shutdown: {}", e),
    }

    result
}
