use crate::storage::object_store::ObjectStore;
use actix_web::{get, web, HttpResponse, Responder};
use arangors::client::reqwest::ReqwestClient;
use arangors::Database;
use serde::Serialize;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::time::timeout;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: &'static str,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        timestamp: unix_now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct ServiceHealthStatus {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_time_ms: Option<u64>,
}

impl ServiceHealthStatus {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            message: None,
            response_time_ms: None,
        }
    }

    fn unhealthy(message: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            message: Some(message),
            response_time_ms: None,
        }
    }

    fn with_response_time(mut self, started: Instant) -> Self {
        self.response_time_ms = Some(started.elapsed().as_millis() as u64);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

async fn check_database(db: &Database<ReqwestClient>) -> ServiceHealthStatus {
    let start = Instant::now();
    match timeout(PROBE_TIMEOUT, db.info()).await {
        Ok(Ok(_)) => ServiceHealthStatus::healthy().with_response_time(start),
        Ok(Err(e)) => ServiceHealthStatus::unhealthy(format!("Database query failed: {}", e)),
        Err(_) => ServiceHealthStatus::unhealthy("Database connection timeout".to_string()),
    }
}

async fn check_redis(redis_client: &redis::Client) -> ServiceHealthStatus {
    let start = Instant::now();
    match timeout(PROBE_TIMEOUT, async {
        let mut conn = redis_client.get_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await
    })
    .await
    {
        Ok(Ok(_)) => ServiceHealthStatus::healthy().with_response_time(start),
        Ok(Err(e)) => ServiceHealthStatus::unhealthy(format!("Redis connection failed: {}", e)),
        Err(_) => ServiceHealthStatus::unhealthy("Redis connection timeout".to_string()),
    }
}

pub async fn check_storage(store: &dyn ObjectStore) -> ServiceHealthStatus {
    let start = Instant::now();
    match timeout(PROBE_TIMEOUT, store.health()).await {
        Ok(Ok(())) => ServiceHealthStatus::healthy().with_response_time(start),
        Ok(Err(e)) => ServiceHealthStatus::unhealthy(format!(
            "Object storage ({}) failed: {}",
            store.backend_name(),
            e
        )),
        Err(_) => ServiceHealthStatus::unhealthy("Object storage timeout".to_string()),
    }
}

#[derive(Serialize)]
struct ServicesHealth {
    database: ServiceHealthStatus,
    redis: ServiceHealthStatus,
    storage: ServiceHealthStatus,
}

#[derive(Serialize)]
struct DetailedHealthResponse {
    status: &'static str,
    timestamp: u64,
    version: &'static str,
    services: ServicesHealth,
}

#[utoipa::path(
    get,
    path = "/health/detailed",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies are healthy"),
        (status = 503, description = "One or more dependencies are unhealthy")
    )
)]
#[get("/health/detailed")]
pub async fn detailed_health_check(
    db: web::Data<Database<ReqwestClient>>,
    redis_client: web::Data<redis::Client>,
    store: web::Data<dyn ObjectStore>,
) -> impl Responder {
    let (database, redis, storage) = tokio::join!(
        check_database(db.get_ref()),
        check_redis(redis_client.get_ref()),
        check_storage(store.get_ref())
    );

    let healthy = database.is_healthy() && redis.is_healthy() && storage.is_healthy();
    let response = DetailedHealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        timestamp: unix_now(),
        version: env!("CARGO_PKG_VERSION"),
        services: ServicesHealth {
            database,
            redis,
            storage,
        },
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VersionInfo {
    pub version: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    pub environment: String,
}

#[utoipa::path(
    get,
    path = "/api/version",
    tag = "version",
    responses(
        (status = 200, description = "Version information", body = VersionInfo)
    )
)]
#[get("/api/version")]
pub async fn version_info() -> impl Responder {
    HttpResponse::Ok().json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        build_date: option_env!("BUILD_DATE").map(|s| s.to_string()),
        git_commit: option_env!("GIT_COMMIT").map(|s| s.to_string()),
        environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    })
}
