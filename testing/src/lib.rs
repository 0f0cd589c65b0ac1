//! Integration testing infrastructure using testcontainers-rs
//!
//! Spins up ephemeral ArangoDB and Redis containers for the tests under
//! `tests/`. Containers stop and are removed when the `TestEnvironment` is
//! dropped. Set `USE_TESTCONTAINERS=false` to point at already running
//! services through `ARANGO_URL` and `REDIS_URL` instead.

pub mod app_setup;

use anyhow::{Context, Result};
use arangors::client::reqwest::ReqwestClient;
use arangors::{Connection, Database};
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, GenericImage, ImageExt};

pub const ARANGO_USER: &str = "root";
pub const ARANGO_PASSWORD: &str = "test_password";

/// Route `log` output through the test harness; later calls are no-ops
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Test environment with ArangoDB and Redis
pub struct TestEnvironment {
    arangodb_url: String,
    redis_url: String,
    // Held so the containers live as long as the environment
    _arangodb: Option<ContainerAsync<GenericImage>>,
    _redis: Option<ContainerAsync<GenericImage>>,
}

impl TestEnvironment {
    pub async fn new() -> Result<Self> {
        init_logging();
        let use_testcontainers = std::env::var("USE_TESTCONTAINERS")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        if !use_testcontainers {
            return Ok(Self::from_env_vars());
        }

        let arangodb = GenericImage::new("arangodb", "3.12.5")
            .with_env_var("ARANGO_ROOT_PASSWORD", ARANGO_PASSWORD)
            .start()
            .await
            .context("Failed to start ArangoDB container")?;
        let arangodb_port = arangodb
            .get_host_port_ipv4(8529.tcp())
            .await
            .context("Failed to get ArangoDB container port")?;
        let arangodb_url = format!("http://localhost:{}", arangodb_port);

        let redis = GenericImage::new("redis", "7-alpine")
            .start()
            .await
            .context("Failed to start Redis container")?;
        let redis_port = redis
            .get_host_port_ipv4(6379.tcp())
            .await
            .context("Failed to get Redis container port")?;
        let redis_url = format!("redis://localhost:{}/", redis_port);

        log::info!("Started ArangoDB container at {}", arangodb_url);
        log::info!("Started Redis container at {}", redis_url);

        Ok(Self {
            arangodb_url,
            redis_url,
            _arangodb: Some(arangodb),
            _redis: Some(redis),
        })
    }

    fn from_env_vars() -> Self {
        let arangodb_url =
            std::env::var("ARANGO_URL").unwrap_or_else(|_| "http://localhost:8529".to_string());
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379/".to_string());

        log::info!("Using running services: ArangoDB {}, Redis {}", arangodb_url, redis_url);
        Self {
            arangodb_url,
            redis_url,
            _arangodb: None,
            _redis: None,
        }
    }

    pub fn arangodb_url(&self) -> &str {
        &self.arangodb_url
    }

    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }

    /// Give the containers a moment after their ports open
    pub async fn wait_for_ready(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(())
    }

    async fn connect(&self) -> Result<Connection> {
        let mut attempt = 0u64;
        loop {
            match Connection::establish_basic_auth(&self.arangodb_url, ARANGO_USER, ARANGO_PASSWORD).await {
                Ok(conn) => return Ok(conn),
                Err(e) if attempt < 4 => {
                    attempt += 1;
                    log::warn!("Failed to connect to ArangoDB (attempt {}): {}, retrying...", attempt, e);
                    tokio::time::sleep(Duration::from_millis(500 * attempt)).await;
                }
                Err(e) => return Err(e).context("Failed to connect to ArangoDB after retries"),
            }
        }
    }

    /// A fresh database with every collection and index in place
    pub async fn database(&self) -> Result<Database<ReqwestClient>> {
        self.wait_for_ready().await?;
        let conn = self.connect().await?;

        let name = format!("dance_test_{}", uuid::Uuid::new_v4().simple());
        let db = conn
            .create_database(&name)
            .await
            .with_context(|| format!("Failed to create database {}", name))?;
        backend::schema::ensure_schema(&db)
            .await
            .context("Failed to prepare schema")?;
        Ok(db)
    }

    pub fn redis_client(&self) -> Result<redis::Client> {
        redis::Client::open(self.redis_url.as_str()).context("Failed to create Redis client")
    }
}
