use std::env;
use std::path::PathBuf;
use std::time::Duration;
use dotenv::dotenv;
use serde::Deserialize;
use log::{info, warn};

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub storage: StorageConfig,
    pub reactions: ReactionsConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub name: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub enum StorageBackend {
    Filesystem,
    Http,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "filesystem" | "fs" | "local" => Ok(StorageBackend::Filesystem),
            "http" | "s3" | "r2" => Ok(StorageBackend::Http),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend
    pub path: PathBuf,
    /// Gateway base url for the http backend
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub token: Option<String>,
    /// Base url objects are served from
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionsConfig {
    pub idle_flush_secs: u64,
    pub max_pending: usize,
    pub cache_capacity: usize,
}

impl ReactionsConfig {
    pub fn idle_flush(&self) -> Duration {
        Duration::from_secs(self.idle_flush_secs)
    }
}

impl Default for ReactionsConfig {
    fn default() -> Self {
        Self {
            idle_flush_secs: 300,
            max_pending: 10_000,
            cache_capacity: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub cache_ttl_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(env: &Environment, key: &str, dev_default: &str) -> Result<String, String> {
    match (env, env_opt(key)) {
        (_, Some(value)) => Ok(value),
        (Environment::Production, None) => Err(format!("{} must be set in production", key)),
        (_, None) => Ok(dev_default.to_string()),
    }
}

impl Config {
    fn parse_backend_url(url: &str) -> (String, u16) {
        // BACKEND_URL like "http://localhost:50002"
        if let Ok(parsed_url) = url::Url::parse(url) {
            let host = parsed_url.host_str().unwrap_or("127.0.0.1").to_string();
            let port = parsed_url.port().unwrap_or(50002);
            (host, port)
        } else {
            ("127.0.0.1".to_string(), 50002)
        }
    }

    fn load_env_files() {
        if let Some(env_file_path) = env_opt("ENV_FILE_PATH") {
            info!("Loading environment from ENV_FILE_PATH: {}", env_file_path);
            dotenv::from_filename(&env_file_path).ok();
            return;
        }

        dotenv().ok();
        // .env.<environment> overrides the base file
        let environment_hint = env::var("RUST_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .parse()
            .unwrap_or(Environment::Development);
        let env_file = format!(".env.{:?}", environment_hint).to_lowercase();
        if env_file != ".env.development" {
            let _ = dotenv::from_filename(&env_file);
        }
    }

    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_files();

        let environment = env::var("RUST_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .parse()
            .unwrap_or(Environment::Development);

        info!("Loading configuration for environment: {:?}", environment);

        let config = Config {
            server: Self::load_server_config(&environment),
            database: Self::load_database_config(&environment)?,
            redis: Self::load_redis_config(&environment)?,
            storage: Self::load_storage_config(&environment)?,
            reactions: Self::load_reactions_config(),
            search: SearchConfig {
                cache_ttl_secs: env_or("SEARCH_CACHE_TTL_SECS", 300),
            },
            environment,
        };

        config.validate()?;
        config.log_configuration();

        Ok(config)
    }

    fn load_server_config(env: &Environment) -> ServerConfig {
        let backend_url = env::var("BACKEND_URL")
            .unwrap_or_else(|_| "http://0.0.0.0:50002".to_string());
        let (host, port) = Self::parse_backend_url(&backend_url);
        let default_workers = match env {
            Environment::Production => 8,
            _ => 1,
        };

        ServerConfig {
            // SERVER_HOST takes precedence over the BACKEND_URL host
            host: env::var("SERVER_HOST").unwrap_or(host),
            port: env_or("SERVER_PORT", port),
            workers: env_or("BACKEND_WORKERS", default_workers),
        }
    }

    fn load_database_config(env: &Environment) -> Result<DatabaseConfig, String> {
        let (url, name) = match env {
            Environment::Test => ("http://test-arangodb:8529", "dance_test"),
            _ => ("http://localhost:8529", "dance_dev"),
        };

        Ok(DatabaseConfig {
            url: required(env, "ARANGO_URL", url)?,
            name: required(env, "ARANGO_DB", name)?,
            username: required(env, "ARANGO_USERNAME", "root")?,
            password: required(env, "ARANGO_PASSWORD", "test")?,
        })
    }

    fn load_redis_config(env: &Environment) -> Result<RedisConfig, String> {
        let url = match env {
            Environment::Test => "redis://test-redis:6379/",
            _ => "redis://127.0.0.1/",
        };
        Ok(RedisConfig {
            url: required(env, "REDIS_URL", url)?,
        })
    }

    fn load_storage_config(env: &Environment) -> Result<StorageConfig, String> {
        let backend: StorageBackend = env_opt("STORAGE_BACKEND")
            .map(|raw| raw.parse())
            .transpose()?
            .unwrap_or(StorageBackend::Filesystem);

        let public_url = match env {
            Environment::Production => required(env, "STORAGE_PUBLIC_URL", "")?,
            _ => env_opt("STORAGE_PUBLIC_URL")
                .unwrap_or_else(|| "http://localhost:50002/media".to_string()),
        };

        Ok(StorageConfig {
            backend,
            path: env_opt("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/media")),
            endpoint: env_opt("STORAGE_ENDPOINT"),
            bucket: env_opt("STORAGE_BUCKET"),
            token: env_opt("STORAGE_TOKEN"),
            public_url,
        })
    }

    fn load_reactions_config() -> ReactionsConfig {
        let defaults = ReactionsConfig::default();
        ReactionsConfig {
            idle_flush_secs: env_or("REACTIONS_IDLE_FLUSH_SECS", defaults.idle_flush_secs),
            max_pending: env_or("REACTIONS_MAX_PENDING", defaults.max_pending),
            cache_capacity: env_or("REACTIONS_CACHE_CAPACITY", defaults.cache_capacity),
        }
    }

    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".into());
        }
        if self.database.url.is_empty() {
            return Err("Database url cannot be empty".into());
        }
        if self.redis.url.is_empty() {
            return Err("Redis url cannot be empty".into());
        }
        if self.reactions.idle_flush_secs == 0 {
            return Err("REACTIONS_IDLE_FLUSH_SECS must be greater than 0".into());
        }
        if self.reactions.max_pending == 0 {
            return Err("REACTIONS_MAX_PENDING must be greater than 0".into());
        }
        if self.storage.backend == StorageBackend::Http
            && (self.storage.endpoint.is_none() || self.storage.bucket.is_none())
        {
            return Err("STORAGE_ENDPOINT and STORAGE_BUCKET are required for the http storage backend".into());
        }
        if self.environment == Environment::Production && self.database.password == "test" {
            return Err("Production database password cannot be 'test'".into());
        }

        Ok(())
    }

    fn log_configuration(&self) {
        info!("Configuration loaded successfully");
        info!("Environment: {:?}", self.environment);
        info!("Server: {}:{} (workers: {})", self.server.host, self.server.port, self.server.workers);
        info!("Database: {} at {}", self.database.name, self.database.url);
        info!("Redis: {}", self.redis.url);
        info!("Storage: {:?} (public url: {})", self.storage.backend, self.storage.public_url);
        info!(
            "Reactions: idle flush {}s, max pending {}, cache capacity {}",
            self.reactions.idle_flush_secs, self.reactions.max_pending, self.reactions.cache_capacity
        );

        if self.environment == Environment::Development {
            warn!("Running in development mode - some security features are disabled");
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
