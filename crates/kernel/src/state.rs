//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use redis::Client as RedisClient;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::editor::EditorConfig;
use crate::identity::{ProviderRegistry, RoleMap};

/// Timeout for calls to identity providers.
const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Application configuration.
    config: Config,

    /// PostgreSQL connection pool.
    db: PgPool,

    /// Redis client, used for health checks.
    redis: RedisClient,

    /// One OAuth client per configured provider.
    providers: ProviderRegistry,

    /// HTTP client for provider token and profile calls.
    http: reqwest::Client,

    editor: EditorConfig,
}

impl AppState {
    /// Create new application state: connect, migrate, and verify Redis.
    pub async fn new(config: &Config) -> Result<Self> {
        // Create PostgreSQL pool
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        // Run migrations
        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        // Create Redis client
        let redis = RedisClient::open(config.redis_url.as_str())
            .context("failed to create Redis client")?;

        let mut conn = redis
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to Redis")?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;

        let state = Self::from_parts(config.clone(), db, redis)?;

        info!(
            providers = state.inner.providers.len(),
            admins = config.role_map.admin_count(),
            "application state initialized"
        );

        Ok(state)
    }

    /// Assemble state from already-created handles. Performs no I/O.
    pub fn from_parts(config: Config, db: PgPool, redis: RedisClient) -> Result<Self> {
        let providers = ProviderRegistry::from_config(&config);
        Self::with_providers(config, db, redis, providers)
    }

    /// Like [`AppState::from_parts`], with an explicit set of provider clients.
    pub fn with_providers(
        config: Config,
        db: PgPool,
        redis: RedisClient,
        providers: ProviderRegistry,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("scrivener/", env!("CARGO_PKG_VERSION")))
            .timeout(PROVIDER_HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                redis,
                providers,
                http,
                editor: EditorConfig::default(),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.inner.providers
    }

    pub fn role_map(&self) -> &RoleMap {
        &self.inner.config.role_map
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    pub fn editor(&self) -> &EditorConfig {
        &self.inner.editor
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }

    /// Check if Redis is healthy.
    pub async fn redis_healthy(&self) -> bool {
        let Ok(mut conn) = self.inner.redis.get_multiplexed_async_connection().await else {
            return false;
        };

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}
