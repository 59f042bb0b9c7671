//! Session management using Redis.
//!
//! Session cookies are signed with a key derived from `SESSION_SECRET`.

use anyhow::{Context, Result};
use fred::prelude::*;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_redis_store::RedisStore;

use crate::config::Secret;

/// Default session expiry (30 days of inactivity).
pub const DEFAULT_SESSION_EXPIRY_DAYS: i64 = 30;

/// Parse the configured SameSite policy, defaulting to `Lax`.
pub fn parse_same_site(value: &str) -> SameSite {
    match value {
        "strict" => SameSite::Strict,
        "none" => SameSite::None,
        _ => SameSite::Lax,
    }
}

/// Derive the 64-byte cookie signing key from the configured secret.
pub fn signing_key(secret: &Secret) -> Key {
    let digest = Sha512::digest(secret.expose().as_bytes());
    Key::from(digest.as_slice())
}

/// Wrap any session store in the application's cookie policy.
pub fn session_layer<S: SessionStore>(
    store: S,
    same_site: SameSite,
    secure: bool,
    secret: &Secret,
) -> SessionManagerLayer<S, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_secure(secure)
        .with_http_only(true)
        .with_same_site(same_site)
        .with_expiry(Expiry::OnInactivity(Duration::days(
            DEFAULT_SESSION_EXPIRY_DAYS,
        )))
        .with_signed(signing_key(secret))
}

/// Create the session layer using Redis as the backend.
pub async fn create_session_layer(
    redis_url: &str,
    same_site: SameSite,
    secure: bool,
    secret: &Secret,
) -> Result<SessionManagerLayer<RedisStore<Pool>, SignedCookie>> {
    let config = Config::from_url(redis_url).context("failed to parse Redis URL")?;

    let pool = Builder::from_config(config)
        .build_pool(1)
        .context("failed to create Redis pool")?;

    pool.init()
        .await
        .context("failed to connect to Redis for sessions")?;

    Ok(session_layer(
        RedisStore::new(pool),
        same_site,
        secure,
        secret,
    ))
}
