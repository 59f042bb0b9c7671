//! Configuration loaded from environment variables.
//!
//! Provider credentials and the session secret are mandatory: a process
//! missing any of them refuses to start rather than running with sign-in
//! silently broken.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::identity::{Provider, RoleMap};

/// Minimum accepted length of `SESSION_SECRET`, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// A secret string whose `Debug` output is redacted.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// OAuth client credentials for one identity provider.
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: Secret,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Redis connection URL for the session store.
    pub redis_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Public site URL, used to build OAuth callback URLs.
    pub site_url: String,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "lax").
    ///
    /// "strict" drops the session cookie on the provider's redirect back to
    /// the callback, which breaks sign-in.
    pub cookie_same_site: String,

    /// Key material for signing session cookies.
    pub session_secret: Secret,

    /// Per-provider OAuth client credentials.
    pub providers: HashMap<Provider, ProviderCredentials>,

    /// Admin allow-list, loaded from `ROLE_MAP_FILE` when set.
    pub role_map: RoleMap,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Credentials first, in a fixed order, so the error names the first
        // missing variable deterministically.
        let mut providers = HashMap::new();
        for provider in Provider::ALL {
            let (id_key, secret_key) = provider.credential_vars();
            let client_id = required(&lookup, id_key)?;
            let client_secret = Secret::new(required(&lookup, secret_key)?);
            providers.insert(
                provider,
                ProviderCredentials {
                    client_id,
                    client_secret,
                },
            );
        }

        let session_secret = required(&lookup, "SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            bail!("SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes long.");
        }
        let session_secret = Secret::new(session_secret);

        let database_url = required(&lookup, "DATABASE_URL")?;

        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let redis_url = lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let site_url = lookup("SITE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&site_url).context("SITE_URL must be an absolute URL")?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let cookie_same_site = lookup("COOKIE_SAME_SITE")
            .unwrap_or_else(|| "lax".to_string())
            .to_lowercase();

        let role_map = match lookup("ROLE_MAP_FILE").filter(|v| !v.trim().is_empty()) {
            Some(path) => {
                let path = PathBuf::from(path);
                RoleMap::load(&path)
                    .with_context(|| format!("failed to load role map from {}", path.display()))?
            }
            None => {
                warn!("ROLE_MAP_FILE is not set; no account will be granted the admin role");
                RoleMap::default()
            }
        };

        Ok(Self {
            port,
            database_url,
            redis_url,
            database_max_connections,
            site_url,
            cors_allowed_origins,
            cookie_same_site,
            session_secret,
            providers,
            role_map,
        })
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.site_url.starts_with("https://")
    }

    /// OAuth callback URL registered with `provider`.
    pub fn callback_url(&self, provider: Provider) -> String {
        format!("{}/api/auth/callback/{}", self.site_url, provider.as_str())
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("No {key} has been provided."),
    }
}
