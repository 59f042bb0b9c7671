//! Provider profiles and their normalization into a [`UserIdentity`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::provider::Provider;
use super::role_map::{Role, RoleMap};

/// Base URL of Discord's CDN.
const DISCORD_CDN: &str = "https://cdn.discordapp.com";

/// Number of default avatars Discord cycles through.
const DISCORD_DEFAULT_AVATARS: u64 = 5;

/// Errors produced while normalizing a provider profile.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{provider} profile is missing required field '{field}'")]
    MissingField {
        provider: Provider,
        field: &'static str,
    },

    #[error("malformed {provider} profile")]
    Malformed {
        provider: Provider,
        #[source]
        source: serde_json::Error,
    },
}

/// Discord `/users/@me` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    /// Avatar hash; `None` when the user never uploaded one.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Google OpenID Connect userinfo payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleProfile {
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// GitHub `/user` payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubProfile {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Public email; `None` when the user keeps it private.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// One entry of GitHub's `/user/emails` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub verified: bool,
}

impl GitHubProfile {
    /// Fill in a private email from the `/user/emails` listing.
    ///
    /// Only the primary, verified address is accepted.
    pub fn fill_email(&mut self, emails: &[GitHubEmail]) {
        if self.email.as_deref().is_some_and(|e| !e.is_empty()) {
            return;
        }
        self.email = emails
            .iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email.clone());
    }
}

/// A raw profile, tagged with the provider that produced it.
#[derive(Debug, Clone)]
pub enum ProviderProfile {
    Discord(DiscordProfile),
    Google(GoogleProfile),
    GitHub(GitHubProfile),
}

impl ProviderProfile {
    /// Parse a provider's JSON payload into its typed profile.
    pub fn from_json(provider: Provider, value: serde_json::Value) -> Result<Self, IdentityError> {
        let malformed = |source| IdentityError::Malformed { provider, source };
        Ok(match provider {
            Provider::Discord => Self::Discord(serde_json::from_value(value).map_err(malformed)?),
            Provider::Google => Self::Google(serde_json::from_value(value).map_err(malformed)?),
            Provider::GitHub => Self::GitHub(serde_json::from_value(value).map_err(malformed)?),
        })
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::Discord(_) => Provider::Discord,
            Self::Google(_) => Provider::Google,
            Self::GitHub(_) => Provider::GitHub,
        }
    }
}

/// Normalized identity of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub provider: Provider,
    /// Account id at the provider (not the local user id).
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: Role,
}

/// Normalize a provider profile and derive its role.
///
/// The role is recomputed on every call; nothing about it is cached.
pub fn resolve_identity(
    profile: &ProviderProfile,
    roles: &RoleMap,
) -> Result<UserIdentity, IdentityError> {
    let provider = profile.provider();

    let (id, display_name, email, avatar_url) = match profile {
        ProviderProfile::Discord(p) => (
            p.id.clone(),
            p.username.clone(),
            p.email.clone(),
            Some(discord_avatar_url(
                &p.id,
                p.avatar.as_deref(),
                p.discriminator.as_deref(),
            )),
        ),
        ProviderProfile::Google(p) => (
            p.sub.clone(),
            p.name.clone().unwrap_or_default(),
            p.email.clone(),
            p.picture.clone(),
        ),
        ProviderProfile::GitHub(p) => (
            p.id.map(|id| id.to_string()).unwrap_or_default(),
            p.name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| p.login.clone()),
            p.email.clone(),
            p.avatar_url.clone(),
        ),
    };

    if id.is_empty() {
        return Err(IdentityError::MissingField {
            provider,
            field: "id",
        });
    }

    let email = email
        .filter(|e| !e.trim().is_empty())
        .ok_or(IdentityError::MissingField {
            provider,
            field: "email",
        })?;

    let role = roles.role_for(provider, &email);

    Ok(UserIdentity {
        provider,
        id,
        display_name,
        email,
        avatar_url,
        role,
    })
}

/// Index of the default avatar Discord shows for a discriminator.
///
/// Unparsable discriminators (including the "0" of migrated usernames) map
/// to avatar 0.
pub fn discord_default_avatar_index(discriminator: Option<&str>) -> u64 {
    discriminator
        .and_then(|d| d.trim().parse::<u64>().ok())
        .unwrap_or(0)
        % DISCORD_DEFAULT_AVATARS
}

/// CDN URL of a Discord user's avatar.
///
/// Animated avatar hashes carry an `a_` prefix and are served as GIF.
pub fn discord_avatar_url(
    user_id: &str,
    avatar: Option<&str>,
    discriminator: Option<&str>,
) -> String {
    match avatar.filter(|a| !a.is_empty()) {
        None => format!(
            "{DISCORD_CDN}/embed/avatars/{}.png",
            discord_default_avatar_index(discriminator)
        ),
        Some(hash) => {
            let format = if hash.starts_with("a_") { "gif" } else { "png" };
            format!("{DISCORD_CDN}/avatars/{user_id}/{hash}.{format}")
        }
    }
}
