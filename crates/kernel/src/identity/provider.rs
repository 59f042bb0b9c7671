//! Supported identity providers and their OAuth endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An OAuth identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Discord,
    Google,
    GitHub,
}

/// Static OAuth endpoints and request shape for a provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderEndpoints {
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub profile_url: &'static str,
    /// Secondary endpoint listing the account's email addresses (GitHub only).
    pub emails_url: Option<&'static str>,
    pub scopes: &'static [&'static str],
    /// Extra query parameters appended to the authorization URL.
    pub extra_params: &'static [(&'static str, &'static str)],
}

/// Error returned when parsing an unknown provider name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown identity provider '{0}'")]
pub struct UnknownProvider(pub String);

impl Provider {
    /// Every supported provider, in credential-check order.
    pub const ALL: [Provider; 3] = [Provider::Discord, Provider::GitHub, Provider::Google];

    /// Machine name used in URLs, sessions and the accounts table.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Discord => "discord",
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }

    /// Environment variable names holding the client id and secret.
    pub fn credential_vars(self) -> (&'static str, &'static str) {
        match self {
            Provider::Discord => ("DISCORD_CLIENT_ID", "DISCORD_CLIENT_SECRET"),
            Provider::Google => ("GOOGLE_ID", "GOOGLE_SECRET"),
            Provider::GitHub => ("GITHUB_ID", "GITHUB_SECRET"),
        }
    }

    pub fn endpoints(self) -> ProviderEndpoints {
        match self {
            Provider::Discord => ProviderEndpoints {
                authorize_url: "https://discord.com/api/oauth2/authorize",
                token_url: "https://discord.com/api/oauth2/token",
                profile_url: "https://discord.com/api/users/@me",
                emails_url: None,
                scopes: &["identify", "email"],
                extra_params: &[],
            },
            Provider::Google => ProviderEndpoints {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
                token_url: "https://oauth2.googleapis.com/token",
                profile_url: "https://openidconnect.googleapis.com/v1/userinfo",
                emails_url: None,
                scopes: &["openid", "email", "profile"],
                extra_params: &[("prompt", "consent"), ("access_type", "offline")],
            },
            Provider::GitHub => ProviderEndpoints {
                authorize_url: "https://github.com/login/oauth/authorize",
                token_url: "https://github.com/login/oauth/access_token",
                profile_url: "https://api.github.com/user",
                emails_url: Some("https://api.github.com/user/emails"),
                scopes: &["read:user", "user:email"],
                extra_params: &[],
            },
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discord" => Ok(Provider::Discord),
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::GitHub),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}
