//! Role derivation from a configured admin allow-list.
//!
//! The map is read from a TOML file of the form:
//!
//! ```toml
//! [admins]
//! discord = ["someone@example.com"]
//! google = ["someone.else@example.com"]
//! github = ["someone.else@example.com"]
//! ```
//!
//! Lists are per provider: the same person may sign in with a different
//! address at each provider, and only the listed address for that provider
//! grants the role.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::provider::Provider;

/// Authorization role of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// On-disk shape of the role map.
#[derive(Debug, Deserialize)]
struct RoleMapFile {
    #[serde(default)]
    admins: HashMap<String, Vec<String>>,
}

/// Per-provider admin allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMap {
    admins: BTreeMap<Provider, BTreeSet<String>>,
}

impl RoleMap {
    /// Build a map from `(provider, email)` pairs.
    pub fn from_admins<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Provider, S)>,
        S: Into<String>,
    {
        let mut admins: BTreeMap<Provider, BTreeSet<String>> = BTreeMap::new();
        for (provider, email) in entries {
            admins.entry(provider).or_default().insert(email.into());
        }
        Self { admins }
    }

    /// Parse a role map from TOML text.
    pub fn from_toml(source: &str) -> Result<Self> {
        let file: RoleMapFile = toml::from_str(source).context("invalid role map TOML")?;

        let mut entries = Vec::new();
        for (name, emails) in file.admins {
            let provider: Provider = name
                .parse()
                .with_context(|| format!("role map lists admins for unknown provider '{name}'"))?;
            entries.extend(emails.into_iter().map(|email| (provider, email)));
        }

        Ok(Self::from_admins(entries))
    }

    /// Load a role map from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&source)
    }

    /// Role granted to `email` signing in through `provider`.
    ///
    /// Matching is exact and case-sensitive.
    pub fn role_for(&self, provider: Provider, email: &str) -> Role {
        let is_admin = self
            .admins
            .get(&provider)
            .is_some_and(|emails| emails.contains(email));

        if is_admin { Role::Admin } else { Role::User }
    }

    /// Number of configured admin entries across all providers.
    pub fn admin_count(&self) -> usize {
        self.admins.values().map(BTreeSet::len).sum()
    }
}
