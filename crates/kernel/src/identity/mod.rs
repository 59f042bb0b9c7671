//! Identity resolution for third-party sign-in.
//!
//! This module provides:
//! - Provider: the supported OAuth identity providers and their endpoints
//! - ProviderProfile: raw provider payloads, one shape per provider
//! - UserIdentity: the normalized identity produced from a profile
//! - RoleMap: the configured admin allow-list used to derive roles
//! - ProviderClient: the authorization-code flow against one provider

mod client;
mod profile;
mod provider;
mod role_map;

pub use client::{ProviderClient, ProviderError, ProviderRegistry, ProviderUrls};
pub use profile::{
    DiscordProfile, GitHubEmail, GitHubProfile, GoogleProfile, IdentityError, ProviderProfile,
    UserIdentity, discord_avatar_url, discord_default_avatar_index, resolve_identity,
};
pub use provider::{Provider, ProviderEndpoints, UnknownProvider};
pub use role_map::{Role, RoleMap};
