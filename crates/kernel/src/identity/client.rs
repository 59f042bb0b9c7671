//! Authorization-code flow against the identity providers.

use std::collections::HashMap;

use reqwest::header::ACCEPT;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::profile::{GitHubEmail, IdentityError, ProviderProfile};
use super::provider::{Provider, ProviderEndpoints};
use crate::config::{Config, ProviderCredentials, Secret};

/// Errors talking to an identity provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered, but refused the request.
    #[error("{provider} rejected the request: {error}")]
    Rejected { provider: Provider, error: String },

    #[error("request to {provider} failed")]
    Http {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Token endpoint response.
///
/// GitHub reports failures with a 200 status and an `error` field, so both
/// shapes are read from the same struct.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Where a client sends each step of the flow.
///
/// Defaults to the provider's public endpoints. Overridden to point a client
/// at a stand-in server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUrls {
    pub authorize_url: String,
    pub token_url: String,
    pub profile_url: String,
    pub emails_url: Option<String>,
}

impl From<ProviderEndpoints> for ProviderUrls {
    fn from(endpoints: ProviderEndpoints) -> Self {
        Self {
            authorize_url: endpoints.authorize_url.to_string(),
            token_url: endpoints.token_url.to_string(),
            profile_url: endpoints.profile_url.to_string(),
            emails_url: endpoints.emails_url.map(str::to_string),
        }
    }
}

/// OAuth client for one provider.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    provider: Provider,
    client_id: String,
    client_secret: Secret,
    redirect_uri: String,
    urls: ProviderUrls,
}

impl ProviderClient {
    pub fn new(
        provider: Provider,
        credentials: &ProviderCredentials,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            redirect_uri: redirect_uri.into(),
            urls: provider.endpoints().into(),
        }
    }

    /// Send every request of the flow to `urls` instead.
    pub fn with_urls(mut self, urls: ProviderUrls) -> Self {
        self.urls = urls;
        self
    }

    /// URL the browser is sent to in order to start sign-in.
    pub fn authorization_url(&self, state: &str) -> Result<Url, url::ParseError> {
        let endpoints = self.provider.endpoints();
        let scope = endpoints.scopes.join(" ");

        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
        ];
        params.extend_from_slice(endpoints.extra_params);

        Url::parse_with_params(&self.urls.authorize_url, params)
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> Result<String, ProviderError> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response: TokenResponse = http
            .post(&self.urls.token_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|source| self.http_error(source))?
            .json()
            .await
            .map_err(|source| self.http_error(source))?;

        if let Some(error) = response.error {
            let error = match response.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error,
            };
            return Err(ProviderError::Rejected {
                provider: self.provider,
                error,
            });
        }

        response.access_token.ok_or_else(|| ProviderError::Rejected {
            provider: self.provider,
            error: "token response carried no access_token".to_string(),
        })
    }

    /// Fetch the signed-in account's profile.
    ///
    /// For GitHub accounts with a private email, the primary verified address
    /// is looked up from the emails endpoint.
    pub async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        access_token: &str,
    ) -> Result<ProviderProfile, ProviderError> {
        let payload: serde_json::Value = self
            .get_json(http, &self.urls.profile_url, access_token)
            .await?;

        let mut profile = ProviderProfile::from_json(self.provider, payload)?;

        if let (ProviderProfile::GitHub(github), Some(emails_url)) =
            (&mut profile, self.urls.emails_url.as_deref())
        {
            if github.email.as_deref().is_none_or(str::is_empty) {
                debug!(login = %github.login, "GitHub email is private, fetching address list");
                match self
                    .get_json::<Vec<GitHubEmail>>(http, emails_url, access_token)
                    .await
                {
                    Ok(emails) => github.fill_email(&emails),
                    Err(e) => warn!(error = %e, "failed to fetch GitHub email addresses"),
                }
            }
        }

        Ok(profile)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        http: &reqwest::Client,
        url: &str,
        access_token: &str,
    ) -> Result<T, ProviderError> {
        http.get(url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| self.http_error(source))?
            .json()
            .await
            .map_err(|source| self.http_error(source))
    }

    fn http_error(&self, source: reqwest::Error) -> ProviderError {
        ProviderError::Http {
            provider: self.provider,
            source,
        }
    }
}

/// Configured clients, one per provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<Provider, ProviderClient>,
}

impl ProviderRegistry {
    /// Build a client for every provider with configured credentials.
    pub fn from_config(config: &Config) -> Self {
        let clients = config
            .providers
            .iter()
            .map(|(&provider, credentials)| {
                let client =
                    ProviderClient::new(provider, credentials, config.callback_url(provider));
                (provider, client)
            })
            .collect();
        Self { clients }
    }

    /// Register `client`, replacing any client for the same provider.
    pub fn insert(&mut self, client: ProviderClient) {
        self.clients.insert(client.provider, client);
    }

    pub fn get(&self, provider: Provider) -> Option<&ProviderClient> {
        self.clients.get(&provider)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
