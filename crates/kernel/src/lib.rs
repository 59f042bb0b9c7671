//! Scrivener blog server.
//!
//! Provider sign-in with role resolution, sanitized rich-text posts, and the
//! JSON API in front of them. The `scrivener` binary runs the server; this
//! library exposes the pieces for integration testing and the API client.

pub mod client;
pub mod config;
pub mod content;
pub mod db;
pub mod editor;
pub mod error;
pub mod identity;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;

use axum::Router;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::service::SignedCookie;
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::warn;

use crate::config::Config;
use crate::state::AppState;

/// Wrap `routes` in the application middleware and bind `state`.
///
/// Layer order (last added = first executed): TraceLayer → CORS → session →
/// routes.
pub fn build_app<S>(
    state: AppState,
    routes: Router<AppState>,
    sessions: SessionManagerLayer<S, SignedCookie>,
) -> Router
where
    S: SessionStore + Clone,
{
    let cors = build_cors_layer(state.config());

    routes
        .layer(sessions)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy from configuration.
///
/// A lone `*` allows any origin without credentials; an explicit origin list
/// allows credentials so the session cookie is sent cross-origin.
pub fn build_cors_layer(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if config.cors_allowed_origins.len() == 1 && config.cors_allowed_origins[0] == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        // Wildcard headers cannot be combined with credentials
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([CONTENT_TYPE, ACCEPT])
            .allow_credentials(true)
    }
}
