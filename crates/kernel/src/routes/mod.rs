//! HTTP route handlers.

use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod blog;
pub mod editor;
pub mod health;
pub mod helpers;

/// Every application route, without middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(blog::router())
        .merge(editor::router())
        .merge(health::router())
}
