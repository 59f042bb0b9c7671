#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] drives the real router, middleware and state. Sessions live
//! in an in-memory store and the database pool connects lazily, so routes
//! that never reach the database run without any backing services.
//! Tests that need PostgreSQL read `TEST_DATABASE_URL` and are `#[ignore]`d
//! by default.

#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::extract::Json;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use axum::routing::post;
use axum::{Router, response::IntoResponse};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session};
use uuid::Uuid;

use scrivener_kernel::build_app;
use scrivener_kernel::config::Config;
use scrivener_kernel::identity::{ProviderRegistry, Role};
use scrivener_kernel::routes::helpers::{SessionUser, establish_session};
use scrivener_kernel::session::{parse_same_site, session_layer};
use scrivener_kernel::state::AppState;
use scrivener_test_utils::test_env;

/// Test-only route that signs the posted user in.
const TEST_LOGIN_PATH: &str = "/__test/login";

async fn test_login(session: Session, Json(user): Json<SessionUser>) -> impl IntoResponse {
    establish_session(&session, &user)
        .await
        .expect("failed to establish test session");
    StatusCode::NO_CONTENT
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// App with no reachable database or Redis.
    pub fn new() -> Self {
        Self::with_env(test_env(), None)
    }

    /// App whose sign-in flow talks to `providers` instead of the real ones.
    pub fn with_providers(providers: ProviderRegistry) -> Self {
        Self::with_env(test_env(), Some(providers))
    }

    /// App against the database named by `TEST_DATABASE_URL`, migrated.
    pub async fn with_database() -> Self {
        Self::migrated(None, None).await
    }

    /// [`TestApp::with_database`] with stand-in provider clients and the
    /// shipped role map.
    pub async fn with_database_and_providers(providers: ProviderRegistry) -> Self {
        let roles = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/roles.toml");
        Self::migrated(Some(providers), Some(roles)).await
    }

    async fn migrated(providers: Option<ProviderRegistry>, role_map: Option<&str>) -> Self {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let mut env = test_env();
        env.insert("DATABASE_URL".to_string(), url);
        if let Some(path) = role_map {
            env.insert("ROLE_MAP_FILE".to_string(), path.to_string());
        }

        let app = Self::with_env(env, providers);
        scrivener_kernel::db::run_migrations(app.state.db())
            .await
            .expect("failed to run migrations");
        app
    }

    fn with_env(
        env: std::collections::HashMap<String, String>,
        providers: Option<ProviderRegistry>,
    ) -> Self {
        let config = Config::from_lookup(|key| env.get(key).cloned()).expect("invalid test config");

        let db = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(&config.database_url)
            .expect("invalid database URL");
        let redis =
            redis::Client::open(config.redis_url.as_str()).expect("invalid Redis URL");

        let sessions = session_layer(
            MemoryStore::default(),
            parse_same_site(&config.cookie_same_site),
            config.secure_cookies(),
            &config.session_secret,
        );

        let state = match providers {
            Some(providers) => AppState::with_providers(config, db, redis, providers),
            None => AppState::from_parts(config, db, redis),
        }
        .expect("failed to build state");

        let routes =
            scrivener_kernel::routes::router().route(TEST_LOGIN_PATH, post(test_login));
        let router = build_app(state.clone(), routes, sessions);

        Self { router, state }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a request with cookies from a previous response.
    pub async fn request_with_cookies(
        &self,
        mut request: Request<Body>,
        cookies: &str,
    ) -> Response {
        if !cookies.is_empty() {
            request.headers_mut().insert(
                header::COOKIE,
                cookies.parse().expect("Invalid cookie header"),
            );
        }
        self.request(request).await
    }

    /// Sign in as a fresh user with `role` and return the session cookies.
    pub async fn login_as(&self, role: Role) -> (SessionUser, String) {
        let id = Uuid::now_v7();
        let user = SessionUser {
            id,
            name: format!("user-{id}"),
            email: format!("{id}@example.com"),
            image: None,
            role,
        };
        let cookies = self.login(&user).await;
        (user, cookies)
    }

    /// Sign in as `user` and return the session cookies.
    pub async fn login(&self, user: &SessionUser) -> String {
        let response = self
            .request(json_request("POST", TEST_LOGIN_PATH, &serde_json::to_value(user).unwrap()))
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        extract_cookies(&response)
    }
}

/// Build a JSON request.
pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build a bodiless request.
pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Extract `name=value` cookie pairs from a response's `Set-Cookie` headers.
pub fn extract_cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `state` parameter of a redirect to a provider's authorization page.
pub fn authorization_state(response: &Response) -> String {
    url::Url::parse(&location(response))
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("authorization URL has no state")
}

/// The `Location` header of a redirect.
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("response has no Location header")
        .to_str()
        .unwrap()
        .to_string()
}
