//! The authorization-code flow against a stand-in GitHub.
//!
//! The stub answers the token, profile and email-list requests the way
//! GitHub does, including its 200-with-`error` token failures.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::HashMap;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{Value, json};

use common::{TestApp, authorization_state, body_json, empty_request, extract_cookies, location};
use scrivener_kernel::config::{ProviderCredentials, Secret};
use scrivener_kernel::identity::{
    Provider, ProviderClient, ProviderError, ProviderProfile, ProviderRegistry, ProviderUrls,
    RoleMap, resolve_identity,
};
use scrivener_test_utils::github_profile;

const GOOD_CODE: &str = "good-code";
const ACCESS_TOKEN: &str = "stub-access-token";
const CLIENT_SECRET: &str = "stub-client-secret";

#[derive(Clone)]
struct Stub {
    /// Email on the `/user` payload; `None` when the address is private.
    profile_email: Option<String>,
    /// Body of `/user/emails`.
    emails: Value,
}

impl Stub {
    fn private_email(emails: Value) -> Self {
        Self {
            profile_email: None,
            emails,
        }
    }
}

async fn stub_token(Form(form): Form<HashMap<String, String>>) -> Json<Value> {
    let authentic = form.get("client_secret").map(String::as_str) == Some(CLIENT_SECRET)
        && form.get("grant_type").map(String::as_str) == Some("authorization_code");
    if authentic && form.get("code").map(String::as_str) == Some(GOOD_CODE) {
        Json(json!({ "access_token": ACCESS_TOKEN, "token_type": "bearer" }))
    } else {
        Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired.",
        }))
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {ACCESS_TOKEN}"))
}

async fn stub_user(
    State(stub): State<Stub>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(github_profile(stub.profile_email.as_deref())))
}

async fn stub_emails(
    State(stub): State<Stub>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(stub.emails))
}

/// Serve `stub` and return a GitHub client pointed at it.
async fn github_client(stub: Stub) -> ProviderClient {
    let app = Router::new()
        .route("/login/oauth/access_token", post(stub_token))
        .route("/user", get(stub_user))
        .route("/user/emails", get(stub_emails))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = format!("http://{addr}");
    ProviderClient::new(
        Provider::GitHub,
        &ProviderCredentials {
            client_id: "stub-client".to_string(),
            client_secret: Secret::new(CLIENT_SECRET),
        },
        "http://localhost:3000/api/auth/callback/github",
    )
    .with_urls(ProviderUrls {
        authorize_url: format!("{base}/login/oauth/authorize"),
        token_url: format!("{base}/login/oauth/access_token"),
        profile_url: format!("{base}/user"),
        emails_url: Some(format!("{base}/user/emails")),
    })
}

fn registry(client: ProviderClient) -> ProviderRegistry {
    let mut registry = ProviderRegistry::default();
    registry.insert(client);
    registry
}

fn primary_email(email: &str) -> Value {
    json!([
        { "email": "octocat@users.noreply.github.com", "primary": false, "verified": true },
        { "email": email, "primary": true, "verified": true },
    ])
}

#[tokio::test]
async fn good_code_is_exchanged_for_a_token() {
    let client = github_client(Stub::private_email(json!([]))).await;

    let token = client
        .exchange_code(&reqwest::Client::new(), GOOD_CODE)
        .await
        .unwrap();

    assert_eq!(token, ACCESS_TOKEN);
}

#[tokio::test]
async fn token_error_in_a_success_response_is_a_rejection() {
    let client = github_client(Stub::private_email(json!([]))).await;

    let error = client
        .exchange_code(&reqwest::Client::new(), "stale-code")
        .await
        .unwrap_err();

    match error {
        ProviderError::Rejected { provider, error } => {
            assert_eq!(provider, Provider::GitHub);
            assert!(error.starts_with("bad_verification_code"), "{error}");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn private_github_email_is_filled_from_the_email_list() {
    let client =
        github_client(Stub::private_email(primary_email("octocat@example.com"))).await;

    let profile = client
        .fetch_profile(&reqwest::Client::new(), ACCESS_TOKEN)
        .await
        .unwrap();

    let ProviderProfile::GitHub(github) = &profile else {
        panic!("expected a GitHub profile, got {profile:?}");
    };
    assert_eq!(github.email.as_deref(), Some("octocat@example.com"));

    let identity = resolve_identity(&profile, &RoleMap::default()).unwrap();
    assert_eq!(identity.email, "octocat@example.com");
    assert_eq!(identity.id, "583231");
}

#[tokio::test]
async fn public_github_email_skips_the_email_list() {
    let client = github_client(Stub {
        profile_email: Some("public@example.com".to_string()),
        emails: primary_email("other@example.com"),
    })
    .await;

    let profile = client
        .fetch_profile(&reqwest::Client::new(), ACCESS_TOKEN)
        .await
        .unwrap();

    let identity = resolve_identity(&profile, &RoleMap::default()).unwrap();
    assert_eq!(identity.email, "public@example.com");
}

#[tokio::test]
async fn wrong_token_fails_the_profile_request() {
    let client = github_client(Stub::private_email(json!([]))).await;

    let error = client
        .fetch_profile(&reqwest::Client::new(), "forged-token")
        .await
        .unwrap_err();

    assert!(matches!(error, ProviderError::Http { provider: Provider::GitHub, .. }));
}

/// Start sign-in and return the session cookies and the state to echo back.
async fn begin_sign_in(app: &TestApp, callback_url: &str) -> (String, String) {
    let response = app
        .request(empty_request(
            "GET",
            &format!("/api/auth/signin/github?callbackUrl={callback_url}"),
        ))
        .await;
    assert!(response.status().is_redirection());
    (extract_cookies(&response), authorization_state(&response))
}

#[tokio::test]
async fn rejected_code_fails_the_callback() {
    let client = github_client(Stub::private_email(json!([]))).await;
    let app = TestApp::with_providers(registry(client));
    let (cookies, state) = begin_sign_in(&app, "/builder").await;

    let response = app
        .request_with_cookies(
            empty_request(
                "GET",
                &format!("/api/auth/callback/github?code=stale-code&state={state}"),
            ),
            &cookies,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("bad_verification_code"));
}

#[tokio::test]
async fn account_without_any_verified_email_fails_the_callback() {
    let unverified = json!([
        { "email": "octocat@example.com", "primary": true, "verified": false },
    ]);
    let client = github_client(Stub::private_email(unverified)).await;
    let app = TestApp::with_providers(registry(client));
    let (cookies, state) = begin_sign_in(&app, "/builder").await;

    // Rejected before any user row is written, so no database is needed
    let response = app
        .request_with_cookies(
            empty_request(
                "GET",
                &format!("/api/auth/callback/github?code={GOOD_CODE}&state={state}"),
            ),
            &cookies,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app
        .request_with_cookies(empty_request("GET", "/api/auth/session"), &cookies)
        .await;
    assert_eq!(body_json(response).await, json!({}));
}

#[tokio::test]
#[ignore = "requires PostgreSQL (set TEST_DATABASE_URL)"]
async fn completed_sign_in_stores_the_resolved_role() {
    let client =
        github_client(Stub::private_email(primary_email("hughesbryan3000@gmail.com"))).await;
    let app = TestApp::with_database_and_providers(registry(client)).await;
    let (cookies, state) = begin_sign_in(&app, "/builder").await;

    let response = app
        .request_with_cookies(
            empty_request(
                "GET",
                &format!("/api/auth/callback/github?code={GOOD_CODE}&state={state}"),
            ),
            &cookies,
        )
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/builder");
    // Signing in issues a new session id
    let signed_in = extract_cookies(&response);
    assert!(!signed_in.is_empty());

    let response = app
        .request_with_cookies(empty_request("GET", "/api/auth/session"), &signed_in)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "hughesbryan3000@gmail.com");
    assert_eq!(body["user"]["role"], "admin");

    // The state was consumed by the first callback
    let response = app
        .request_with_cookies(
            empty_request(
                "GET",
                &format!("/api/auth/callback/github?code={GOOD_CODE}&state={state}"),
            ),
            &signed_in,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
