//! Authentication routes: OAuth sign-in, callback, session, sign-out.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tower_sessions::Session;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::identity::{Provider, ProviderError, Role, resolve_identity};
use crate::models::User;
use crate::routes::helpers::{SessionUser, establish_session, session_user};
use crate::state::AppState;

/// Session key for an in-flight sign-in.
pub const SESSION_PENDING_SIGN_IN: &str = "oauth_pending";

/// How long a sign-in may take between redirect and callback, in seconds.
const STATE_VALIDITY_SECS: i64 = 600;

/// Where the browser lands after sign-in when no callback URL was given.
const DEFAULT_CALLBACK_URL: &str = "/";

/// Page that displays sign-in errors.
const ERROR_PAGE: &str = "/login";

/// A sign-in started by this session and not yet completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSignIn {
    pub provider: Provider,
    pub state: String,
    pub created: i64,
    pub callback_url: String,
}

impl PendingSignIn {
    fn is_expired(&self, now: i64) -> bool {
        now - self.created > STATE_VALIDITY_SECS
    }

    fn matches(&self, provider: Provider, state: &str) -> bool {
        self.provider == provider && bool::from(self.state.as_bytes().ct_eq(state.as_bytes()))
    }
}

/// Generate an unguessable OAuth `state` value.
pub fn generate_state() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);

    let mut hasher = Sha256::new();
    hasher.update(random_bytes);
    hasher.update(chrono::Utc::now().timestamp().to_le_bytes());
    hex::encode(hasher.finalize())
}

/// Accept only same-site relative paths as post-sign-in destinations.
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would become
/// the protocol-relative `//host`. Any whitespace or control character
/// disqualifies the candidate.
pub fn safe_callback_url(candidate: Option<&str>) -> String {
    match candidate {
        Some(url) if is_same_site_path(url) => url.to_string(),
        _ => DEFAULT_CALLBACK_URL.to_string(),
    }
}

fn is_same_site_path(url: &str) -> bool {
    url.starts_with('/')
        && !url.starts_with("//")
        && !url
            .chars()
            .any(|c| c == '\\' || c.is_whitespace() || c.is_control())
}

fn parse_provider(name: &str) -> AppResult<Provider> {
    name.parse().map_err(|_| AppError::NotFound)
}

fn provider_failure(error: ProviderError) -> AppError {
    match error {
        ProviderError::Http { .. } => AppError::Internal(error.into()),
        other => {
            warn!(error = %other, "sign-in rejected");
            AppError::BadRequest(other.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInQuery {
    callback_url: Option<String>,
}

/// Start sign-in with a provider.
///
/// GET /api/auth/signin/{provider}
async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<SignInQuery>,
) -> AppResult<Redirect> {
    let provider = parse_provider(&provider)?;
    let client = state.providers().get(provider).ok_or(AppError::NotFound)?;

    let pending = PendingSignIn {
        provider,
        state: generate_state(),
        created: chrono::Utc::now().timestamp(),
        callback_url: safe_callback_url(query.callback_url.as_deref()),
    };

    let url = client
        .authorization_url(&pending.state)
        .map_err(|e| AppError::Internal(e.into()))?;

    session.insert(SESSION_PENDING_SIGN_IN, &pending).await?;

    Ok(Redirect::to(url.as_str()))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Complete sign-in.
///
/// GET /api/auth/callback/{provider}
async fn callback(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Response> {
    let provider = parse_provider(&provider)?;

    // Consumed whatever the outcome, so a state value is never reusable
    let pending: Option<PendingSignIn> = session.remove(SESSION_PENDING_SIGN_IN).await?;

    if let Some(error) = query.error {
        warn!(%provider, %error, "provider returned an error");
        let location = format!("{ERROR_PAGE}?error={}", urlencoding::encode(&error));
        return Ok(Redirect::to(&location).into_response());
    }

    let now = chrono::Utc::now().timestamp();
    let pending = match (pending, query.state.as_deref()) {
        (Some(pending), Some(returned))
            if pending.matches(provider, returned) && !pending.is_expired(now) =>
        {
            pending
        }
        _ => {
            warn!(%provider, "OAuth state missing, mismatched or expired");
            return Err(AppError::BadRequest("invalid sign-in state".to_string()));
        }
    };

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing authorization code".to_string()))?;

    let client = state.providers().get(provider).ok_or(AppError::NotFound)?;
    let access_token = client
        .exchange_code(state.http(), &code)
        .await
        .map_err(provider_failure)?;
    let profile = client
        .fetch_profile(state.http(), &access_token)
        .await
        .map_err(provider_failure)?;

    let identity = resolve_identity(&profile, state.role_map())
        .map_err(|e| provider_failure(ProviderError::Identity(e)))?;

    let user = User::upsert_from_identity(state.db(), &identity).await?;

    establish_session(&session, &SessionUser::from(&user)).await?;

    info!(
        user_id = %user.id,
        %provider,
        role = %user.role,
        "user signed in"
    );
    if user.is_admin() {
        info!(user_id = %user.id, "admin role granted");
    }

    Ok(Redirect::to(&pending.callback_url).into_response())
}

/// Public view of the session user.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUserView {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<SessionUserView>,
}

/// Current session.
///
/// GET /api/auth/session
async fn current_session(session: Session) -> Json<SessionResponse> {
    let user = session_user(&session).await.map(|user| SessionUserView {
        name: user.name,
        email: user.email,
        image: user.image,
        role: user.role,
    });

    Json(SessionResponse { user })
}

/// Sign out: deletes the session and clears its cookie.
///
/// POST /api/auth/signout
async fn sign_out(session: Session) -> AppResult<StatusCode> {
    if let Some(user) = session_user(&session).await {
        info!(user_id = %user.id, "user signed out");
    }

    session.flush().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin/{provider}", get(sign_in))
        .route("/api/auth/callback/{provider}", get(callback))
        .route("/api/auth/session", get(current_session))
        .route("/api/auth/signout", post(sign_out))
}
