//! Shared route helpers for session-based authorization.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::Role;
use crate::models::{User, Viewer};

/// Session key for the signed-in user.
pub const SESSION_USER: &str = "user";

/// The signed-in user as kept in the session.
///
/// Written once per sign-in; the role is the one resolved at that sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub role: Role,
}

impl SessionUser {
    pub fn viewer(&self) -> Viewer {
        Viewer {
            user_id: self.id,
            role: self.role,
        }
    }
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
            role: user.role,
        }
    }
}

/// Start an authenticated session for `user`.
///
/// The session id is cycled first so a pre-login id cannot be reused.
pub async fn establish_session(session: &Session, user: &SessionUser) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(SESSION_USER, user).await?;
    Ok(())
}

/// The signed-in user, if any.
///
/// A session entry that fails to decode is treated as signed out.
pub async fn session_user(session: &Session) -> Option<SessionUser> {
    session.get(SESSION_USER).await.ok().flatten()
}

/// Require an authenticated user.
pub async fn require_login(session: &Session) -> AppResult<SessionUser> {
    session_user(session).await.ok_or(AppError::Unauthorized)
}

/// Require an authenticated **admin** user.
///
/// Returns 401 when signed out and 403 when signed in without the role.
pub async fn require_admin(session: &Session) -> AppResult<SessionUser> {
    let user = require_login(session).await?;
    if user.role.is_admin() {
        Ok(user)
    } else {
        Err(AppError::Forbidden)
    }
}
