//! User model and sign-in persistence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::account::Account;
use crate::identity::{Role, UserIdentity};

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created: i64,
    pub changed: i64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Find a user by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by id")?;

        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>> {
        let mut conn = pool.acquire().await.context("failed to acquire connection")?;
        Self::find_by_email_in(&mut conn, email).await
    }

    async fn find_by_email_in(conn: &mut PgConnection, email: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(conn)
            .await
            .context("failed to fetch user by email")?;

        Ok(user)
    }

    /// Persist a sign-in.
    ///
    /// Resolution order: the linked provider account, then a user with the
    /// same email (linking the new account to it), then a new user. Name,
    /// avatar and role are refreshed from the identity every time.
    pub async fn upsert_from_identity(pool: &PgPool, identity: &UserIdentity) -> Result<Self> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = pool.begin().await.context("failed to start transaction")?;

        let linked = Account::find(&mut tx, identity.provider, &identity.id).await?;

        let existing_id = match linked {
            Some(account) => Some(account.user_id),
            None => Self::find_by_email_in(&mut tx, &identity.email)
                .await?
                .map(|user| user.id),
        };

        let user = match existing_id {
            Some(id) => sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET name = $2, image = $3, role = $4, changed = $5
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(&identity.display_name)
            .bind(&identity.avatar_url)
            .bind(identity.role.as_str())
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .context("failed to update user")?,
            None => {
                let user = sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (id, name, email, image, role, created, changed)
                    VALUES ($1, $2, $3, $4, $5, $6, $6)
                    RETURNING *
                    "#,
                )
                .bind(Uuid::now_v7())
                .bind(&identity.display_name)
                .bind(&identity.email)
                .bind(&identity.avatar_url)
                .bind(identity.role.as_str())
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .context("failed to create user")?;

                info!(user_id = %user.id, provider = %identity.provider, "created user");
                user
            }
        };

        Account::link(&mut tx, identity.provider, &identity.id, user.id).await?;

        tx.commit().await.context("failed to commit transaction")?;

        Ok(user)
    }
}
