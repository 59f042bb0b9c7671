//! Provider accounts linked to local users.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::identity::Provider;

/// A provider account linked to a user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub provider: String,
    pub provider_account_id: String,
    pub user_id: Uuid,
    pub created: i64,
}

impl Account {
    /// Find the account a provider knows by `provider_account_id`.
    pub async fn find(
        conn: &mut PgConnection,
        provider: Provider,
        provider_account_id: &str,
    ) -> Result<Option<Self>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE provider = $1 AND provider_account_id = $2",
        )
        .bind(provider.as_str())
        .bind(provider_account_id)
        .fetch_optional(conn)
        .await
        .context("failed to fetch account")?;

        Ok(account)
    }

    /// Link a provider account to a user. Linking twice is a no-op.
    pub async fn link(
        conn: &mut PgConnection,
        provider: Provider,
        provider_account_id: &str,
        user_id: Uuid,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (provider, provider_account_id, user_id, created)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider, provider_account_id) DO NOTHING
            "#,
        )
        .bind(provider.as_str())
        .bind(provider_account_id)
        .bind(user_id)
        .bind(chrono::Utc::now().timestamp())
        .execute(conn)
        .await
        .context("failed to link account")?;

        Ok(())
    }

    /// List every account linked to a user.
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE user_id = $1 ORDER BY created",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("failed to list accounts")?;

        Ok(accounts)
    }
}
