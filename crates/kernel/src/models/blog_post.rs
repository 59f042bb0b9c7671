//! Blog post model.
//!
//! Bodies are stored already sanitized; callers pass a [`ValidatedPost`],
//! never raw submission text.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::content::ValidatedPost;
use crate::identity::Role;

/// Maximum posts returned by one listing.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Blog post record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub is_private: bool,
    pub author_id: Uuid,
    pub created: i64,
    pub changed: i64,
}

/// Who is asking: the signed-in user's id and role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Uuid,
    pub role: Role,
}

impl BlogPost {
    /// Private posts are visible to their author and to admins only.
    pub fn is_visible_to(&self, viewer: Option<&Viewer>) -> bool {
        if !self.is_private {
            return true;
        }
        viewer.is_some_and(|v| v.role.is_admin() || v.user_id == self.author_id)
    }

    pub fn can_edit(&self, viewer: &Viewer) -> bool {
        viewer.role.is_admin() || viewer.user_id == self.author_id
    }

    /// Find a post by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, BlogPost>("SELECT * FROM blog_posts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch blog post")?;

        Ok(post)
    }

    /// List posts visible to `viewer`, newest first.
    pub async fn list_visible(
        pool: &PgPool,
        viewer: Option<&Viewer>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let viewer_id = viewer.map(|v| v.user_id);
        let is_admin = viewer.is_some_and(|v| v.role.is_admin());

        let posts = sqlx::query_as::<_, BlogPost>(
            r#"
            SELECT * FROM blog_posts
            WHERE is_private = FALSE OR author_id = $1 OR $2
            ORDER BY created DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(viewer_id)
        .bind(is_admin)
        .bind(limit.clamp(1, MAX_LIST_LIMIT))
        .bind(offset.max(0))
        .fetch_all(pool)
        .await
        .context("failed to list blog posts")?;

        Ok(posts)
    }

    /// Create a post.
    pub async fn create(
        pool: &PgPool,
        author_id: Uuid,
        post: &ValidatedPost,
        is_private: bool,
    ) -> Result<Self> {
        let now = chrono::Utc::now().timestamp();

        let post = sqlx::query_as::<_, BlogPost>(
            r#"
            INSERT INTO blog_posts (id, title, body, is_private, author_id, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&post.title)
        .bind(&post.body)
        .bind(is_private)
        .bind(author_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .context("failed to create blog post")?;

        Ok(post)
    }

    /// Replace a post's title, body and visibility.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        post: &ValidatedPost,
        is_private: bool,
    ) -> Result<Option<Self>> {
        let post = sqlx::query_as::<_, BlogPost>(
            r#"
            UPDATE blog_posts
            SET title = $2, body = $3, is_private = $4, changed = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(is_private)
        .bind(chrono::Utc::now().timestamp())
        .fetch_optional(pool)
        .await
        .context("failed to update blog post")?;

        Ok(post)
    }

    /// Delete a post. Returns whether a row was removed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete blog post")?;

        Ok(result.rows_affected() > 0)
    }
}
