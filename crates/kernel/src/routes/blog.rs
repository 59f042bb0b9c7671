//! Blog post JSON API.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::content::{EntryPoint, prepare_post};
use crate::error::{AppError, AppResult};
use crate::models::BlogPost;
use crate::routes::helpers::{require_admin, require_login, session_user};
use crate::state::AppState;

/// Default page size for listings.
const DEFAULT_LIST_LIMIT: i64 = 20;

/// Envelope for successful responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// A blog post as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostResponse {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub is_private: bool,
    pub author_id: Uuid,
    pub created: i64,
    pub changed: i64,
}

impl From<BlogPost> for BlogPostResponse {
    fn from(post: BlogPost) -> Self {
        Self {
            id: post.id,
            title: post.title,
            body: post.body,
            is_private: post.is_private,
            author_id: post.author_id,
            created: post.created,
            changed: post.changed,
        }
    }
}

/// Body of `POST /api/blogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogRequest {
    pub blog_title: String,
    pub blog_post: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub entry_point: EntryPoint,
}

/// Body of `PUT /api/blogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogRequest {
    pub blog_id: Uuid,
    pub blog_title: String,
    pub blog_post: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub entry_point: EntryPoint,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// GET /api/blogs/{id}
///
/// Private posts are reported as missing to anyone but their author and
/// admins.
async fn get_blog(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<BlogPostResponse>>> {
    let viewer = session_user(&session).await.map(|u| u.viewer());

    let post = BlogPost::find_by_id(state.db(), id)
        .await?
        .filter(|post| post.is_visible_to(viewer.as_ref()))
        .ok_or(AppError::NotFound)?;

    Ok(Json(DataResponse { data: post.into() }))
}

/// GET /api/blogs
async fn list_blogs(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<DataResponse<Vec<BlogPostResponse>>>> {
    let viewer = session_user(&session).await.map(|u| u.viewer());

    let posts = BlogPost::list_visible(
        state.db(),
        viewer.as_ref(),
        query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        query.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(DataResponse {
        data: posts.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/blogs
async fn create_blog(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CreateBlogRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<BlogPostResponse>>)> {
    let user = require_login(&session).await?;
    let Json(request) = payload?;

    let validated = prepare_post(request.entry_point, &request.blog_title, &request.blog_post)?;
    let post = BlogPost::create(state.db(), user.id, &validated, request.is_private).await?;

    info!(
        post_id = %post.id,
        author_id = %user.id,
        entry_point = %request.entry_point,
        "blog post created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: post.into() })))
}

/// PUT /api/blogs
async fn update_blog(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<UpdateBlogRequest>, JsonRejection>,
) -> AppResult<Json<DataResponse<BlogPostResponse>>> {
    let user = require_login(&session).await?;
    let Json(request) = payload?;

    let validated = prepare_post(request.entry_point, &request.blog_title, &request.blog_post)?;

    let existing = BlogPost::find_by_id(state.db(), request.blog_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !existing.can_edit(&user.viewer()) {
        return Err(AppError::Forbidden);
    }
    let post = BlogPost::update(state.db(), existing.id, &validated, request.is_private)
        .await?
        .ok_or(AppError::NotFound)?;

    info!(post_id = %post.id, editor_id = %user.id, "blog post updated");

    Ok(Json(DataResponse { data: post.into() }))
}

/// DELETE /api/blogs/{id}
async fn delete_blog(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let admin = require_admin(&session).await?;

    if !BlogPost::delete(state.db(), id).await? {
        return Err(AppError::NotFound);
    }

    info!(post_id = %id, admin_id = %admin.id, "blog post deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Create the blog API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/blogs",
            get(list_blogs).post(create_blog).put(update_blog),
        )
        .route("/api/blogs/{id}", get(get_blog).delete(delete_blog))
}
