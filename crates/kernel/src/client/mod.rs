//! Typed HTTP client for the blog API.
//!
//! Submissions go through a [`SubmissionTracker`]: `Idle → Pending →
//! Success | Error`. A second submission while one is pending is refused,
//! and every failure maps to the same user-facing [`Notice`].

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::routes::blog::{BlogPostResponse, CreateBlogRequest, DataResponse, UpdateBlogRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a submission stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

/// Message shown to the user after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: &'static str,
    pub description: &'static str,
}

pub const SUCCESS_NOTICE: Notice = Notice {
    title: "Success!",
    description: "You have successfully saved your blog 🚀",
};

pub const FAILURE_NOTICE: Notice = Notice {
    title: "Oops!",
    description: "Something went wrong!",
};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a submission is already in progress")]
    AlreadyPending,

    #[error("server responded with {0}")]
    Status(StatusCode),

    #[error("request failed")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL")]
    Url(#[from] url::ParseError),
}

impl SubmitError {
    /// The notice to show. Every failure reads the same to the user.
    pub fn notice(&self) -> Notice {
        FAILURE_NOTICE
    }
}

/// Duplicate-submission guard and outcome record.
#[derive(Debug, Default)]
pub struct SubmissionTracker {
    state: Mutex<SubmissionState>,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubmissionState {
        *self.state.lock()
    }

    /// Whether a submission is in flight; a UI disables its trigger on this.
    pub fn is_pending(&self) -> bool {
        self.state() == SubmissionState::Pending
    }

    /// Move to `Pending`, refusing if already there.
    pub fn begin(&self) -> Result<(), SubmitError> {
        let mut state = self.state.lock();
        if *state == SubmissionState::Pending {
            return Err(SubmitError::AlreadyPending);
        }
        *state = SubmissionState::Pending;
        Ok(())
    }

    /// Record the outcome and return the notice for it.
    pub fn finish(&self, succeeded: bool) -> Notice {
        let mut state = self.state.lock();
        if succeeded {
            *state = SubmissionState::Success;
            SUCCESS_NOTICE
        } else {
            *state = SubmissionState::Error;
            FAILURE_NOTICE
        }
    }
}

/// Client for the blog endpoints.
#[derive(Debug)]
pub struct BlogClient {
    http: reqwest::Client,
    base_url: Url,
    session_cookie: Option<String>,
    tracker: SubmissionTracker,
}

impl BlogClient {
    pub fn new(base_url: &str) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self::with_http(http, Url::parse(base_url)?))
    }

    pub fn with_http(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            session_cookie: None,
            tracker: SubmissionTracker::new(),
        }
    }

    /// Send `cookie` (a `name=value` pair) with every request.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn tracker(&self) -> &SubmissionTracker {
        &self.tracker
    }

    pub fn is_pending(&self) -> bool {
        self.tracker.is_pending()
    }

    /// Create a post.
    pub async fn create(
        &self,
        request: &CreateBlogRequest,
    ) -> Result<BlogPostResponse, SubmitError> {
        self.submit(Method::POST, request).await
    }

    /// Save edits to an existing post.
    pub async fn update(
        &self,
        request: &UpdateBlogRequest,
    ) -> Result<BlogPostResponse, SubmitError> {
        self.submit(Method::PUT, request).await
    }

    /// Fetch one post. Reads do not touch the submission state.
    pub async fn fetch(&self, id: Uuid) -> Result<BlogPostResponse, SubmitError> {
        let url = self.base_url.join(&format!("api/blogs/{id}"))?;
        self.send::<(), _>(Method::GET, url, None).await
    }

    async fn submit<B: Serialize>(
        &self,
        method: Method,
        body: &B,
    ) -> Result<BlogPostResponse, SubmitError> {
        self.tracker.begin()?;

        let result = match self.base_url.join("api/blogs") {
            Ok(url) => self.send::<B, BlogPostResponse>(method, url, Some(body)).await,
            Err(e) => Err(e.into()),
        };

        let notice = self.tracker.finish(result.is_ok());
        match &result {
            Ok(post) => debug!(post_id = %post.id, notice = notice.title, "submission saved"),
            Err(e) => warn!(error = %e, notice = notice.title, "submission failed"),
        }

        result
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, SubmitError> {
        let mut request = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::Status(status));
        }

        let envelope: DataResponse<T> = response.json().await?;
        Ok(envelope.data)
    }
}
