//! PostgREST store - talks to a hosted Postgres over its REST interface
//! (Supabase-compatible: `apikey` header, bearer session token, row-level
//! security enforced server side).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::domain::{NewPost, Post, PostPatch};
use quill_core::error::StoreError;
use quill_core::ports::{ORDER_COLUMN, OrderBy, POSTS_TABLE, PostStore, RowFilter};

const PLACEHOLDER_URL: &str = "https://placeholder.supabase.co";
const PLACEHOLDER_KEY: &str = "placeholder-key";

/// REST endpoint configuration.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. https://abcd.supabase.co
    pub url: String,
    /// Public (anon) API key.
    pub anon_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            url: PLACEHOLDER_URL.to_string(),
            anon_key: PLACEHOLDER_KEY.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RestConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("SUPABASE_URL").unwrap_or_else(|_| PLACEHOLDER_URL.to_string()),
            anon_key: std::env::var("SUPABASE_ANON_KEY")
                .unwrap_or_else(|_| PLACEHOLDER_KEY.to_string()),
            timeout: Duration::from_secs(
                std::env::var("REST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }

    /// Whether real credentials were supplied rather than placeholders.
    pub fn is_configured(&self) -> bool {
        self.url != PLACEHOLDER_URL
            && self.anon_key != PLACEHOLDER_KEY
            && self.url.starts_with("https://")
            && self.anon_key.starts_with("eyJ")
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), table)
    }
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: Option<String>,
    details: Option<String>,
}

/// PATCH body. PostgREST leaves `updated_at` alone unless told.
#[derive(Debug, Serialize)]
struct PatchBody<'a> {
    title: &'a str,
    content: &'a str,
    updated_at: DateTime<Utc>,
}

impl<'a> PatchBody<'a> {
    fn new(patch: &'a PostPatch, now: DateTime<Utc>) -> Self {
        Self {
            title: &patch.title,
            content: &patch.content,
            updated_at: now,
        }
    }
}

/// Post store backed by a PostgREST endpoint.
pub struct RestPostStore {
    client: Client,
    config: RestConfig,
    bearer: String,
}

impl RestPostStore {
    pub fn new(config: RestConfig) -> Result<Self, StoreError> {
        if !config.is_configured() {
            tracing::warn!(url = %config.url, "REST store is using placeholder credentials");
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let bearer = config.anon_key.clone();

        Ok(Self {
            client,
            config,
            bearer,
        })
    }

    /// Act as a signed-in user so row-level security sees their identity.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.bearer = token.into();
        self
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.config.table_url(POSTS_TABLE))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.bearer)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<RestErrorBody>().await.ok();
        let message = body
            .and_then(|b| b.message.or(b.details))
            .unwrap_or_else(|| status.to_string());

        tracing::warn!(status = %status, message = %message, "REST request failed");
        Err(error_for_status(status, message))
    }

    async fn decode(response: Response) -> Result<Vec<Post>, StoreError> {
        response
            .json::<Vec<Post>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

fn error_for_status(status: StatusCode, message: String) -> StoreError {
    if status.is_server_error() {
        StoreError::Query(message)
    } else {
        StoreError::Rejected(message)
    }
}

/// `order` query value, e.g. `created_at.desc`.
fn order_param(order: OrderBy) -> String {
    let direction = if order.descending { "desc" } else { "asc" };
    format!("{ORDER_COLUMN}.{direction}")
}

/// Equality filters for a guarded mutation.
fn filter_params(filter: &RowFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![("id", format!("eq.{}", filter.id))];
    if let Some(owner) = filter.owner {
        params.push(("user_id", format!("eq.{owner}")));
    }
    params
}

#[async_trait]
impl PostStore for RestPostStore {
    async fn select_all(&self, order: OrderBy) -> Result<Vec<Post>, StoreError> {
        let request = self
            .request(Method::GET)
            .query(&[("select", "*".to_string()), ("order", order_param(order))]);

        let posts = Self::decode(self.send(request).await?).await?;
        tracing::debug!(count = posts.len(), "Fetched posts over REST");
        Ok(posts)
    }

    async fn select_one(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let request = self
            .request(Method::GET)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);

        let posts = Self::decode(self.send(request).await?).await?;
        Ok(posts.into_iter().next())
    }

    async fn insert(&self, row: NewPost) -> Result<(), StoreError> {
        let request = self
            .request(Method::POST)
            .header("Prefer", "return=minimal")
            .json(&[row]);

        self.send(request).await?;
        Ok(())
    }

    async fn update(&self, patch: PostPatch, filter: RowFilter) -> Result<u64, StoreError> {
        let request = self
            .request(Method::PATCH)
            .query(&filter_params(&filter))
            .header("Prefer", "return=representation")
            .json(&PatchBody::new(&patch, Utc::now()));

        let rows = Self::decode(self.send(request).await?).await?;
        Ok(rows.len() as u64)
    }

    async fn delete(&self, filter: RowFilter) -> Result<u64, StoreError> {
        let request = self
            .request(Method::DELETE)
            .query(&filter_params(&filter))
            .header("Prefer", "return=representation");

        let rows = Self::decode(self.send(request).await?).await?;
        Ok(rows.len() as u64)
    }
}
