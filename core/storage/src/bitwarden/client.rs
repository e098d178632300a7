//! Bitwarden API client.

use chrono::{DateTime, Duration, Utc};
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;
use zeroize::Zeroizing;

use vaultbridge_common::{Error, Result};

use super::config::BitwardenConfig;
use super::schema::{Folder, FolderRequest, Item, ItemRequest, ListResponse, TokenResponse};
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryConfig, RetryExecutor};

/// Query value selecting unfiled items.
const UNFILED: &str = "null";

/// Cached bearer token.
struct AccessToken {
    value: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Expired or about to expire.
    fn is_expired(&self) -> bool {
        self.expires_at < Utc::now() + Duration::seconds(30)
    }
}

/// Bitwarden API client.
///
/// Every request takes a rate limiter token and is retried on transient
/// failures. The bearer token is fetched lazily and refreshed on expiry.
pub struct BitwardenClient {
    http: Client,
    config: BitwardenConfig,
    base_url: Url,
    token: RwLock<Option<AccessToken>>,
    limiter: RateLimiter,
    retry: RetryExecutor,
}

impl BitwardenClient {
    /// Create a new client.
    ///
    /// # Errors
    /// - `InvalidInput` for an invalid configuration
    /// - `Request` if the HTTP client cannot be built
    pub fn new(config: BitwardenConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .user_agent(concat!("vaultbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url()?,
            token: RwLock::new(None),
            limiter: RateLimiter::new(config.requests_per_minute),
            retry: RetryExecutor::new(RetryConfig::new(config.max_retries)),
            config,
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = RetryExecutor::new(config);
        self
    }

    pub fn config(&self) -> &BitwardenConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::InvalidInput(format!("API base URL '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Get a valid access token, exchanging credentials if necessary.
    async fn access_token(&self) -> Result<Zeroizing<String>> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.value.clone());
            }
        }

        let mut token = self.token.write().await;

        // Double-check after acquiring write lock
        if let Some(token) = token.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.value.clone());
        }

        let fresh = self.authenticate().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn authenticate(&self) -> Result<AccessToken> {
        info!("Authenticating with Bitwarden at {}", self.base_url);

        let url = self.endpoint(&["identity", "connect", "token"])?;
        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", "api"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Request(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication(format!(
                "Bitwarden authentication failed: {} - {}",
                status, body
            )));
        }

        let token: TokenResponse = decode(response, "token").await?;
        debug!(
            "Received {} token valid for {}s",
            token.token_type, token.expires_in
        );

        Ok(AccessToken {
            value: Zeroizing::new(token.access_token),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    /// Send one authenticated API request and check its status.
    async fn dispatch<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Response> {
        self.limiter.acquire().await;
        let token = self.access_token().await?;

        let mut api = vec!["api"];
        api.extend_from_slice(segments);
        let url = self.endpoint(&api)?;
        debug!("{} {}", method, url.path());

        let mut request = self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.as_str()));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        self.handle_response(response, segments).await
    }

    /// Map error statuses onto the store error taxonomy.
    async fn handle_response(&self, response: Response, segments: &[&str]) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let resource = segments.join("/");
        if status == StatusCode::UNAUTHORIZED {
            // Force a fresh exchange on the next request.
            self.token.write().await.take();
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => Error::NotFound(format!("Resource not found: {}", resource)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::Authentication(format!("{} on {}: {}", status, resource, body))
            }
            _ => Error::Request(format!("API error on {}: {} - {}", resource, status, body)),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T> {
        let resource = segments.join("/");
        let resource = resource.as_str();
        self.retry
            .execute(resource, || async move {
                let response = self
                    .dispatch::<()>(Method::GET, segments, query, None)
                    .await?;
                decode(response, resource).await
            })
            .await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let resource = segments.join("/");
        let resource = resource.as_str();
        self.retry
            .execute(resource, || async move {
                let response = self
                    .dispatch(Method::POST, segments, &[], Some(body))
                    .await?;
                decode(response, resource).await
            })
            .await
    }

    async fn delete(&self, segments: &[&str]) -> Result<()> {
        let resource = segments.join("/");
        self.retry
            .execute(&resource, || async move {
                self.dispatch::<()>(Method::DELETE, segments, &[], None)
                    .await
                    .map(|_| ())
            })
            .await
    }

    /// List every folder, including the null-id "No Folder" container.
    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        let list: ListResponse<Folder> = self.get_json(&["folders"], &[]).await?;
        Ok(list.data)
    }

    pub async fn get_folder(&self, id: &str) -> Result<Folder> {
        self.get_json(&["folders", id], &[]).await
    }

    pub async fn create_folder(&self, name: &str) -> Result<Folder> {
        let body = FolderRequest {
            name: name.to_string(),
        };
        self.post_json(&["folders"], &body).await
    }

    pub async fn delete_folder(&self, id: &str) -> Result<()> {
        self.delete(&["folders", id]).await
    }

    /// List the items of one folder, or the unfiled items for `None`.
    pub async fn list_items(&self, folder_id: Option<&str>) -> Result<Vec<Item>> {
        let folder = folder_id.unwrap_or(UNFILED);
        let list: ListResponse<Item> = self.get_json(&["items"], &[("folderid", folder)]).await?;
        Ok(list.data)
    }

    pub async fn get_item(&self, id: &str) -> Result<Item> {
        self.get_json(&["items", id], &[]).await
    }

    pub async fn create_item(&self, item: &ItemRequest) -> Result<Item> {
        self.post_json(&["items"], item).await
    }

    pub async fn delete_item(&self, id: &str) -> Result<()> {
        self.delete(&["items", id]).await
    }
}

/// Decode a JSON body, reporting a shape mismatch as a schema error.
async fn decode<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Request(format!("Failed to read {} response: {}", resource, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::Schema(format!("Unexpected {} response: {}", resource, e)))
}
