//! REST client for the Loomway cart API.
//!
//! Every cart endpoint requires a session token; the token is passed per
//! call, so one client serves both guest and authenticated sessions and
//! nothing secret is pinned inside the client.
//!
//! Cart responses are never cached: the canonical cart is mutable state and
//! each response replaces the local guess wholesale.

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::CartConfig;

use self::types::{AddItemRequest, ClearCartResponse, RemoteCart, UpdateItemRequest};

pub mod types;

/// Maximum number of body characters echoed into error values.
const ERROR_BODY_EXCERPT_LEN: usize = 500;
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Errors from the cart API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// The session token was rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The API asked us to back off.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
    /// Any other non-success status, with a body excerpt for diagnostics.
    #[error("Unexpected status {status}: {body}")]
    Unexpected {
        /// HTTP status code of the response.
        status: StatusCode,
        /// Up to [`ERROR_BODY_EXCERPT_LEN`] characters of the response body.
        body: String,
    },
}

/// Cart API client.
///
/// Cheap to clone; all clones share the underlying connection pool.
#[derive(Clone)]
pub struct CartApiClient {
    inner: Arc<CartApiClientInner>,
}

struct CartApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl CartApiClient {
    /// Create a new cart API client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed (TLS backend
    /// initialization failure).
    #[must_use]
    pub fn new(config: &CartConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            inner: Arc::new(CartApiClientInner {
                client,
                base_url: config.api_base_url.clone(),
            }),
        }
    }

    /// Fetch the canonical server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the token is rejected, or the
    /// response cannot be parsed.
    #[instrument(skip(self, token))]
    pub async fn fetch_cart(&self, token: &SecretString) -> Result<RemoteCart, ApiError> {
        let response = self
            .inner
            .client
            .get(self.endpoint("/cart"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Add a product/variant to the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the token is rejected, or the
    /// response cannot be parsed.
    #[instrument(
        skip(self, token, request),
        fields(product_id = %request.product_id, quantity = request.quantity)
    )]
    pub async fn add_item(
        &self,
        token: &SecretString,
        request: &AddItemRequest,
    ) -> Result<RemoteCart, ApiError> {
        let response = self
            .inner
            .client
            .post(self.endpoint("/cart/items"))
            .bearer_auth(token.expose_secret())
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Set the absolute quantity of a server cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the token is rejected, or the
    /// response cannot be parsed.
    #[instrument(skip(self, token))]
    pub async fn update_item(
        &self,
        token: &SecretString,
        item_id: &str,
        quantity: u32,
    ) -> Result<RemoteCart, ApiError> {
        let response = self
            .inner
            .client
            .put(self.endpoint(&format!("/cart/items/{item_id}")))
            .bearer_auth(token.expose_secret())
            .json(&UpdateItemRequest { quantity })
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Remove a line from the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the token is rejected, or the
    /// response cannot be parsed.
    #[instrument(skip(self, token))]
    pub async fn remove_item(
        &self,
        token: &SecretString,
        item_id: &str,
    ) -> Result<RemoteCart, ApiError> {
        let response = self
            .inner
            .client
            .delete(self.endpoint(&format!("/cart/items/{item_id}")))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Clear the server cart entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the token is rejected, or the
    /// response cannot be parsed.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(&self, token: &SecretString) -> Result<ClearCartResponse, ApiError> {
        let response = self
            .inner
            .client
            .delete(self.endpoint("/cart"))
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // =========================================================================
    // Response handling
    // =========================================================================

    /// Join a route onto the base URL.
    ///
    /// Plain concatenation instead of `Url::join`, which would drop a base
    /// path without a trailing slash (`https://host/v1` + `/cart`).
    fn endpoint(&self, path: &str) -> String {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }

    /// Read the body as text first so parse failures keep their diagnostics.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(Self::error_for_status(status, response).await)
        }
    }

    /// Map a non-success status to the error taxonomy.
    async fn error_for_status(status: StatusCode, response: reqwest::Response) -> ApiError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return ApiError::RateLimited(retry_after);
        }

        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized("Session token rejected".to_string());
        }

        match response.text().await {
            Ok(body) => ApiError::Unexpected {
                status,
                body: body.chars().take(ERROR_BODY_EXCERPT_LEN).collect(),
            },
            Err(e) => ApiError::Http(e),
        }
    }
}
