//! HTTP client for the album API.
//!
//! Provides a minimal client with bearer authentication through [`AuthContext`],
//! generic GET/POST helpers, and domain methods (presigned URLs, album creation).
//! An expired or rejected access token is refreshed once through the shared guard
//! and the request replayed; a second rejection is reported as `Unauthorized`.

pub mod api;
pub mod auth;
pub mod store;

use album_core::{AppError, ClientConfig};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

pub use auth::{AuthContext, HttpTokenRefresher, TokenRefresher};
pub use store::{FileTokenStore, MemoryTokenStore, StoredCredentials, TokenStore};

/// HTTP client for the album API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    prefix: String,
    auth: AuthContext,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        prefix: &str,
        timeout: Duration,
        auth: AuthContext,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
            auth,
        })
    }

    /// Client plus its [`AuthContext`], with credentials restored from the file store.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let prefix = config.api_prefix();
        let refresher = Arc::new(HttpTokenRefresher::new(
            &config.api_url,
            &prefix,
            config.timeout,
        )?);
        let store = Arc::new(FileTokenStore::new(config.token_store_path.clone()));
        let auth = AuthContext::load(store, refresher, config.refresh_skew)?;

        Self::new(&config.api_url, &prefix, config.timeout, auth)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API path prefix, e.g. `/api/v1`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Absolute URL of an API path given relative to the prefix.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = self.build_url(path);
        let response = self
            .send_authorized(|client| {
                let request = client.get(&url);
                if query.is_empty() {
                    request
                } else {
                    request.query(query)
                }
            })
            .await?;
        parse_json(response).await
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let url = self.build_url(path);
        let response = self
            .send_authorized(|client| client.post(&url).json(body))
            .await?;
        parse_json(response).await
    }

    /// Send with a bearer token; on 401 refresh once and replay.
    async fn send_authorized<F>(&self, build: F) -> Result<Response, AppError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self
            .auth
            .get_access_token()
            .await
            .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

        let response = send(build(&self.client).bearer_auth(&token.value)).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!("Access token rejected, refreshing and retrying once");
        self.auth.invalidate_access_token(&token);
        let token = self.auth.get_access_token().await.ok_or_else(|| {
            AppError::Unauthorized("Session expired, please log in again".to_string())
        })?;

        let response = send(build(&self.client).bearer_auth(&token.value)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Unauthorized(body));
        }
        Ok(response)
    }
}

async fn send(request: RequestBuilder) -> Result<Response, AppError> {
    request.send().await.map_err(|e| {
        tracing::debug!(error = %e, "API request failed to send");
        AppError::Network(e.to_string())
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AppError::Api {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to parse response as JSON: {}", e)))
}
