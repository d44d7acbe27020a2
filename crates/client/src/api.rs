//! HTTP implementation of [`StocktakeBackend`] using [`reqwest`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use itam_core::asset::{Asset, Department, Location, User};
use itam_core::stocktake::{
    CreateSession, CreatedSession, LinePatch, SeedSession, SessionSummary, StocktakeLine,
    StocktakeSession,
};
use itam_core::types::DbId;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::backend::StocktakeBackend;
use crate::config::ClientConfig;
use crate::credentials::CredentialProvider;
use crate::error::ClientError;

/// Response bodies arrive either bare or inside a `{ "data": ... }`
/// envelope, depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(data) => data,
        }
    }
}

/// Decode a success body, accepting both envelope shapes.
pub fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ClientError> {
    let envelope: Envelope<T> = serde_json::from_slice(bytes)?;
    Ok(envelope.into_inner())
}

/// HTTP client for the asset management backend.
pub struct StocktakeApi {
    client: reqwest::Client,
    api_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl StocktakeApi {
    /// Build a client with the configured timeout.
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.api_url.clone(), credentials))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: String,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- private helpers ----

    /// Start a request with the bearer token attached when one is present.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.api_url, path));
        match self.credentials.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and map non-2xx responses to [`ClientError::Api`]. A 401 also
    /// clears the stored credentials.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let err = ClientError::Api {
            status: status.as_u16(),
            body,
        };
        if err.is_unauthorized() {
            tracing::warn!("Backend rejected credentials, clearing stored token");
            self.credentials.clear();
        }
        Err(err)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        let bytes = response.bytes().await?;
        decode_body(&bytes)
    }
}

#[async_trait]
impl StocktakeBackend for StocktakeApi {
    async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        self.fetch("/api/users").await
    }

    async fn list_departments(&self) -> Result<Vec<Department>, ClientError> {
        self.fetch("/api/departments").await
    }

    async fn list_locations(&self) -> Result<Vec<Location>, ClientError> {
        self.fetch("/api/locations").await
    }

    async fn list_assets(&self) -> Result<Vec<Asset>, ClientError> {
        self.fetch("/api/assets").await
    }

    async fn create_session(&self, body: &CreateSession) -> Result<CreatedSession, ClientError> {
        let response = self
            .send(self.request(Method::POST, "/api/stocktake").json(body))
            .await?;
        let bytes = response.bytes().await?;
        decode_body(&bytes)
    }

    async fn seed_session(&self, session_id: DbId, body: &SeedSession) -> Result<(), ClientError> {
        let path = format!("/api/stocktake/{session_id}/seed");
        self.send(self.request(Method::POST, &path).json(body))
            .await?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        self.fetch("/api/stocktake/sessions").await
    }

    async fn get_session(&self, session_id: DbId) -> Result<StocktakeSession, ClientError> {
        self.fetch(&format!("/api/stocktake/{session_id}")).await
    }

    async fn get_lines(&self, session_id: DbId) -> Result<Vec<StocktakeLine>, ClientError> {
        self.fetch(&format!("/api/stocktake/{session_id}/lines"))
            .await
    }

    async fn patch_line(
        &self,
        session_id: DbId,
        line_id: DbId,
        patch: &LinePatch,
    ) -> Result<(), ClientError> {
        let path = format!("/api/stocktake/{session_id}/line/{line_id}");
        self.send(self.request(Method::PATCH, &path).json(patch))
            .await?;
        Ok(())
    }

    async fn close_session(&self, session_id: DbId) -> Result<(), ClientError> {
        let path = format!("/api/stocktake/{session_id}/close");
        self.send(
            self.request(Method::POST, &path)
                .json(&serde_json::json!({})),
        )
        .await?;
        Ok(())
    }
}
