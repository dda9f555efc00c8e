//! HTTP client utilities.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::scholar::{HttpResponse, HttpTransport, ScholarError, ScholarRequest};

/// Shared HTTP client with sensible defaults
///
/// Headers and the per-request timeout come from the [`ScholarRequest`]; the
/// client itself only fixes connection-level behavior.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, ScholarError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ScholarError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn send(&self, request: &ScholarRequest) -> Result<HttpResponse, ScholarError> {
        let mut builder = self
            .client
            .get(request.url().clone())
            .timeout(request.timeout());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
