//! Scholar client: request builder + transport + parser.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::{
    RandomSource, RequestBuilder, ResultParser, ScholarError, ScholarRequest, ThreadRandom,
};
use crate::config::ScholarConfig;
use crate::models::{CitationRecord, SearchQuery};

/// Raw response handed back by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP capability supplied by the surrounding program
///
/// Implementations perform exactly one request per call and report transport
/// failures as [`ScholarError::Network`]. Status codes are returned as-is.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    async fn send(&self, request: &ScholarRequest) -> Result<HttpResponse, ScholarError>;
}

/// Queries Scholar and parses the results
#[derive(Debug)]
pub struct ScholarClient {
    builder: RequestBuilder,
    parser: ResultParser,
    transport: Arc<dyn HttpTransport>,
}

impl ScholarClient {
    pub fn new(
        config: &ScholarConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ScholarError> {
        Self::with_random(config, transport, Box::new(ThreadRandom))
    }

    /// Client whose user-agent draws come from `random`
    pub fn with_random(
        config: &ScholarConfig,
        transport: Arc<dyn HttpTransport>,
        random: Box<dyn RandomSource>,
    ) -> Result<Self, ScholarError> {
        Ok(Self {
            builder: RequestBuilder::from_config(config, random)?,
            parser: ResultParser::new(&config.selectors, &config.base_url)?,
            transport,
        })
    }

    /// Run one query: build, fetch once, parse
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<CitationRecord>, ScholarError> {
        let request = self.builder.build(query)?;
        let response = self.fetch(&request).await?;

        let body = response.text();
        let records: Vec<CitationRecord> = self.parser.parse(&body)?.records().collect();

        tracing::info!(count = records.len(), "parsed scholar results");
        Ok(records)
    }

    /// Download a full-text document
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ScholarError> {
        let request = self.builder.download(url)?;
        Ok(self.fetch(&request).await?.body)
    }

    async fn fetch(&self, request: &ScholarRequest) -> Result<HttpResponse, ScholarError> {
        tracing::debug!(url = %request.url(), "sending request");
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(ScholarError::Http {
                status: response.status,
                url: request.url().to_string(),
            });
        }

        Ok(response)
    }
}
