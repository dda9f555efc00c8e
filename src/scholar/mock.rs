//! Mock transport for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{HttpResponse, HttpTransport, ScholarError, ScholarRequest};

/// A transport that answers from predefined routes and records every request.
///
/// A route matches when its needle occurs anywhere in the request URL; the
/// first matching route wins. Unmatched requests fail with a network error.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Vec<(String, HttpResponse)>,
    requests: Mutex<Vec<ScholarRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose URL contains `needle`
    pub fn with_route(
        mut self,
        needle: impl Into<String>,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.routes.push((needle.into(), HttpResponse::new(status, body)));
        self
    }

    /// Requests sent so far, oldest first
    pub fn requests(&self) -> Vec<ScholarRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &ScholarRequest) -> Result<HttpResponse, ScholarError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let url = request.url().as_str();
        self.routes
            .iter()
            .find(|(needle, _)| url.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| ScholarError::Network(format!("no mock route for {}", url)))
    }
}
