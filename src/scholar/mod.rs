//! Google Scholar querier and results-page parser.
//!
//! The pieces compose linearly:
//!
//! - [`RequestBuilder`] turns a [`SearchQuery`](crate::models::SearchQuery) into a
//!   [`ScholarRequest`] with a randomized user agent drawn from a [`UserAgentPool`]
//! - an [`HttpTransport`] performs the fetch (the reqwest-backed
//!   [`HttpClient`](crate::utils::HttpClient) in production)
//! - [`ResultParser`] turns the returned HTML into a lazy sequence of
//!   [`CitationRecord`](crate::models::CitationRecord)s
//!
//! [`ScholarClient`] wires the three together. It performs exactly one fetch per
//! call and never retries; pacing between queries is left to the caller.

mod client;
mod parser;
mod request;
mod user_agent;

pub mod mock;

pub use client::{HttpResponse, HttpTransport, ScholarClient};
pub use mock::MockTransport;
pub use parser::{ParserRules, Records, ResultPage, ResultParser};
pub use request::{RequestBuilder, ScholarRequest};
pub use user_agent::{
    RandomSource, ScriptedRandom, SeededRandom, ThreadRandom, UserAgentPool, DEFAULT_USER_AGENTS,
};

/// Errors raised while querying Scholar
#[derive(Debug, thiserror::Error)]
pub enum ScholarError {
    /// The query violates its invariants; never retried
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The body is not a recognizable results page (block or CAPTCHA page, empty body)
    #[error("Malformed results page: {0}")]
    MalformedPage(String),

    /// Upstream answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Transport failure (connect, TLS, timeout, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid settings (empty user-agent pool, bad selector, bad base URL)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ScholarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScholarError::Network(format!("request timed out: {}", err))
        } else {
            ScholarError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for ScholarError {
    fn from(err: url::ParseError) -> Self {
        ScholarError::Config(format!("URL: {}", err))
    }
}
