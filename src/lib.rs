//! # bibdl
//!
//! Parse a plain-text bibliography and download the PDFs of its entries,
//! locating them through Google Scholar.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (SearchQuery, CitationRecord)
//! - [`scholar`]: Request builder, results-page parser and the client composing them
//! - [`bibliography`]: `[key] Authors. Title. Publication` line parsing
//! - [`fetcher`]: Per-entry PDF lookup with cluster fallback and download
//! - [`utils`]: HTTP transport, citation formatting, URL helpers, status output
//! - [`config`]: Configuration management
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bibdl::config::ScholarConfig;
//! use bibdl::models::SearchQuery;
//! use bibdl::scholar::ScholarClient;
//! use bibdl::utils::HttpClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ScholarClient::new(&ScholarConfig::default(), Arc::new(HttpClient::new()?))?;
//! let records = client.search(&SearchQuery::new("attention is all you need")).await?;
//! for record in &records {
//!     println!("{} ({} citations)", record.title(), record.citation_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bibliography;
pub mod config;
pub mod fetcher;
pub mod models;
pub mod scholar;
pub mod utils;

// Re-export commonly used types
pub use models::{CitationRecord, SearchQuery};
pub use scholar::{ScholarClient, ScholarError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
