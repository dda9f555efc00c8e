//! Utility modules supporting Scholar queries and downloads.
//!
//! - [`HttpClient`]: reqwest-backed [`HttpTransport`](crate::scholar::HttpTransport)
//! - [`format_citation`]: render a record as plain text, APA or BibTeX
//! - [`strip_url`], [`is_book`], [`UrlBlacklist`]: full-text link handling
//! - [`StatusReporter`]: colored per-entry progress with mismatch warnings
//!
//! # Citation formatting
//!
//! ```rust
//! use bibdl::models::CitationRecordBuilder;
//! use bibdl::utils::{format_citation, CitationStyle};
//!
//! let record = CitationRecordBuilder::new("The art of computer programming")
//!     .authors(["DE Knuth"])
//!     .year("1968")
//!     .build();
//! assert_eq!(
//!     format_citation(&record, CitationStyle::Apa),
//!     "Knuth, D. E. (1968). The art of computer programming."
//! );
//! ```

mod cite;
mod http;
mod status;
mod urls;

pub use cite::{bibtex_key, format_citation, format_citations, CitationStyle};
pub use http::HttpClient;
pub use status::{similar, StatusReporter};
pub use urls::{is_book, strip_url, UrlBlacklist};
