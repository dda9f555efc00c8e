//! Core data models for Scholar queries and the citations they return.

mod citation;
mod query;

pub use citation::{CitationRecord, CitationRecordBuilder};
pub use query::{SearchQuery, YearRange, MAX_RESULTS_PER_PAGE};
