//! Citation record parsed from one row of a Scholar results page.

use serde::{Deserialize, Serialize};

/// One citation entry extracted from a results page.
///
/// Records are immutable once built: fields are private and only exposed
/// through accessors. Use [`CitationRecordBuilder`] to construct one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    title: String,

    #[serde(default)]
    authors: Vec<String>,

    venue: Option<String>,

    year: Option<String>,

    #[serde(default)]
    citation_count: u32,

    url: Option<String>,

    cited_by_url: Option<String>,

    pdf_url: Option<String>,

    cluster_id: Option<String>,

    #[serde(default)]
    versions: u32,
}

impl CitationRecord {
    /// Article title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Authors in page order
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Journal, conference or book the article appeared in
    pub fn venue(&self) -> Option<&str> {
        self.venue.as_deref()
    }

    /// Publication year as printed on the page
    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    /// Number of citing articles; zero when the page shows none
    pub fn citation_count(&self) -> u32 {
        self.citation_count
    }

    /// Link to the article landing page
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Link to the "Cited by" listing
    pub fn cited_by_url(&self) -> Option<&str> {
        self.cited_by_url.as_deref()
    }

    /// Direct full-text link, if Scholar shows one
    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref()
    }

    /// Scholar cluster id grouping all versions of this article
    pub fn cluster_id(&self) -> Option<&str> {
        self.cluster_id.as_deref()
    }

    /// Number of known versions; zero when the page shows none
    pub fn versions(&self) -> u32 {
        self.versions
    }

    /// Authors joined for display
    pub fn author_line(&self) -> String {
        self.authors.join(", ")
    }

    /// Check if the record carries a downloadable full text
    pub fn has_pdf(&self) -> bool {
        self.pdf_url.is_some()
    }
}

/// Builder for constructing CitationRecord objects
#[derive(Debug, Clone)]
pub struct CitationRecordBuilder {
    record: CitationRecord,
}

impl CitationRecordBuilder {
    /// Create a new builder; the title is the only required field
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            record: CitationRecord {
                title: title.into(),
                authors: Vec::new(),
                venue: None,
                year: None,
                citation_count: 0,
                url: None,
                cited_by_url: None,
                pdf_url: None,
                cluster_id: None,
                versions: 0,
            },
        }
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.record.venue = Some(venue.into());
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.record.year = Some(year.into());
        self
    }

    pub fn citation_count(mut self, count: u32) -> Self {
        self.record.citation_count = count;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.record.url = Some(url.into());
        self
    }

    pub fn cited_by_url(mut self, url: impl Into<String>) -> Self {
        self.record.cited_by_url = Some(url.into());
        self
    }

    pub fn pdf_url(mut self, url: impl Into<String>) -> Self {
        self.record.pdf_url = Some(url.into());
        self
    }

    pub fn cluster_id(mut self, id: impl Into<String>) -> Self {
        self.record.cluster_id = Some(id.into());
        self
    }

    pub fn versions(mut self, versions: u32) -> Self {
        self.record.versions = versions;
        self
    }

    /// Build the CitationRecord
    pub fn build(self) -> CitationRecord {
        self.record
    }
}
