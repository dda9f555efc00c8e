//! Search query model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::scholar::ScholarError;

/// Upper bound Scholar accepts for results per page
pub const MAX_RESULTS_PER_PAGE: usize = 20;

/// Inclusive publication-year range; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: Option<u16>,
    pub to: Option<u16>,
}

impl YearRange {
    pub fn new(from: Option<u16>, to: Option<u16>) -> Self {
        Self { from, to }
    }

    /// Range covering a single year
    pub fn single(year: u16) -> Self {
        Self::new(Some(year), Some(year))
    }

    /// Whether `from <= to` when both are set
    pub fn is_ordered(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }
}

impl FromStr for YearRange {
    type Err = String;

    /// Accepts "2020", "2018-2022", "2010-" and "-2015"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn year(part: &str) -> Result<Option<u16>, String> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            part.parse::<u16>()
                .map(Some)
                .map_err(|_| format!("invalid year: {}", part))
        }

        let s = s.trim();
        let range = match s.split_once('-') {
            Some((from, to)) => Self::new(year(from)?, year(to)?),
            None => {
                let y = year(s)?.ok_or_else(|| "empty year range".to_string())?;
                Self::single(y)
            }
        };
        Ok(range)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from == to => write!(f, "{}", from),
            (from, to) => write!(
                f,
                "{}-{}",
                from.map(|y| y.to_string()).unwrap_or_default(),
                to.map(|y| y.to_string()).unwrap_or_default()
            ),
        }
    }
}

/// Search query parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Exact phrase the article must contain
    pub phrase: String,

    /// All of these words, in any order
    pub words: Option<String>,

    /// Author filter
    pub author: Option<String>,

    /// Publication year range
    pub years: Option<YearRange>,

    /// Include citation-only entries ("[CITATION]") in the results
    pub include_citations: bool,

    /// Only match the phrase/words against article titles
    pub title_only: bool,

    /// Maximum number of results on the page
    pub max_results: usize,

    /// Scholar cluster id; lists all versions of one article
    pub cluster: Option<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            phrase: String::new(),
            words: None,
            author: None,
            years: None,
            include_citations: true,
            title_only: false,
            max_results: 10,
            cluster: None,
        }
    }
}

impl SearchQuery {
    /// Create a new phrase query
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            ..Default::default()
        }
    }

    /// Create a query listing every version in a cluster
    pub fn cluster(id: impl Into<String>) -> Self {
        Self {
            cluster: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn words(mut self, words: impl Into<String>) -> Self {
        self.words = Some(words.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn years(mut self, years: YearRange) -> Self {
        self.years = Some(years);
        self
    }

    pub fn include_citations(mut self, include: bool) -> Self {
        self.include_citations = include;
        self
    }

    pub fn title_only(mut self, title_only: bool) -> Self {
        self.title_only = title_only;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Whether this query targets a cluster listing
    pub fn is_cluster(&self) -> bool {
        self.cluster
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    /// Check the query invariants
    ///
    /// A query needs a non-blank phrase or author, unless it is a cluster
    /// listing. Year bounds must be ordered and the page size must be within
    /// `1..=MAX_RESULTS_PER_PAGE`.
    pub fn validate(&self) -> Result<(), ScholarError> {
        if !self.is_cluster() {
            let has_phrase = !self.phrase.trim().is_empty();
            let has_author = self.author.as_deref().is_some_and(|a| !a.trim().is_empty());
            if !has_phrase && !has_author {
                return Err(ScholarError::InvalidQuery(
                    "a phrase or an author is required".to_string(),
                ));
            }
        }

        if let Some(years) = self.years {
            if !years.is_ordered() {
                return Err(ScholarError::InvalidQuery(format!(
                    "year range {} is inverted",
                    years
                )));
            }
        }

        if self.max_results == 0 || self.max_results > MAX_RESULTS_PER_PAGE {
            return Err(ScholarError::InvalidQuery(format!(
                "max results must be between 1 and {}",
                MAX_RESULTS_PER_PAGE
            )));
        }

        Ok(())
    }
}
