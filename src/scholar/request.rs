//! Request builder: turns a query into an outbound request descriptor.

use std::time::Duration;
use url::Url;

use super::{RandomSource, ScholarError, UserAgentPool};
use crate::config::ScholarConfig;
use crate::models::SearchQuery;

const SEARCH_PATH: &str = "/scholar";

/// Outbound GET request descriptor
///
/// Produced by [`RequestBuilder`]; sending it is the job of an
/// [`HttpTransport`](super::HttpTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScholarRequest {
    url: Url,
    headers: Vec<(String, String)>,
    timeout: Duration,
}

impl ScholarRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.header("User-Agent")
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Value of a query-string parameter
    pub fn param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// Builds Scholar search requests
#[derive(Debug)]
pub struct RequestBuilder {
    base_url: Url,
    language: String,
    timeout: Duration,
    agents: UserAgentPool,
}

impl RequestBuilder {
    pub fn new(
        base_url: &str,
        language: impl Into<String>,
        timeout: Duration,
        agents: UserAgentPool,
    ) -> Result<Self, ScholarError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ScholarError::Config(format!(
                "base URL cannot carry a path: {}",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            language: language.into(),
            timeout,
            agents,
        })
    }

    /// Builder configured from settings, drawing agents with `random`
    pub fn from_config(
        config: &ScholarConfig,
        random: Box<dyn RandomSource>,
    ) -> Result<Self, ScholarError> {
        let agents = UserAgentPool::new(config.user_agents.iter().cloned(), random)?;
        Self::new(
            &config.base_url,
            config.language.clone(),
            Duration::from_secs(config.timeout_secs),
            agents,
        )
    }

    /// Build the search request for `query`
    pub fn build(&self, query: &SearchQuery) -> Result<ScholarRequest, ScholarError> {
        query.validate()?;

        let mut url = self.base_url.join(SEARCH_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("hl", &self.language);

            if let Some(cluster) = query.cluster.as_deref().filter(|c| !c.trim().is_empty()) {
                pairs.append_pair("cluster", cluster.trim());
            } else {
                if let Some(words) = non_blank(query.words.as_deref()) {
                    pairs.append_pair("as_q", words);
                }
                if let Some(phrase) = non_blank(Some(&query.phrase)) {
                    pairs.append_pair("as_epq", phrase);
                }
                pairs.append_pair("as_occt", if query.title_only { "title" } else { "any" });
                if let Some(author) = non_blank(query.author.as_deref()) {
                    pairs.append_pair("as_sauthors", author);
                }
                if let Some(years) = query.years {
                    if let Some(from) = years.from {
                        pairs.append_pair("as_ylo", &from.to_string());
                    }
                    if let Some(to) = years.to {
                        pairs.append_pair("as_yhi", &to.to_string());
                    }
                }
                pairs.append_pair("as_vis", if query.include_citations { "0" } else { "1" });
            }

            pairs.append_pair("num", &query.max_results.to_string());
        }

        tracing::debug!(url = %url, "built scholar request");
        Ok(self.request(url))
    }

    /// Plain GET for a full-text URL, with the same header treatment as searches
    pub fn download(&self, target: &str) -> Result<ScholarRequest, ScholarError> {
        let url = Url::parse(target)
            .map_err(|e| ScholarError::InvalidQuery(format!("invalid URL {}: {}", target, e)))?;
        Ok(self.request(url))
    }

    fn request(&self, url: Url) -> ScholarRequest {
        ScholarRequest::get(url, self.timeout)
            .with_header("User-Agent", self.agents.pick())
            .with_header(
                "Accept",
                "text/html,application/xhtml+xml,application/pdf;q=0.9,*/*;q=0.8",
            )
            .with_header("Accept-Language", format!("{},en;q=0.5", self.language))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
