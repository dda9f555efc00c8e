//! Full-text URL helpers: redirect stripping, host blacklist, book detection.

use regex::Regex;
use url::Url;

/// Unwrap Scholar redirect links to the target URL
///
/// Handles the `https://scholar.google.com/https://host/...`,
/// `/url?q=https://host/...` and `/scholar_url?url=https://host/...` forms;
/// anything else is returned unchanged.
pub fn strip_url(url: &str) -> String {
    let url = url.trim();

    if let Some(pos) = url.find("scholar.google.com/") {
        let rest = &url[pos + "scholar.google.com/".len()..];
        if rest.starts_with("http") {
            return rest.to_string();
        }
    }

    if let Ok(parsed) = Url::parse(url) {
        if matches!(parsed.path(), "/url" | "/scholar_url") {
            if let Some((_, target)) = parsed
                .query_pairs()
                .find(|(k, v)| (k == "q" || k == "url") && v.starts_with("http"))
            {
                return target.into_owned();
            }
        }
    }

    url.to_string()
}

/// Whether `url` points at Google Books, or is missing entirely
pub fn is_book(url: Option<&str>) -> bool {
    match url {
        None => true,
        Some(url) => Url::parse(url)
            .ok()
            .and_then(|u| {
                u.host_str()
                    .map(|h| h == "books.google.com" || h.ends_with(".books.google.com"))
            })
            .unwrap_or(false),
    }
}

/// Hosts whose full-text links never lead to a direct PDF
#[derive(Debug, Clone)]
pub struct UrlBlacklist {
    patterns: Vec<Regex>,
}

impl UrlBlacklist {
    /// Compile the given regex patterns
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    /// `url` when present and not blacklisted
    pub fn accept<'a>(&self, url: Option<&'a str>) -> Option<&'a str> {
        url.filter(|u| !self.is_blacklisted(u))
    }
}
