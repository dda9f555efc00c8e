//! Results-page parser.
//!
//! Extraction is split into one rule per field. Every rule tolerates absence,
//! so unknown markup inside an otherwise valid page only costs the affected
//! field. Rows without a recognizable title are skipped.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use url::Url;

use super::ScholarError;
use crate::models::{CitationRecord, CitationRecordBuilder};

/// CSS selectors and block markers describing the upstream page layout
///
/// The upstream markup drifts over time, so none of this is hard-coded: it is
/// loaded from the `[scholar.selectors]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserRules {
    /// One result row
    pub row: String,

    /// Heading holding the title, relative to a row
    pub title: String,

    /// Title link, relative to a row
    pub title_link: String,

    /// "Authors - venue, year - publisher" line
    pub byline: String,

    /// Footer links ("Cited by", "All versions", ...)
    pub footer_links: String,

    /// Side link to a full-text copy
    pub pdf_link: String,

    /// Case-insensitive substrings that only occur on block/CAPTCHA pages
    pub block_markers: Vec<String>,

    /// Selectors that only match on block/CAPTCHA pages
    pub block_selectors: Vec<String>,
}

impl Default for ParserRules {
    fn default() -> Self {
        Self {
            row: "div.gs_r.gs_or".to_string(),
            title: "h3.gs_rt".to_string(),
            title_link: "h3.gs_rt a".to_string(),
            byline: "div.gs_a".to_string(),
            footer_links: "div.gs_fl a".to_string(),
            pdf_link: "div.gs_ggs a, div.gs_or_ggsm a".to_string(),
            block_markers: vec![
                "our systems have detected unusual traffic".to_string(),
                "please show you're not a robot".to_string(),
                "/sorry/index".to_string(),
            ],
            block_selectors: vec![
                "#gs_captcha_ccl".to_string(),
                "form#captcha-form".to_string(),
                "div.g-recaptcha".to_string(),
            ],
        }
    }
}

#[derive(Debug)]
struct CompiledRules {
    row: Selector,
    title: Selector,
    title_link: Selector,
    byline: Selector,
    footer_links: Selector,
    pdf_link: Selector,
    block_markers: Vec<String>,
    block_selectors: Vec<Selector>,
}

impl CompiledRules {
    fn compile(rules: &ParserRules) -> Result<Self, ScholarError> {
        Ok(Self {
            row: selector(&rules.row)?,
            title: selector(&rules.title)?,
            title_link: selector(&rules.title_link)?,
            byline: selector(&rules.byline)?,
            footer_links: selector(&rules.footer_links)?,
            pdf_link: selector(&rules.pdf_link)?,
            block_markers: rules
                .block_markers
                .iter()
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
            block_selectors: rules
                .block_selectors
                .iter()
                .map(|s| selector(s))
                .collect::<Result<_, _>>()?,
        })
    }
}

fn selector(css: &str) -> Result<Selector, ScholarError> {
    Selector::parse(css)
        .map_err(|e| ScholarError::Config(format!("invalid selector {:?}: {}", css, e)))
}

/// Parses Scholar results pages
#[derive(Debug, Clone)]
pub struct ResultParser {
    rules: Arc<CompiledRules>,
    base_url: Url,
}

impl ResultParser {
    /// Compile `rules`; relative links on the page resolve against `base_url`
    pub fn new(rules: &ParserRules, base_url: &str) -> Result<Self, ScholarError> {
        Ok(Self {
            rules: Arc::new(CompiledRules::compile(rules)?),
            base_url: Url::parse(base_url)?,
        })
    }

    /// Parse one page
    ///
    /// Fails with [`ScholarError::MalformedPage`] when the body is empty or a
    /// block marker is present. A page without markers and without rows is a
    /// legitimate empty result.
    pub fn parse(&self, html: &str) -> Result<ResultPage, ScholarError> {
        if html.trim().is_empty() {
            return Err(ScholarError::MalformedPage("empty response body".to_string()));
        }

        let lowered = html.to_lowercase();
        if let Some(marker) = self
            .rules
            .block_markers
            .iter()
            .find(|m| lowered.contains(m.as_str()))
        {
            tracing::warn!(marker = %marker, "scholar returned a block page");
            return Err(ScholarError::MalformedPage(format!(
                "block page detected (marker {:?})",
                marker
            )));
        }

        let document = Html::parse_document(html);
        if self
            .rules
            .block_selectors
            .iter()
            .any(|s| document.select(s).next().is_some())
        {
            tracing::warn!("scholar returned a CAPTCHA page");
            return Err(ScholarError::MalformedPage(
                "CAPTCHA form detected".to_string(),
            ));
        }

        Ok(ResultPage {
            document,
            rules: Arc::clone(&self.rules),
            base_url: self.base_url.clone(),
        })
    }
}

/// A parsed results page
///
/// Records are extracted lazily; [`records`](Self::records) may be called any
/// number of times and always yields the same rows in document order.
#[derive(Debug)]
pub struct ResultPage {
    document: Html,
    rules: Arc<CompiledRules>,
    base_url: Url,
}

impl ResultPage {
    pub fn records(&self) -> Records<'_> {
        Records {
            rows: self.document.select(&self.rules.row),
            extractor: RowExtractor {
                rules: &self.rules,
                base_url: &self.base_url,
            },
        }
    }
}

/// Lazy iterator over the citation records of a [`ResultPage`]
pub struct Records<'a> {
    rows: scraper::html::Select<'a, 'a>,
    extractor: RowExtractor<'a>,
}

impl Iterator for Records<'_> {
    type Item = CitationRecord;

    fn next(&mut self) -> Option<Self::Item> {
        for row in self.rows.by_ref() {
            match self.extractor.record(&row) {
                Some(record) => return Some(record),
                None => tracing::debug!("skipping result row without a title"),
            }
        }
        None
    }
}

/// Fields parsed out of the byline
#[derive(Debug, Default, PartialEq, Eq)]
struct Byline {
    authors: Vec<String>,
    venue: Option<String>,
    year: Option<String>,
}

struct RowExtractor<'a> {
    rules: &'a CompiledRules,
    base_url: &'a Url,
}

impl RowExtractor<'_> {
    fn record(&self, row: &ElementRef) -> Option<CitationRecord> {
        let title = self.title(row)?;
        let mut builder = CitationRecordBuilder::new(title);

        let byline = self.byline(row).unwrap_or_default();
        builder = builder.authors(byline.authors);
        if let Some(venue) = byline.venue {
            builder = builder.venue(venue);
        }
        if let Some(year) = byline.year {
            builder = builder.year(year);
        }
        if let Some(url) = self.url(row) {
            builder = builder.url(url);
        }
        if let Some(pdf) = self.pdf_url(row) {
            builder = builder.pdf_url(pdf);
        }
        if let Some((count, url)) = self.cited_by(row) {
            builder = builder.citation_count(count).cited_by_url(url);
        }
        if let Some(versions) = self.versions(row) {
            builder = builder.versions(versions);
        }
        if let Some(cluster) = self.cluster_id(row) {
            builder = builder.cluster_id(cluster);
        }

        Some(builder.build())
    }

    /// Heading text without "[PDF]"/"[CITATION]" style tags
    fn title(&self, row: &ElementRef) -> Option<String> {
        let heading = row.select(&self.rules.title).next()?;
        let text = match row.select(&self.rules.title_link).next() {
            Some(link) => element_text(&link),
            None => element_text(&heading),
        };
        let title = tag_prefix().replace(&text, "").trim().to_string();
        (!title.is_empty()).then_some(title)
    }

    fn url(&self, row: &ElementRef) -> Option<String> {
        let link = row.select(&self.rules.title_link).next()?;
        self.resolve(link.value().attr("href")?)
    }

    fn pdf_url(&self, row: &ElementRef) -> Option<String> {
        let link = row.select(&self.rules.pdf_link).next()?;
        self.resolve(link.value().attr("href")?)
    }

    fn byline(&self, row: &ElementRef) -> Option<Byline> {
        let line = row.select(&self.rules.byline).next()?;
        Some(parse_byline(&element_text(&line)))
    }

    /// Count and absolute URL of the "Cited by N" link
    fn cited_by(&self, row: &ElementRef) -> Option<(u32, String)> {
        let link = self.footer_link(row, "cites=")?;
        let url = self.resolve(link.value().attr("href")?)?;
        let count = first_number(&element_text(&link)).unwrap_or(0);
        Some((count, url))
    }

    fn versions(&self, row: &ElementRef) -> Option<u32> {
        let link = self.footer_link(row, "cluster=")?;
        first_number(&element_text(&link))
    }

    /// Cluster id from the versions link, falling back to the cites link
    fn cluster_id(&self, row: &ElementRef) -> Option<String> {
        ["cluster", "cites"].into_iter().find_map(|param| {
            let link = self.footer_link(row, &format!("{}=", param))?;
            let url = self.resolve(link.value().attr("href")?)?;
            let url = Url::parse(&url).ok()?;
            let value = url
                .query_pairs()
                .find(|(k, _)| k == param)
                .map(|(_, v)| v.into_owned())?;
            (!value.is_empty()).then_some(value)
        })
    }

    fn footer_link<'b>(&self, row: &ElementRef<'b>, needle: &str) -> Option<ElementRef<'b>> {
        row.select(&self.rules.footer_links)
            .find(|a| a.value().attr("href").is_some_and(|h| h.contains(needle)))
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") {
            return None;
        }
        self.base_url.join(href).ok().map(String::from)
    }
}

/// Concatenated text of an element with whitespace collapsed
fn element_text(element: &ElementRef) -> String {
    let text: String = element.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tag_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*\[[A-Z]+\])+\s*").expect("static regex"))
}

fn year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").expect("static regex"))
}

/// First integer in `text`, ignoring thousands separators
fn first_number(text: &str) -> Option<u32> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d[\d,.]*").expect("static regex"));
    let digits: String = re
        .find(text)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Split "A Smith, B Jones - Journal of Things, 2019 - publisher.com"
fn parse_byline(text: &str) -> Byline {
    let text = text.replace('\u{a0}', " ");
    let segments: Vec<&str> = text.split(" - ").map(str::trim).collect();

    let authors = segments
        .first()
        .map(|s| {
            s.split(',')
                .map(|a| a.trim().trim_end_matches('…').trim())
                .filter(|a| !a.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let mut byline = Byline {
        authors,
        ..Default::default()
    };

    let Some(details) = segments.get(1) else {
        return byline;
    };

    if let Some(m) = year_pattern().find_iter(details).last() {
        byline.year = Some(m.as_str().to_string());
        let venue = format!("{}{}", &details[..m.start()], &details[m.end()..]);
        byline.venue = clean_venue(&venue);
    } else if segments.len() > 2 || !looks_like_domain(details) {
        byline.venue = clean_venue(details);
    }

    byline
}

fn clean_venue(venue: &str) -> Option<String> {
    let venue = venue
        .trim()
        .trim_matches(|c: char| c == ',' || c == '-' || c.is_whitespace())
        .trim_start_matches('…')
        .trim();
    (!venue.is_empty()).then(|| venue.to_string())
}

fn looks_like_domain(text: &str) -> bool {
    !text.contains(' ') && text.contains('.')
}
