//! Bibliography download workflow.
//!
//! For every entry: search Scholar for the title, take the first hit's PDF
//! link, fall back to the hit's "all versions" cluster when the link is missing
//! or blacklisted, then download the file to `<output_dir>/<key>.pdf`.

use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bibliography::{BibEntry, Bibliography};
use crate::config::DownloadConfig;
use crate::models::SearchQuery;
use crate::scholar::{ScholarClient, ScholarError};
use crate::utils::{is_book, strip_url, StatusReporter, UrlBlacklist};

/// Upper bound for `delay_secs` and `min_delay_secs`
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Errors raised while fetching bibliography entries
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Scholar(#[from] ScholarError),

    #[error("Unknown bibliography key: {0}")]
    UnknownKey(String),

    #[error("Invalid URL blacklist: {0}")]
    Blacklist(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid download settings: {0}")]
    Config(String),
}

/// Result of fetching one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The PDF was written to this path
    Downloaded(PathBuf),
    /// Dry run: the PDF was located but not downloaded
    Located(String),
    /// No usable PDF link was found
    NotFound,
}

/// Counts over a whole bibliography run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub located: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl FetchSummary {
    fn record(&mut self, outcome: &Result<FetchOutcome, FetchError>) {
        match outcome {
            Ok(FetchOutcome::Downloaded(_)) => self.downloaded += 1,
            Ok(FetchOutcome::Located(_)) => self.located += 1,
            Ok(FetchOutcome::NotFound) => self.not_found += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.downloaded + self.located + self.not_found + self.failed
    }
}

/// Downloads the PDFs of bibliography entries
#[derive(Debug)]
pub struct Fetcher {
    client: ScholarClient,
    blacklist: UrlBlacklist,
    status: StatusReporter,
    output_dir: PathBuf,
    delay_secs: f64,
    min_delay_secs: f64,
    num_authors: usize,
    dry_run: bool,
}

impl Fetcher {
    pub fn new(
        client: ScholarClient,
        config: &DownloadConfig,
        status: StatusReporter,
    ) -> Result<Self, FetchError> {
        check_delay("delay_secs", config.delay_secs)?;
        check_delay("min_delay_secs", config.min_delay_secs)?;

        Ok(Self {
            client,
            blacklist: UrlBlacklist::new(&config.url_blacklist)?,
            status,
            output_dir: config.output_dir.clone(),
            delay_secs: config.delay_secs,
            min_delay_secs: config.min_delay_secs,
            num_authors: config.num_authors,
            dry_run: false,
        })
    }

    /// Locate PDFs without downloading them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Find a PDF link for the article best matching `phrase`
    pub async fn pdf_url(&mut self, phrase: &str) -> Result<Option<String>, FetchError> {
        let query = SearchQuery::new(phrase).max_results(1);
        let records = self.client.search(&query).await?;

        let Some(article) = records.into_iter().next() else {
            return Ok(None);
        };

        let mut pdf_url = article.pdf_url().map(strip_url);
        let article_url = article.url().map(strip_url);

        self.status.result("Title", Some(article.title()));
        self.status.result("Year", article.year());
        self.status.result("PDF", pdf_url.as_deref());

        if self.blacklist.accept(pdf_url.as_deref()).is_none() {
            pdf_url = None;
            self.status.result("URL", article_url.as_deref());

            if let Some(cluster) = article.cluster_id() {
                let versions = self.client.search(&SearchQuery::cluster(cluster)).await?;

                let candidate = versions.iter().find_map(|version| {
                    let url = version.pdf_url().map(strip_url)?;
                    (!self.blacklist.is_blacklisted(&url)).then(|| (version, url))
                });

                if let Some((version, url)) = candidate {
                    self.status.result("Cluster", Some(cluster));
                    self.status.result("Title", Some(version.title()));
                    self.status.result("Year", version.year());
                    self.status.result("PDF", Some(url.as_str()));
                    pdf_url = Some(url);
                }
            }
        }

        if is_book(pdf_url.as_deref()) || is_book(article_url.as_deref()) {
            self.status.warning("Might be a book");
        }

        Ok(pdf_url)
    }

    /// Fetch one entry by key
    pub async fn single(
        &mut self,
        bibliography: &Bibliography,
        key: &str,
    ) -> Result<FetchOutcome, FetchError> {
        let entry = bibliography
            .get(key)
            .ok_or_else(|| FetchError::UnknownKey(key.to_string()))?;
        let outcome = self.fetch_entry(entry).await;

        if let Err(err) = &outcome {
            self.status.error(&err.to_string());
        }
        self.status.finished();
        outcome
    }

    /// Fetch every entry, pausing between them
    ///
    /// Failures of individual entries are reported and counted; the run
    /// continues with the next entry.
    pub async fn all(&mut self, bibliography: &Bibliography) -> FetchSummary {
        let mut summary = FetchSummary::default();
        let keys: Vec<&str> = bibliography.keys().collect();

        for (i, key) in keys.iter().enumerate() {
            let outcome = self.single(bibliography, key).await;
            summary.record(&outcome);

            if i + 1 < keys.len() {
                tokio::time::sleep(self.pause()).await;
            }
        }

        tracing::info!(
            downloaded = summary.downloaded,
            located = summary.located,
            not_found = summary.not_found,
            failed = summary.failed,
            "bibliography run finished"
        );
        summary
    }

    async fn fetch_entry(&mut self, entry: &BibEntry) -> Result<FetchOutcome, FetchError> {
        self.status.title(&entry.key);
        self.status.query("Title", Some(entry.title.as_str()));
        let authors = entry.main_authors(self.num_authors);
        self.status.query("Authors", Some(authors.as_str()));
        self.status.query("Year", entry.year());

        let Some(url) = self.pdf_url(&entry.title).await? else {
            self.status.error("No PDF found");
            return Ok(FetchOutcome::NotFound);
        };

        if self.dry_run {
            return Ok(FetchOutcome::Located(url));
        }

        let bytes = self.client.download(&url).await?;
        let path = self.output_dir.join(format!("{}.pdf", file_stem(&entry.key)));
        write_file(&path, &bytes).await?;

        let copied = path.display().to_string();
        self.status.result("Copied to", Some(copied.as_str()));
        Ok(FetchOutcome::Downloaded(path))
    }

    /// Jittered pause with mean `delay_secs`, never shorter than `min_delay_secs`
    fn pause(&self) -> Duration {
        let min = self.min_delay_secs.max(0.0);
        let max = (2.0 * self.delay_secs - min).max(min);
        let secs = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }
}

fn check_delay(name: &str, secs: f64) -> Result<(), FetchError> {
    if secs.is_finite() && (0.0..=MAX_DELAY_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(FetchError::Config(format!(
            "{} must be between 0 and {} seconds, got {}",
            name, MAX_DELAY_SECS, secs
        )))
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// ASCII-only file stem for a bibliography key
fn file_stem(key: &str) -> String {
    let stem: String = key
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim().trim_start_matches('.').to_string();
    if stem.is_empty() {
        "entry".to_string()
    } else {
        stem
    }
}
