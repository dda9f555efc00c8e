//! Plain-text bibliography parsing.
//!
//! One entry per line, in the form
//!
//! ```text
//! [key] Authors. Title. Publication details, 2019.
//! ```
//!
//! Lines that do not match are ignored.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// One bibliography line split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub key: String,
    pub authors: String,
    pub title: String,
    pub publication: String,
}

impl BibEntry {
    /// Last standalone four-digit number in the publication details
    pub fn year(&self) -> Option<&str> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"));
        re.find_iter(&self.publication)
            .map(|m| m.as_str())
            .filter(|digits| digits.len() == 4)
            .last()
    }

    /// The first `n` authors, comma separated
    pub fn main_authors(&self, n: usize) -> String {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r",(?:\s*and)?\s*").expect("static regex"));
        re.split(&self.authors)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .take(n)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Errors raised while reading a bibliography
#[derive(Debug, thiserror::Error)]
pub enum BibliographyError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Entries keyed by citation key
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: BTreeMap<String, BibEntry>,
}

fn entry_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[([^\]]+)\]\s*(.*?[\w?)]{2})\.\s*(.*?)\.\s*(.*)$").expect("static regex")
    })
}

impl Bibliography {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single line; `None` when it is not a bibliography entry
    pub fn parse_line(line: &str) -> Option<BibEntry> {
        let caps = entry_pattern().captures(line.trim())?;
        Some(BibEntry {
            key: caps[1].trim().to_string(),
            authors: caps[2].trim().to_string(),
            title: caps[3].trim().to_string(),
            publication: caps[4].trim().to_string(),
        })
    }

    /// Add every entry found in `text`; returns how many were added
    ///
    /// A repeated key replaces the earlier entry and logs a warning.
    pub fn parse_str(&mut self, text: &str) -> usize {
        let mut added = 0;
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some(entry) = Self::parse_line(line) else {
                tracing::debug!(line, "skipping unrecognized bibliography line");
                continue;
            };
            if self.entries.contains_key(&entry.key) {
                tracing::warn!(key = %entry.key, "duplicate bibliography key");
            }
            self.entries.insert(entry.key.clone(), entry);
            added += 1;
        }
        added
    }

    /// Read and parse a bibliography file
    pub fn load(&mut self, path: &Path) -> Result<usize, BibliographyError> {
        let text = std::fs::read_to_string(path).map_err(|source| BibliographyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let added = self.parse_str(&text);
        tracing::info!(path = %path.display(), entries = added, "loaded bibliography");
        Ok(added)
    }

    pub fn get(&self, key: &str) -> Option<&BibEntry> {
        self.entries.get(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
[VSP17] A. Vaswani, N. Shazeer, N. Parmar, and J. Uszkoreit. Attention is all you need. In Advances in NIPS 30, pages 5998-6008, 2017.

this line is noise
[Knu68] D. E. Knuth. The Art of Computer Programming. Addison-Wesley, 1968.
";

    #[test]
    fn test_parse_line() {
        let entry = Bibliography::parse_line(
            "[Knu68] D. E. Knuth. The Art of Computer Programming. Addison-Wesley, 1968.",
        )
        .unwrap();

        assert_eq!(entry.key, "Knu68");
        assert_eq!(entry.authors, "D. E. Knuth");
        assert_eq!(entry.title, "The Art of Computer Programming");
        assert_eq!(entry.publication, "Addison-Wesley, 1968.");
    }

    #[test]
    fn test_parse_line_rejects_noise() {
        assert_eq!(Bibliography::parse_line("no key here. at all."), None);
        assert_eq!(Bibliography::parse_line(""), None);
    }

    #[test]
    fn test_parse_str() {
        let mut bib = Bibliography::new();
        assert_eq!(bib.parse_str(SAMPLE), 2);
        assert_eq!(bib.keys().collect::<Vec<_>>(), ["Knu68", "VSP17"]);

        let entry = bib.get("VSP17").unwrap();
        assert_eq!(entry.title, "Attention is all you need");
        assert_eq!(entry.year(), Some("2017"));
        assert_eq!(entry.main_authors(3), "A. Vaswani, N. Shazeer, N. Parmar");
    }

    #[test]
    fn test_duplicate_key_replaces() {
        let mut bib = Bibliography::new();
        bib.parse_str("[k] A. Author. First title. Pub, 2000.");
        bib.parse_str("[k] A. Author. Second title. Pub, 2001.");
        assert_eq!(bib.len(), 1);
        assert_eq!(bib.get("k").unwrap().title, "Second title");
    }

    #[test]
    fn test_year() {
        let entry = |publication: &str| BibEntry {
            key: "k".into(),
            authors: "a".into(),
            title: "t".into(),
            publication: publication.into(),
        };
        assert_eq!(entry("Vol. 12, pp. 100-120, 1999").year(), Some("1999"));
        assert_eq!(entry("1999-2004").year(), Some("2004"));
        assert_eq!(entry("ISBN 9780201896831").year(), None);
        assert_eq!(entry("forthcoming").year(), None);
    }

    #[test]
    fn test_main_authors_and_separator() {
        let entry = BibEntry {
            key: "k".into(),
            authors: "A. One, B. Two, and C. Three".into(),
            title: "t".into(),
            publication: "p".into(),
        };
        assert_eq!(entry.main_authors(2), "A. One, B. Two");
        assert_eq!(entry.main_authors(10), "A. One, B. Two, C. Three");
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("refs.txt");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut bib = Bibliography::new();
        assert_eq!(bib.load(&path).unwrap(), 2);

        let missing = bib.load(&dir.path().join("missing.txt"));
        assert!(matches!(missing, Err(BibliographyError::Io { .. })));
    }
}
