//! Citation formatting in various styles.
//!
//! Supports plain text, APA 7th and BibTeX.

use crate::models::CitationRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Citation style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitationStyle {
    /// One block per record with every parsed field
    Plain,
    /// APA 7th edition
    Apa,
    /// BibTeX
    Bibtex,
}

/// Format a record in the specified style
pub fn format_citation(record: &CitationRecord, style: CitationStyle) -> String {
    match style {
        CitationStyle::Plain => format_plain(record),
        CitationStyle::Apa => format_apa(record),
        CitationStyle::Bibtex => format_bibtex(record),
    }
}

/// Format all records, separated by blank lines
pub fn format_citations(records: &[CitationRecord], style: CitationStyle) -> String {
    records
        .iter()
        .map(|r| format_citation(r, style))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_plain(record: &CitationRecord) -> String {
    let mut lines = vec![record.title().to_string()];

    if !record.authors().is_empty() {
        lines.push(format!("  Authors:  {}", record.author_line()));
    }
    if let Some(venue) = record.venue() {
        lines.push(format!("  Venue:    {}", venue));
    }
    if let Some(year) = record.year() {
        lines.push(format!("  Year:     {}", year));
    }
    lines.push(format!("  Cited by: {}", record.citation_count()));
    if let Some(url) = record.url() {
        lines.push(format!("  URL:      {}", url));
    }
    if let Some(pdf) = record.pdf_url() {
        lines.push(format!("  PDF:      {}", pdf));
    }
    if let Some(cited_by) = record.cited_by_url() {
        lines.push(format!("  Citing:   {}", cited_by));
    }

    lines.join("\n")
}

/// Scholar prints "A Vaswani"; APA wants "Vaswani, A."
fn format_author_apa_single(author: &str) -> String {
    let words: Vec<&str> = author.split_whitespace().collect();
    match words.split_last() {
        Some((last, given)) if !given.is_empty() => {
            let initials: Vec<String> = given
                .iter()
                .flat_map(|w| {
                    // "DE" is two initials, "Donald" is one
                    if w.len() <= 3 && w.chars().all(|c| c.is_uppercase()) {
                        w.chars().map(|c| format!("{}.", c)).collect::<Vec<_>>()
                    } else {
                        w.chars().next().map(|c| format!("{}.", c)).into_iter().collect()
                    }
                })
                .collect();
            format!("{}, {}", last, initials.join(" "))
        }
        _ => author.to_string(),
    }
}

/// Format authors as "Last, F. M., & Last, F. M."
fn format_authors_apa(authors: &[String]) -> String {
    let formatted: Vec<String> = authors.iter().map(|a| format_author_apa_single(a)).collect();

    match formatted.as_slice() {
        [] => "Anonymous".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{}, & {}", first, second),
        [rest @ .., last] => format!("{}, & {}", rest.join(", "), last),
    }
}

/// Format record in APA 7th edition
/// Format: Author, A. A., & Author, B. B. (Year). Title. Venue. URL
fn format_apa(record: &CitationRecord) -> String {
    let authors = format_authors_apa(record.authors());
    let year = record.year().unwrap_or("n.d.");

    let mut citation = format!("{} ({}). {}.", authors, year, record.title());
    if let Some(venue) = record.venue() {
        citation.push_str(&format!(" {}.", venue));
    }
    if let Some(url) = record.url() {
        citation.push_str(&format!(" {}", url));
    }
    citation
}

/// Citation key: first author's last name, year, first title word
pub fn bibtex_key(record: &CitationRecord) -> String {
    let last_name = record
        .authors()
        .first()
        .and_then(|a| a.split_whitespace().last())
        .unwrap_or("unknown");
    let year = record.year().unwrap_or("");
    let title_word = record
        .title()
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .find(|w| w.len() > 3)
        .unwrap_or_default();

    format!("{}{}{}", last_name, year, title_word)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn bibtex_escape(value: &str) -> String {
    value.replace('{', "\\{").replace('}', "\\}")
}

/// Generate a BibTeX entry
/// Format: @article{key,
///   author = {Vaswani, A and Shazeer, N},
///   title = {Title},
///   journal = {Venue},
///   year = {Year},
///   url = {URL}
/// }
fn format_bibtex(record: &CitationRecord) -> String {
    let authors = record
        .authors()
        .iter()
        .map(|a| {
            let words: Vec<&str> = a.split_whitespace().collect();
            match words.split_last() {
                Some((last, given)) if !given.is_empty() => {
                    format!("{}, {}", last, given.join(" "))
                }
                _ => a.clone(),
            }
        })
        .collect::<Vec<_>>()
        .join(" and ");

    let mut fields = vec![format!("  title = {{{}}}", bibtex_escape(record.title()))];
    if !authors.is_empty() {
        fields.push(format!("  author = {{{}}}", bibtex_escape(&authors)));
    }
    if let Some(venue) = record.venue() {
        fields.push(format!("  journal = {{{}}}", bibtex_escape(venue)));
    }
    if let Some(year) = record.year() {
        fields.push(format!("  year = {{{}}}", year));
    }
    if let Some(url) = record.url() {
        fields.push(format!("  url = {{{}}}", url));
    }
    if record.citation_count() > 0 {
        fields.push(format!("  note = {{Cited by {}}}", record.citation_count()));
    }

    format!("@article{{{},\n{}\n}}", bibtex_key(record), fields.join(",\n"))
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CitationStyle::Plain => write!(f, "Plain"),
            CitationStyle::Apa => write!(f, "APA 7th"),
            CitationStyle::Bibtex => write!(f, "BibTeX"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CitationRecordBuilder;

    fn record() -> CitationRecord {
        CitationRecordBuilder::new("Attention is all you need")
            .authors(["A Vaswani", "N Shazeer", "N Parmar"])
            .venue("Advances in neural information processing systems")
            .year("2017")
            .citation_count(100)
            .url("https://proceedings.neurips.cc/paper/7181")
            .build()
    }

    #[test]
    fn test_plain() {
        let text = format_citation(&record(), CitationStyle::Plain);
        assert!(text.starts_with("Attention is all you need\n"));
        assert!(text.contains("Authors:  A Vaswani, N Shazeer, N Parmar"));
        assert!(text.contains("Cited by: 100"));
        assert!(!text.contains("PDF:"));
    }

    #[test]
    fn test_apa() {
        let text = format_citation(&record(), CitationStyle::Apa);
        assert_eq!(
            text,
            "Vaswani, A., Shazeer, N., & Parmar, N. (2017). Attention is all you need. \
             Advances in neural information processing systems. https://proceedings.neurips.cc/paper/7181"
        );
    }

    #[test]
    fn test_apa_initials() {
        assert_eq!(format_author_apa_single("DE Knuth"), "Knuth, D. E.");
        assert_eq!(format_author_apa_single("Donald Knuth"), "Knuth, D.");
        assert_eq!(format_author_apa_single("Plato"), "Plato");
    }

    #[test]
    fn test_apa_without_authors_or_year() {
        let record = CitationRecordBuilder::new("Untitled").build();
        assert_eq!(
            format_citation(&record, CitationStyle::Apa),
            "Anonymous (n.d.). Untitled."
        );
    }

    #[test]
    fn test_bibtex() {
        let text = format_citation(&record(), CitationStyle::Bibtex);
        assert!(text.starts_with("@article{vaswani2017attention,\n"));
        assert!(text.contains("  author = {Vaswani, A and Shazeer, N and Parmar, N}"));
        assert!(text.contains("  year = {2017}"));
        assert!(text.contains("  note = {Cited by 100}"));
        assert!(text.ends_with("\n}"));
    }

    #[test]
    fn test_bibtex_escapes_braces() {
        let record = CitationRecordBuilder::new("Sets {a, b}").build();
        let text = format_citation(&record, CitationStyle::Bibtex);
        assert!(text.contains("title = {Sets \\{a, b\\}}"));
        assert!(text.starts_with("@article{unknownsets,"));
    }

    #[test]
    fn test_format_citations_joins() {
        let records = vec![record(), record()];
        let text = format_citations(&records, CitationStyle::Apa);
        assert_eq!(text.matches("\n\n").count(), 1);
    }
}
