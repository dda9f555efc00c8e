//! Console progress for bibliography downloads.
//!
//! Each entry is reported as a titled block of `key: value` lines. Values
//! reported as results are cross-checked against what was queried (or what an
//! earlier result said) and a warning is printed when they disagree.

use owo_colors::OwoColorize;
use std::collections::HashMap;
use std::io::{self, Write};

/// Width the keys are padded to
const STATUS_LEN: usize = 12;

/// Normalized similarity above which two values count as the same
const SIMILARITY_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Title,
    Info,
    Error,
}

/// Status reporter writing to an arbitrary sink
pub struct StatusReporter {
    verbose: bool,
    color: bool,
    sink: Box<dyn Write + Send>,
    queried: HashMap<String, String>,
    reported: HashMap<String, String>,
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter")
            .field("verbose", &self.verbose)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

impl StatusReporter {
    pub fn new(verbose: bool, color: bool, sink: Box<dyn Write + Send>) -> Self {
        Self {
            verbose,
            color,
            sink,
            queried: HashMap::new(),
            reported: HashMap::new(),
        }
    }

    /// Reporter on stdout, colored when stdout is a terminal
    pub fn stdout(verbose: bool) -> Self {
        use std::io::IsTerminal;
        let color = io::stdout().is_terminal();
        Self::new(verbose, color, Box::new(io::stdout()))
    }

    /// Start a new entry
    pub fn title(&mut self, text: &str) {
        self.finished();
        self.emit("Processing", text, Kind::Title);
    }

    /// Record a value that was searched for
    pub fn query(&mut self, key: &str, text: Option<&str>) {
        let Some(text) = text else { return };
        self.queried.insert(key.to_string(), text.to_string());
        self.emit(key, text, Kind::Info);
    }

    /// Record a value that came back, warning when it contradicts the query
    /// or a previous result for the same key
    pub fn result(&mut self, key: &str, text: Option<&str>) {
        let Some(text) = text else { return };

        if let Some(queried) = self.queried.get(key) {
            if !similar(queried, text) {
                self.emit(key, text, Kind::Info);
                self.warning(&format!("{} mismatch Q", key));
            }
        } else if let Some(previous) = self.reported.get(key) {
            if !similar(previous, text) {
                self.emit(key, text, Kind::Info);
                self.warning(&format!("{} mismatch R", key));
            }
        } else {
            self.reported.insert(key.to_string(), text.to_string());
            self.emit(key, text, Kind::Info);
        }
    }

    pub fn warning(&mut self, text: &str) {
        tracing::warn!("{}", text);
        self.emit("WARNING", text, Kind::Error);
    }

    pub fn error(&mut self, text: &str) {
        self.emit("ERROR", text, Kind::Error);
    }

    /// Forget the current entry's values
    pub fn finished(&mut self) {
        self.queried.clear();
        self.reported.clear();
    }

    fn emit(&mut self, key: &str, text: &str, kind: Kind) {
        if !self.verbose && kind != Kind::Error {
            return;
        }
        let line = format_line(key, text, kind, self.color);
        if let Err(err) = writeln!(self.sink, "{}", line) {
            tracing::debug!(error = %err, "failed to write status line");
        }
    }
}

fn format_line(key: &str, text: &str, kind: Kind, color: bool) -> String {
    match (kind, color) {
        (Kind::Title, false) => format!("\n{} {}", key, text),
        (Kind::Title, true) => format!("\n{} {}", key.bold(), text.yellow()),
        (_, false) => format!("  {:<width$}: {}", key, text, width = STATUS_LEN),
        (Kind::Info, true) => format!(
            "  {}: {}",
            format!("{:<width$}", key, width = STATUS_LEN).blue(),
            text
        ),
        (Kind::Error, true) => format!(
            "{}",
            format!("  {:<width$}: {}", key, text, width = STATUS_LEN).red()
        ),
    }
}

/// Compare two values ignoring case, spacing and punctuation
pub fn similar(first: &str, second: &str) -> bool {
    let collapse = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    };
    let (first, second) = (collapse(first), collapse(second));
    first == second || strsim::normalized_levenshtein(&first, &second) >= SIMILARITY_THRESHOLD
}
