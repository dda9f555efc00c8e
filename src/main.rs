use anyhow::{bail, Context, Result};
use bibdl::bibliography::Bibliography;
use bibdl::config::{find_config_file, load_config, Config};
use bibdl::fetcher::{FetchOutcome, Fetcher};
use bibdl::models::{CitationRecord, SearchQuery, YearRange};
use bibdl::scholar::ScholarClient;
use bibdl::utils::{format_citations, CitationStyle, HttpClient, StatusReporter};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// bibdl - Parse a bibliography and download the PDFs via Google Scholar
#[derive(Parser, Debug)]
#[command(name = "bibdl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parse a bibliography and download the PDFs of its entries", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times: -v, -vv)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress status output and non-error logs
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for search results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text, one block per record
    Plain,
    /// APA 7th citations
    Apa,
    /// BibTeX entries
    Bibtex,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query Google Scholar and print the parsed citations
    #[command(alias = "s")]
    Search {
        /// Exact phrase to search for
        phrase: Option<String>,

        /// Author filter
        #[arg(long, short)]
        author: Option<String>,

        /// All of these words, in any order
        #[arg(long, short)]
        words: Option<String>,

        /// Earliest publication year
        #[arg(long)]
        year_from: Option<u16>,

        /// Latest publication year
        #[arg(long)]
        year_to: Option<u16>,

        /// Only match against article titles
        #[arg(long)]
        title_only: bool,

        /// Leave out citation-only entries
        #[arg(long)]
        no_citations: bool,

        /// Maximum number of results (1-20)
        #[arg(long, short, default_value_t = 10)]
        max_results: usize,

        /// List all versions of a Scholar cluster instead of searching
        #[arg(long)]
        cluster: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Auto)]
        format: OutputFormat,

        /// Write results to this file instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Download the PDFs of bibliography entries
    #[command(alias = "f")]
    Fetch {
        /// Bibliography files, one `[key] Authors. Title. Publication` entry per line
        #[arg(required = true)]
        bibliographies: Vec<PathBuf>,

        /// Fetch this key only
        #[arg(long, short)]
        key: Option<String>,

        /// Directory the PDFs are written to
        #[arg(long, short = 'd')]
        output_dir: Option<PathBuf>,

        /// Locate the PDFs without downloading them
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Target path (default: <config dir>/bibdl/config.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load config from environment".to_string(),
    })?;
    if let Some(timeout) = cli.timeout {
        config.scholar.timeout_secs = timeout;
    }

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("bibdl={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        Commands::Search {
            phrase,
            author,
            words,
            year_from,
            year_to,
            title_only,
            no_citations,
            max_results,
            cluster,
            format,
            out,
        } => {
            let mut query = match cluster {
                Some(cluster) => SearchQuery::cluster(cluster),
                None => SearchQuery::new(phrase.unwrap_or_default()),
            }
            .include_citations(!no_citations)
            .title_only(title_only)
            .max_results(max_results);

            if let Some(author) = author {
                query = query.author(author);
            }
            if let Some(words) = words {
                query = query.words(words);
            }
            if year_from.is_some() || year_to.is_some() {
                query = query.years(YearRange::new(year_from, year_to));
            }

            let client = ScholarClient::new(&config.scholar, Arc::new(HttpClient::new()?))?;
            let records = client.search(&query).await?;

            let rendered = render_records(&records, format, out.is_none())?;
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered + "\n")
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Wrote {} records to {}", records.len(), path.display());
                }
                None => println!("{}", rendered),
            }
        }

        Commands::Fetch {
            bibliographies,
            key,
            output_dir,
            dry_run,
        } => {
            let mut bibliography = Bibliography::new();
            for path in &bibliographies {
                bibliography.load(path)?;
            }
            if bibliography.is_empty() {
                bail!("no bibliography entries found");
            }

            let client = ScholarClient::new(&config.scholar, Arc::new(HttpClient::new()?))?;
            let status = StatusReporter::stdout(!cli.quiet);
            let mut fetcher = Fetcher::new(client, &config.downloads, status)?.dry_run(dry_run);
            if let Some(dir) = output_dir {
                fetcher = fetcher.output_dir(dir);
            }

            match key {
                Some(key) => match fetcher.single(&bibliography, &key).await? {
                    FetchOutcome::Downloaded(path) => println!("{}", path.display()),
                    FetchOutcome::Located(url) => println!("{}", url),
                    FetchOutcome::NotFound => println!("No PDF found for {}", key),
                },
                None => {
                    let summary = fetcher.all(&bibliography).await;
                    println!(
                        "\n{} entries: {} downloaded, {} located, {} without PDF, {} failed",
                        summary.total(),
                        summary.downloaded,
                        summary.located,
                        summary.not_found,
                        summary.failed
                    );
                    if summary.failed > 0 {
                        bail!("{} of {} entries failed", summary.failed, summary.total());
                    }
                }
            }
        }

        Commands::InitConfig { path, force } => {
            let path = match path {
                Some(path) => path,
                None => dirs::config_dir()
                    .map(|dir| dir.join("bibdl").join("config.toml"))
                    .context("no configuration directory on this platform")?,
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}

fn render_records(
    records: &[CitationRecord],
    format: OutputFormat,
    to_stdout: bool,
) -> Result<String> {
    let actual_format = if format == OutputFormat::Auto {
        if to_stdout && std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    };

    let rendered = match actual_format {
        OutputFormat::Json => serde_json::to_string_pretty(records)?,
        OutputFormat::Plain => format_citations(records, CitationStyle::Plain),
        OutputFormat::Apa => format_citations(records, CitationStyle::Apa),
        OutputFormat::Bibtex => format_citations(records, CitationStyle::Bibtex),
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Title", "Authors", "Year", "Cited by", "PDF"]);

            for record in records {
                table.add_row(vec![
                    Cell::new(truncate(record.title(), 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate(&record.author_line(), 30)),
                    Cell::new(record.year().unwrap_or("")),
                    Cell::new(record.citation_count()),
                    Cell::new(if record.has_pdf() { "yes" } else { "" }),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Auto => unreachable!(),
    };

    Ok(rendered)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
