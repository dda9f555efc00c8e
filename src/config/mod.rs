//! Configuration management.
//!
//! Settings come from, in increasing priority: built-in defaults, a TOML file,
//! and `BIBDL_*` environment variables (nested keys joined with `__`).
//!
//! ```toml
//! [scholar]
//! base_url = "https://scholar.google.com"
//! language = "en"
//! timeout_secs = 30
//! user_agents = ["Mozilla/5.0 ..."]
//!
//! [scholar.selectors]
//! row = "div.gs_r.gs_or"
//! block_markers = ["our systems have detected unusual traffic"]
//!
//! [downloads]
//! output_dir = "./pdfs"
//! url_blacklist = ["https?://[^/]*springer"]
//! delay_secs = 0.5
//! min_delay_secs = 0.25
//! num_authors = 3
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scholar::{ParserRules, DEFAULT_USER_AGENTS};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BIBDL";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scholar: ScholarConfig,

    #[serde(default)]
    pub downloads: DownloadConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scholar endpoint and page-layout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Interface language (`hl` parameter); the parser expects English labels
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Pool the per-request user agent is drawn from
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    #[serde(default)]
    pub selectors: ParserRules,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            language: default_language(),
            timeout_secs: default_timeout(),
            user_agents: default_user_agents(),
            selectors: ParserRules::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://scholar.google.com".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
}

/// Bibliography download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Regexes for full-text hosts that never serve the PDF directly
    #[serde(default = "default_blacklist")]
    pub url_blacklist: Vec<String>,

    /// Mean pause between bibliography entries
    #[serde(default = "default_delay")]
    pub delay_secs: f64,

    /// Lower bound for the pause
    #[serde(default = "default_min_delay")]
    pub min_delay_secs: f64,

    /// Authors shown per entry in status output
    #[serde(default = "default_num_authors")]
    pub num_authors: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            url_blacklist: default_blacklist(),
            delay_secs: default_delay(),
            min_delay_secs: default_min_delay(),
            num_authors: default_num_authors(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./pdfs")
}

fn default_blacklist() -> Vec<String> {
    vec![
        r"https?://[^/]*springer".to_string(),
        r"https?://[^/]*academia".to_string(),
        r"https?://[^/]*semanticscholar".to_string(),
    ]
}

fn default_delay() -> f64 {
    0.5
}

fn default_min_delay() -> f64 {
    0.25
}

fn default_num_authors() -> usize {
    3
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when neither `RUST_LOG` nor `-v` is given
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for `./bibdl.toml`, then `<config dir>/bibdl/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("bibdl.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("bibdl").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::tempdir;

    /// Held by every test that reads the environment or the working directory
    fn env_lock() -> MutexGuard<'static, ()> {
        static LOCK: Mutex<()> = Mutex::new(());
        LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Removes the listed variables when dropped
    struct EnvVars(&'static [&'static str]);

    impl Drop for EnvVars {
        fn drop(&mut self) {
            for name in self.0 {
                std::env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scholar.base_url, "https://scholar.google.com");
        assert_eq!(config.scholar.user_agents.len(), DEFAULT_USER_AGENTS.len());
        assert_eq!(config.downloads.url_blacklist.len(), 3);
        assert_eq!(config.downloads.num_authors, 3);
        assert_eq!(config.downloads.min_delay_secs, 0.25);
    }

    #[test]
    fn test_config_file_load() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let path = dir.path().join("bibdl.toml");

        let toml_content = r#"
[scholar]
timeout_secs = 5
user_agents = ["agent-one", "agent-two"]

[scholar.selectors]
row = "li.result"
block_markers = ["go away"]

[downloads]
output_dir = "/tmp/papers"
delay_secs = 2.0

[logging]
level = "debug"
"#;
        std::fs::write(&path, toml_content).unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.scholar.timeout_secs, 5);
        assert_eq!(config.scholar.user_agents, ["agent-one", "agent-two"]);
        assert_eq!(config.scholar.selectors.row, "li.result");
        assert_eq!(config.scholar.selectors.block_markers, ["go away"]);
        // Unset selector keys keep their defaults
        assert_eq!(config.scholar.selectors.title, "h3.gs_rt");
        assert_eq!(config.downloads.output_dir, PathBuf::from("/tmp/papers"));
        assert_eq!(config.downloads.delay_secs, 2.0);
        assert_eq!(config.downloads.min_delay_secs, 0.25);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.scholar.base_url, "https://scholar.google.com");
    }

    #[test]
    fn test_config_save_load() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.scholar.language = "de".to_string();
        config.downloads.num_authors = 5;
        config.save(&path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_file_nonexistent() {
        let _lock = env_lock();
        let path = PathBuf::from("/nonexistent/bibdl.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        let path = dir.path().join("bibdl.toml");
        std::fs::write(
            &path,
            "[scholar]\ntimeout_secs = 5\nlanguage = \"fr\"\n\n[logging]\nlevel = \"info\"\n",
        )
        .unwrap();

        let _vars = EnvVars(&["BIBDL_SCHOLAR__TIMEOUT_SECS", "BIBDL_LOGGING__LEVEL"]);
        std::env::set_var("BIBDL_SCHOLAR__TIMEOUT_SECS", "7");
        std::env::set_var("BIBDL_LOGGING__LEVEL", "debug");

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.scholar.timeout_secs, 7);
        assert_eq!(config.logging.level, "debug");
        // Keys without an override keep the file value
        assert_eq!(config.scholar.language, "fr");

        // Environment alone applies on top of the defaults
        let config = load_config(None).unwrap();
        assert_eq!(config.scholar.timeout_secs, 7);
        assert_eq!(config.scholar.base_url, "https://scholar.google.com");
    }

    #[test]
    fn test_find_config_file_prefers_local() {
        let _lock = env_lock();
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bibdl.toml"), "[logging]\nlevel = \"error\"\n").unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let found = find_config_file();
        let loaded = found.as_deref().map(|path| load_config(Some(path)));
        std::env::set_current_dir(previous).unwrap();

        assert_eq!(found, Some(PathBuf::from("bibdl.toml")));
        assert_eq!(loaded.unwrap().unwrap().logging.level, "error");
    }
}
