//! Configuration structures and loading logic.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::selectors::Selectors;
use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub selectors: Selectors,

    #[serde(default)]
    pub driver: DriverConfig,
}

/// Portal location and local output directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Portal base URL; relative detail addresses are joined onto it.
    pub base_url: String,

    /// Path of the login form.
    pub login_path: String,

    /// Path of the search form.
    pub search_path: String,

    /// Root directory for downloaded documents and the index file.
    pub downloads_dir: PathBuf,

    /// Directory for run logs.
    pub log_dir: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.cdasia.com".to_string(),
            login_path: "/login".to_string(),
            search_path: "/search".to_string(),
            downloads_dir: PathBuf::from("data/downloads"),
            log_dir: PathBuf::from("data/logs"),
        }
    }
}

/// Login credentials. Usually left empty in favour of the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Search filters applied before crawling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Library to pick from the library selector.
    pub library: Option<String>,

    /// Section/category toggles to activate, by visible label.
    pub sections: Vec<String>,

    /// Division toggle to activate, by visible label.
    pub division: Option<String>,

    /// Free-text keywords, joined with spaces into the keyword box.
    pub keywords: Vec<String>,

    /// Inclusive start year.
    pub year_from: Option<i32>,

    /// Inclusive end year.
    pub year_to: Option<i32>,

    /// Stop after this many results (0 = unlimited).
    pub max_docs: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            library: None,
            sections: Vec::new(),
            division: Some("SEC-OGC".to_string()),
            keywords: vec!["SEC-OGC Opinion".to_string()],
            year_from: None,
            year_to: None,
            max_docs: 0,
        }
    }
}

/// Pacing, timeouts and run behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Run the browser without a visible window.
    pub headless: bool,

    /// Timeout for a single navigation attempt.
    pub navigation_timeout_ms: u64,

    /// Timeout for element waits (result container, option lists, row refresh).
    pub element_timeout_ms: u64,

    /// Fixed pause between site interactions.
    pub throttle_ms: u64,

    /// Timeout for a document download to complete.
    pub download_timeout_ms: u64,

    /// Timeout for a detail view to open after clicking a result.
    pub popup_timeout_ms: u64,

    /// Timeout for the library list backdrop to show up.
    pub backdrop_timeout_ms: u64,

    /// Navigation attempts before giving up.
    pub retries: u32,

    /// Pause between navigation attempts.
    pub retry_delay_ms: u64,

    /// Skip documents already recorded in the index.
    pub resume: bool,

    /// Browser user agent string.
    pub user_agent: String,

    /// Extension given to downloaded documents.
    pub document_extension: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_ms: 60_000,
            element_timeout_ms: 45_000,
            throttle_ms: 1_500,
            download_timeout_ms: 120_000,
            popup_timeout_ms: 8_000,
            backdrop_timeout_ms: 2_000,
            retries: 3,
            retry_delay_ms: 2_000,
            resume: true,
            user_agent: default_user_agent(),
            document_extension: "pdf".to_string(),
        }
    }
}

impl ScrapeConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    pub fn popup_timeout(&self) -> Duration {
        Duration::from_millis(self.popup_timeout_ms)
    }

    pub fn backdrop_timeout(&self) -> Duration {
        Duration::from_millis(self.backdrop_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Chrome/Chromium binary; found on the system when unset.
    pub chrome_executable: Option<PathBuf>,

    /// DevTools address of an already running browser to attach to instead
    /// of launching one (`http://localhost:9222` or a `ws://` URL).
    pub remote_debugging_url: Option<String>,

    /// Extra command-line switches for a launched browser.
    pub extra_args: Vec<String>,

    /// Directory the browser saves downloads into before they are moved.
    /// Defaults to `<downloads_dir>/.staging`.
    pub download_staging_dir: Option<PathBuf>,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118 Safari/537.36".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one with --write-config",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<(Self, bool)> {
        if path.exists() {
            Ok((Self::load(path)?, true))
        } else {
            Ok((Self::default(), false))
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parsed portal base URL.
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.site.base_url)?)
    }

    /// Absolute address of the login form.
    pub fn login_url(&self) -> Result<String> {
        Ok(self.base_url()?.join(&self.site.login_path)?.to_string())
    }

    /// Absolute address of the search form.
    pub fn search_url(&self) -> Result<String> {
        Ok(self.base_url()?.join(&self.site.search_path)?.to_string())
    }

    /// Turn a raw attribute value into an absolute detail address.
    ///
    /// Blank values, fragments and `javascript:` pseudo-links resolve to `None`.
    pub fn resolve_href(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') || raw.starts_with("javascript:") {
            return None;
        }

        if let Ok(absolute) = Url::parse(raw) {
            return Some(absolute.to_string());
        }

        self.base_url()
            .ok()
            .and_then(|base| base.join(raw).ok())
            .map(|u| u.to_string())
    }

    /// Path of the persisted index file.
    pub fn index_path(&self) -> PathBuf {
        self.site.downloads_dir.join("index.csv")
    }

    /// Directory the browser drops downloads into.
    pub fn staging_dir(&self) -> PathBuf {
        self.driver
            .download_staging_dir
            .clone()
            .unwrap_or_else(|| self.site.downloads_dir.join(".staging"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.site.base_url, "https://www.cdasia.com");
        assert_eq!(config.scrape.retries, 3);
        assert_eq!(config.filters.max_docs, 0);
        assert!(config.scrape.resume);
    }

    #[test]
    fn test_partial_table_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [filters]
            max_docs = 5
            sections = ["Opinions", "Memoranda"]

            [scrape]
            throttle_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.filters.max_docs, 5);
        assert_eq!(config.filters.sections.len(), 2);
        assert_eq!(config.filters.division.as_deref(), Some("SEC-OGC"));
        assert_eq!(config.scrape.throttle_ms, 0);
        assert_eq!(config.scrape.navigation_timeout_ms, 60_000);
        assert_eq!(config.selectors.results_container, "#results");
    }

    #[test]
    fn test_site_urls() {
        let config = Config::default();
        assert_eq!(config.login_url().unwrap(), "https://www.cdasia.com/login");
        assert_eq!(config.search_url().unwrap(), "https://www.cdasia.com/search");
    }

    #[test]
    fn test_resolve_href() {
        let config = Config::default();
        assert_eq!(
            config.resolve_href("/doc/123").as_deref(),
            Some("https://www.cdasia.com/doc/123")
        );
        assert_eq!(
            config.resolve_href("https://other.example/x").as_deref(),
            Some("https://other.example/x")
        );
        assert_eq!(config.resolve_href("  "), None);
        assert_eq!(config.resolve_href("#"), None);
        assert_eq!(config.resolve_href("javascript:void(0)"), None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.filters.library = Some("SEC Library".to_string());
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.filters.library.as_deref(), Some("SEC Library"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
