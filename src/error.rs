//! Error types for the cdasia-downloader application.

use std::time::Duration;

use chromiumoxide::error::CdpError;
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Session errors
    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error("Navigation to {url} failed after {attempts} attempt(s): {last_error}")]
    NavigationTimeout {
        url: String,
        attempts: u32,
        last_error: String,
    },

    // Crawl errors
    #[error("Optional control not found: {0}")]
    OptionalControlMissing(String),

    #[error("Could not resolve a detail address for '{0}'")]
    DetailAddressUnresolvable(String),

    #[error("No search results appeared: {0}")]
    ResultsNotFound(String),

    // Download errors
    #[error("Download timed out after {}s: {url}", .after.as_secs())]
    DownloadTimeout { url: String, after: Duration },

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Failed to load index {path}: {message}")]
    IndexLoad { path: String, message: String },

    // Page driver errors
    #[error("Timed out after {}ms waiting for {what}", .after.as_millis())]
    Timeout { what: String, after: Duration },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Page driver error: {0}")]
    Driver(String),

    #[error("Browser error: {0}")]
    Browser(#[from] CdpError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Build a timeout error for a bounded wait.
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Error::Timeout {
            what: what.into(),
            after,
        }
    }

    /// Whether this error means "gave up waiting" rather than a hard driver failure.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. }
                | Error::NavigationTimeout { .. }
                | Error::DownloadTimeout { .. }
                | Error::Browser(CdpError::Timeout)
        )
    }

    /// Whether this error means the element simply is not on the page.
    pub fn is_missing_element(&self) -> bool {
        matches!(
            self,
            Error::ElementNotFound(_) | Error::Browser(CdpError::NotFound)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const AUTH_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const CRAWL_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const SOME_DOWNLOADS_FAILED: i32 = 6;
}
