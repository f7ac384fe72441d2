//! Configuration validation logic.

use regex::Regex;

use crate::config::loader::Config;
use crate::error::{Error, Result};

/// Earliest year accepted in the year filters.
const MIN_YEAR: i32 = 1900;

/// Latest year accepted in the year filters.
const MAX_YEAR: i32 = 2100;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_base_url(&config.site.base_url)?;
    validate_year_range(config.filters.year_from, config.filters.year_to)?;
    validate_retries(config.scrape.retries)?;
    validate_extension(&config.scrape.document_extension)?;
    validate_selectors(config)?;
    validate_browser_url(config.driver.remote_debugging_url.as_deref())?;

    Ok(())
}

/// Validate the portal base URL.
pub fn validate_base_url(base_url: &str) -> Result<()> {
    if base_url.trim().is_empty() {
        return Err(Error::MissingConfig("site.base_url".to_string()));
    }

    let parsed = url::Url::parse(base_url).map_err(|e| Error::ConfigValidation {
        field: "site.base_url".to_string(),
        message: format!("'{}' is not a valid URL: {}", base_url, e),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::ConfigValidation {
            field: "site.base_url".to_string(),
            message: format!("Unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(())
}

/// Validate the optional year range.
pub fn validate_year_range(year_from: Option<i32>, year_to: Option<i32>) -> Result<()> {
    for (field, year) in [("filters.year_from", year_from), ("filters.year_to", year_to)] {
        if let Some(year) = year {
            if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
                return Err(Error::ConfigValidation {
                    field: field.to_string(),
                    message: format!(
                        "Year {} is outside {}..={}",
                        year, MIN_YEAR, MAX_YEAR
                    ),
                });
            }
        }
    }

    if let (Some(from), Some(to)) = (year_from, year_to) {
        if to < from {
            return Err(Error::ConfigValidation {
                field: "filters.year_to".to_string(),
                message: format!("year_to ({}) must be >= year_from ({})", to, from),
            });
        }
    }

    Ok(())
}

/// Navigation needs at least one attempt.
pub fn validate_retries(retries: u32) -> Result<()> {
    if retries == 0 {
        return Err(Error::ConfigValidation {
            field: "scrape.retries".to_string(),
            message: "At least one navigation attempt is required".to_string(),
        });
    }
    Ok(())
}

/// Validate the document extension (bare alphanumerics, no dot).
pub fn validate_extension(extension: &str) -> Result<()> {
    let pattern = Regex::new(r"^[A-Za-z0-9]{1,8}$").expect("static regex");
    if !pattern.is_match(extension) {
        return Err(Error::ConfigValidation {
            field: "scrape.document_extension".to_string(),
            message: format!(
                "'{}' is not a valid extension (1-8 alphanumerics, no dot)",
                extension
            ),
        });
    }
    Ok(())
}

/// Validate the address of an already running browser, when one is set.
pub fn validate_browser_url(url: Option<&str>) -> Result<()> {
    let Some(url) = url else {
        return Ok(());
    };

    let parsed = url::Url::parse(url).map_err(|e| Error::ConfigValidation {
        field: "driver.remote_debugging_url".to_string(),
        message: format!("'{}' is not a valid URL: {}", url, e),
    })?;

    if !matches!(parsed.scheme(), "ws" | "wss" | "http" | "https") {
        return Err(Error::ConfigValidation {
            field: "driver.remote_debugging_url".to_string(),
            message: format!("Unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(())
}

/// Every selector must be non-empty.
pub fn validate_selectors(config: &Config) -> Result<()> {
    for (name, selector) in config.selectors.named() {
        if selector.trim().is_empty() {
            return Err(Error::MissingConfig(format!("selectors.{}", name)));
        }
    }
    Ok(())
}
