//! Configuration module for the cdasia-downloader.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Portal selectors
//! - Configuration validation

pub mod loader;
pub mod selectors;
pub mod validation;

pub use loader::{
    Config, CredentialsConfig, DriverConfig, FilterConfig, ScrapeConfig, SiteConfig,
};
pub use selectors::Selectors;
pub use validation::validate_config;
