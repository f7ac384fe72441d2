//! CDAsia Downloader - resumable document downloads from the CDAsia portal
//!
//! This library logs into the portal through a browser, runs a filtered
//! search and downloads every result once into a year-bucketed directory
//! with a CSV index.
//!
//! # Features
//!
//! - Best-effort search filters (library, sections, division, keywords, years)
//! - Pagination with an optional document cap
//! - Five-step detail address resolution, including popup capture
//! - Resume from a prior index, skipping files already on disk
//! - SHA-256 verification and last-write-wins index merging
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use cdasia_downloader::{run_once, BrowserSession, Config, RunOptions, RunReport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let session = BrowserSession::start(&config).await?;
//!     let page = session.main_page();
//!
//!     let mut report = RunReport::new();
//!     run_once(&config, &page, &RunOptions::default(), &mut report).await?;
//!     session.quit().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod crawl;
pub mod download;
pub mod driver;
pub mod error;
pub mod fs;
pub mod index;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod session;

// Re-exports for convenience
pub use config::Config;
pub use crawl::{ResultRecord, SearchCrawler};
pub use download::{FetchSummary, ResumableDownloader};
pub use driver::{BrowserSession, Element, Page};
pub use error::{Error, Result};
pub use index::{DownloadRecord, IndexStore};
pub use pipeline::{run_once, RunOptions, RunReport, RunStatus};
pub use session::AuthSession;
