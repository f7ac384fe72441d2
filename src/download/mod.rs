//! Download module.
//!
//! This module provides:
//! - Resume-aware, sequential document downloading
//! - Batch counters for reporting

pub mod downloader;
pub mod summary;

pub use downloader::ResumableDownloader;
pub use summary::FetchSummary;
