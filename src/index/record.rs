//! Rows of the persisted download index.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One downloaded document. Field order is the index column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Date text as shown in the result row.
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub file: PathBuf,
    #[serde(default)]
    pub sha256: String,
}

impl DownloadRecord {
    /// Identity of the record within the index.
    pub fn key(&self) -> Option<String> {
        record_key(&self.url, &self.file)
    }
}

/// Record identity: the detail address, else the local file path.
pub fn record_key(url: &str, file: &std::path::Path) -> Option<String> {
    let url = url.trim();
    if !url.is_empty() {
        return Some(url.to_string());
    }
    let file = file.to_string_lossy();
    let file = file.trim();
    if file.is_empty() {
        None
    } else {
        Some(file.to_string())
    }
}
