//! Directory layout for downloaded documents.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Bucket for documents whose date could not be parsed.
pub const UNDATED: &str = "undated";

/// Folder name for a document year.
pub fn year_folder(year: Option<i32>) -> String {
    match year {
        Some(year) => format!("{:04}", year),
        None => UNDATED.to_string(),
    }
}

/// `<root>/<year or undated>`.
pub fn document_dir(root: &Path, year: Option<i32>) -> PathBuf {
    root.join(year_folder(year))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
