//! Filename generation for downloaded documents.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Used when a title sanitizes to nothing.
pub const FALLBACK_NAME: &str = "document";

/// Longest file stem we produce, in characters.
const MAX_STEM_CHARS: usize = 150;

/// Highest number tried when making a name unique.
const MAX_NUMBERED: u32 = 1000;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Turn a result title into a safe file stem.
///
/// Path separators become `-`, reserved and control characters become `_`,
/// whitespace runs collapse to one space and leading/trailing dots are dropped.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    let collapsed = whitespace_re().replace_all(&replaced, " ");
    let trimmed = collapsed.trim().trim_matches('.').trim();

    let stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    let stem = stem.trim_end().trim_end_matches('.');

    if stem.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        stem.to_string()
    }
}

/// File name for a document: sanitized title plus `extension`.
pub fn document_filename(title: &str, extension: &str) -> Result<String> {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidFilename(format!(
            "bad document extension '{}'",
            extension
        )));
    }
    Ok(format!("{}.{}", sanitize_title(title), extension))
}

/// Pick a free path next to `path` by numbering the stem: `name (2).pdf`.
pub fn make_unique_filename(path: &Path) -> PathBuf {
    make_unique_filename_by(path, |candidate| candidate.exists())
}

/// Like [`make_unique_filename`], with `taken` deciding which paths are in use.
pub fn make_unique_filename_by(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    if !taken(path) {
        return path.to_path_buf();
    }

    let mut counter = 2;
    loop {
        let candidate = numbered_filename(path, counter);
        if !taken(&candidate) || counter >= MAX_NUMBERED {
            return candidate;
        }
        counter += 1;
    }
}

/// `path` with ` (n)` appended to its stem.
pub fn numbered_filename(path: &Path, n: u32) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(FALLBACK_NAME);
    let parent = path.parent().unwrap_or(Path::new("."));

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => parent.join(format!("{} ({}).{}", stem, n, ext)),
        _ => parent.join(format!("{} ({})", stem, n)),
    }
}
