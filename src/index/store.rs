//! The keyed index of downloaded documents.
//!
//! The index is a CSV file with the columns of [`DownloadRecord`]. It is read
//! once when a resumed run starts and rewritten wholesale when the run ends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::index::record::DownloadRecord;

/// Prior and newly fetched records for one run.
#[derive(Debug)]
pub struct IndexStore {
    path: PathBuf,
    resume: bool,
    prior: Vec<DownloadRecord>,
    known: HashMap<String, DownloadRecord>,
    fresh: Vec<DownloadRecord>,
}

impl IndexStore {
    /// Open the index at `path`. In resume mode the prior index is loaded;
    /// an unreadable index is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>, resume: bool) -> Self {
        let path = path.into();
        let prior = if resume && path.exists() {
            match load_index(&path) {
                Ok(records) => {
                    tracing::debug!(
                        "Loaded {} existing downloads from {}",
                        records.len(),
                        path.display()
                    );
                    records
                }
                Err(e) => {
                    tracing::warn!("{}; starting with an empty index", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let known = prior
            .iter()
            .filter_map(|record| record.key().map(|key| (key, record.clone())))
            .collect();

        Self {
            path,
            resume,
            prior,
            known,
            fresh: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resume(&self) -> bool {
        self.resume
    }

    pub fn prior_len(&self) -> usize {
        self.prior.len()
    }

    /// Records fetched during this run, in fetch order.
    pub fn fresh(&self) -> &[DownloadRecord] {
        &self.fresh
    }

    pub fn lookup(&self, key: &str) -> Option<&DownloadRecord> {
        self.known.get(key)
    }

    /// Local file of the record stored under `key`, if it still exists.
    pub fn existing_file(&self, key: &str) -> Option<&Path> {
        self.known
            .get(key)
            .map(|record| record.file.as_path())
            .filter(|file| !file.as_os_str().is_empty() && file.exists())
    }

    /// Whether `file` belongs to a record other than `key`.
    pub fn claimed_by_other(&self, file: &Path, key: &str) -> bool {
        self.known
            .iter()
            .any(|(other, record)| other != key && record.file == file)
    }

    /// Remember a freshly downloaded record. Later lookups see it.
    pub fn record(&mut self, record: DownloadRecord) {
        if let Some(key) = record.key() {
            self.known.insert(key, record.clone());
        }
        self.fresh.push(record);
    }

    /// Prior (in resume mode) and fresh records, deduplicated by key.
    pub fn merged(&self) -> Vec<DownloadRecord> {
        let prior = if self.resume {
            self.prior.clone()
        } else {
            Vec::new()
        };
        merge_records(prior, self.fresh.clone())
    }

    /// Write the merged index. Returns the number of rows written; an empty
    /// merge leaves the file on disk untouched.
    pub fn persist(&self) -> Result<usize> {
        let merged = self.merged();
        if merged.is_empty() {
            tracing::warn!("No documents were downloaded; index not updated");
            return Ok(0);
        }

        save_index(&self.path, &merged)?;
        tracing::info!("Saved index to {} ({} rows)", self.path.display(), merged.len());
        Ok(merged.len())
    }
}

/// Read every row of an index file.
pub fn load_index(path: &Path) -> Result<Vec<DownloadRecord>> {
    let index_error = |message: String| Error::IndexLoad {
        path: path.display().to_string(),
        message,
    };

    let mut reader = csv::Reader::from_path(path).map_err(|e| index_error(e.to_string()))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<DownloadRecord>, _>>()
        .map_err(|e| index_error(e.to_string()))
}

/// Write `records` to `path` through a sibling temporary file.
pub fn save_index(path: &Path, records: &[DownloadRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Concatenate `prior` and `fresh`, keeping only the last record per key.
///
/// Survivors keep their relative order. Records without a key are dropped.
pub fn merge_records(
    prior: Vec<DownloadRecord>,
    fresh: Vec<DownloadRecord>,
) -> Vec<DownloadRecord> {
    let rows: Vec<DownloadRecord> = prior.into_iter().chain(fresh).collect();

    let mut last: HashMap<String, usize> = HashMap::new();
    for (position, row) in rows.iter().enumerate() {
        if let Some(key) = row.key() {
            last.insert(key, position);
        }
    }

    rows.into_iter()
        .enumerate()
        .filter(|(position, row)| {
            row.key()
                .is_some_and(|key| last.get(&key) == Some(position))
        })
        .map(|(_, row)| row)
        .collect()
}
