//! Per-run download counters.

use std::path::PathBuf;

use serde::Serialize;

/// Outcome of a `fetch_all` batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Rows in the index written at the end of the batch (0 when not written).
    pub index_rows: usize,
    pub index_path: PathBuf,
}

impl FetchSummary {
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
