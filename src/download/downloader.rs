//! Resume-aware document downloader.

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;

use crate::config::Config;
use crate::crawl::ResultRecord;
use crate::download::summary::FetchSummary;
use crate::driver::{close_view, Page};
use crate::error::{Error, Result};
use crate::fs::{document_dir, document_filename, ensure_dir, make_unique_filename_by};
use crate::index::{sha256_file, DownloadRecord, IndexStore};
use crate::session::{navigate_with_retry, throttle, RetryPolicy};

/// Downloads result documents one at a time and keeps the index current.
pub struct ResumableDownloader<'a> {
    config: &'a Config,
    store: IndexStore,
    progress: Option<ProgressBar>,
}

impl<'a> ResumableDownloader<'a> {
    /// Create a downloader; in resume mode the prior index is loaded.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            store: IndexStore::open(config.index_path(), config.scrape.resume),
            progress: None,
        }
    }

    /// Advance `bar` once per processed record.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Download one record. Returns `Ok(false)` when it was skipped because a
    /// resumed index already holds its file.
    pub async fn fetch_one(&mut self, page: &dyn Page, record: &ResultRecord) -> Result<bool> {
        let key = record
            .key()
            .ok_or_else(|| Error::DetailAddressUnresolvable(record.title.clone()))?;

        if self.store.resume() {
            if let Some(existing) = self.store.existing_file(key) {
                tracing::info!(
                    "Skipping '{}': already downloaded at {}",
                    record.title,
                    existing.display()
                );
                return Ok(false);
            }
        }

        let view = page.open_view().await?;
        let outcome = self.download_in_view(view.as_ref(), record, key).await;
        close_view(view.as_ref()).await;

        self.store.record(outcome?);
        Ok(true)
    }

    async fn download_in_view(
        &self,
        view: &dyn Page,
        record: &ResultRecord,
        key: &str,
    ) -> Result<DownloadRecord> {
        let scrape = &self.config.scrape;

        navigate_with_retry(view, &record.href, &RetryPolicy::from_config(scrape)).await?;
        throttle(scrape.throttle()).await;

        let dir = document_dir(&self.config.site.downloads_dir, record.year());
        ensure_dir(&dir)?;

        let preferred = dir.join(document_filename(&record.title, &scrape.document_extension)?);
        let dest = self.destination(&preferred, key);
        if dest != preferred {
            tracing::debug!("Name taken by another document, using {}", dest.display());
        }

        let saved: PathBuf = view
            .trigger_download(
                &self.config.selectors.download_link,
                &dest,
                scrape.download_timeout(),
            )
            .await?;
        let sha256 = sha256_file(&saved)?;

        Ok(DownloadRecord {
            reference: record.reference.clone(),
            title: record.title.clone(),
            date: record.date_text.clone(),
            url: record.href.clone(),
            file: saved,
            sha256,
        })
    }

    /// Where to save the document for `key`.
    ///
    /// A path the index assigns to another key is never reused, even when its
    /// file is gone. Numbered alternatives also skip files already on disk.
    fn destination(&self, preferred: &Path, key: &str) -> PathBuf {
        let owned_by_key = |path: &Path| {
            self.store
                .lookup(key)
                .is_some_and(|record| record.file == path)
        };

        make_unique_filename_by(preferred, |candidate| {
            if self.store.claimed_by_other(candidate, key) {
                return true;
            }
            candidate != preferred && candidate.exists() && !owned_by_key(candidate)
        })
    }

    /// Download every record in order, then write the merged index.
    ///
    /// A failing record is logged and counted; the batch carries on.
    pub async fn fetch_all(
        &mut self,
        page: &dyn Page,
        records: &[ResultRecord],
    ) -> Result<FetchSummary> {
        let total = records.len();
        let mut summary = FetchSummary {
            index_path: self.store.path().to_path_buf(),
            ..Default::default()
        };

        for (i, record) in records.iter().enumerate() {
            match self.fetch_one(page, record).await {
                Ok(true) => {
                    summary.downloaded += 1;
                    tracing::info!("Downloaded {}/{}: {}", i + 1, total, record.title);
                }
                Ok(false) => {
                    summary.skipped += 1;
                    tracing::info!("Skipped {}/{}: {}", i + 1, total, record.title);
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!("Failed {}: {}", record.title, e);
                }
            }

            if let Some(bar) = &self.progress {
                bar.inc(1);
            }
            throttle(self.config.scrape.throttle()).await;
        }

        if let Some(bar) = &self.progress {
            bar.finish_and_clear();
        }

        summary.index_rows = self.store.persist()?;
        Ok(summary)
    }
}
