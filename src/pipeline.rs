//! One end-to-end run: login, search, download.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::crawl::{ResultRecord, SearchCrawler};
use crate::download::ResumableDownloader;
use crate::driver::Page;
use crate::error::{Error, Result};
use crate::output::create_item_bar;
use crate::session::AuthSession;

/// Results kept in the report preview.
pub const PREVIEW_LEN: usize = 10;

/// Per-run switches that are not part of the configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Crawl only; nothing is downloaded and the index is left alone.
    pub dry_run: bool,
    /// Tolerate a missing post-login marker (CAPTCHA, 2FA).
    pub human_checkpoint: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Draw a progress bar while downloading.
    pub show_progress: bool,
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One crawled result as shown in a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewItem {
    pub title: String,
    pub date: String,
    pub href: String,
}

impl From<&ResultRecord> for PreviewItem {
    fn from(record: &ResultRecord) -> Self {
        Self {
            title: record.title.clone(),
            date: record.date_text.clone(),
            href: record.href.clone(),
        }
    }
}

/// Status and counters of a run, suitable for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub dry_run: bool,
    pub results_found: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub index_rows: usize,
    pub index_path: Option<PathBuf>,
    pub preview: Vec<PreviewItem>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            dry_run: false,
            results_found: 0,
            downloaded: 0,
            skipped: 0,
            failed: 0,
            index_rows: 0,
            index_path: None,
            preview: Vec::new(),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    fn start(&mut self, dry_run: bool) {
        self.status = RunStatus::Running;
        self.dry_run = dry_run;
        self.started_at = Some(Utc::now());
    }

    fn finish(&mut self, outcome: &Result<()>) {
        match outcome {
            Ok(()) => self.status = RunStatus::Completed,
            Err(e) => {
                self.status = RunStatus::Failed;
                self.error = Some(e.to_string());
            }
        }
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, once the run has finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Run login, search and (unless dry) download once against `page`.
///
/// `report` is updated as the run progresses and finalized either way; the
/// error of a failed run is also returned.
pub async fn run_once(
    config: &Config,
    page: &dyn Page,
    options: &RunOptions,
    report: &mut RunReport,
) -> Result<()> {
    report.start(options.dry_run);
    tracing::info!("Run {} started", report.run_id);

    let outcome = run_stages(config, page, options, report).await;
    report.finish(&outcome);

    match &outcome {
        Ok(()) => tracing::info!("Run {} completed", report.run_id),
        Err(e) => tracing::error!("Run {} failed: {}", report.run_id, e),
    }
    outcome
}

async fn run_stages(
    config: &Config,
    page: &dyn Page,
    options: &RunOptions,
    report: &mut RunReport,
) -> Result<()> {
    AuthSession::new(config, page)
        .login(
            options.human_checkpoint,
            options.username.as_deref(),
            options.password.as_deref(),
        )
        .await?;

    let results = SearchCrawler::new(config, page).search().await?;
    report.results_found = results.len();
    report.preview = results.iter().take(PREVIEW_LEN).map(PreviewItem::from).collect();

    if options.dry_run {
        for record in &results {
            tracing::info!("{} | {} | {}", record.date_text, record.title, record.href);
        }
        return Ok(());
    }

    let mut downloader = ResumableDownloader::new(config);
    if options.show_progress {
        downloader = downloader.with_progress(create_item_bar(results.len() as u64, "Downloading"));
    }

    let summary = downloader.fetch_all(page, &results).await?;
    report.downloaded = summary.downloaded;
    report.skipped = summary.skipped;
    report.failed = summary.failed;
    report.index_rows = summary.index_rows;

    if summary.has_failures() {
        tracing::warn!("{} of {} documents failed", summary.failed, summary.total());
    }
    report.index_path = Some(summary.index_path);
    Ok(())
}

/// Map a failed run to its process exit code.
pub fn exit_code_for(error: &Error) -> i32 {
    use crate::error::exit_codes;

    match error {
        Error::Credentials(_) => exit_codes::AUTH_ERROR,
        Error::Config(_) | Error::ConfigValidation { .. } | Error::MissingConfig(_) => {
            exit_codes::CONFIG_ERROR
        }
        Error::ResultsNotFound(_) | Error::NavigationTimeout { .. } => exit_codes::CRAWL_ERROR,
        _ => exit_codes::UNEXPECTED_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::stub::{StubPortal, StubRow};
    use crate::error::exit_codes;
    use crate::index::load_index;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir, max_docs: usize) -> Config {
        let mut config = Config::default();
        config.site.downloads_dir = dir.path().join("downloads");
        config.scrape.throttle_ms = 0;
        config.scrape.retry_delay_ms = 0;
        config.scrape.element_timeout_ms = 5;
        config.scrape.backdrop_timeout_ms = 5;
        config.filters.max_docs = max_docs;
        config
    }

    fn options() -> RunOptions {
        RunOptions {
            username: Some("alice".into()),
            password: Some("pw".into()),
            ..Default::default()
        }
    }

    fn rows() -> Vec<Vec<StubRow>> {
        vec![
            vec![
                StubRow::new("R-1", "Opinion 1", "January 5, 2024").anchor("/doc/1"),
                StubRow::new("R-2", "Opinion 2", "5 February 2023").row_data("/doc/2"),
                StubRow::new("R-3", "Opinion 3", "2022-03-01").anchor("/doc/3"),
            ],
            vec![StubRow::new("R-4", "Opinion 4", "").anchor("/doc/4")],
        ]
    }

    #[tokio::test]
    async fn test_end_to_end_with_cap() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 2);
        let portal = StubPortal::new().with_pages(rows());
        let page = portal.page();
        let mut report = RunReport::new();

        run_once(&config, &page, &options(), &mut report).await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.results_found, 2);
        assert_eq!(report.downloaded, 2);
        assert!(!portal.has_event("click:next"));

        let downloads: Vec<_> = portal
            .events()
            .into_iter()
            .filter(|e| e.starts_with("download:"))
            .collect();
        assert_eq!(
            downloads,
            [
                "download:https://www.cdasia.com/doc/1",
                "download:https://www.cdasia.com/doc/2",
            ]
        );

        let index = load_index(&config.index_path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_ne!(index[0].sha256, index[1].sha256);
        assert_eq!(report.index_rows, 2);
        assert_eq!(report.index_path.as_deref(), Some(config.index_path().as_path()));
        assert_eq!(portal.open_views(), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_still_reports_index() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 0);
        let portal = StubPortal::new()
            .with_pages(rows())
            .with_failing_download("https://www.cdasia.com/doc/3");
        let page = portal.page();
        let mut report = RunReport::new();

        run_once(&config, &page, &options(), &mut report).await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.downloaded, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.index_rows, 3);
        assert_eq!(report.index_path, Some(config.index_path()));
    }

    #[tokio::test]
    async fn test_dry_run_previews_without_downloading() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 0);
        let portal = StubPortal::new().with_pages(rows());
        let page = portal.page();
        let mut report = RunReport::new();

        let run_options = RunOptions {
            dry_run: true,
            ..options()
        };
        run_once(&config, &page, &run_options, &mut report).await.unwrap();

        assert_eq!(report.results_found, 4);
        assert_eq!(report.preview.len(), 4);
        assert_eq!(report.preview[1].href, "https://www.cdasia.com/doc/2");
        assert_eq!(portal.count_events("download:"), 0);
        assert!(!config.index_path().exists());
    }

    #[tokio::test]
    async fn test_failed_run_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir, 0);
        let portal = StubPortal::new().with_pages(vec![]);
        let page = portal.page();
        let mut report = RunReport::new();

        let err = run_once(&config, &page, &options(), &mut report)
            .await
            .unwrap_err();

        assert_eq!(report.status, RunStatus::Failed);
        assert!(report.error.is_some());
        assert!(report.finished_at.is_some());
        assert_eq!(exit_code_for(&err), exit_codes::CRAWL_ERROR);
    }

    #[test]
    fn test_report_json_shape() {
        let report = RunReport::new();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json["run_id"].is_string());
        assert!(report.elapsed().is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for(&Error::Credentials("x".into())),
            exit_codes::AUTH_ERROR
        );
        assert_eq!(
            exit_code_for(&Error::Config("x".into())),
            exit_codes::CONFIG_ERROR
        );
        assert_eq!(
            exit_code_for(&Error::Download("x".into())),
            exit_codes::UNEXPECTED_ERROR
        );
    }
}
