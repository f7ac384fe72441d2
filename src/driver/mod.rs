//! Page driver capability.
//!
//! The crawler and downloader only ever talk to a browser through the
//! [`Page`] and [`Element`] traits below. A concrete implementation over the
//! Chrome DevTools protocol lives in [`browser`]; tests use a scripted stub.
//!
//! Every method that waits on the browser takes an explicit timeout and
//! fails with [`Error::Timeout`](crate::error::Error::Timeout) when it runs out.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::error::{Error, Result};

pub mod browser;
#[cfg(test)]
pub mod stub;

pub use browser::{BrowserElement, BrowserPage, BrowserSession};

/// Keys the crawler needs to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
}

impl Key {
    /// DOM key name.
    pub fn name(self) -> &'static str {
        match self {
            Key::Escape => "Escape",
            Key::Enter => "Enter",
        }
    }

    /// Windows virtual key code.
    pub fn key_code(self) -> i64 {
        match self {
            Key::Escape => 27,
            Key::Enter => 13,
        }
    }
}

/// A handle to an element inside a page.
#[async_trait]
pub trait Element: Send + Sync {
    /// First descendant matching `selector`, if any.
    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>>;

    /// Rendered text content.
    async fn text(&self) -> Result<String>;

    /// Attribute value, `None` when the attribute is absent.
    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    async fn click(&self) -> Result<()>;

    async fn is_enabled(&self) -> Result<bool>;
}

/// A browsing view: the main listing tab or an ephemeral detail tab.
#[async_trait]
pub trait Page: Send + Sync {
    /// Load `url` in this view.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Replace the value of the first input matching `selector`.
    async fn fill(&self, selector: &str, text: &str) -> Result<()>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    async fn press_key(&self, key: Key) -> Result<()>;

    /// Every element matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>>;

    /// First element matching `selector`, if any.
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn Element>>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    /// Wait until an element matching `selector` is attached.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Wait until the document finished loading.
    async fn wait_for_load(&self, timeout: Duration) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Click `trigger` and capture the view it opens.
    async fn observe_new_view(
        &self,
        trigger: &dyn Element,
        timeout: Duration,
    ) -> Result<Box<dyn Page>>;

    /// Open a fresh, blank view in the same browsing session.
    async fn open_view(&self) -> Result<Box<dyn Page>>;

    /// Click the element matching `selector`, wait for the download it starts
    /// and save the file at `dest`.
    async fn trigger_download(
        &self,
        selector: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<PathBuf>;

    /// Give this view input focus again.
    async fn bring_to_front(&self) -> Result<()>;

    /// Close this view.
    async fn close(&self) -> Result<()>;
}

/// Close an ephemeral view, logging rather than propagating failures.
pub async fn close_view(view: &dyn Page) {
    if let Err(e) = view.close().await {
        tracing::warn!("Failed to close view: {}", e);
    }
}

/// Longest pause between polls in bounded waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Run `check` until it yields a value, pausing between attempts. Fails with
/// a timeout naming `what` once `timeout` has passed.
pub async fn poll_until<T, F, Fut>(what: &str, timeout: Duration, mut check: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    let interval = (timeout / 20).clamp(Duration::from_millis(1), POLL_INTERVAL);

    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(Error::timeout(what, timeout));
        }
        sleep(interval).await;
    }
}

/// Whether `url` is a real document address rather than a fresh tab.
pub fn is_blank_url(url: &str) -> bool {
    let url = url.trim();
    url.is_empty() || url == "about:blank"
}
