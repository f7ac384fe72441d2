//! Chrome DevTools page driver.
//!
//! Launches Chrome (or attaches to one already running) through
//! `chromiumoxide`. Each tab is a [`BrowserPage`]. Popups are picked up from
//! target-created events, and downloads are saved by the browser into the
//! staging directory and tracked through its download events.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::target::{EventTargetCreated, TargetId};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::driver::{poll_until, Element, Key, Page};
use crate::error::{Error, Result};

/// Browser window size used for launched instances.
const WINDOW_SIZE: (u32, u32) = (1366, 900);

struct SessionInner {
    browser: Mutex<Browser>,
    staging_dir: PathBuf,
}

/// A running browser plus the task that pumps its DevTools connection.
pub struct BrowserSession {
    inner: Arc<SessionInner>,
    main: chromiumoxide::Page,
    handler: JoinHandle<()>,
    launched: bool,
}

impl BrowserSession {
    /// Launch a browser, or attach to `driver.remote_debugging_url` when set.
    pub async fn start(config: &Config) -> Result<Self> {
        let staging_dir = config.staging_dir();
        tokio::fs::create_dir_all(&staging_dir).await?;
        let staging_dir = staging_dir.canonicalize()?;

        let launched = config.driver.remote_debugging_url.is_none();
        let (browser, mut handler) = match &config.driver.remote_debugging_url {
            Some(url) => {
                tracing::debug!("Attaching to browser at {}", url);
                Browser::connect(url.as_str()).await?
            }
            None => {
                tracing::debug!("Launching browser (headless: {})", config.scrape.headless);
                Browser::launch(browser_config(config)?).await?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser connection: {}", e);
                }
            }
        });

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(staging_dir.display().to_string())
            .events_enabled(true)
            .build()
            .map_err(Error::Driver)?;
        browser.execute(behavior).await?;

        let main = browser.new_page("about:blank").await?;
        tracing::info!("Browser session started");

        Ok(Self {
            inner: Arc::new(SessionInner {
                browser: Mutex::new(browser),
                staging_dir,
            }),
            main,
            handler,
            launched,
        })
    }

    /// The tab the session opened with.
    pub fn main_page(&self) -> BrowserPage {
        BrowserPage {
            inner: Arc::clone(&self.inner),
            page: self.main.clone(),
        }
    }

    /// Close the browser if this session launched it, and stop the handler.
    pub async fn quit(self) -> Result<()> {
        if self.launched {
            let mut browser = self.inner.browser.lock().await;
            browser.close().await?;
            browser.wait().await?;
        }
        self.handler.abort();
        tracing::debug!("Browser session closed");
        Ok(())
    }
}

/// Extra command-line switches for a launched browser.
fn launch_args(config: &Config) -> Vec<String> {
    let mut args = vec![format!("--user-agent={}", config.scrape.user_agent)];
    args.extend(config.driver.extra_args.iter().cloned());
    args
}

fn browser_config(config: &Config) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder().window_size(WINDOW_SIZE.0, WINDOW_SIZE.1);
    if !config.scrape.headless {
        builder = builder.with_head();
    }
    if let Some(path) = &config.driver.chrome_executable {
        builder = builder.chrome_executable(path);
    }
    for arg in launch_args(config) {
        builder = builder.arg(arg);
    }
    builder.build().map_err(Error::Driver)
}

/// DevTools key event for `key`.
fn key_event(key: Key, kind: DispatchKeyEventType) -> Result<DispatchKeyEventParams> {
    DispatchKeyEventParams::builder()
        .r#type(kind)
        .key(key.name())
        .code(key.name())
        .windows_virtual_key_code(key.key_code())
        .build()
        .map_err(Error::Driver)
}

/// One browser tab.
pub struct BrowserPage {
    inner: Arc<SessionInner>,
    page: chromiumoxide::Page,
}

impl BrowserPage {
    fn wrap(&self, page: chromiumoxide::Page) -> Box<dyn Page> {
        Box::new(BrowserPage {
            inner: Arc::clone(&self.inner),
            page,
        })
    }

    async fn require(&self, selector: &str) -> Result<chromiumoxide::Element> {
        self.page
            .find_elements(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ElementNotFound(selector.to_string()))
    }

    /// Tab opened by this one, once the browser attached it.
    async fn attached_page(
        &self,
        target: &TargetId,
        timeout: Duration,
    ) -> Result<chromiumoxide::Page> {
        let inner = &self.inner;
        poll_until("new view to attach", timeout, move || async move {
            let pages = inner.browser.lock().await.pages().await?;
            Ok::<_, Error>(pages.into_iter().find(|page| page.target_id() == target))
        })
        .await
    }

    /// Wait for the download the last click started. Returns the staged file.
    async fn finished_download(
        &self,
        begun: &mut (impl futures::Stream<Item = Arc<EventDownloadWillBegin>> + Unpin),
        progress: &mut (impl futures::Stream<Item = Arc<EventDownloadProgress>> + Unpin),
    ) -> Result<PathBuf> {
        let guid = match begun.next().await {
            Some(event) => event.guid.clone(),
            None => return Err(Error::Download("browser closed before the download began".into())),
        };
        tracing::debug!("Download {} started", guid);

        while let Some(event) = progress.next().await {
            if event.guid != guid {
                continue;
            }
            match event.state {
                DownloadProgressState::Completed => return Ok(self.inner.staging_dir.join(&guid)),
                DownloadProgressState::Canceled => {
                    return Err(Error::Download(format!("download {} was canceled", guid)))
                }
                DownloadProgressState::InProgress => {}
            }
        }
        Err(Error::Download("browser closed during the download".into()))
    }
}

#[async_trait]
impl Page for BrowserPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| Error::timeout(url, timeout))??;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let input = self.require(selector).await?;
        input.click().await?;
        input
            .call_js_fn("function() { this.value = ''; }", false)
            .await?;
        input.type_str(text).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.require(selector).await?.click().await?;
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.page
            .execute(key_event(key, DispatchKeyEventType::KeyDown)?)
            .await?;
        self.page
            .execute(key_event(key, DispatchKeyEventType::KeyUp)?)
            .await?;
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        Ok(self
            .page
            .find_elements(selector)
            .await?
            .into_iter()
            .map(|element| Box::new(BrowserElement { element }) as Box<dyn Element>)
            .collect())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let page = &self.page;
        poll_until(selector, timeout, move || async move {
            let found = !page.find_elements(selector).await?.is_empty();
            Ok::<_, Error>(found.then_some(()))
        })
        .await
    }

    async fn wait_for_load(&self, timeout: Duration) -> Result<()> {
        let page = &self.page;
        poll_until("document load", timeout, move || async move {
            let state: String = page.evaluate("document.readyState").await?.into_value()?;
            Ok::<_, Error>((state == "complete").then_some(()))
        })
        .await
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn observe_new_view(
        &self,
        trigger: &dyn Element,
        timeout: Duration,
    ) -> Result<Box<dyn Page>> {
        let mut created = self
            .inner
            .browser
            .lock()
            .await
            .event_listener::<EventTargetCreated>()
            .await?;
        let opener = self.page.target_id().clone();

        trigger.click().await?;

        let opened = tokio::time::timeout(timeout, async {
            while let Some(event) = created.next().await {
                let info = &event.target_info;
                let ours = info.opener_id.as_ref().map_or(true, |id| *id == opener);
                if info.r#type == "page" && ours {
                    return Some(info.target_id.clone());
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
        .ok_or_else(|| Error::timeout("new view to open", timeout))?;

        tracing::debug!("New view opened: {:?}", opened);
        let page = self.attached_page(&opened, timeout).await?;
        Ok(self.wrap(page))
    }

    async fn open_view(&self) -> Result<Box<dyn Page>> {
        let page = self
            .inner
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await?;
        Ok(self.wrap(page))
    }

    async fn trigger_download(
        &self,
        selector: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let (mut begun, mut progress) = {
            let browser = self.inner.browser.lock().await;
            (
                browser.event_listener::<EventDownloadWillBegin>().await?,
                browser.event_listener::<EventDownloadProgress>().await?,
            )
        };

        self.click(selector).await?;

        let staged = match tokio::time::timeout(
            timeout,
            self.finished_download(&mut begun, &mut progress),
        )
        .await
        {
            Ok(staged) => staged?,
            Err(_) => {
                return Err(Error::DownloadTimeout {
                    url: self.current_url().await.unwrap_or_default(),
                    after: timeout,
                })
            }
        };

        if tokio::fs::rename(&staged, dest).await.is_err() {
            // Staging and destination may sit on different filesystems.
            tokio::fs::copy(&staged, dest).await?;
            tokio::fs::remove_file(&staged).await?;
        }

        Ok(dest.to_path_buf())
    }

    async fn bring_to_front(&self) -> Result<()> {
        self.page.bring_to_front().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}

/// An element inside a [`BrowserPage`].
pub struct BrowserElement {
    element: chromiumoxide::Element,
}

#[async_trait]
impl Element for BrowserElement {
    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>> {
        Ok(self
            .element
            .find_elements(selector)
            .await?
            .into_iter()
            .next()
            .map(|element| Box::new(BrowserElement { element }) as Box<dyn Element>))
    }

    async fn text(&self) -> Result<String> {
        Ok(self.element.inner_text().await?.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.element.attribute(name).await?)
    }

    async fn click(&self) -> Result<()> {
        self.element.click().await?;
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool> {
        let returns = self
            .element
            .call_js_fn("function() { return !this.disabled; }", false)
            .await?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(true))
    }
}
