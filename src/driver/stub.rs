//! Scripted in-memory page driver for tests.
//!
//! A [`StubPortal`] holds pages of result rows, the set of controls that
//! exist, scripted popups and downloads, and a log of every interaction.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Selectors;
use crate::driver::{Element, Key, Page};
use crate::error::{Error, Result};

/// One result row on a stub listing page.
#[derive(Debug, Clone, Default)]
pub struct StubRow {
    pub reference: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub title_href: Option<String>,
    pub title_data: Option<String>,
    pub row_data: Option<String>,
    pub title_popup: Option<String>,
    pub row_popup: Option<String>,
}

impl StubRow {
    pub fn new(reference: &str, title: &str, date: &str) -> Self {
        Self {
            reference: Some(reference.to_string()).filter(|s| !s.is_empty()),
            title: Some(title.to_string()).filter(|s| !s.is_empty()),
            date: Some(date.to_string()).filter(|s| !s.is_empty()),
            ..Default::default()
        }
    }

    pub fn anchor(mut self, href: &str) -> Self {
        self.title_href = Some(href.to_string());
        self
    }

    pub fn title_data(mut self, href: &str) -> Self {
        self.title_data = Some(href.to_string());
        self
    }

    pub fn row_data(mut self, href: &str) -> Self {
        self.row_data = Some(href.to_string());
        self
    }

    pub fn title_popup(mut self, url: &str) -> Self {
        self.title_popup = Some(url.to_string());
        self
    }

    pub fn row_popup(mut self, url: &str) -> Self {
        self.row_popup = Some(url.to_string());
        self
    }
}

#[derive(Default)]
struct StubState {
    selectors: Selectors,
    pages: Vec<Vec<StubRow>>,
    current_page: usize,
    present: HashSet<String>,
    labelled: HashMap<String, Vec<String>>,
    /// Selectors that stay attached after an Escape key or backdrop click.
    sticky: HashSet<String>,
    downloads: HashMap<String, Vec<u8>>,
    failing_downloads: HashSet<String>,
    navigation_failures: usize,
    pending_popup: Option<String>,
    /// `current_url` reads on a new popup that still report `about:blank`.
    blank_popup_reads: usize,
    /// Row queries after a next click that still see the old page.
    page_swap_delay: usize,
    pending_swap: Option<usize>,
    open_views: usize,
    events: Vec<String>,
}

/// Handle shared by the test and every stub page/element.
#[derive(Clone)]
pub struct StubPortal {
    state: Arc<Mutex<StubState>>,
}

impl StubPortal {
    /// A portal whose login and search controls all exist.
    pub fn new() -> Self {
        let selectors = Selectors::default();
        let present = [
            &selectors.login_user,
            &selectors.login_pass,
            &selectors.login_submit,
            &selectors.post_login_marker,
            &selectors.keywords_input,
            &selectors.year_from_input,
            &selectors.year_to_input,
            &selectors.search_submit,
            &selectors.results_container,
        ]
        .into_iter()
        .cloned()
        .collect();

        Self {
            state: Arc::new(Mutex::new(StubState {
                selectors,
                present,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().expect("stub state poisoned")
    }

    pub fn with_pages(self, pages: Vec<Vec<StubRow>>) -> Self {
        self.lock().pages = pages;
        self
    }

    /// Make a control exist.
    pub fn with_control(self, selector: &str) -> Self {
        self.lock().present.insert(selector.to_string());
        self
    }

    /// Remove a control.
    pub fn without_control(self, selector: &str) -> Self {
        self.lock().present.remove(selector);
        self
    }

    /// Add elements matching `selector` with the given visible labels.
    pub fn with_labels(self, selector: &str, labels: &[&str]) -> Self {
        self.lock().labelled.insert(
            selector.to_string(),
            labels.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Keep `selector` attached even after a dismissal attempt.
    pub fn with_sticky(self, selector: &str) -> Self {
        self.lock().sticky.insert(selector.to_string());
        self
    }

    pub fn with_download(self, url: &str, bytes: &[u8]) -> Self {
        self.lock().downloads.insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn with_failing_download(self, url: &str) -> Self {
        self.lock().failing_downloads.insert(url.to_string());
        self
    }

    /// New popups report `about:blank` for their first `reads` address reads.
    pub fn with_blank_popup_reads(self, reads: usize) -> Self {
        self.lock().blank_popup_reads = reads;
        self
    }

    /// After a next click, the next `queries` row lookups still return the
    /// previous page.
    pub fn with_page_swap_delay(self, queries: usize) -> Self {
        self.lock().page_swap_delay = queries;
        self
    }

    /// Fail the next `count` navigations with a timeout.
    pub fn with_navigation_failures(self, count: usize) -> Self {
        self.lock().navigation_failures = count;
        self
    }

    /// The main listing view.
    pub fn page(&self) -> StubPage {
        StubPage {
            portal: self.clone(),
            url: Mutex::new("stub://listing".to_string()),
            blank_reads: Mutex::new(0),
            is_view: false,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.lock().events.clone()
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.lock().events.iter().any(|e| e == event)
    }

    pub fn count_events(&self, prefix: &str) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn open_views(&self) -> usize {
        self.lock().open_views
    }

    fn log(&self, event: String) {
        self.lock().events.push(event);
    }

    fn has_next_page(state: &StubState) -> bool {
        state.current_page + 1 < state.pages.len()
    }
}

/// A stub view: either the listing or an ephemeral detail tab.
pub struct StubPage {
    portal: StubPortal,
    url: Mutex<String>,
    blank_reads: Mutex<usize>,
    is_view: bool,
}

impl StubPage {
    fn url(&self) -> String {
        self.url.lock().expect("stub url poisoned").clone()
    }

    fn elements_for(&self, selector: &str) -> Vec<Box<dyn Element>> {
        let mut state = self.portal.lock();
        let make = |kind: ElementKind| -> Box<dyn Element> {
            Box::new(StubElement {
                portal: self.portal.clone(),
                kind,
            })
        };

        if self.is_view {
            return Vec::new();
        }

        if selector == state.selectors.result_row {
            match state.pending_swap {
                Some(0) => {
                    state.current_page += 1;
                    state.pending_swap = None;
                }
                Some(n) => state.pending_swap = Some(n - 1),
                None => {}
            }
            let page = state.current_page;
            let count = state.pages.get(page).map(Vec::len).unwrap_or(0);
            return (0..count).map(|row| make(ElementKind::Row { page, row })).collect();
        }

        if selector == state.selectors.pagination_next {
            return if StubPortal::has_next_page(&state) {
                vec![make(ElementKind::Next)]
            } else {
                Vec::new()
            };
        }

        if let Some(labels) = state.labelled.get(selector) {
            return labels
                .iter()
                .map(|label| {
                    make(ElementKind::Labelled {
                        selector: selector.to_string(),
                        label: label.clone(),
                    })
                })
                .collect();
        }

        if state.present.contains(selector) {
            return vec![make(ElementKind::Control(selector.to_string()))];
        }

        Vec::new()
    }
}

#[async_trait]
impl Page for StubPage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        {
            let mut state = self.portal.lock();
            state.events.push(format!("navigate:{}", url));
            if state.navigation_failures > 0 {
                state.navigation_failures -= 1;
                return Err(Error::timeout(url, Duration::ZERO));
            }
        }
        *self.url.lock().expect("stub url poisoned") = url.to_string();
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        if self.elements_for(selector).is_empty() {
            return Err(Error::ElementNotFound(selector.to_string()));
        }
        self.portal.log(format!("fill:{}={}", selector, text));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        match self.elements_for(selector).into_iter().next() {
            Some(element) => element.click().await,
            None => Err(Error::ElementNotFound(selector.to_string())),
        }
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        let mut state = self.portal.lock();
        state.events.push(format!("key:{:?}", key));
        if key == Key::Escape {
            let sticky = state.sticky.clone();
            let options = state.selectors.library_options.clone();
            if !sticky.contains(&options) {
                state.present.remove(&options);
            }
        }
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn Element>>> {
        Ok(self.elements_for(selector))
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.elements_for(selector).is_empty() {
            self.portal.log(format!("timeout:{}", selector));
            return Err(Error::timeout(selector, timeout));
        }
        Ok(())
    }

    async fn wait_for_load(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let mut blank_reads = self.blank_reads.lock().expect("stub url poisoned");
        if *blank_reads > 0 {
            *blank_reads -= 1;
            return Ok("about:blank".to_string());
        }
        Ok(self.url())
    }

    async fn observe_new_view(
        &self,
        trigger: &dyn Element,
        timeout: Duration,
    ) -> Result<Box<dyn Page>> {
        trigger.click().await?;

        let (popup, blank_reads) = {
            let mut state = self.portal.lock();
            let popup = state.pending_popup.take();
            if popup.is_some() {
                state.open_views += 1;
            }
            (popup, state.blank_popup_reads)
        };

        match popup {
            Some(url) => {
                self.portal.log(format!("popup:{}", url));
                Ok(Box::new(StubPage {
                    portal: self.portal.clone(),
                    url: Mutex::new(url),
                    blank_reads: Mutex::new(blank_reads),
                    is_view: true,
                }))
            }
            None => Err(Error::timeout("new view to open", timeout)),
        }
    }

    async fn open_view(&self) -> Result<Box<dyn Page>> {
        {
            let mut state = self.portal.lock();
            state.open_views += 1;
            state.events.push("open_view".to_string());
        }
        Ok(Box::new(StubPage {
            portal: self.portal.clone(),
            url: Mutex::new("about:blank".to_string()),
            blank_reads: Mutex::new(0),
            is_view: true,
        }))
    }

    async fn trigger_download(
        &self,
        selector: &str,
        dest: &Path,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let url = self.url();
        let bytes = {
            let state = self.portal.lock();
            if selector != state.selectors.download_link {
                return Err(Error::ElementNotFound(selector.to_string()));
            }
            if state.failing_downloads.contains(&url) {
                drop(state);
                self.portal.log(format!("download_failed:{}", url));
                return Err(Error::DownloadTimeout { url, after: timeout });
            }
            state
                .downloads
                .get(&url)
                .cloned()
                .unwrap_or_else(|| format!("%PDF-1.4 stub for {}", url).into_bytes())
        };

        std::fs::write(dest, bytes)?;
        self.portal.log(format!("download:{}", url));
        Ok(dest.to_path_buf())
    }

    async fn bring_to_front(&self) -> Result<()> {
        self.portal.log("focus:listing".to_string());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let url = self.url();
        let mut state = self.portal.lock();
        state.open_views = state.open_views.saturating_sub(1);
        state.events.push(format!("close:{}", url));
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Cell {
    Reference,
    Title,
    Date,
}

#[derive(Debug, Clone)]
enum ElementKind {
    Row { page: usize, row: usize },
    Cell { page: usize, row: usize, cell: Cell },
    Anchor { page: usize, row: usize },
    Next,
    Labelled { selector: String, label: String },
    Control(String),
}

struct StubElement {
    portal: StubPortal,
    kind: ElementKind,
}

impl StubElement {
    fn row(&self, page: usize, row: usize) -> StubRow {
        self.portal.lock().pages[page][row].clone()
    }

    fn child(&self, kind: ElementKind) -> Option<Box<dyn Element>> {
        Some(Box::new(StubElement {
            portal: self.portal.clone(),
            kind,
        }))
    }
}

#[async_trait]
impl Element for StubElement {
    async fn find(&self, selector: &str) -> Result<Option<Box<dyn Element>>> {
        let selectors = self.portal.lock().selectors.clone();

        Ok(match &self.kind {
            ElementKind::Row { page, row } => {
                let data = self.row(*page, *row);
                let (page, row) = (*page, *row);
                if selector == selectors.row_reference && data.reference.is_some() {
                    self.child(ElementKind::Cell { page, row, cell: Cell::Reference })
                } else if selector == selectors.row_title && data.title.is_some() {
                    self.child(ElementKind::Cell { page, row, cell: Cell::Title })
                } else if selector == selectors.row_date && data.date.is_some() {
                    self.child(ElementKind::Cell { page, row, cell: Cell::Date })
                } else {
                    None
                }
            }
            ElementKind::Cell { page, row, cell: Cell::Title } => {
                let data = self.row(*page, *row);
                if selector == selectors.title_anchor && data.title_href.is_some() {
                    self.child(ElementKind::Anchor { page: *page, row: *row })
                } else {
                    None
                }
            }
            _ => None,
        })
    }

    async fn text(&self) -> Result<String> {
        Ok(match &self.kind {
            ElementKind::Cell { page, row, cell } => {
                let data = self.row(*page, *row);
                match cell {
                    Cell::Reference => data.reference,
                    Cell::Title => data.title,
                    Cell::Date => data.date,
                }
                .unwrap_or_default()
            }
            ElementKind::Row { page, row } => {
                let data = self.row(*page, *row);
                [data.reference, data.title, data.date]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" | ")
            }
            ElementKind::Anchor { page, row } => self.row(*page, *row).title.unwrap_or_default(),
            ElementKind::Labelled { label, .. } => label.clone(),
            ElementKind::Next => "Next".to_string(),
            _ => String::new(),
        })
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let selectors = self.portal.lock().selectors.clone();

        Ok(match &self.kind {
            ElementKind::Anchor { page, row } if name == "href" => {
                self.row(*page, *row).title_href
            }
            ElementKind::Cell { page, row, cell: Cell::Title }
                if name == selectors.title_detail_attribute =>
            {
                self.row(*page, *row).title_data
            }
            ElementKind::Row { page, row } if name == selectors.row_detail_attribute => {
                self.row(*page, *row).row_data
            }
            _ => None,
        })
    }

    async fn click(&self) -> Result<()> {
        let mut state = self.portal.lock();
        match &self.kind {
            ElementKind::Cell { page, row, cell: Cell::Title } => {
                let popup = state.pages[*page][*row].title_popup.clone();
                state.pending_popup = popup;
                state.events.push(format!("click:title:{}", row));
            }
            ElementKind::Row { page, row } => {
                let popup = state.pages[*page][*row].row_popup.clone();
                state.pending_popup = popup;
                state.events.push(format!("click:row:{}", row));
            }
            ElementKind::Next => {
                if state.page_swap_delay > 0 {
                    state.pending_swap = Some(state.page_swap_delay);
                } else {
                    state.current_page += 1;
                }
                state.events.push("click:next".to_string());
            }
            ElementKind::Labelled { selector, label } => {
                state.events.push(format!("click:{}={}", selector, label));
            }
            ElementKind::Control(selector) => {
                let selector = selector.clone();
                if selector == state.selectors.library_select {
                    let options = state.selectors.library_options.clone();
                    state.present.insert(options);
                } else if selector == state.selectors.overlay_backdrop
                    && !state.sticky.contains(&state.selectors.library_options)
                {
                    let options = state.selectors.library_options.clone();
                    state.present.remove(&options);
                }
                state.events.push(format!("click:{}", selector));
            }
            _ => {}
        }
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool> {
        Ok(true)
    }
}
