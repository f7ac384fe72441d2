//! Detail address resolution for a result row.

use std::fmt;

use crate::config::Config;
use crate::driver::{close_view, is_blank_url, poll_until, Element, Page};
use crate::error::{Error, Result};
use crate::session::throttle;

/// Where a detail address came from, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// `href` of the anchor inside the title cell.
    TitleAnchor,
    /// Data attribute on the title cell.
    TitleAttribute,
    /// Data attribute on the row.
    RowAttribute,
    /// Address of the view opened by clicking the title cell.
    TitlePopup,
    /// Address of the view opened by clicking the row.
    RowPopup,
}

impl fmt::Display for ResolveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveStrategy::TitleAnchor => write!(f, "title anchor"),
            ResolveStrategy::TitleAttribute => write!(f, "title attribute"),
            ResolveStrategy::RowAttribute => write!(f, "row attribute"),
            ResolveStrategy::TitlePopup => write!(f, "title popup"),
            ResolveStrategy::RowPopup => write!(f, "row popup"),
        }
    }
}

/// Resolves the detail address of result rows on the listing page.
pub struct DetailResolver<'a> {
    config: &'a Config,
    page: &'a dyn Page,
}

impl<'a> DetailResolver<'a> {
    pub fn new(config: &'a Config, page: &'a dyn Page) -> Self {
        Self { config, page }
    }

    /// Try every strategy in order and return the first address found.
    pub async fn resolve(
        &self,
        row: &dyn Element,
        title_cell: Option<&dyn Element>,
    ) -> Option<(String, ResolveStrategy)> {
        let selectors = &self.config.selectors;

        if let Some(cell) = title_cell {
            if let Some(href) = self.anchor_href(cell).await {
                return Some((href, ResolveStrategy::TitleAnchor));
            }
            if let Some(href) = self
                .attribute_href(cell, &selectors.title_detail_attribute)
                .await
            {
                return Some((href, ResolveStrategy::TitleAttribute));
            }
        }

        if let Some(href) = self
            .attribute_href(row, &selectors.row_detail_attribute)
            .await
        {
            return Some((href, ResolveStrategy::RowAttribute));
        }

        if let Some(cell) = title_cell {
            if let Some(href) = self.capture_popup(cell).await {
                return Some((href, ResolveStrategy::TitlePopup));
            }
        }

        if let Some(href) = self.capture_popup(row).await {
            return Some((href, ResolveStrategy::RowPopup));
        }

        None
    }

    async fn anchor_href(&self, cell: &dyn Element) -> Option<String> {
        let anchor = cell
            .find(&self.config.selectors.title_anchor)
            .await
            .ok()
            .flatten()?;
        let raw = anchor.attribute("href").await.ok().flatten()?;
        self.config.resolve_href(&raw)
    }

    async fn attribute_href(&self, element: &dyn Element, attribute: &str) -> Option<String> {
        let raw = element.attribute(attribute).await.ok().flatten()?;
        self.config.resolve_href(&raw)
    }

    /// Click `trigger`, read the address of the view it opens, then close that
    /// view and hand focus back to the listing.
    async fn capture_popup(&self, trigger: &dyn Element) -> Option<String> {
        let scrape = &self.config.scrape;

        let view = match self
            .page
            .observe_new_view(trigger, scrape.popup_timeout())
            .await
        {
            Ok(view) => view,
            Err(e) => {
                tracing::debug!("No detail view opened: {}", e);
                return None;
            }
        };

        let address = self.settled_address(view.as_ref()).await;

        close_view(view.as_ref()).await;
        throttle(scrape.throttle()).await;
        if let Err(e) = self.page.bring_to_front().await {
            tracing::warn!("Failed to refocus the listing: {}", e);
        }

        match address {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!("Detail view never finished loading: {}", e);
                None
            }
        }
    }

    /// Address of a freshly opened view once it left `about:blank` and
    /// finished loading.
    async fn settled_address(&self, view: &dyn Page) -> Result<String> {
        let scrape = &self.config.scrape;

        poll_until("detail view address", scrape.popup_timeout(), move || async move {
            let url = view.current_url().await?;
            Ok::<_, Error>((!is_blank_url(&url)).then_some(()))
        })
        .await?;

        view.wait_for_load(scrape.navigation_timeout()).await?;
        let url = view.current_url().await?;
        if is_blank_url(&url) {
            return Err(Error::Driver("detail view went back to a blank page".into()));
        }
        Ok(url)
    }
}
