//! Best-effort search filter steps.
//!
//! Each step tolerates its control being absent: it logs a warning and the
//! search goes on with whatever filters did apply.

use crate::config::Config;
use crate::driver::{Element, Key, Page};
use crate::error::{Error, Result};
use crate::session::throttle;

/// Applies the configured filters to the search form.
pub struct FilterApplier<'a> {
    config: &'a Config,
    page: &'a dyn Page,
}

impl<'a> FilterApplier<'a> {
    pub fn new(config: &'a Config, page: &'a dyn Page) -> Self {
        Self { config, page }
    }

    /// Run every filter step. Never fails; problems are logged.
    pub async fn apply_all(&self) {
        let filters = &self.config.filters;

        if let Some(library) = filters.library.as_deref() {
            warn_on_error("library", self.select_library(library).await);
        }

        for section in &filters.sections {
            warn_on_error(
                "section",
                self.toggle_labelled(&self.config.selectors.section_toggle, section)
                    .await,
            );
        }

        if let Some(division) = filters.division.as_deref() {
            warn_on_error(
                "division",
                self.toggle_labelled(&self.config.selectors.division_toggle, division)
                    .await,
            );
        }

        if !filters.keywords.is_empty() {
            let keywords = filters.keywords.join(" ");
            warn_on_error(
                "keywords",
                self.fill_optional(&self.config.selectors.keywords_input, &keywords)
                    .await,
            );
        }

        if let Some(year) = filters.year_from {
            warn_on_error(
                "year_from",
                self.fill_optional(&self.config.selectors.year_from_input, &year.to_string())
                    .await,
            );
        }

        if let Some(year) = filters.year_to {
            warn_on_error(
                "year_to",
                self.fill_optional(&self.config.selectors.year_to_input, &year.to_string())
                    .await,
            );
        }
    }

    /// Open the library selector, pick `library`, and dismiss the option list.
    pub async fn select_library(&self, library: &str) -> Result<()> {
        let selectors = &self.config.selectors;
        let scrape = &self.config.scrape;

        if self.page.query(&selectors.library_select).await?.is_none() {
            return Err(Error::OptionalControlMissing(format!(
                "library selector '{}'",
                selectors.library_select
            )));
        }

        self.page.click(&selectors.library_select).await?;
        self.page
            .wait_for(&selectors.library_option, scrape.element_timeout())
            .await
            .map_err(|e| {
                Error::OptionalControlMissing(format!("library options never appeared: {}", e))
            })?;

        match find_labelled(self.page, &selectors.library_option, library).await? {
            Some(option) => {
                option.click().await?;
                tracing::info!("Selected library: {}", library);
                throttle(scrape.throttle()).await;
            }
            None => {
                tracing::warn!("Library option '{}' not found", library);
            }
        }

        self.dismiss_library_list().await
    }

    /// Close the option list: backdrop click if there is one, else Escape.
    async fn dismiss_library_list(&self) -> Result<()> {
        let selectors = &self.config.selectors;
        let scrape = &self.config.scrape;

        match self
            .page
            .wait_for(&selectors.overlay_backdrop, scrape.backdrop_timeout())
            .await
        {
            Ok(()) => self.page.click(&selectors.overlay_backdrop).await?,
            Err(_) => self.page.press_key(Key::Escape).await?,
        }

        if self.page.query(&selectors.library_options).await?.is_some() {
            tracing::warn!("Library option list did not close");
        }
        Ok(())
    }

    /// Activate the toggle under `selector` whose label matches `label`.
    pub async fn toggle_labelled(&self, selector: &str, label: &str) -> Result<()> {
        match find_labelled(self.page, selector, label).await? {
            Some(toggle) => {
                toggle.click().await?;
                tracing::info!("Activated filter: {}", label);
                throttle(self.config.scrape.throttle()).await;
                Ok(())
            }
            None => Err(Error::OptionalControlMissing(format!(
                "no toggle labelled '{}' under '{}'",
                label, selector
            ))),
        }
    }

    async fn fill_optional(&self, selector: &str, text: &str) -> Result<()> {
        if self.page.query(selector).await?.is_none() {
            return Err(Error::OptionalControlMissing(format!("input '{}'", selector)));
        }
        self.page.fill(selector, text).await?;
        throttle(self.config.scrape.throttle()).await;
        Ok(())
    }
}

fn warn_on_error(step: &str, result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!("Skipping {} filter: {}", step, e);
    }
}

/// Normalize a visible label for comparison.
fn normalize_label(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First element under `selector` whose label equals `label`, falling back to
/// the first whose label contains it.
pub async fn find_labelled(
    page: &dyn Page,
    selector: &str,
    label: &str,
) -> Result<Option<Box<dyn Element>>> {
    let wanted = normalize_label(label);
    let mut partial = None;

    for element in page.query_all(selector).await? {
        let text = normalize_label(&element.text().await?);
        if text == wanted {
            return Ok(Some(element));
        }
        if partial.is_none() && text.contains(&wanted) {
            partial = Some(element);
        }
    }

    Ok(partial)
}
