//! Search submission and result pagination.

use crate::config::Config;
use crate::crawl::filters::FilterApplier;
use crate::crawl::record::ResultRecord;
use crate::crawl::resolve::DetailResolver;
use crate::driver::{poll_until, Element, Page};
use crate::error::{Error, Result};
use crate::session::{navigate_with_retry, throttle, RetryPolicy};

/// Runs a filtered search and collects result records across pages.
pub struct SearchCrawler<'a> {
    config: &'a Config,
    page: &'a dyn Page,
}

impl<'a> SearchCrawler<'a> {
    pub fn new(config: &'a Config, page: &'a dyn Page) -> Self {
        Self { config, page }
    }

    /// Apply filters, submit the search and walk every result page.
    ///
    /// Stops as soon as `filters.max_docs` records are collected (0 means no
    /// cap). Records come back in page and row order.
    pub async fn search(&self) -> Result<Vec<ResultRecord>> {
        let selectors = &self.config.selectors;
        let scrape = &self.config.scrape;
        let max_docs = self.config.filters.max_docs;

        let search_url = self.config.search_url()?;
        let policy = RetryPolicy::from_config(scrape);
        navigate_with_retry(self.page, &search_url, &policy).await?;

        FilterApplier::new(self.config, self.page).apply_all().await;

        self.page.click(&selectors.search_submit).await?;
        throttle(scrape.throttle()).await;
        self.wait_for_results().await?;

        let resolver = DetailResolver::new(self.config, self.page);
        let mut results = Vec::new();
        let mut page_number = 1;

        loop {
            let rows = self.page.query_all(&selectors.result_row).await?;
            tracing::info!("Page {}: {} rows", page_number, rows.len());

            for (index, row) in rows.iter().enumerate() {
                let record = match self.extract_row(&resolver, row.as_ref()).await {
                    Ok(Some(record)) => record,
                    Ok(None) => continue,
                    Err(e @ Error::DetailAddressUnresolvable(_)) => {
                        tracing::warn!("Dropping row {} on page {}: {}", index + 1, page_number, e);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to read row {} on page {}: {}",
                            index + 1,
                            page_number,
                            e
                        );
                        continue;
                    }
                };

                tracing::debug!("Found: {} -> {}", record.title, record.href);
                results.push(record);

                if max_docs > 0 && results.len() >= max_docs {
                    tracing::info!("Reached max_docs={}", max_docs);
                    return Ok(results);
                }
            }

            if !self.advance_page().await? {
                break;
            }
            page_number += 1;
        }

        tracing::info!("Collected {} results across {} pages", results.len(), page_number);
        Ok(results)
    }

    async fn wait_for_results(&self) -> Result<()> {
        let selectors = &self.config.selectors;
        let timeout = self.config.scrape.element_timeout();

        for selector in [&selectors.results_container, &selectors.result_row] {
            if let Err(e) = self.page.wait_for(selector, timeout).await {
                return Err(if e.is_timeout() {
                    Error::ResultsNotFound(format!("'{}' did not appear: {}", selector, e))
                } else {
                    e
                });
            }
        }
        Ok(())
    }

    /// Read one row. `Ok(None)` means the row carries neither reference nor
    /// title and is skipped silently.
    async fn extract_row(
        &self,
        resolver: &DetailResolver<'_>,
        row: &dyn Element,
    ) -> Result<Option<ResultRecord>> {
        let selectors = &self.config.selectors;

        let reference = cell_text(row, &selectors.row_reference).await?;
        let title_cell = row.find(&selectors.row_title).await?;
        let title = match &title_cell {
            Some(cell) => Some(cell.text().await?.trim().to_string()).filter(|t| !t.is_empty()),
            None => None,
        };
        let date_text = cell_text(row, &selectors.row_date).await?.unwrap_or_default();

        let title = match (title, &reference) {
            (Some(title), _) => title,
            (None, Some(reference)) => reference.clone(),
            (None, None) => return Ok(None),
        };

        let (href, strategy) = resolver
            .resolve(row, title_cell.as_deref())
            .await
            .ok_or_else(|| Error::DetailAddressUnresolvable(title.clone()))?;
        tracing::debug!("Resolved '{}' via {}", title, strategy);

        Ok(Some(ResultRecord::new(reference, title, href, date_text)))
    }

    /// Move to the next page. Returns false when there is none.
    async fn advance_page(&self) -> Result<bool> {
        let selectors = &self.config.selectors;
        let scrape = &self.config.scrape;

        let next = match self.page.query(&selectors.pagination_next).await? {
            Some(next) => next,
            None => return Ok(false),
        };
        if !is_active(next.as_ref()).await? {
            return Ok(false);
        }

        let before = self.first_row_signature().await?;
        next.click().await?;
        throttle(scrape.throttle()).await;

        let before = before.as_deref();
        let refreshed = poll_until(
            "result rows to refresh",
            scrape.element_timeout(),
            move || async move {
                let now = self.first_row_signature().await?;
                let changed = now.is_some_and(|signature| Some(signature.as_str()) != before);
                Ok::<_, Error>(changed.then_some(()))
            },
        )
        .await;

        if let Err(e) = refreshed {
            tracing::warn!("Next page never replaced the rows, stopping: {}", e);
            return Ok(false);
        }
        Ok(true)
    }

    /// Text of the first result row; tells one page of rows from the next.
    async fn first_row_signature(&self) -> Result<Option<String>> {
        match self.page.query(&self.config.selectors.result_row).await? {
            Some(row) => Ok(Some(row.text().await?)),
            None => Ok(None),
        }
    }
}

async fn cell_text(row: &dyn Element, selector: &str) -> Result<Option<String>> {
    match row.find(selector).await? {
        Some(cell) => Ok(Some(cell.text().await?.trim().to_string()).filter(|t| !t.is_empty())),
        None => Ok(None),
    }
}

/// A pagination control counts as active when it is enabled and not marked
/// `aria-disabled`.
async fn is_active(control: &dyn Element) -> Result<bool> {
    if !control.is_enabled().await? {
        return Ok(false);
    }
    let aria = control.attribute("aria-disabled").await?;
    Ok(aria.as_deref().map(str::trim) != Some("true"))
}
