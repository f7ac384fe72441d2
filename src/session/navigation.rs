//! Navigation retry policy and pacing.

use std::time::Duration;

use tokio::time::sleep;

use crate::config::ScrapeConfig;
use crate::driver::Page;
use crate::error::{Error, Result};

/// Fixed-attempt, fixed-delay retry policy for navigation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(scrape: &ScrapeConfig) -> Self {
        Self {
            attempts: scrape.retries.max(1),
            delay: scrape.retry_delay(),
            timeout: scrape.navigation_timeout(),
        }
    }
}

/// Navigate `page` to `url`, retrying on any failure.
///
/// Exhausted attempts surface as [`Error::NavigationTimeout`].
pub async fn navigate_with_retry(page: &dyn Page, url: &str, policy: &RetryPolicy) -> Result<()> {
    let mut last_error = String::new();

    for attempt in 1..=policy.attempts {
        tracing::debug!("Navigating to {} (attempt {}/{})", url, attempt, policy.attempts);

        match page.navigate(url, policy.timeout).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::debug!("Navigation attempt {} failed: {}", attempt, e);
                last_error = e.to_string();
            }
        }

        if attempt < policy.attempts {
            throttle(policy.delay).await;
        }
    }

    Err(Error::NavigationTimeout {
        url: url.to_string(),
        attempts: policy.attempts,
        last_error,
    })
}

/// Fixed pacing pause between site interactions.
pub async fn throttle(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}
