//! Login sequence and credential resolution.

use std::time::Duration;

use crate::config::{Config, CredentialsConfig};
use crate::driver::Page;
use crate::error::{Error, Result};
use crate::session::navigation::{navigate_with_retry, throttle, RetryPolicy};

/// Environment variable holding the portal username.
pub const USERNAME_ENV: &str = "CDASIA_USERNAME";

/// Environment variable holding the portal password.
pub const PASSWORD_ENV: &str = "CDASIA_PASSWORD";

/// Ceiling for the post-login confirmation wait.
pub const LOGIN_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause between typing into the login fields.
const TYPING_PAUSE: Duration = Duration::from_millis(500);

/// Resolved login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Resolve credentials: explicit argument, then config field, then environment.
///
/// Each value is resolved on its own; blank strings count as missing.
pub fn resolve_credentials<F>(
    username: Option<&str>,
    password: Option<&str>,
    config: &CredentialsConfig,
    env: F,
) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let pick = |explicit: Option<&str>, configured: Option<&String>, var: &str| {
        explicit
            .map(str::to_string)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| configured.cloned().filter(|v| !v.trim().is_empty()))
            .or_else(|| env(var).filter(|v| !v.trim().is_empty()))
    };

    let username = pick(username, config.username.as_ref(), USERNAME_ENV);
    let password = pick(password, config.password.as_ref(), PASSWORD_ENV);

    match (username, password) {
        (Some(username), Some(password)) => Ok(Credentials { username, password }),
        (None, None) => Err(Error::Credentials(format!(
            "set {} and {} or pass them explicitly",
            USERNAME_ENV, PASSWORD_ENV
        ))),
        (None, Some(_)) => Err(Error::Credentials(format!("{} is not set", USERNAME_ENV))),
        (Some(_), None) => Err(Error::Credentials(format!("{} is not set", PASSWORD_ENV))),
    }
}

/// Drives the portal login form.
pub struct AuthSession<'a> {
    config: &'a Config,
    page: &'a dyn Page,
    confirm_timeout: Duration,
}

impl<'a> AuthSession<'a> {
    pub fn new(config: &'a Config, page: &'a dyn Page) -> Self {
        Self {
            config,
            page,
            confirm_timeout: LOGIN_CONFIRM_TIMEOUT,
        }
    }

    /// Log in and wait for the post-login marker.
    ///
    /// With `human_checkpoint` a missing marker only warns, leaving room for a
    /// CAPTCHA or second factor completed in the browser window.
    pub async fn login(
        &self,
        human_checkpoint: bool,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        let credentials = resolve_credentials(username, password, &self.config.credentials, |k| {
            std::env::var(k).ok()
        })?;

        let selectors = &self.config.selectors;
        let login_url = self.config.login_url()?;
        let policy = RetryPolicy::from_config(&self.config.scrape);

        navigate_with_retry(self.page, &login_url, &policy).await?;

        self.page
            .fill(&selectors.login_user, &credentials.username)
            .await?;
        throttle(TYPING_PAUSE.min(self.config.scrape.throttle())).await;
        self.page
            .fill(&selectors.login_pass, &credentials.password)
            .await?;
        throttle(TYPING_PAUSE.min(self.config.scrape.throttle())).await;
        self.page.click(&selectors.login_submit).await?;
        throttle(self.config.scrape.throttle()).await;

        if human_checkpoint {
            tracing::info!(
                "If a CAPTCHA or 2FA appears, complete it in the browser window. Waiting up to {}s...",
                self.confirm_timeout.as_secs()
            );
        }

        match self
            .page
            .wait_for(&selectors.post_login_marker, self.confirm_timeout)
            .await
        {
            Ok(()) => {
                tracing::info!("Logged in as {}", credentials.username);
                Ok(())
            }
            Err(e) if human_checkpoint && e.is_timeout() => {
                tracing::warn!("Post-login marker not found yet, continuing: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
