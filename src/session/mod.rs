//! Authenticated portal session.
//!
//! Provides:
//! - Credential resolution and the login sequence
//! - Navigation retry policy and pacing

pub mod auth;
pub mod navigation;

pub use auth::{resolve_credentials, AuthSession, Credentials};
pub use navigation::{navigate_with_retry, throttle, RetryPolicy};
