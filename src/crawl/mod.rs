//! Search crawling.
//!
//! Provides:
//! - Best-effort filter application
//! - Result pagination with a document cap
//! - Detail address resolution with popup fallbacks
//! - Result records and date parsing

pub mod crawler;
pub mod filters;
pub mod record;
pub mod resolve;

pub use crawler::SearchCrawler;
pub use filters::FilterApplier;
pub use record::{parse_date, ResultRecord};
pub use resolve::{DetailResolver, ResolveStrategy};
