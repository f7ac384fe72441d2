//! Search result records and date parsing.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date layouts seen in result rows, tried in order.
pub const DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%B %d, %Y",
    "%Y-%m-%d",
    "%b %d, %Y",
    "%d %b %Y",
    "%m/%d/%Y",
];

/// One row of the search results, with its detail address resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub reference: Option<String>,
    pub title: String,
    pub href: String,
    pub date_text: String,
    pub date_parsed: Option<NaiveDate>,
}

impl ResultRecord {
    pub fn new(
        reference: Option<String>,
        title: String,
        href: String,
        date_text: String,
    ) -> Self {
        let date_parsed = parse_date(&date_text);
        Self {
            reference,
            title,
            href,
            date_text,
            date_parsed,
        }
    }

    /// Dedup key: the detail address.
    pub fn key(&self) -> Option<&str> {
        Some(self.href.as_str()).filter(|h| !h.trim().is_empty())
    }

    pub fn year(&self) -> Option<i32> {
        self.date_parsed.map(|d| d.year())
    }
}

/// Parse a result date, trying each of [`DATE_FORMATS`] in order.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}
