//! CSS selectors for every portal control the crawler touches.

use serde::{Deserialize, Serialize};

/// Portal selectors. Defaults target the live DOM as last observed; override
/// any of them under `[selectors]` when the portal markup changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    // Login
    pub login_user: String,
    pub login_pass: String,
    pub login_submit: String,
    /// Element present only after a successful login.
    pub post_login_marker: String,

    // Search filters
    pub library_select: String,
    pub library_options: String,
    pub library_option: String,
    pub overlay_backdrop: String,
    pub section_toggle: String,
    pub division_toggle: String,
    pub keywords_input: String,
    pub year_from_input: String,
    pub year_to_input: String,
    pub search_submit: String,

    // Results
    pub results_container: String,
    pub result_row: String,
    pub row_reference: String,
    pub row_title: String,
    pub row_date: String,
    /// Anchor inside the title cell.
    pub title_anchor: String,
    /// Attribute on the title cell carrying the detail address.
    pub title_detail_attribute: String,
    /// Attribute on the row carrying the detail address.
    pub row_detail_attribute: String,

    // Pagination
    pub pagination_next: String,

    // Detail page
    pub download_link: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            login_user: "input[name='id']".to_string(),
            login_pass: "input[name='password']".to_string(),
            login_submit: "button[type='submit']".to_string(),
            post_login_marker: "nav .user-avatar".to_string(),

            library_select: "mat-select[formcontrolname='library']".to_string(),
            library_options: ".mat-mdc-select-panel".to_string(),
            library_option: ".mat-mdc-select-panel mat-option".to_string(),
            overlay_backdrop: ".cdk-overlay-backdrop".to_string(),
            section_toggle: ".section-filters mat-checkbox".to_string(),
            division_toggle: ".division-filters mat-checkbox".to_string(),
            keywords_input: "input[name='q']".to_string(),
            year_from_input: "input[name='year_from']".to_string(),
            year_to_input: "input[name='year_to']".to_string(),
            search_submit: "button.search-submit".to_string(),

            results_container: "#results".to_string(),
            result_row: "#results .result-row".to_string(),
            row_reference: ".result-reference".to_string(),
            row_title: ".result-title".to_string(),
            row_date: ".result-date".to_string(),
            title_anchor: "a".to_string(),
            title_detail_attribute: "data-href".to_string(),
            row_detail_attribute: "data-href".to_string(),

            pagination_next: "button[aria-label='Next']".to_string(),

            download_link: "a.download-link".to_string(),
        }
    }
}

impl Selectors {
    /// Every selector with its field name, for validation.
    pub fn named(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("login_user", &self.login_user),
            ("login_pass", &self.login_pass),
            ("login_submit", &self.login_submit),
            ("post_login_marker", &self.post_login_marker),
            ("library_select", &self.library_select),
            ("library_options", &self.library_options),
            ("library_option", &self.library_option),
            ("overlay_backdrop", &self.overlay_backdrop),
            ("section_toggle", &self.section_toggle),
            ("division_toggle", &self.division_toggle),
            ("keywords_input", &self.keywords_input),
            ("year_from_input", &self.year_from_input),
            ("year_to_input", &self.year_to_input),
            ("search_submit", &self.search_submit),
            ("results_container", &self.results_container),
            ("result_row", &self.result_row),
            ("row_reference", &self.row_reference),
            ("row_title", &self.row_title),
            ("row_date", &self.row_date),
            ("title_anchor", &self.title_anchor),
            ("title_detail_attribute", &self.title_detail_attribute),
            ("row_detail_attribute", &self.row_detail_attribute),
            ("pagination_next", &self.pagination_next),
            ("download_link", &self.download_link),
        ]
    }
}
