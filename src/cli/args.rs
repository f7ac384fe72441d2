//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::pipeline::RunOptions;

/// CDAsia document downloader CLI.
#[derive(Parser, Debug, Default)]
#[command(
    name = "cdasia-downloader",
    version,
    about = "Download SEC-OGC opinions from the CDAsia portal",
    long_about = "Logs into the CDAsia portal, runs a filtered search and downloads every \
                  result exactly once into a year-bucketed, resumable local index.\n\n\
                  Credentials fall back to CDASIA_USERNAME and CDASIA_PASSWORD."
)]
pub struct Args {
    /// Path to configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Inclusive start year.
    #[arg(long)]
    pub year_from: Option<i32>,

    /// Inclusive end year.
    #[arg(long)]
    pub year_to: Option<i32>,

    /// Division filter (e.g. SEC-OGC).
    #[arg(long)]
    pub division: Option<String>,

    /// Keyword terms.
    #[arg(long, num_args = 1..)]
    pub keywords: Option<Vec<String>>,

    /// Library to search in.
    #[arg(long)]
    pub library: Option<String>,

    /// Section filter; repeat for several.
    #[arg(long = "section")]
    pub sections: Vec<String>,

    /// Stop after this many results (0 = unlimited).
    #[arg(long)]
    pub max_docs: Option<usize>,

    /// Run the browser headless.
    #[arg(long, conflicts_with = "no_headless")]
    pub headless: bool,

    /// Show the browser window.
    #[arg(long)]
    pub no_headless: bool,

    /// Ignore the existing index and download everything again.
    #[arg(long)]
    pub no_resume: bool,

    /// List results without downloading.
    #[arg(long)]
    pub dry_run: bool,

    /// Fail instead of waiting when the login needs manual confirmation.
    #[arg(long)]
    pub no_human_checkpoint: bool,

    /// Portal username.
    #[arg(short, long)]
    pub username: Option<String>,

    /// Portal password.
    #[arg(short, long)]
    pub password: Option<String>,

    /// Attach to a running browser at this DevTools address instead of
    /// launching one.
    #[arg(long)]
    pub browser_url: Option<String>,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    pub write_config: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Return `config` with every argument that was given applied on top.
    pub fn apply_to(&self, config: Config) -> Config {
        let mut config = config;
        let filters = &mut config.filters;

        if let Some(year) = self.year_from {
            filters.year_from = Some(year);
        }
        if let Some(year) = self.year_to {
            filters.year_to = Some(year);
        }
        if let Some(division) = &self.division {
            filters.division = Some(division.clone());
        }
        if let Some(keywords) = &self.keywords {
            filters.keywords = keywords.clone();
        }
        if let Some(library) = &self.library {
            filters.library = Some(library.clone());
        }
        if !self.sections.is_empty() {
            filters.sections = self.sections.clone();
        }
        if let Some(max_docs) = self.max_docs {
            filters.max_docs = max_docs;
        }

        if self.headless {
            config.scrape.headless = true;
        } else if self.no_headless {
            config.scrape.headless = false;
        }
        if self.no_resume {
            config.scrape.resume = false;
        }

        if let Some(url) = &self.browser_url {
            config.driver.remote_debugging_url = Some(url.clone());
        }

        config
    }

    /// Per-run switches that do not live in the config file.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            human_checkpoint: !self.no_human_checkpoint,
            username: self.username.clone(),
            password: self.password.clone(),
            show_progress: !self.json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "cdasia-downloader",
            "--year-from",
            "2015",
            "--keywords",
            "SEC-OGC",
            "Opinion",
            "--section",
            "Opinions",
            "--section",
            "Memoranda",
            "--no-headless",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.year_from, Some(2015));
        assert_eq!(
            args.keywords,
            Some(vec!["SEC-OGC".to_string(), "Opinion".to_string()])
        );
        assert_eq!(args.sections, ["Opinions", "Memoranda"]);
        assert!(args.no_headless);
        assert!(args.dry_run);
        assert_eq!(args.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn test_apply_overrides_only_given_fields() {
        let args = Args {
            year_to: Some(2020),
            max_docs: Some(5),
            no_headless: true,
            no_resume: true,
            browser_url: Some("http://localhost:9222".into()),
            ..Default::default()
        };
        let base = Config::default();

        let merged = args.apply_to(base.clone());

        assert_eq!(merged.filters.year_to, Some(2020));
        assert_eq!(merged.filters.max_docs, 5);
        assert!(!merged.scrape.headless);
        assert!(!merged.scrape.resume);
        assert_eq!(
            merged.driver.remote_debugging_url.as_deref(),
            Some("http://localhost:9222")
        );
        assert_eq!(merged.filters.division, base.filters.division);
        assert_eq!(merged.filters.keywords, base.filters.keywords);
        assert!(base.scrape.headless);
    }

    #[test]
    fn test_run_options() {
        let args = Args {
            no_human_checkpoint: true,
            json: true,
            username: Some("alice".into()),
            ..Default::default()
        };
        let options = args.run_options();
        assert!(!options.human_checkpoint);
        assert!(!options.show_progress);
        assert_eq!(options.username.as_deref(), Some("alice"));
    }
}
