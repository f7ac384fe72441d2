//! Console output utilities.

use console::style;

use crate::config::Config;

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", style("INFO").cyan().bold(), message);
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", style("OK").green().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", style("WARN").yellow().bold(), message);
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", style("ERROR").red().bold(), message);
}

/// Print the application banner.
pub fn print_banner() {
    let banner = r#"
╔═══════════════════════════════════════════════════════╗
║     CDAsia Downloader                                 ║
║     Resumable SEC-OGC opinion downloads               ║
╚═══════════════════════════════════════════════════════╝
"#;
    println!("{}", style(banner).cyan());
}

/// Print the filters and locations a run will use.
pub fn print_config_summary(config: &Config, dry_run: bool) {
    let filters = &config.filters;
    let or_any = |value: Option<String>| value.unwrap_or_else(|| "any".to_string());

    println!();
    println!("{}", style("Configuration:").bold());
    println!("  Portal:    {}", config.site.base_url);
    println!("  Library:   {}", or_any(filters.library.clone()));
    if !filters.sections.is_empty() {
        println!("  Sections:  {}", filters.sections.join(", "));
    }
    println!("  Division:  {}", or_any(filters.division.clone()));
    if !filters.keywords.is_empty() {
        println!("  Keywords:  {}", filters.keywords.join(" "));
    }
    println!(
        "  Years:     {} - {}",
        or_any(filters.year_from.map(|y| y.to_string())),
        or_any(filters.year_to.map(|y| y.to_string()))
    );
    if filters.max_docs > 0 {
        println!("  Max docs:  {}", filters.max_docs);
    }
    println!("  Directory: {}", config.site.downloads_dir.display());
    println!(
        "  Mode:      {}{}",
        if dry_run { "dry run" } else { "download" },
        if config.scrape.resume { ", resume" } else { "" }
    );
    println!();
}
