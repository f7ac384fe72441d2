//! CDAsia Downloader - CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use cdasia_downloader::{
    cli::Args,
    config::{validate_config, Config},
    driver::BrowserSession,
    error::{exit_codes, Result},
    logging::init_logging,
    output::{
        create_spinner, print_banner, print_config_summary, print_error, print_info,
        print_run_summary, print_success, print_warning,
    },
    pipeline::{exit_code_for, run_once, RunReport},
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            ExitCode::from(exit_code_for(&e) as u8)
        }
    }
}

async fn run() -> Result<i32> {
    // Parse CLI arguments
    let args = Args::parse();

    if !args.json {
        print_banner();
    }

    // Load configuration
    let (file_config, found) = Config::load_or_default(&args.config)?;
    if !found && !args.json {
        print_warning(&format!(
            "Configuration file not found: {}",
            args.config.display()
        ));
        print_info("Using default configuration with CLI arguments");
    }

    // Merge CLI arguments into config
    let config = args.apply_to(file_config);
    validate_config(&config)?;

    if args.write_config {
        config.save(&args.config)?;
        print_success(&format!("Configuration written to {}", args.config.display()));
        return Ok(exit_codes::SUCCESS);
    }

    let _log_guard = init_logging(args.debug, &config.site.log_dir)?;

    if !args.json {
        print_config_summary(&config, args.dry_run);
    }

    let spinner = (!args.json).then(|| create_spinner("Starting browser session..."));
    let session = BrowserSession::start(&config).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let session = session?;
    let page = session.main_page();

    let mut report = RunReport::new();
    let outcome = run_once(&config, &page, &args.run_options(), &mut report).await;

    if let Err(e) = session.quit().await {
        tracing::warn!("Failed to end browser session: {}", e);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_summary(&report);
    }

    outcome?;

    if report.failed > 0 {
        print_warning(&format!("{} document(s) failed to download", report.failed));
        return Ok(exit_codes::SOME_DOWNLOADS_FAILED);
    }
    Ok(exit_codes::SUCCESS)
}
