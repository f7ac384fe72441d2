//! Run summary reporting.

use console::style;

use crate::pipeline::{RunReport, RunStatus};

/// Print the outcome of a run.
pub fn print_run_summary(report: &RunReport) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style(format!("Run {}:", report.run_id)).bold());

    let status = match report.status {
        RunStatus::Completed => style("completed").green(),
        RunStatus::Failed => style("failed").red(),
        RunStatus::Running => style("running").yellow(),
        RunStatus::Pending => style("pending").dim(),
    };
    println!("  Status:     {}", status);
    println!("  Results:    {}", report.results_found);

    if report.dry_run {
        for item in &report.preview {
            println!("    {} | {} | {}", item.date, item.title, style(&item.href).dim());
        }
        if report.results_found > report.preview.len() {
            println!(
                "    ... and {} more",
                report.results_found - report.preview.len()
            );
        }
    } else {
        println!("  Downloaded: {}", style(report.downloaded).green());
        println!("  Skipped:    {} (already on disk)", style(report.skipped).yellow());
        if report.failed > 0 {
            println!("  Failed:     {}", style(report.failed).red());
        }
        if let Some(path) = &report.index_path {
            println!("  Index:      {} ({} rows)", path.display(), report.index_rows);
        }
    }

    if let Some(elapsed) = report.elapsed() {
        println!("  Elapsed:    {}s", elapsed.num_seconds());
    }
    if let Some(error) = &report.error {
        println!("  Error:      {}", style(error).red());
    }
    println!("{}", style("═".repeat(50)).dim());
}
