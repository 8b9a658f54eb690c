use bulwark_core_ledger::ValidationReport;

use crate::cli_style::{
    print_success, print_warning, section_header, stats_table, validation_table,
};
use crate::engine::Engine;
use crate::error::{BulwarkError, Result};
use crate::output::OutputWriter;

/// Run one validation cycle over every backup artifact
pub async fn run_validate(engine: &Engine, output: &OutputWriter) -> Result<()> {
    let report = engine.supervisor.validate().await?;

    output.report(&report, || {
        section_header("Backup Integrity");
        if report.statuses.is_empty() {
            print_warning("No backup artifacts found");
        } else {
            println!("{}", validation_table(&report));
        }
        let stats = &report.stats;
        println!(
            "\n{}",
            stats_table(&[
                ("Verified", stats.verified.to_string()),
                ("Registered", stats.registered.to_string()),
                ("Mismatched", stats.mismatched.to_string()),
                ("Missing", stats.missing.to_string()),
                ("Errors", stats.errored.to_string()),
                ("Valid", format!("{:.1}%", stats.health_ratio() * 100.0)),
            ])
        );
        if report.stats.total() > 0 && report.stats.valid() == report.stats.total() {
            print_success("All backups usable as restore sources");
        }
    });

    validation_verdict(&report)
}

/// Mismatches outrank missing or unreadable artifacts
pub fn validation_verdict(report: &ValidationReport) -> Result<()> {
    if report.has_mismatch() {
        return Err(BulwarkError::IntegrityMismatch {
            count: report.stats.mismatched,
        });
    }

    let invalid = report.invalid().count();
    if invalid > 0 {
        return Err(BulwarkError::Partial(format!(
            "{} backup artifact(s) missing or unreadable",
            invalid
        )));
    }

    Ok(())
}
