use bulwark_sentinel::RestorationReport;

use crate::cli_style::{
    format_bytes, print_success, restoration_table, section_header, stats_table,
};
use crate::engine::Engine;
use crate::error::{BulwarkError, Result};
use crate::output::OutputWriter;

/// Manual trigger: one orchestration run, shared gate with the monitor
pub async fn run_restore(engine: &Engine, output: &OutputWriter) -> Result<()> {
    let report = engine.supervisor.manual_trigger().await?;

    output.report(&report, || {
        section_header(&format!("Restoration ({})", report.date));
        println!("{}", restoration_table(&report));
        let restored: u64 = report.results.values().map(|r| r.bytes_restored).sum();
        println!(
            "\n{}",
            stats_table(&[
                ("Trigger", report.trigger.to_string()),
                ("Order", report.order_ids().join(" > ")),
                ("Restored", format_bytes(restored)),
                ("Summary", report.stats.summary()),
            ])
        );
        if !report.results.is_empty() && report.all_succeeded() {
            print_success("Restoration finished");
        }
    });

    restoration_verdict(&report)
}

pub fn restoration_verdict(report: &RestorationReport) -> Result<()> {
    let failed = report.failures().count();
    if failed > 0 {
        return Err(BulwarkError::Partial(format!(
            "{} of {} restore(s) failed",
            failed,
            report.results.len()
        )));
    }
    Ok(())
}
