use std::time::Duration;
use tracing::info;

use crate::cli_style::{print_warning, tick_line};
use crate::engine::Engine;
use crate::error::{BulwarkError, Result};
use crate::output::OutputWriter;

/// Monitor until Ctrl-C, printing one line per tick
///
/// On Ctrl-C the loop is stopped gracefully: an in-flight tick finishes its
/// current step before the command returns.
pub async fn run_monitor(
    engine: &Engine,
    interval: Duration,
    output: &OutputWriter,
) -> Result<()> {
    let mut reports = engine.supervisor.subscribe();
    engine.supervisor.start_monitoring(interval)?;
    output.info(&format!(
        "Monitoring every {}s, press Ctrl-C to stop",
        interval.as_secs()
    ));

    let outcome = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(BulwarkError::from),
            changed = reports.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let latest = reports.borrow_and_update().clone();
                if let Some(report) = latest {
                    output.report(&*report, || println!("{}", tick_line(&report)));
                }
            }
        }
    };

    info!("Stopping monitoring");
    if !engine.supervisor.stop_monitoring().await {
        print_warning("Monitoring loop had already exited");
    }

    outcome
}
