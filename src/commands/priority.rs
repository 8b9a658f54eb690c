use bulwark_sentinel::{DemandSnapshot, RankedService};
use serde::Serialize;

use crate::cli_style::{priority_table, section_header};
use crate::engine::Engine;
use crate::error::Result;
use crate::output::OutputWriter;

#[derive(Serialize)]
struct PriorityView<'a> {
    demand: &'a DemandSnapshot,
    order: &'a [RankedService],
}

/// Show the current restoration order without restoring anything
pub async fn run_priority(engine: &Engine, output: &OutputWriter) -> Result<()> {
    let orchestrator = engine.orchestrator();
    let (demand, order) = orchestrator.priority_order().await;
    let partial_factor = orchestrator.policy().partial_factor;

    output.report(
        &PriorityView {
            demand: &demand,
            order: &order,
        },
        || {
            section_header("Restoration Order");
            println!("{}", priority_table(&order, partial_factor));
        },
    );

    Ok(())
}
