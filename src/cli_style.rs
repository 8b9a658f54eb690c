/*!
 * Bulwark CLI Style System
 *
 * Themed text and tables for validation, priority and restoration reports.
 */

use bulwark_core_ledger::{StatusKind, ValidationReport};
use bulwark_sentinel::{
    RankedService, RestorationOutcome, RestorationReport, RestoreMode, TickReport,
};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

// ============================================================================
// THEME COLORS
// ============================================================================

/// Brand colors for consistent styling
pub struct Theme;

impl Theme {
    /// Primary accent color (cyan/blue)
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    /// Success color (green)
    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    /// Warning color (yellow)
    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    /// Error color (red)
    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    /// Muted/secondary text (dim)
    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    /// Header style (bold cyan)
    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }
}

// ============================================================================
// ICONS
// ============================================================================

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";
    pub const PENDING: &'static str = "○";
    pub const SHIELD: &'static str = "🛡";
    pub const ARROW_RIGHT: &'static str = "→";
}

/// Draw a section header with a line
pub fn section_header(title: &str) {
    let line_len = 50 - title.len().min(40);
    println!(
        "\n{} {}",
        Theme::header(title),
        Theme::muted("─".repeat(line_len))
    );
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a styled data table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a minimal table (no outer borders)
pub fn create_minimal_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cells(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| Cell::new(name).fg(Color::Cyan).add_attribute(Attribute::Bold))
        .collect()
}

/// Create a key-value table for stats
pub fn stats_table(items: &[(&str, String)]) -> Table {
    let mut table = create_minimal_table();

    for (key, value) in items {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(value)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
        ]);
    }

    table
}

/// One row per artifact of a validation cycle
pub fn validation_table(report: &ValidationReport) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&["Artifact", "Status", "Details"]));

    for status in report.statuses.values() {
        table.add_row(vec![
            Cell::new(&status.artifact_id),
            status_cell(status.outcome),
            Cell::new(&status.message).fg(Color::DarkGrey),
        ]);
    }

    table
}

/// Ranked services, most urgent first
pub fn priority_table(order: &[RankedService], partial_factor: f64) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&[
        "#",
        "Service",
        "Priority",
        "Demand",
        "Threshold",
        "Ratio",
        "Effective",
        "Mode",
    ]));

    for (rank, service) in order.iter().enumerate() {
        let mode = RestoreMode::select(
            service.current_demand,
            service.demand_threshold,
            partial_factor,
        );
        let ratio = if service.is_overloaded() {
            Cell::new(format!("{:.2}", service.demand_ratio)).fg(Color::Yellow)
        } else {
            Cell::new(format!("{:.2}", service.demand_ratio))
        };

        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&service.id).add_attribute(Attribute::Bold),
            Cell::new(service.priority),
            Cell::new(format!("{:.1}", service.current_demand)),
            Cell::new(format!("{:.1}", service.demand_threshold)),
            ratio,
            Cell::new(format!("{:.3}", service.effective_priority)),
            Cell::new(mode),
        ]);
    }

    table
}

/// Attempted services in execution order, then deferred ones
pub fn restoration_table(report: &RestorationReport) -> Table {
    let mut table = create_table();
    table.set_header(header_cells(&["Service", "Mode", "Result", "Restored", "Details"]));

    for result in report.results.values() {
        let outcome = if result.success {
            Cell::new(format!("{} Restored", Icons::SUCCESS)).fg(Color::Green)
        } else {
            Cell::new(format!("{} Failed", Icons::ERROR)).fg(Color::Red)
        };

        table.add_row(vec![
            Cell::new(&result.service_id).add_attribute(Attribute::Bold),
            Cell::new(result.mode),
            outcome,
            Cell::new(format_bytes(result.bytes_restored)),
            Cell::new(&result.message).fg(Color::DarkGrey),
        ]);
    }

    for service_id in &report.deferred {
        table.add_row(vec![
            Cell::new(service_id),
            Cell::new("-"),
            Cell::new(format!("{} Deferred", Icons::PENDING)).fg(Color::DarkGrey),
            Cell::new("-"),
            Cell::new("demand below threshold after an earlier restore").fg(Color::DarkGrey),
        ]);
    }

    table
}

/// One-line summary of a monitoring tick
pub fn tick_line(report: &TickReport) -> String {
    let validation = match report.validation {
        Ok(ref v) => v.stats.summary(),
        Err(ref e) => format!("Validation failed: {}", e),
    };
    let restoration = match report.restoration {
        RestorationOutcome::NotTriggered => "no incident".to_string(),
        RestorationOutcome::Completed(ref r) => r.stats.summary(),
        RestorationOutcome::Rejected => {
            "restoration skipped, another run in progress".to_string()
        }
        RestorationOutcome::Aborted(ref reason) => {
            format!("restoration aborted: {}", reason)
        }
        RestorationOutcome::Cancelled => "monitoring stopped".to_string(),
    };

    format!(
        "tick {} {} {} {} {}",
        report.tick,
        Icons::ARROW_RIGHT,
        validation,
        Icons::ARROW_RIGHT,
        restoration
    )
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn status_cell(kind: StatusKind) -> Cell {
    match kind {
        StatusKind::Verified => Cell::new(format!("{} verified", Icons::SUCCESS)).fg(Color::Green),
        StatusKind::Registered => {
            Cell::new(format!("{} registered", Icons::SUCCESS)).fg(Color::Cyan)
        }
        StatusKind::Mismatch => Cell::new(format!("{} mismatch", Icons::ERROR))
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        StatusKind::NotFound => {
            Cell::new(format!("{} not found", Icons::WARNING)).fg(Color::Yellow)
        }
        StatusKind::Error => Cell::new(format!("{} error", Icons::WARNING)).fg(Color::Yellow),
    }
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let base = 1024.0_f64;
    let exp = (bytes_f.ln() / base.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f / base.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.2} {}", value, UNITS[exp])
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

/// Print a styled warning message
pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

/// Print a styled success message
pub fn print_success(message: &str) {
    println!(
        "{} {}",
        Theme::success(Icons::SUCCESS.to_string()),
        Theme::success(message)
    );
}

/// Print a styled info message
pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO.to_string()), message);
}

/// Print the Bulwark banner
pub fn print_banner() {
    println!(
        "\n{} {} {}\n",
        Icons::SHIELD,
        Theme::header("B U L W A R K"),
        Theme::muted(format!("v{}", env!("CARGO_PKG_VERSION")))
    );
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_sentinel::{rank_services, DemandSnapshot, ServiceRegistry};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(64 * 1024 * 1024), "64.00 MB");
    }

    #[test]
    fn test_priority_table_has_one_row_per_service() {
        let registry = ServiceRegistry::builtin();
        let demand = DemandSnapshot::new()
            .with("servicio_db", 150.0)
            .with("servicio_api", 65.0);
        let order = rank_services(&registry, &demand, 0.1);

        let rendered = priority_table(&order, 1.5).to_string();
        assert!(rendered.contains("servicio_db"));
        assert!(rendered.contains("servicio_web"));
        assert!(rendered.contains("full"));
        assert!(rendered.contains("partial"));
    }
}
