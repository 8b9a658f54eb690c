/*!
 * Bulwark - backup integrity and priority-driven restoration
 *
 * The command-line front end over the workspace crates:
 * - `bulwark-core-ledger`: trust-on-first-use SHA-256 ledger for backups
 * - `bulwark-core-audit`: structured audit events and sinks
 * - `bulwark-sentinel`: restoration orchestrator and resilience supervisor
 *
 * This crate adds configuration, logging, the concrete signal sources and
 * the CLI commands.
 */

pub mod cli_style;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod output;
pub mod sources;

// Re-export commonly used types
pub use config::{BulwarkConfig, LogLevel};
pub use engine::Engine;
pub use error::{BulwarkError, Result};
pub use sources::{incident_detector, static_demand_source, FlagFileDetector};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
