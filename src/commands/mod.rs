/*!
 * CLI subcommand handlers
 *
 * Each handler renders its report through the [`OutputWriter`] and turns the
 * outcome into a [`Result`] whose error carries the process exit code.
 *
 * [`OutputWriter`]: crate::output::OutputWriter
 * [`Result`]: crate::error::Result
 */

pub mod init;
pub mod monitor;
pub mod priority;
pub mod restore;
pub mod validate;

pub use init::run_init;
pub use monitor::run_monitor;
pub use priority::run_priority;
pub use restore::{restoration_verdict, run_restore};
pub use validate::{run_validate, validation_verdict};
