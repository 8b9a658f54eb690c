/*!
 * Bulwark Init Command
 *
 * Writes a starter `bulwark.toml` with every setting spelled out and a
 * demand entry for each built-in service.
 */

use bulwark_sentinel::ServiceRegistry;
use std::path::Path;

use crate::cli_style::{print_info, print_success};
use crate::config::BulwarkConfig;
use crate::error::{BulwarkError, Result};

/// Starter configuration written by `bulwark init`
pub fn starter_config() -> BulwarkConfig {
    let mut config = BulwarkConfig::default();
    for id in ServiceRegistry::builtin().ids() {
        config.demand.insert(id.to_string(), 0.0);
    }
    config
}

pub fn run_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(BulwarkError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    starter_config().to_file(path)?;

    print_success(&format!("Wrote {}", path.display()));
    print_info("Set incident_flag to let `bulwark monitor` react to incidents");
    Ok(())
}
