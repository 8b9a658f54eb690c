/*!
 * Bulwark CLI - Command Line Interface
 */

use bulwark::{
    cli_style,
    commands::{run_init, run_monitor, run_priority, run_restore, run_validate},
    config::{BulwarkConfig, LogLevel, DEFAULT_CONFIG_FILE},
    error::{BulwarkError, Result, EXIT_SUCCESS},
    incident_detector, logging,
    output::OutputWriter,
    Engine,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bulwark")]
#[command(version, about = "Backup integrity validation and priority-driven restoration", long_about = None)]
struct Cli {
    /// Configuration file (default: ./bulwark.toml if present)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stderr)
    #[arg(long, value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit reports as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify every backup artifact against the integrity ledger
    Validate,

    /// Show the current restoration order
    Priority,

    /// Run one restoration now, regardless of incidents
    Restore,

    /// Validate on an interval and restore when an incident is detected
    Monitor {
        /// Seconds between ticks (overrides monitor_interval_secs)
        #[arg(long, value_name = "SECONDS")]
        interval: Option<u64>,

        /// Treat every tick as an incident
        #[arg(long)]
        assume_incident: bool,
    },

    /// Write a starter configuration file
    Init {
        /// Where to write the file
        #[arg(value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            cli_style::print_error(&e.to_string(), None);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { ref path, force } = cli.command {
        return run_init(path, force);
    }

    let mut config = BulwarkConfig::discover(cli.config.as_deref())?;

    // Command-line flags win over the config file
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let output = OutputWriter::new(cli.json);
    if !output.is_json() {
        cli_style::print_banner();
    }

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| BulwarkError::Config(format!("Failed to start async runtime: {}", e)))?;

    runtime.block_on(async {
        match cli.command {
            Commands::Validate => {
                let engine = Engine::from_config(&config, incident_detector(&config, false))?;
                run_validate(&engine, &output).await
            }
            Commands::Priority => {
                let engine = Engine::from_config(&config, incident_detector(&config, false))?;
                run_priority(&engine, &output).await
            }
            Commands::Restore => {
                let engine = Engine::from_config(&config, incident_detector(&config, false))?;
                run_restore(&engine, &output).await
            }
            Commands::Monitor {
                interval,
                assume_incident,
            } => {
                if let Some(secs) = interval {
                    config.monitor_interval_secs = secs;
                    config.validate()?;
                }
                if !assume_incident && config.incident_flag.is_none() {
                    cli_style::print_warning(
                        "No incident_flag configured: monitoring will validate but never restore",
                    );
                }
                let engine =
                    Engine::from_config(&config, incident_detector(&config, assume_incident))?;
                run_monitor(&engine, config.monitor_interval(), &output).await
            }
            Commands::Init { .. } => Ok(()),
        }
    })
}
