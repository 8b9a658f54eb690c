//! Structured output writer supporting JSON Lines and human-readable modes.

use serde::Serialize;

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Writes command results either as tables or as one JSON document per line
#[derive(Debug, Clone)]
pub struct OutputWriter {
    pub mode: OutputMode,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            mode: if json { OutputMode::Json } else { OutputMode::Human },
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Print `value` as JSON, or run `human` to render it for a terminal
    pub fn report<T, F>(&self, value: &T, human: F)
    where
        T: Serialize + ?Sized,
        F: FnOnce(),
    {
        match self.mode {
            OutputMode::Json => match serde_json::to_string(value) {
                Ok(json) => println!("{}", json),
                Err(e) => self.error(&format!("Failed to serialize report: {}", e)),
            },
            OutputMode::Human => human(),
        }
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        match self.mode {
            OutputMode::Json => {
                let error = ErrorLine {
                    error: sanitize_error(msg),
                };
                if let Ok(json) = serde_json::to_string(&error) {
                    eprintln!("{}", json);
                }
            }
            OutputMode::Human => {
                crate::cli_style::print_error(&sanitize_error(msg), None);
            }
        }
    }

    /// Print an info message (suppressed in JSON mode)
    pub fn info(&self, msg: &str) {
        if !self.is_json() {
            crate::cli_style::print_info(msg);
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorLine {
    error: String,
}

/// Sanitize error messages by collapsing whitespace
pub fn sanitize_error(msg: &str) -> String {
    msg.replace(['\n', '\t', '\r'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_sanitize_error_mixed() {
        assert_eq!(
            sanitize_error("ledger\nstore\t unwritable\r\n  (read-only)"),
            "ledger store unwritable (read-only)"
        );
        assert_eq!(sanitize_error(""), "");
        assert_eq!(sanitize_error("already clean"), "already clean");
    }

    #[test]
    fn test_output_writer_modes() {
        assert!(OutputWriter::new(true).is_json());
        assert!(!OutputWriter::new(false).is_json());
    }

    #[test]
    fn test_human_renderer_only_runs_in_human_mode() {
        let rendered = Cell::new(0);
        let order = vec!["servicio_db", "servicio_api"];

        OutputWriter::new(false).report(&order, || rendered.set(rendered.get() + 1));
        assert_eq!(rendered.get(), 1);

        OutputWriter::new(true).report(&order, || rendered.set(rendered.get() + 1));
        assert_eq!(rendered.get(), 1);
    }
}
