//! Output formatters for lint results

mod diff;
mod json;
mod text;

pub use diff::generate_unified_diff;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::diagnostic::Diagnostic;
use crate::engine::{FileReport, LintResult};

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire lint result
    fn format(&self, result: &LintResult) -> String;

    /// Format a single diagnostic of `report`
    fn format_diagnostic(&self, report: &FileReport, diagnostic: &Diagnostic) -> String;
}

/// Formatter for a configured output format
pub fn create_formatter(format: OutputFormat, colored: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new();
            Box::new(if colored {
                formatter
            } else {
                formatter.without_color()
            })
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
    }
}
