//! Human-readable text output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::{FileReport, LintResult};
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show the source line with the span underlined
    pub show_source: bool,

    /// Show help text
    pub show_help: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    pub fn without_stats(mut self) -> Self {
        self.show_stats = false;
        self
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.colored {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn severity_str(&self, severity: Severity) -> String {
        let s = severity.to_string();
        match severity {
            Severity::Error => self.paint(&s, |s| s.red().bold()),
            Severity::Warning => self.paint(&s, |s| s.yellow().bold()),
            Severity::Info => self.paint(&s, |s| s.blue()),
        }
    }

    fn count(&self, n: usize, singular: &str, style: fn(&str) -> ColoredString) -> String {
        let s = format!("{} {}{}", n, singular, if n == 1 { "" } else { "s" });
        self.paint(&s, style)
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &LintResult) -> String {
        let mut output = String::new();

        for report in &result.files {
            if report.diagnostics.is_empty()
                && report.failures.is_empty()
                && report.error.is_none()
                && report.diff.is_none()
            {
                continue;
            }

            let file = report.path.display().to_string();
            output.push_str(&format!("{}\n", self.paint(&file, |s| s.underline())));

            if let Some(error) = &report.error {
                output.push_str(&format!("  {}: {}\n", self.severity_str(Severity::Error), error));
            }
            for diag in &report.diagnostics {
                output.push_str(&self.format_diagnostic(report, diag));
                output.push('\n');
            }
            for failure in &report.failures {
                output.push_str(&format!("  {}: {}\n", self.paint("rule failure", |s| s.magenta()), failure));
            }
            if let Some(diff) = &report.diff {
                output.push_str(diff);
            }
            if let Some(state) = report.fix_state {
                output.push_str(&format!(
                    "  {} {} fix(es) applied, {}\n",
                    self.paint("=", |s| s.green()),
                    report.fixes_applied,
                    state
                ));
            }
            output.push('\n');
        }

        if self.show_stats {
            output.push_str(&format!(
                "{} {} processed",
                result.files_processed,
                if result.files_processed == 1 {
                    "file"
                } else {
                    "files"
                }
            ));

            let mut counts = Vec::new();
            if result.error_count > 0 {
                counts.push(self.count(result.error_count, "error", |s| s.red()));
            }
            if result.warning_count > 0 {
                counts.push(self.count(result.warning_count, "warning", |s| s.yellow()));
            }
            if result.info_count > 0 {
                counts.push(self.count(result.info_count, "info", |s| s.blue()));
            }
            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            if result.fixes_applied > 0 {
                output.push_str(&format!(
                    "{}\n",
                    self.count(result.fixes_applied, "fix", |s| s.green())
                ));
            }
            output.push_str(&format!(
                "Finished in {:.2}s\n",
                result.duration.as_secs_f64()
            ));
        }

        output
    }

    fn format_diagnostic(&self, report: &FileReport, diag: &Diagnostic) -> String {
        let mut output = String::new();
        let (line, column) = report.line_index.line_col(diag.span.start);
        let bar = self.paint("|", |s| s.blue());

        output.push_str(&format!(
            "{}:{}:{}: {}[{}]: {}\n",
            report.path.display(),
            line,
            column,
            self.severity_str(diag.severity),
            self.paint(diag.id(), |s| s.cyan()),
            diag.message
        ));

        if self.show_source {
            if let Some(source) = report.line_index.line(line) {
                let line_num = format!("{:>4}", line);
                output.push_str(&format!("   {}\n", bar));
                output.push_str(&format!(
                    "{} {} {}\n",
                    self.paint(&line_num, |s| s.blue()),
                    bar,
                    source
                ));

                // Underline up to the end of the first line of the span
                let (end_line, end_column) = report.line_index.line_col(diag.span.end());
                let width = if end_line == line {
                    end_column.saturating_sub(column)
                } else {
                    source.chars().count().saturating_sub(column - 1)
                };
                output.push_str(&format!(
                    "   {} {}{}\n",
                    bar,
                    " ".repeat(column - 1),
                    self.paint(&"^".repeat(width.max(1)), |s| s.red())
                ));
            }
        }

        if self.show_help {
            if let Some(help) = diag.help() {
                output.push_str(&format!("   {} help: {}\n", self.paint("=", |s| s.blue()), help));
            }
        }

        for note in &diag.notes {
            output.push_str(&format!("   {} note: {}\n", self.paint("=", |s| s.blue()), note));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Analysis;
    use crate::plugins::csharp::REDUNDANT_ATTRIBUTE_PARENTHESES;
    use crate::syntax::{GreenNode, SyntaxKind, SyntaxTree, TextSpan};
    use std::path::Path;
    use std::sync::Arc;

    const SOURCE: &str = "class C {\n    [Obsolete()] void M() { }\n}\n";

    fn report() -> FileReport {
        let tree = SyntaxTree::new(Arc::new(GreenNode::node(SyntaxKind::CompilationUnit, vec![])));
        let diagnostic = Diagnostic::new(
            &REDUNDANT_ATTRIBUTE_PARENTHESES,
            TextSpan::new(23, 2),
            tree.id(),
            vec![],
        );
        let analysis = Analysis {
            diagnostics: vec![diagnostic],
            ..Default::default()
        };
        FileReport::new(Path::new("src/C.cs"), SOURCE, analysis)
    }

    #[test]
    fn test_format_diagnostic() {
        let formatter = TextFormatter::new().without_color();
        let report = report();
        let output = formatter.format_diagnostic(&report, &report.diagnostics[0]);

        assert!(output.contains("src/C.cs:2:14: warning[redundant-attribute-parentheses]"));
        assert!(output.contains("   2 |     [Obsolete()] void M() { }"));
        assert!(output.contains(&format!("   | {}^^\n", " ".repeat(13))));
        assert!(output.contains("help: Remove the empty argument list"));
    }

    #[test]
    fn test_format_result() {
        let formatter = TextFormatter::new().without_color();
        let mut result = LintResult::default();
        result.push(report(), Default::default());

        let output = formatter.format(&result);
        assert!(output.starts_with("src/C.cs\n"));
        assert!(output.contains("1 file processed: 1 warning"));
    }

    #[test]
    fn test_clean_files_are_not_listed() {
        let formatter = TextFormatter::new().without_color().without_stats();
        let mut result = LintResult::default();
        result.push(
            FileReport::new(Path::new("Clean.cs"), "class C { }", Analysis::default()),
            Default::default(),
        );
        assert_eq!(formatter.format(&result), "");
    }
}
