//! JSON output formatter

use super::OutputFormatter;
use crate::diagnostic::{Diagnostic, Severity};
use crate::engine::{FileReport, LintResult};
use crate::fixer::FixAllState;
use crate::rule::RuleError;
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_default()
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    files: Vec<JsonFile<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: String,
    diagnostics: Vec<JsonDiagnostic<'a>>,
    #[serde(skip_serializing_if = "is_empty")]
    failures: &'a [RuleError],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix_state: Option<FixAllState>,
    #[serde(skip_serializing_if = "is_zero")]
    fixes_applied: usize,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    rule_id: &'a str,
    severity: Severity,
    message: &'a str,
    file: String,
    line: usize,
    column: usize,
    start: usize,
    length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty")]
    notes: &'a [String],
}

#[derive(Serialize)]
struct JsonSummary {
    files_processed: usize,
    files_with_errors: usize,
    files_with_warnings: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    failure_count: usize,
    fixes_applied: usize,
    duration_ms: u128,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn is_empty<T>(items: &&[T]) -> bool {
    items.is_empty()
}

fn json_diagnostic<'a>(report: &FileReport, diag: &'a Diagnostic) -> JsonDiagnostic<'a> {
    let (line, column) = report.line_index.line_col(diag.span.start);
    JsonDiagnostic {
        rule_id: diag.id(),
        severity: diag.severity,
        message: &diag.message,
        file: report.path.display().to_string(),
        line,
        column,
        start: diag.span.start,
        length: diag.span.len,
        help: diag.help(),
        notes: &diag.notes,
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &LintResult) -> String {
        let files = result
            .files
            .iter()
            .map(|report| JsonFile {
                path: report.path.display().to_string(),
                diagnostics: report
                    .diagnostics
                    .iter()
                    .map(|d| json_diagnostic(report, d))
                    .collect(),
                failures: &report.failures,
                error: report.error.as_deref(),
                fix_state: report.fix_state,
                fixes_applied: report.fixes_applied,
            })
            .collect();

        let output = JsonOutput {
            files,
            summary: JsonSummary {
                files_processed: result.files_processed,
                files_with_errors: result.files_with_errors,
                files_with_warnings: result.files_with_warnings,
                error_count: result.error_count,
                warning_count: result.warning_count,
                info_count: result.info_count,
                failure_count: result.failure_count,
                fixes_applied: result.fixes_applied,
                duration_ms: result.duration.as_millis(),
            },
        };

        self.render(&output)
    }

    fn format_diagnostic(&self, report: &FileReport, diagnostic: &Diagnostic) -> String {
        self.render(&json_diagnostic(report, diagnostic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Analysis;
    use crate::plugins::csharp::REDUNDANT_ATTRIBUTE_SUFFIX;
    use crate::syntax::{GreenNode, SyntaxKind, SyntaxTree, TextSpan};
    use std::path::Path;
    use std::sync::Arc;

    fn report() -> FileReport {
        let tree = SyntaxTree::new(Arc::new(GreenNode::node(SyntaxKind::CompilationUnit, vec![])));
        let diagnostic = Diagnostic::new(
            &REDUNDANT_ATTRIBUTE_SUFFIX,
            TextSpan::new(1, 17),
            tree.id(),
            vec!["ObsoleteAttribute".to_string(), "Obsolete".to_string()],
        );
        let analysis = Analysis {
            diagnostics: vec![diagnostic],
            ..Default::default()
        };
        FileReport::new(Path::new("A.cs"), "[ObsoleteAttribute]", analysis)
    }

    #[test]
    fn test_json_format_diagnostic() {
        let report = report();
        let output = JsonFormatter::new().format_diagnostic(&report, &report.diagnostics[0]);
        assert!(output.contains("\"rule_id\":\"redundant-attribute-suffix\""));
        assert!(output.contains("\"severity\":\"info\""));
        assert!(output.contains("\"line\":1"));
        assert!(output.contains("\"column\":2"));
        assert!(output.contains("\"length\":17"));
        assert!(!output.contains("\"notes\""));
    }

    #[test]
    fn test_json_format_result() {
        let mut result = LintResult::default();
        result.push(report(), Default::default());

        let output = JsonFormatter::new().format(&result);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["files_processed"], 1);
        assert_eq!(value["summary"]["info_count"], 1);
        assert_eq!(value["files"][0]["path"], "A.cs");
        assert_eq!(
            value["files"][0]["diagnostics"][0]["message"],
            "Attribute suffix is redundant: 'ObsoleteAttribute' can be written as 'Obsolete'"
        );
        assert!(value["files"][0].get("fix_state").is_none());
    }

    #[test]
    fn test_json_pretty() {
        let output = JsonFormatter::new().pretty().format(&LintResult::default());
        assert!(output.contains('\n'));
    }
}
