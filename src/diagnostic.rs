//! Diagnostic descriptors and reported diagnostics

use crate::rule::RuleCategory;
use crate::syntax::{SnapshotId, SyntaxKind, TextSpan};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Positional `{0}`, `{1}`, ... placeholders in message and title templates
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("placeholder pattern is valid"));

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" | "suggestion" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// Static metadata for one rule, registered once
#[derive(Debug, Serialize)]
pub struct DiagnosticDescriptor {
    /// Unique rule identifier
    pub id: &'static str,
    /// Short human-readable title
    pub title: &'static str,
    /// Message template with positional placeholders
    pub message: &'static str,
    pub category: RuleCategory,
    /// Default severity before configuration overrides
    pub severity: Severity,
    pub enabled_by_default: bool,
    /// Node kinds the rule inspects
    pub kinds: &'static [SyntaxKind],
    pub help: Option<&'static str>,
}

impl DiagnosticDescriptor {
    /// Format the message template with `args`
    pub fn format_message(&self, args: &[String]) -> String {
        format_template(self.message, args)
    }
}

/// A reported rule violation at one location in one snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub descriptor: &'static DiagnosticDescriptor,
    /// Effective severity after configuration
    pub severity: Severity,
    pub message: String,
    pub span: TextSpan,
    /// Arguments the message was formatted with
    pub args: Vec<String>,
    /// Snapshot the diagnostic was produced against
    pub snapshot: SnapshotId,
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic with the descriptor's default severity
    pub fn new(
        descriptor: &'static DiagnosticDescriptor,
        span: TextSpan,
        snapshot: SnapshotId,
        args: Vec<String>,
    ) -> Self {
        Self {
            descriptor,
            severity: descriptor.severity,
            message: descriptor.format_message(&args),
            span,
            args,
            snapshot,
            notes: Vec::new(),
        }
    }

    pub fn id(&self) -> &'static str {
        self.descriptor.id
    }

    pub fn help(&self) -> Option<&'static str> {
        self.descriptor.help
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: &str) -> Self {
        self.notes.push(note.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Replace `{N}` placeholders with `args[N]`; out-of-range indices render as `(unknown)`
pub fn format_template(template: &str, args: &[String]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i))
                .cloned()
                .unwrap_or_else(|| "(unknown)".to_string())
        })
        .into_owned()
}
