//! Rule trait and evaluation context

use crate::cancel::CancellationToken;
use crate::diagnostic::{Diagnostic, DiagnosticDescriptor};
use crate::symbols::SymbolModel;
use crate::syntax::{SyntaxKind, SyntaxNode, SyntaxTree, TextSpan};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use thiserror::Error;

/// Rule category for grouping related rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Code that is definitely wrong
    Correctness,
    /// Code that is likely wrong or misleading
    Suspicious,
    /// Idiomatic and consistent style rules
    #[default]
    Style,
    /// Syntax that can be removed without changing meaning
    Redundancy,
    Perf,
    /// Extra strict rules that may have false positives
    Pedantic,
    /// Rules under development, only active in preview mode
    Nursery,
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleCategory::Correctness => write!(f, "correctness"),
            RuleCategory::Suspicious => write!(f, "suspicious"),
            RuleCategory::Style => write!(f, "style"),
            RuleCategory::Redundancy => write!(f, "redundancy"),
            RuleCategory::Perf => write!(f, "perf"),
            RuleCategory::Pedantic => write!(f, "pedantic"),
            RuleCategory::Nursery => write!(f, "nursery"),
        }
    }
}

impl std::str::FromStr for RuleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "correctness" => Ok(RuleCategory::Correctness),
            "suspicious" => Ok(RuleCategory::Suspicious),
            "style" => Ok(RuleCategory::Style),
            "redundancy" | "redundant" => Ok(RuleCategory::Redundancy),
            "perf" | "performance" => Ok(RuleCategory::Perf),
            "pedantic" => Ok(RuleCategory::Pedantic),
            "nursery" | "experimental" => Ok(RuleCategory::Nursery),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// A predicate failure, isolated by the engine
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("rule {rule_id} failed on {kind} at {span}: {message}")]
pub struct RuleError {
    pub rule_id: String,
    pub kind: SyntaxKind,
    pub span: TextSpan,
    pub message: String,
}

impl RuleError {
    pub fn new(descriptor: &DiagnosticDescriptor, node: &SyntaxNode, message: impl Into<String>) -> Self {
        Self {
            rule_id: descriptor.id.to_string(),
            kind: node.kind(),
            span: node.span(),
            message: message.into(),
        }
    }
}

/// Everything a rule predicate may consult besides the node itself
pub struct RuleContext<'a> {
    pub tree: &'a SyntaxTree,
    pub symbols: &'a dyn SymbolModel,
    pub cancel: &'a CancellationToken,
}

impl RuleContext<'_> {
    /// Build a diagnostic against the current snapshot
    pub fn diagnostic(
        &self,
        descriptor: &'static DiagnosticDescriptor,
        span: TextSpan,
        args: Vec<String>,
    ) -> Diagnostic {
        Diagnostic::new(descriptor, span, self.tree.id(), args)
    }
}

/// A named detection rule.
///
/// `check` is called once for every node whose kind is listed in the
/// descriptor and reports at most one diagnostic for that node.
pub trait Rule: Send + Sync {
    fn descriptor(&self) -> &'static DiagnosticDescriptor;

    fn check(&self, node: &SyntaxNode, ctx: &RuleContext<'_>)
        -> Result<Option<Diagnostic>, RuleError>;
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!("style".parse::<RuleCategory>(), Ok(RuleCategory::Style));
        assert_eq!("redundant".parse::<RuleCategory>(), Ok(RuleCategory::Redundancy));
        assert_eq!("experimental".parse::<RuleCategory>(), Ok(RuleCategory::Nursery));
        assert!("bogus".parse::<RuleCategory>().is_err());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(RuleCategory::Redundancy.to_string(), "redundancy");
        assert_eq!(RuleCategory::Perf.to_string(), "perf");
    }

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");

        let payload = std::panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");
    }
}
