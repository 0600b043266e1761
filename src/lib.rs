//! Mender - rule-based analysis and batch code fixes over immutable syntax trees
//!
//! Rules inspect nodes of a lossless syntax tree and report diagnostics.
//! Fixes turn a diagnostic into a node replacement. The batch coordinator
//! applies non-overlapping fixes in document order, producing a new tree
//! snapshot per pass, and repeats until nothing is left to fix.
//!
//! # Architecture
//!
//! ```text
//! CLI -> Engine -> Plugin (parse, symbols) -> RuleRegistry -> Diagnostics
//!                                          -> Fixer (FixRegistry) -> SyntaxTree'
//! ```
//!
//! Trees are never mutated: every edit yields a new [`SyntaxTree`] that
//! shares unchanged subtrees with its predecessor. Diagnostics, edits and
//! symbol models are bound to the snapshot they were computed from.

pub mod cancel;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod fix;
pub mod fixer;
pub mod output;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod rule;
pub mod symbols;
pub mod syntax;

// Re-export main types
pub use cancel::{CancellationToken, Cancelled};
pub use config::Config;
pub use diagnostic::{Diagnostic, DiagnosticDescriptor, Severity};
pub use engine::{Analysis, Engine, FileReport, LintResult, RuleTiming};
pub use fix::{compute_fix, CodeEdit, CodeFix, FixContext, FixDescriptor, FixError, ProposedEdit};
pub use fixer::{BatchEditSet, BatchError, BatchOutcome, FixAllReport, FixAllState, Fixer};
pub use output::{JsonFormatter, OutputFormatter, TextFormatter};
pub use plugin::{Document, ParseError, Plugin};
pub use registry::{ActiveRules, FixRegistry, RegistryError, RuleRegistry};
pub use rule::{Rule, RuleCategory, RuleContext, RuleError};
pub use symbols::{Symbol, SymbolId, SymbolModel};
pub use syntax::{NodePtr, SnapshotId, SyntaxKind, SyntaxNode, SyntaxTree, TextSpan};
