//! Code fixes: descriptors, proposed edits and single-diagnostic computation

use crate::cancel::{CancellationToken, Cancelled};
use crate::diagnostic::{format_template, Diagnostic};
use crate::rule::panic_message;
use crate::symbols::SymbolModel;
use crate::syntax::{GreenNode, NodePtr, SnapshotId, SyntaxNode, SyntaxTree, TextSpan};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Static metadata for one fix
#[derive(Debug)]
pub struct FixDescriptor {
    pub id: &'static str,
    /// Diagnostic ids this fix can repair
    pub fixable_ids: &'static [&'static str],
    /// Title template with positional placeholders
    pub title: &'static str,
    /// Whether the fix may take part in batch application
    pub fix_all: bool,
}

/// Why a fix produced no edit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixError {
    /// Expected structure or symbol is missing; the diagnostic stays reported
    #[error("fix not applicable: {0}")]
    Inapplicable(String),

    #[error("diagnostic from snapshot {expected} used with snapshot {found}")]
    StaleSnapshot {
        expected: SnapshotId,
        found: SnapshotId,
    },

    #[error("fix {fix_id} failed: {message}")]
    Failed { fix_id: String, message: String },

    #[error("fix computation cancelled")]
    Cancelled,
}

impl From<Cancelled> for FixError {
    fn from(_: Cancelled) -> Self {
        FixError::Cancelled
    }
}

impl FixError {
    pub fn inapplicable(reason: impl Into<String>) -> Self {
        FixError::Inapplicable(reason.into())
    }
}

/// Inputs available to a fix computation
pub struct FixContext<'a> {
    pub diagnostic: &'a Diagnostic,
    pub tree: &'a SyntaxTree,
    pub symbols: &'a dyn SymbolModel,
    pub cancel: &'a CancellationToken,
}

impl FixContext<'_> {
    /// Node covering the diagnostic span
    pub fn anchor(&self) -> Option<SyntaxNode> {
        self.tree.find_node(self.diagnostic.span)
    }
}

/// Replacement of one node, as produced by a fix
#[derive(Debug, Clone)]
pub struct ProposedEdit {
    pub target: NodePtr,
    pub replacement: Arc<GreenNode>,
    /// Arguments for the fix title template
    pub title_args: Vec<String>,
}

impl ProposedEdit {
    pub fn replace(node: &SyntaxNode, replacement: GreenNode) -> Self {
        Self {
            target: NodePtr::of(node),
            replacement: Arc::new(replacement),
            title_args: Vec::new(),
        }
    }

    pub fn with_title_args(mut self, args: Vec<String>) -> Self {
        self.title_args = args;
        self
    }
}

/// A fix that rewrites the location a diagnostic points at
pub trait CodeFix: Send + Sync {
    fn descriptor(&self) -> &'static FixDescriptor;

    /// Compute the replacement. Must not mutate anything.
    fn compute(&self, ctx: &FixContext<'_>) -> Result<ProposedEdit, FixError>;
}

/// A computed edit, bound to the snapshot it was computed against
#[derive(Debug, Clone)]
pub struct CodeEdit {
    pub snapshot: SnapshotId,
    pub target: NodePtr,
    pub replacement: Arc<GreenNode>,
    /// Formatted fix title
    pub title: String,
    pub fix_id: &'static str,
    pub rule_id: &'static str,
}

impl CodeEdit {
    pub fn span(&self) -> TextSpan {
        self.target.span
    }

    pub fn conflicts_with(&self, other: &CodeEdit) -> bool {
        self.span().conflicts_with(&other.span())
    }
}

/// Compute the edit `fix` proposes for `diagnostic`.
///
/// Checks cancellation and snapshot identity first. A panicking fix is
/// reported as [`FixError::Failed`].
pub fn compute_fix(
    fix: &dyn CodeFix,
    diagnostic: &Diagnostic,
    tree: &SyntaxTree,
    symbols: &dyn SymbolModel,
    cancel: &CancellationToken,
) -> Result<CodeEdit, FixError> {
    cancel.check()?;

    if diagnostic.snapshot != tree.id() {
        return Err(FixError::StaleSnapshot {
            expected: diagnostic.snapshot,
            found: tree.id(),
        });
    }
    if symbols.snapshot() != tree.id() {
        return Err(FixError::StaleSnapshot {
            expected: symbols.snapshot(),
            found: tree.id(),
        });
    }

    let descriptor = fix.descriptor();
    if !descriptor.fixable_ids.contains(&diagnostic.id()) {
        return Err(FixError::inapplicable(format!(
            "{} does not fix {}",
            descriptor.id,
            diagnostic.id()
        )));
    }

    let ctx = FixContext {
        diagnostic,
        tree,
        symbols,
        cancel,
    };
    let proposed = catch_unwind(AssertUnwindSafe(|| fix.compute(&ctx))).map_err(|payload| {
        FixError::Failed {
            fix_id: descriptor.id.to_string(),
            message: panic_message(payload.as_ref()),
        }
    })??;

    if proposed.target.resolve(&tree.root()).is_none() {
        return Err(FixError::inapplicable(format!(
            "target {} at {} not found",
            proposed.target.kind, proposed.target.span
        )));
    }

    Ok(CodeEdit {
        snapshot: tree.id(),
        target: proposed.target,
        replacement: proposed.replacement,
        title: format_template(descriptor.title, &proposed.title_args),
        fix_id: descriptor.id,
        rule_id: diagnostic.descriptor.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{DiagnosticDescriptor, Severity};
    use crate::rule::RuleCategory;
    use crate::symbols::NoSymbols;
    use crate::syntax::SyntaxKind;

    static RULE: DiagnosticDescriptor = DiagnosticDescriptor {
        id: "upper-ident",
        title: "Uppercase identifier",
        message: "'{0}' should be lowercase",
        category: RuleCategory::Style,
        severity: Severity::Warning,
        enabled_by_default: true,
        kinds: &[SyntaxKind::Name],
        help: None,
    };

    static LOWERCASE: FixDescriptor = FixDescriptor {
        id: "lowercase",
        fixable_ids: &["upper-ident"],
        title: "Rename to '{0}'",
        fix_all: true,
    };

    struct Lowercase;

    impl CodeFix for Lowercase {
        fn descriptor(&self) -> &'static FixDescriptor {
            &LOWERCASE
        }

        fn compute(&self, ctx: &FixContext<'_>) -> Result<ProposedEdit, FixError> {
            let node = ctx
                .anchor()
                .ok_or_else(|| FixError::inapplicable("no node"))?;
            let text = node.text().to_lowercase();
            if text == "panic" {
                panic!("asked to panic");
            }
            Ok(
                ProposedEdit::replace(&node, GreenNode::token(SyntaxKind::Ident, &text))
                    .with_title_args(vec![text]),
            )
        }
    }

    fn tree(text: &str) -> SyntaxTree {
        let name = GreenNode::node(
            SyntaxKind::Name,
            vec![Arc::new(GreenNode::token(SyntaxKind::Ident, text))],
        );
        let semi = GreenNode::token(SyntaxKind::Semicolon, ";");
        SyntaxTree::new(Arc::new(GreenNode::node(
            SyntaxKind::CompilationUnit,
            vec![Arc::new(name), Arc::new(semi)],
        )))
    }

    fn diagnostic(tree: &SyntaxTree) -> Diagnostic {
        Diagnostic::new(&RULE, TextSpan::new(0, tree.len() - 1), tree.id(), vec![])
    }

    #[test]
    fn test_compute_fix() {
        let tree = tree("Value");
        let symbols = NoSymbols::new(tree.id());
        let edit = compute_fix(
            &Lowercase,
            &diagnostic(&tree),
            &tree,
            &symbols,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(edit.title, "Rename to 'value'");
        assert_eq!(edit.target.kind, SyntaxKind::Name);
        assert_eq!(edit.rule_id, "upper-ident");
        assert_eq!(edit.snapshot, tree.id());
    }

    #[test]
    fn test_stale_snapshot() {
        let old = tree("Value");
        let new = tree("Value");
        let symbols = NoSymbols::new(new.id());
        let result = compute_fix(
            &Lowercase,
            &diagnostic(&old),
            &new,
            &symbols,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(FixError::StaleSnapshot { .. })));
    }

    #[test]
    fn test_cancelled_before_compute() {
        let tree = tree("Value");
        let symbols = NoSymbols::new(tree.id());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = compute_fix(&Lowercase, &diagnostic(&tree), &tree, &symbols, &cancel);
        assert_eq!(result.unwrap_err(), FixError::Cancelled);
    }

    #[test]
    fn test_panicking_fix_is_failed() {
        let tree = tree("PANIC");
        let symbols = NoSymbols::new(tree.id());
        let result = compute_fix(
            &Lowercase,
            &diagnostic(&tree),
            &tree,
            &symbols,
            &CancellationToken::new(),
        );
        match result {
            Err(FixError::Failed { fix_id, message }) => {
                assert_eq!(fix_id, "lowercase");
                assert_eq!(message, "asked to panic");
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_edit_conflicts() {
        let tree = tree("Value");
        let edit = |start, len| CodeEdit {
            snapshot: tree.id(),
            target: NodePtr {
                kind: SyntaxKind::Name,
                span: TextSpan::new(start, len),
            },
            replacement: Arc::new(GreenNode::token(SyntaxKind::Ident, "x")),
            title: String::new(),
            fix_id: "f",
            rule_id: "r",
        };
        assert!(edit(0, 5).conflicts_with(&edit(2, 1)));
        assert!(!edit(0, 2).conflicts_with(&edit(2, 2)));
    }
}
