//! Batch fix application and the fixed-point fix-all loop
//!
//! Candidate edits are computed for every diagnostic against one snapshot,
//! accepted in document order (first edit wins, conflicting edits are
//! deferred) and applied in one rewrite. `fix_all` repeats analysis and
//! batching until nothing is left to fix.

use crate::cancel::{CancellationToken, Cancelled};
use crate::diagnostic::Diagnostic;
use crate::engine::{absorb_timings, Engine, RuleTiming};
use crate::fix::{compute_fix, CodeEdit, FixError};
use crate::plugin::{Document, Plugin};
use crate::registry::FixRegistry;
use crate::symbols::SymbolModel;
use crate::syntax::{EditError, SnapshotId, SyntaxTree};
use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Batch failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("fixing cancelled")]
    Cancelled,

    #[error("applying batch failed: {0}")]
    Edit(#[from] EditError),
}

impl From<Cancelled> for BatchError {
    fn from(_: Cancelled) -> Self {
        BatchError::Cancelled
    }
}

/// Pairwise non-conflicting edits for one snapshot, kept sorted by span
#[derive(Debug, Clone)]
pub struct BatchEditSet {
    snapshot: SnapshotId,
    edits: Vec<CodeEdit>,
}

impl BatchEditSet {
    pub fn new(snapshot: SnapshotId) -> Self {
        Self {
            snapshot,
            edits: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    pub fn edits(&self) -> &[CodeEdit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Insert `edit` unless it belongs to another snapshot or conflicts
    /// with an edit already in the set.
    pub fn try_insert(&mut self, edit: CodeEdit) -> Result<(), (CodeEdit, EditError)> {
        if edit.snapshot != self.snapshot {
            let err = EditError::StaleSnapshot {
                expected: edit.snapshot,
                found: self.snapshot,
            };
            return Err((edit, err));
        }

        let key = (edit.span().start, edit.span().end());
        let pos = self
            .edits
            .partition_point(|e| (e.span().start, e.span().end()) <= key);

        // The set is sorted and disjoint, so only the neighbours can conflict
        let neighbours = pos.checked_sub(1).into_iter().chain(Some(pos));
        for i in neighbours {
            if let Some(other) = self.edits.get(i) {
                if other.conflicts_with(&edit) {
                    let err = EditError::Conflict {
                        span: edit.span(),
                        other: other.span(),
                    };
                    return Err((edit, err));
                }
            }
        }

        self.edits.insert(pos, edit);
        Ok(())
    }

    /// Apply every edit in one left-to-right rewrite of `tree`
    pub fn apply(&self, tree: &SyntaxTree) -> Result<SyntaxTree, EditError> {
        if tree.id() != self.snapshot {
            return Err(EditError::StaleSnapshot {
                expected: self.snapshot,
                found: tree.id(),
            });
        }
        let edits: Vec<_> = self
            .edits
            .iter()
            .map(|e| (e.target, Arc::clone(&e.replacement)))
            .collect();
        tree.rewrite(&edits)
    }
}

/// Result of one batch over one snapshot
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// The rewritten tree, or the input snapshot when nothing was applied
    pub tree: SyntaxTree,
    /// Accepted edits, in document order
    pub applied: Vec<CodeEdit>,
    /// Edits that conflicted with an earlier accepted edit
    pub deferred: Vec<CodeEdit>,
    /// Diagnostics with no batch-capable fix or whose fix was inapplicable
    pub unfixed: Vec<Diagnostic>,
}

/// Terminal state of the fix-all loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixAllState {
    /// No diagnostics remain
    Converged,
    /// Diagnostics remain but no edit could be applied
    Stalled,
    /// The iteration budget ran out with diagnostics remaining
    BudgetExhausted,
}

impl fmt::Display for FixAllState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixAllState::Converged => write!(f, "converged"),
            FixAllState::Stalled => write!(f, "stalled"),
            FixAllState::BudgetExhausted => write!(f, "budget exhausted"),
        }
    }
}

/// Result of the fix-all loop
#[derive(Debug, Clone)]
pub struct FixAllReport {
    pub tree: SyntaxTree,
    pub state: FixAllState,
    /// Rounds that applied at least one edit
    pub iterations: usize,
    /// Every edit applied across all rounds
    pub applied: Vec<CodeEdit>,
    /// Diagnostics on the final tree
    pub remaining: Vec<Diagnostic>,
    /// Rule timings summed over every analysis pass of the loop
    pub timings: HashMap<String, RuleTiming>,
}

/// Applies fixes to documents
pub struct Fixer {
    fixes: FixRegistry,
    max_iterations: usize,
}

impl Fixer {
    pub fn new(fixes: FixRegistry, max_iterations: usize) -> Self {
        Self {
            fixes,
            max_iterations,
        }
    }

    pub fn fixes(&self) -> &FixRegistry {
        &self.fixes
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Apply one diagnostic's primary fix, fix-all capable or not
    pub fn apply_one(
        &self,
        tree: &SyntaxTree,
        diagnostic: &Diagnostic,
        symbols: &dyn SymbolModel,
        cancel: &CancellationToken,
    ) -> Result<(SyntaxTree, CodeEdit), FixError> {
        let fix = self.fixes.primary_fix(diagnostic.id()).ok_or_else(|| {
            FixError::inapplicable(format!("no fix registered for {}", diagnostic.id()))
        })?;
        let edit = compute_fix(fix.as_ref(), diagnostic, tree, symbols, cancel)?;
        let fixed = tree
            .replace(edit.target, Arc::clone(&edit.replacement))
            .map_err(|e| FixError::inapplicable(e.to_string()))?;
        debug!("applied '{}' at {}", edit.title, edit.span());
        Ok((fixed, edit))
    }

    /// Compute, accept and apply one batch of fixes for `diagnostics`.
    ///
    /// Diagnostics are ordered by span start, then end. Edits are computed
    /// in parallel and accepted sequentially: the first edit in document
    /// order wins and later conflicting edits are deferred.
    pub fn apply_all(
        &self,
        tree: &SyntaxTree,
        diagnostics: &[Diagnostic],
        symbols: &dyn SymbolModel,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, BatchError> {
        cancel.check()?;

        let mut ordered: Vec<&Diagnostic> = diagnostics.iter().collect();
        ordered.sort_by_key(|d| (d.span.start, d.span.end()));

        let candidates: Vec<Option<Result<CodeEdit, FixError>>> = ordered
            .par_iter()
            .map(|diagnostic| {
                self.fixes
                    .batch_fix(diagnostic.id())
                    .map(|fix| compute_fix(fix.as_ref(), diagnostic, tree, symbols, cancel))
            })
            .collect();

        let mut batch = BatchEditSet::new(tree.id());
        let mut deferred = Vec::new();
        let mut unfixed = Vec::new();

        for (diagnostic, candidate) in ordered.into_iter().zip(candidates) {
            match candidate {
                Some(Ok(edit)) => {
                    if let Err((edit, err)) = batch.try_insert(edit) {
                        debug!("deferred '{}': {}", edit.title, err);
                        deferred.push(edit);
                    }
                }
                Some(Err(FixError::Cancelled)) => return Err(BatchError::Cancelled),
                Some(Err(err @ FixError::Inapplicable(_))) => {
                    debug!("{} at {}: {}", diagnostic.id(), diagnostic.span, err);
                    unfixed.push(diagnostic.clone());
                }
                Some(Err(err)) => {
                    warn!("{} at {}: {}", diagnostic.id(), diagnostic.span, err);
                    unfixed.push(diagnostic.clone());
                }
                None => unfixed.push(diagnostic.clone()),
            }
        }

        cancel.check()?;
        let fixed = if batch.is_empty() {
            tree.clone()
        } else {
            batch.apply(tree)?
        };

        Ok(BatchOutcome {
            tree: fixed,
            applied: batch.edits,
            deferred,
            unfixed,
        })
    }

    /// Fix `tree` until no diagnostics remain, no edit applies, or the
    /// iteration budget is spent
    pub fn fix_all(
        &self,
        engine: &Engine,
        plugin: &dyn Plugin,
        tree: SyntaxTree,
        cancel: &CancellationToken,
    ) -> Result<FixAllReport, BatchError> {
        self.fix_all_at(engine, plugin, tree, None, cancel)
    }

    /// [`fix_all`](Self::fix_all) honoring per-file configuration for the document's path
    pub fn fix_document(
        &self,
        engine: &Engine,
        plugin: &dyn Plugin,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<FixAllReport, BatchError> {
        self.fix_all_at(
            engine,
            plugin,
            document.tree.clone(),
            Some(&document.path),
            cancel,
        )
    }

    fn fix_all_at(
        &self,
        engine: &Engine,
        plugin: &dyn Plugin,
        mut tree: SyntaxTree,
        path: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<FixAllReport, BatchError> {
        let mut applied = Vec::new();
        let mut timings = HashMap::new();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            let symbols = plugin.symbols(&tree);
            let mut analysis = engine.analyze_path(&tree, symbols.as_ref(), path, cancel)?;
            absorb_timings(&mut timings, std::mem::take(&mut analysis.timings));
            if analysis.diagnostics.is_empty() {
                return Ok(FixAllReport {
                    tree,
                    state: FixAllState::Converged,
                    iterations,
                    applied,
                    remaining: Vec::new(),
                    timings,
                });
            }

            let outcome =
                self.apply_all(&tree, &analysis.diagnostics, symbols.as_ref(), cancel)?;
            if outcome.applied.is_empty() {
                debug!(
                    "stalled after {} iteration(s) with {} diagnostic(s)",
                    iterations,
                    analysis.diagnostics.len()
                );
                return Ok(FixAllReport {
                    tree,
                    state: FixAllState::Stalled,
                    iterations,
                    applied,
                    remaining: analysis.diagnostics,
                    timings,
                });
            }

            iterations += 1;
            debug!(
                "iteration {}: applied {}, deferred {}, unfixed {}",
                iterations,
                outcome.applied.len(),
                outcome.deferred.len(),
                outcome.unfixed.len()
            );
            applied.extend(outcome.applied);
            tree = outcome.tree;
        }

        let symbols = plugin.symbols(&tree);
        let mut analysis = engine.analyze_path(&tree, symbols.as_ref(), path, cancel)?;
        absorb_timings(&mut timings, std::mem::take(&mut analysis.timings));
        let remaining = analysis.diagnostics;
        let state = if remaining.is_empty() {
            FixAllState::Converged
        } else {
            FixAllState::BudgetExhausted
        };

        Ok(FixAllReport {
            tree,
            state,
            iterations,
            applied,
            remaining,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{GreenNode, NodePtr, SyntaxKind, TextSpan};

    fn tree() -> SyntaxTree {
        let ident = |t: &str| Arc::new(GreenNode::token(SyntaxKind::Ident, t));
        let comma = || Arc::new(GreenNode::token(SyntaxKind::Comma, ","));
        SyntaxTree::new(Arc::new(GreenNode::node(
            SyntaxKind::CompilationUnit,
            vec![ident("aa"), comma(), ident("bb"), comma(), ident("cc")],
        )))
    }

    fn edit(tree: &SyntaxTree, start: usize, text: &str) -> CodeEdit {
        CodeEdit {
            snapshot: tree.id(),
            target: NodePtr {
                kind: SyntaxKind::Ident,
                span: TextSpan::new(start, 2),
            },
            replacement: Arc::new(GreenNode::token(SyntaxKind::Ident, text)),
            title: format!("Rename to '{}'", text),
            fix_id: "rename",
            rule_id: "rule",
        }
    }

    #[test]
    fn test_batch_keeps_document_order() {
        let tree = tree();
        let mut batch = BatchEditSet::new(tree.id());
        batch.try_insert(edit(&tree, 6, "z")).unwrap();
        batch.try_insert(edit(&tree, 0, "x")).unwrap();
        batch.try_insert(edit(&tree, 3, "y")).unwrap();

        let starts: Vec<_> = batch.edits().iter().map(|e| e.span().start).collect();
        assert_eq!(starts, vec![0, 3, 6]);

        let fixed = batch.apply(&tree).unwrap();
        assert_eq!(fixed.text(), "x,y,z");
        assert_ne!(fixed.id(), tree.id());
    }

    #[test]
    fn test_batch_rejects_conflicts() {
        let tree = tree();
        let mut batch = BatchEditSet::new(tree.id());
        batch.try_insert(edit(&tree, 3, "y")).unwrap();

        let mut wide = edit(&tree, 0, "w");
        wide.target.span = TextSpan::new(0, 5);
        let (rejected, err) = batch.try_insert(wide).unwrap_err();
        assert_eq!(rejected.title, "Rename to 'w'");
        assert!(matches!(err, EditError::Conflict { .. }));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_batch_rejects_foreign_snapshot() {
        let (tree, other) = (tree(), tree());
        let mut batch = BatchEditSet::new(tree.id());
        let (_, err) = batch.try_insert(edit(&other, 0, "x")).unwrap_err();
        assert!(matches!(err, EditError::StaleSnapshot { .. }));

        let batch = BatchEditSet::new(tree.id());
        assert!(matches!(
            batch.apply(&other),
            Err(EditError::StaleSnapshot { .. })
        ));
    }

    #[test]
    fn test_fix_all_state_display() {
        assert_eq!(FixAllState::Converged.to_string(), "converged");
        assert_eq!(FixAllState::BudgetExhausted.to_string(), "budget exhausted");
    }
}
