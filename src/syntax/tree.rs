//! Immutable tree snapshots and structural rewriting

use super::kind::SyntaxKind;
use super::node::{GreenNode, SyntaxNode};
use super::text::TextSpan;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

static NEXT_SNAPSHOT: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one tree version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SnapshotId(u64);

impl SnapshotId {
    fn next() -> Self {
        Self(NEXT_SNAPSHOT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised when rewriting a tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("edit was computed against snapshot {expected} but applied to {found}")]
    StaleSnapshot {
        expected: SnapshotId,
        found: SnapshotId,
    },

    #[error("no {kind} node at {span}")]
    TargetNotFound { kind: SyntaxKind, span: TextSpan },

    #[error("edit at {span} conflicts with edit at {other}")]
    Conflict { span: TextSpan, other: TextSpan },

    #[error("edit at {span} is not in document order")]
    Unordered { span: TextSpan },
}

/// Position-based handle to a node, valid within one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodePtr {
    pub kind: SyntaxKind,
    pub span: TextSpan,
}

impl NodePtr {
    pub fn of(node: &SyntaxNode) -> Self {
        Self {
            kind: node.kind(),
            span: node.span(),
        }
    }

    /// Find the node this pointer refers to under `root`
    pub fn resolve(&self, root: &SyntaxNode) -> Option<SyntaxNode> {
        let mut current = root.clone();
        loop {
            if current.kind() == self.kind && current.span() == self.span {
                return Some(current);
            }
            current = current.children().find(|c| c.span().contains(&self.span))?;
        }
    }
}

/// An immutable syntax tree snapshot
#[derive(Clone)]
pub struct SyntaxTree {
    id: SnapshotId,
    root: Arc<GreenNode>,
}

impl SyntaxTree {
    /// Wrap a green root into a fresh snapshot
    pub fn new(root: Arc<GreenNode>) -> Self {
        Self {
            id: SnapshotId::next(),
            root,
        }
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn root(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.root.clone())
    }

    pub fn green(&self) -> &Arc<GreenNode> {
        &self.root
    }

    /// Serialize the tree back to source text
    pub fn text(&self) -> String {
        self.root.to_string()
    }

    pub fn len(&self) -> usize {
        self.root.width()
    }

    pub fn is_empty(&self) -> bool {
        self.root.width() == 0
    }

    /// Node covering `span`, see [`SyntaxNode::covering_node`]
    pub fn find_node(&self, span: TextSpan) -> Option<SyntaxNode> {
        self.root().covering_node(span)
    }

    /// New snapshot with `target` replaced by `replacement`
    pub fn replace(
        &self,
        target: NodePtr,
        replacement: Arc<GreenNode>,
    ) -> Result<SyntaxTree, EditError> {
        self.rewrite(&[(target, replacement)])
    }

    /// New snapshot with every target replaced in a single left-to-right pass.
    ///
    /// Edits must be sorted by start offset and pairwise non-conflicting.
    /// Subtrees that contain no target are shared with this snapshot.
    pub(crate) fn rewrite(
        &self,
        edits: &[(NodePtr, Arc<GreenNode>)],
    ) -> Result<SyntaxTree, EditError> {
        for pair in edits.windows(2) {
            let (prev, next) = (pair[0].0.span, pair[1].0.span);
            if next.start < prev.start {
                return Err(EditError::Unordered { span: next });
            }
            if prev.conflicts_with(&next) {
                return Err(EditError::Conflict {
                    span: next,
                    other: prev,
                });
            }
        }

        let root = self.root();
        for (ptr, _) in edits {
            if ptr.resolve(&root).is_none() {
                return Err(EditError::TargetNotFound {
                    kind: ptr.kind,
                    span: ptr.span,
                });
            }
        }

        let mut applied = 0;
        let green = rewrite_green(&self.root, 0, edits, &mut applied);
        if applied != edits.len() {
            // Every target resolved, so this only trips on a straddling span
            let missed = edits.get(applied).map(|(ptr, _)| *ptr);
            if let Some(ptr) = missed {
                return Err(EditError::TargetNotFound {
                    kind: ptr.kind,
                    span: ptr.span,
                });
            }
        }

        log::trace!(
            "snapshot {} rewritten with {} edit(s)",
            self.id,
            edits.len()
        );
        Ok(SyntaxTree::new(green))
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

fn rewrite_green(
    green: &Arc<GreenNode>,
    offset: usize,
    edits: &[(NodePtr, Arc<GreenNode>)],
    applied: &mut usize,
) -> Arc<GreenNode> {
    if let [(ptr, replacement)] = edits {
        if ptr.kind == green.kind() && ptr.span == TextSpan::new(offset, green.width()) {
            *applied += 1;
            return replacement.clone();
        }
    }
    if edits.is_empty() || green.is_token() {
        return green.clone();
    }

    let mut rest = edits;
    let mut changed = false;
    let mut child_offset = offset;
    let mut children = Vec::with_capacity(green.children().len());

    for child in green.children() {
        let span = TextSpan::new(child_offset, child.width());
        let take = rest
            .iter()
            .take_while(|(ptr, _)| span.contains(&ptr.span))
            .count();

        let new_child = if take > 0 {
            let (inside, tail) = rest.split_at(take);
            rest = tail;
            rewrite_green(child, child_offset, inside, applied)
        } else {
            child.clone()
        };

        changed |= !Arc::ptr_eq(&new_child, child);
        children.push(new_child);
        child_offset += child.width();
    }

    if changed {
        Arc::new(green.with_children(children))
    } else {
        green.clone()
    }
}
