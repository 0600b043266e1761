//! Stack-based construction of green trees

use super::kind::SyntaxKind;
use super::node::GreenNode;
use std::sync::Arc;

/// Position in the builder that a node can later be started at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

struct OpenNode {
    kind: SyntaxKind,
    first_child: usize,
    generated: bool,
}

/// Builds a green tree from a flat sequence of start/token/finish events
#[derive(Default)]
pub struct GreenNodeBuilder {
    open: Vec<OpenNode>,
    children: Vec<Arc<GreenNode>>,
}

impl GreenNodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new node; subsequent tokens and nodes become its children
    pub fn start_node(&mut self, kind: SyntaxKind) {
        self.open.push(OpenNode {
            kind,
            first_child: self.children.len(),
            generated: false,
        });
    }

    /// Remember the current position so a node can wrap what follows it
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.children.len())
    }

    /// Open a node whose first child is whatever was emitted since `checkpoint`
    pub fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        let first_child = checkpoint.0.min(self.children.len());
        self.open.push(OpenNode {
            kind,
            first_child,
            generated: false,
        });
    }

    /// Flag the innermost open node as generated code
    pub fn mark_generated(&mut self) {
        if let Some(node) = self.open.last_mut() {
            node.generated = true;
        }
    }

    pub fn token(&mut self, kind: SyntaxKind, text: &str) {
        self.children.push(Arc::new(GreenNode::token(kind, text)));
    }

    /// Close the innermost open node
    pub fn finish_node(&mut self) {
        let Some(open) = self.open.pop() else {
            return;
        };
        let children = self.children.split_off(open.first_child);
        let mut node = GreenNode::node(open.kind, children);
        if open.generated {
            node = node.into_generated();
        }
        self.children.push(Arc::new(node));
    }

    /// Close any nodes left open and return the root
    pub fn finish(mut self) -> Arc<GreenNode> {
        while !self.open.is_empty() {
            self.finish_node();
        }
        if self.children.len() == 1 {
            if let Some(root) = self.children.pop() {
                return root;
            }
        }
        Arc::new(GreenNode::node(SyntaxKind::CompilationUnit, self.children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_nested() {
        let mut builder = GreenNodeBuilder::new();
        builder.start_node(SyntaxKind::CompilationUnit);
        builder.start_node(SyntaxKind::Name);
        builder.token(SyntaxKind::Ident, "System");
        builder.token(SyntaxKind::Dot, ".");
        builder.token(SyntaxKind::Ident, "Text");
        builder.finish_node();
        builder.finish_node();

        let root = builder.finish();
        assert_eq!(root.kind(), SyntaxKind::CompilationUnit);
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].kind(), SyntaxKind::Name);
        assert_eq!(root.to_string(), "System.Text");
    }

    #[test]
    fn test_start_node_at_checkpoint() {
        let mut builder = GreenNodeBuilder::new();
        builder.start_node(SyntaxKind::CompilationUnit);
        let checkpoint = builder.checkpoint();
        builder.token(SyntaxKind::Ident, "void");
        builder.token(SyntaxKind::Whitespace, " ");
        builder.token(SyntaxKind::Ident, "M");
        builder.start_node_at(checkpoint, SyntaxKind::MethodDecl);
        builder.mark_generated();
        builder.finish_node();
        builder.finish_node();

        let root = builder.finish();
        let method = &root.children()[0];
        assert_eq!(method.kind(), SyntaxKind::MethodDecl);
        assert_eq!(method.children().len(), 3);
        assert!(method.is_generated());
        assert!(!root.is_generated());
    }

    #[test]
    fn test_finish_closes_open_nodes() {
        let mut builder = GreenNodeBuilder::new();
        builder.start_node(SyntaxKind::CompilationUnit);
        builder.start_node(SyntaxKind::Block);
        builder.token(SyntaxKind::LBrace, "{");

        let root = builder.finish();
        assert_eq!(root.kind(), SyntaxKind::CompilationUnit);
        assert_eq!(root.to_string(), "{");
    }
}
