//! Green (shared, position-free) and red (positioned cursor) syntax nodes
//!
//! Green nodes are immutable and reference-counted, so a rewritten tree shares
//! every subtree it did not touch with the tree it came from. Red nodes are
//! cheap cursors created on demand: they add an absolute offset and a parent
//! link used for upward traversal only.

use super::kind::SyntaxKind;
use super::text::TextSpan;
use std::fmt;
use std::sync::Arc;

/// An immutable node or token, without position information
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GreenNode {
    kind: SyntaxKind,
    width: usize,
    /// Source text, for tokens only
    text: Option<Box<str>>,
    children: Vec<Arc<GreenNode>>,
    /// Authored by a tool rather than a person
    generated: bool,
}

impl GreenNode {
    /// Create a leaf token
    pub fn token(kind: SyntaxKind, text: &str) -> Self {
        Self {
            kind,
            width: text.len(),
            text: Some(text.into()),
            children: Vec::new(),
            generated: false,
        }
    }

    /// Create an inner node
    pub fn node(kind: SyntaxKind, children: Vec<Arc<GreenNode>>) -> Self {
        let width = children.iter().map(|c| c.width).sum();
        Self {
            kind,
            width,
            text: None,
            children,
            generated: false,
        }
    }

    /// Mark this node (and implicitly its subtree) as generated code
    pub fn into_generated(mut self) -> Self {
        self.generated = true;
        self
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// Length of the source text covered by this node
    pub fn width(&self) -> usize {
        self.width
    }

    /// Token text (None for inner nodes)
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[Arc<GreenNode>] {
        &self.children
    }

    pub fn is_token(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Same kind and flags with a different child list
    pub fn with_children(&self, children: Vec<Arc<GreenNode>>) -> Self {
        let mut node = Self::node(self.kind, children);
        node.generated = self.generated;
        node
    }

    /// Copy with the child at `index` replaced
    pub fn replace_child(&self, index: usize, child: Arc<GreenNode>) -> Self {
        let mut children = self.children.clone();
        if index < children.len() {
            children[index] = child;
        }
        self.with_children(children)
    }

    /// Copy with the children in `range` removed
    pub fn remove_children(&self, range: std::ops::Range<usize>) -> Self {
        let mut children = self.children.clone();
        let end = range.end.min(children.len());
        let start = range.start.min(end);
        children.drain(start..end);
        self.with_children(children)
    }

    /// Append this subtree's source text to `buf`
    pub fn write_text(&self, buf: &mut String) {
        match &self.text {
            Some(text) => buf.push_str(text),
            None => {
                for child in &self.children {
                    child.write_text(buf);
                }
            }
        }
    }
}

impl fmt::Display for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::with_capacity(self.width);
        self.write_text(&mut buf);
        f.write_str(&buf)
    }
}

struct NodeData {
    green: Arc<GreenNode>,
    offset: usize,
    parent: Option<SyntaxNode>,
    index: usize,
}

/// A positioned view of a green node inside one tree snapshot
#[derive(Clone)]
pub struct SyntaxNode(Arc<NodeData>);

impl SyntaxNode {
    /// Cursor for the root of a tree
    pub fn new_root(green: Arc<GreenNode>) -> Self {
        Self(Arc::new(NodeData {
            green,
            offset: 0,
            parent: None,
            index: 0,
        }))
    }

    fn new_child(parent: &SyntaxNode, green: Arc<GreenNode>, offset: usize, index: usize) -> Self {
        Self(Arc::new(NodeData {
            green,
            offset,
            parent: Some(parent.clone()),
            index,
        }))
    }

    pub fn kind(&self) -> SyntaxKind {
        self.0.green.kind()
    }

    pub fn span(&self) -> TextSpan {
        TextSpan::new(self.0.offset, self.0.green.width())
    }

    pub fn green(&self) -> &Arc<GreenNode> {
        &self.0.green
    }

    pub fn parent(&self) -> Option<&SyntaxNode> {
        self.0.parent.as_ref()
    }

    /// Position among the parent's children (0 for the root)
    pub fn index_in_parent(&self) -> usize {
        self.0.index
    }

    pub fn is_token(&self) -> bool {
        self.0.green.is_token()
    }

    /// Token text, or None for inner nodes
    pub fn token_text(&self) -> Option<&str> {
        self.0.green.text()
    }

    /// Full source text of the subtree
    pub fn text(&self) -> String {
        self.0.green.to_string()
    }

    /// Whether this node or any ancestor is flagged as generated code
    pub fn is_generated(&self) -> bool {
        self.ancestors_and_self().any(|n| n.green().is_generated())
    }

    /// All children, tokens and trivia included
    pub fn children(&self) -> SyntaxNodeChildren {
        SyntaxNodeChildren {
            parent: self.clone(),
            index: 0,
            offset: self.0.offset,
        }
    }

    /// Inner-node children only
    pub fn child_nodes(&self) -> impl Iterator<Item = SyntaxNode> {
        self.children().filter(|c| !c.is_token())
    }

    /// Non-trivia token children
    pub fn child_tokens(&self) -> impl Iterator<Item = SyntaxNode> {
        self.children()
            .filter(|c| c.is_token() && !c.kind().is_trivia())
    }

    pub fn first_child_of_kind(&self, kind: SyntaxKind) -> Option<SyntaxNode> {
        self.children().find(|c| c.kind() == kind)
    }

    pub fn has_child_of_kind(&self, kind: SyntaxKind) -> bool {
        self.first_child_of_kind(kind).is_some()
    }

    /// This node followed by its ancestors, innermost first
    pub fn ancestors_and_self(&self) -> impl Iterator<Item = SyntaxNode> {
        std::iter::successors(Some(self.clone()), |n| n.parent().cloned())
    }

    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode> {
        std::iter::successors(self.parent().cloned(), |n| n.parent().cloned())
    }

    /// Depth-first pre-order walk of the subtree, starting with this node
    pub fn descendants(&self) -> Preorder {
        Preorder {
            stack: vec![self.clone()],
        }
    }

    /// The node whose span covers `span`: the outermost node with exactly
    /// that span, otherwise the innermost node containing it.
    pub fn covering_node(&self, span: TextSpan) -> Option<SyntaxNode> {
        if !self.span().contains(&span) {
            return None;
        }

        let mut current = self.clone();
        while let Some(child) = current.children().find(|c| c.span().contains(&span)) {
            current = child;
        }

        // Climb through wrappers sharing the same span, staying inside `self`
        while current != *self {
            match current.parent() {
                Some(parent) if parent.span() == current.span() => current = parent.clone(),
                _ => break,
            }
        }

        Some(current)
    }
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0.green, &other.0.green) && self.0.offset == other.0.offset
    }
}

impl Eq for SyntaxNode {}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.kind(), self.span())
    }
}

/// Iterator over the children of a [`SyntaxNode`]
pub struct SyntaxNodeChildren {
    parent: SyntaxNode,
    index: usize,
    offset: usize,
}

impl Iterator for SyntaxNodeChildren {
    type Item = SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let green = self.parent.green().children().get(self.index)?.clone();
        let width = green.width();
        let child = SyntaxNode::new_child(&self.parent, green, self.offset, self.index);
        self.index += 1;
        self.offset += width;
        Some(child)
    }
}

/// Depth-first pre-order iterator
pub struct Preorder {
    stack: Vec<SyntaxNode>,
}

impl Iterator for Preorder {
    type Item = SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let children: Vec<_> = node.children().collect();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Arc<GreenNode> {
        // [Obsolete()]
        let name = GreenNode::node(
            SyntaxKind::Name,
            vec![Arc::new(GreenNode::token(SyntaxKind::Ident, "Obsolete"))],
        );
        let args = GreenNode::node(
            SyntaxKind::AttributeArgumentList,
            vec![
                Arc::new(GreenNode::token(SyntaxKind::LParen, "(")),
                Arc::new(GreenNode::token(SyntaxKind::RParen, ")")),
            ],
        );
        let attr = GreenNode::node(SyntaxKind::Attribute, vec![Arc::new(name), Arc::new(args)]);
        let list = GreenNode::node(
            SyntaxKind::AttributeList,
            vec![
                Arc::new(GreenNode::token(SyntaxKind::LBracket, "[")),
                Arc::new(attr),
                Arc::new(GreenNode::token(SyntaxKind::RBracket, "]")),
            ],
        );
        Arc::new(GreenNode::node(SyntaxKind::CompilationUnit, vec![Arc::new(list)]))
    }

    #[test]
    fn test_green_width_and_text() {
        let root = sample();
        assert_eq!(root.width(), 12);
        assert_eq!(root.to_string(), "[Obsolete()]");
    }

    #[test]
    fn test_children_offsets() {
        let root = SyntaxNode::new_root(sample());
        let list = root.children().next().unwrap();
        let spans: Vec<_> = list.children().map(|c| (c.kind(), c.span())).collect();
        assert_eq!(
            spans,
            vec![
                (SyntaxKind::LBracket, TextSpan::new(0, 1)),
                (SyntaxKind::Attribute, TextSpan::new(1, 10)),
                (SyntaxKind::RBracket, TextSpan::new(11, 1)),
            ]
        );
    }

    #[test]
    fn test_preorder_is_document_order() {
        let root = SyntaxNode::new_root(sample());
        let kinds: Vec<_> = root.descendants().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::CompilationUnit,
                SyntaxKind::AttributeList,
                SyntaxKind::LBracket,
                SyntaxKind::Attribute,
                SyntaxKind::Name,
                SyntaxKind::Ident,
                SyntaxKind::AttributeArgumentList,
                SyntaxKind::LParen,
                SyntaxKind::RParen,
                SyntaxKind::RBracket,
            ]
        );
    }

    #[test]
    fn test_ancestors() {
        let root = SyntaxNode::new_root(sample());
        let ident = root
            .descendants()
            .find(|n| n.kind() == SyntaxKind::Ident)
            .unwrap();
        let kinds: Vec<_> = ident.ancestors().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::Name,
                SyntaxKind::Attribute,
                SyntaxKind::AttributeList,
                SyntaxKind::CompilationUnit,
            ]
        );
    }

    #[test]
    fn test_covering_node_prefers_outermost_exact_match() {
        let root = SyntaxNode::new_root(sample());
        // The Name node and its Ident token share the span 1..9
        let node = root.covering_node(TextSpan::new(1, 8)).unwrap();
        assert_eq!(node.kind(), SyntaxKind::Name);

        let node = root.covering_node(TextSpan::new(9, 2)).unwrap();
        assert_eq!(node.kind(), SyntaxKind::AttributeArgumentList);

        // Not an exact match: innermost container, widened to its wrappers
        let node = root.covering_node(TextSpan::new(2, 3)).unwrap();
        assert_eq!(node.kind(), SyntaxKind::Name);

        let node = root.covering_node(TextSpan::new(10, 1)).unwrap();
        assert_eq!(node.kind(), SyntaxKind::RParen);
    }

    #[test]
    fn test_generated_flag_is_inherited() {
        let inner = Arc::new(GreenNode::token(SyntaxKind::Ident, "x"));
        let node = GreenNode::node(SyntaxKind::MethodDecl, vec![inner]).into_generated();
        let root = SyntaxNode::new_root(Arc::new(GreenNode::node(
            SyntaxKind::CompilationUnit,
            vec![Arc::new(node)],
        )));
        assert!(!root.is_generated());
        let ident = root.descendants().last().unwrap();
        assert!(ident.is_generated());
    }

    #[test]
    fn test_remove_children() {
        let root = sample();
        let list = root.children()[0].clone();
        let attr = list.children()[1].clone();
        let trimmed = attr.remove_children(1..2);
        assert_eq!(trimmed.to_string(), "Obsolete");
        assert_eq!(trimmed.width(), 8);
    }
}
