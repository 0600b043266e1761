//! Lossless, immutable syntax trees

pub mod builder;
pub mod kind;
pub mod node;
pub mod text;
pub mod tree;

pub use builder::{Checkpoint, GreenNodeBuilder};
pub use kind::SyntaxKind;
pub use node::{GreenNode, Preorder, SyntaxNode, SyntaxNodeChildren};
pub use text::{LineIndex, TextSpan};
pub use tree::{EditError, NodePtr, SnapshotId, SyntaxTree};
