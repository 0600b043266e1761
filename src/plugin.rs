//! Language plugins: parsing, semantic models and the rules/fixes they ship

use crate::fix::CodeFix;
use crate::rule::Rule;
use crate::symbols::SymbolModel;
use crate::syntax::SyntaxTree;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Error during parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("nesting deeper than {limit} levels at offset {offset}")]
    TooDeep { offset: usize, limit: usize },
}

/// Plugin trait for language-specific parsing, semantics, rules and fixes
pub trait Plugin: Send + Sync {
    /// Plugin identifier (e.g., "csharp")
    fn id(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// File extensions this plugin handles (without dot, e.g., "cs")
    fn extensions(&self) -> &[&str];

    /// Parse source text into a lossless tree
    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError>;

    /// Build the symbol model for a tree
    fn symbols(&self, tree: &SyntaxTree) -> Arc<dyn SymbolModel>;

    /// Rules shipped by this plugin
    fn rules(&self) -> Vec<Arc<dyn Rule>>;

    /// Fixes shipped by this plugin
    fn fixes(&self) -> Vec<Arc<dyn CodeFix>>;

    /// Check if this plugin handles a file
    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
            })
    }
}

/// A parsed source file with its symbol model
#[derive(Clone)]
pub struct Document {
    pub path: PathBuf,
    pub tree: SyntaxTree,
    pub symbols: Arc<dyn SymbolModel>,
}

impl Document {
    /// Parse `text` with `plugin` and resolve its symbols
    pub fn parse(plugin: &dyn Plugin, path: &Path, text: &str) -> Result<Self, ParseError> {
        let tree = plugin.parse(text)?;
        let symbols = plugin.symbols(&tree);
        Ok(Self {
            path: path.to_path_buf(),
            tree,
            symbols,
        })
    }

    pub fn text(&self) -> String {
        self.tree.text()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("path", &self.path)
            .field("tree", &self.tree)
            .finish()
    }
}
