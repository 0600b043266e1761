//! Resolved semantic entities and the read-only symbol model

use crate::syntax::{NodePtr, SnapshotId, SyntaxNode};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Opaque identity of a symbol within one symbol model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// A named type (class, struct, interface, record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSymbol {
    pub id: SymbolId,
    pub name: String,
    pub declaration: NodePtr,
    pub is_partial: bool,
}

/// A method, possibly one part of a partial method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSymbol {
    pub id: SymbolId,
    pub name: String,
    /// Containing type, if any
    pub container: Option<SymbolId>,
    pub parameters: Vec<SymbolId>,
    pub declaration: NodePtr,
    pub is_partial: bool,
    pub has_body: bool,
    /// The declaring (body-less) part, set on implementation parts
    pub partial_definition: Option<SymbolId>,
    /// The implementing part, set on definition parts
    pub partial_implementation: Option<SymbolId>,
}

impl MethodSymbol {
    /// Body-less partial declaration
    pub fn is_partial_definition(&self) -> bool {
        self.is_partial && !self.has_body
    }

    pub fn is_partial_implementation(&self) -> bool {
        self.is_partial && self.has_body
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSymbol {
    pub id: SymbolId,
    pub name: String,
    /// Source text of the declared type
    pub type_name: String,
    /// Position in the parameter list
    pub ordinal: usize,
    pub method: SymbolId,
    pub declaration: NodePtr,
}

/// Any resolved symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Type(Arc<TypeSymbol>),
    Method(Arc<MethodSymbol>),
    Parameter(Arc<ParameterSymbol>),
}

impl Symbol {
    pub fn id(&self) -> SymbolId {
        match self {
            Symbol::Type(t) => t.id,
            Symbol::Method(m) => m.id,
            Symbol::Parameter(p) => p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Type(t) => &t.name,
            Symbol::Method(m) => &m.name,
            Symbol::Parameter(p) => &p.name,
        }
    }

    pub fn as_method(&self) -> Option<&Arc<MethodSymbol>> {
        match self {
            Symbol::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_parameter(&self) -> Option<&Arc<ParameterSymbol>> {
        match self {
            Symbol::Parameter(p) => Some(p),
            _ => None,
        }
    }
}

/// Read-only resolver from declaration nodes to symbols, bound to one snapshot
pub trait SymbolModel: Send + Sync {
    /// Snapshot this model was built from
    fn snapshot(&self) -> SnapshotId;

    /// Symbol declared by `node`, if it is a declaration
    fn declared_symbol(&self, node: &SyntaxNode) -> Option<Symbol>;

    fn symbol(&self, id: SymbolId) -> Option<Symbol>;

    fn method(&self, id: SymbolId) -> Option<Arc<MethodSymbol>> {
        self.symbol(id)?.as_method().cloned()
    }

    fn parameter(&self, id: SymbolId) -> Option<Arc<ParameterSymbol>> {
        self.symbol(id)?.as_parameter().cloned()
    }

    /// The declaring part of a partial method implementation
    fn partial_definition_part(&self, method: &MethodSymbol) -> Option<Arc<MethodSymbol>> {
        self.method(method.partial_definition?)
    }
}

/// A model that resolves nothing
#[derive(Debug, Clone, Copy)]
pub struct NoSymbols {
    snapshot: SnapshotId,
}

impl NoSymbols {
    pub fn new(snapshot: SnapshotId) -> Self {
        Self { snapshot }
    }
}

impl SymbolModel for NoSymbols {
    fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    fn declared_symbol(&self, _node: &SyntaxNode) -> Option<Symbol> {
        None
    }

    fn symbol(&self, _id: SymbolId) -> Option<Symbol> {
        None
    }
}
