//! Declaration-level symbol model for C# trees

use crate::symbols::{
    MethodSymbol, ParameterSymbol, Symbol, SymbolId, SymbolModel, TypeSymbol,
};
use crate::syntax::{NodePtr, SnapshotId, SyntaxKind, SyntaxNode, SyntaxTree};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

const TYPE_KEYWORDS: &[&str] = &["class", "struct", "interface", "enum", "record"];

/// Symbols declared in one snapshot, keyed by declaration node
pub struct SemanticModel {
    snapshot: SnapshotId,
    symbols: Vec<Symbol>,
    by_declaration: HashMap<NodePtr, SymbolId>,
}

/// Partial methods pair up on container, name and parameter types
type PartialKey = (String, String, Vec<String>);

enum Entry {
    Type(TypeSymbol),
    Method(MethodSymbol),
    Parameter(ParameterSymbol),
}

#[derive(Default)]
struct Collector {
    entries: Vec<Entry>,
    by_declaration: HashMap<NodePtr, SymbolId>,
    partials: HashMap<PartialKey, (Option<SymbolId>, Option<SymbolId>)>,
}

/// Non-trivia text of a subtree, tokens joined without spacing
fn compact_text(node: &SyntaxNode) -> String {
    node.descendants()
        .filter(|n| n.is_token() && !n.kind().is_trivia())
        .filter_map(|n| n.token_text().map(str::to_string))
        .collect()
}

fn has_modifier(node: &SyntaxNode, modifier: &str) -> bool {
    node.first_child_of_kind(SyntaxKind::ModifierList)
        .is_some_and(|list| {
            list.child_tokens()
                .any(|t| t.token_text() == Some(modifier))
        })
}

/// Declared name of a type: the first identifier after its keywords
fn type_name(node: &SyntaxNode) -> Option<String> {
    node.child_tokens()
        .filter(|t| t.kind() == SyntaxKind::Ident)
        .filter_map(|t| t.token_text().map(str::to_string))
        .find(|text| !TYPE_KEYWORDS.contains(&text.as_str()))
}

/// Declared name of a method: the last identifier before its parameter list
fn method_name(node: &SyntaxNode) -> Option<String> {
    node.children()
        .take_while(|c| c.kind() != SyntaxKind::ParameterList)
        .filter(|c| c.kind() == SyntaxKind::Ident)
        .last()
        .and_then(|t| t.token_text().map(str::to_string))
}

/// Name token of a parameter
pub(crate) fn parameter_name_token(node: &SyntaxNode) -> Option<SyntaxNode> {
    node.child_tokens().find(|t| t.kind() == SyntaxKind::Ident)
}

/// Parameter type as written, including ref-kind modifiers
fn parameter_type(node: &SyntaxNode) -> String {
    let mut parts: Vec<String> = node
        .first_child_of_kind(SyntaxKind::ModifierList)
        .map(|list| {
            list.child_tokens()
                .filter_map(|t| t.token_text().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if let Some(type_ref) = node.first_child_of_kind(SyntaxKind::TypeRef) {
        parts.push(compact_text(&type_ref));
    }
    parts.join(" ")
}

impl Collector {
    fn next_id(&self) -> SymbolId {
        SymbolId(self.entries.len() as u32)
    }

    fn push(&mut self, node: &SyntaxNode, entry: Entry) -> SymbolId {
        let id = self.next_id();
        self.entries.push(entry);
        self.by_declaration.insert(NodePtr::of(node), id);
        id
    }

    /// `scope` is the qualified name of the enclosing namespace or type
    fn walk(&mut self, node: &SyntaxNode, scope: &str, container: Option<SymbolId>) {
        match node.kind() {
            SyntaxKind::NamespaceDecl => {
                let name = node
                    .first_child_of_kind(SyntaxKind::Name)
                    .map(|n| compact_text(&n))
                    .unwrap_or_default();
                let scope = qualify(scope, &name);
                for child in node.child_nodes() {
                    self.walk(&child, &scope, container);
                }
            }
            SyntaxKind::TypeDecl => {
                let name = type_name(node).unwrap_or_default();
                let id = self.push(
                    node,
                    Entry::Type(TypeSymbol {
                        id: self.next_id(),
                        name: name.clone(),
                        declaration: NodePtr::of(node),
                        is_partial: has_modifier(node, "partial"),
                    }),
                );
                let scope = qualify(scope, &name);
                for child in node.child_nodes() {
                    self.walk(&child, &scope, Some(id));
                }
            }
            SyntaxKind::MethodDecl => self.method(node, scope, container),
            SyntaxKind::CompilationUnit => {
                for child in node.child_nodes() {
                    self.walk(&child, scope, container);
                }
            }
            _ => {}
        }
    }

    fn method(&mut self, node: &SyntaxNode, scope: &str, container: Option<SymbolId>) {
        let Some(name) = method_name(node) else {
            return;
        };
        let is_partial = has_modifier(node, "partial");
        let has_body =
            node.has_child_of_kind(SyntaxKind::Block) || node.has_child_of_kind(SyntaxKind::ExpressionBody);

        let method_id = self.push(
            node,
            Entry::Method(MethodSymbol {
                id: self.next_id(),
                name: name.clone(),
                container,
                parameters: Vec::new(),
                declaration: NodePtr::of(node),
                is_partial,
                has_body,
                partial_definition: None,
                partial_implementation: None,
            }),
        );

        let mut parameters = Vec::new();
        let mut types = Vec::new();
        let list = node.first_child_of_kind(SyntaxKind::ParameterList);
        let declared = list
            .iter()
            .flat_map(|l| l.child_nodes())
            .filter(|c| c.kind() == SyntaxKind::Parameter);
        for (ordinal, parameter) in declared.enumerate() {
            let type_name = parameter_type(&parameter);
            let name = parameter_name_token(&parameter)
                .and_then(|t| t.token_text().map(str::to_string))
                .unwrap_or_default();
            types.push(type_name.clone());
            let id = self.push(
                &parameter,
                Entry::Parameter(ParameterSymbol {
                    id: self.next_id(),
                    name,
                    type_name,
                    ordinal,
                    method: method_id,
                    declaration: NodePtr::of(&parameter),
                }),
            );
            parameters.push(id);
        }

        if let Some(Entry::Method(method)) = self.entries.get_mut(method_id.0 as usize) {
            method.parameters = parameters;
        }

        if is_partial {
            let parts = self
                .partials
                .entry((scope.to_string(), name, types))
                .or_default();
            if has_body {
                parts.1 = Some(method_id);
            } else {
                parts.0 = Some(method_id);
            }
        }
    }

    fn link_partials(&mut self) {
        let pairs: Vec<(SymbolId, SymbolId)> = self
            .partials
            .values()
            .filter_map(|&(definition, implementation)| Some((definition?, implementation?)))
            .collect();

        for (definition, implementation) in pairs {
            if let Some(Entry::Method(method)) = self.entries.get_mut(definition.0 as usize) {
                method.partial_implementation = Some(implementation);
            }
            if let Some(Entry::Method(method)) = self.entries.get_mut(implementation.0 as usize) {
                method.partial_definition = Some(definition);
            }
        }
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

impl SemanticModel {
    /// Resolve every declaration in `tree`
    pub fn build(tree: &SyntaxTree) -> Self {
        let mut collector = Collector::default();
        collector.walk(&tree.root(), "", None);
        collector.link_partials();

        let symbols: Vec<Symbol> = collector
            .entries
            .into_iter()
            .map(|entry| match entry {
                Entry::Type(t) => Symbol::Type(Arc::new(t)),
                Entry::Method(m) => Symbol::Method(Arc::new(m)),
                Entry::Parameter(p) => Symbol::Parameter(Arc::new(p)),
            })
            .collect();
        debug!("resolved {} symbols for snapshot {}", symbols.len(), tree.id());

        Self {
            snapshot: tree.id(),
            symbols,
            by_declaration: collector.by_declaration,
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolModel for SemanticModel {
    fn snapshot(&self) -> SnapshotId {
        self.snapshot
    }

    fn declared_symbol(&self, node: &SyntaxNode) -> Option<Symbol> {
        let id = self.by_declaration.get(&NodePtr::of(node))?;
        self.symbol(*id)
    }

    fn symbol(&self, id: SymbolId) -> Option<Symbol> {
        self.symbols.get(id.0 as usize).cloned()
    }
}
