//! Built-in C# rules

use super::semantics::parameter_name_token;
use crate::diagnostic::{Diagnostic, DiagnosticDescriptor, Severity};
use crate::rule::{Rule, RuleCategory, RuleContext, RuleError};
use crate::syntax::{SyntaxKind, SyntaxNode};
use std::sync::Arc;

pub const ATTRIBUTE_SUFFIX: &str = "Attribute";

pub static REDUNDANT_ATTRIBUTE_PARENTHESES: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "redundant-attribute-parentheses",
    title: "Redundant attribute parentheses",
    message: "Parentheses are redundant if attribute has no arguments",
    category: RuleCategory::Redundancy,
    severity: Severity::Warning,
    enabled_by_default: true,
    kinds: &[SyntaxKind::Attribute],
    help: Some("Remove the empty argument list"),
};

pub static REDUNDANT_ATTRIBUTE_SUFFIX: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "redundant-attribute-suffix",
    title: "Redundant attribute suffix",
    message: "Attribute suffix is redundant: '{0}' can be written as '{1}'",
    category: RuleCategory::Style,
    severity: Severity::Info,
    enabled_by_default: true,
    kinds: &[SyntaxKind::Attribute],
    help: Some("The compiler appends 'Attribute' when resolving attribute names"),
};

pub static PARTIAL_METHOD_PARAMETER_NAME_MISMATCH: DiagnosticDescriptor = DiagnosticDescriptor {
    id: "partial-method-parameter-name-mismatch",
    title: "Partial method parameter name mismatch",
    message: "Parameter '{0}' is named '{1}' in the partial method definition",
    category: RuleCategory::Suspicious,
    severity: Severity::Warning,
    enabled_by_default: true,
    kinds: &[SyntaxKind::Parameter],
    help: Some("Use the same parameter names in both parts of a partial method"),
};

/// Get all built-in C# rules
pub fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(RedundantAttributeParentheses),
        Arc::new(RedundantAttributeSuffix),
        Arc::new(PartialMethodParameterNameMismatch),
    ]
}

/// `[Obsolete()]` where `[Obsolete]` would do
pub struct RedundantAttributeParentheses;

impl Rule for RedundantAttributeParentheses {
    fn descriptor(&self) -> &'static DiagnosticDescriptor {
        &REDUNDANT_ATTRIBUTE_PARENTHESES
    }

    fn check(
        &self,
        node: &SyntaxNode,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Diagnostic>, RuleError> {
        let Some(arguments) = node.first_child_of_kind(SyntaxKind::AttributeArgumentList) else {
            return Ok(None);
        };
        if arguments.has_child_of_kind(SyntaxKind::AttributeArgument) {
            return Ok(None);
        }
        Ok(Some(ctx.diagnostic(
            &REDUNDANT_ATTRIBUTE_PARENTHESES,
            arguments.span(),
            vec![],
        )))
    }
}

/// Last identifier of an attribute's name
pub(crate) fn attribute_name_token(attribute: &SyntaxNode) -> Option<SyntaxNode> {
    attribute
        .first_child_of_kind(SyntaxKind::Name)?
        .child_tokens()
        .filter(|t| t.kind() == SyntaxKind::Ident)
        .last()
}

/// `[ObsoleteAttribute]` where `[Obsolete]` would do
pub struct RedundantAttributeSuffix;

impl Rule for RedundantAttributeSuffix {
    fn descriptor(&self) -> &'static DiagnosticDescriptor {
        &REDUNDANT_ATTRIBUTE_SUFFIX
    }

    fn check(
        &self,
        node: &SyntaxNode,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Diagnostic>, RuleError> {
        let Some(token) = attribute_name_token(node) else {
            return Ok(None);
        };
        let Some(text) = token.token_text() else {
            return Ok(None);
        };
        // Verbatim identifiers name the attribute class exactly
        if text.starts_with('@') {
            return Ok(None);
        }
        match text.strip_suffix(ATTRIBUTE_SUFFIX) {
            Some(short) if !short.is_empty() => Ok(Some(ctx.diagnostic(
                &REDUNDANT_ATTRIBUTE_SUFFIX,
                token.span(),
                vec![text.to_string(), short.to_string()],
            ))),
            _ => Ok(None),
        }
    }
}

/// Implementation part of a partial method renames a parameter of the
/// definition part
pub struct PartialMethodParameterNameMismatch;

impl Rule for PartialMethodParameterNameMismatch {
    fn descriptor(&self) -> &'static DiagnosticDescriptor {
        &PARTIAL_METHOD_PARAMETER_NAME_MISMATCH
    }

    fn check(
        &self,
        node: &SyntaxNode,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Diagnostic>, RuleError> {
        let Some(method_node) = node
            .parent()
            .filter(|list| list.kind() == SyntaxKind::ParameterList)
            .and_then(|list| list.parent())
            .filter(|method| method.kind() == SyntaxKind::MethodDecl)
        else {
            return Ok(None);
        };

        let Some(symbol) = ctx.symbols.declared_symbol(node) else {
            return Ok(None);
        };
        let parameter = symbol.as_parameter().ok_or_else(|| {
            RuleError::new(
                &PARTIAL_METHOD_PARAMETER_NAME_MISMATCH,
                node,
                format!("declared symbol {} is not a parameter", symbol.id()),
            )
        })?;

        let Some(method) = ctx
            .symbols
            .declared_symbol(method_node)
            .and_then(|s| s.as_method().cloned())
        else {
            return Ok(None);
        };
        if !method.is_partial_implementation() {
            return Ok(None);
        }
        let Some(definition) = ctx.symbols.partial_definition_part(&method) else {
            return Ok(None);
        };
        let Some(expected) = definition
            .parameters
            .get(parameter.ordinal)
            .and_then(|&id| ctx.symbols.parameter(id))
        else {
            return Ok(None);
        };

        if expected.name == parameter.name {
            return Ok(None);
        }
        let Some(token) = parameter_name_token(node) else {
            return Ok(None);
        };
        Ok(Some(ctx.diagnostic(
            &PARTIAL_METHOD_PARAMETER_NAME_MISMATCH,
            token.span(),
            vec![parameter.name.clone(), expected.name.clone()],
        )))
    }
}
