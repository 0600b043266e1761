//! Built-in C# code fixes

use super::rules::{attribute_name_token, ATTRIBUTE_SUFFIX};
use super::semantics::parameter_name_token;
use crate::fix::{CodeFix, FixContext, FixDescriptor, FixError, ProposedEdit};
use crate::syntax::{GreenNode, SyntaxKind, SyntaxNode};
use std::sync::Arc;

pub static REMOVE_ATTRIBUTE_PARENTHESES: FixDescriptor = FixDescriptor {
    id: "remove-attribute-parentheses",
    fixable_ids: &["redundant-attribute-parentheses"],
    title: "Remove redundant parentheses",
    fix_all: true,
};

pub static REMOVE_ATTRIBUTE_SUFFIX: FixDescriptor = FixDescriptor {
    id: "remove-attribute-suffix",
    fixable_ids: &["redundant-attribute-suffix"],
    title: "Remove 'Attribute' suffix from '{0}'",
    fix_all: true,
};

pub static RENAME_PARTIAL_PARAMETER: FixDescriptor = FixDescriptor {
    id: "rename-partial-parameter",
    fixable_ids: &["partial-method-parameter-name-mismatch"],
    title: "Rename to '{0}'",
    fix_all: true,
};

/// Get all built-in C# fixes
pub fn builtin_fixes() -> Vec<Arc<dyn CodeFix>> {
    vec![
        Arc::new(RemoveAttributeParentheses),
        Arc::new(RemoveAttributeSuffix),
        Arc::new(RenamePartialParameter),
    ]
}

fn anchor(ctx: &FixContext<'_>) -> Result<SyntaxNode, FixError> {
    ctx.anchor().ok_or_else(|| {
        FixError::inapplicable(format!("no node at {}", ctx.diagnostic.span))
    })
}

fn ancestor(node: &SyntaxNode, kind: SyntaxKind) -> Result<SyntaxNode, FixError> {
    node.ancestors_and_self()
        .find(|n| n.kind() == kind)
        .ok_or_else(|| FixError::inapplicable(format!("no enclosing {}", kind)))
}

/// Rewrites the whole attribute without its argument list
pub struct RemoveAttributeParentheses;

impl CodeFix for RemoveAttributeParentheses {
    fn descriptor(&self) -> &'static FixDescriptor {
        &REMOVE_ATTRIBUTE_PARENTHESES
    }

    fn compute(&self, ctx: &FixContext<'_>) -> Result<ProposedEdit, FixError> {
        let attribute = ancestor(&anchor(ctx)?, SyntaxKind::Attribute)?;
        let arguments = attribute
            .first_child_of_kind(SyntaxKind::AttributeArgumentList)
            .ok_or_else(|| FixError::inapplicable("attribute has no argument list"))?;
        if arguments.has_child_of_kind(SyntaxKind::AttributeArgument) {
            return Err(FixError::inapplicable("attribute has arguments"));
        }

        // Drop the list with the whitespace right before `(`. Comments stay,
        // and so does the line break ending a line comment.
        let end = arguments.index_in_parent() + 1;
        let children = attribute.green().children();
        let mut start = arguments.index_in_parent();
        if start > 0
            && children[start - 1].kind() == SyntaxKind::Whitespace
            && (start < 2 || children[start - 2].kind() != SyntaxKind::LineComment)
        {
            start -= 1;
        }

        let replacement = attribute.green().remove_children(start..end);
        Ok(ProposedEdit::replace(&attribute, replacement))
    }
}

/// Rewrites the attribute name token without its `Attribute` suffix
pub struct RemoveAttributeSuffix;

impl CodeFix for RemoveAttributeSuffix {
    fn descriptor(&self) -> &'static FixDescriptor {
        &REMOVE_ATTRIBUTE_SUFFIX
    }

    fn compute(&self, ctx: &FixContext<'_>) -> Result<ProposedEdit, FixError> {
        let attribute = ancestor(&anchor(ctx)?, SyntaxKind::Attribute)?;
        let token = attribute_name_token(&attribute)
            .filter(|t| t.span() == ctx.diagnostic.span)
            .ok_or_else(|| FixError::inapplicable("attribute name moved"))?;
        let text = token.token_text().unwrap_or_default();
        let short = text
            .strip_suffix(ATTRIBUTE_SUFFIX)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FixError::inapplicable(format!("'{}' has no suffix", text)))?;

        Ok(
            ProposedEdit::replace(&token, GreenNode::token(SyntaxKind::Ident, short))
                .with_title_args(vec![text.to_string()]),
        )
    }
}

/// Renames an implementation parameter to the definition's name at the
/// same position
pub struct RenamePartialParameter;

impl CodeFix for RenamePartialParameter {
    fn descriptor(&self) -> &'static FixDescriptor {
        &RENAME_PARTIAL_PARAMETER
    }

    fn compute(&self, ctx: &FixContext<'_>) -> Result<ProposedEdit, FixError> {
        let parameter = ancestor(&anchor(ctx)?, SyntaxKind::Parameter)?;
        let method_node = ancestor(&parameter, SyntaxKind::MethodDecl)?;

        let method = ctx
            .symbols
            .declared_symbol(&method_node)
            .and_then(|s| s.as_method().cloned())
            .ok_or_else(|| FixError::inapplicable("method symbol not resolved"))?;
        let index = method_node
            .first_child_of_kind(SyntaxKind::ParameterList)
            .into_iter()
            .flat_map(|list| list.child_nodes())
            .filter(|n| n.kind() == SyntaxKind::Parameter)
            .position(|n| n == parameter)
            .ok_or_else(|| FixError::inapplicable("parameter not in list"))?;

        let definition = ctx
            .symbols
            .partial_definition_part(&method)
            .ok_or_else(|| FixError::inapplicable("no partial definition part"))?;
        let name = definition
            .parameters
            .get(index)
            .and_then(|&id| ctx.symbols.parameter(id))
            .map(|p| p.name.clone())
            .ok_or_else(|| {
                FixError::inapplicable(format!("definition has no parameter {}", index))
            })?;

        let token = parameter_name_token(&parameter)
            .ok_or_else(|| FixError::inapplicable("parameter has no name"))?;
        let replacement = parameter.green().replace_child(
            token.index_in_parent(),
            Arc::new(GreenNode::token(SyntaxKind::Ident, &name)),
        );

        Ok(ProposedEdit::replace(&parameter, replacement).with_title_args(vec![name]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::diagnostic::Diagnostic;
    use crate::fix::compute_fix;
    use crate::plugins::csharp::parser::parse;
    use crate::plugins::csharp::rules::builtin_rules;
    use crate::plugins::csharp::semantics::SemanticModel;
    use crate::rule::RuleContext;
    use crate::symbols::SymbolModel;
    use crate::syntax::SyntaxTree;
    use pretty_assertions::assert_eq;

    fn diagnostics(tree: &SyntaxTree, symbols: &dyn SymbolModel) -> Vec<Diagnostic> {
        let cancel = CancellationToken::new();
        let ctx = RuleContext {
            tree,
            symbols,
            cancel: &cancel,
        };
        let rules = builtin_rules();
        tree.root()
            .descendants()
            .flat_map(|n| {
                rules
                    .iter()
                    .filter(|r| r.descriptor().kinds.contains(&n.kind()))
                    .filter_map(|r| r.check(&n, &ctx).unwrap())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Apply the fix for the first diagnostic with `rule_id`
    fn fix_first(fix: &dyn CodeFix, rule_id: &str, text: &str) -> (String, String) {
        let tree = SyntaxTree::new(parse(text).unwrap());
        let symbols = SemanticModel::build(&tree);
        let diagnostic = diagnostics(&tree, &symbols)
            .into_iter()
            .find(|d| d.id() == rule_id)
            .unwrap();
        let edit = compute_fix(fix, &diagnostic, &tree, &symbols, &CancellationToken::new())
            .unwrap();
        let fixed = tree.replace(edit.target, edit.replacement.clone()).unwrap();
        (fixed.text(), edit.title)
    }

    #[test]
    fn test_remove_parentheses() {
        let (text, title) = fix_first(
            &RemoveAttributeParentheses,
            "redundant-attribute-parentheses",
            "[Obsolete()]",
        );
        assert_eq!(text, "[Obsolete]");
        assert_eq!(title, "Remove redundant parentheses");
    }

    #[test]
    fn test_remove_parentheses_with_spacing() {
        let (text, _) = fix_first(
            &RemoveAttributeParentheses,
            "redundant-attribute-parentheses",
            "class C {\n    [Serializable ( )] int x;\n}",
        );
        assert_eq!(text, "class C {\n    [Serializable] int x;\n}");
    }

    #[test]
    fn test_remove_parentheses_keeps_comments() {
        let (text, _) = fix_first(
            &RemoveAttributeParentheses,
            "redundant-attribute-parentheses",
            "[Obsolete /* keep */ ()]\nclass C { }\n",
        );
        assert_eq!(text, "[Obsolete /* keep */]\nclass C { }\n");

        let (text, _) = fix_first(
            &RemoveAttributeParentheses,
            "redundant-attribute-parentheses",
            "[Obsolete // keep\n    ()]\nclass C { }\n",
        );
        assert_eq!(text, "[Obsolete // keep\n    ]\nclass C { }\n");
    }

    #[test]
    fn test_remove_suffix() {
        let (text, title) = fix_first(
            &RemoveAttributeSuffix,
            "redundant-attribute-suffix",
            "[System.SerializableAttribute, Flags]\nenum E { A }",
        );
        assert_eq!(text, "[System.Serializable, Flags]\nenum E { A }");
        assert_eq!(title, "Remove 'Attribute' suffix from 'SerializableAttribute'");
    }

    #[test]
    fn test_rename_partial_parameter() {
        let source = "partial class C {\n    partial void M(int x);\n    partial void M(int y) { }\n}";
        let (text, title) = fix_first(
            &RenamePartialParameter,
            "partial-method-parameter-name-mismatch",
            source,
        );
        assert_eq!(
            text,
            "partial class C {\n    partial void M(int x);\n    partial void M(int x) { }\n}"
        );
        assert_eq!(title, "Rename to 'x'");
    }

    #[test]
    fn test_rename_uses_position_not_similarity() {
        let source = "partial class C {\n    partial void M(string first, string second);\n    partial void M(string second, string first) { }\n}";
        let (text, _) = fix_first(
            &RenamePartialParameter,
            "partial-method-parameter-name-mismatch",
            source,
        );
        assert!(text.contains("partial void M(string first, string first) { }"));
    }

    #[test]
    fn test_rename_keeps_modifiers_and_default() {
        let source = "partial class C {\n    partial void M(ref int count);\n    partial void M(ref int n) { }\n}";
        let (text, _) = fix_first(
            &RenamePartialParameter,
            "partial-method-parameter-name-mismatch",
            source,
        );
        assert!(text.contains("partial void M(ref int count) { }"));
    }
}
