//! C# plugin for mender

mod fixes;
mod lexer;
mod parser;
mod rules;
mod semantics;

pub use fixes::{
    builtin_fixes, RemoveAttributeParentheses, RemoveAttributeSuffix, RenamePartialParameter,
};
pub use lexer::tokenize;
pub use parser::{parse, MAX_DEPTH};
pub use rules::{
    builtin_rules, PartialMethodParameterNameMismatch, RedundantAttributeParentheses,
    RedundantAttributeSuffix, PARTIAL_METHOD_PARAMETER_NAME_MISMATCH,
    REDUNDANT_ATTRIBUTE_PARENTHESES, REDUNDANT_ATTRIBUTE_SUFFIX,
};
pub use semantics::SemanticModel;

use crate::fix::CodeFix;
use crate::plugin::{ParseError, Plugin};
use crate::rule::Rule;
use crate::symbols::SymbolModel;
use crate::syntax::SyntaxTree;
use std::sync::Arc;

/// C# plugin: declaration parser, symbol model, rules and fixes
#[derive(Debug, Default, Clone, Copy)]
pub struct CSharpPlugin;

impl CSharpPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for CSharpPlugin {
    fn id(&self) -> &str {
        "csharp"
    }

    fn description(&self) -> &str {
        "C# attribute and partial method analyzers"
    }

    fn extensions(&self) -> &[&str] {
        &["cs"]
    }

    fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        Ok(SyntaxTree::new(parse(text)?))
    }

    fn symbols(&self, tree: &SyntaxTree) -> Arc<dyn SymbolModel> {
        Arc::new(SemanticModel::build(tree))
    }

    fn rules(&self) -> Vec<Arc<dyn Rule>> {
        builtin_rules()
    }

    fn fixes(&self) -> Vec<Arc<dyn CodeFix>> {
        builtin_fixes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_plugin_id() {
        assert_eq!(CSharpPlugin::new().id(), "csharp");
    }

    #[test]
    fn test_handles_extension() {
        let plugin = CSharpPlugin::new();
        assert!(plugin.handles(Path::new("src/Program.cs")));
        assert!(plugin.handles(Path::new("Legacy.CS")));
        assert!(!plugin.handles(Path::new("build.wxs")));
        assert!(!plugin.handles(Path::new("Makefile")));
    }

    #[test]
    fn test_every_rule_has_a_fix() {
        let plugin = CSharpPlugin::new();
        let fixes = plugin.fixes();
        for rule in plugin.rules() {
            let id = rule.descriptor().id;
            assert!(
                fixes
                    .iter()
                    .any(|f| f.descriptor().fixable_ids.contains(&id) && f.descriptor().fix_all),
                "no batch fix for {}",
                id
            );
        }
    }

    #[test]
    fn test_parse_round_trips() {
        let source = "using System;\n\n[Obsolete()]\npublic partial class C { }\n";
        let tree = CSharpPlugin::new().parse(source).unwrap();
        assert_eq!(tree.text(), source);
    }
}
