//! Rule and fix registries

use crate::config::Config;
use crate::diagnostic::{DiagnosticDescriptor, Severity};
use crate::fix::CodeFix;
use crate::rule::Rule;
use crate::syntax::SyntaxKind;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Registration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("rule '{0}' is already registered")]
    DuplicateRule(String),

    #[error("rule '{0}' does not match any node kind")]
    NoKinds(String),

    #[error("fix '{0}' is already registered")]
    DuplicateFix(String),

    #[error("fix '{0}' does not fix any diagnostic")]
    NoFixableIds(String),
}

/// All known rules plus a dispatch table keyed by node kind
pub struct RuleRegistry {
    rules: Vec<Arc<dyn Rule>>,
    by_id: HashMap<&'static str, usize>,
    /// Rule indices per `SyntaxKind::index()`
    by_kind: Vec<Vec<usize>>,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            by_id: HashMap::new(),
            by_kind: vec![Vec::new(); SyntaxKind::COUNT],
        }
    }

    /// Register a rule. Ids must be unique and every rule must match at least one kind.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), RegistryError> {
        let descriptor = rule.descriptor();
        if self.by_id.contains_key(descriptor.id) {
            return Err(RegistryError::DuplicateRule(descriptor.id.to_string()));
        }
        if descriptor.kinds.is_empty() {
            return Err(RegistryError::NoKinds(descriptor.id.to_string()));
        }

        let index = self.rules.len();
        for kind in descriptor.kinds {
            let slot = &mut self.by_kind[kind.index()];
            if !slot.contains(&index) {
                slot.push(index);
            }
        }
        self.by_id.insert(descriptor.id, index);
        self.rules.push(rule);
        log::trace!("registered rule {}", descriptor.id);
        Ok(())
    }

    /// Register every rule, stopping at the first failure
    pub fn register_all(
        &mut self,
        rules: impl IntoIterator<Item = Arc<dyn Rule>>,
    ) -> Result<(), RegistryError> {
        rules.into_iter().try_for_each(|rule| self.register(rule))
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.by_id.get(id).map(|&i| &self.rules[i])
    }

    pub fn descriptor(&self, id: &str) -> Option<&'static DiagnosticDescriptor> {
        self.get(id).map(|r| r.descriptor())
    }

    /// Rules in registration order
    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Indices of rules inspecting `kind`, in registration order
    pub(crate) fn rules_for_kind(&self, kind: SyntaxKind) -> &[usize] {
        &self.by_kind[kind.index()]
    }

    pub(crate) fn rule_at(&self, index: usize) -> &Arc<dyn Rule> {
        &self.rules[index]
    }

    /// Resolve configuration into per-rule enabled flags and severities
    pub fn resolve(&self, config: &Config, path: Option<&Path>) -> ActiveRules {
        let severities = self
            .rules
            .iter()
            .map(|rule| {
                let descriptor = rule.descriptor();
                let ignored_for_file = path
                    .is_some_and(|p| config.should_ignore_rule_for_file(descriptor.id, p));
                if ignored_for_file || !config.is_rule_enabled(descriptor) {
                    None
                } else {
                    Some(
                        config
                            .get_severity_override(descriptor.id)
                            .unwrap_or(descriptor.severity),
                    )
                }
            })
            .collect();
        ActiveRules { severities }
    }
}

/// Enabled flag and effective severity for every registered rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRules {
    /// `None` when disabled, indexed like the registry
    severities: Vec<Option<Severity>>,
}

impl ActiveRules {
    pub fn severity(&self, index: usize) -> Option<Severity> {
        self.severities.get(index).copied().flatten()
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.severity(index).is_some()
    }

    pub fn enabled_count(&self) -> usize {
        self.severities.iter().filter(|s| s.is_some()).count()
    }
}

/// Fixes keyed by the diagnostic ids they can repair
#[derive(Default)]
pub struct FixRegistry {
    fixes: Vec<Arc<dyn CodeFix>>,
    by_diagnostic: HashMap<&'static str, Vec<usize>>,
}

impl FixRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fix: Arc<dyn CodeFix>) -> Result<(), RegistryError> {
        let descriptor = fix.descriptor();
        if self.fixes.iter().any(|f| f.descriptor().id == descriptor.id) {
            return Err(RegistryError::DuplicateFix(descriptor.id.to_string()));
        }
        if descriptor.fixable_ids.is_empty() {
            return Err(RegistryError::NoFixableIds(descriptor.id.to_string()));
        }

        let index = self.fixes.len();
        for &id in descriptor.fixable_ids {
            self.by_diagnostic.entry(id).or_default().push(index);
        }
        self.fixes.push(fix);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        fixes: impl IntoIterator<Item = Arc<dyn CodeFix>>,
    ) -> Result<(), RegistryError> {
        fixes.into_iter().try_for_each(|fix| self.register(fix))
    }

    /// Fixes able to repair `diagnostic_id`, in registration order
    pub fn fixes_for<'a>(&'a self, diagnostic_id: &str) -> impl Iterator<Item = &'a Arc<dyn CodeFix>> {
        self.by_diagnostic
            .get(diagnostic_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.fixes[i])
    }

    /// First registered fix for `diagnostic_id`
    pub fn primary_fix(&self, diagnostic_id: &str) -> Option<&Arc<dyn CodeFix>> {
        self.fixes_for(diagnostic_id).next()
    }

    /// First fix-all capable fix for `diagnostic_id`
    pub fn batch_fix(&self, diagnostic_id: &str) -> Option<&Arc<dyn CodeFix>> {
        self.fixes_for(diagnostic_id).find(|f| f.descriptor().fix_all)
    }

    pub fn has_fix(&self, diagnostic_id: &str) -> bool {
        self.by_diagnostic.contains_key(diagnostic_id)
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::fix::{FixContext, FixDescriptor, FixError, ProposedEdit};
    use crate::rule::{RuleCategory, RuleContext, RuleError};
    use crate::syntax::SyntaxNode;

    static ATTR_RULE: DiagnosticDescriptor = DiagnosticDescriptor {
        id: "attr-rule",
        title: "Attr",
        message: "attr",
        category: RuleCategory::Style,
        severity: Severity::Warning,
        enabled_by_default: true,
        kinds: &[SyntaxKind::Attribute, SyntaxKind::AttributeList],
        help: None,
    };

    static PARAM_RULE: DiagnosticDescriptor = DiagnosticDescriptor {
        id: "param-rule",
        title: "Param",
        message: "param",
        category: RuleCategory::Suspicious,
        severity: Severity::Info,
        enabled_by_default: true,
        kinds: &[SyntaxKind::Attribute, SyntaxKind::Parameter],
        help: None,
    };

    static NO_KINDS: DiagnosticDescriptor = DiagnosticDescriptor {
        id: "no-kinds",
        title: "None",
        message: "none",
        category: RuleCategory::Style,
        severity: Severity::Warning,
        enabled_by_default: true,
        kinds: &[],
        help: None,
    };

    struct Dummy(&'static DiagnosticDescriptor);

    impl Rule for Dummy {
        fn descriptor(&self) -> &'static DiagnosticDescriptor {
            self.0
        }

        fn check(
            &self,
            _node: &SyntaxNode,
            _ctx: &RuleContext<'_>,
        ) -> Result<Option<Diagnostic>, RuleError> {
            Ok(None)
        }
    }

    static FIX_A: FixDescriptor = FixDescriptor {
        id: "fix-a",
        fixable_ids: &["attr-rule"],
        title: "Fix A",
        fix_all: false,
    };

    static FIX_B: FixDescriptor = FixDescriptor {
        id: "fix-b",
        fixable_ids: &["attr-rule", "param-rule"],
        title: "Fix B",
        fix_all: true,
    };

    static FIX_NONE: FixDescriptor = FixDescriptor {
        id: "fix-none",
        fixable_ids: &[],
        title: "Fix nothing",
        fix_all: true,
    };

    struct DummyFix(&'static FixDescriptor);

    impl CodeFix for DummyFix {
        fn descriptor(&self) -> &'static FixDescriptor {
            self.0
        }

        fn compute(&self, _ctx: &FixContext<'_>) -> Result<ProposedEdit, FixError> {
            Err(FixError::Inapplicable("dummy".to_string()))
        }
    }

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry.register(Arc::new(Dummy(&ATTR_RULE))).unwrap();
        registry.register(Arc::new(Dummy(&PARAM_RULE))).unwrap();
        registry
    }

    #[test]
    fn test_dispatch_table() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.rules_for_kind(SyntaxKind::Attribute), &[0, 1]);
        assert_eq!(registry.rules_for_kind(SyntaxKind::AttributeList), &[0]);
        assert_eq!(registry.rules_for_kind(SyntaxKind::Parameter), &[1]);
        assert!(registry.rules_for_kind(SyntaxKind::MethodDecl).is_empty());
        assert_eq!(registry.descriptor("param-rule").unwrap().id, "param-rule");
    }

    #[test]
    fn test_rejects_duplicates_and_empty_kinds() {
        let mut registry = registry();
        assert_eq!(
            registry.register(Arc::new(Dummy(&ATTR_RULE))),
            Err(RegistryError::DuplicateRule("attr-rule".to_string()))
        );
        assert_eq!(
            registry.register(Arc::new(Dummy(&NO_KINDS))),
            Err(RegistryError::NoKinds("no-kinds".to_string()))
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_resolve_applies_config() {
        let registry = registry();
        let mut config = Config::new();
        config.rules.disabled.push("attr-rule".to_string());
        config
            .rules
            .severity
            .insert("param-rule".to_string(), Severity::Error);

        let active = registry.resolve(&config, None);
        assert!(!active.is_enabled(0));
        assert_eq!(active.severity(1), Some(Severity::Error));
        assert_eq!(active.enabled_count(), 1);
    }

    #[test]
    fn test_resolve_per_file_ignores() {
        let registry = registry();
        let mut config = Config::new();
        config
            .rules
            .per_file
            .insert("**/Legacy.cs".to_string(), vec!["param-rule".to_string()]);

        let active = registry.resolve(&config, Some(Path::new("src/Legacy.cs")));
        assert!(active.is_enabled(0));
        assert!(!active.is_enabled(1));

        let active = registry.resolve(&config, Some(Path::new("src/Other.cs")));
        assert!(active.is_enabled(1));
    }

    #[test]
    fn test_fix_registry_lookup() {
        let mut fixes = FixRegistry::new();
        fixes.register(Arc::new(DummyFix(&FIX_A))).unwrap();
        fixes.register(Arc::new(DummyFix(&FIX_B))).unwrap();

        let ids: Vec<_> = fixes
            .fixes_for("attr-rule")
            .map(|f| f.descriptor().id)
            .collect();
        assert_eq!(ids, vec!["fix-a", "fix-b"]);
        assert_eq!(fixes.primary_fix("attr-rule").unwrap().descriptor().id, "fix-a");
        assert_eq!(fixes.batch_fix("attr-rule").unwrap().descriptor().id, "fix-b");
        assert!(fixes.has_fix("param-rule"));
        assert!(fixes.fixes_for("unknown").next().is_none());
    }

    #[test]
    fn test_fix_registry_rejects_invalid() {
        let mut fixes = FixRegistry::new();
        fixes.register(Arc::new(DummyFix(&FIX_A))).unwrap();
        assert_eq!(
            fixes.register(Arc::new(DummyFix(&FIX_A))),
            Err(RegistryError::DuplicateFix("fix-a".to_string()))
        );
        assert_eq!(
            fixes.register(Arc::new(DummyFix(&FIX_NONE))),
            Err(RegistryError::NoFixableIds("fix-none".to_string()))
        );
    }
}
