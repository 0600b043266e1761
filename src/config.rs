//! Configuration for analysis and fixing
//!
//! Reads configuration from:
//! - `.menderrc.yaml` / `.menderrc.json` / `mender.yaml` (project-level)
//! - the same names in the home directory (user-level)

use crate::diagnostic::{DiagnosticDescriptor, Severity};
use crate::rule::RuleCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Analyze documents in parallel
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    pub color: ColorMode,

    pub verbose: bool,

    /// Show statistics
    pub statistics: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: ColorMode::Auto,
            verbose: false,
            statistics: true,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// File handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Include patterns
    pub include: Vec<String>,

    /// Exclude patterns
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.cs".to_string()],
            exclude: vec![
                "**/obj/**".to_string(),
                "**/bin/**".to_string(),
                "**/*.g.cs".to_string(),
                "**/target/**".to_string(),
            ],
        }
    }
}

/// Rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Disabled rules
    pub disabled: Vec<String>,

    /// Enabled rules (empty = all)
    pub enabled: Vec<String>,

    /// Select rules by id prefix (e.g., "redundant" selects all redundant-* rules)
    pub extend: Vec<String>,

    /// Ignore rules by id prefix
    pub ignore: Vec<String>,

    /// Severity overrides (rule_id -> severity)
    pub severity: HashMap<String, Severity>,

    /// Per-file rule ignores (glob pattern -> rule IDs)
    pub per_file: HashMap<String, Vec<String>>,
}

/// Fix settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixConfig {
    /// Upper bound on analyze/fix rounds per document
    pub max_iterations: usize,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Presets or other configuration files to inherit from
    pub extends: Vec<String>,

    pub engine: EngineConfig,

    pub output: OutputConfig,

    pub files: FilesConfig,

    pub rules: RulesConfig,

    pub fix: FixConfig,

    /// Enable nursery rules
    pub preview: bool,

    /// Rule categories to enable (empty = all stable)
    pub categories: Vec<String>,
}

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a preset configuration by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "recommended" => Some(Self::preset_recommended()),
            "strict" => Some(Self::preset_strict()),
            "minimal" => Some(Self::preset_minimal()),
            _ => None,
        }
    }

    fn preset_recommended() -> Self {
        Self {
            categories: vec![
                "correctness".to_string(),
                "suspicious".to_string(),
                "style".to_string(),
                "redundancy".to_string(),
            ],
            ..Self::default()
        }
    }

    /// Every category, nursery included
    fn preset_strict() -> Self {
        Self {
            preview: true,
            categories: vec![
                "correctness".to_string(),
                "suspicious".to_string(),
                "style".to_string(),
                "redundancy".to_string(),
                "perf".to_string(),
                "pedantic".to_string(),
                "nursery".to_string(),
            ],
            ..Self::default()
        }
    }

    fn preset_minimal() -> Self {
        Self {
            categories: vec!["correctness".to_string()],
            ..Self::default()
        }
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_depth(path, 0)
    }

    fn load_with_depth(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_DEPTH: usize = 10;
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum config inheritance depth exceeded".to_string(),
            ));
        }

        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        if !config.extends.is_empty() {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            let mut base_config = Self::default();

            for extend in &config.extends {
                let extended = match Self::preset(extend) {
                    Some(preset) => preset,
                    None => {
                        let extend_path = if Path::new(extend).is_absolute() {
                            PathBuf::from(extend)
                        } else {
                            base_dir.join(extend)
                        };
                        Self::load_with_depth(&extend_path, depth + 1)?
                    }
                };
                base_config.merge(extended);
            }

            base_config.merge(config);
            config = base_config;
        }

        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.engine.jobs != 0 {
            self.engine.jobs = other.engine.jobs;
        }
        self.engine.parallel = other.engine.parallel;

        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }
        self.output.statistics = other.output.statistics;

        // Default patterns are already present on both sides
        for pattern in other.files.include {
            if !self.files.include.contains(&pattern) {
                self.files.include.push(pattern);
            }
        }
        for pattern in other.files.exclude {
            if !self.files.exclude.contains(&pattern) {
                self.files.exclude.push(pattern);
            }
        }

        self.rules.disabled.extend(other.rules.disabled);
        if !other.rules.enabled.is_empty() {
            self.rules.enabled = other.rules.enabled;
        }
        self.rules.extend.extend(other.rules.extend);
        self.rules.ignore.extend(other.rules.ignore);
        self.rules.severity.extend(other.rules.severity);
        for (pattern, rules) in other.rules.per_file {
            self.rules.per_file.entry(pattern).or_default().extend(rules);
        }

        if other.fix.max_iterations != FixConfig::default().max_iterations {
            self.fix.max_iterations = other.fix.max_iterations;
        }

        if other.preview {
            self.preview = true;
        }
        if !other.categories.is_empty() {
            self.categories = other.categories;
        }
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_names = [
            ".menderrc.yaml",
            ".menderrc.yml",
            ".menderrc.json",
            "mender.yaml",
            "mender.yml",
            "mender.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            for name in &config_names {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI arguments into configuration
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        jobs: Option<usize>,
        disabled_rules: Option<Vec<String>>,
        enabled_rules: Option<Vec<String>>,
        max_iterations: Option<usize>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_rules {
            self.rules.disabled.extend(disabled);
        }
        if let Some(enabled) = enabled_rules {
            self.rules.enabled = enabled;
        }
        if let Some(n) = max_iterations {
            self.fix.max_iterations = n;
        }
    }

    /// Add prefixes to extend (select rules by prefix)
    pub fn add_extend_prefixes(&mut self, prefixes: Vec<String>) {
        self.rules.extend.extend(prefixes);
    }

    /// Add prefixes to ignore
    pub fn add_ignore_prefixes(&mut self, prefixes: Vec<String>) {
        self.rules.ignore.extend(prefixes);
    }

    /// Check if a rule is enabled.
    ///
    /// Explicit disables and ignore prefixes always win. An explicit
    /// `enabled` list or `extend` prefixes select rules directly; otherwise
    /// the rule's category, preview status and default decide.
    pub fn is_rule_enabled(&self, descriptor: &DiagnosticDescriptor) -> bool {
        let rule_id = descriptor.id;

        if self.rules.disabled.iter().any(|d| d == rule_id) {
            return false;
        }
        if self.matches_ignore_prefix(rule_id) {
            return false;
        }
        if !self.rules.enabled.is_empty() {
            return self.rules.enabled.iter().any(|e| e == rule_id);
        }
        if !self.rules.extend.is_empty() {
            return self.matches_extend_prefix(rule_id);
        }

        if descriptor.category == RuleCategory::Nursery && !self.preview {
            return false;
        }
        if !self.categories.is_empty() && !self.category_selected(descriptor.category) {
            return false;
        }

        descriptor.enabled_by_default
    }

    fn category_selected(&self, category: RuleCategory) -> bool {
        self.categories
            .iter()
            .filter_map(|c| c.parse::<RuleCategory>().ok())
            .any(|c| c == category)
    }

    /// Check if a rule matches any prefix in the extend list
    pub fn matches_extend_prefix(&self, rule_id: &str) -> bool {
        if self.rules.extend.is_empty() {
            return true;
        }
        let rule_lower = rule_id.to_lowercase();
        self.rules
            .extend
            .iter()
            .any(|prefix| rule_lower.starts_with(&prefix.to_lowercase()))
    }

    /// Check if a rule matches any prefix in the ignore list
    pub fn matches_ignore_prefix(&self, rule_id: &str) -> bool {
        let rule_lower = rule_id.to_lowercase();
        self.rules
            .ignore
            .iter()
            .any(|prefix| rule_lower.starts_with(&prefix.to_lowercase()))
    }

    /// Get severity override for a rule
    pub fn get_severity_override(&self, rule_id: &str) -> Option<Severity> {
        self.rules.severity.get(rule_id).copied()
    }

    /// Check if a rule should be ignored for a file
    pub fn should_ignore_rule_for_file(&self, rule_id: &str, file_path: &Path) -> bool {
        let file_str = file_path.to_string_lossy();

        for (pattern, rules) in &self.rules.per_file {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(file_str.as_ref())
                    && rules.iter().any(|r| r == "all" || r == rule_id)
                {
                    return true;
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::SyntaxKind;
    use std::io::Write;

    fn descriptor(
        id: &'static str,
        category: RuleCategory,
        enabled_by_default: bool,
    ) -> &'static DiagnosticDescriptor {
        Box::leak(Box::new(DiagnosticDescriptor {
            id,
            title: "Test",
            message: "Test",
            category,
            severity: Severity::Warning,
            enabled_by_default,
            kinds: &[SyntaxKind::Attribute],
            help: None,
        }))
    }

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert!(config.engine.parallel);
        assert_eq!(config.engine.jobs, 0);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.fix.max_iterations, 10);
        assert!(!config.files.include.is_empty());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_config_merge_cli() {
        let mut config = Config::new();
        config.merge_cli(
            Some(OutputFormat::Json),
            Some(true),
            Some(4),
            Some(vec!["rule1".to_string()]),
            None,
            Some(3),
        );

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert_eq!(config.engine.jobs, 4);
        assert_eq!(config.fix.max_iterations, 3);
        assert!(config.rules.disabled.contains(&"rule1".to_string()));
    }

    #[test]
    fn test_rule_enabled() {
        let mut config = Config::new();
        let disabled = descriptor("disabled-rule", RuleCategory::Style, true);
        let other = descriptor("other-rule", RuleCategory::Style, true);
        let only = descriptor("only-this", RuleCategory::Style, true);

        assert!(config.is_rule_enabled(disabled));

        config.rules.disabled.push("disabled-rule".to_string());
        assert!(!config.is_rule_enabled(disabled));
        assert!(config.is_rule_enabled(other));

        config.rules.enabled = vec!["only-this".to_string()];
        assert!(!config.is_rule_enabled(other));
        assert!(config.is_rule_enabled(only));
    }

    #[test]
    fn test_default_off_and_nursery_rules() {
        let mut config = Config::new();
        let off = descriptor("opt-in", RuleCategory::Pedantic, false);
        let nursery = descriptor("new-rule", RuleCategory::Nursery, true);

        assert!(!config.is_rule_enabled(off));
        assert!(!config.is_rule_enabled(nursery));

        config.preview = true;
        assert!(config.is_rule_enabled(nursery));

        // Explicit selection overrides the default
        config.rules.enabled = vec!["opt-in".to_string()];
        assert!(config.is_rule_enabled(off));
    }

    #[test]
    fn test_category_filter() {
        let config = Config::preset("minimal").unwrap();
        assert!(config.is_rule_enabled(descriptor("c1", RuleCategory::Correctness, true)));
        assert!(!config.is_rule_enabled(descriptor("s1", RuleCategory::Style, true)));
    }

    #[test]
    fn test_extend_and_ignore_prefixes() {
        let mut config = Config::new();
        let parens = descriptor("redundant-attribute-parentheses", RuleCategory::Redundancy, true);
        let suffix = descriptor("redundant-attribute-suffix", RuleCategory::Style, true);
        let partial = descriptor("partial-method-x", RuleCategory::Suspicious, true);

        config.add_extend_prefixes(vec!["Redundant".to_string()]);
        assert!(config.is_rule_enabled(parens));
        assert!(config.is_rule_enabled(suffix));
        assert!(!config.is_rule_enabled(partial));

        config.add_ignore_prefixes(vec!["redundant-attribute-s".to_string()]);
        assert!(config.is_rule_enabled(parens));
        assert!(!config.is_rule_enabled(suffix));
    }

    #[test]
    fn test_severity_override() {
        let mut config = Config::new();
        config.rules.severity.insert("rule1".to_string(), Severity::Error);

        assert_eq!(config.get_severity_override("rule1"), Some(Severity::Error));
        assert_eq!(config.get_severity_override("rule2"), None);
    }

    #[test]
    fn test_per_file_ignores() {
        let mut config = Config::new();
        config
            .rules
            .per_file
            .insert("**/Generated/*.cs".to_string(), vec!["all".to_string()]);
        config
            .rules
            .per_file
            .insert("**/Legacy.cs".to_string(), vec!["rule1".to_string()]);

        assert!(config.should_ignore_rule_for_file("any", Path::new("src/Generated/A.cs")));
        assert!(config.should_ignore_rule_for_file("rule1", Path::new("src/Legacy.cs")));
        assert!(!config.should_ignore_rule_for_file("rule2", Path::new("src/Legacy.cs")));
        assert!(!config.should_ignore_rule_for_file("rule1", Path::new("src/Other.cs")));
    }

    #[test]
    fn test_yaml_deserialize() {
        let yaml = r#"
engine:
  parallel: false
  jobs: 4
output:
  format: json
  verbose: true
rules:
  disabled:
    - rule1
    - rule2
  severity:
    rule3: error
fix:
  max_iterations: 5
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.engine.parallel);
        assert_eq!(config.engine.jobs, 4);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert_eq!(config.rules.disabled.len(), 2);
        assert_eq!(config.get_severity_override("rule3"), Some(Severity::Error));
        assert_eq!(config.fix.max_iterations, 5);
    }

    #[test]
    fn test_load_with_extends() {
        let dir = tempfile::tempdir().unwrap();

        let base = dir.path().join("base.yaml");
        let mut file = std::fs::File::create(&base).unwrap();
        writeln!(file, "rules:\n  disabled:\n    - base-rule").unwrap();

        let child = dir.path().join(".menderrc.json");
        std::fs::write(
            &child,
            r#"{ "extends": ["recommended", "base.yaml"], "rules": { "disabled": ["child-rule"] } }"#,
        )
        .unwrap();

        let config = Config::load(&child).unwrap();
        assert!(config.rules.disabled.contains(&"base-rule".to_string()));
        assert!(config.rules.disabled.contains(&"child-rule".to_string()));
        assert!(config.categories.contains(&"redundancy".to_string()));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mender.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_extends_cycle_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.yaml");
        std::fs::write(&path, "extends:\n  - loop.yaml\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));
    }
}
