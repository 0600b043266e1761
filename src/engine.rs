//! Core analysis engine

use crate::cancel::{CancellationToken, Cancelled};
use crate::config::Config;
use crate::diagnostic::{Diagnostic, Severity};
use crate::fixer::FixAllState;
use crate::plugin::{Document, ParseError, Plugin};
use crate::registry::{RegistryError, RuleRegistry};
use crate::rule::{panic_message, RuleContext, RuleError};
use crate::symbols::SymbolModel;
use crate::syntax::{LineIndex, SyntaxTree};
use log::{debug, error, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-rule timing statistics
#[derive(Debug, Clone, Default)]
pub struct RuleTiming {
    /// Rule ID
    pub rule_id: String,
    /// Total time spent on this rule
    pub total_time: Duration,
    /// Number of times the rule was evaluated
    pub evaluation_count: usize,
    /// Number of matches found
    pub match_count: usize,
}

impl RuleTiming {
    pub fn new(rule_id: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            ..Default::default()
        }
    }

    /// Average time per evaluation
    pub fn avg_time(&self) -> Duration {
        if self.evaluation_count > 0 {
            self.total_time / self.evaluation_count as u32
        } else {
            Duration::ZERO
        }
    }

    fn absorb(&mut self, other: &RuleTiming) {
        self.total_time += other.total_time;
        self.evaluation_count += other.evaluation_count;
        self.match_count += other.match_count;
    }
}

/// Add per-rule counters from `from` into `into`
pub fn absorb_timings(
    into: &mut HashMap<String, RuleTiming>,
    from: HashMap<String, RuleTiming>,
) {
    for (rule_id, timing) in from {
        into.entry(rule_id)
            .or_insert_with(|| RuleTiming::new(&timing.rule_id))
            .absorb(&timing);
    }
}

/// Result of one analysis pass over one tree
#[derive(Debug, Default)]
pub struct Analysis {
    /// Diagnostics in traversal order
    pub diagnostics: Vec<Diagnostic>,
    /// Predicates that failed or panicked
    pub failures: Vec<RuleError>,
    pub timings: HashMap<String, RuleTiming>,
    pub nodes_visited: usize,
}

/// Diagnostics and fix outcome for one file
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    /// Line index of the reported text (post-fix text when fixing)
    pub line_index: LineIndex,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<RuleError>,
    pub fixes_applied: usize,
    pub fix_state: Option<FixAllState>,
    /// Unified diff of applied fixes, when requested
    pub diff: Option<String>,
    /// Read or parse error that prevented analysis
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(path: &Path, text: &str, analysis: Analysis) -> Self {
        Self {
            path: path.to_path_buf(),
            line_index: LineIndex::new(text),
            diagnostics: analysis.diagnostics,
            failures: analysis.failures,
            fixes_applied: 0,
            fix_state: None,
            diff: None,
            error: None,
        }
    }

    /// A file that could not be read or parsed
    pub fn unreadable(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            line_index: LineIndex::default(),
            diagnostics: Vec::new(),
            failures: Vec::new(),
            fixes_applied: 0,
            fix_state: None,
            diff: None,
            error: Some(message),
        }
    }
}

/// Result of analyzing a set of documents
#[derive(Debug, Default)]
pub struct LintResult {
    /// Per-file reports, in input order
    pub files: Vec<FileReport>,

    pub files_processed: usize,

    pub files_with_errors: usize,

    pub files_with_warnings: usize,

    pub error_count: usize,

    pub warning_count: usize,

    pub info_count: usize,

    /// Rule predicate failures
    pub failure_count: usize,

    pub fixes_applied: usize,

    /// Processing duration
    pub duration: Duration,

    /// Per-rule timing statistics (rule_id -> timing)
    pub rule_timings: HashMap<String, RuleTiming>,
}

impl LintResult {
    /// Account for one file report
    pub fn push(&mut self, report: FileReport, timings: HashMap<String, RuleTiming>) {
        let mut errors = 0;
        let mut warnings = 0;
        for diag in &report.diagnostics {
            match diag.severity {
                Severity::Error => errors += 1,
                Severity::Warning => warnings += 1,
                Severity::Info => self.info_count += 1,
            }
        }
        if report.error.is_some() {
            errors += 1;
        }

        self.files_processed += 1;
        self.error_count += errors;
        self.warning_count += warnings;
        if errors > 0 {
            self.files_with_errors += 1;
        }
        if warnings > 0 {
            self.files_with_warnings += 1;
        }
        self.failure_count += report.failures.len();
        self.fixes_applied += report.fixes_applied;
        self.merge_timings(timings);
        self.files.push(report);
    }

    fn merge_timings(&mut self, timings: HashMap<String, RuleTiming>) {
        absorb_timings(&mut self.rule_timings, timings);
    }

    /// All diagnostics with the file they belong to
    pub fn diagnostics(&self) -> impl Iterator<Item = (&FileReport, &Diagnostic)> {
        self.files
            .iter()
            .flat_map(|f| f.diagnostics.iter().map(move |d| (f, d)))
    }

    pub fn total_diagnostics(&self) -> usize {
        self.files.iter().map(|f| f.diagnostics.len()).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }

    /// Check if result is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        self.error_count == 0 && self.warning_count == 0
    }

    /// Get exit code (0 = success, 1 = warnings, 2 = errors)
    pub fn exit_code(&self) -> i32 {
        if self.error_count > 0 {
            2
        } else if self.warning_count > 0 {
            1
        } else {
            0
        }
    }

    /// Get rule timings sorted by total time (descending)
    pub fn sorted_timings(&self) -> Vec<&RuleTiming> {
        let mut timings: Vec<_> = self.rule_timings.values().collect();
        timings.sort_by(|a, b| b.total_time.cmp(&a.total_time));
        timings
    }

    /// Format timing statistics as a string
    pub fn format_timings(&self) -> String {
        let timings = self.sorted_timings();
        if timings.is_empty() {
            return "No timing data available".to_string();
        }

        let mut output = String::new();
        output.push_str("Rule Timing Statistics:\n");
        output.push_str(&format!(
            "{:<44} {:>12} {:>12} {:>10} {:>10}\n",
            "Rule ID", "Total", "Avg", "Evals", "Matches"
        ));
        output.push_str(&"-".repeat(92));
        output.push('\n');

        for timing in timings {
            let total_ms = timing.total_time.as_secs_f64() * 1000.0;
            let avg_us = timing.avg_time().as_secs_f64() * 1_000_000.0;
            output.push_str(&format!(
                "{:<44} {:>10.2}ms {:>10.2}µs {:>10} {:>10}\n",
                timing.rule_id, total_ms, avg_us, timing.evaluation_count, timing.match_count
            ));
        }

        output
    }
}

/// The analysis engine: walks trees and dispatches nodes to enabled rules
pub struct Engine {
    config: Config,
    registry: RuleRegistry,
    /// Registered plugins (keyed by lowercase extension)
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: RuleRegistry::new(),
            plugins: HashMap::new(),
        }
    }

    /// Engine over an existing registry, without plugins
    pub fn with_registry(config: Config, registry: RuleRegistry) -> Self {
        Self {
            config,
            registry,
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin and its rules
    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        self.registry.register_all(plugin.rules())?;
        for ext in plugin.extensions() {
            self.plugins
                .insert(ext.to_lowercase(), Arc::clone(&plugin));
        }
        debug!("registered plugin {}", plugin.id());
        Ok(())
    }

    /// Plugin responsible for a file
    pub fn plugin_for(&self, path: &Path) -> Option<Arc<dyn Plugin>> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.plugins.get(&ext).cloned()
    }

    /// Registered plugins, deduplicated
    pub fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        let mut plugins: Vec<Arc<dyn Plugin>> = Vec::new();
        for plugin in self.plugins.values() {
            if !plugins.iter().any(|p| Arc::ptr_eq(p, plugin)) {
                plugins.push(Arc::clone(plugin));
            }
        }
        plugins.sort_by(|a, b| a.id().cmp(b.id()));
        plugins
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Parse a file's text with the plugin for its extension
    pub fn parse_document(&self, path: &Path, text: &str) -> Option<Result<Document, ParseError>> {
        let plugin = self.plugin_for(path)?;
        Some(Document::parse(plugin.as_ref(), path, text))
    }

    /// Analyze one tree with the configuration applied globally
    pub fn analyze(
        &self,
        tree: &SyntaxTree,
        symbols: &dyn SymbolModel,
        cancel: &CancellationToken,
    ) -> Result<Analysis, Cancelled> {
        self.analyze_path(tree, symbols, None, cancel)
    }

    /// Analyze one tree, honoring per-file rule ignores for `path`.
    ///
    /// Single depth-first pre-order walk. Generated subtrees are skipped.
    /// A rule that errors or panics is recorded in `failures` and the walk
    /// continues.
    pub fn analyze_path(
        &self,
        tree: &SyntaxTree,
        symbols: &dyn SymbolModel,
        path: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<Analysis, Cancelled> {
        let active = self.registry.resolve(&self.config, path);
        let ctx = RuleContext {
            tree,
            symbols,
            cancel,
        };

        let mut analysis = Analysis::default();
        let mut stack = vec![tree.root()];

        while let Some(node) = stack.pop() {
            cancel.check()?;

            if node.green().is_generated() {
                continue;
            }
            analysis.nodes_visited += 1;

            for &index in self.registry.rules_for_kind(node.kind()) {
                let Some(severity) = active.severity(index) else {
                    continue;
                };
                let rule = self.registry.rule_at(index);
                let rule_id = rule.descriptor().id;

                let start = Instant::now();
                let outcome = catch_unwind(AssertUnwindSafe(|| rule.check(&node, &ctx)));
                let elapsed = start.elapsed();

                let timing = analysis
                    .timings
                    .entry(rule_id.to_string())
                    .or_insert_with(|| RuleTiming::new(rule_id));
                timing.total_time += elapsed;
                timing.evaluation_count += 1;

                match outcome {
                    Ok(Ok(Some(diagnostic))) => {
                        timing.match_count += 1;
                        analysis.diagnostics.push(diagnostic.with_severity(severity));
                    }
                    Ok(Ok(None)) => {}
                    Ok(Err(failure)) => {
                        warn!("{}", failure);
                        analysis.failures.push(failure);
                    }
                    Err(payload) => {
                        let failure = RuleError::new(
                            rule.descriptor(),
                            &node,
                            format!("panicked: {}", panic_message(payload.as_ref())),
                        );
                        error!("{}", failure);
                        analysis.failures.push(failure);
                    }
                }
            }

            if !node.is_token() {
                let children: Vec<_> = node.children().collect();
                stack.extend(children.into_iter().rev());
            }
        }

        debug!(
            "snapshot {}: {} diagnostic(s), {} node(s) visited",
            tree.id(),
            analysis.diagnostics.len(),
            analysis.nodes_visited
        );
        Ok(analysis)
    }

    /// Analyze a parsed document
    pub fn analyze_document(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<Analysis, Cancelled> {
        self.analyze_path(
            &document.tree,
            document.symbols.as_ref(),
            Some(&document.path),
            cancel,
        )
    }

    /// Analyze many documents, in parallel when configured
    pub fn analyze_documents(
        &self,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<LintResult, Cancelled> {
        let start = Instant::now();
        let reports = self.run_parallel(documents, |document| {
            let mut analysis = self.analyze_document(document, cancel)?;
            let timings = std::mem::take(&mut analysis.timings);
            let report = FileReport::new(&document.path, &document.text(), analysis);
            Ok((report, timings))
        })?;

        let mut result = LintResult::default();
        for (report, timings) in reports {
            result.push(report, timings);
        }
        result.duration = start.elapsed();
        Ok(result)
    }

    /// Map `work` over `items` on a pool sized from the configuration,
    /// keeping input order. Any `Cancelled` aborts the whole run.
    pub fn run_parallel<T, R, F>(&self, items: &[T], work: F) -> Result<Vec<R>, Cancelled>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R, Cancelled> + Sync + Send,
    {
        if !self.config.engine.parallel {
            return items.iter().map(&work).collect();
        }

        let threads = if self.config.engine.jobs > 0 {
            self.config.engine.jobs
        } else {
            num_cpus::get()
        };
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| items.par_iter().map(&work).collect()),
            Err(e) => {
                warn!("could not build a {}-thread pool ({}); using the global pool", threads, e);
                items.par_iter().map(&work).collect()
            }
        }
    }
}
