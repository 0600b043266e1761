//! Mender CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, info, LevelFilter};
use mender::config::{ColorMode, OutputFormat};
use mender::engine::{absorb_timings, RuleTiming};
use mender::output::{create_formatter, generate_unified_diff};
use mender::plugins::builtin_plugins;
use mender::{
    CancellationToken, Cancelled, Config, Engine, FileReport, FixRegistry, Fixer, LintResult,
    Plugin, Rule, Severity,
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "mender",
    version,
    about = "Rule-based analyzer with batch code fixes",
    long_about = "Analyzes C# sources with syntax-tree rules and applies their fixes in non-overlapping batches until nothing is left to fix."
)]
struct Cli {
    /// Files, directories or glob patterns to analyze
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Disable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Only enable specific rules (comma-separated)
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Select rules by id prefix (e.g., 'redundant' selects all redundant-* rules)
    #[arg(long, value_delimiter = ',')]
    extend: Option<Vec<String>>,

    /// Ignore rules by id prefix
    #[arg(long, value_delimiter = ',')]
    ignore: Option<Vec<String>>,

    /// Apply fixes until the files converge (dry-run unless --write is given)
    #[arg(long)]
    fix: bool,

    /// Write fixed files back to disk (requires --fix or --diff)
    #[arg(long)]
    write: bool,

    /// Show a unified diff of the fixes (implies --fix)
    #[arg(long)]
    diff: bool,

    /// Maximum fix-all iterations per file
    #[arg(long)]
    max_iterations: Option<usize>,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Show per-rule diagnostic counts
    #[arg(long)]
    stats: bool,

    /// Show per-rule timing statistics, summed over every analysis pass
    #[arg(long)]
    timing: bool,

    /// Exit with 0 even if errors are found
    #[arg(long)]
    exit_zero: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// What to do with each parsed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mode {
    fix: bool,
    write: bool,
    diff: bool,
}

impl Mode {
    /// `--diff` implies fixing; `--write` needs one of the two
    fn from_cli(cli: &Cli) -> Result<Self> {
        let fix = cli.fix || cli.diff;
        if cli.write && !fix {
            bail!("--write requires --fix or --diff");
        }
        Ok(Self {
            fix,
            write: cli.write,
            diff: cli.diff,
        })
    }
}

fn main() {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mode = Mode::from_cli(&cli)?;
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load_default().unwrap_or_else(|e| {
            eprintln!("{}: {}; using defaults", "warning".yellow(), e);
            Config::default()
        }),
    };

    config.merge_cli(
        cli.format.map(OutputFormat::from),
        cli.verbose.then_some(true),
        cli.jobs,
        cli.disable.clone(),
        cli.select.clone(),
        cli.max_iterations,
    );
    if let Some(prefixes) = cli.extend.clone() {
        config.add_extend_prefixes(prefixes);
    }
    if let Some(prefixes) = cli.ignore.clone() {
        config.add_ignore_prefixes(prefixes);
    }

    let color = if cli.no_color {
        ColorMode::Never
    } else {
        config.output.color
    };
    match color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }
    let colored = color != ColorMode::Never;

    let mut engine = Engine::new(config.clone());
    let mut fixes = FixRegistry::new();
    for plugin in builtin_plugins() {
        fixes.register_all(plugin.fixes())?;
        engine.register_plugin(plugin)?;
    }
    let fixer = Fixer::new(fixes, config.fix.max_iterations);

    if cli.list_rules {
        list_rules(&engine, &fixer);
        return Ok(0);
    }

    if cli.files.is_empty() {
        eprintln!("{}: No files specified", "error".red().bold());
        eprintln!();
        eprintln!("Usage: mender [OPTIONS] <FILES>...");
        eprintln!();
        eprintln!("For more information, try '--help'");
        return Ok(2);
    }

    let files = collect_files(&cli.files, &config, &engine)?;
    if files.is_empty() {
        bail!("no files found to analyze");
    }
    info!("analyzing {} file(s)", files.len());

    let cancel = CancellationToken::new();
    let start = Instant::now();
    let reports = engine
        .run_parallel(&files, |path| process_file(&engine, &fixer, path, mode, &cancel))
        .context("analysis cancelled")?;

    let mut result = LintResult::default();
    for (report, timings) in reports {
        result.push(report, timings);
    }
    result.duration = start.elapsed();

    let formatter = create_formatter(config.output.format, colored);
    print!("{}", formatter.format(&result));

    if cli.stats {
        eprintln!();
        eprintln!("{}", format_stats(&result));
    }
    if cli.timing {
        eprintln!();
        eprintln!("{}", result.format_timings());
    }

    let exit_code = if cli.exit_zero { 0 } else { result.exit_code() };
    Ok(exit_code)
}

/// Analyze (and optionally fix) one file. Read and parse failures become
/// file-level errors; only cancellation aborts the run.
fn process_file(
    engine: &Engine,
    fixer: &Fixer,
    path: &Path,
    mode: Mode,
    cancel: &CancellationToken,
) -> Result<(FileReport, HashMap<String, RuleTiming>), Cancelled> {
    let original = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => return Ok((FileReport::unreadable(path, e.to_string()), HashMap::new())),
    };
    let (document, plugin) = match (engine.parse_document(path, &original), engine.plugin_for(path)) {
        (Some(Ok(document)), Some(plugin)) => (document, plugin),
        (Some(Err(e)), _) => {
            return Ok((FileReport::unreadable(path, format!("parse error: {}", e)), HashMap::new()))
        }
        _ => {
            return Ok((
                FileReport::unreadable(path, "no plugin handles this file".to_string()),
                HashMap::new(),
            ))
        }
    };

    if !mode.fix {
        let mut analysis = engine.analyze_document(&document, cancel)?;
        let timings = std::mem::take(&mut analysis.timings);
        return Ok((FileReport::new(path, &original, analysis), timings));
    }

    let fixed = match fixer.fix_document(engine, plugin.as_ref(), &document, cancel) {
        Ok(fixed) => fixed,
        Err(mender::BatchError::Cancelled) => return Err(Cancelled),
        Err(e) => {
            let mut analysis = engine.analyze_document(&document, cancel)?;
            let timings = std::mem::take(&mut analysis.timings);
            let mut report = FileReport::new(path, &original, analysis);
            report.error = Some(e.to_string());
            return Ok((report, timings));
        }
    };
    debug!(
        "{}: {} after {} iteration(s), {} edit(s)",
        path.display(),
        fixed.state,
        fixed.iterations,
        fixed.applied.len()
    );

    // Report what is left in the fixed text
    let symbols = plugin.symbols(&fixed.tree);
    let mut analysis = engine.analyze_path(&fixed.tree, symbols.as_ref(), Some(path), cancel)?;
    let mut timings = fixed.timings;
    absorb_timings(&mut timings, std::mem::take(&mut analysis.timings));
    let fixed_text = fixed.tree.text();

    let mut report = FileReport::new(path, &fixed_text, analysis);
    report.fixes_applied = fixed.applied.len();
    report.fix_state = Some(fixed.state);

    if mode.diff {
        let diff = generate_unified_diff(path, &original, &fixed_text);
        if !diff.is_empty() {
            report.diff = Some(diff);
        }
    }
    if mode.write && fixed_text != original {
        if let Err(e) = std::fs::write(path, &fixed_text) {
            report.error = Some(format!("failed to write fixes: {}", e));
        } else {
            info!("wrote {}", path.display());
        }
    }

    Ok((report, timings))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid pattern '{}'", pattern))?);
    }
    Ok(builder.build()?)
}

/// Expand file, directory and glob arguments. Directory contents are
/// filtered by the configured include/exclude patterns; explicit files only
/// by exclude.
fn collect_files(args: &[String], config: &Config, engine: &Engine) -> Result<Vec<PathBuf>> {
    let include = build_globset(&config.files.include)?;
    let exclude = build_globset(&config.files.exclude)?;

    let mut files = Vec::new();
    for arg in args {
        let path = Path::new(arg);
        if path.is_dir() {
            let pattern = format!("{}/**/*", arg.trim_end_matches('/'));
            for entry in glob::glob(&pattern)
                .with_context(|| format!("invalid directory '{}'", arg))?
                .flatten()
            {
                if entry.is_file() && include.is_match(&entry) && !exclude.is_match(&entry) {
                    files.push(entry);
                }
            }
        } else if path.is_file() {
            if !exclude.is_match(path) {
                files.push(path.to_path_buf());
            }
        } else {
            let paths =
                glob::glob(arg).with_context(|| format!("invalid pattern '{}'", arg))?;
            for entry in paths.flatten() {
                if entry.is_file() && !exclude.is_match(&entry) {
                    files.push(entry);
                }
            }
        }
    }

    files.retain(|f| engine.plugin_for(f).is_some());
    files.sort();
    files.dedup();
    Ok(files)
}

fn list_rules(engine: &Engine, fixer: &Fixer) {
    println!("{}", "Available rules:".bold());
    println!();

    for plugin in engine.plugins() {
        let rules = plugin.rules();
        println!(
            "  {} ({} rules):",
            format!("{} plugin", plugin.id()).cyan(),
            rules.len()
        );
        for rule in &rules {
            print_rule(rule.as_ref(), engine.config(), fixer);
        }
        println!();
    }
}

fn print_rule(rule: &dyn Rule, config: &Config, fixer: &Fixer) {
    let descriptor = rule.descriptor();
    let severity = match descriptor.severity {
        Severity::Error => "error".red(),
        Severity::Warning => "warning".yellow(),
        Severity::Info => "info".blue(),
    };
    let fixable = match fixer.fixes().batch_fix(descriptor.id) {
        Some(_) => " [fix-all]".green(),
        None if fixer.fixes().has_fix(descriptor.id) => " [fix]".green(),
        None => "".normal(),
    };
    let disabled = if config.is_rule_enabled(descriptor) {
        "".normal()
    } else {
        " [disabled]".dimmed()
    };

    println!(
        "    {} [{}] ({}){}{}",
        descriptor.id.cyan(),
        severity,
        descriptor.category,
        fixable,
        disabled
    );
    println!("      {}", descriptor.title);
    if let Some(help) = descriptor.help {
        println!("      {}", help);
    }
}

/// Diagnostic counts per rule, most frequent first
fn format_stats(result: &LintResult) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, diagnostic) in result.diagnostics() {
        *counts.entry(diagnostic.id()).or_default() += 1;
    }
    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let mut output = String::from("Diagnostics by rule:\n");
    for (rule_id, count) in counts {
        output.push_str(&format!("  {:>6}  {}\n", count, rule_id));
    }
    output.push_str(&format!(
        "  {:>6}  total ({} rule failure(s))\n",
        result.total_diagnostics(),
        result.failure_count
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(args: &[&str]) -> Result<Mode> {
        let cli = Cli::try_parse_from(["mender"].iter().chain(args))?;
        Mode::from_cli(&cli)
    }

    #[test]
    fn test_diff_implies_fix_and_allows_write() {
        assert_eq!(
            mode(&["--diff", "--write", "A.cs"]).unwrap(),
            Mode {
                fix: true,
                write: true,
                diff: true
            }
        );
        assert!(mode(&["--fix", "--write", "A.cs"]).unwrap().write);
    }

    #[test]
    fn test_write_alone_is_rejected() {
        let err = mode(&["--write", "A.cs"]).unwrap_err();
        assert!(err.to_string().contains("--write requires --fix or --diff"));
    }
}
