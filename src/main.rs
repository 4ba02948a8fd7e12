use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use sourcefix::config::{builtin_rules, load_rule_sets, RuleSetConfig};
use sourcefix::engine::{dry_run, run, RuleOutcome, RunConfig, RunReport};
use sourcefix::rule::RewriteRule;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sourcefix")]
#[command(about = "Apply ordered text rewrite rules to a source file", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply rewrite rules to the target file
    Apply {
        /// Rule file, or directory of .toml rule files (built-in rules if omitted)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// File to patch (overrides the target named by the rules)
        #[arg(short, long)]
        target: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying the file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Check whether the target still needs patching, without writing
    Check {
        /// Rule file, or directory of .toml rule files (built-in rules if omitted)
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// File to check (overrides the target named by the rules)
        #[arg(short, long)]
        target: Option<PathBuf>,
    },

    /// List rules in application order
    List {
        /// Rule file, or directory of .toml rule files (built-in rules if omitted)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            rules,
            target,
            dry_run,
            diff,
        } => cmd_apply(rules, target, dry_run, diff),

        Commands::Check { rules, target } => cmd_check(rules, target),

        Commands::List { rules } => cmd_list(rules),
    }
}

/// Helper: Load the rule set from `--rules`, falling back to the built-in stages.
fn load_rules(rules: Option<&Path>) -> Result<RuleSetConfig> {
    let config = match rules {
        Some(path) => load_rule_sets(path)?,
        None => builtin_rules().context("built-in rules are invalid")?,
    };
    Ok(config)
}

/// Resolve the target file
///
/// Priority order:
/// 1. Explicit --target flag
/// 2. `meta.target` of the loaded rules, relative to the current directory
fn resolve_target(cli_target: Option<PathBuf>, config: &RuleSetConfig) -> Result<PathBuf> {
    if let Some(path) = cli_target {
        return Ok(path);
    }

    if let Some(target) = config.meta.target.as_deref() {
        return Ok(PathBuf::from(target));
    }

    anyhow::bail!(
        "{}\n  {}",
        "No target file to patch.".red(),
        "Pass --target <PATH> or set `target` under [meta] in the rule file."
    )
}

fn build_run_config(rules: Option<PathBuf>, target: Option<PathBuf>) -> Result<RunConfig> {
    let config = load_rules(rules.as_deref())?;
    let target = resolve_target(target, &config)?;
    let run_config = RunConfig::from_rule_set(&config, target)?;

    println!("Target: {}", run_config.target_path.display());
    let name = if config.meta.name.is_empty() {
        "unnamed"
    } else {
        config.meta.name.as_str()
    };
    println!("Rules: {} ({} rules)", name, run_config.rules.len());
    println!();

    Ok(run_config)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_outcome(outcome: &RuleOutcome) {
    match outcome {
        RuleOutcome::Applied { .. } => println!("{} {}", "✓".green(), outcome),
        RuleOutcome::NoMatch { .. } => println!("{} {}", "⊙".yellow(), outcome),
    }
}

fn print_summary(report: &RunReport) {
    let applied = report.applied_count();
    let no_match = report.outcomes.len() - applied;
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", applied).green());
    println!("  {} no match", format!("{}", no_match).yellow());
}

fn cmd_apply(
    rules: Option<PathBuf>,
    target: Option<PathBuf>,
    dry_run_only: bool,
    show_diff: bool,
) -> Result<()> {
    let run_config = build_run_config(rules, target)?;

    let report = if dry_run_only {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
        dry_run(&run_config)?
    } else {
        run(&run_config)?
    };

    for outcome in &report.outcomes {
        print_outcome(outcome);
    }

    if show_diff && report.changed() {
        display_diff(&report.target, &report.original, &report.patched);
    }

    print_summary(&report);
    println!();

    if !report.written {
        println!(
            "{}",
            format!("Would patch {} (nothing written)", report.target.display()).cyan()
        );
    } else if report.changed() {
        println!(
            "{}",
            format!("✓ Patched {}", report.target.display()).green().bold()
        );
    } else {
        println!(
            "{}",
            format!("✓ {} already up to date", report.target.display())
                .green()
                .bold()
        );
    }

    Ok(())
}

fn cmd_check(rules: Option<PathBuf>, target: Option<PathBuf>) -> Result<()> {
    let run_config = build_run_config(rules, target)?;

    println!("{}", "Checking target...".bold());
    let report = dry_run(&run_config)?;

    let pending: Vec<&RuleOutcome> = report.applied().collect();
    if pending.is_empty() {
        println!(
            "{} {}: no rule fires",
            "✓".green(),
            "PATCHED".green().bold()
        );
        return Ok(());
    }

    eprintln!(
        "{} {} ({} rules would fire)",
        "✗".red(),
        "NOT PATCHED".red().bold(),
        pending.len()
    );
    for outcome in pending {
        eprintln!("  - {}", outcome);
    }

    std::process::exit(1);
}

fn cmd_list(rules: Option<PathBuf>) -> Result<()> {
    let config = load_rules(rules.as_deref())?;

    println!("{}", format!("Rule set: {}", config.meta.name).bold());
    if let Some(description) = &config.meta.description {
        println!("{}", description.dimmed());
    }
    if let Some(target) = &config.meta.target {
        println!("Target: {}", target);
    }
    println!();

    for (idx, def) in config.rules.iter().enumerate() {
        let rule = RewriteRule::from_definition(def)?;
        println!(
            "{:>3}. {} [{}]",
            idx + 1,
            rule.id,
            rule.rewrite.kind().cyan()
        );
        if let Some(description) = &rule.description {
            println!("     {}", description.dimmed());
        }
    }

    Ok(())
}
