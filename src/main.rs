use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use response_refiner::config::{load_all, load_from_path, RefinerConfig};
use response_refiner::{Category, ContextItem, Refiner, ResponseEnvelope, Rule};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "response-refiner")]
#[command(about = "Rule-based post-processing for generated responses", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refine a response envelope and print the result
    Refine {
        /// Envelope JSON file (stdin if not specified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// JSON array of context items
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Specific rule file (otherwise loads every *.toml in the rules dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory searched for rule files
        #[arg(long, default_value = "rules")]
        rules_dir: PathBuf,

        /// Treat the input as raw response text instead of an envelope
        #[arg(short, long)]
        text: bool,

        /// Show a unified diff and the applied rules instead of JSON
        #[arg(short, long)]
        diff: bool,
    },

    /// Print the languages detected in a response, one per line
    Detect {
        /// Response text file (stdin if not specified)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List the rule registry by category
    Rules {
        /// Specific rule file (otherwise loads every *.toml in the rules dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory searched for rule files
        #[arg(long, default_value = "rules")]
        rules_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Refine {
            input,
            context,
            config,
            rules_dir,
            text,
            diff,
        } => cmd_refine(input, context, config, &rules_dir, text, diff),

        Commands::Detect { input } => cmd_detect(input),

        Commands::Rules { config, rules_dir } => cmd_rules(config, &rules_dir),
    }
}

/// Helper: Discover all .toml rule files directly inside `rules_dir`, sorted.
///
/// A missing directory is not an error; the built-in table is used alone.
fn discover_rule_files(rules_dir: &Path) -> Result<Vec<PathBuf>> {
    if !rules_dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(rules_dir).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

fn load_config(config: Option<PathBuf>, rules_dir: &Path) -> Result<RefinerConfig> {
    let config = match config {
        Some(path) => load_from_path(&path)?,
        None => load_all(discover_rule_files(rules_dir)?)?,
    };
    Ok(config)
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn read_context(context: Option<&Path>) -> Result<Vec<ContextItem>> {
    let Some(path) = context else {
        return Ok(Vec::new());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read context from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid context items in {}", path.display()))
}

/// Helper: Show unified diff between original and refined content
fn display_diff(original: &str, refined: &str) {
    println!("{}", "--- response (original)".dimmed());
    println!("{}", "+++ response (refined)".dimmed());

    let diff = TextDiff::from_lines(original, refined);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
        if change.missing_newline() {
            println!();
        }
    }
}

fn cmd_refine(
    input: Option<PathBuf>,
    context: Option<PathBuf>,
    config: Option<PathBuf>,
    rules_dir: &Path,
    text: bool,
    show_diff: bool,
) -> Result<()> {
    let refiner = Refiner::from_config(&load_config(config, rules_dir)?);
    let context = read_context(context.as_deref())?;
    let raw = read_input(input.as_deref())?;

    let envelope = if text {
        ResponseEnvelope::new(raw)
    } else {
        serde_json::from_str(&raw).context("input is not a response envelope")?
    };

    let refined = refiner.refine(&envelope, &context);

    if !show_diff {
        println!("{}", serde_json::to_string_pretty(&refined)?);
        return Ok(());
    }

    let original = envelope.text().unwrap_or_default();
    let updated = refined.text().unwrap_or_default();
    if original == updated {
        println!("{}", "No changes.".dimmed());
    } else {
        display_diff(original, updated);
    }

    let applied = refined.applied_rules.unwrap_or_default();
    println!();
    println!("{}", "Summary:".bold());
    println!("  {} rules applied", format!("{}", applied.len()).green());
    for rule in &applied {
        println!("  {} {}", "✓".green(), rule);
    }

    Ok(())
}

fn cmd_detect(input: Option<PathBuf>) -> Result<()> {
    let raw = read_input(input.as_deref())?;
    let refiner = Refiner::builtin();
    for language in refiner.detector().detect(&raw) {
        println!("{language}");
    }
    Ok(())
}

fn cmd_rules(config: Option<PathBuf>, rules_dir: &Path) -> Result<()> {
    let refiner = Refiner::from_config(&load_config(config, rules_dir)?);
    let registry = refiner.registry();

    if !refiner.is_enabled() {
        println!("{}", "Refinement is disabled by configuration.".yellow());
    }

    for category in Category::ORDER {
        if registry.is_disabled(category) {
            println!("{} {}", category.to_string().bold(), "(disabled)".dimmed());
            continue;
        }
        println!("{}", category.to_string().bold());

        if category == Category::LanguageSpecific {
            for language in registry.languages() {
                println!("  {}", language.cyan());
                print_rules(registry.lookup_language(language), "    ");
            }
        } else {
            print_rules(registry.lookup(category), "  ");
        }
    }

    println!();
    println!("  {} rules registered", registry.rule_count());
    Ok(())
}

fn print_rules(rules: &[Rule], indent: &str) {
    for rule in rules {
        match rule.compile_error() {
            Some(error) => println!("{indent}{} {}", rule.description(), error.to_string().red()),
            None if rule.is_computed() => {
                println!("{indent}{} {}", rule.description(), "(computed)".dimmed())
            }
            None => println!("{indent}{}", rule.description()),
        }
    }
}
