//! taglint CLI - checks map feature tags against combination rules

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use glob::glob;
use log::debug;
use std::path::PathBuf;
use taglint::config::{CliOverrides, ColorMode, Config, OutputFormat};
use taglint::feature::{load_features, Feature};
use taglint::output::{JsonFormatter, OutputFormatter, TextFormatter};
use taglint::{ClassId, Engine, RuleClass};

#[derive(Parser)]
#[command(
    name = "taglint",
    version,
    about = "Map feature tag linter",
    long_about = "Checks the tags of points, lines and relations against tag combination rules."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Feature files or glob patterns to check
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    format: Option<Format>,

    /// Country the data belongs to (e.g. FR, US-TX)
    #[arg(long, global = true)]
    country: Option<String>,

    /// Additional rule files (YAML or JSON)
    #[arg(long = "rules", global = true)]
    rule_files: Vec<PathBuf>,

    /// Do not load the built-in rules
    #[arg(long, global = true)]
    no_builtin: bool,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Disable specific classes (comma-separated)
    #[arg(long, value_delimiter = ',', global = true)]
    disable: Vec<ClassId>,

    /// Only enable specific classes (comma-separated)
    #[arg(long, value_delimiter = ',', global = true)]
    only: Vec<ClassId>,

    /// Show class details with each issue
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check feature files (default)
    Check {
        /// Feature files or glob patterns
        files: Vec<String>,
    },

    /// List the loaded classes
    ListClasses,

    /// Run the match / no-match assertions attached to every rule
    SelfCheck,

    /// Show details for a class
    Explain {
        /// Class id (e.g. 30320)
        class: ClassId,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;

    let colorless = cli.no_color || config.output.color == ColorMode::Never;
    if colorless {
        colored::control::set_override(false);
    } else if config.output.color == ColorMode::Always {
        colored::control::set_override(true);
    }

    let engine = Engine::from_config(&config).context("failed to set up rules")?;

    match &cli.command {
        Some(Commands::ListClasses) => {
            list_classes(&engine);
            Ok(0)
        }
        Some(Commands::Explain { class }) => explain(&engine, *class),
        Some(Commands::SelfCheck) => Ok(self_check(&engine)),
        Some(Commands::Check { files }) => check(&engine, &config, files, colorless),
        None => check(&engine, &config, &cli.files, colorless),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::load_default().context("failed to load config")?,
    };

    config.merge_cli(CliOverrides {
        format: cli.format.map(|f| match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }),
        verbose: cli.verbose.then_some(true),
        jobs: cli.jobs,
        country: cli.country.clone(),
        rule_files: cli.rule_files.clone(),
        no_builtin: cli.no_builtin,
        disabled: cli.disable.clone(),
        only: cli.only.clone(),
    });

    Ok(config)
}

fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let paths = glob(pattern).with_context(|| format!("invalid pattern '{}'", pattern))?;
        for entry in paths.flatten() {
            if entry.is_file() {
                files.push(entry);
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn check(engine: &Engine, config: &Config, patterns: &[String], colorless: bool) -> Result<i32> {
    let files = expand_patterns(patterns)?;
    if files.is_empty() {
        bail!("no feature files found");
    }

    let mut features: Vec<Feature> = Vec::new();
    for path in &files {
        let loaded =
            load_features(path).with_context(|| format!("failed to read {}", path.display()))?;
        debug!("{}: {} features", path.display(), loaded.len());
        features.extend(loaded);
    }

    let result = engine.evaluate_all(&features);

    let formatter: Box<dyn OutputFormatter> = match config.output.format {
        OutputFormat::Text => {
            let mut text = TextFormatter::new().verbose(config.output.verbose);
            text.show_stats = config.output.statistics;
            if colorless {
                text = text.without_color();
            }
            Box::new(text)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
    };

    print!("{}", formatter.format(&result, engine.classes()));
    if config.output.format == OutputFormat::Json {
        println!();
    }

    Ok(result.exit_code())
}

fn list_classes(engine: &Engine) {
    for class in engine.classes().iter() {
        let rules = engine
            .rules()
            .iter()
            .filter(|r| r.class() == class.id)
            .count();
        println!(
            "{:>8}  {:<8} {:>2} rule(s)  {}",
            class.id.to_string().cyan(),
            class.severity().to_string(),
            rules,
            title_label(class)
        );
    }
    println!("\n{} classes, {} rules", engine.classes().len(), engine.rules().len());
}

/// Titles with capture references are shown as templates, not as final text
fn title_label(class: &RuleClass) -> String {
    if class.title_is_template() {
        format!("template: {}", class.title)
    } else {
        class.title.clone()
    }
}

fn explain(engine: &Engine, id: ClassId) -> Result<i32> {
    let Some(class) = engine.classes().get(id) else {
        bail!("unknown class {}", id);
    };

    println!("{} {}", id.to_string().cyan().bold(), title_label(class).bold());
    println!("  item:     {}", class.item);
    println!("  severity: {}", class.severity());
    if !class.tags.is_empty() {
        println!("  tags:     {}", class.tags.join(", "));
    }
    if let Some(detail) = &class.detail {
        println!("\n{}", detail);
    }
    if let Some(trap) = &class.trap {
        println!("\n{} {}", "Trap:".bold(), trap);
    }
    if let Some(fix) = &class.fix {
        println!("\n{} {}", "Fix:".bold(), fix);
    }
    if let Some(resource) = &class.resource {
        println!("\n{} {}", "See:".bold(), resource);
    }

    let rules: Vec<_> = engine.rules().iter().filter(|r| r.class() == id).collect();
    if !rules.is_empty() {
        println!("\n{}", "Rules:".bold());
        for rule in rules {
            println!("  {}: {}", rule.name(), rule.selector());
        }
    }
    Ok(0)
}

fn self_check(engine: &Engine) -> i32 {
    let failures = engine.self_check();
    for failure in &failures {
        println!("{}: {}", "failed".red().bold(), failure);
    }

    let total: usize = engine.rules().iter().map(|r| r.assertions().len()).sum();
    if failures.is_empty() {
        println!("{} assertions passed", total);
        0
    } else {
        println!("{} of {} assertions failed", failures.len(), total);
        1
    }
}
