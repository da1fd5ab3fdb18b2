use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use layerlint_core::config::{Config, CONFIG_FILE_NAME};
use layerlint_core::pipeline::{AnalysisPipeline, FullAnalysis};
use layerlint_core::rule_spec::{default_rules_yaml, RuleSpec};
use layerlint_core::types::Severity;

use layerlint_python::PythonExtractor;
use layerlint_report::{json, text, tree};

#[derive(Parser)]
#[command(name = "layerlint")]
#[command(about = "Check a Python codebase against layering, cycle, size and pattern rules")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all rules and exit with code 0 (pass) or 1 (fail)
    Check {
        /// Path to the project root
        path: PathBuf,
        /// Rule document (defaults to the `rules` entry of the config)
        #[arg(short, long)]
        rules: Option<PathBuf>,
        /// Config file path (defaults to .layerlint.toml in the project or an ancestor)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Run only these validation checks (repeatable)
        #[arg(long = "check", value_name = "NAME")]
        checks: Vec<String>,
        /// Minimum severity to cause failure (defaults to the config's fail_on)
        #[arg(long)]
        fail_on: Option<String>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Print a project summary, dependency tree and all findings
    Analyze {
        /// Path to the project root
        path: PathBuf,
        #[arg(short, long)]
        rules: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Depth of the dependency tree
        #[arg(long, default_value_t = 3)]
        max_depth: usize,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show what a module depends on and what depends on it
    Deps {
        /// Path to the project root
        path: PathBuf,
        /// Module as a relative path or dotted name
        module: String,
        #[arg(short, long)]
        rules: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 3)]
        max_depth: usize,
    },
    /// Create a default .layerlint.toml and starter rule document
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            path,
            rules,
            config,
            checks,
            fail_on,
            format,
        } => cmd_check(
            &path,
            rules.as_deref(),
            config.as_deref(),
            &checks,
            fail_on.as_deref(),
            format,
        ),
        Commands::Analyze {
            path,
            rules,
            config,
            max_depth,
            format,
        } => cmd_analyze(&path, rules.as_deref(), config.as_deref(), max_depth, format),
        Commands::Deps {
            path,
            module,
            rules,
            config,
            max_depth,
        } => cmd_deps(&path, &module, rules.as_deref(), config.as_deref(), max_depth),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_check(
    path: &Path,
    rules_path: Option<&Path>,
    config_path: Option<&Path>,
    checks: &[String],
    fail_on: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = build_pipeline(path, rules_path, config_path, checks)?;
    let fail_on: Severity = match fail_on {
        Some(s) => s.parse()?,
        None => pipeline.config().rules.fail_on,
    };
    let analysis = run_analysis(&pipeline, path)?;

    let (report, passed) = match format {
        OutputFormat::Text => text::format_check(&analysis.result, fail_on),
        OutputFormat::Json => json::format_check(&analysis.result, fail_on, false)?,
    };
    println!("{report}");
    if !passed {
        process::exit(1);
    }
    Ok(())
}

fn cmd_analyze(
    path: &Path,
    rules_path: Option<&Path>,
    config_path: Option<&Path>,
    max_depth: usize,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = build_pipeline(path, rules_path, config_path, &[])?;
    let analysis = run_analysis(&pipeline, path)?;

    match format {
        OutputFormat::Text => {
            print!("{}", text::format_summary(&analysis.result));
            println!("\nDependency Tree\n{}", "-".repeat(40));
            print!("{}", tree::format_dependency_forest(&analysis.graph, max_depth));
            print!("{}", text::format_report(&analysis.result));
        }
        OutputFormat::Json => println!("{}", json::format_report(&analysis.result, false)?),
    }
    Ok(())
}

fn cmd_deps(
    path: &Path,
    module: &str,
    rules_path: Option<&Path>,
    config_path: Option<&Path>,
    max_depth: usize,
) -> Result<()> {
    let pipeline = build_pipeline(path, rules_path, config_path, &[])?;
    let analysis = run_analysis(&pipeline, path)?;

    let Some(found) = tree::find_module(&analysis.graph, module) else {
        bail!("module '{module}' not found in {}", path.display());
    };
    print!("{}", tree::format_dependency_tree(&analysis.graph, found, max_depth));
    println!();
    print!("{}", tree::format_dependents(&analysis.graph, found));
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let config_target = PathBuf::from(CONFIG_FILE_NAME);
    let rules_target = Config::default().project.rules;

    for target in [&config_target, &rules_target] {
        if target.exists() && !force {
            bail!("{} already exists. Use --force to overwrite.", target.display());
        }
    }

    std::fs::write(&config_target, Config::default_toml())
        .with_context(|| format!("failed to write {}", config_target.display()))?;
    std::fs::write(&rules_target, default_rules_yaml())
        .with_context(|| format!("failed to write {}", rules_target.display()))?;
    println!(
        "Created {} and {} with default configuration.",
        config_target.display(),
        rules_target.display()
    );
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(project_path)),
    }
}

fn build_pipeline(
    project_path: &Path,
    rules_path: Option<&Path>,
    config_path: Option<&Path>,
    checks: &[String],
) -> Result<AnalysisPipeline> {
    let config = load_config(project_path, config_path)?;

    let rules_path = rules_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.rules_path(project_path));
    let mut spec = RuleSpec::load(&rules_path)
        .with_context(|| format!("failed to load rules from '{}'", rules_path.display()))?;

    let selected = if checks.is_empty() {
        config.rules.checks.clone()
    } else {
        checks.to_vec()
    };
    let available = spec.check_names().join(", ");
    for name in spec.retain_checks(&selected) {
        tracing::warn!(
            "Unknown validation check '{name}' selected; ignoring (available: {available})"
        );
    }

    let extractor = PythonExtractor::new().context("failed to initialize Python extractor")?;
    Ok(AnalysisPipeline::new(vec![Box::new(extractor)], spec, config))
}

fn run_analysis(pipeline: &AnalysisPipeline, project_path: &Path) -> Result<FullAnalysis> {
    pipeline
        .analyze(project_path)
        .with_context(|| format!("failed to analyze {}", project_path.display()))
}
