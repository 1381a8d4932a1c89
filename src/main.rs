//! jsf2-migrate CLI - Migration assistant for JSF 2 Facelets templates

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use jsf2_migrate::config::{Config, ReportFormat};
use jsf2_migrate::executor::{Executor, ExecutorOptions};
use jsf2_migrate::finding::{BatchReport, Severity};
use jsf2_migrate::namespace::NamespaceCatalog;
use jsf2_migrate::overrides::OverrideIndex;
use jsf2_migrate::report::{JsonFormatter, ReportFormatter, TextFormatter};
use jsf2_migrate::rules::{builtin_rules, Rule, RuleKind, TemplateSet};
use jsf2_migrate::walker;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "jsf2-migrate",
    version,
    about = "Migration assistant for JSF 1.2 / RichFaces 3 templates",
    long_about = "Analyzes the Facelets templates of a project, reports JSF 1.2 / RichFaces 3 \
                  constructs and optionally writes JSF 2 / RichFaces 4 versions next to them.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Project directory (a directory containing projects with --recursive)
    path: Option<PathBuf>,

    /// Write a migrated copy (<file>.migrated) of every template with findings
    #[arg(short, long)]
    migrate: bool,

    /// Also reformat the original templates, so they diff cleanly against the migrated copies
    #[arg(long, requires = "migrate")]
    format: bool,

    /// Process every project found below the path
    #[arg(short, long)]
    recursive: bool,

    /// Report file (default: report.txt in the project directory)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the report as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List of templates shipped by the platform
    #[arg(long)]
    templates: Option<PathBuf>,

    /// List of templates removed from the platform
    #[arg(long)]
    compat_templates: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the migration rules
    Rules,

    /// Analyze a single template and print its findings
    Check {
        /// Template file
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// List of templates shipped by the platform
        #[arg(long)]
        templates: Option<PathBuf>,

        /// List of templates removed from the platform
        #[arg(long)]
        compat_templates: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Some(Commands::Rules) => {
            list_rules(builtin_rules());
            Ok(0)
        }
        Some(Commands::Check {
            file,
            json,
            templates,
            compat_templates,
        }) => check_file(file, *json, templates.as_deref(), compat_templates.as_deref()),
        None => {
            let path = cli
                .path
                .as_deref()
                .context("no project directory given (see --help)")?;
            if !path.is_dir() {
                bail!("{} is not a directory", path.display());
            }
            if cli.recursive {
                process_recursive(cli, path)?;
            } else {
                process_project(cli, path)?;
            }
            Ok(0)
        }
    }
}

fn load_config(cli: &Cli, project: &Path) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => Config::load_from_dir(project)
            .with_context(|| format!("invalid configuration in {}", project.display()))?
            .unwrap_or_default(),
    };

    config.merge_cli(
        cli.migrate,
        cli.format,
        cli.report.clone(),
        cli.json.then_some(ReportFormat::Json),
        cli.templates.clone(),
        cli.compat_templates.clone(),
    );
    Ok(config)
}

fn process_recursive(cli: &Cli, start: &Path) -> Result<()> {
    let config = load_config(cli, start)?;
    let projects = walker::find_projects(start, &config.files.template_root);
    if projects.is_empty() {
        println!("No project found below {}", start.display());
        return Ok(());
    }

    for project in &projects {
        if let Err(e) = process_project(cli, project) {
            error!("{}: {:#}", project.display(), e);
        }
    }
    Ok(())
}

fn process_project(cli: &Cli, project: &Path) -> Result<BatchReport> {
    let start = Instant::now();
    let config = load_config(cli, project)?;

    if !walker::is_project_dir(project, &config.files.template_root) {
        bail!(
            "{} is not a valid project directory (no {})",
            project.display(),
            config.files.template_root.display()
        );
    }

    let template_root = walker::project_template_root(project, &config.files.template_root);
    let files = walker::collect_templates(&template_root, &config.files.extension);
    let overrides = OverrideIndex::load(
        config.templates.current.as_deref(),
        config.templates.compat.as_deref(),
    );
    if overrides.is_empty() {
        info!("no platform template list, override checks disabled");
    }

    let rules = builtin_rules();
    let executor = Executor::new(rules, NamespaceCatalog::builtin(), ExecutorOptions::from(&config))
        .with_overrides(overrides);
    let batch = executor.run(&files);

    let report_path = if config.report.file.is_absolute() {
        config.report.file.clone()
    } else {
        project.join(&config.report.file)
    };
    let content = match config.report.format {
        ReportFormat::Text => TextFormatter::new(rules)
            .with_base(&template_root)
            .format(&batch),
        ReportFormat::Json => JsonFormatter::new(rules).pretty().format(&batch),
    };
    fs::write(&report_path, content)
        .with_context(|| format!("failed to write report {}", report_path.display()))?;

    println!("{}", project.display().to_string().bold());
    print!(
        "{}",
        TextFormatter::new(rules)
            .with_color(!cli.no_color)
            .format_summary(&batch)
    );
    println!("Report written to {}", report_path.display());
    println!();

    info!(
        "project {} analyzed in {:.2?}",
        project.display(),
        start.elapsed()
    );
    Ok(batch)
}

fn check_file(
    file: &Path,
    json: bool,
    templates: Option<&Path>,
    compat_templates: Option<&Path>,
) -> Result<i32> {
    if !file.is_file() {
        bail!("{} is not a file", file.display());
    }

    let rules = builtin_rules();
    let executor = Executor::new(rules, NamespaceCatalog::builtin(), ExecutorOptions::default())
        .with_overrides(OverrideIndex::load(templates, compat_templates));

    let mut batch = BatchReport::default();
    batch.push(executor.process_file(file).into_report());

    if json {
        println!("{}", JsonFormatter::new(rules).pretty().format(&batch));
    } else {
        let formatter = TextFormatter::new(rules).with_color(true);
        for report in &batch.files {
            print!("{}", formatter.format_file(report));
        }
    }
    Ok(batch.exit_code())
}

fn list_rules(rules: &[Rule]) {
    println!("{}", "Migration rules:".bold());
    println!();
    for rule in rules {
        let source = match rule.kind {
            RuleKind::Pattern { pattern, .. } => pattern.to_string(),
            RuleKind::NamespaceEnumeration => "(namespace declarations)".to_string(),
            RuleKind::Override(TemplateSet::Current) => "(platform templates)".to_string(),
            RuleKind::Override(TemplateSet::Compat) => "(removed platform templates)".to_string(),
            RuleKind::Injected => "(reported by the pipeline)".to_string(),
        };
        let severity = format!("{:<7}", rule.severity.to_string());
        let severity = match rule.severity {
            Severity::Error => severity.red(),
            Severity::Warning => severity.yellow(),
            Severity::Info => severity.blue(),
        };
        let fix = match rule.replacement() {
            Some(name) if rule.auto_fixable => format!(" -> {}", name),
            _ if rule.auto_fixable => " (auto-fix)".to_string(),
            _ => String::new(),
        };
        println!("  {:<26} {} {}{}", rule.id, severity, source, fix);
    }
}
