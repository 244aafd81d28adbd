//! `stackfit`: detect a project's tech stack and rank matching rule templates.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and install logging.
//! 2. Load config ([`stackfit::config::load_config`]) and detection tables.
//! 3. Detect the tech stack of the project ([`stackfit::Detector`]).
//! 4. For `match`: load the rule catalogs and rank them.
//! 5. Render the requested report ([`report`]).
//! 6. Exit `0`, or `2` when `match` found nothing, or `1` when
//!    `catalog check` found missing paths.

mod cli;
mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use cli::{CatalogCommand, Cli, Command, DetectArgs, MatchArgs, ReportFormat};
use report::{DetectReport, MatchReport, MatchView};
use stackfit::catalog::{
    index_rules_dir, CachedCatalogLoader, Catalog, CatalogLoader, FileCatalogLoader,
    RemoteCatalogLoader,
};
use stackfit::config::{load_config, Config};
use stackfit::logging::{init_logging, LoggingConfig};
use stackfit::{DetectionTables, FsWorkspace, RuleSource, StackFit, TechProfile, Workspace};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_flags(cli.verbose, cli.quiet, cli.log_json));

    let code = match &cli.command {
        Command::Detect(args) => detect(&cli, args).await?,
        Command::Match(args) => run_match(&cli, args).await?,
        Command::Catalog(command) => run_catalog(command).await?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn resolve_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn build_context(path: &Path, config: &Config) -> Result<(StackFit, FsWorkspace)> {
    let tables = DetectionTables::load(config.detection.tables_dir.as_deref())
        .context("Failed to load detection tables")?;
    let workspace = FsWorkspace::new(path)?
        .with_excluded_dirs(config.detection.excluded_dirs.clone())
        .with_limits(config.detection.max_walk_entries, config.detection.max_depth)
        .respect_gitignore(config.detection.respect_gitignore);
    Ok((StackFit::new(Arc::new(tables), config.detection.options()), workspace))
}

async fn run_detection(
    stackfit: &StackFit,
    workspace: FsWorkspace,
    concurrent: bool,
    show_progress: bool,
) -> TechProfile {
    let pb = spinner(show_progress, "Detecting tech stack...");
    let profile = if concurrent {
        let workspace: Arc<dyn Workspace> = Arc::new(workspace);
        stackfit.detector().detect_concurrent(workspace).await
    } else {
        stackfit.detect(&workspace)
    };
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    profile
}

async fn detect(cli: &Cli, args: &DetectArgs) -> Result<i32> {
    let path = resolve_path(&args.path);
    let config = load_config(&path, cli.config.as_deref())?;
    let (stackfit, workspace) = build_context(&path, &config)?;

    let show_progress = !cli.quiet && args.report == ReportFormat::Terminal;
    let concurrent = args.concurrent || config.detection.concurrent;
    let profile = run_detection(&stackfit, workspace, concurrent, show_progress).await;
    let breakdown = stackfit.detector().scorer().breakdown(&profile);

    match args.report {
        ReportFormat::Terminal => {
            report::terminal::render_profile(&profile, &breakdown, &path, cli.verbose, cli.quiet)
        }
        ReportFormat::Json => {
            let report = DetectReport {
                path: &path,
                profile: &profile,
                breakdown: &breakdown,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(0)
}

async fn run_match(cli: &Cli, args: &MatchArgs) -> Result<i32> {
    let path = resolve_path(&args.path);
    let config = load_config(&path, cli.config.as_deref())?;
    let (mut stackfit, workspace) = build_context(&path, &config)?;

    let mut options = config.matching.options();
    if let Some(limit) = args.limit {
        options.limit = limit;
    }
    if let Some(min_score) = args.min_score {
        options.min_score = min_score;
    }
    options.include_builtin &= !args.no_builtin;
    options.include_local &= !args.no_local;
    let remote = args.remote.clone().or_else(|| config.catalog.remote.clone());
    options.include_remote |= args.remote.is_some();
    let lang = args.lang.clone().unwrap_or_else(|| config.matching.lang.clone());
    let show_progress = !cli.quiet && args.report == ReportFormat::Terminal;

    if options.include_builtin {
        stackfit = stackfit.with_builtin_rules()?;
    }

    if options.include_local {
        if let Some(file) = &args.catalog {
            // an explicitly requested catalog must load
            stackfit
                .registry_mut()
                .load(RuleSource::Local, &FileCatalogLoader::new(file))
                .await?;
        } else if let Some(file) = config.catalog.local_path(&path) {
            // a configured catalog that fails to load is logged by the registry
            let _ = stackfit
                .registry_mut()
                .load(RuleSource::Local, &FileCatalogLoader::new(file))
                .await;
        }
    }

    if options.include_remote {
        if let Some(url) = remote {
            let pb = spinner(show_progress, "Fetching remote rules...");
            // one fetch per process; the TTL only pays off in hosts that keep
            // the loader around between matches
            let loader = CachedCatalogLoader::new(
                RemoteCatalogLoader::new(url),
                Duration::from_secs(config.catalog.cache_ttl_secs),
            );
            let result = stackfit.registry_mut().load(RuleSource::Remote, &loader).await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            if let Err(err) = result {
                if !err.is_transient() {
                    return Err(err.into());
                }
            }
        } else {
            warn!("Remote rules requested but no remote catalog URL is configured");
        }
    }

    let concurrent = args.concurrent || config.detection.concurrent;
    let profile = run_detection(&stackfit, workspace, concurrent, show_progress).await;
    let matches = stackfit.find_matches(&profile, &options)?;
    let fallback = if matches.is_empty() {
        stackfit.registry().basic_rule().map(|r| r.id.as_str())
    } else {
        None
    };

    match args.report {
        ReportFormat::Terminal => report::terminal::render_matches(
            &matches, &profile, &lang, fallback, &path, cli.quiet,
        ),
        ReportFormat::Json => {
            let report = MatchReport {
                path: &path,
                profile: &profile,
                matches: matches.iter().map(|m| MatchView::new(m, &lang)).collect(),
                fallback,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(if matches.is_empty() { 2 } else { 0 })
}

async fn load_catalog_file(path: &Path) -> Result<Catalog> {
    Ok(FileCatalogLoader::new(path).load().await?)
}

fn write_catalog(catalog: &Catalog, output: Option<&Path>) -> Result<()> {
    let json = catalog.to_json_pretty()?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

async fn run_catalog(command: &CatalogCommand) -> Result<i32> {
    match command {
        CatalogCommand::Index {
            rules_dir,
            existing,
            output,
        } => {
            let existing = match existing {
                Some(path) => Some(load_catalog_file(path).await?),
                None => None,
            };
            let report = index_rules_dir(rules_dir, existing)?;
            eprintln!(
                "  {} {} new rules, {} total",
                "→".cyan(),
                report.added.len(),
                report.catalog.rules.len()
            );
            write_catalog(&report.catalog, output.as_deref())?;
            Ok(0)
        }
        CatalogCommand::Check { catalog, base_dir } => {
            let loaded = load_catalog_file(catalog).await?;
            let base = match base_dir {
                Some(dir) => dir.clone(),
                None => catalog
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            };
            let missing = loaded.missing_paths(&base);
            if missing.is_empty() {
                println!(
                    "{} All paths of {} rules exist",
                    "✓".green(),
                    loaded.rules.len()
                );
                return Ok(0);
            }
            for m in &missing {
                match &m.file {
                    Some(file) => println!(
                        "{} rule '{}': file {} not found ({})",
                        "✗".red(),
                        m.rule_id,
                        file,
                        m.expected.display()
                    ),
                    None => println!(
                        "{} rule '{}': path not found ({})",
                        "✗".red(),
                        m.rule_id,
                        m.expected.display()
                    ),
                }
            }
            Ok(1)
        }
        CatalogCommand::I18n {
            catalog,
            langs,
            output,
        } => {
            let mut loaded = load_catalog_file(catalog).await?;
            loaded.to_multilingual(langs);
            write_catalog(&loaded, output.as_deref())?;
            Ok(0)
        }
    }
}
