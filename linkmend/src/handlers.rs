use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use linkmend_core::mutation::{DocumentStore, FsStore, MutationResult};
use linkmend_core::report::{
    GoalCheck, GraphReport, ReportFormat, generate_dot_report, generate_goal_report, generate_html_report,
    generate_json_report, generate_text_report, goal_check, load_graph_report, save_report,
};
use linkmend_core::run::{AnalysisRun, HUBS_PURPOSE, LINK_PAGE_PURPOSE, LINKS_PURPOSE, ORPHANS_PURPOSE};
use linkmend_core::{
    BackupRecord, BackupStore, Config, FailureRecord, GoalsConfig, RunContext, ThemeInjector, connect_orphans,
    execute_analysis, fix_links, link_page, optimize_hubs, theme_enabled,
};
use linkmend_scanner::scanner::ProgressCallback;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const REPORT_FILE: &str = "report.json";

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: bool,
    pub config: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        // Global flags propagate down, so the subcommand sees them wherever they were typed.
        let matches = matches.subcommand().map(|(_, sub)| sub).unwrap_or(matches);
        Self {
            quiet: matches.get_flag("quiet"),
            verbose: matches.get_flag("verbose"),
            config: matches.get_one::<String>("config").map(|c| expand_path(c)),
        }
    }

    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the flags.
pub fn init_tracing(globals: &GlobalOptions) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(globals.log_level()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Flatten repeated, comma-separated `--only` values.
pub fn parse_only<'a>(values: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    values
        .into_iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn render_graph_report(report: &GraphReport, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Text => generate_text_report(report),
        ReportFormat::Json => generate_json_report(report)?,
        ReportFormat::Html => generate_html_report(report),
    })
}

/// Measure a report saved by an earlier `analyze --format json` run.
pub fn saved_goal_check(path: &Path, goals: &GoalsConfig) -> Result<GoalCheck> {
    let report = load_graph_report(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(goal_check(&report, goals))
}

/// Backup records of one mutation purpose, read from its manifest.
pub fn backup_records(ctx: &RunContext, purpose: &str) -> Result<Vec<BackupRecord>> {
    let dir = ctx.config.backup_dir(&ctx.root).join(purpose);
    BackupStore::load_manifest(&dir).with_context(|| format!("reading backups in {}", dir.display()))
}

/// Copy every backed-up document over its original. Returns how many were restored.
pub fn restore_backups(store: &dyn DocumentStore, records: &[BackupRecord]) -> Result<usize> {
    let mut restored = 0;
    for record in records {
        let Some(backup) = &record.backup_file else {
            continue;
        };
        let bytes = store.read(backup).with_context(|| format!("reading {}", backup.display()))?;
        store
            .write(&record.original_path, &bytes)
            .with_context(|| format!("restoring {}", record.original_path.display()))?;
        restored += 1;
    }
    Ok(restored)
}

/// Where a mutation run's audit report goes: the explicit path, else the
/// run's backup directory. Dry runs only write when asked to.
pub fn audit_report_path(ctx: &RunContext, purpose: &str, explicit: Option<&PathBuf>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.clone()),
        None if ctx.dry_run => None,
        None => Some(ctx.config.backup_dir(&ctx.root).join(purpose).join(REPORT_FILE)),
    }
}

fn root_from(args: &ArgMatches) -> PathBuf {
    args.get_one::<String>("ROOT")
        .map(|r| expand_path(r))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn context(args: &ArgMatches, globals: &GlobalOptions) -> Result<RunContext> {
    let root = root_from(args);
    let config = Config::load(&root, globals.config.as_deref())
        .with_context(|| format!("loading config for {}", root.display()))?;
    let dry_run = args.try_get_one::<bool>("dry-run").ok().flatten().copied().unwrap_or(false);
    Ok(RunContext::new(&root, config).with_dry_run(dry_run))
}

fn spinner(globals: &GlobalOptions, message: &str) -> Result<ProgressBar> {
    let bar = if globals.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    bar.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message(message.to_string());
    Ok(bar)
}

async fn analyze_with_progress(ctx: &RunContext, args: &ArgMatches, globals: &GlobalOptions) -> Result<AnalysisRun> {
    let threads = args.get_one::<usize>("threads").copied().unwrap_or(8);
    let bar = spinner(globals, &format!("Scanning {}", ctx.root.display()))?;

    let progress_bar = bar.clone();
    let progress: ProgressCallback = Arc::new(move |worker_id: usize, path: String| {
        progress_bar.set_message(format!("worker {}: {}", worker_id, path));
    });

    let outcome = execute_analysis(ctx, threads, Some(progress)).await;
    bar.finish_and_clear();
    Ok(outcome?)
}

fn print_failures(failures: &[FailureRecord]) {
    for failure in failures {
        eprintln!(
            "  {} [{}] {}: {}",
            "⚠".yellow(),
            failure.kind,
            failure.document,
            failure.message
        );
    }
}

fn print_mutations(results: &BTreeMap<String, MutationResult>, dry_run: bool) {
    for (document, result) in results {
        let (mark, note) = match (&result.error, result.changed) {
            (Some(_), _) => ("✗".red(), "failed".red()),
            (None, true) if dry_run => ("~".cyan(), "would change".cyan()),
            (None, true) => ("✓".green(), "updated".green()),
            (None, false) => ("·".dimmed(), "unchanged".dimmed()),
        };
        println!("  {} {} {}", mark, document, note);
    }
}

fn write_audit<T: serde::Serialize>(report: &T, path: Option<PathBuf>, quiet: bool) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    save_report(&generate_json_report(report)?, &path)
        .with_context(|| format!("writing {}", path.display()))?;
    if !quiet {
        println!("Report saved to {}", path.display().to_string().bold());
    }
    Ok(())
}

pub fn handle_init(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let dir = args
        .get_one::<String>("DIR")
        .map(|d| expand_path(d))
        .unwrap_or_else(|| PathBuf::from("."));
    let force = args.get_flag("force");

    let path = Config::write_default(&dir, force)?;
    if !globals.quiet {
        println!("{} Wrote {}", "✓".green().bold(), path.display());
    }
    Ok(())
}

pub async fn handle_analyze(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let ctx = context(args, globals)?;
    let format_name = args.get_one::<String>("format").map(String::as_str).unwrap_or("text");
    let format = ReportFormat::from_str(format_name).ok_or_else(|| anyhow!("unknown format {}", format_name))?;

    let run = analyze_with_progress(&ctx, args, globals).await?;
    let rendered = render_graph_report(&run.report, format)?;

    if let Some(path) = args.get_one::<PathBuf>("dot") {
        let mut highlight = run.hubs(&ctx.config);
        highlight.extend(ctx.config.canonical_pages.keys().cloned());
        save_report(&generate_dot_report(&run.graph, &highlight), path)
            .with_context(|| format!("writing {}", path.display()))?;
        if !globals.quiet {
            eprintln!("{} Graph written to {}", "✓".green().bold(), path.display());
        }
    }

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            save_report(&rendered, path).with_context(|| format!("writing {}", path.display()))?;
            if !globals.quiet {
                println!(
                    "{} Analyzed {} pages, report saved to {}",
                    "✓".green().bold(),
                    run.report.metadata.total_pages,
                    path.display()
                );
            }
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

pub fn handle_fix_links(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let ctx = context(args, globals)?;
    let only = args
        .get_many::<String>("only")
        .map(parse_only)
        .unwrap_or_default();

    let report = fix_links(&ctx, &only)?;

    if !globals.quiet {
        let verb = if ctx.dry_run { "Would correct" } else { "Corrected" };
        println!(
            "{} {} {} links in {} documents",
            "✓".green().bold(),
            verb,
            report.total_corrections,
            report.total_documents
        );
        for item in &report.ambiguous {
            println!(
                "  {} {} in {}: {}",
                "?".yellow().bold(),
                item.href,
                item.document,
                item.candidates.join(", ")
            );
        }
        for item in &report.unresolved {
            println!("  {} {} in {}", "✗".red(), item.href, item.document);
        }
    }
    print_failures(&report.failures);

    write_audit(&report, audit_report_path(&ctx, LINKS_PURPOSE, args.get_one::<PathBuf>("output")), globals.quiet)
}

pub async fn handle_connect_orphans(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let ctx = context(args, globals)?;
    let run = analyze_with_progress(&ctx, args, globals).await?;
    let report = connect_orphans(&ctx, &run);

    if !globals.quiet {
        println!(
            "{} {} orphans, {} hubs touched",
            "✓".green().bold(),
            report.total_orphans,
            report.hubs_touched
        );
        for (category, count) in report.per_category_counts.iter().filter(|(_, c)| **c > 0) {
            println!("  {:<24} {}", category.label(), count);
        }
        print_mutations(&report.details_by_document, ctx.dry_run);
    }
    print_failures(&report.failures);

    write_audit(&report, audit_report_path(&ctx, ORPHANS_PURPOSE, args.get_one::<PathBuf>("output")), globals.quiet)
}

pub async fn handle_link_page(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let ctx = context(args, globals)?;
    let target = args
        .get_one::<String>("target")
        .ok_or_else(|| anyhow!("--target is required"))?;
    let label = args.get_one::<String>("label").map(String::as_str);

    let run = analyze_with_progress(&ctx, args, globals).await?;
    let report = link_page(&ctx, &run, target, label)?;

    if !globals.quiet {
        println!(
            "{} Linked {} from {} hubs",
            "✓".green().bold(),
            report.target,
            report.hubs_touched
        );
        print_mutations(&report.details_by_document, ctx.dry_run);
    }
    print_failures(&report.failures);

    write_audit(&report, audit_report_path(&ctx, LINK_PAGE_PURPOSE, args.get_one::<PathBuf>("output")), globals.quiet)
}

pub async fn handle_optimize_hubs(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let ctx = context(args, globals)?;
    let run = analyze_with_progress(&ctx, args, globals).await?;
    let report = optimize_hubs(&ctx, &run);

    if !globals.quiet {
        println!(
            "{} {} hubs over {} links, {} regrouped",
            "✓".green().bold(),
            report.hubs_analyzed,
            report.link_limit,
            report.hubs_touched
        );
        print_mutations(&report.details_by_document, ctx.dry_run);
    }
    print_failures(&report.failures);

    write_audit(&report, audit_report_path(&ctx, HUBS_PURPOSE, args.get_one::<PathBuf>("output")), globals.quiet)
}

pub async fn handle_goals(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let ctx = context(args, globals)?;
    let check = match args.get_one::<PathBuf>("report") {
        Some(path) => saved_goal_check(path, &ctx.config.goals)?,
        None => {
            let run = analyze_with_progress(&ctx, args, globals).await?;
            goal_check(&run.report, &ctx.config.goals)
        }
    };

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            save_report(&generate_json_report(&check)?, path).with_context(|| format!("writing {}", path.display()))?;
            if !globals.quiet {
                println!("{} {}/{} goals met", "✓".green().bold(), check.goals_met, check.goals_total);
            }
        }
        None => print!("{}", generate_goal_report(&check)),
    }
    Ok(())
}

pub fn handle_backups(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let ctx = context(args, globals)?;
    let purpose = args.get_one::<String>("purpose").map(String::as_str).unwrap_or(LINKS_PURPOSE);
    let records = backup_records(&ctx, purpose)?;

    if !globals.quiet {
        for record in &records {
            let backup = record
                .backup_file
                .as_ref()
                .map(|b| b.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {} {} {}", record.run_id.dimmed(), record.original_path.display(), backup);
        }
    }

    if args.get_flag("restore") {
        let restored = restore_backups(&FsStore, &records)?;
        if !globals.quiet {
            println!("{} Restored {} documents", "✓".green().bold(), restored);
        }
    }
    Ok(())
}

pub fn handle_theme(args: &ArgMatches, globals: &GlobalOptions) -> Result<()> {
    let file = args
        .get_one::<PathBuf>("FILE")
        .ok_or_else(|| anyhow!("a document is required"))?;
    let root = file.parent().unwrap_or(Path::new("."));
    let config = Config::load(root, globals.config.as_deref())?;

    let html = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let enabled = theme_enabled(args.get_one::<String>("query").map(String::as_str));
    let output = ThemeInjector::new(config.theme)?.render(&html, enabled);

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            save_report(&output, path).with_context(|| format!("writing {}", path.display()))?;
            if !globals.quiet {
                println!("{} Themed document written to {}", "✓".green().bold(), path.display());
            }
        }
        None => print!("{}", output),
    }
    Ok(())
}
