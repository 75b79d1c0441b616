//! Per-run orchestration: one `RunContext` per command invocation.

use crate::analysis::{AnalysisResult, Analyzer};
use crate::category::{Category, CategoryClassifier};
use crate::config::Config;
use crate::correction::CorrectionResolver;
use crate::error::{CoreError, ErrorKind, FailureRecord, Result};
use crate::graph::{GraphBuilder, LinkGraph};
use crate::mutation::{BackupStore, MutationEngine, MutationResult};
use crate::report::{
    CorrectionReport, DocumentCorrections, GraphReport, HubReport, LinkDetail, LinkPageReport, OrphanReport,
};
use crate::transform::{HubDigest, NavLink, OrphanWidget, RewriteLinks, WidgetEntry, friendly_label};
use chrono::{DateTime, Utc};
use linkmend_scanner::extract::extract_document;
use linkmend_scanner::scanner::ProgressCallback;
use linkmend_scanner::{DocumentIndex, DocumentScan, DocumentSource, Scanner, discover};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const LINKS_PURPOSE: &str = "links";
pub const ORPHANS_PURPOSE: &str = "orphans";
pub const LINK_PAGE_PURPOSE: &str = "link-page";
pub const HUBS_PURPOSE: &str = "hubs";

/// State owned by a single run. Nothing here outlives the command.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started: DateTime<Utc>,
    pub root: PathBuf,
    pub config: Config,
    pub dry_run: bool,
}

impl RunContext {
    pub fn new(root: &Path, config: Config) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started: Utc::now(),
            root: root.to_path_buf(),
            config,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn timestamp(&self) -> String {
        self.started.to_rfc3339()
    }

    /// Engine backed up into `<backup_root>/<purpose>`.
    pub fn engine(&self, purpose: &str) -> MutationEngine {
        let backups = BackupStore::new(&self.config.backup_dir(&self.root), purpose, &self.run_id);
        MutationEngine::new(Arc::new(backups)).with_dry_run(self.dry_run)
    }

    pub fn discover(&self) -> Result<Vec<DocumentSource>> {
        Ok(discover(&self.root, &self.config.corpus_options(&self.root))?)
    }

    pub fn index(&self, sources: &[DocumentSource]) -> Arc<DocumentIndex> {
        Arc::new(DocumentIndex::from_sources(sources).with_root(&self.root))
    }
}

/// Everything an analysis produces, kept together for follow-up runs.
#[derive(Debug)]
pub struct AnalysisRun {
    pub sources: Vec<DocumentSource>,
    pub index: Arc<DocumentIndex>,
    pub scans: Vec<DocumentScan>,
    pub graph: LinkGraph,
    pub analysis: AnalysisResult,
    pub report: GraphReport,
}

impl AnalysisRun {
    /// Hub basenames: the configured list, or the top hubs by out-degree.
    pub fn hubs(&self, config: &Config) -> Vec<String> {
        if config.hubs.is_empty() {
            self.analysis.hub_names(config.widget.hub_count)
        } else {
            config.hubs.clone()
        }
    }

    /// Corpus-relative path of a document in the graph.
    pub fn path_of(&self, basename: &str) -> Option<&str> {
        self.graph.page(basename).map(|stats| stats.path.as_str())
    }
}

/// Discover, scan, build the graph and analyze it. A missing corpus root
/// aborts the run; per-document failures land in the report.
pub async fn execute_analysis(
    ctx: &RunContext,
    workers: usize,
    progress: Option<ProgressCallback>,
) -> Result<AnalysisRun> {
    let sources = ctx.discover()?;
    let index = ctx.index(&sources);
    info!("Discovered {} documents under {}", sources.len(), ctx.root.display());

    let mut scanner = Scanner::new()
        .with_site(ctx.config.site_profile())
        .with_text_limit(ctx.config.report.anchor_text_limit);
    if let Some(callback) = progress {
        scanner = scanner.with_progress_callback(callback);
    }
    let scans = scanner.scan(sources.clone(), index.clone(), workers).await?;

    let graph = GraphBuilder::new(ctx.config.site_profile()).build(&scans);
    let analysis = Analyzer::analyze(&graph);
    let report = GraphReport::build(&ctx.run_id, ctx.started, &graph, &analysis, &ctx.config);

    Ok(AnalysisRun {
        sources,
        index,
        scans,
        graph,
        analysis,
        report,
    })
}

/// Resolve and rewrite the links of the selected documents.
///
/// `only` names basenames to process. When empty, the configured canonical
/// pages are processed, or every document if none are configured.
pub fn fix_links(ctx: &RunContext, only: &[String]) -> Result<CorrectionReport> {
    let sources = ctx.discover()?;
    let index = ctx.index(&sources);
    let resolver = CorrectionResolver::new(index.clone(), ctx.config.site_profile())
        .with_corrections(ctx.config.corrections.clone())
        .with_canonical_routes(ctx.config.canonical_routes.clone());
    let engine = ctx.engine(LINKS_PURPOSE);

    let mut report = CorrectionReport {
        run_id: ctx.run_id.clone(),
        timestamp: ctx.timestamp(),
        dry_run: ctx.dry_run,
        ..CorrectionReport::default()
    };

    let selectors: Vec<String> = if !only.is_empty() {
        only.to_vec()
    } else {
        ctx.config.canonical_pages.keys().cloned().collect()
    };

    let targets: Vec<&DocumentSource> = if selectors.is_empty() {
        sources.iter().collect()
    } else {
        let mut targets = Vec::new();
        for name in &selectors {
            let matches: Vec<&DocumentSource> = sources
                .iter()
                .filter(|s| &s.basename == name || &s.path == name)
                .collect();
            if matches.is_empty() {
                warn!("No document named {}", name);
                report.failures.push(FailureRecord::new(
                    name.as_str(),
                    ErrorKind::NotFound,
                    format!("no document named {}", name),
                ));
            }
            targets.extend(matches);
        }
        targets
    };

    for source in targets {
        match correct_document(ctx, &resolver, &engine, source) {
            Ok(corrections) => report.record(&source.path, corrections),
            Err(error) => {
                warn!("{}: {}", source.path, error);
                report.failures.push(FailureRecord::from_error(&source.path, &error));
            }
        }
    }

    info!(
        "Corrected {} links across {} documents ({} ambiguous, {} unresolved)",
        report.total_corrections,
        report.total_documents,
        report.ambiguous.len(),
        report.unresolved.len()
    );
    Ok(report)
}

fn correct_document(
    ctx: &RunContext,
    resolver: &CorrectionResolver,
    engine: &MutationEngine,
    source: &DocumentSource,
) -> Result<DocumentCorrections> {
    let absolute = ctx.root.join(&source.path);
    let bytes = match std::fs::read(&absolute) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(CoreError::NotFound(absolute)),
        Err(e) => return Err(CoreError::Io(e)),
    };
    let anchors = extract_document(&bytes, &absolute, ctx.config.report.anchor_text_limit)?;

    let mut rewrites = BTreeMap::new();
    let mut details = Vec::with_capacity(anchors.len());
    for anchor in anchors {
        let resolution = resolver.resolve(&anchor.href, &source.path);
        if resolution.changed() {
            rewrites.insert(resolution.original.clone(), resolution.href.clone());
        }
        details.push(LinkDetail {
            resolution,
            text: anchor.text,
        });
    }

    let links_corrected = details.iter().filter(|d| d.resolution.changed()).count();
    let mutation = if rewrites.is_empty() {
        debug!("{}: nothing to correct", source.path);
        None
    } else {
        Some(engine.apply(&absolute, &RewriteLinks::new(rewrites)))
    };

    Ok(DocumentCorrections {
        path: source.path.clone(),
        links_analyzed: details.len(),
        links_corrected,
        mutation,
        details,
    })
}

/// Insert a categorised widget listing every orphan into each hub.
pub fn connect_orphans(ctx: &RunContext, run: &AnalysisRun) -> OrphanReport {
    let hubs = run.hubs(&ctx.config);
    let classifier = CategoryClassifier::default();
    let orphans: Vec<&String> = run
        .analysis
        .orphan_pages
        .iter()
        .filter(|name| !hubs.contains(*name))
        .collect();

    let details_by_category = classifier.group(orphans.iter().map(|name| name.as_str()));
    let per_category_counts: BTreeMap<Category, usize> =
        details_by_category.iter().map(|(c, names)| (*c, names.len())).collect();

    let groups: BTreeMap<Category, Vec<WidgetEntry>> = details_by_category
        .iter()
        .map(|(category, names)| {
            let entries = names
                .iter()
                .filter_map(|name| run.path_of(name))
                .map(WidgetEntry::for_document)
                .collect();
            (*category, entries)
        })
        .collect();

    let mut report = OrphanReport {
        run_id: ctx.run_id.clone(),
        timestamp: ctx.timestamp(),
        dry_run: ctx.dry_run,
        total_orphans: orphans.len(),
        per_category_counts,
        details_by_category,
        ..OrphanReport::default()
    };

    if orphans.is_empty() {
        info!("No orphan pages to connect");
        return report;
    }

    let widget = OrphanWidget::new(groups, ctx.config.widget.max_per_category);
    let engine = ctx.engine(ORPHANS_PURPOSE);
    apply_to_hubs(ctx, run, &hubs, &engine, &widget, &mut report.details_by_document, &mut report.failures);
    report.hubs_touched = report.details_by_document.values().filter(|r| r.changed).count();

    info!("Connected {} orphans through {} hubs", report.total_orphans, report.hubs_touched);
    report
}

/// Add a navigation link to `target` in each hub. An unknown target aborts.
pub fn link_page(ctx: &RunContext, run: &AnalysisRun, target: &str, label: Option<&str>) -> Result<LinkPageReport> {
    let path = run
        .path_of(target)
        .map(str::to_string)
        .or_else(|| run.index.contains_path(target).then(|| target.trim_start_matches('/').to_string()))
        .ok_or_else(|| CoreError::NotFound(ctx.root.join(target)))?;
    let name = linkmend_scanner::normalize::basename(&path).to_string();
    let label = label.map(str::to_string).unwrap_or_else(|| friendly_label(&name));
    let link = NavLink::new(&format!("/{}", path), &label);

    let hubs: Vec<String> = run.hubs(&ctx.config).into_iter().filter(|h| *h != name).collect();
    let mut report = LinkPageReport {
        run_id: ctx.run_id.clone(),
        timestamp: ctx.timestamp(),
        dry_run: ctx.dry_run,
        target: path,
        ..LinkPageReport::default()
    };

    let engine = ctx.engine(LINK_PAGE_PURPOSE);
    apply_to_hubs(ctx, run, &hubs, &engine, &link, &mut report.details_by_document, &mut report.failures);
    report.hubs_touched = report.details_by_document.values().filter(|r| r.changed).count();
    Ok(report)
}

/// Regroup every hub carrying more than `widget.hub_link_limit` links.
/// Configured hubs missing from the corpus are reported as not found.
pub fn optimize_hubs(ctx: &RunContext, run: &AnalysisRun) -> HubReport {
    let limit = ctx.config.widget.hub_link_limit;
    let hubs: Vec<String> = run
        .hubs(&ctx.config)
        .into_iter()
        .filter(|hub| run.graph.page(hub).is_none_or(|stats| stats.out_degree() > limit))
        .collect();
    debug!("{} hubs over the {} link limit", hubs.len(), limit);

    let mut report = HubReport {
        run_id: ctx.run_id.clone(),
        timestamp: ctx.timestamp(),
        dry_run: ctx.dry_run,
        link_limit: limit,
        hubs_analyzed: hubs.len(),
        ..HubReport::default()
    };

    let engine = ctx.engine(HUBS_PURPOSE);
    let digest = HubDigest::new(limit);
    apply_to_hubs(ctx, run, &hubs, &engine, &digest, &mut report.details_by_document, &mut report.failures);
    report.hubs_touched = report.details_by_document.values().filter(|r| r.changed).count();
    info!("Regrouped {} of {} overloaded hubs", report.hubs_touched, report.hubs_analyzed);
    report
}

fn apply_to_hubs(
    ctx: &RunContext,
    run: &AnalysisRun,
    hubs: &[String],
    engine: &MutationEngine,
    transform: &dyn crate::transform::Transform,
    results: &mut BTreeMap<String, MutationResult>,
    failures: &mut Vec<FailureRecord>,
) {
    for hub in hubs {
        let Some(path) = run.path_of(hub) else {
            warn!("Hub {} is not in the corpus", hub);
            failures.push(FailureRecord::new(
                hub.as_str(),
                ErrorKind::NotFound,
                format!("hub {} not found", hub),
            ));
            continue;
        };
        let result = engine.apply(&ctx.root.join(path), transform);
        if let Some(error) = &result.error {
            failures.push(error.clone());
        }
        results.insert(path.to_string(), result);
    }
}
