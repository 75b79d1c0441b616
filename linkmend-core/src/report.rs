// Report records and renderers

use crate::analysis::{AnalysisResult, Ranked};
use crate::category::Category;
use crate::config::{Config, GoalsConfig};
use crate::correction::{Resolution, ResolutionStatus};
use crate::error::{CoreError, FailureRecord, Result};
use crate::graph::{GraphNode, LinkGraph, PageStats};
use crate::mutation::MutationResult;
use chrono::{DateTime, Utc};
use petgraph::dot::{Config as DotConfig, Dot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Html,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "html" => Some(ReportFormat::Html),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Html => "html",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub run_id: String,
    pub total_pages: usize,
    pub total_links: usize,
    pub external_links: usize,
    pub valid_links: usize,
    pub broken_links: usize,
    pub analysis_date: String,
}

impl GraphMetadata {
    /// Valid internal links as a percentage of every link, external ones included.
    pub fn success_rate(&self) -> f64 {
        if self.total_links == 0 {
            return 0.0;
        }
        self.valid_links as f64 / self.total_links as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAnalysis {
    pub top_hubs: Vec<Ranked>,
    pub most_referenced: Vec<Ranked>,
    pub orphan_pages: Vec<String>,
    /// Length limit applied to `topHubs` and `mostReferenced`.
    pub cap: usize,
    pub orphan_cap: usize,
    pub total_orphans: usize,
    pub broken_targets: Vec<Ranked>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalStatus {
    pub name: String,
    pub route: String,
    /// `None` when the page was not found in the corpus.
    pub stats: Option<PageStats>,
}

/// The persisted result of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphReport {
    pub metadata: GraphMetadata,
    pub pages: BTreeMap<String, PageStats>,
    pub analysis: GraphAnalysis,
    #[serde(default)]
    pub canonical_pages: Vec<CanonicalStatus>,
    #[serde(default)]
    pub failures: Vec<FailureRecord>,
}

impl GraphReport {
    pub fn build(
        run_id: &str,
        date: DateTime<Utc>,
        graph: &LinkGraph,
        analysis: &AnalysisResult,
        config: &Config,
    ) -> Self {
        let cap = config.report.top_cap;
        let orphan_cap = config.report.orphan_cap;

        let canonical_pages = config
            .canonical_pages
            .iter()
            .map(|(name, route)| CanonicalStatus {
                name: name.clone(),
                route: route.clone(),
                stats: graph.page(name).cloned(),
            })
            .collect();

        Self {
            metadata: GraphMetadata {
                run_id: run_id.to_string(),
                total_pages: analysis.totals.total_pages,
                total_links: analysis.totals.total_links,
                external_links: analysis.totals.external_links,
                valid_links: analysis.totals.valid_links,
                broken_links: analysis.totals.broken_links,
                analysis_date: date.to_rfc3339(),
            },
            pages: graph.pages().clone(),
            analysis: GraphAnalysis {
                top_hubs: analysis.top_hubs.iter().take(cap).cloned().collect(),
                most_referenced: analysis.most_referenced.iter().take(cap).cloned().collect(),
                orphan_pages: analysis.orphan_pages.iter().take(orphan_cap).cloned().collect(),
                cap,
                orphan_cap,
                total_orphans: analysis.orphan_pages.len(),
                broken_targets: analysis.broken_targets.iter().take(cap).cloned().collect(),
            },
            canonical_pages,
            failures: graph.failures().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDetail {
    #[serde(flatten)]
    pub resolution: Resolution,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCorrections {
    pub path: String,
    pub links_analyzed: usize,
    pub links_corrected: usize,
    pub mutation: Option<MutationResult>,
    pub details: Vec<LinkDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguousLink {
    pub document: String,
    pub href: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedLink {
    pub document: String,
    pub href: String,
}

/// Audit trail of a `fix-links` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionReport {
    pub run_id: String,
    pub timestamp: String,
    pub dry_run: bool,
    pub total_documents: usize,
    pub total_corrections: usize,
    pub details_by_document: BTreeMap<String, DocumentCorrections>,
    pub ambiguous: Vec<AmbiguousLink>,
    pub unresolved: Vec<UnresolvedLink>,
    pub failures: Vec<FailureRecord>,
}

impl CorrectionReport {
    pub fn record(&mut self, name: &str, corrections: DocumentCorrections) {
        for detail in &corrections.details {
            match &detail.resolution.status {
                ResolutionStatus::Ambiguous { candidates } => self.ambiguous.push(AmbiguousLink {
                    document: corrections.path.clone(),
                    href: detail.resolution.original.clone(),
                    candidates: candidates.clone(),
                }),
                ResolutionStatus::Unresolved => self.unresolved.push(UnresolvedLink {
                    document: corrections.path.clone(),
                    href: detail.resolution.original.clone(),
                }),
                _ => {}
            }
        }
        if let Some(error) = corrections.mutation.as_ref().and_then(|m| m.error.clone()) {
            self.failures.push(error);
        }
        self.total_documents += 1;
        self.total_corrections += corrections.links_corrected;
        self.details_by_document.insert(name.to_string(), corrections);
    }
}

/// Audit trail of a `connect-orphans` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanReport {
    pub run_id: String,
    pub timestamp: String,
    pub dry_run: bool,
    pub total_orphans: usize,
    pub per_category_counts: BTreeMap<Category, usize>,
    pub hubs_touched: usize,
    /// Per hub, keyed by corpus path.
    pub details_by_document: BTreeMap<String, MutationResult>,
    pub details_by_category: BTreeMap<Category, Vec<String>>,
    pub failures: Vec<FailureRecord>,
}

/// Audit trail of a `link-page` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPageReport {
    pub run_id: String,
    pub timestamp: String,
    pub dry_run: bool,
    pub target: String,
    pub hubs_touched: usize,
    pub details_by_document: BTreeMap<String, MutationResult>,
    pub failures: Vec<FailureRecord>,
}

/// Audit trail of an `optimize-hubs` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubReport {
    pub run_id: String,
    pub timestamp: String,
    pub dry_run: bool,
    pub link_limit: usize,
    /// Hubs over the limit that were considered.
    pub hubs_analyzed: usize,
    pub hubs_touched: usize,
    pub details_by_document: BTreeMap<String, MutationResult>,
    pub failures: Vec<FailureRecord>,
}

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";

pub fn generate_text_report(report: &GraphReport) -> String {
    let mut out = String::new();
    let meta = &report.metadata;

    out.push_str(RULE);
    out.push_str("                          LINKMEND LINK GRAPH REPORT\n");
    out.push_str(RULE);
    out.push('\n');

    out.push_str(&format!("Run ID:        {}\n", meta.run_id));
    out.push_str(&format!("Analysis Date: {}\n", meta.analysis_date));
    out.push_str(&format!("Pages:         {}\n", meta.total_pages));
    out.push_str(&format!("Links:         {}\n", meta.total_links));
    out.push_str(&format!("Valid:         {}\n", meta.valid_links));
    out.push_str(&format!("Broken:        {}\n", meta.broken_links));
    out.push_str(&format!("External:      {}\n", meta.external_links));
    out.push_str(&format!("Success Rate:  {:.1}%\n\n", meta.success_rate()));

    if !report.canonical_pages.is_empty() {
        out.push_str(RULE);
        out.push_str("CANONICAL PAGES\n");
        out.push_str(RULE);
        out.push('\n');
        for page in &report.canonical_pages {
            match &page.stats {
                Some(stats) => {
                    let marker = if stats.broken_count == 0 { "[OK]  " } else { "[WARN]" };
                    out.push_str(&format!(
                        "{} {} ({}): {} internal, {} external, {} broken\n",
                        marker, page.name, page.route, stats.internal_count, stats.external_count, stats.broken_count
                    ));
                }
                None => out.push_str(&format!("[MISS] {} ({}): not found\n", page.name, page.route)),
            }
        }
        out.push('\n');
    }

    push_ranked(&mut out, &format!("TOP {} HUBS (outgoing links)", report.analysis.cap), &report.analysis.top_hubs, "links");
    push_ranked(
        &mut out,
        &format!("TOP {} MOST REFERENCED (incoming links)", report.analysis.cap),
        &report.analysis.most_referenced,
        "references",
    );

    out.push_str(RULE);
    out.push_str(&format!("ORPHAN PAGES: {}\n", report.analysis.total_orphans));
    out.push_str(RULE);
    out.push('\n');
    for orphan in &report.analysis.orphan_pages {
        out.push_str(&format!("  - {}\n", orphan));
    }
    if report.analysis.total_orphans > report.analysis.orphan_pages.len() {
        out.push_str(&format!(
            "  ... and {} more\n",
            report.analysis.total_orphans - report.analysis.orphan_pages.len()
        ));
    }
    out.push('\n');

    if !report.analysis.broken_targets.is_empty() {
        push_ranked(&mut out, "MISSING TARGETS", &report.analysis.broken_targets, "references");
    }

    if !report.failures.is_empty() {
        out.push_str(RULE);
        out.push_str("FAILURES\n");
        out.push_str(RULE);
        out.push('\n');
        for failure in &report.failures {
            out.push_str(&format!("  [{}] {}: {}\n", failure.kind, failure.document, failure.message));
        }
        out.push('\n');
    }

    out.push_str(RULE);
    out.push_str("                                End of Report\n");
    out.push_str(RULE);
    out
}

fn push_ranked(out: &mut String, title: &str, entries: &[Ranked], unit: &str) {
    out.push_str(RULE);
    out.push_str(title);
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!("{:2}. {:<40} ({:2} {})\n", i + 1, entry.name(), entry.count(), unit));
    }
    out.push('\n');
}

pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn generate_html_report(report: &GraphReport) -> String {
    let meta = &report.metadata;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Linkmend Link Graph Report</title>\n<style>\n");
    html.push_str("body { font-family: system-ui, sans-serif; margin: 2rem; color: #1f2937; background: #f9fafb; }\n");
    html.push_str(".cards { display: flex; gap: 1rem; flex-wrap: wrap; }\n");
    html.push_str(".card { background: #fff; border: 1px solid #e5e7eb; border-radius: 10px; padding: 1rem 1.5rem; min-width: 8rem; }\n");
    html.push_str(".card .value { font-size: 1.8rem; font-weight: 700; }\n");
    html.push_str(".card.broken .value { color: #dc2626; }\n");
    html.push_str("table { border-collapse: collapse; margin: 1rem 0; background: #fff; }\n");
    html.push_str("th, td { border: 1px solid #e5e7eb; padding: 0.4rem 0.8rem; text-align: left; }\n");
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str("<h1>Link Graph Report</h1>\n");
    html.push_str(&format!(
        "<p>Run <code>{}</code> &middot; {}</p>\n",
        escape_html(&meta.run_id),
        escape_html(&meta.analysis_date)
    ));

    html.push_str("<div class=\"cards\">\n");
    for (label, value, class) in [
        ("Pages", meta.total_pages, "card"),
        ("Links", meta.total_links, "card"),
        ("Valid", meta.valid_links, "card"),
        ("Broken", meta.broken_links, "card broken"),
        ("Orphans", report.analysis.total_orphans, "card"),
    ] {
        html.push_str(&format!(
            "<div class=\"{}\"><div class=\"value\">{}</div><div>{}</div></div>\n",
            class, value, label
        ));
    }
    html.push_str("</div>\n");
    html.push_str(&format!("<p>Success rate: <strong>{:.1}%</strong></p>\n", meta.success_rate()));

    push_ranked_table(&mut html, "Top Hubs", "Outgoing", &report.analysis.top_hubs);
    push_ranked_table(&mut html, "Most Referenced", "Incoming", &report.analysis.most_referenced);

    html.push_str(&format!("<h2>Orphan Pages ({})</h2>\n<ul>\n", report.analysis.total_orphans));
    for orphan in &report.analysis.orphan_pages {
        html.push_str(&format!("<li>{}</li>\n", escape_html(orphan)));
    }
    html.push_str("</ul>\n");

    html.push_str("<h2>Recommendations</h2>\n<ul>\n");
    for recommendation in recommendations(report) {
        html.push_str(&format!("<li>{}</li>\n", escape_html(&recommendation)));
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

fn push_ranked_table(html: &mut String, title: &str, column: &str, entries: &[Ranked]) {
    html.push_str(&format!("<h2>{}</h2>\n<table>\n<tr><th>#</th><th>Page</th><th>{}</th></tr>\n", title, column));
    for (i, entry) in entries.iter().enumerate() {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            i + 1,
            escape_html(entry.name()),
            entry.count()
        ));
    }
    html.push_str("</table>\n");
}

/// Plain-language follow-ups derived from the report.
pub fn recommendations(report: &GraphReport) -> Vec<String> {
    let mut out = Vec::new();
    if report.metadata.broken_links > 0 {
        out.push(format!(
            "Fix {} broken internal links (run `linkmend fix-links`).",
            report.metadata.broken_links
        ));
    }
    if report.analysis.total_orphans > 0 {
        out.push(format!(
            "Connect {} orphan pages to the main hubs (run `linkmend connect-orphans`).",
            report.analysis.total_orphans
        ));
    }
    let missing = report.canonical_pages.iter().filter(|p| p.stats.is_none()).count();
    if missing > 0 {
        out.push(format!("{} canonical pages are missing from the corpus.", missing));
    }
    if out.is_empty() {
        out.push("No action needed.".to_string());
    }
    out
}

/// One target from the `[goals]` section, measured against a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalOutcome {
    pub name: String,
    pub target: f64,
    pub actual: f64,
    pub met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalCheck {
    pub run_id: String,
    pub success_rate: GoalOutcome,
    pub orphans: GoalOutcome,
    pub goals_met: usize,
    pub goals_total: usize,
    pub progress_pct: f64,
    pub recommendations: Vec<String>,
}

impl GoalCheck {
    pub fn all_met(&self) -> bool {
        self.goals_met == self.goals_total
    }
}

/// Measure a report's totals against the configured goals.
pub fn goal_check(report: &GraphReport, goals: &GoalsConfig) -> GoalCheck {
    let rate = report.metadata.success_rate();
    let orphans = report.analysis.total_orphans;

    let success_rate = GoalOutcome {
        name: "success rate".to_string(),
        target: goals.min_success_rate,
        actual: rate,
        met: rate >= goals.min_success_rate,
    };
    let orphan_goal = GoalOutcome {
        name: "orphan pages".to_string(),
        target: goals.max_orphans as f64,
        actual: orphans as f64,
        met: orphans <= goals.max_orphans,
    };

    let mut recommendations = Vec::new();
    if !success_rate.met {
        recommendations.push(format!(
            "Fix {:.1}% more links to reach the {:.1}% success rate.",
            goals.min_success_rate - rate,
            goals.min_success_rate
        ));
    }
    if !orphan_goal.met {
        recommendations.push(format!(
            "Connect {} more orphan pages to get down to {}.",
            orphans - goals.max_orphans,
            goals.max_orphans
        ));
    }

    let goals_met = usize::from(success_rate.met) + usize::from(orphan_goal.met);
    GoalCheck {
        run_id: report.metadata.run_id.clone(),
        success_rate,
        orphans: orphan_goal,
        goals_met,
        goals_total: 2,
        progress_pct: goals_met as f64 / 2.0 * 100.0,
        recommendations,
    }
}

pub fn generate_goal_report(check: &GoalCheck) -> String {
    let mut out = String::new();
    out.push_str(RULE);
    out.push_str("GOALS\n");
    out.push_str(RULE);
    out.push('\n');

    let mark = |met: bool| if met { "[MET] " } else { "[MISS]" };
    out.push_str(&format!(
        "{} Success rate: {:.1}% (target >= {:.1}%)\n",
        mark(check.success_rate.met),
        check.success_rate.actual,
        check.success_rate.target
    ));
    out.push_str(&format!(
        "{} Orphan pages: {} (target <= {})\n\n",
        mark(check.orphans.met),
        check.orphans.actual,
        check.orphans.target
    ));
    out.push_str(&format!(
        "Progress: {}/{} goals ({:.0}%)\n",
        check.goals_met, check.goals_total, check.progress_pct
    ));
    for recommendation in &check.recommendations {
        out.push_str(&format!("  - {}\n", recommendation));
    }
    out
}

/// Graphviz rendering of the link graph. Pages named in `highlight` are
/// filled; targets that match no document are dashed.
pub fn generate_dot_report(graph: &LinkGraph, highlight: &[String]) -> String {
    format!(
        "{}",
        Dot::with_attr_getters(
            graph.graph(),
            &[DotConfig::EdgeNoLabel],
            &|_, _| String::new(),
            &|_, (_, node)| match node {
                GraphNode::Document { basename, .. } if highlight.iter().any(|h| h == basename) => {
                    "shape=box, style=filled, fillcolor=gold".to_string()
                }
                GraphNode::Document { .. } => "shape=box".to_string(),
                GraphNode::Missing { .. } => "shape=box, style=dashed, color=red".to_string(),
            },
        )
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Read a report written by an earlier `analyze` run.
pub fn load_graph_report(path: &Path) -> Result<GraphReport> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(CoreError::Io(e)),
    };
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::graph::GraphBuilder;
    use linkmend_scanner::{Anchor, DocumentIndex, DocumentScan, DocumentSource, Link, SiteProfile};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_graph() -> LinkGraph {
        let mut index = DocumentIndex::new();
        for p in ["a.html", "b.html", "c.html"] {
            index.insert(p);
        }
        let site = SiteProfile::default();
        let scan = |path: &str, hrefs: &[&str]| {
            let links = hrefs
                .iter()
                .enumerate()
                .map(|(i, href)| {
                    let anchor = Anchor {
                        href: href.to_string(),
                        text: format!("link {}", i),
                        position: i,
                    };
                    Link::build(path, &anchor, &site, &index)
                })
                .collect();
            DocumentScan::new(DocumentSource::new(path, PathBuf::from(path)), links)
        };
        let scans = vec![
            scan("a.html", &["b.html", "gone.html", "https://x.org"]),
            scan("b.html", &[]),
            scan("c.html", &[]),
        ];
        GraphBuilder::default().build(&scans)
    }

    fn sample_report(config: &Config) -> GraphReport {
        let graph = sample_graph();
        let analysis = Analyzer::analyze(&graph);
        GraphReport::build("run-1", Utc::now(), &graph, &analysis, config)
    }

    #[test]
    fn test_success_rate_counts_every_link() {
        let report = sample_report(&Config::default());
        // One valid link out of three: one broken, one external.
        assert!((report.metadata.success_rate() - 100.0 / 3.0).abs() < 1e-9);
        assert!(generate_text_report(&report).contains("Success Rate:  33.3%"));

        let mut empty = report.metadata.clone();
        empty.total_links = 0;
        assert_eq!(empty.success_rate(), 0.0);
    }

    #[test]
    fn test_goal_check_against_defaults() {
        let report = sample_report(&Config::default());
        let check = goal_check(&report, &GoalsConfig::default());

        assert!(!check.success_rate.met);
        assert!(check.orphans.met);
        assert_eq!(check.goals_met, 1);
        assert_eq!(check.progress_pct, 50.0);
        assert!(!check.all_met());
        assert_eq!(
            check.recommendations,
            vec!["Fix 21.7% more links to reach the 55.0% success rate.".to_string()]
        );

        let text = generate_goal_report(&check);
        assert!(text.contains("[MISS] Success rate: 33.3% (target >= 55.0%)"));
        assert!(text.contains("[MET]  Orphan pages: 2 (target <= 10)"));
        assert!(text.contains("Progress: 1/2 goals (50%)"));
    }

    #[test]
    fn test_goal_check_reports_orphan_excess() {
        let report = sample_report(&Config::default());
        let goals = GoalsConfig {
            min_success_rate: 30.0,
            max_orphans: 0,
        };
        let check = goal_check(&report, &goals);
        assert!(check.success_rate.met);
        assert!(!check.orphans.met);
        assert_eq!(check.recommendations, vec!["Connect 2 more orphan pages to get down to 0.".to_string()]);
    }

    #[test]
    fn test_dot_export_marks_pages() {
        let graph = sample_graph();
        let dot = generate_dot_report(&graph, &["a.html".to_string()]);

        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains(r#"label = "a.html""#));
        assert!(dot.contains("fillcolor=gold"));
        assert!(dot.contains("style=dashed"));
        assert_eq!(dot.matches("->").count(), graph.graph().edge_count());
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::from_str("txt"), Some(ReportFormat::Text));
        assert_eq!(ReportFormat::from_str("pdf"), None);
    }

    #[test]
    fn test_caps_are_explicit_and_applied() {
        let mut config = Config::default();
        config.report.orphan_cap = 1;
        let report = sample_report(&config);

        assert_eq!(report.analysis.cap, 10);
        assert_eq!(report.analysis.orphan_cap, 1);
        assert_eq!(report.analysis.total_orphans, 2);
        assert_eq!(report.analysis.orphan_pages, vec!["a.html".to_string()]);
    }

    #[test]
    fn test_json_shape() {
        let report = sample_report(&Config::default());
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["totalPages"], 3);
        assert_eq!(value["metadata"]["brokenLinks"], 1);
        assert_eq!(value["metadata"]["runId"], "run-1");
        assert_eq!(value["pages"]["a.html"]["internalCount"], 2);
        assert_eq!(value["analysis"]["topHubs"][0][0], "a.html");
        assert_eq!(value["analysis"]["topHubs"][0][1], 3);
        assert_eq!(value["analysis"]["brokenTargets"][0][0], "gone.html");

        let parsed: GraphReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_canonical_page_status() {
        let mut config = Config::default();
        config.canonical_pages.insert("a.html".to_string(), "/".to_string());
        config.canonical_pages.insert("home.html".to_string(), "/home".to_string());
        let report = sample_report(&config);

        assert!(report.canonical_pages.iter().any(|p| p.name == "a.html" && p.stats.is_some()));
        assert!(report.canonical_pages.iter().any(|p| p.name == "home.html" && p.stats.is_none()));

        let text = generate_text_report(&report);
        assert!(text.contains("[MISS] home.html (/home): not found"));
        assert!(text.contains("[WARN] a.html"));
    }

    #[test]
    fn test_text_report_sections() {
        let text = generate_text_report(&sample_report(&Config::default()));
        assert!(text.contains("LINKMEND LINK GRAPH REPORT"));
        assert!(text.contains("ORPHAN PAGES: 2"));
        assert!(text.contains("MISSING TARGETS"));
        assert!(text.contains("End of Report"));
    }

    #[test]
    fn test_html_report_escapes_names() {
        let mut report = sample_report(&Config::default());
        report.analysis.orphan_pages.push("<script>.html".to_string());
        let html = generate_html_report(&report);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("&lt;script&gt;.html"));
        assert!(!html.contains("<li><script>"));
        assert!(html.contains("linkmend fix-links"));
    }

    #[test]
    fn test_correction_report_collects_ambiguous_and_unresolved() {
        use crate::correction::Resolution;

        let detail = |original: &str, status: ResolutionStatus| LinkDetail {
            resolution: Resolution {
                original: original.to_string(),
                href: original.to_string(),
                status,
            },
            text: String::new(),
        };
        let mut report = CorrectionReport::default();
        report.record(
            "a.html",
            DocumentCorrections {
                path: "a.html".to_string(),
                links_analyzed: 2,
                links_corrected: 0,
                mutation: None,
                details: vec![
                    detail("x.html", ResolutionStatus::Ambiguous { candidates: vec!["p/x.html".into(), "q/x.html".into()] }),
                    detail("lost.html", ResolutionStatus::Unresolved),
                ],
            },
        );

        assert_eq!(report.total_documents, 1);
        assert_eq!(report.ambiguous.len(), 1);
        assert_eq!(report.ambiguous[0].candidates.len(), 2);
        assert_eq!(report.unresolved[0].href, "lost.html");

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["detailsByDocument"]["a.html"]["details"][0]["status"], "ambiguous");
    }

    #[test]
    fn test_save_and_load_graph_report() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out/graph.json");
        let report = sample_report(&Config::default());

        save_report(&generate_json_report(&report).unwrap(), &path).unwrap();
        assert_eq!(load_graph_report(&path).unwrap(), report);
    }

    #[test]
    fn test_load_missing_report_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_graph_report(&temp.path().join("graph.json")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
