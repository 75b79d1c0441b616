use crate::graph::LinkGraph;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

/// A `(basename, count)` pair; serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranked(pub String, pub usize);

impl Ranked {
    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn count(&self) -> usize {
        self.1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_pages: usize,
    pub total_links: usize,
    pub internal_links: usize,
    pub external_links: usize,
    pub valid_links: usize,
    pub broken_links: usize,
}

/// Connectivity metrics derived from one graph. Lists are complete; caps are
/// applied when a report is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub top_hubs: Vec<Ranked>,
    pub most_referenced: Vec<Ranked>,
    pub orphan_pages: Vec<String>,
    pub broken_targets: Vec<Ranked>,
    pub totals: Totals,
}

impl AnalysisResult {
    pub fn hub_names(&self, count: usize) -> Vec<String> {
        self.top_hubs.iter().take(count).map(|r| r.0.clone()).collect()
    }

    pub fn is_orphan(&self, basename: &str) -> bool {
        self.orphan_pages.binary_search_by(|o| o.as_str().cmp(basename)).is_ok()
    }
}

/// Count descending, then basename ascending.
fn by_count_then_name(a: &Ranked, b: &Ranked) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

pub struct Analyzer;

impl Analyzer {
    pub fn analyze(graph: &LinkGraph) -> AnalysisResult {
        let mut top_hubs: Vec<Ranked> = graph
            .pages()
            .iter()
            .map(|(name, stats)| Ranked(name.clone(), stats.out_degree()))
            .collect();
        top_hubs.sort_by(by_count_then_name);

        let in_degrees: BTreeMap<&str, usize> =
            graph.documents().map(|name| (name, graph.in_degree(name))).collect();

        let mut most_referenced: Vec<Ranked> = in_degrees
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, count)| Ranked(name.to_string(), *count))
            .collect();
        most_referenced.sort_by(by_count_then_name);

        // BTreeMap iteration keeps these sorted ascending
        let orphan_pages: Vec<String> = in_degrees
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| name.to_string())
            .collect();

        let mut broken_targets: Vec<Ranked> = graph
            .missing_targets()
            .into_iter()
            .map(|(name, count)| Ranked(name, count))
            .collect();
        broken_targets.sort_by(by_count_then_name);

        let mut totals = Totals {
            total_pages: graph.document_count(),
            ..Totals::default()
        };
        for stats in graph.pages().values() {
            totals.total_links += stats.out_degree();
            totals.internal_links += stats.internal_count;
            totals.external_links += stats.external_count;
            totals.broken_links += stats.broken_count;
        }
        totals.valid_links = totals.internal_links.saturating_sub(totals.broken_links);

        info!(
            "Analyzed {} pages: {} links, {} broken, {} orphans",
            totals.total_pages,
            totals.total_links,
            totals.broken_links,
            orphan_pages.len()
        );

        AnalysisResult {
            top_hubs,
            most_referenced,
            orphan_pages,
            broken_targets,
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use linkmend_scanner::{Anchor, DocumentIndex, DocumentScan, DocumentSource, Link, SiteProfile};
    use std::path::PathBuf;

    fn build(docs: &[(&str, &[&str])]) -> LinkGraph {
        let site = SiteProfile::default();
        let mut index = DocumentIndex::new();
        for (path, _) in docs {
            index.insert(path);
        }
        let scans: Vec<DocumentScan> = docs
            .iter()
            .map(|(path, hrefs)| {
                let links = hrefs
                    .iter()
                    .enumerate()
                    .map(|(i, href)| {
                        let anchor = Anchor {
                            href: href.to_string(),
                            text: String::new(),
                            position: i,
                        };
                        Link::build(path, &anchor, &site, &index)
                    })
                    .collect();
                DocumentScan::new(DocumentSource::new(path, PathBuf::from(path)), links)
            })
            .collect();
        GraphBuilder::new(site).build(&scans)
    }

    #[test]
    fn test_ties_break_by_basename() {
        let graph = build(&[
            ("c.html", &["a.html"]),
            ("b.html", &["a.html"]),
            ("a.html", &["b.html"]),
        ]);
        let result = Analyzer::analyze(&graph);
        let hubs: Vec<_> = result.top_hubs.iter().map(|r| r.name()).collect();
        assert_eq!(hubs, vec!["a.html", "b.html", "c.html"]);
        assert_eq!(result.most_referenced[0], Ranked("a.html".into(), 2));
        assert_eq!(result.most_referenced[1], Ranked("b.html".into(), 1));
        assert_eq!(result.orphan_pages, vec!["c.html"]);
    }

    #[test]
    fn test_orphans_and_referenced_partition_documents() {
        let graph = build(&[
            ("a.html", &["b.html", "b.html", "https://x.org"]),
            ("b.html", &[]),
            ("c.html", &["missing.html"]),
            ("d.html", &["#top", "mailto:x@y.z"]),
        ]);
        let result = Analyzer::analyze(&graph);

        let mut names: Vec<String> = result.most_referenced.iter().map(|r| r.0.clone()).collect();
        for orphan in &result.orphan_pages {
            assert!(!names.contains(orphan));
        }
        names.extend(result.orphan_pages.iter().cloned());
        names.sort();
        assert_eq!(names, vec!["a.html", "b.html", "c.html", "d.html"]);
        assert!(result.is_orphan("d.html"));
        assert!(!result.is_orphan("b.html"));
    }

    #[test]
    fn test_totals_and_broken_targets() {
        let graph = build(&[
            ("a.html", &["b.html", "gone.html", "https://x.org", "javascript:void(0)"]),
            ("b.html", &["gone.html"]),
        ]);
        let result = Analyzer::analyze(&graph);

        assert_eq!(result.totals.total_pages, 2);
        assert_eq!(result.totals.total_links, 4);
        assert_eq!(result.totals.external_links, 1);
        assert_eq!(result.totals.valid_links, 1);
        assert_eq!(result.totals.broken_links, 2);
        assert_eq!(result.broken_targets, vec![Ranked("gone.html".into(), 2)]);
        assert_eq!(result.top_hubs[0], Ranked("a.html".into(), 3));
    }

    #[test]
    fn test_out_degree_matches_navigational_links() {
        let graph = build(&[("a.html", &["b.html", "/route", "https://x.org", "#x"]), ("b.html", &[])]);
        let result = Analyzer::analyze(&graph);
        assert_eq!(result.top_hubs[0], Ranked("a.html".into(), 3));
        assert_eq!(graph.edge_out_degree("a.html"), 1);
    }
}
