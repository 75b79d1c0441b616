use crate::error::{CoreError, ErrorKind, FailureRecord};
use linkmend_scanner::normalize::basename;
use linkmend_scanner::{DocumentScan, ScanFailureKind, SiteProfile};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    Document { basename: String, path: String },
    /// Target of internal links that matches no traversed document.
    Missing { basename: String },
}

impl GraphNode {
    pub fn basename(&self) -> &str {
        match self {
            GraphNode::Document { basename, .. } | GraphNode::Missing { basename } => basename,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, GraphNode::Document { .. })
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.basename())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEdge {
    pub raw_href: String,
    pub target: String,
    pub valid: bool,
}

impl fmt::Display for LinkEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_href)
    }
}

/// Per-document link counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub path: String,
    pub directory: String,
    pub internal_count: usize,
    pub external_count: usize,
    pub valid_count: usize,
    pub broken_count: usize,
}

impl PageStats {
    /// Total navigational links leaving the page.
    pub fn out_degree(&self) -> usize {
        self.internal_count + self.external_count
    }
}

/// Directed multigraph of documents; parallel edges are kept.
#[derive(Debug, Default)]
pub struct LinkGraph {
    graph: DiGraph<GraphNode, LinkEdge>,
    documents: BTreeMap<String, NodeIndex>,
    missing: BTreeMap<String, NodeIndex>,
    pages: BTreeMap<String, PageStats>,
    failures: Vec<FailureRecord>,
}

impl LinkGraph {
    pub fn graph(&self) -> &DiGraph<GraphNode, LinkEdge> {
        &self.graph
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    pub fn contains(&self, basename: &str) -> bool {
        self.documents.contains_key(basename)
    }

    pub fn pages(&self) -> &BTreeMap<String, PageStats> {
        &self.pages
    }

    pub fn page(&self, basename: &str) -> Option<&PageStats> {
        self.pages.get(basename)
    }

    /// Collisions and per-document scan failures found while building.
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Number of internal edges arriving at `basename` from documents.
    pub fn in_degree(&self, basename: &str) -> usize {
        let Some(idx) = self.documents.get(basename).or_else(|| self.missing.get(basename)) else {
            return 0;
        };
        self.graph.edges_directed(*idx, Direction::Incoming).count()
    }

    /// Number of internal edges leaving `basename`.
    pub fn edge_out_degree(&self, basename: &str) -> usize {
        self.documents
            .get(basename)
            .map(|idx| self.graph.edges_directed(*idx, Direction::Outgoing).count())
            .unwrap_or(0)
    }

    /// Missing targets with the number of links pointing at each.
    pub fn missing_targets(&self) -> BTreeMap<String, usize> {
        self.missing
            .iter()
            .map(|(name, idx)| (name.clone(), self.graph.edges_directed(*idx, Direction::Incoming).count()))
            .collect()
    }

    /// Basenames of documents linking to `basename`, one entry per edge.
    pub fn referrers(&self, basename: &str) -> Vec<&str> {
        let Some(idx) = self.documents.get(basename) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .edges_directed(*idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].basename())
            .collect();
        names.sort();
        names
    }
}

pub struct GraphBuilder {
    site: SiteProfile,
}

impl GraphBuilder {
    pub fn new(site: SiteProfile) -> Self {
        Self { site }
    }

    /// Build the graph from scans sorted by path. The first document to claim
    /// a basename keeps it; later documents with the same basename are left
    /// out of the graph and recorded as key collisions.
    pub fn build(&self, scans: &[DocumentScan]) -> LinkGraph {
        let mut graph = LinkGraph::default();
        let mut included = Vec::new();

        for scan in scans {
            let key = scan.document.basename.clone();
            if let Some(existing) = graph.documents.get(&key) {
                let existing_path = match &graph.graph[*existing] {
                    GraphNode::Document { path, .. } => path.clone(),
                    GraphNode::Missing { .. } => String::new(),
                };
                let error = CoreError::KeyCollision {
                    basename: key.clone(),
                    existing: existing_path,
                    incoming: scan.document.path.clone(),
                };
                warn!("{}", error);
                graph.failures.push(FailureRecord::from_error(&scan.document.path, &error));
                continue;
            }

            let idx = graph.graph.add_node(GraphNode::Document {
                basename: key.clone(),
                path: scan.document.path.clone(),
            });
            graph.documents.insert(key, idx);

            if let Some(failure) = &scan.error {
                let kind = match failure.kind {
                    ScanFailureKind::NotFound => ErrorKind::NotFound,
                    _ => ErrorKind::ParseFailure,
                };
                graph
                    .failures
                    .push(FailureRecord::new(&scan.document.path, kind, &failure.message));
            }
            included.push((idx, scan));
        }

        for (source_idx, scan) in included {
            let stats = PageStats {
                path: scan.document.path.clone(),
                directory: scan.document.directory.clone(),
                internal_count: scan.internal_count(),
                external_count: scan.external_count(),
                valid_count: scan.valid_count(),
                broken_count: scan.broken_count(),
            };
            graph.pages.insert(scan.document.basename.clone(), stats);

            for link in scan.links.iter().filter(|l| l.is_document_edge(&self.site)) {
                let Some(target) = &link.target else {
                    continue;
                };
                let name = basename(&target.value).to_string();
                let target_idx = match graph.documents.get(&name) {
                    Some(idx) => *idx,
                    None => *graph.missing.entry(name.clone()).or_insert_with(|| {
                        graph.graph.add_node(GraphNode::Missing { basename: name.clone() })
                    }),
                };
                debug!("Edge {} -> {}", scan.document.basename, name);
                graph.graph.add_edge(
                    source_idx,
                    target_idx,
                    LinkEdge {
                        raw_href: link.raw_href.clone(),
                        target: target.value.clone(),
                        valid: link.valid,
                    },
                );
            }
        }

        graph
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(SiteProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkmend_scanner::{Anchor, DocumentIndex, DocumentSource, Link};
    use std::path::PathBuf;

    fn scan(path: &str, hrefs: &[&str], index: &DocumentIndex) -> DocumentScan {
        let site = SiteProfile::default();
        let links = hrefs
            .iter()
            .enumerate()
            .map(|(i, href)| {
                let anchor = Anchor {
                    href: href.to_string(),
                    text: String::new(),
                    position: i,
                };
                Link::build(path, &anchor, &site, index)
            })
            .collect();
        DocumentScan::new(DocumentSource::new(path, PathBuf::from(path)), links)
    }

    fn index(paths: &[&str]) -> DocumentIndex {
        let mut index = DocumentIndex::new();
        for p in paths {
            index.insert(p);
        }
        index
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let idx = index(&["a.html", "b.html"]);
        let scans = vec![scan("a.html", &["b.html", "b.html", "#top"], &idx), scan("b.html", &[], &idx)];
        let graph = GraphBuilder::default().build(&scans);

        assert_eq!(graph.document_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.in_degree("b.html"), 2);
        assert_eq!(graph.referrers("b.html"), vec!["a.html", "a.html"]);
    }

    #[test]
    fn test_broken_targets_become_missing_nodes() {
        let idx = index(&["a.html"]);
        let scans = vec![scan("a.html", &["gone.html", "/gone.html", "/route"], &idx)];
        let graph = GraphBuilder::default().build(&scans);

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.missing_targets().get("gone.html"), Some(&2));
        assert_eq!(graph.page("a.html").unwrap().broken_count, 2);
        assert_eq!(graph.page("a.html").unwrap().out_degree(), 3);
        assert!(!graph.contains("gone.html"));
    }

    #[test]
    fn test_key_collision_keeps_first_path() {
        let idx = index(&["a/x.html", "b/x.html"]);
        let scans = vec![scan("a/x.html", &[], &idx), scan("b/x.html", &["a/x.html"], &idx)];
        let graph = GraphBuilder::default().build(&scans);

        assert_eq!(graph.document_count(), 1);
        assert_eq!(graph.page("x.html").unwrap().path, "a/x.html");
        assert_eq!(graph.failures().len(), 1);
        assert_eq!(graph.failures()[0].kind, ErrorKind::KeyCollision);
        assert_eq!(graph.failures()[0].document, "b/x.html");
    }
}
