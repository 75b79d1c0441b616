//! Maps broken or legacy hrefs onto canonical targets.

use crate::error::CoreError;
use linkmend_scanner::normalize::{
    basename, dirname, join_relative, relative_to, strip_query_and_fragment,
};
use linkmend_scanner::{DocumentIndex, LinkKind, Normalize, SiteProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ResolutionStatus {
    /// The href already works and is left alone.
    Valid,
    /// The href was replaced by a working target.
    Corrected,
    Unresolved,
    /// More than one document could be meant; needs a human.
    Ambiguous { candidates: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub original: String,
    pub href: String,
    #[serde(flatten)]
    pub status: ResolutionStatus,
}

impl Resolution {
    fn valid(href: &str) -> Self {
        Self::with_status(href, href.to_string(), ResolutionStatus::Valid)
    }

    fn with_status(original: &str, href: String, status: ResolutionStatus) -> Self {
        Self {
            original: original.to_string(),
            href,
            status,
        }
    }

    pub fn resolved(&self) -> bool {
        matches!(self.status, ResolutionStatus::Valid | ResolutionStatus::Corrected)
    }

    pub fn ambiguous(&self) -> bool {
        matches!(self.status, ResolutionStatus::Ambiguous { .. })
    }

    /// True when applying the resolution changes the href.
    pub fn changed(&self) -> bool {
        self.status == ResolutionStatus::Corrected && self.href != self.original
    }

    /// Ambiguity as an error value, for callers that propagate it.
    pub fn ambiguity_error(&self) -> Option<CoreError> {
        match &self.status {
            ResolutionStatus::Ambiguous { candidates } => Some(CoreError::AmbiguousResolution {
                href: self.original.clone(),
                candidates: candidates.clone(),
            }),
            _ => None,
        }
    }
}

pub struct CorrectionResolver {
    corrections: BTreeMap<String, String>,
    canonical_routes: Vec<String>,
    index: Arc<DocumentIndex>,
    site: SiteProfile,
}

impl CorrectionResolver {
    pub fn new(index: Arc<DocumentIndex>, site: SiteProfile) -> Self {
        Self {
            corrections: BTreeMap::new(),
            canonical_routes: Vec::new(),
            index,
            site,
        }
    }

    pub fn with_corrections(mut self, corrections: BTreeMap<String, String>) -> Self {
        self.corrections = corrections;
        self
    }

    pub fn with_canonical_routes(mut self, routes: Vec<String>) -> Self {
        self.canonical_routes = routes;
        self
    }

    /// Resolve `href` as written in the document at `source`.
    pub fn resolve(&self, href: &str, source: &str) -> Resolution {
        let trimmed = href.trim();

        match trimmed.normalize(source, &self.site) {
            None => return Resolution::valid(href),
            Some(target) if target.kind == LinkKind::External => return Resolution::valid(href),
            Some(_) => {}
        }

        if let Some(route) = self.corrections.get(trimmed) {
            debug!("Correction table: {} -> {}", trimmed, route);
            return Resolution::with_status(href, route.clone(), ResolutionStatus::Corrected);
        }

        if trimmed.starts_with('/') && self.is_canonical_route(trimmed) {
            return Resolution::valid(href);
        }

        let path = strip_query_and_fragment(trimmed);
        let on_disk = if path.starts_with('/') {
            path.to_string()
        } else {
            join_relative(source, path)
        };
        if self.index.exists(&on_disk) {
            return Resolution::valid(href);
        }

        if !path.starts_with('/') && self.site.is_document(path) {
            return self.search_by_basename(href, trimmed, path, source);
        }

        Resolution::with_status(href, href.to_string(), ResolutionStatus::Unresolved)
    }

    fn search_by_basename(&self, href: &str, trimmed: &str, path: &str, source: &str) -> Resolution {
        let candidates = self.index.candidates(basename(path));
        match candidates {
            [] => Resolution::with_status(href, href.to_string(), ResolutionStatus::Unresolved),
            [only] => {
                let suffix = &trimmed[path.len()..];
                let rewritten = format!("{}{}", relative_to(only, dirname(source)), suffix);
                debug!("Relocated {} -> {} (from {})", trimmed, rewritten, source);
                Resolution::with_status(href, rewritten, ResolutionStatus::Corrected)
            }
            many => {
                debug!("Ambiguous {}: {} candidates", trimmed, many.len());
                Resolution::with_status(
                    href,
                    href.to_string(),
                    ResolutionStatus::Ambiguous {
                        candidates: many.to_vec(),
                    },
                )
            }
        }
    }

    /// A route matches when equal to a prefix or continuing it at a segment
    /// boundary.
    fn is_canonical_route(&self, href: &str) -> bool {
        self.canonical_routes.iter().any(|route| {
            let route = route.trim_end_matches('/');
            if route.is_empty() {
                return href == "/";
            }
            match href.strip_prefix(route) {
                Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
                None => false,
            }
        })
    }
}
