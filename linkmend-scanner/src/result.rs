use crate::corpus::DocumentSource;
use crate::error::ScanError;
use crate::extract::Anchor;
use crate::index::DocumentIndex;
use crate::normalize::{LinkKind, Normalize, NormalizedTarget, SiteProfile};
use crate::validate::validate;
use serde::{Deserialize, Serialize};

/// A hyperlink after extraction, normalization and validation. Immutable
/// once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Corpus-relative path of the document containing the link.
    pub source: String,
    pub raw_href: String,
    pub target: Option<NormalizedTarget>,
    pub kind: LinkKind,
    pub valid: bool,
    pub text: String,
    pub position: usize,
}

impl Link {
    pub fn build(source: &str, anchor: &Anchor, site: &SiteProfile, index: &DocumentIndex) -> Self {
        let target = anchor.href.as_str().normalize(source, site);
        let (kind, valid) = match &target {
            Some(t) => (t.kind, validate(t, site, index)),
            None => (LinkKind::Ignored, true),
        };

        Self {
            source: source.to_string(),
            raw_href: anchor.href.clone(),
            target,
            kind,
            valid,
            text: anchor.text.clone(),
            position: anchor.position,
        }
    }

    pub fn is_navigational(&self) -> bool {
        self.kind != LinkKind::Ignored
    }

    /// Internal link whose target names a document: the only links that
    /// become graph edges.
    pub fn is_document_edge(&self, site: &SiteProfile) -> bool {
        self.kind == LinkKind::Internal
            && self.target.as_ref().is_some_and(|t| site.is_document(&t.value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanFailureKind {
    NotFound,
    ParseFailure,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub kind: ScanFailureKind,
    pub message: String,
}

impl From<&ScanError> for ScanFailure {
    fn from(error: &ScanError) -> Self {
        let kind = match error {
            ScanError::NotFound(_) => ScanFailureKind::NotFound,
            ScanError::ParseFailure { .. } => ScanFailureKind::ParseFailure,
            ScanError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => ScanFailureKind::NotFound,
            _ => ScanFailureKind::Io,
        };
        Self {
            kind,
            message: error.to_string(),
        }
    }
}

/// Everything learned from one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentScan {
    pub document: DocumentSource,
    pub links: Vec<Link>,
    pub error: Option<ScanFailure>,
}

impl DocumentScan {
    pub fn new(document: DocumentSource, links: Vec<Link>) -> Self {
        Self {
            document,
            links,
            error: None,
        }
    }

    pub fn with_error(document: DocumentSource, error: &ScanError) -> Self {
        Self {
            document,
            links: Vec::new(),
            error: Some(ScanFailure::from(error)),
        }
    }

    pub fn navigational(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| l.is_navigational())
    }

    pub fn internal_count(&self) -> usize {
        self.links.iter().filter(|l| l.kind == LinkKind::Internal).count()
    }

    pub fn external_count(&self) -> usize {
        self.links.iter().filter(|l| l.kind == LinkKind::External).count()
    }

    pub fn ignored_count(&self) -> usize {
        self.links.iter().filter(|l| l.kind == LinkKind::Ignored).count()
    }

    pub fn valid_count(&self) -> usize {
        self.navigational().filter(|l| l.valid).count()
    }

    pub fn broken_count(&self) -> usize {
        self.navigational().filter(|l| !l.valid).count()
    }
}
