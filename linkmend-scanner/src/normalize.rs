//! Canonicalization of raw `href` values.
//!
//! Every function here is pure: the same `(href, source)` pair always yields
//! the same [`NormalizedTarget`], and nothing touches the filesystem.

use serde::{Deserialize, Serialize};
use url::Url;

/// Classification of a link once its href has been normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Internal,
    External,
    /// Fragments and non-web schemes (script, mail, telephone, ftp, data).
    /// Never part of the graph.
    Ignored,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Internal => "internal",
            LinkKind::External => "external",
            LinkKind::Ignored => "ignored",
        }
    }
}

/// What the normalizer needs to know about the site being audited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    extension: String,
    own_hosts: Vec<String>,
}

impl SiteProfile {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_ascii_lowercase(),
            own_hosts: Vec::new(),
        }
    }

    pub fn with_own_host(mut self, host: &str) -> Self {
        self.own_hosts.push(host.to_ascii_lowercase());
        self
    }

    pub fn with_own_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.own_hosts
            .extend(hosts.into_iter().map(|h| h.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// True when `value` names a document: it ends in `.<extension>`.
    pub fn is_document(&self, value: &str) -> bool {
        let lower = value.to_ascii_lowercase();
        lower.len() > self.extension.len() + 1
            && lower.ends_with(&self.extension)
            && lower[..lower.len() - self.extension.len()].ends_with('.')
    }

    pub fn is_own_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.own_hosts
            .iter()
            .any(|own| host == *own || host.ends_with(&format!(".{}", own)))
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::new("html")
    }
}

/// A typed, comparable link target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedTarget {
    pub kind: LinkKind,
    pub value: String,
    /// Set when `value` was produced by joining a relative href onto the
    /// source directory. Such values are already canonical.
    #[serde(default)]
    pub joined: bool,
}

impl NormalizedTarget {
    fn verbatim(kind: LinkKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            joined: false,
        }
    }

    fn joined(value: String) -> Self {
        Self {
            kind: LinkKind::Internal,
            value,
            joined: true,
        }
    }

    /// Basename of the target path, with any query or fragment removed.
    pub fn basename(&self) -> &str {
        basename(strip_query_and_fragment(&self.value))
    }
}

/// Normalization entry point, implemented for raw hrefs and for targets
/// that have already been normalized (which makes the operation idempotent).
pub trait Normalize {
    fn normalize(&self, source: &str, site: &SiteProfile) -> Option<NormalizedTarget>;
}

impl Normalize for str {
    fn normalize(&self, source: &str, site: &SiteProfile) -> Option<NormalizedTarget> {
        let href = self.trim();

        if is_non_navigational(href) {
            return None;
        }

        if let Some(target) = classify_absolute_url(href, site) {
            return Some(target);
        }

        if href.starts_with('/') {
            return Some(NormalizedTarget::verbatim(LinkKind::Internal, href));
        }

        if site.is_document(href) {
            return Some(NormalizedTarget::joined(join_relative(source, href)));
        }

        Some(NormalizedTarget::verbatim(LinkKind::Internal, href))
    }
}

impl Normalize for NormalizedTarget {
    fn normalize(&self, source: &str, site: &SiteProfile) -> Option<NormalizedTarget> {
        if self.joined {
            return Some(self.clone());
        }
        self.value.as_str().normalize(source, site)
    }
}

/// Normalize `href` as found in the document at `source` (a corpus-relative,
/// forward-slash path).
pub fn normalize(href: &str, source: &str, site: &SiteProfile) -> Option<NormalizedTarget> {
    href.normalize(source, site)
}

/// Empty hrefs, fragments, and every scheme other than `http`/`https`
/// (`javascript:`, `mailto:`, `tel:`, `ftp:`, `data:` ...).
pub fn is_non_navigational(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return true;
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:") {
        return true;
    }
    parse_scheme_url(href).is_some_and(|url| !is_web_scheme(url.scheme()))
}

fn is_web_scheme(scheme: &str) -> bool {
    matches!(scheme, "http" | "https")
}

/// True when the href carries its own scheme or is protocol-relative.
pub fn is_absolute_url(href: &str) -> bool {
    href.starts_with("//") || parse_scheme_url(href).is_some()
}

fn parse_scheme_url(href: &str) -> Option<Url> {
    let url = Url::parse(href).ok()?;
    // `c:/pages/a.html` parses with scheme "c"; treat one-letter schemes as paths
    if url.scheme().len() < 2 {
        return None;
    }
    Some(url)
}

fn classify_absolute_url(href: &str, site: &SiteProfile) -> Option<NormalizedTarget> {
    let url = if let Some(rest) = href.strip_prefix("//") {
        Url::parse(&format!("https://{}", rest)).ok()?
    } else {
        parse_scheme_url(href)?
    };

    if is_web_scheme(url.scheme())
        && let Some(host) = url.host_str()
        && site.is_own_host(host)
    {
        let mut value = url.path().to_string();
        if let Some(query) = url.query() {
            value.push('?');
            value.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            value.push('#');
            value.push_str(fragment);
        }
        return Some(NormalizedTarget::verbatim(LinkKind::Internal, value));
    }

    Some(NormalizedTarget::verbatim(LinkKind::External, href))
}

/// Join `href` onto the directory of `source`, collapsing `.` and `..`
/// segments and normalizing separators to `/`.
pub fn join_relative(source: &str, href: &str) -> String {
    let source = source.replace('\\', "/");
    let href = href.replace('\\', "/");
    let dir = dirname(&source);

    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(href.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Directory portion of a forward-slash path ("" for top-level files).
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Last segment of a forward-slash path.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

pub fn strip_query_and_fragment(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

/// Express `target` relative to the directory `from_dir`, both corpus-relative.
pub fn relative_to(target: &str, from_dir: &str) -> String {
    let target_parts: Vec<&str> = target.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let from_parts: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty() && *s != ".").collect();

    let common = target_parts
        .iter()
        .zip(from_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat_n("..", from_parts.len() - common));
    parts.extend(&target_parts[common..]);
    parts.join("/")
}
