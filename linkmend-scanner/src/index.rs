use crate::corpus::DocumentSource;
use crate::normalize::{basename, strip_query_and_fragment};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Lookup structure over every document in the corpus.
///
/// Paths are corpus-relative with `/` separators. Several documents may share
/// a basename; callers decide whether that is an error.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    root: Option<PathBuf>,
    by_basename: BTreeMap<String, Vec<String>>,
    paths: BTreeSet<String>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sources(sources: &[DocumentSource]) -> Self {
        let mut index = Self::new();
        for source in sources {
            index.insert(&source.path);
        }
        index
    }

    /// Also consult the real filesystem under `root` for non-document files.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = Some(root.to_path_buf());
        self
    }

    pub fn insert(&mut self, path: &str) {
        let path = path.replace('\\', "/");
        if !self.paths.insert(path.clone()) {
            return;
        }
        let entry = self.by_basename.entry(basename(&path).to_string()).or_default();
        entry.push(path);
        entry.sort();
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn has_basename(&self, name: &str) -> bool {
        self.by_basename.contains_key(name)
    }

    /// All document paths with the given basename, sorted.
    pub fn candidates(&self, name: &str) -> &[String] {
        self.by_basename.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when `path` (site-rooted or corpus-relative) names a known document.
    pub fn contains_path(&self, path: &str) -> bool {
        let path = strip_query_and_fragment(path);
        self.paths.contains(path.trim_start_matches('/'))
    }

    /// Known document, or any file present under the configured root.
    pub fn exists(&self, path: &str) -> bool {
        if self.contains_path(path) {
            return true;
        }
        let relative = strip_query_and_fragment(path).trim_start_matches('/');
        if relative.is_empty() || relative.split('/').any(|s| s == "..") {
            return false;
        }
        match &self.root {
            Some(root) => root.join(relative).is_file(),
            None => false,
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Basenames shared by more than one document.
    pub fn collisions(&self) -> Vec<(&str, &[String])> {
        self.by_basename
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(name, paths)| (name.as_str(), paths.as_slice()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_are_grouped_by_basename() {
        let mut index = DocumentIndex::new();
        index.insert("b/x.html");
        index.insert("a/x.html");
        index.insert("y.html");

        assert_eq!(index.candidates("x.html"), &["a/x.html".to_string(), "b/x.html".to_string()]);
        assert!(index.candidates("z.html").is_empty());
        assert_eq!(index.collisions().len(), 1);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_contains_path_accepts_site_rooted_form() {
        let mut index = DocumentIndex::new();
        index.insert("pages/a.html");
        assert!(index.contains_path("/pages/a.html"));
        assert!(index.contains_path("pages/a.html?tab=1"));
        assert!(!index.contains_path("a.html"));
    }

    #[test]
    fn test_exists_checks_root_for_other_files() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("style.css"), "body{}").unwrap();
        let index = DocumentIndex::new().with_root(temp.path());
        assert!(index.exists("/style.css"));
        assert!(!index.exists("/missing.css"));
        assert!(!index.exists("../style.css"));
    }
}
