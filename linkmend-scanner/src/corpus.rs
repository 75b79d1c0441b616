use crate::error::{Result, ScanError};
use crate::normalize::{basename, dirname};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names skipped during traversal unless configured otherwise.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".vscode",
    "backups",
    "_archived",
    ".pythonlibs",
];

/// Prefix of directories written by earlier mutation runs.
pub const BACKUP_DIR_PREFIX: &str = "backup_";

#[derive(Debug, Clone)]
pub struct CorpusOptions {
    pub extension: String,
    pub ignore_dirs: Vec<String>,
    /// Root-relative directories pruned wherever their name, e.g. a backup root.
    pub exclude_paths: Vec<PathBuf>,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            extension: "html".to_string(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            exclude_paths: Vec::new(),
        }
    }
}

impl CorpusOptions {
    /// Prune `dir` when it lies under `root`. Directories outside the corpus
    /// are never walked anyway.
    pub fn excluding(mut self, root: &Path, dir: &Path) -> Self {
        if let Ok(relative) = dir.strip_prefix(root)
            && !relative.as_os_str().is_empty()
        {
            self.exclude_paths.push(relative.to_path_buf());
        }
        self
    }
}

/// A document discovered in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentSource {
    /// Corpus-relative path using `/` separators.
    pub path: String,
    pub basename: String,
    pub directory: String,
    #[serde(skip)]
    pub absolute: PathBuf,
}

impl DocumentSource {
    pub fn new(path: &str, absolute: PathBuf) -> Self {
        let path = path.replace('\\', "/");
        Self {
            basename: basename(&path).to_string(),
            directory: dirname(&path).to_string(),
            path,
            absolute,
        }
    }
}

/// List every document under `root` with the configured extension, sorted by
/// relative path.
pub fn discover(root: &Path, options: &CorpusOptions) -> Result<Vec<DocumentSource>> {
    if !root.is_dir() {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }

    let extension = options.extension.trim_start_matches('.').to_ascii_lowercase();
    let mut documents = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry, root, options));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let has_extension = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&extension));
        if !has_extension {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let relative = relative.to_string_lossy();
        debug!("Discovered {}", relative);
        documents.push(DocumentSource::new(&relative, entry.path().to_path_buf()));
    }

    documents.sort();
    Ok(documents)
}

fn is_ignored_dir(entry: &DirEntry, root: &Path, options: &CorpusOptions) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name.starts_with(BACKUP_DIR_PREFIX) || options.ignore_dirs.iter().any(|d| d == name.as_ref()) {
        return true;
    }
    entry
        .path()
        .strip_prefix(root)
        .is_ok_and(|relative| options.exclude_paths.iter().any(|p| p == relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<html></html>").unwrap();
    }

    #[test]
    fn test_discover_filters_extension_and_ignored_dirs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "index.html");
        write(temp.path(), "pages/a.html");
        write(temp.path(), "pages/notes.txt");
        write(temp.path(), "node_modules/pkg/readme.html");
        write(temp.path(), "backup_links/index.html");
        write(temp.path(), ".git/hooks/x.html");

        let docs = discover(temp.path(), &CorpusOptions::default()).unwrap();
        let paths: Vec<_> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "pages/a.html"]);
        assert_eq!(docs[1].basename, "a.html");
        assert_eq!(docs[1].directory, "pages");
    }

    #[test]
    fn test_excluded_path_is_pruned_by_location() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "site/archive/a.html");
        write(temp.path(), "archive/old.html");
        write(temp.path(), "index.html");

        let options = CorpusOptions::default().excluding(temp.path(), &temp.path().join("archive"));
        let docs = discover(temp.path(), &options).unwrap();
        let paths: Vec<_> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "site/archive/a.html"]);
    }

    #[test]
    fn test_exclusion_outside_root_is_dropped() {
        let temp = TempDir::new().unwrap();
        let options = CorpusOptions::default().excluding(&temp.path().join("site"), &temp.path().join("elsewhere"));
        assert!(options.exclude_paths.is_empty());
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = discover(&temp.path().join("absent"), &CorpusOptions::default()).unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }
}
