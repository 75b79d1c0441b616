use crate::error::{CoreError, Result};
use linkmend_scanner::corpus::DEFAULT_IGNORE_DIRS;
use linkmend_scanner::{CorpusOptions, SiteProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File looked up in the corpus root when no config is named explicitly.
pub const CONFIG_FILE_NAME: &str = "linkmend.toml";

/// Commented config written by `linkmend init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Linkmend configuration

# Extension of the documents that make up the corpus.
extension = "html"

# Hosts treated as this site. Absolute URLs on these hosts are internal links.
site_hosts = []

# Directory names skipped during traversal. Directories starting with
# "backup_" are always skipped.
ignore_dirs = [".git", "node_modules", "__pycache__", ".vscode", "backups", "_archived", ".pythonlibs"]

# Where pre-mutation copies are kept, relative to the corpus root.
backup_root = "backups"

# Canonical route prefixes. Links under these routes are always valid.
canonical_routes = []

# Documents that receive generated navigation. Empty means the top hubs.
hubs = []

# Deprecated href -> canonical route.
[corrections]
# "/old.html" = "/new"

# Primary entry points, basename -> route.
[canonical_pages]
# "index.html" = "/"

[report]
top_cap = 10
orphan_cap = 20
anchor_text_limit = 50

[widget]
max_per_category = 3
hub_count = 4
# Hubs with more navigational links than this are regrouped by optimize-hubs.
hub_link_limit = 25

# Targets checked by `linkmend goals`.
[goals]
min_success_rate = 55.0
max_orphans = 10

[theme]
stylesheet = "/theme.css"
attribute = "data-theme"
attribute_value = "linkmend"
fonts = true
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_cap: usize,
    pub orphan_cap: usize,
    pub anchor_text_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_cap: 10,
            orphan_cap: 20,
            anchor_text_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub max_per_category: usize,
    pub hub_count: usize,
    pub hub_link_limit: usize,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            max_per_category: 3,
            hub_count: 4,
            hub_link_limit: 25,
        }
    }
}

/// Navigation health targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsConfig {
    /// Percentage of valid links over all links.
    pub min_success_rate: f64,
    pub max_orphans: usize,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            min_success_rate: 55.0,
            max_orphans: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub stylesheet: String,
    pub attribute: String,
    pub attribute_value: String,
    pub fonts: bool,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            stylesheet: "/theme.css".to_string(),
            attribute: "data-theme".to_string(),
            attribute_value: "linkmend".to_string(),
            fonts: true,
        }
    }
}

/// Settings for one corpus, loaded from `linkmend.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extension: String,
    pub site_hosts: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub backup_root: PathBuf,
    pub corrections: BTreeMap<String, String>,
    pub canonical_routes: Vec<String>,
    pub canonical_pages: BTreeMap<String, String>,
    pub hubs: Vec<String>,
    pub report: ReportConfig,
    pub widget: WidgetConfig,
    pub goals: GoalsConfig,
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: "html".to_string(),
            site_hosts: Vec::new(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            backup_root: PathBuf::from("backups"),
            corrections: BTreeMap::new(),
            canonical_routes: Vec::new(),
            canonical_pages: BTreeMap::new(),
            hubs: Vec::new(),
            report: ReportConfig::default(),
            widget: WidgetConfig::default(),
            goals: GoalsConfig::default(),
            theme: ThemeConfig::default(),
        }
    }
}

impl Config {
    /// Load the config for `root`.
    ///
    /// With no explicit path, `<root>/linkmend.toml` is read and its absence
    /// yields the defaults. An explicit path that does not exist is
    /// `NotFound`. A malformed file is always an error.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (root.join(CONFIG_FILE_NAME), false),
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => return Ok(Self::default()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(CoreError::NotFound(path)),
            Err(e) => return Err(CoreError::Io(e)),
        };

        Self::from_toml(&content).map_err(|e| match e {
            CoreError::Config(msg) => CoreError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Write the commented default config into `dir`. Refuses to overwrite
    /// unless `force` is set.
    pub fn write_default(dir: &Path, force: bool) -> Result<PathBuf> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() && !force {
            return Err(CoreError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        std::fs::create_dir_all(dir)?;
        std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        Ok(path)
    }

    pub fn site_profile(&self) -> SiteProfile {
        SiteProfile::new(&self.extension).with_own_hosts(self.site_hosts.iter().cloned())
    }

    /// Traversal options for `root`. The backup directory is always pruned,
    /// whatever it is called.
    pub fn corpus_options(&self, root: &Path) -> CorpusOptions {
        CorpusOptions {
            extension: self.extension.clone(),
            ignore_dirs: self.ignore_dirs.clone(),
            exclude_paths: Vec::new(),
        }
        .excluding(root, &self.backup_dir(root))
    }

    /// Backup root resolved against the corpus root.
    pub fn backup_dir(&self, root: &Path) -> PathBuf {
        if self.backup_root.is_absolute() {
            self.backup_root.clone()
        } else {
            root.join(&self.backup_root)
        }
    }
}
