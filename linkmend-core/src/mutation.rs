//! Backup-before-write document mutation with rollback.

use crate::dom::Document;
use crate::error::{CoreError, ErrorKind, FailureRecord, Result, WriteStage};
use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Where document bytes come from and go to.
pub trait DocumentStore: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsStore;

impl DocumentStore for FsStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }
}

/// Pre-mutation copy of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub run_id: String,
    pub original_path: PathBuf,
    /// File inside the backup directory holding the bytes, once persisted.
    pub backup_file: Option<PathBuf>,
    #[serde(skip)]
    pub original_bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct BackupState {
    records: Vec<BackupRecord>,
    names: BTreeMap<String, PathBuf>,
}

/// One directory per run purpose holding pre-mutation copies under their
/// basenames plus a `manifest.json`. Never cleaned up automatically.
#[derive(Debug)]
pub struct BackupStore {
    dir: PathBuf,
    run_id: String,
    state: Mutex<BackupState>,
}

impl BackupStore {
    pub fn new(root: &Path, purpose: &str, run_id: &str) -> Self {
        Self {
            dir: root.join(purpose),
            run_id: run_id.to_string(),
            state: Mutex::new(BackupState::default()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Capture bytes in memory. Nothing touches disk yet.
    pub fn snapshot(&self, path: &Path, bytes: Vec<u8>) -> BackupRecord {
        BackupRecord {
            run_id: self.run_id.clone(),
            original_path: path.to_path_buf(),
            backup_file: None,
            original_bytes: bytes,
        }
    }

    /// Write the snapshot to the backup directory and update the manifest.
    /// A document backed up twice in one run keeps its first file.
    pub fn persist(&self, record: &mut BackupRecord) -> io::Result<()> {
        let mut state = self.state.lock().map_err(|_| io::Error::other("backup state poisoned"))?;

        if let Some(existing) = state
            .records
            .iter()
            .find(|r| r.original_path == record.original_path)
        {
            record.backup_file = existing.backup_file.clone();
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir)?;
        let name = unique_name(&state.names, &record.original_path);
        let file = self.dir.join(&name);
        std::fs::write(&file, &record.original_bytes)?;
        debug!("Backed up {} to {}", record.original_path.display(), file.display());

        record.backup_file = Some(file);
        state.names.insert(name, record.original_path.clone());
        state.records.push(record.clone());

        let manifest = serde_json::to_string_pretty(&state.records).map_err(io::Error::other)?;
        std::fs::write(self.dir.join(MANIFEST_FILE), manifest)?;
        Ok(())
    }

    pub fn records(&self) -> Vec<BackupRecord> {
        self.state.lock().map(|s| s.records.clone()).unwrap_or_default()
    }

    /// Read a manifest written by an earlier run.
    pub fn load_manifest(dir: &Path) -> Result<Vec<BackupRecord>> {
        let path = dir.join(MANIFEST_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CoreError::NotFound(path)),
            Err(e) => return Err(CoreError::Io(e)),
        };
        Ok(serde_json::from_str(&content)?)
    }
}

fn unique_name(taken: &BTreeMap<String, PathBuf>, original: &Path) -> String {
    let base = original
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    if !taken.contains_key(&base) {
        return base;
    }
    let (stem, ext) = match base.rfind('.') {
        Some(i) if i > 0 => (&base[..i], &base[i..]),
        _ => (base.as_str(), ""),
    };
    (2..)
        .map(|n| format!("{}-{}{}", stem, n, ext))
        .find(|candidate| !taken.contains_key(candidate))
        .unwrap_or(base.clone())
}

/// Mutual exclusion per physical path.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    /// The lock for `path`. Entries nobody else holds are dropped first, so
    /// the map only ever holds locks in use.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key).or_default().clone()
    }

    pub fn len(&self) -> usize {
        match self.locks.lock() {
            Ok(locks) => locks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub document: String,
    pub changed: bool,
    /// Elements altered or inserted.
    pub altered: usize,
    /// False in dry runs and whenever nothing was persisted.
    pub written: bool,
    pub error: Option<FailureRecord>,
}

impl MutationResult {
    fn unchanged(document: &str) -> Self {
        Self {
            document: document.to_string(),
            changed: false,
            altered: 0,
            written: false,
            error: None,
        }
    }

    fn failed(document: &str, error: &CoreError) -> Self {
        Self {
            error: Some(FailureRecord::from_error(document, error)),
            ..Self::unchanged(document)
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

pub struct MutationEngine {
    store: Arc<dyn DocumentStore>,
    backups: Arc<BackupStore>,
    locks: PathLocks,
    dry_run: bool,
}

impl MutationEngine {
    pub fn new(backups: Arc<BackupStore>) -> Self {
        Self::with_store(Arc::new(FsStore), backups)
    }

    pub fn with_store(store: Arc<dyn DocumentStore>, backups: Arc<BackupStore>) -> Self {
        Self {
            store,
            backups,
            locks: PathLocks::default(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Apply `transform` to the document at `path`.
    ///
    /// The file is either left untouched or holds the transformed output;
    /// a failed write restores the original bytes. Failures are returned in
    /// the result, never raised.
    pub fn apply(&self, path: &Path, transform: &dyn Transform) -> MutationResult {
        let label = path.display().to_string();
        let lock = self.locks.lock_for(path);
        let _guard = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let bytes = match self.store.read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                let error = if e.kind() == io::ErrorKind::NotFound {
                    CoreError::NotFound(path.to_path_buf())
                } else {
                    CoreError::write_failure(path, WriteStage::Snapshot, e)
                };
                warn!("{}", error);
                return MutationResult::failed(&label, &error);
            }
        };
        let mut backup = self.backups.snapshot(path, bytes);

        let mut document = match Document::from_bytes(&backup.original_bytes, path) {
            Ok(document) => document,
            Err(error) => {
                warn!("{}", error);
                return MutationResult::failed(&label, &error);
            }
        };

        if transform.is_applied(&document) {
            debug!("{} already applied to {}", transform.name(), label);
            return MutationResult::unchanged(&label);
        }

        let altered = transform.apply(&mut document);
        let output = document.to_html();
        if altered == 0 || output.as_bytes() == backup.original_bytes.as_slice() {
            return MutationResult::unchanged(&label);
        }

        if self.dry_run {
            debug!("Dry run: {} would alter {} elements in {}", transform.name(), altered, label);
            return MutationResult {
                changed: true,
                altered,
                ..MutationResult::unchanged(&label)
            };
        }

        if let Err(e) = self.backups.persist(&mut backup) {
            let error = CoreError::write_failure(path, WriteStage::Backup, e);
            warn!("{}", error);
            return MutationResult::failed(&label, &error);
        }

        if let Err(e) = self.store.write(path, output.as_bytes()) {
            let error = match self.store.write(path, &backup.original_bytes) {
                Ok(()) => CoreError::write_failure(path, WriteStage::Persist, e),
                Err(restore) => CoreError::RestoreFailure {
                    path: path.to_path_buf(),
                    backup: backup.backup_file.clone().unwrap_or_else(|| self.backups.dir().to_path_buf()),
                    write: e,
                    restore,
                },
            };
            warn!("{}", error);
            return MutationResult::failed(&label, &error);
        }

        info!("{}: {} altered {} elements", label, transform.name(), altered);
        MutationResult {
            document: label,
            changed: true,
            altered,
            written: true,
            error: None,
        }
    }
}
