use linkmend_scanner::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The failure taxonomy carried by every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NotFound,
    ParseFailure,
    AmbiguousResolution,
    WriteFailure,
    KeyCollision,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::ParseFailure => "parse failure",
            ErrorKind::AmbiguousResolution => "ambiguous resolution",
            ErrorKind::WriteFailure => "write failure",
            ErrorKind::KeyCollision => "key collision",
        };
        f.write_str(name)
    }
}

/// Point in a mutation at which persistence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStage {
    Snapshot,
    Backup,
    Persist,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::Snapshot => f.write_str("snapshot"),
            WriteStage::Backup => f.write_str("backup"),
            WriteStage::Persist => f.write_str("persist"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Parse failure in {}: {reason}", path.display())]
    ParseFailure { path: PathBuf, reason: String },

    #[error("Ambiguous resolution for '{href}': {} candidates", candidates.len())]
    AmbiguousResolution { href: String, candidates: Vec<String> },

    #[error("Write failure for {} during {stage}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        stage: WriteStage,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Restore failed for {} after a failed write ({write}): {restore}; original bytes are in {}",
        path.display(),
        backup.display()
    )]
    RestoreFailure {
        path: PathBuf,
        backup: PathBuf,
        write: std::io::Error,
        #[source]
        restore: std::io::Error,
    },

    #[error("Basename '{basename}' is shared by {existing} and {incoming}")]
    KeyCollision {
        basename: String,
        existing: String,
        incoming: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scan error: {0}")]
    Scan(ScanError),
}

impl CoreError {
    pub fn write_failure(path: impl Into<PathBuf>, stage: WriteStage, source: std::io::Error) -> Self {
        CoreError::WriteFailure {
            path: path.into(),
            stage,
            source,
        }
    }

    /// Map onto the report taxonomy. Ambient errors (config, IO, JSON) are
    /// reported as the closest kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::ParseFailure { .. } => ErrorKind::ParseFailure,
            CoreError::AmbiguousResolution { .. } => ErrorKind::AmbiguousResolution,
            CoreError::WriteFailure { .. } | CoreError::RestoreFailure { .. } => ErrorKind::WriteFailure,
            CoreError::KeyCollision { .. } => ErrorKind::KeyCollision,
            CoreError::Config(_) | CoreError::Json(_) => ErrorKind::ParseFailure,
            CoreError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            CoreError::Io(_) => ErrorKind::WriteFailure,
            CoreError::Scan(ScanError::NotFound(_)) => ErrorKind::NotFound,
            CoreError::Scan(_) => ErrorKind::ParseFailure,
        }
    }
}

impl From<ScanError> for CoreError {
    fn from(error: ScanError) -> Self {
        match error {
            ScanError::NotFound(path) => CoreError::NotFound(path),
            ScanError::ParseFailure { path, reason } => CoreError::ParseFailure { path, reason },
            other => CoreError::Scan(other),
        }
    }
}

/// A failure as recorded in a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub document: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureRecord {
    pub fn new(document: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_error(document: impl Into<String>, error: &CoreError) -> Self {
        Self::new(document, error.kind(), error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
