use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Parse failure in {}: {reason}", path.display())]
    ParseFailure { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Traversal error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Task join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScanError {
    pub fn parse_failure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ScanError::ParseFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
