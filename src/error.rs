//! Error types for workspace resolution and version synchronization.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

/// Errors surfaced by a synchronization run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("failed to read manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: ReadFailure,
    },

    #[error("failed to write manifest {}: {source}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Broad failure class, used by the CLI to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ManifestRead,
    ManifestWrite,
    Internal,
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::ManifestRead { .. } => ErrorCategory::ManifestRead,
            Self::ManifestWrite { .. } => ErrorCategory::ManifestWrite,
            Self::Task(_) => ErrorCategory::Internal,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: impl Into<ReadFailure>) -> Self {
        Self::ManifestRead {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Why a manifest could not be loaded.
#[derive(Debug, Error)]
pub enum ReadFailure {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("top-level value is not an object")]
    NotAnObject,
}

/// Missing or malformed workspace configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no package.json found in {} or any parent directory", start.display())]
    RootManifestNotFound { start: PathBuf },

    #[error("workspaces configuration not found in {}", path.display())]
    MissingWorkspaces { path: PathBuf },

    #[error(
        "workspaces in {} must be a list of patterns or an object with a `packages` list: {reason}",
        path.display()
    )]
    InvalidWorkspaces { path: PathBuf, reason: String },

    #[error("invalid workspace pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to expand workspace pattern `{pattern}`: {source}")]
    Expansion {
        pattern: String,
        #[source]
        source: glob::GlobError,
    },

    #[error("no version given and {} has no `version` field", path.display())]
    MissingVersion { path: PathBuf },

    #[error("failed to determine current directory: {source}")]
    CurrentDir {
        #[source]
        source: std::io::Error,
    },

    #[error("no manifest files to update")]
    NoManifests,
}
