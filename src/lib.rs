//! Keep package versions in lockstep across a JavaScript workspace.
//!
//! This crate rewrites the `version` of a set of `package.json` manifests and
//! every dependency specifier that points at one of those packages, either
//! for an explicit list of files or for all packages of a workspace.

pub mod error;
pub mod manifest;
pub mod version;
pub mod workspace;

pub use error::{ConfigError, ErrorCategory, ReadFailure, Result, SyncError};
pub use manifest::{DependencyKind, DependencyUpdate, PackageManifest, MANIFEST_FILE};
pub use version::{SyncOptions, SyncReport, VersionChange, VersionSynchronizer};
pub use workspace::{GlobExpander, PatternExpander, Workspace, WorkspacePatterns, WorkspaceResolver};
