//! Workspace discovery and package manifest resolution.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::manifest::{PackageManifest, MANIFEST_FILE};

/// The `workspaces` field of a root manifest, in either accepted shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WorkspacePatterns {
    /// `"workspaces": ["packages/*"]`
    List(Vec<String>),
    /// `"workspaces": { "packages": ["packages/*"] }`
    Config { packages: Vec<String> },
}

impl WorkspacePatterns {
    /// Read the declaration from a root manifest.
    pub fn from_manifest(manifest: &PackageManifest) -> Result<Self> {
        let value = manifest
            .get("workspaces")
            .ok_or_else(|| ConfigError::MissingWorkspaces {
                path: manifest.path.clone(),
            })?;

        Self::deserialize(value).map_err(|e| {
            ConfigError::InvalidWorkspaces {
                path: manifest.path.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub fn into_patterns(self) -> Vec<String> {
        match self {
            Self::List(patterns) | Self::Config { packages: patterns } => patterns,
        }
    }
}

/// Expands a glob pattern against a base directory.
pub trait PatternExpander {
    /// Matching paths relative to `base`, in match order.
    fn expand(&self, base: &Path, pattern: &str) -> Result<Vec<PathBuf>>;
}

/// [`PatternExpander`] backed by the `glob` crate. Only directories match.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobExpander;

impl PatternExpander for GlobExpander {
    fn expand(&self, base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let escaped_base = glob::Pattern::escape(&base.to_string_lossy());
        let full_pattern = Path::new(&escaped_base).join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let entries = glob::glob(&pattern_str).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(|source| ConfigError::Expansion {
                pattern: pattern.to_string(),
                source,
            })?;

            if !path.is_dir() {
                tracing::debug!(path = %path.display(), "skipping non-directory match");
                continue;
            }

            // Joining an absolute match onto the root later yields the match
            // itself, so an unstripped path still resolves correctly.
            let relative = match path.strip_prefix(base) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => {
                    tracing::debug!(
                        path = %path.display(),
                        base = %base.display(),
                        "match outside workspace root, keeping full path"
                    );
                    path
                }
            };
            matches.push(relative);
        }

        Ok(matches)
    }
}

/// Locate the nearest `package.json` at or above `start`.
///
/// A relative `start` is resolved against the current directory first, so the
/// search continues above it.
pub fn find_root_manifest(start: impl AsRef<Path>) -> Result<PathBuf> {
    let start = absolute(start.as_ref())?;

    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_FILE))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            ConfigError::RootManifestNotFound {
                start: start.clone(),
            }
            .into()
        })
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| ConfigError::CurrentDir { source })?;
    Ok(cwd.join(path))
}

/// A resolved workspace: the root manifest and its package manifest paths.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub root_manifest: PackageManifest,
    pub manifest_paths: Vec<PathBuf>,
}

impl Workspace {
    pub fn root_manifest_path(&self) -> &Path {
        &self.root_manifest.path
    }

    /// The root manifest followed by every package manifest.
    pub fn all_manifest_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.root_manifest.path.clone())
            .chain(self.manifest_paths.iter().cloned())
            .collect()
    }
}

/// Resolves the workspace that contains a starting directory.
#[derive(Debug)]
pub struct WorkspaceResolver<E = GlobExpander> {
    start: PathBuf,
    expander: E,
}

impl WorkspaceResolver {
    /// Create a resolver that searches upward from `start`.
    pub fn new(start: impl AsRef<Path>) -> Self {
        Self::with_expander(start, GlobExpander)
    }
}

impl<E: PatternExpander> WorkspaceResolver<E> {
    pub fn with_expander(start: impl AsRef<Path>, expander: E) -> Self {
        Self {
            start: start.as_ref().to_path_buf(),
            expander,
        }
    }

    /// Find the root manifest and expand its workspace patterns into package
    /// manifest paths. Performs no writes.
    ///
    /// Matches are kept in pattern order, then match order. A directory
    /// matched by more than one pattern appears once per match.
    pub fn resolve(&self) -> Result<Workspace> {
        let root_manifest_path = find_root_manifest(&self.start)?;
        let root_manifest = PackageManifest::load_blocking(&root_manifest_path)?;
        let patterns = WorkspacePatterns::from_manifest(&root_manifest)?.into_patterns();

        let root = root_manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        tracing::debug!(root = %root.display(), ?patterns, "resolving workspace");

        let mut manifest_paths = Vec::new();
        for pattern in &patterns {
            let matches = self.expander.expand(&root, pattern)?;
            tracing::debug!(pattern, count = matches.len(), "expanded workspace pattern");
            manifest_paths.extend(
                matches
                    .into_iter()
                    .map(|dir| root.join(dir).join(MANIFEST_FILE)),
            );
        }

        Ok(Workspace {
            root,
            root_manifest,
            manifest_paths,
        })
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
