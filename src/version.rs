//! Version synchronization across a set of package manifests.
//!
//! A run is three strictly ordered stages. Every manifest is loaded before
//! any is transformed, and every transform finishes before the first write,
//! so a bad manifest anywhere in the set leaves all files untouched.

use std::collections::HashSet;
use std::path::PathBuf;
use tokio::task::JoinHandle;

use crate::error::{ConfigError, Result};
use crate::manifest::{DependencyKind, DependencyUpdate, PackageManifest};

/// Options for a synchronization run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Compute and report changes without writing any file.
    pub dry_run: bool,
}

/// Sets one version across a set of manifests and their internal dependencies.
#[derive(Debug, Clone)]
pub struct VersionSynchronizer {
    version: String,
    options: SyncOptions,
}

impl VersionSynchronizer {
    /// Create a synchronizer targeting `version`, used verbatim.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Load, rewrite and save every manifest in `paths`.
    ///
    /// A read or parse failure aborts before any file is written. A write
    /// failure does not undo writes that already succeeded for other files.
    pub async fn synchronize(&self, paths: &[PathBuf]) -> Result<SyncReport> {
        let (updated, report) = self.plan(paths).await?;

        if self.options.dry_run {
            tracing::info!(manifests = updated.len(), "dry run, no files written");
            return Ok(report);
        }

        persist_manifests(updated).await?;
        tracing::info!(
            manifests = report.changes.len(),
            version = %self.version,
            "synchronized versions"
        );

        Ok(SyncReport {
            written: true,
            ..report
        })
    }

    /// Report which manifests a run would rewrite, without writing any.
    pub async fn check(&self, paths: &[PathBuf]) -> Result<SyncReport> {
        let (_, report) = self.plan(paths).await?;
        Ok(report)
    }

    async fn plan(&self, paths: &[PathBuf]) -> Result<(Vec<PackageManifest>, SyncReport)> {
        if paths.is_empty() {
            return Err(ConfigError::NoManifests.into());
        }

        let loaded = load_manifests(paths).await?;
        let (updated, changes): (Vec<_>, Vec<_>) =
            update_versions(&self.version, &loaded).into_iter().unzip();

        let report = SyncReport {
            version: self.version.clone(),
            changes,
            written: false,
        };
        Ok((updated, report))
    }
}

/// Read and parse every manifest concurrently.
///
/// Results keep the order of `paths`. The first failure in that order is
/// returned.
pub async fn load_manifests(paths: &[PathBuf]) -> Result<Vec<PackageManifest>> {
    let handles: Vec<JoinHandle<Result<PackageManifest>>> = paths
        .iter()
        .cloned()
        .map(|path| tokio::spawn(async move { PackageManifest::load(path).await }))
        .collect();

    let mut manifests = Vec::with_capacity(handles.len());
    for handle in handles {
        let manifest = handle.await??;
        tracing::debug!(
            path = %manifest.path.display(),
            name = ?manifest.name(),
            "loaded manifest"
        );
        manifests.push(manifest);
    }

    Ok(manifests)
}

/// Names declared by the manifests. Manifests without a name contribute
/// nothing; duplicate names collapse.
pub fn internal_names(manifests: &[PackageManifest]) -> HashSet<String> {
    manifests
        .iter()
        .filter_map(|m| m.name().map(str::to_string))
        .collect()
}

/// Rewrite every manifest to `version`. The inputs are left untouched.
pub fn update_versions(
    version: &str,
    manifests: &[PackageManifest],
) -> Vec<(PackageManifest, VersionChange)> {
    let names = internal_names(manifests);

    manifests
        .iter()
        .map(|manifest| update_manifest(manifest, version, &names))
        .collect()
}

/// Produce an updated copy of one manifest: its own version set to
/// `version`, and every dependency on a package in `internal` pointed at it.
pub fn update_manifest(
    manifest: &PackageManifest,
    version: &str,
    internal: &HashSet<String>,
) -> (PackageManifest, VersionChange) {
    let mut updated = manifest.clone();
    updated.set_version(version);

    let dependencies: Vec<DependencyUpdate> = DependencyKind::ALL
        .iter()
        .flat_map(|&kind| updated.update_dependencies(kind, version, internal))
        .collect();

    let change = VersionChange {
        path: manifest.path.clone(),
        package: manifest.name().map(str::to_string),
        old_version: manifest.version().map(str::to_string),
        new_version: version.to_string(),
        modified: updated.is_modified(),
        dependencies,
    };

    (updated, change)
}

/// Write every manifest concurrently.
///
/// All writes are awaited even when some fail. Each failure is logged and the
/// first one, in input order, is returned.
pub async fn persist_manifests(manifests: Vec<PackageManifest>) -> Result<()> {
    let handles: Vec<JoinHandle<Result<PathBuf>>> = manifests
        .into_iter()
        .map(|manifest| {
            tokio::spawn(async move {
                manifest.save().await?;
                Ok(manifest.path)
            })
        })
        .collect();

    let mut first_error = None;
    for handle in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(path) => tracing::debug!(path = %path.display(), "wrote manifest"),
            Err(e) => {
                tracing::error!("{}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// The outcome for a single manifest.
#[derive(Debug, Clone)]
pub struct VersionChange {
    pub path: PathBuf,
    pub package: Option<String>,
    pub old_version: Option<String>,
    pub new_version: String,
    pub dependencies: Vec<DependencyUpdate>,
    /// Whether the rendered manifest differs from the file on disk.
    pub modified: bool,
}

impl VersionChange {
    /// True when a run would rewrite this manifest: the package version or an
    /// internal dependency specifier differs from the target, or the file is
    /// not in its normalized form.
    pub fn is_outdated(&self) -> bool {
        self.modified || self.is_version_drift()
    }

    /// True when the package version or an internal dependency specifier
    /// differs from the target.
    pub fn is_version_drift(&self) -> bool {
        self.old_version.as_deref() != Some(self.new_version.as_str())
            || !self.dependencies.is_empty()
    }
}

/// Report of a synchronization run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub version: String,
    pub changes: Vec<VersionChange>,
    pub written: bool,
}

impl SyncReport {
    pub fn outdated(&self) -> impl Iterator<Item = &VersionChange> {
        self.changes.iter().filter(|c| c.is_outdated())
    }

    pub fn is_in_sync(&self) -> bool {
        self.outdated().next().is_none()
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
