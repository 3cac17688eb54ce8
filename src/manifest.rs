//! package.json parsing and manipulation utilities.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{ReadFailure, Result, SyncError};

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// The dependency blocks whose entries may point at workspace packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Normal,
    Dev,
    Peer,
    Optional,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 4] = [Self::Normal, Self::Dev, Self::Peer, Self::Optional];

    /// Field name of this block in package.json.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Normal => "dependencies",
            Self::Dev => "devDependencies",
            Self::Peer => "peerDependencies",
            Self::Optional => "optionalDependencies",
        }
    }
}

/// A single rewritten dependency specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyUpdate {
    pub name: String,
    pub kind: DependencyKind,
    pub old_specifier: Value,
    pub new_specifier: String,
}

/// A package.json file and its parsed top-level object.
///
/// Key order of the object is preserved, so rendering an unmodified manifest
/// reproduces the original field order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    pub path: PathBuf,
    contents: Map<String, Value>,
    raw: String,
}

impl PackageManifest {
    /// Read and parse a manifest from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::read(path, e))?;
        Self::parse(path, raw)
    }

    /// Blocking variant of [`PackageManifest::load`].
    pub fn load_blocking(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| SyncError::read(path, e))?;
        Self::parse(path, raw)
    }

    /// Parse manifest text that was read from `path`.
    pub fn parse(path: impl Into<PathBuf>, raw: String) -> Result<Self> {
        let path = path.into();
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => return Err(SyncError::read(path, e)),
        };

        let Value::Object(contents) = value else {
            return Err(SyncError::read(path, ReadFailure::NotAnObject));
        };

        Ok(Self {
            path,
            contents,
            raw,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.contents.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.contents.get("version").and_then(Value::as_str)
    }

    /// Raw value of a top-level field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.contents.get(field)
    }

    /// A dependency block, if present and shaped as an object.
    pub fn dependencies(&self, kind: DependencyKind) -> Option<&Map<String, Value>> {
        self.contents.get(kind.field()).and_then(Value::as_object)
    }

    /// Set the package version, keeping the field's position if it exists.
    pub fn set_version(&mut self, version: &str) {
        self.contents
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Point every entry of one dependency block that names an internal
    /// package at `version`.
    ///
    /// The block is rebuilt in its original key order. Entries for other
    /// packages keep their specifier untouched. An absent block stays absent.
    pub fn update_dependencies(
        &mut self,
        kind: DependencyKind,
        version: &str,
        internal: &HashSet<String>,
    ) -> Vec<DependencyUpdate> {
        let field = kind.field();
        let mut updates = Vec::new();

        let block = match self.contents.get(field) {
            None => return updates,
            Some(Value::Object(block)) => block,
            Some(_) => {
                tracing::warn!(
                    path = %self.path.display(),
                    field,
                    "dependency block is not an object, leaving it untouched"
                );
                return updates;
            }
        };

        let rebuilt: Map<String, Value> = block
            .iter()
            .map(|(name, specifier)| {
                if !internal.contains(name) {
                    return (name.clone(), specifier.clone());
                }
                if specifier.as_str() != Some(version) {
                    updates.push(DependencyUpdate {
                        name: name.clone(),
                        kind,
                        old_specifier: specifier.clone(),
                        new_specifier: version.to_string(),
                    });
                }
                (name.clone(), Value::String(version.to_string()))
            })
            .collect();

        self.contents.insert(field.to_string(), Value::Object(rebuilt));
        updates
    }

    /// Deterministic serialization: two-space indentation and a single
    /// trailing newline.
    pub fn render(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(&self.contents)?;
        out.push('\n');
        Ok(out)
    }

    /// Whether rendering this manifest differs from the text it was read from.
    /// A manifest that fails to render counts as modified.
    pub fn is_modified(&self) -> bool {
        self.render().map_or(true, |rendered| rendered != self.raw)
    }

    /// Replace the manifest file's contents with the rendered manifest.
    pub async fn save(&self) -> Result<()> {
        let write_error = |source| SyncError::ManifestWrite {
            path: self.path.clone(),
            source,
        };

        let rendered = self
            .render()
            .map_err(|e| write_error(std::io::Error::from(e)))?;
        tokio::fs::write(&self.path, rendered)
            .await
            .map_err(write_error)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
