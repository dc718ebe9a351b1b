//! Persisted change-set manifest

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};

use crate::snapshot::ChangeSet;

/// Well-known manifest file name
pub const MANIFEST_FILE: &str = "patchedFiles.json";

/// The durable serialization of a [`ChangeSet`].
///
/// The four path lists are always present, possibly empty; `version`
/// appears only when packaged output was requested. Paths use forward
/// slashes on every platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub updated: Vec<String>,
    pub new: Vec<String>,
    pub removed_directories: Vec<String>,
    pub removed_files: Vec<String>,
}

impl Manifest {
    #[must_use]
    pub fn from_changes(changes: &ChangeSet) -> Self {
        Self {
            version: changes.version.clone(),
            updated: changes.updated.iter().map(|p| slash_path(p)).collect(),
            new: changes.new_files.iter().map(|p| slash_path(p)).collect(),
            removed_directories: changes
                .removed_directories
                .iter()
                .map(|p| slash_path(p))
                .collect(),
            removed_files: changes
                .removed_files
                .iter()
                .map(|p| slash_path(p))
                .collect(),
        }
    }

    /// Write to [`MANIFEST_FILE`] inside `dir`, returning the full path.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).wrap_err("failed to serialize manifest")?;
        fs::write(&path, json)
            .wrap_err_with(|| format!("failed to write manifest {}", path.display()))?;
        Ok(path)
    }

    /// Reload a written manifest.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read manifest {}", path.display()))?;
        serde_json::from_str(&content)
            .wrap_err_with(|| format!("failed to parse manifest {}", path.display()))
    }
}

/// Render a relative path with forward slashes regardless of platform
fn slash_path(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_changes(version: Option<&str>) -> ChangeSet {
        ChangeSet {
            updated: vec![PathBuf::from("a.txt"), PathBuf::from("dir/b.txt")],
            new_files: vec![PathBuf::from("c.txt")],
            removed_files: vec![PathBuf::from("gone.txt")],
            removed_directories: vec![PathBuf::from("olddir")],
            version: version.map(String::from),
        }
    }

    #[test]
    fn round_trip_preserves_all_lists_and_version() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::from_changes(&sample_changes(Some("1.2")));

        let path = manifest.write(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), MANIFEST_FILE);

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.version.as_deref(), Some("1.2"));
        assert_eq!(loaded.updated, vec!["a.txt", "dir/b.txt"]);
        assert_eq!(loaded.new, vec!["c.txt"]);
        assert_eq!(loaded.removed_directories, vec!["olddir"]);
        assert_eq!(loaded.removed_files, vec!["gone.txt"]);
    }

    #[test]
    fn version_key_is_absent_when_not_packaging() {
        let manifest = Manifest::from_changes(&sample_changes(None));
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(!json.contains("version"));
    }

    #[test]
    fn empty_lists_are_serialized_as_empty_sequences() {
        let manifest = Manifest::from_changes(&ChangeSet::default());
        let json = serde_json::to_string(&manifest).unwrap();
        for key in ["updated", "new", "removed_directories", "removed_files"] {
            assert!(json.contains(&format!("\"{key}\":[]")), "missing {key}");
        }
    }

    #[test]
    fn nested_paths_use_forward_slashes() {
        let changes = ChangeSet {
            updated: vec![PathBuf::from("dir").join("sub").join("f.txt")],
            ..ChangeSet::default()
        };
        let manifest = Manifest::from_changes(&changes);
        assert_eq!(manifest.updated, vec!["dir/sub/f.txt"]);
    }
}
