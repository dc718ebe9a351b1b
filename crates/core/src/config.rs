//! Run configuration (dirpatch.toml plus CLI overrides)

use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde::Deserialize;

use crate::archive::DEFAULT_GZIP_LEVEL;

/// Default configuration file name
pub const CONFIG_FILE: &str = "dirpatch.toml";

/// The single immutable configuration value for one patch run.
///
/// Constructed once at startup (config file, then CLI overrides) and passed
/// by reference to every component; nothing mutates it afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Directory holding the previous tree version
    pub old_root: PathBuf,
    /// Directory holding the next tree version
    pub new_root: PathBuf,
    /// Directory receiving per-file delta artifacts
    pub out_root: PathBuf,
    /// Base name of the new-files archive, ".tar.gz" is appended
    pub archive_name: String,
    /// Requested gzip level; out-of-range values fall back to 6 at build time
    pub gzip_level: i64,
    /// Write the patchedFiles.json manifest
    pub manifest: bool,
    /// Emit only the manifest, skipping deltas and the archive
    pub manifest_only: bool,
    /// Version tag requesting packaged output
    pub version: Option<String>,
    /// Base directory for run-relative outputs (staging, manifest, package)
    pub working_dir: PathBuf,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            old_root: "old".into(),
            new_root: "new".into(),
            out_root: "out".into(),
            archive_name: "newFiles".into(),
            gzip_level: i64::from(DEFAULT_GZIP_LEVEL),
            manifest: false,
            manifest_only: false,
            version: None,
            working_dir: ".".into(),
        }
    }
}

impl PatchConfig {
    /// Load from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("failed to parse config {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// A manifest was requested in any form
    #[must_use]
    pub fn wants_manifest(&self) -> bool {
        self.manifest || self.manifest_only
    }

    /// Archive file name including extension
    #[must_use]
    pub fn archive_file(&self) -> PathBuf {
        PathBuf::from(format!("{}.tar.gz", self.archive_name))
    }

    /// Resolve a possibly-relative path against the working directory
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn full_config_parses() {
        let toml = r#"
old_root = "v1"
new_root = "v2"
out_root = "deltas"
archive_name = "fresh"
gzip_level = 9
manifest = true
version = "1.2"
"#;
        let config: PatchConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.old_root, PathBuf::from("v1"));
        assert_eq!(config.new_root, PathBuf::from("v2"));
        assert_eq!(config.out_root, PathBuf::from("deltas"));
        assert_eq!(config.archive_name, "fresh");
        assert_eq!(config.gzip_level, 9);
        assert!(config.manifest);
        assert_eq!(config.version.as_deref(), Some("1.2"));
    }

    #[test]
    fn empty_config_gives_defaults() {
        let config: PatchConfig = toml::from_str("").unwrap();
        assert_eq!(config.old_root, PathBuf::from("old"));
        assert_eq!(config.new_root, PathBuf::from("new"));
        assert_eq!(config.out_root, PathBuf::from("out"));
        assert_eq!(config.archive_name, "newFiles");
        assert_eq!(config.gzip_level, 6);
        assert!(!config.manifest);
        assert!(!config.manifest_only);
        assert!(config.version.is_none());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PatchConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.archive_name, "newFiles");
    }

    #[test]
    fn file_on_disk_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dirpatch.toml");
        fs::write(&path, "gzip_level = 3\nmanifest = true\n").unwrap();

        let config = PatchConfig::load(&path).unwrap();
        assert_eq!(config.gzip_level, 3);
        assert!(config.manifest);
        assert_eq!(config.old_root, PathBuf::from("old"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dirpatch.toml");
        fs::write(&path, "gzip_level = \"not a table\"\nnonsense [[").unwrap();

        assert!(PatchConfig::load(&path).is_err());
    }

    #[test]
    fn manifest_only_implies_manifest() {
        let config = PatchConfig {
            manifest_only: true,
            ..PatchConfig::default()
        };
        assert!(config.wants_manifest());
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let config = PatchConfig {
            working_dir: "/work".into(),
            ..PatchConfig::default()
        };
        assert_eq!(config.resolve(Path::new("/abs/out")), PathBuf::from("/abs/out"));
        assert_eq!(config.resolve(Path::new("out")), PathBuf::from("/work/out"));
    }
}
