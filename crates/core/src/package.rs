//! Versioned release bundle assembly
//!
//! A package gathers everything one reconciliation run produced into a
//! single directory named from the version tag. Packaging is idempotent
//! per version: a pre-existing package directory is destroyed and rebuilt.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing::debug;

use crate::stage::clear_dir;

/// Package subdirectory that mirrors the delta output directory
pub const PACKAGE_FILES_DIR: &str = "files";

/// Accept only dot-separated numeric versions with at least two components.
///
/// `"1.2"` and `"2.10.3"` qualify; `"abc"`, `"1"`, and `"1."` do not.
#[must_use]
pub fn is_valid_version(version: &str) -> bool {
    let mut components = 0;
    for part in version.split('.') {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        components += 1;
    }
    components >= 2
}

/// Package directory name for a version tag: `"1.2"` becomes `"p1-2"`
#[must_use]
pub fn package_dir_name(version: &str) -> String {
    format!("p{}", version.replace('.', "-"))
}

/// Assembles the final versioned output directory
pub struct PackageAssembler {
    base_dir: PathBuf,
    version: String,
}

impl PackageAssembler {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            version: version.into(),
        }
    }

    /// Build the package from whatever artifacts the run produced.
    ///
    /// The manifest is moved into the package root, the delta output
    /// directory is copied to `files/`, and the archive is copied to the
    /// package root. The standalone out directory is then emptied and the
    /// standalone archive deleted, leaving the package as the single
    /// artifact of record. Returns the package directory.
    ///
    /// # Errors
    /// Returns an error on any filesystem failure while assembling.
    pub fn assemble(
        &self,
        manifest: Option<&Path>,
        out_root: Option<&Path>,
        archive: Option<&Path>,
    ) -> Result<PathBuf> {
        let package_dir = self.base_dir.join(package_dir_name(&self.version));
        debug!("assembling package {}", package_dir.display());

        if package_dir.exists() {
            fs::remove_dir_all(&package_dir).wrap_err_with(|| {
                format!("failed to replace package {}", package_dir.display())
            })?;
        }
        fs::create_dir_all(&package_dir)
            .wrap_err_with(|| format!("failed to create package {}", package_dir.display()))?;

        if let Some(manifest) = manifest {
            let name = manifest
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("manifest"));
            fs::copy(manifest, package_dir.join(name))
                .wrap_err_with(|| format!("failed to package {}", manifest.display()))?;
            fs::remove_file(manifest)
                .wrap_err_with(|| format!("failed to remove {}", manifest.display()))?;
        }

        if let Some(out_root) = out_root {
            copy_dir_recursive(out_root, &package_dir.join(PACKAGE_FILES_DIR))?;
        }

        if let Some(archive) = archive {
            let name = archive
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("archive.tar.gz"));
            fs::copy(archive, package_dir.join(name))
                .wrap_err_with(|| format!("failed to package {}", archive.display()))?;
        }

        // the package owns the artifacts now; drop the standalone copies
        if let Some(out_root) = out_root {
            clear_dir(out_root)?;
        }
        if let Some(archive) = archive {
            fs::remove_file(archive)
                .wrap_err_with(|| format!("failed to remove {}", archive.display()))?;
        }

        Ok(package_dir)
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)
        .wrap_err_with(|| format!("failed to create directory {}", dest.display()))?;
    for entry in
        fs::read_dir(src).wrap_err_with(|| format!("failed to read directory {}", src.display()))?
    {
        let entry = entry.wrap_err("failed to read directory entry")?;
        let target = dest.join(entry.file_name());
        if entry
            .file_type()
            .wrap_err("failed to read entry type")?
            .is_dir()
        {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .wrap_err_with(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}
