//! Staging tree assembly
//!
//! The staging tree mirrors exactly what the new-files archive should
//! contain: the complete directory skeleton of the new tree plus the byte
//! content of every new-classified file. It lives only between scan and
//! archive, then is deleted.

use std::fs;
use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::WrapErr;

use crate::snapshot::{ChangeSet, TreeSnapshot};

/// Working-directory name of the transient staging tree
pub const STAGING_DIR: &str = "tmp";

/// Force-empty `dir`, creating it when absent.
///
/// Shared recovery for stale output and staging state left by a previous
/// run.
///
/// # Errors
/// Returns an error if the directory cannot be removed or recreated.
pub fn clear_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .wrap_err_with(|| format!("failed to clear directory {}", dir.display()))?;
    }
    fs::create_dir_all(dir)
        .wrap_err_with(|| format!("failed to create directory {}", dir.display()))?;
    Ok(())
}

/// Populate `staging_root` from the new tree.
///
/// Every directory of `snapshot` is recreated (empty ones included), then
/// every `new_files` entry of `changes` is copied in verbatim.
///
/// # Errors
/// Returns an error if a directory cannot be created or a file copy fails.
pub fn build_staging(
    new_root: &Path,
    staging_root: &Path,
    snapshot: &TreeSnapshot,
    changes: &ChangeSet,
) -> Result<()> {
    for entry in snapshot.entries() {
        if entry.kind.is_dir() {
            fs::create_dir_all(staging_root.join(&entry.path))
                .wrap_err_with(|| format!("failed to stage directory {}", entry.path.display()))?;
        }
    }

    for path in &changes.new_files {
        let dest = staging_root.join(path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to stage parent of {}", path.display()))?;
        }
        fs::copy(new_root.join(path), &dest)
            .wrap_err_with(|| format!("failed to stage {}", path.display()))?;
    }

    Ok(())
}
