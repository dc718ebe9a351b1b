//! The sequential patch pipeline
//!
//! One run: ensure roots, clear stale output, scan both trees, classify,
//! drive delta production, stage and archive new content, write the
//! manifest, assemble the package. Strictly one step after another; the
//! only external call is the delta provider, and its failure aborts the
//! run.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing::{info, warn};

use crate::archive::ArchiveBuilder;
use crate::config::PatchConfig;
use crate::delta::{DeltaProvider, delta_output_path};
use crate::manifest::{MANIFEST_FILE, Manifest};
use crate::package::{PackageAssembler, is_valid_version};
use crate::scan::Scanner;
use crate::snapshot::ChangeSet;
use crate::stage::{STAGING_DIR, build_staging, clear_dir};

/// Observer for pipeline milestones; every method defaults to a no-op
pub trait Progress {
    fn scanned(&mut self, _old_entries: usize, _new_entries: usize) {}
    fn classified(&mut self, _changes: &ChangeSet) {}
    fn delta(&mut self, _index: usize, _total: usize, _path: &Path) {}
    fn archived(&mut self, _archive: &Path, _bytes: u64) {}
    fn packaged(&mut self, _package_dir: &Path) {}
}

/// Progress sink that reports nothing
pub struct NullProgress;

impl Progress for NullProgress {}

/// What one run produced
#[derive(Debug)]
pub struct PatchSummary {
    pub changes: ChangeSet,
    pub archive_bytes: u64,
    pub manifest_path: Option<PathBuf>,
    pub package_dir: Option<PathBuf>,
}

/// Drives one reconciliation run from an immutable configuration
pub struct Patcher<P> {
    config: PatchConfig,
    provider: P,
}

impl<P: DeltaProvider> Patcher<P> {
    #[must_use]
    pub fn new(config: PatchConfig, provider: P) -> Self {
        Self { config, provider }
    }

    /// Execute the full pipeline.
    ///
    /// # Errors
    /// Returns an error on delta computation failure or any filesystem
    /// failure outside the recoverable cases (missing roots, stale output,
    /// unreadable scan entries).
    pub fn run(&self, progress: &mut dyn Progress) -> Result<PatchSummary> {
        let cfg = &self.config;
        let old_root = cfg.resolve(&cfg.old_root);
        let new_root = cfg.resolve(&cfg.new_root);
        let out_root = cfg.resolve(&cfg.out_root);
        let staging_root = cfg.working_dir.join(STAGING_DIR);
        let archive_path = cfg.working_dir.join(cfg.archive_file());
        let full_run = !cfg.manifest_only;

        ensure_root(&old_root)?;
        ensure_root(&new_root)?;

        if full_run {
            clear_dir(&out_root)?;
            clear_dir(&staging_root)?;
        }

        let old_snapshot = Scanner::new(&old_root).scan()?;
        let new_snapshot = Scanner::new(&new_root).scan()?;
        info!(
            "scanned {} old entries, {} new entries ({} bytes)",
            old_snapshot.len(),
            new_snapshot.len(),
            new_snapshot.total_file_bytes()
        );
        progress.scanned(old_snapshot.len(), new_snapshot.len());

        let version = cfg.version.as_deref().filter(|v| {
            let valid = is_valid_version(v);
            if !valid {
                warn!("version tag {v:?} is not <major>.<minor> numeric, packaging disabled");
            }
            valid
        });

        let mut changes = old_snapshot.diff(&new_snapshot);
        changes.version = version.map(String::from);
        info!(
            "classified {} updated, {} new, {} removed files, {} removed directories",
            changes.updated.len(),
            changes.new_files.len(),
            changes.removed_files.len(),
            changes.removed_directories.len()
        );
        progress.classified(&changes);

        let mut archive_bytes = 0;
        if full_run {
            let total = changes.updated.len();
            for (index, path) in changes.updated.iter().enumerate() {
                progress.delta(index, total, path);
                let output = delta_output_path(&out_root, path);
                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent).wrap_err_with(|| {
                        format!("failed to create delta directory {}", parent.display())
                    })?;
                }
                self.provider
                    .compute_delta(&old_root.join(path), &new_root.join(path), &output)?;
            }

            build_staging(&new_root, &staging_root, &new_snapshot, &changes)?;
            archive_bytes = ArchiveBuilder::new(&archive_path, cfg.gzip_level)
                .build(&staging_root)?;
            fs::remove_dir_all(&staging_root).wrap_err_with(|| {
                format!("failed to remove staging tree {}", staging_root.display())
            })?;
            progress.archived(&archive_path, archive_bytes);
        }

        let mut manifest_path = if cfg.wants_manifest() {
            Some(Manifest::from_changes(&changes).write(&cfg.working_dir)?)
        } else {
            None
        };

        let package_dir = match &changes.version {
            Some(version) => {
                let package_dir = PackageAssembler::new(&cfg.working_dir, version).assemble(
                    manifest_path.as_deref(),
                    full_run.then_some(out_root.as_path()),
                    full_run.then_some(archive_path.as_path()),
                )?;
                if manifest_path.is_some() {
                    manifest_path = Some(package_dir.join(MANIFEST_FILE));
                }
                progress.packaged(&package_dir);
                Some(package_dir)
            }
            None => None,
        };

        Ok(PatchSummary {
            changes,
            archive_bytes,
            manifest_path,
            package_dir,
        })
    }
}

/// MissingRoot recovery: an absent root becomes an empty directory
fn ensure_root(root: &Path) -> Result<()> {
    if !root.exists() {
        warn!("root {} not found, creating empty directory", root.display());
        fs::create_dir_all(root)
            .wrap_err_with(|| format!("failed to create root {}", root.display()))?;
    }
    Ok(())
}
