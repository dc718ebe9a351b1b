//! Directory tree scanning
//!
//! Unlike a sync scanner, a patch run has to see every reachable path:
//! no gitignore handling, no hidden-file filtering. Directories are
//! recorded as entries of their own so removed-directory classification
//! and archive skeletons have something to work from.

use std::path::PathBuf;

use color_eyre::Result;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::hash::ContentHash;
use crate::snapshot::TreeSnapshot;

/// What a scanned path is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    File { hash: ContentHash, size: u64 },
    Directory,
}

impl EntryKind {
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File { .. })
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// A single path under a scan root, relative to that root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Relative path plus kind, without content identity.
///
/// Cheaper than [`PathEntry`] when only the tree shape matters (staging,
/// archive entry ordering).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LayoutEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Recursive scanner for one directory tree
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk_builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false) // include dotfiles, ignore no ignore files
            .follow_links(false)
            .sort_by_file_path(Ord::cmp);
        builder
    }

    /// Scan the tree into a snapshot of every file and directory.
    ///
    /// A nonexistent root scans to the empty snapshot. Unreadable entries
    /// are skipped with a warning and the scan continues.
    ///
    /// # Errors
    /// Returns an error only for failures hashing a readable file's content.
    pub fn scan(&self) -> Result<TreeSnapshot> {
        let mut entries = Vec::new();

        if !self.root.is_dir() {
            return Ok(TreeSnapshot::empty());
        }

        for result in self.walk_builder().build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue; // the root itself
            }

            let kind = if path.is_dir() {
                EntryKind::Directory
            } else if path.is_file() {
                let size = path.metadata().map(|m| m.len()).unwrap_or(0);
                match ContentHash::from_file(path) {
                    Ok(hash) => EntryKind::File { hash, size },
                    Err(err) => {
                        warn!("skipping {}: {err}", relative.display());
                        continue;
                    }
                }
            } else {
                // broken symlink, socket, etc.
                warn!("skipping non-regular path {}", relative.display());
                continue;
            };

            entries.push(PathEntry {
                path: relative.to_path_buf(),
                kind,
            });
        }

        Ok(TreeSnapshot::from_entries(entries))
    }

    /// Scan the tree shape only, without hashing file contents.
    ///
    /// Entries come back sorted by relative path.
    ///
    /// # Errors
    /// Currently infallible in practice; kept fallible to match [`scan`](Self::scan).
    pub fn scan_layout(&self) -> Result<Vec<LayoutEntry>> {
        let mut entries = Vec::new();

        if !self.root.is_dir() {
            return Ok(entries);
        }

        for result in self.walk_builder().build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }

            if path.is_dir() || path.is_file() {
                entries.push(LayoutEntry {
                    path: relative.to_path_buf(),
                    is_dir: path.is_dir(),
                });
            }
        }

        entries.sort();
        Ok(entries)
    }
}
