//! Tree snapshots and change classification

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scan::{EntryKind, PathEntry};

/// A point-in-time view of one directory tree, keyed by relative path.
///
/// Built fresh by every scan, never persisted. The `BTreeMap` keying makes
/// path uniqueness structural and iteration lexicographic, so everything
/// derived from a snapshot is deterministic without re-sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeSnapshot {
    entries: BTreeMap<PathBuf, PathEntry>,
}

impl TreeSnapshot {
    #[must_use]
    pub fn from_entries(entries: Vec<PathEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.path.clone(), e)).collect(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&PathEntry> {
        self.entries.get(path)
    }

    /// Entries in lexicographic path order
    pub fn entries(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.values()
    }

    /// Combined size of every file entry
    #[must_use]
    pub fn total_file_bytes(&self) -> u64 {
        self.entries
            .values()
            .map(|e| match &e.kind {
                EntryKind::File { size, .. } => *size,
                EntryKind::Directory => 0,
            })
            .sum()
    }

    /// Classify every path in the union of `self` (the old tree) and `new`.
    ///
    /// - file in both with differing content: `updated`
    /// - file in both with equal content: unchanged, recorded nowhere
    /// - file only in the new tree: `new_files`
    /// - file only in the old tree: `removed_files`
    /// - directory only in the old tree: `removed_directories`
    ///
    /// A path whose kind flips between the trees lands in exactly one list:
    /// dir-to-file counts as `new_files` (the file has no delta base),
    /// file-to-dir counts as `removed_files`.
    #[must_use]
    pub fn diff(&self, new: &TreeSnapshot) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for entry in new.entries() {
            let EntryKind::File { hash, .. } = &entry.kind else {
                continue;
            };
            match self.entries.get(&entry.path).map(|e| &e.kind) {
                Some(EntryKind::File { hash: old_hash, .. }) => {
                    if old_hash != hash {
                        changes.updated.push(entry.path.clone());
                    }
                }
                Some(EntryKind::Directory) | None => {
                    changes.new_files.push(entry.path.clone());
                }
            }
        }

        for entry in self.entries() {
            match &entry.kind {
                EntryKind::File { .. } => {
                    let still_a_file = matches!(
                        new.entries.get(&entry.path).map(|e| &e.kind),
                        Some(EntryKind::File { .. })
                    );
                    if !still_a_file {
                        changes.removed_files.push(entry.path.clone());
                    }
                }
                EntryKind::Directory => match new.entries.get(&entry.path).map(|e| &e.kind) {
                    Some(EntryKind::Directory) => {}
                    // a file took the path over; it is already in new_files
                    Some(EntryKind::File { .. }) => {}
                    None => changes.removed_directories.push(entry.path.clone()),
                },
            }
        }

        changes
    }
}

/// The classified result of comparing two tree snapshots.
///
/// Each list is sorted by relative path; a given path appears in at most
/// one list. `version` is set only when packaged output was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub updated: Vec<PathBuf>,
    pub new_files: Vec<PathBuf>,
    pub removed_files: Vec<PathBuf>,
    pub removed_directories: Vec<PathBuf>,
    pub version: Option<String>,
}

impl ChangeSet {
    /// Total number of classified paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.updated.len()
            + self.new_files.len()
            + self.removed_files.len()
            + self.removed_directories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ContentHash;

    fn file(path: &str, content: &[u8]) -> PathEntry {
        PathEntry {
            path: PathBuf::from(path),
            kind: EntryKind::File {
                hash: ContentHash::from_bytes(content),
                size: content.len() as u64,
            },
        }
    }

    fn dir(path: &str) -> PathEntry {
        PathEntry {
            path: PathBuf::from(path),
            kind: EntryKind::Directory,
        }
    }

    #[test]
    fn identical_trees_produce_no_changes() {
        let entries = vec![dir("d"), file("a.txt", b"a"), file("d/b.txt", b"b")];
        let old = TreeSnapshot::from_entries(entries.clone());
        let new = TreeSnapshot::from_entries(entries);

        assert!(old.diff(&new).is_empty());
    }

    #[test]
    fn changed_content_is_updated() {
        let old = TreeSnapshot::from_entries(vec![file("a.txt", b"old")]);
        let new = TreeSnapshot::from_entries(vec![file("a.txt", b"new")]);

        let changes = old.diff(&new);
        assert_eq!(changes.updated, vec![PathBuf::from("a.txt")]);
        assert!(changes.new_files.is_empty());
        assert!(changes.removed_files.is_empty());
    }

    #[test]
    fn added_file_is_new() {
        let old = TreeSnapshot::from_entries(vec![file("a.txt", b"a")]);
        let new = TreeSnapshot::from_entries(vec![file("a.txt", b"a"), file("b.txt", b"b")]);

        let changes = old.diff(&new);
        assert_eq!(changes.new_files, vec![PathBuf::from("b.txt")]);
        assert!(changes.updated.is_empty());
    }

    #[test]
    fn missing_file_and_directory_are_removed() {
        let old = TreeSnapshot::from_entries(vec![
            dir("keepdir"),
            dir("sub"),
            file("sub/x.txt", b"x"),
        ]);
        let new = TreeSnapshot::empty();

        let changes = old.diff(&new);
        assert_eq!(changes.removed_files, vec![PathBuf::from("sub/x.txt")]);
        assert_eq!(
            changes.removed_directories,
            vec![PathBuf::from("keepdir"), PathBuf::from("sub")]
        );
    }

    #[test]
    fn directory_to_file_counts_once_as_new() {
        let old = TreeSnapshot::from_entries(vec![dir("p")]);
        let new = TreeSnapshot::from_entries(vec![file("p", b"now a file")]);

        let changes = old.diff(&new);
        assert_eq!(changes.new_files, vec![PathBuf::from("p")]);
        assert!(changes.removed_directories.is_empty());
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn file_to_directory_counts_once_as_removed() {
        let old = TreeSnapshot::from_entries(vec![file("p", b"was a file")]);
        let new = TreeSnapshot::from_entries(vec![dir("p")]);

        let changes = old.diff(&new);
        assert_eq!(changes.removed_files, vec![PathBuf::from("p")]);
        assert!(changes.new_files.is_empty());
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn classification_is_mutually_exclusive() {
        let old = TreeSnapshot::from_entries(vec![
            dir("gone"),
            file("changed.txt", b"1"),
            file("deleted.txt", b"x"),
            file("same.txt", b"s"),
        ]);
        let new = TreeSnapshot::from_entries(vec![
            file("added.txt", b"a"),
            file("changed.txt", b"2"),
            file("same.txt", b"s"),
        ]);

        let changes = old.diff(&new);
        let mut all: Vec<&PathBuf> = changes
            .updated
            .iter()
            .chain(&changes.new_files)
            .chain(&changes.removed_files)
            .chain(&changes.removed_directories)
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total, "a path was classified twice");
        assert_eq!(total, 4);
        // unchanged paths are recorded nowhere
        assert!(!all.contains(&&PathBuf::from("same.txt")));
    }

    #[test]
    fn lists_are_sorted() {
        let old = TreeSnapshot::empty();
        let new = TreeSnapshot::from_entries(vec![
            file("z.txt", b"z"),
            file("a.txt", b"a"),
            file("m/n.txt", b"n"),
            dir("m"),
        ]);

        let changes = old.diff(&new);
        assert_eq!(
            changes.new_files,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("m/n.txt"),
                PathBuf::from("z.txt"),
            ]
        );
    }
}
