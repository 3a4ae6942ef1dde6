//! Fingerprint groups produced by a walk.
//!
//! # Overview
//!
//! A [`ResultMap`] maps each [`Fingerprint`] to the files that produced it, in
//! the order the aggregator received them. That order depends on scheduling
//! and is not stable across runs.
//!
//! Views never mutate the map they are called on: [`ResultMap::filter`]
//! returns a new map and [`ResultMap::flatten`] returns a new list.
//!
//! # Example
//!
//! ```
//! use dupewalk::duplicates::{has_extension, size_greater_than, ResultMap};
//! use dupewalk::scanner::{File, FileStats, Fingerprint};
//! use std::path::PathBuf;
//!
//! let stats = |size| FileStats { size, mode: 0o644, is_file: true, is_dir: false, modified: None };
//! let mut map = ResultMap::new();
//! map.push(Fingerprint::new("a"), File::new(PathBuf::from("/x/big.pdf"), stats(5_000)));
//! map.push(Fingerprint::new("a"), File::new(PathBuf::from("/y/big.pdf"), stats(5_000)));
//! map.push(Fingerprint::new("b"), File::new(PathBuf::from("/x/small.txt"), stats(10)));
//!
//! let big_pdfs = map.filter(&[&has_extension("pdf"), &size_greater_than(1_000)]);
//! assert_eq!(big_pdfs.total_files(), 2);
//! assert_eq!(map.total_files(), 3);
//! assert_eq!(map.duplicates().count(), 1);
//! ```

use std::collections::hash_map::{self, HashMap};

use serde::Serialize;

use crate::scanner::{File, Fingerprint};

/// Predicate over a collected file. Predicates may perform I/O.
pub type FilePredicate<'a> = &'a dyn Fn(&File) -> bool;

/// Mapping from fingerprint to the files sharing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMap {
    groups: HashMap<Fingerprint, Vec<File>>,
}

impl ResultMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `file` to the group for `fingerprint`.
    pub fn push(&mut self, fingerprint: Fingerprint, file: File) {
        self.groups.entry(fingerprint).or_default().push(file);
    }

    /// Number of distinct fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the map has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Files sharing `fingerprint`.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&[File]> {
        self.groups.get(fingerprint).map(Vec::as_slice)
    }

    /// Iterate over all groups in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &[File])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Groups with two or more files.
    pub fn duplicates(&self) -> impl Iterator<Item = (&Fingerprint, &[File])> {
        self.iter().filter(|(_, files)| files.len() > 1)
    }

    /// Total number of files across all groups.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// All files as one list: each group's files in arrival order, groups in
    /// map order. Not globally sorted.
    #[must_use]
    pub fn flatten(&self) -> Vec<File> {
        self.groups.values().flatten().cloned().collect()
    }

    /// New map keeping only files that satisfy every predicate.
    ///
    /// With no predicates the result equals `self`. Groups left with no files
    /// are omitted. Each predicate runs at most once per file per call;
    /// results are not cached.
    #[must_use]
    pub fn filter(&self, predicates: &[FilePredicate<'_>]) -> Self {
        let mut filtered = Self::new();
        for (fingerprint, files) in &self.groups {
            for file in files {
                if predicates.iter().all(|keep| keep(file)) {
                    filtered.push(fingerprint.clone(), file.clone());
                }
            }
        }
        filtered
    }

    /// Summary counts for reporting.
    #[must_use]
    pub fn summary(&self) -> GroupSummary {
        let mut summary = GroupSummary {
            total_files: self.total_files(),
            groups: self.len(),
            ..GroupSummary::default()
        };
        for (_, files) in self.duplicates() {
            summary.duplicate_groups += 1;
            summary.duplicate_files += files.len() - 1;
            summary.reclaimable_bytes += files.iter().skip(1).map(|f| f.stats.size).sum::<u64>();
        }
        summary
    }
}

impl IntoIterator for ResultMap {
    type Item = (Fingerprint, Vec<File>);
    type IntoIter = hash_map::IntoIter<Fingerprint, Vec<File>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

impl FromIterator<(Fingerprint, File)> for ResultMap {
    fn from_iter<I: IntoIterator<Item = (Fingerprint, File)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (fingerprint, file) in iter {
            map.push(fingerprint, file);
        }
        map
    }
}

/// Counts derived from a [`ResultMap`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    /// Files across all groups
    pub total_files: usize,
    /// Distinct fingerprints
    pub groups: usize,
    /// Groups with 2+ files
    pub duplicate_groups: usize,
    /// Extra copies (every file in a duplicate group except the first)
    pub duplicate_files: usize,
    /// Bytes held by the extra copies
    pub reclaimable_bytes: u64,
}

/// Keep files strictly larger than `size` bytes.
pub fn size_greater_than(size: u64) -> impl Fn(&File) -> bool {
    move |file| file.stats.size > size
}

/// Keep files whose extension equals `ext` (case-insensitive, without dot).
pub fn has_extension(ext: &str) -> impl Fn(&File) -> bool {
    let ext = ext.trim_start_matches('.').to_lowercase();
    move |file| {
        file.path
            .extension()
            .is_some_and(|e| e.to_string_lossy().to_lowercase() == ext)
    }
}
