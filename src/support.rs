//! Registry of reads supporting an assembly.
//!
//! Entries are grouped by read name. A read name may hold several entries
//! (for example a read and its realigned copy), but a given record is recorded
//! at most once per offset.

use crate::assembly::SupportedAssembly;
use crate::record::Record;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map;
use std::sync::Arc;

/// Decides whether, and where, a read supports an assembly.
///
/// Offsets are the assembly position of the read's first base and may be
/// negative or extend past the assembly end.
pub trait SupportChecker {
    fn support_index(&self, assembly: &SupportedAssembly, record: &Record) -> Option<i64>;

    fn supports_at(&self, assembly: &SupportedAssembly, record: &Record, offset: i64) -> bool;
}

/// Evidence that `record`, placed at `offset`, supports an assembly
#[derive(Debug, Clone)]
pub struct SupportEntry {
    pub record: Arc<Record>,
    pub offset: i64,
}

impl SupportEntry {
    pub fn fragment(&self) -> &str {
        self.record.name()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SupportRegistry {
    entries: FxHashMap<String, Vec<SupportEntry>>,
    count: usize,
}

impl SupportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `record` at `offset`. Returns `false` if that exact pair was already present.
    pub fn insert(&mut self, record: Arc<Record>, offset: i64) -> bool {
        let fragment = self.entries.entry(record.name().to_string()).or_default();
        if fragment
            .iter()
            .any(|entry| entry.offset == offset && *entry.record == *record)
        {
            return false;
        }
        fragment.push(SupportEntry { record, offset });
        self.count += 1;
        true
    }

    pub fn contains(&self, record: &Record) -> bool {
        self.fragment(record.name())
            .any(|entry| *entry.record == *record)
    }

    pub fn contains_at(&self, record: &Record, offset: i64) -> bool {
        self.fragment(record.name())
            .any(|entry| entry.offset == offset && *entry.record == *record)
    }

    /// Offset of the first entry recorded for `record`
    pub fn index_of(&self, record: &Record) -> Option<i64> {
        self.fragment(record.name())
            .find(|entry| *entry.record == *record)
            .map(|entry| entry.offset)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn fragments(&self) -> FxHashSet<&str> {
        self.entries
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Entries recorded under one read name
    pub fn fragment<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a SupportEntry> + 'a {
        self.entries.get(name).into_iter().flatten()
    }

    pub fn iter(&self) -> SupportIter<'_> {
        SupportIter {
            fragments: self.entries.values(),
            current: Default::default(),
            remaining: self.count,
        }
    }
}

/// Iterator over every support entry of a registry, grouped by read name.
///
/// The total number of entries is known up front. Each call to
/// [`SupportRegistry::iter`] starts over from the first entry.
#[derive(Clone)]
pub struct SupportIter<'a> {
    fragments: hash_map::Values<'a, String, Vec<SupportEntry>>,
    current: std::slice::Iter<'a, SupportEntry>,
    remaining: usize,
}

impl<'a> Iterator for SupportIter<'a> {
    type Item = &'a SupportEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                self.remaining -= 1;
                return Some(entry);
            }
            self.current = self.fragments.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SupportIter<'_> {}

impl<'a> IntoIterator for &'a SupportRegistry {
    type Item = &'a SupportEntry;
    type IntoIter = SupportIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
