//! # Root History Index
//!
//! An append-only log of every root the global tree has held, each tagged
//! with when it became current and, once superseded, when it was replaced
//! and by which root.
//!
//! ## Invariants
//!
//! - `(created_at_timestamp, created_at_block)` never decreases along the log.
//! - Only the tail is unsealed. Appending seals the previous tail, and that
//!   single write is the only mutation an existing entry ever sees.
//! - Lookups by time or block resolve to the LAST entry whose key is at or
//!   below the query, so ties favour the most recently appended entry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gist_core::FieldElement;

use crate::error::HistoryError;

/// Default cap on a single history page.
pub const DEFAULT_RETURN_LIMIT: usize = 1000;

/// One root transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootTransitionEntry {
    pub root: FieldElement,
    pub created_at_timestamp: u64,
    pub created_at_block: u64,
    pub replaced_at_timestamp: u64,
    pub replaced_at_block: u64,
    pub replaced_by_root: FieldElement,
}

impl RootTransitionEntry {
    fn open(root: FieldElement, timestamp: u64, block: u64) -> Self {
        Self {
            root,
            created_at_timestamp: timestamp,
            created_at_block: block,
            replaced_at_timestamp: 0,
            replaced_at_block: 0,
            replaced_by_root: FieldElement::ZERO,
        }
    }
}

/// Append-only root log with binary-search lookup.
#[derive(Debug, Clone)]
pub struct RootHistoryIndex {
    entries: Vec<RootTransitionEntry>,
    root_indexes: HashMap<FieldElement, Vec<usize>>,
    return_limit: usize,
}

impl Default for RootHistoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RootHistoryIndex {
    pub fn new() -> Self {
        Self::with_return_limit(DEFAULT_RETURN_LIMIT)
    }

    pub fn with_return_limit(return_limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            root_indexes: HashMap::new(),
            return_limit,
        }
    }

    pub fn return_limit(&self) -> usize {
        self.return_limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The unsealed tail.
    pub fn latest(&self) -> Option<&RootTransitionEntry> {
        self.entries.last()
    }

    /// Check that an entry at `(timestamp, block)` may be appended.
    pub fn check_append(&self, timestamp: u64, block: u64) -> Result<(), HistoryError> {
        match self.entries.last() {
            Some(tail) if timestamp < tail.created_at_timestamp || block < tail.created_at_block => {
                Err(HistoryError::NonMonotonic {
                    last_timestamp: tail.created_at_timestamp,
                    last_block: tail.created_at_block,
                    timestamp,
                    block,
                })
            }
            _ => Ok(()),
        }
    }

    /// Append `root` and seal the previous tail.
    pub fn append(&mut self, root: FieldElement, timestamp: u64, block: u64) -> Result<(), HistoryError> {
        self.check_append(timestamp, block)?;
        if let Some(tail) = self.entries.last_mut() {
            tail.replaced_at_timestamp = timestamp;
            tail.replaced_at_block = block;
            tail.replaced_by_root = root;
        }
        self.root_indexes
            .entry(root)
            .or_default()
            .push(self.entries.len());
        self.entries
            .push(RootTransitionEntry::open(root, timestamp, block));
        Ok(())
    }

    pub fn get(&self, position: usize) -> Option<&RootTransitionEntry> {
        self.entries.get(position)
    }

    /// A page of the log in append order.
    pub fn get_history(
        &self,
        start: usize,
        length: usize,
    ) -> Result<Vec<RootTransitionEntry>, HistoryError> {
        let range = page(start, length, self.entries.len(), self.return_limit)?;
        Ok(self.entries[range].to_vec())
    }

    /// Root current at `timestamp`, or zero if the log starts later.
    pub fn root_by_time(&self, timestamp: u64) -> FieldElement {
        self.entry_by_time(timestamp)
            .map_or(FieldElement::ZERO, |e| e.root)
    }

    /// Root current at `block`, or zero if the log starts later.
    pub fn root_by_block(&self, block: u64) -> FieldElement {
        self.entry_by_block(block)
            .map_or(FieldElement::ZERO, |e| e.root)
    }

    pub fn entry_by_time(&self, timestamp: u64) -> Option<&RootTransitionEntry> {
        self.last_at_or_before(|e| e.created_at_timestamp <= timestamp)
    }

    pub fn entry_by_block(&self, block: u64) -> Option<&RootTransitionEntry> {
        self.last_at_or_before(|e| e.created_at_block <= block)
    }

    pub fn contains_root(&self, root: &FieldElement) -> bool {
        self.root_indexes.contains_key(root)
    }

    /// Latest entry for `root`.
    pub fn root_info(&self, root: &FieldElement) -> Result<&RootTransitionEntry, HistoryError> {
        self.root_indexes
            .get(root)
            .and_then(|positions| positions.last())
            .and_then(|pos| self.entries.get(*pos))
            .ok_or(HistoryError::RootNotExist(*root))
    }

    /// How many times `root` became current.
    pub fn root_info_list_length_by_root(&self, root: &FieldElement) -> usize {
        self.root_indexes.get(root).map_or(0, Vec::len)
    }

    /// A page of the entries for `root`, oldest first.
    pub fn root_info_list_by_root(
        &self,
        root: &FieldElement,
        start: usize,
        length: usize,
    ) -> Result<Vec<RootTransitionEntry>, HistoryError> {
        let positions = self
            .root_indexes
            .get(root)
            .ok_or(HistoryError::RootNotExist(*root))?;
        let range = page(start, length, positions.len(), self.return_limit)?;
        Ok(positions[range]
            .iter()
            .filter_map(|pos| self.entries.get(*pos).copied())
            .collect())
    }

    // Keys are non-decreasing, so the predicate is true on a prefix.
    fn last_at_or_before(
        &self,
        at_or_before: impl Fn(&RootTransitionEntry) -> bool,
    ) -> Option<&RootTransitionEntry> {
        let idx = self.entries.partition_point(at_or_before);
        idx.checked_sub(1).and_then(|i| self.entries.get(i))
    }
}

pub(crate) fn page(
    start: usize,
    length: usize,
    len: usize,
    limit: usize,
) -> Result<std::ops::Range<usize>, HistoryError> {
    if length == 0 {
        return Err(HistoryError::LengthZero);
    }
    if length > limit {
        return Err(HistoryError::LengthLimitExceeded {
            requested: length,
            limit,
        });
    }
    match start.checked_add(length) {
        Some(end) if end <= len => Ok(start..end),
        _ => Err(HistoryError::OutOfBounds { start, length, len }),
    }
}
