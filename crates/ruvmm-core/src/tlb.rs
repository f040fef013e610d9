//! Translation lookaside buffer
//!
//! A tiny bounded cache of (pid, page) → frame probed before the page table
//! on every translation. Strict LRU: recency is refreshed on hits and on
//! re-inserts alike, and the coldest entry is dropped when inserting over
//! capacity.

use serde::Serialize;

use crate::addr::{FrameId, PageKey, Pid};

/// One cached translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TlbEntry {
    pub key: PageKey,
    pub frame: FrameId,
}

/// Bounded LRU translation cache.
///
/// Entries are ordered coldest first; a linear scan is the right tool at the
/// capacities this models (single digits).
#[derive(Debug, Clone)]
pub struct TlbCache {
    capacity: usize,
    entries: Vec<TlbEntry>,
}

impl TlbCache {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Configured capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Probe for `key`. A hit refreshes the entry's recency.
    pub fn lookup(&mut self, key: PageKey) -> Option<FrameId> {
        let pos = self.entries.iter().position(|e| e.key == key)?;
        let entry = self.entries.remove(pos);
        let frame = entry.frame;
        self.entries.push(entry);
        Some(frame)
    }

    /// Non-refreshing membership probe, for consistency checks.
    pub fn contains(&self, key: PageKey) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// Insert or refresh a translation; returns the entry evicted to make
    /// room, if any.
    pub fn insert(&mut self, key: PageKey, frame: FrameId) -> Option<TlbEntry> {
        if let Some(pos) = self.entries.iter().position(|e| e.key == key) {
            self.entries.remove(pos);
        }
        self.entries.push(TlbEntry { key, frame });
        if self.entries.len() > self.capacity {
            Some(self.entries.remove(0))
        } else {
            None
        }
    }

    /// Drop the entry for `key` if cached.
    pub fn invalidate(&mut self, key: PageKey) -> bool {
        match self.entries.iter().position(|e| e.key == key) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Drop every entry belonging to `pid`; returns how many were dropped.
    pub fn invalidate_pid(&mut self, pid: Pid) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.key.pid != pid);
        before - self.entries.len()
    }

    /// Entries coldest first, for snapshots.
    pub fn entries(&self) -> &[TlbEntry] {
        &self.entries
    }
}
