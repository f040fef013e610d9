//! Physical frame pool
//!
//! A fixed array of frame slots plus a free list kept sorted by index, so
//! reuse is deterministic first-fit: the lowest-numbered free frame is always
//! handed out next. Frames are reassigned, never created or destroyed; the
//! slot array length is the configured frame count for the engine's lifetime.

use crate::addr::{FrameId, PageKey};

/// Ownership table for the physical frame pool.
#[derive(Debug, Clone)]
pub struct FrameTable {
    /// One slot per frame: `None` if free, otherwise the owning (pid, page).
    slots: Vec<Option<PageKey>>,
    /// Free frame indices, ascending.
    free: Vec<FrameId>,
}

impl FrameTable {
    /// Create a table with `count` frames, all free.
    pub fn new(count: u32) -> Self {
        Self {
            slots: vec![None; count as usize],
            free: (0..count).map(FrameId::new).collect(),
        }
    }

    /// Total number of frames.
    #[inline]
    pub fn total(&self) -> usize {
        self.slots.len()
    }

    /// Number of free frames.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of owned frames.
    #[inline]
    pub fn used_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// The free list, ascending by index.
    #[inline]
    pub fn free_list(&self) -> &[FrameId] {
        &self.free
    }

    /// Owner of a frame, if any.
    #[inline]
    pub fn owner(&self, frame: FrameId) -> Option<PageKey> {
        self.slots.get(frame.index()).copied().flatten()
    }

    /// Take the lowest free frame and assign it to `key`.
    ///
    /// Returns `None` when the pool is exhausted; the caller must evict first.
    pub fn allocate(&mut self, key: PageKey) -> Option<FrameId> {
        if self.free.is_empty() {
            return None;
        }
        let frame = self.free.remove(0);
        debug_assert!(self.slots[frame.index()].is_none());
        self.slots[frame.index()] = Some(key);
        Some(frame)
    }

    /// Clear a frame's owner and return it to the free list.
    ///
    /// Returns the former owner; `None` if the frame was already free.
    pub fn reclaim(&mut self, frame: FrameId) -> Option<PageKey> {
        let owner = self.slots.get_mut(frame.index())?.take();
        if owner.is_some() {
            if let Err(pos) = self.free.binary_search(&frame) {
                self.free.insert(pos, frame);
            }
        }
        owner
    }

    /// Resident (frame, owner) pairs in ascending frame order.
    pub fn iter_resident(&self) -> impl Iterator<Item = (FrameId, PageKey)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.map(|key| (FrameId::new(idx as u32), key)))
    }

    /// Slot contents in frame order, for snapshots.
    pub fn slots(&self) -> &[Option<PageKey>] {
        &self.slots
    }
}
