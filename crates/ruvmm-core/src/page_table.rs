//! Per-process page tables
//!
//! A process owns a dense table with one entry per declared page. An entry is
//! valid iff the page currently sits in a physical frame; everything else is
//! demand-paged in on first touch.

use serde::Serialize;

use crate::addr::{FrameId, PageId, Pid};
use crate::workset::WorkingSetWindow;

/// One page-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageTableEntry {
    pub frame: Option<FrameId>,
    pub valid: bool,
    pub dirty: bool,
    pub referenced: bool,
    pub access_tick: Option<u64>,
    pub load_tick: Option<u64>,
}

impl PageTableEntry {
    /// Entry for a page that has never been resident.
    pub const fn absent() -> Self {
        Self {
            frame: None,
            valid: false,
            dirty: false,
            referenced: false,
            access_tick: None,
            load_tick: None,
        }
    }

    /// Entry for a page made resident at `now`.
    pub fn resident(frame: FrameId, now: u64) -> Self {
        Self {
            frame: Some(frame),
            valid: true,
            dirty: false,
            referenced: true,
            access_tick: Some(now),
            load_tick: Some(now),
        }
    }

    /// Load the page into `frame` at `now`. Clears the dirty bit; the frame
    /// holds a fresh copy.
    pub fn mark_loaded(&mut self, frame: FrameId, now: u64) {
        self.frame = Some(frame);
        self.valid = true;
        self.dirty = false;
        self.referenced = true;
        self.access_tick = Some(now);
        self.load_tick = Some(now);
    }

    /// Invalidate the entry on eviction.
    pub fn mark_evicted(&mut self) {
        self.valid = false;
        self.frame = None;
    }

    /// Record an access at `now`.
    pub fn touch(&mut self, now: u64) {
        self.access_tick = Some(now);
        self.referenced = true;
    }
}

/// Dense page table: entry `i` describes page `i`.
#[derive(Debug, Clone)]
pub struct PageTable {
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    /// Table for `pages` pages, all absent.
    pub fn new(pages: u32) -> Self {
        Self {
            entries: vec![PageTableEntry::absent(); pages as usize],
        }
    }

    /// Number of pages the table covers.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table covers no pages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `page`, if the page is in range.
    #[inline]
    pub fn entry(&self, page: PageId) -> Option<&PageTableEntry> {
        self.entries.get(page.raw() as usize)
    }

    /// Mutable entry for `page`, if the page is in range.
    #[inline]
    pub fn entry_mut(&mut self, page: PageId) -> Option<&mut PageTableEntry> {
        self.entries.get_mut(page.raw() as usize)
    }

    /// All entries in page order.
    pub fn entries(&self) -> &[PageTableEntry] {
        &self.entries
    }

    /// Valid (page, entry) pairs in page order.
    pub fn resident(&self) -> impl Iterator<Item = (PageId, &PageTableEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.valid)
            .map(|(i, e)| (PageId::new(i as u32), e))
    }

    /// Count of valid entries.
    pub fn resident_count(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }
}

/// One simulated process.
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    /// Declared page count; addresses at or past `pages_needed * page_size`
    /// are segmentation faults.
    pub pages_needed: u32,
    /// Pages made resident when the process was created.
    pub allocated_pages: u32,
    pub table: PageTable,
    pub working: WorkingSetWindow,
    pub created_at: u64,
}

impl Process {
    /// Create a process with an all-absent table.
    pub fn new(pid: Pid, pages_needed: u32, workset_window: u64, created_at: u64) -> Self {
        Self {
            pid,
            pages_needed,
            allocated_pages: 0,
            table: PageTable::new(pages_needed),
            working: WorkingSetWindow::new(workset_window),
            created_at,
        }
    }

    /// Whether `page` is within the declared address space.
    #[inline]
    pub fn contains(&self, page: PageId) -> bool {
        page.raw() < self.pages_needed
    }
}
