//! Identifiers and addressing
//!
//! Newtype wrappers for the three id spaces the engine juggles (processes,
//! virtual pages, physical frames) plus the composite `PageKey` used by the
//! TLB and the replacement bookkeeping. Keeping these distinct at the type
//! level rules out the pid-for-page mixups that plague the untyped version of
//! this machinery.

use serde::{Deserialize, Serialize};

/// Process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pid(pub u32);

impl Pid {
    /// Create a new pid.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw pid value.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Pid {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<Pid> for u32 {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Virtual page number within one process's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub u32);

impl PageId {
    /// Create a new page number.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw page number.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Byte offset of this page's start within the process address space.
    #[inline]
    pub const fn byte_offset(&self, page_size: u64) -> u64 {
        self.0 as u64 * page_size
    }
}

impl From<u32> for PageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<PageId> for u32 {
    fn from(page: PageId) -> Self {
        page.0
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Page({})", self.0)
    }
}

/// Physical frame index into the fixed frame array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u32);

impl FrameId {
    /// Create a new frame index.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw frame index.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Frame index as a `usize` for slot-array indexing.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Base physical address of this frame.
    #[inline]
    pub const fn base_addr(&self, page_size: u64) -> u64 {
        self.0 as u64 * page_size
    }
}

impl From<u32> for FrameId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<FrameId> for u32 {
    fn from(frame: FrameId) -> Self {
        frame.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// Composite (pid, page) key identifying one virtual page system-wide.
///
/// This is the key space of the TLB and of all replacement bookkeeping. The
/// derived `Ord` (pid-major, page-minor) gives deterministic iteration and
/// tie-breaking wherever keys land in ordered maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    pub pid: Pid,
    pub page: PageId,
}

impl PageKey {
    /// Create a key from a pid and page number.
    #[inline]
    pub const fn new(pid: Pid, page: PageId) -> Self {
        Self { pid, page }
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.pid.0, self.page.0)
    }
}

/// Virtual address within a process address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VirtAddr(pub u64);

impl VirtAddr {
    /// Create a virtual address.
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Page index this address falls into for the given page size.
    ///
    /// Full-width quotient: a 64-bit address can index pages far beyond any
    /// id a process could own, so bounds checks compare this value and only
    /// then narrow to a [`PageId`].
    #[inline]
    pub const fn page_index(&self, page_size: u64) -> u64 {
        self.0 / page_size
    }

    /// Byte offset of this address within its page.
    #[inline]
    pub const fn page_offset(&self, page_size: u64) -> u64 {
        self.0 % page_size
    }
}

impl From<u64> for VirtAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl std::fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Physical address produced by a completed translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Compose a physical address from a frame and an in-page offset.
    #[inline]
    pub const fn compose(frame: FrameId, page_size: u64, offset: u64) -> Self {
        Self(frame.base_addr(page_size) + offset)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
