//! Engine configuration
//!
//! All knobs are fixed at construction time; nothing here is runtime-mutable.
//! `Reset` rebuilds an engine from the same config it was constructed with.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Default number of physical frames in the pool.
pub const DEFAULT_PHYSICAL_FRAMES: u32 = 20;
/// Default page size in bytes.
pub const DEFAULT_PAGE_SIZE: u64 = 4096;
/// Default TLB capacity in entries.
pub const DEFAULT_TLB_CAPACITY: usize = 4;
/// Default cap on pages a single process may declare.
pub const DEFAULT_VIRTUAL_PAGE_LIMIT: u32 = 32;
/// Default working-set window in ticks.
pub const DEFAULT_WORKING_SET_WINDOW: u64 = 10;
/// Default number of recent accesses inspected for thrashing.
pub const DEFAULT_THRASH_WINDOW: usize = 20;
/// Default fault count within the window above which thrashing is flagged.
pub const DEFAULT_THRASH_THRESHOLD: usize = 10;
/// Default history length that triggers trimming.
pub const DEFAULT_HISTORY_CAP: usize = 200;
/// Default history length retained after trimming.
pub const DEFAULT_HISTORY_KEEP: usize = 100;

/// Construction-time configuration for a [`MemoryEngine`](crate::MemoryEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of physical frames shared by all processes.
    pub physical_frames: u32,
    /// Page size in bytes (power of two).
    pub page_size: u64,
    /// TLB capacity in entries.
    pub tlb_capacity: usize,
    /// Upper bound on `pages_needed` for any one process.
    pub virtual_page_limit: u32,
    /// Sliding window, in ticks, for working-set estimation.
    pub working_set_window: u64,
    /// Number of most recent accesses inspected by the thrashing detector.
    pub thrash_window: usize,
    /// Fault count within the window above which thrashing is flagged.
    pub thrash_threshold: usize,
    /// History log length that triggers trimming.
    pub history_cap: usize,
    /// History log length retained after a trim.
    pub history_keep: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            physical_frames: DEFAULT_PHYSICAL_FRAMES,
            page_size: DEFAULT_PAGE_SIZE,
            tlb_capacity: DEFAULT_TLB_CAPACITY,
            virtual_page_limit: DEFAULT_VIRTUAL_PAGE_LIMIT,
            working_set_window: DEFAULT_WORKING_SET_WINDOW,
            thrash_window: DEFAULT_THRASH_WINDOW,
            thrash_threshold: DEFAULT_THRASH_THRESHOLD,
            history_cap: DEFAULT_HISTORY_CAP,
            history_keep: DEFAULT_HISTORY_KEEP,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the physical frame count.
    pub fn with_physical_frames(mut self, frames: u32) -> Self {
        self.physical_frames = frames;
        self
    }

    /// Set the page size in bytes.
    pub fn with_page_size(mut self, size: u64) -> Self {
        self.page_size = size;
        self
    }

    /// Set the TLB capacity.
    pub fn with_tlb_capacity(mut self, capacity: usize) -> Self {
        self.tlb_capacity = capacity;
        self
    }

    /// Set the per-process virtual page limit.
    pub fn with_virtual_page_limit(mut self, limit: u32) -> Self {
        self.virtual_page_limit = limit;
        self
    }

    /// Set the working-set window in ticks.
    pub fn with_working_set_window(mut self, window: u64) -> Self {
        self.working_set_window = window;
        self
    }

    /// Set the thrashing window and threshold together.
    pub fn with_thrash_detection(mut self, window: usize, threshold: usize) -> Self {
        self.thrash_window = window;
        self.thrash_threshold = threshold;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.physical_frames == 0 {
            return Err(EngineError::InvalidConfig(
                "physical_frames must be at least 1".into(),
            ));
        }
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(EngineError::InvalidConfig(format!(
                "page_size must be a nonzero power of two, got {}",
                self.page_size
            )));
        }
        if self.tlb_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "tlb_capacity must be at least 1".into(),
            ));
        }
        if self.virtual_page_limit == 0 {
            return Err(EngineError::InvalidConfig(
                "virtual_page_limit must be at least 1".into(),
            ));
        }
        if self.working_set_window == 0 {
            return Err(EngineError::InvalidConfig(
                "working_set_window must be at least 1 tick".into(),
            ));
        }
        if self.thrash_window == 0 || self.thrash_threshold >= self.thrash_window {
            return Err(EngineError::InvalidConfig(format!(
                "thrash_threshold ({}) must be below thrash_window ({})",
                self.thrash_threshold, self.thrash_window
            )));
        }
        if self.history_keep == 0 || self.history_keep > self.history_cap {
            return Err(EngineError::InvalidConfig(format!(
                "history_keep ({}) must be in 1..={}",
                self.history_keep, self.history_cap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.physical_frames, 20);
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.tlb_capacity, 4);
    }

    #[test]
    fn test_builder_chain() {
        let config = EngineConfig::new()
            .with_physical_frames(3)
            .with_page_size(4096)
            .with_tlb_capacity(2)
            .with_virtual_page_limit(64);
        assert!(config.validate().is_ok());
        assert_eq!(config.physical_frames, 3);
        assert_eq!(config.virtual_page_limit, 64);
    }

    #[test]
    fn test_rejects_degenerate_values() {
        assert!(EngineConfig::new()
            .with_physical_frames(0)
            .validate()
            .is_err());
        assert!(EngineConfig::new().with_page_size(0).validate().is_err());
        assert!(EngineConfig::new().with_page_size(3000).validate().is_err());
        assert!(EngineConfig::new().with_tlb_capacity(0).validate().is_err());
        assert!(EngineConfig::new()
            .with_thrash_detection(10, 10)
            .validate()
            .is_err());
    }
}
