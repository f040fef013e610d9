//! Working-set estimation and thrashing detection
//!
//! Both are derived analytics: the working set falls out of a per-process
//! sliding window of recent accesses, and thrashing falls out of the fault
//! density in the tail of the global access log. Neither feeds back into
//! replacement decisions.

use std::collections::{BTreeSet, VecDeque};

use crate::addr::PageId;
use crate::stats::{AccessRecord, CappedLog};

/// Sliding window of one process's recent page accesses.
///
/// The working set is the set of distinct pages referenced within the last
/// `window` ticks; entries older than that are pruned on every update.
#[derive(Debug, Clone)]
pub struct WorkingSetWindow {
    window: u64,
    entries: VecDeque<(PageId, u64)>,
}

impl WorkingSetWindow {
    /// Create an empty window of the given width in ticks.
    pub fn new(window: u64) -> Self {
        Self {
            window,
            entries: VecDeque::new(),
        }
    }

    /// Record an access at `now` and prune expired entries.
    pub fn record(&mut self, page: PageId, now: u64) {
        self.entries.push_back((page, now));
        self.prune(now);
    }

    /// Drop entries older than the window width.
    pub fn prune(&mut self, now: u64) {
        while let Some(&(_, tick)) = self.entries.front() {
            if now.saturating_sub(tick) > self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Distinct pages currently inside the window.
    pub fn pages(&self) -> BTreeSet<PageId> {
        self.entries.iter().map(|&(page, _)| page).collect()
    }

    /// Working-set size: count of distinct pages in the window.
    pub fn size(&self) -> usize {
        self.pages().len()
    }

    /// Number of raw (page, tick) entries retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flags thrashing from the fault density of recent accesses.
///
/// The detector looks at the most recent `window` entries of the access log
/// and raises the flag while more than `threshold` of them faulted. With
/// fewer than `window` accesses on record it stays quiet.
#[derive(Debug, Clone, Copy)]
pub struct ThrashingDetector {
    window: usize,
    threshold: usize,
}

impl ThrashingDetector {
    /// Create a detector over the last `window` accesses.
    pub fn new(window: usize, threshold: usize) -> Self {
        debug_assert!(threshold < window);
        Self { window, threshold }
    }

    /// Evaluate against the access log.
    pub fn evaluate(&self, log: &CappedLog<AccessRecord>) -> bool {
        if log.len() < self.window {
            return false;
        }
        log.recent(self.window).filter(|r| r.fault).count() > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::Pid;
    use crate::policy::Algorithm;
    use crate::stats::EngineStats;

    #[test]
    fn test_window_counts_distinct_pages() {
        let mut ws = WorkingSetWindow::new(10);
        ws.record(PageId::new(0), 1);
        ws.record(PageId::new(1), 2);
        ws.record(PageId::new(0), 3);
        assert_eq!(ws.len(), 3);
        assert_eq!(ws.size(), 2);
    }

    #[test]
    fn test_window_prunes_old_entries() {
        let mut ws = WorkingSetWindow::new(10);
        ws.record(PageId::new(0), 1);
        ws.record(PageId::new(1), 5);
        // Tick 12 is beyond 1 + 10, so the first entry expires.
        ws.record(PageId::new(2), 12);
        assert_eq!(ws.size(), 2);
        assert!(!ws.pages().contains(&PageId::new(0)));

        // Pruning alone, far in the future, empties the window.
        ws.prune(100);
        assert!(ws.is_empty());
    }

    #[test]
    fn test_detector_quiet_below_full_window() {
        let mut stats = EngineStats::new(200, 100);
        let detector = ThrashingDetector::new(20, 10);
        for tick in 0..19u64 {
            stats.record_access(Pid::new(1), PageId::new(0), tick, true, false, Algorithm::Fifo);
        }
        assert!(!detector.evaluate(&stats.access_log));
    }

    #[test]
    fn test_detector_flags_fault_dense_window() {
        let mut stats = EngineStats::new(200, 100);
        let detector = ThrashingDetector::new(20, 10);
        for tick in 0..20u64 {
            let fault = tick < 11; // 11 faults, 9 hits
            stats.record_access(Pid::new(1), PageId::new(0), tick, fault, false, Algorithm::Fifo);
        }
        assert!(detector.evaluate(&stats.access_log));

        // Refill the window with hits: the flag clears.
        for tick in 20..40u64 {
            stats.record_access(Pid::new(1), PageId::new(0), tick, false, true, Algorithm::Fifo);
        }
        assert!(!detector.evaluate(&stats.access_log));
    }
}
