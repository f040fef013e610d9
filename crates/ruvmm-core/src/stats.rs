//! Counters and history logs
//!
//! Global access/fault/TLB counters, the per-policy tallies used for
//! in-session comparison, and the two capped event logs. Ratios are derived
//! on read so they can never go stale between code paths.

use std::collections::VecDeque;

use serde::Serialize;

use crate::addr::{PageId, Pid};
use crate::policy::Algorithm;

/// Bounded event log.
///
/// Once the length exceeds `cap`, the oldest entries are dropped so that
/// `keep` remain. Trimming in blocks rather than per push keeps a long
/// prefix of recent history available to the analytics between trims.
#[derive(Debug, Clone)]
pub struct CappedLog<T> {
    entries: VecDeque<T>,
    cap: usize,
    keep: usize,
}

impl<T> CappedLog<T> {
    /// Create a log trimmed to `keep` entries once `cap` is exceeded.
    pub fn new(cap: usize, keep: usize) -> Self {
        debug_assert!(keep <= cap && keep > 0);
        Self {
            entries: VecDeque::new(),
            cap,
            keep,
        }
    }

    /// Append an entry, trimming if the cap is now exceeded.
    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        if self.entries.len() > self.cap {
            let excess = self.entries.len() - self.keep;
            self.entries.drain(..excess);
        }
    }

    /// Number of retained entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Iterate over the most recent `n` entries, oldest of those first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.entries
            .iter()
            .skip(self.entries.len().saturating_sub(n))
    }

    /// Clone out the retained entries, oldest first.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.entries.iter().cloned().collect()
    }
}

/// One completed access, fault or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessRecord {
    pub pid: Pid,
    pub page: PageId,
    pub tick: u64,
    pub fault: bool,
    pub tlb_hit: bool,
}

/// One page fault, with the algorithm that serviced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    pub pid: Pid,
    pub page: PageId,
    pub tick: u64,
    pub algorithm: Algorithm,
}

/// Access/fault tallies for one algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PolicyCounters {
    pub accesses: u64,
    pub page_faults: u64,
}

impl PolicyCounters {
    /// Faults per access; 0 when the policy has not run.
    pub fn fault_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.page_faults as f64 / self.accesses as f64
        }
    }

    /// Non-fault accesses per access; 1 when the policy has not run.
    pub fn hit_rate(&self) -> f64 {
        1.0 - self.fault_rate()
    }
}

/// All engine counters and logs.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub memory_accesses: u64,
    pub page_faults: u64,
    pub tlb_hits: u64,
    pub tlb_misses: u64,
    pub write_backs: u64,
    per_policy: [PolicyCounters; 4],
    pub access_log: CappedLog<AccessRecord>,
    pub fault_log: CappedLog<FaultRecord>,
}

impl EngineStats {
    /// Create zeroed stats with the given history bounds.
    pub fn new(history_cap: usize, history_keep: usize) -> Self {
        Self {
            memory_accesses: 0,
            page_faults: 0,
            tlb_hits: 0,
            tlb_misses: 0,
            write_backs: 0,
            per_policy: [PolicyCounters::default(); 4],
            access_log: CappedLog::new(history_cap, history_keep),
            fault_log: CappedLog::new(history_cap, history_keep),
        }
    }

    /// Counters for one algorithm.
    #[inline]
    pub fn policy(&self, algorithm: Algorithm) -> &PolicyCounters {
        &self.per_policy[algorithm.index()]
    }

    /// Mutable counters for one algorithm.
    #[inline]
    pub fn policy_mut(&mut self, algorithm: Algorithm) -> &mut PolicyCounters {
        &mut self.per_policy[algorithm.index()]
    }

    /// Global hit ratio: non-faulting accesses over all accesses.
    pub fn hit_ratio(&self) -> f64 {
        if self.memory_accesses == 0 {
            0.0
        } else {
            (self.memory_accesses - self.page_faults) as f64 / self.memory_accesses as f64
        }
    }

    /// TLB hit ratio over all TLB probes.
    pub fn tlb_hit_ratio(&self) -> f64 {
        let lookups = self.tlb_hits + self.tlb_misses;
        if lookups == 0 {
            0.0
        } else {
            self.tlb_hits as f64 / lookups as f64
        }
    }

    /// Log a completed access (and the fault record if it faulted).
    pub fn record_access(
        &mut self,
        pid: Pid,
        page: PageId,
        tick: u64,
        fault: bool,
        tlb_hit: bool,
        algorithm: Algorithm,
    ) {
        self.access_log.push(AccessRecord {
            pid,
            page,
            tick,
            fault,
            tlb_hit,
        });
        if fault {
            self.fault_log.push(FaultRecord {
                pid,
                page,
                tick,
                algorithm,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capped_log_trims_to_keep() {
        let mut log = CappedLog::new(200, 100);
        for i in 0..201u32 {
            log.push(i);
        }
        assert_eq!(log.len(), 100);
        // The oldest retained entry is 101: entries 0..=100 were dropped.
        assert_eq!(log.iter().next(), Some(&101));
        assert_eq!(log.iter().last(), Some(&200));
    }

    #[test]
    fn test_recent_window() {
        let mut log = CappedLog::new(10, 5);
        for i in 0..4u32 {
            log.push(i);
        }
        let recent: Vec<u32> = log.recent(2).copied().collect();
        assert_eq!(recent, vec![2, 3]);
        let all: Vec<u32> = log.recent(100).copied().collect();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_ratios_idle_and_active() {
        let mut stats = EngineStats::new(200, 100);
        assert_eq!(stats.hit_ratio(), 0.0);
        assert_eq!(stats.tlb_hit_ratio(), 0.0);

        stats.memory_accesses = 10;
        stats.page_faults = 3;
        stats.tlb_hits = 2;
        stats.tlb_misses = 8;
        assert!((stats.hit_ratio() - 0.7).abs() < 1e-9);
        assert!((stats.tlb_hit_ratio() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_policy_counters() {
        let mut stats = EngineStats::new(200, 100);
        stats.policy_mut(Algorithm::Clock).accesses = 4;
        stats.policy_mut(Algorithm::Clock).page_faults = 1;
        assert!((stats.policy(Algorithm::Clock).fault_rate() - 0.25).abs() < 1e-9);
        assert_eq!(stats.policy(Algorithm::Fifo).hit_rate(), 1.0);
    }

    #[test]
    fn test_record_access_feeds_both_logs() {
        let mut stats = EngineStats::new(200, 100);
        stats.record_access(Pid::new(1), PageId::new(0), 1, false, true, Algorithm::Fifo);
        stats.record_access(Pid::new(1), PageId::new(7), 2, true, false, Algorithm::Fifo);
        assert_eq!(stats.access_log.len(), 2);
        assert_eq!(stats.fault_log.len(), 1);
        assert_eq!(stats.fault_log.iter().next().map(|f| f.page), Some(PageId::new(7)));
    }
}
