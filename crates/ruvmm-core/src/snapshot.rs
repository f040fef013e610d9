//! Serializable views of engine state
//!
//! Two granularities: [`Report`] aggregates the numbers a dashboard or log
//! line wants, [`MemoryState`] dumps every slot, entry, and history record
//! for inspection. Both are plain owned structs captured from a borrow of
//! the engine, so serializing never contends with the simulation itself.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::addr::{PageKey, Pid};
use crate::engine::MemoryEngine;
use crate::page_table::PageTableEntry;
use crate::policy::Algorithm;
use crate::stats::{AccessRecord, FaultRecord};
use crate::tlb::TlbEntry;

/// One-line liveness summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineStatus {
    pub processes: usize,
    pub algorithm: Algorithm,
    pub used_frames: usize,
    pub total_frames: usize,
    pub tick: u64,
}

/// Frame-pool headline numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemInfo {
    pub total_frames: usize,
    pub used_frames: usize,
    pub free_frames: usize,
    pub page_size: u64,
    pub current_algorithm: Algorithm,
}

/// Global counters and derived ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_accesses: u64,
    pub page_faults: u64,
    pub hit_ratio: f64,
    pub tlb_hits: u64,
    pub tlb_misses: u64,
    pub tlb_hit_ratio: f64,
    pub write_backs: u64,
}

/// Per-algorithm counters accumulated while that algorithm was active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolicySummary {
    pub page_faults: u64,
    pub accesses: u64,
    pub fault_rate: f64,
    pub hit_rate: f64,
}

/// Per-process line in the report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessReport {
    pub pages_needed: u32,
    pub pages_allocated: u32,
    pub resident_pages: usize,
    pub working_set_size: usize,
}

/// Aggregate report over the whole engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub system_info: SystemInfo,
    pub performance_stats: PerformanceStats,
    pub algorithm_comparison: BTreeMap<Algorithm, PolicySummary>,
    pub working_sets: BTreeMap<Pid, usize>,
    pub thrashing_detected: bool,
    pub process_info: BTreeMap<Pid, ProcessReport>,
}

/// One physical frame slot: free, or owned by a (pid, page).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSlot {
    pub frame: u32,
    pub owner: Option<PageKey>,
}

/// Full page table plus headline fields for one process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessState {
    pub pages_needed: u32,
    pub allocated_pages: u32,
    pub working_set_size: usize,
    pub page_table: Vec<PageTableEntry>,
}

/// TLB contents (coldest first) and hit counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TlbState {
    pub entries: Vec<TlbEntry>,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
}

/// Counters plus the capped event histories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryState {
    pub memory_accesses: u64,
    pub page_faults: u64,
    pub write_backs: u64,
    pub access_log: Vec<AccessRecord>,
    pub fault_log: Vec<FaultRecord>,
}

/// Everything: the complete observable state of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryState {
    pub frames: Vec<FrameSlot>,
    pub free_frames: Vec<u32>,
    pub processes: BTreeMap<Pid, ProcessState>,
    pub tlb: TlbState,
    pub history: HistoryState,
    pub algorithm: Algorithm,
    pub tick: u64,
}

impl MemoryEngine {
    /// Capture the one-line status summary.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            processes: self.process_count(),
            algorithm: self.algorithm(),
            used_frames: self.frames().used_count(),
            total_frames: self.frames().total(),
            tick: self.current_tick(),
        }
    }

    /// Capture the aggregate report.
    pub fn report(&self) -> Report {
        let stats = self.stats();
        let algorithm_comparison = Algorithm::ALL
            .iter()
            .map(|&algorithm| {
                let counters = stats.policy(algorithm);
                (
                    algorithm,
                    PolicySummary {
                        page_faults: counters.page_faults,
                        accesses: counters.accesses,
                        fault_rate: counters.fault_rate(),
                        hit_rate: counters.hit_rate(),
                    },
                )
            })
            .collect();
        let process_info = self
            .processes()
            .map(|process| {
                (
                    process.pid,
                    ProcessReport {
                        pages_needed: process.pages_needed,
                        pages_allocated: process.allocated_pages,
                        resident_pages: process.table.resident_count(),
                        working_set_size: process.working.size(),
                    },
                )
            })
            .collect();

        Report {
            system_info: SystemInfo {
                total_frames: self.frames().total(),
                used_frames: self.frames().used_count(),
                free_frames: self.frames().free_count(),
                page_size: self.config().page_size,
                current_algorithm: self.algorithm(),
            },
            performance_stats: PerformanceStats {
                total_accesses: stats.memory_accesses,
                page_faults: stats.page_faults,
                hit_ratio: stats.hit_ratio(),
                tlb_hits: stats.tlb_hits,
                tlb_misses: stats.tlb_misses,
                tlb_hit_ratio: stats.tlb_hit_ratio(),
                write_backs: stats.write_backs,
            },
            algorithm_comparison,
            working_sets: self.working_set_sizes(),
            thrashing_detected: self.is_thrashing(),
            process_info,
        }
    }

    /// Capture the complete observable state.
    pub fn memory_state(&self) -> MemoryState {
        let stats = self.stats();
        let frames = self
            .frames()
            .slots()
            .iter()
            .enumerate()
            .map(|(idx, owner)| FrameSlot {
                frame: idx as u32,
                owner: *owner,
            })
            .collect();
        let free_frames = self
            .frames()
            .free_list()
            .iter()
            .map(|frame| frame.raw())
            .collect();
        let processes = self
            .processes()
            .map(|process| {
                (
                    process.pid,
                    ProcessState {
                        pages_needed: process.pages_needed,
                        allocated_pages: process.allocated_pages,
                        working_set_size: process.working.size(),
                        page_table: process.table.entries().to_vec(),
                    },
                )
            })
            .collect();

        MemoryState {
            frames,
            free_frames,
            processes,
            tlb: TlbState {
                entries: self.tlb().entries().to_vec(),
                capacity: self.tlb().capacity(),
                hits: stats.tlb_hits,
                misses: stats.tlb_misses,
                hit_ratio: stats.tlb_hit_ratio(),
            },
            history: HistoryState {
                memory_accesses: stats.memory_accesses,
                page_faults: stats.page_faults,
                write_backs: stats.write_backs,
                access_log: stats.access_log.to_vec(),
                fault_log: stats.fault_log.to_vec(),
            },
            algorithm: self.algorithm(),
            tick: self.current_tick(),
        }
    }
}
