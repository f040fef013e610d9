//! The memory engine
//!
//! `MemoryEngine` owns every moving part of the simulation — process table,
//! frame pool, TLB, replacement bookkeeping, counters — and each public
//! operation is one complete, sequential state transition over that whole.
//! Nothing here blocks, retries, or yields midway; callers that need to share
//! an engine across threads wrap it in [`SharedEngine`](crate::SharedEngine).

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::addr::{FrameId, PageId, PageKey, PhysAddr, Pid, VirtAddr};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::frame::FrameTable;
use crate::page_table::{PageTableEntry, Process};
use crate::policy::{Algorithm, ReplacementState, ResidentPage, Victim};
use crate::stats::EngineStats;
use crate::tlb::TlbCache;
use crate::trace::{AccessKind, TraceStep, Translation};
use crate::workset::ThrashingDetector;

/// The demand-paging simulation engine.
#[derive(Debug)]
pub struct MemoryEngine {
    config: EngineConfig,
    /// Logical time; advanced once per operation that assigns timestamps
    /// (process creation and translation). Failed calls never tick.
    clock: u64,
    processes: BTreeMap<Pid, Process>,
    frames: FrameTable,
    tlb: TlbCache,
    replacement: ReplacementState,
    stats: EngineStats,
    detector: ThrashingDetector,
    /// Last observed thrashing state, kept to log the onset exactly once.
    was_thrashing: bool,
}

impl MemoryEngine {
    /// Engine with the default configuration (20 frames, 4 KiB pages, 4 TLB
    /// entries) and FIFO replacement active.
    pub fn new() -> Self {
        Self::from_valid(EngineConfig::default())
    }

    /// Engine with a validated custom configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: EngineConfig) -> Self {
        Self {
            clock: 0,
            processes: BTreeMap::new(),
            frames: FrameTable::new(config.physical_frames),
            tlb: TlbCache::new(config.tlb_capacity),
            replacement: ReplacementState::for_algorithm(Algorithm::Fifo),
            stats: EngineStats::new(config.history_cap, config.history_keep),
            detector: ThrashingDetector::new(config.thrash_window, config.thrash_threshold),
            was_thrashing: false,
            config,
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Create a process and eagerly make as many of its pages resident as
    /// free frames allow.
    ///
    /// `pages_needed` is clamped to the configured virtual-page limit. Pages
    /// beyond the free-frame supply start absent and are demand-paged on
    /// first touch.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn create_process(&mut self, pid: Pid, pages_needed: u32) -> Result<()> {
        if self.processes.contains_key(&pid) {
            return Err(EngineError::ProcessAlreadyExists { pid });
        }

        let pages = pages_needed.min(self.config.virtual_page_limit);
        let now = self.advance_clock();
        let mut process = Process::new(pid, pages, self.config.working_set_window, now);

        let resident_target = (pages as usize).min(self.frames.free_count()) as u32;
        for page_no in 0..resident_target {
            let page = PageId::new(page_no);
            let key = PageKey::new(pid, page);
            if let Some(frame) = self.frames.allocate(key) {
                if let Some(entry) = process.table.entry_mut(page) {
                    *entry = PageTableEntry::resident(frame, now);
                }
                self.replacement.enroll(key, frame, now);
                process.allocated_pages += 1;
            }
        }

        info!(
            pid = pid.raw(),
            pages = pages,
            resident = process.allocated_pages,
            "created process"
        );
        self.processes.insert(pid, process);
        Ok(())
    }

    /// Terminate a process, releasing its frames and purging its TLB and
    /// replacement entries. A second call for the same pid fails with
    /// `ProcessNotFound`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn terminate_process(&mut self, pid: Pid) -> Result<()> {
        let process = self
            .processes
            .remove(&pid)
            .ok_or(EngineError::ProcessNotFound { pid })?;

        let mut freed = 0usize;
        for (_, entry) in process.table.resident() {
            if let Some(frame) = entry.frame {
                self.frames.reclaim(frame);
                freed += 1;
            }
        }
        self.replacement.remove_pid(pid);
        let tlb_dropped = self.tlb.invalidate_pid(pid);

        info!(
            pid = pid.raw(),
            freed_frames = freed,
            tlb_dropped = tlb_dropped,
            "terminated process"
        );
        Ok(())
    }

    /// Translate a read access. See [`Self::translate_with`].
    pub fn translate(&mut self, pid: Pid, addr: VirtAddr) -> Result<Translation> {
        self.translate_with(pid, addr, AccessKind::Read, None)
    }

    /// Translate one access end to end: TLB probe, page-table check, fault
    /// handling if needed, then bookkeeping and the physical address.
    ///
    /// `lookahead` is the remainder of the access trace as (pid, page) keys;
    /// only the Optimal policy consumes it. The returned [`Translation`]
    /// carries the ordered trace of the steps actually taken.
    #[tracing::instrument(level = "debug", skip(self, lookahead))]
    pub fn translate_with(
        &mut self,
        pid: Pid,
        addr: VirtAddr,
        kind: AccessKind,
        lookahead: Option<&[PageKey]>,
    ) -> Result<Translation> {
        let page_size = self.config.page_size;
        let index = addr.page_index(page_size);
        let offset = addr.page_offset(page_size);

        let limit = match self.processes.get(&pid) {
            Some(process) => process.pages_needed,
            None => return Err(EngineError::ProcessNotFound { pid }),
        };
        // Bounds check in full width; narrowing before it would let indices
        // past 2^32 wrap back into the live range.
        if index >= u64::from(limit) {
            return Err(EngineError::SegmentationFault {
                pid,
                addr,
                page: index,
                limit,
            });
        }
        let page = PageId::new(index as u32);

        let now = self.advance_clock();
        let algorithm = self.algorithm();
        self.stats.memory_accesses += 1;
        self.stats.policy_mut(algorithm).accesses += 1;

        let key = PageKey::new(pid, page);
        let mut trace = Vec::new();

        if let Some(frame) = self.tlb.lookup(key) {
            self.stats.tlb_hits += 1;
            trace.push(TraceStep::TlbLookup { page, hit: true });
            self.touch_resident(key, now);
            if matches!(kind, AccessKind::Write) {
                self.mark_dirty(key);
            }
            self.note_access(pid, page, now, false, true);
            let physical = PhysAddr::compose(frame, page_size, offset);
            trace.push(TraceStep::AddressCalculation {
                frame,
                offset,
                physical,
            });
            return Ok(Translation {
                pid,
                page,
                offset,
                frame,
                physical_address: physical,
                page_fault: false,
                tlb_hit: true,
                trace,
            });
        }

        self.stats.tlb_misses += 1;
        trace.push(TraceStep::TlbLookup { page, hit: false });
        trace.push(TraceStep::PageTableLookup { page });

        let mut faulted = false;
        if !self.entry_is_valid(key) {
            faulted = true;
            self.stats.page_faults += 1;
            self.stats.policy_mut(algorithm).page_faults += 1;
            trace.push(TraceStep::PageFault { page });
            self.handle_page_fault(key, now, lookahead, &mut trace);
        }

        let frame = match self.entry_frame(key) {
            Some(frame) => frame,
            None => {
                // Unreachable while the frame-conservation invariant holds.
                warn!(pid = pid.raw(), page = page.raw(), "fault produced no frame");
                return Err(EngineError::PageFaultUnrecoverable { pid, page });
            }
        };

        self.touch_resident(key, now);
        self.tlb.insert(key, frame);
        if matches!(kind, AccessKind::Write) {
            self.mark_dirty(key);
        }
        self.note_access(pid, page, now, faulted, false);

        let physical = PhysAddr::compose(frame, page_size, offset);
        trace.push(TraceStep::AddressCalculation {
            frame,
            offset,
            physical,
        });
        Ok(Translation {
            pid,
            page,
            offset,
            frame,
            physical_address: physical,
            page_fault: faulted,
            tlb_hit: false,
            trace,
        })
    }

    /// Switch the replacement algorithm, rebuilding its bookkeeping from the
    /// pages currently resident (not from history).
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        let residents = self.collect_residents();
        self.replacement = ReplacementState::rebuild(algorithm, &residents);
        info!(
            algorithm = %algorithm,
            resident = residents.len(),
            "switched replacement algorithm"
        );
    }

    /// Switch the replacement algorithm by name ("FIFO", "LRU", "Clock",
    /// "Optimal", case-insensitive).
    pub fn set_algorithm_by_name(&mut self, name: &str) -> Result<()> {
        let algorithm: Algorithm = name.parse()?;
        self.set_algorithm(algorithm);
        Ok(())
    }

    /// Discard all state and rebuild from the construction-time config.
    pub fn reset(&mut self) {
        let config = self.config.clone();
        *self = Self::from_valid(config);
        info!("engine reset");
    }

    // ------------------------------------------------------------------
    // Fault handling
    // ------------------------------------------------------------------

    fn handle_page_fault(
        &mut self,
        key: PageKey,
        now: u64,
        lookahead: Option<&[PageKey]>,
        trace: &mut Vec<TraceStep>,
    ) {
        if self.frames.free_count() == 0 {
            let residents = self.collect_residents();
            match self
                .replacement
                .select_victim(&self.frames, &residents, lookahead)
            {
                Some(victim) => self.evict(victim, trace),
                // Only possible with nothing resident, i.e. never while a
                // fault has no free frame to use.
                None => warn!(key = %key, "no eviction victim available"),
            }
        }

        if let Some(frame) = self.frames.allocate(key) {
            if let Some(entry) = self.entry_mut(key) {
                entry.mark_loaded(frame, now);
            }
            self.replacement.enroll(key, frame, now);
            trace.push(TraceStep::PageLoad {
                page: key.page,
                frame,
            });
            debug!(key = %key, frame = frame.raw(), "loaded page");
        }
    }

    fn evict(&mut self, victim: Victim, trace: &mut Vec<TraceStep>) {
        trace.push(TraceStep::VictimSelection {
            algorithm: self.algorithm(),
            victim: victim.key,
            frame: victim.frame,
            reason: victim.reason,
        });

        let mut dirty = false;
        if let Some(entry) = self.entry_mut(victim.key) {
            dirty = entry.dirty;
            entry.mark_evicted();
        }
        if dirty {
            self.stats.write_backs += 1;
            trace.push(TraceStep::WriteBack {
                victim: victim.key,
                frame: victim.frame,
            });
        }

        self.frames.reclaim(victim.frame);
        self.tlb.invalidate(victim.key);
        debug!(
            victim = %victim.key,
            frame = victim.frame.raw(),
            reason = %victim.reason,
            "evicted page"
        );
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn advance_clock(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn collect_residents(&self) -> Vec<ResidentPage> {
        self.frames
            .iter_resident()
            .map(|(frame, key)| {
                let (load_tick, access_tick) = self
                    .processes
                    .get(&key.pid)
                    .and_then(|p| p.table.entry(key.page))
                    .map(|e| (e.load_tick.unwrap_or(0), e.access_tick.unwrap_or(0)))
                    .unwrap_or((0, 0));
                ResidentPage {
                    frame,
                    key,
                    load_tick,
                    access_tick,
                }
            })
            .collect()
    }

    fn entry_is_valid(&self, key: PageKey) -> bool {
        self.processes
            .get(&key.pid)
            .and_then(|p| p.table.entry(key.page))
            .map_or(false, |e| e.valid)
    }

    fn entry_frame(&self, key: PageKey) -> Option<FrameId> {
        self.processes
            .get(&key.pid)
            .and_then(|p| p.table.entry(key.page))
            .filter(|e| e.valid)
            .and_then(|e| e.frame)
    }

    fn entry_mut(&mut self, key: PageKey) -> Option<&mut PageTableEntry> {
        self.processes
            .get_mut(&key.pid)
            .and_then(|p| p.table.entry_mut(key.page))
    }

    fn touch_resident(&mut self, key: PageKey, now: u64) {
        if let Some(entry) = self.entry_mut(key) {
            entry.touch(now);
        }
        self.replacement.touch(key, now);
    }

    fn mark_dirty(&mut self, key: PageKey) {
        if let Some(entry) = self.entry_mut(key) {
            entry.dirty = true;
        }
    }

    fn note_access(&mut self, pid: Pid, page: PageId, now: u64, fault: bool, tlb_hit: bool) {
        let algorithm = self.algorithm();
        self.stats
            .record_access(pid, page, now, fault, tlb_hit, algorithm);
        if let Some(process) = self.processes.get_mut(&pid) {
            process.working.record(page, now);
        }
        let thrashing = self.detector.evaluate(&self.stats.access_log);
        if thrashing && !self.was_thrashing {
            warn!(
                window = self.config.thrash_window,
                threshold = self.config.thrash_threshold,
                "thrashing detected"
            );
        }
        self.was_thrashing = thrashing;
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// The construction-time configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The active replacement algorithm, read from the policy state itself.
    pub fn algorithm(&self) -> Algorithm {
        self.replacement.algorithm()
    }

    /// Current logical time.
    pub fn current_tick(&self) -> u64 {
        self.clock
    }

    /// Counter and history state.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// The TLB.
    pub fn tlb(&self) -> &TlbCache {
        &self.tlb
    }

    /// The frame pool.
    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    /// A process by pid.
    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// All processes in pid order.
    pub fn processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// Number of live processes.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Whether the recent access window qualifies as thrashing.
    pub fn is_thrashing(&self) -> bool {
        self.detector.evaluate(&self.stats.access_log)
    }

    /// Current working-set size per process.
    pub fn working_set_sizes(&self) -> BTreeMap<Pid, usize> {
        self.processes
            .iter()
            .map(|(pid, p)| (*pid, p.working.size()))
            .collect()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}
