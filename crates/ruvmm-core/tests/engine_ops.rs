//! End-to-end engine behavior.
//!
//! These drive the public API the way an embedder would -- create, touch,
//! terminate, switch algorithms -- and check the structural invariants the
//! engine promises after every operation, using only observable state.

use ruvmm_core::{
    AccessKind, Algorithm, EngineConfig, EngineError, MemoryEngine, MemoryState, PageId, Pid,
    TraceStep, VirtAddr,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PAGE: u64 = 4096;

fn vaddr(page: u64, offset: u64) -> VirtAddr {
    VirtAddr::new(page * PAGE + offset)
}

fn engine_with_frames(frames: u32) -> MemoryEngine {
    MemoryEngine::with_config(EngineConfig::new().with_physical_frames(frames))
        .expect("valid config")
}

/// Frame conservation: free frames plus valid page-table entries must cover
/// the pool exactly, with no frame counted twice.
fn assert_conserved(state: &MemoryState) {
    let valid_entries: usize = state
        .processes
        .values()
        .map(|p| p.page_table.iter().filter(|e| e.valid).count())
        .sum();
    assert_eq!(
        state.free_frames.len() + valid_entries,
        state.frames.len(),
        "free + resident must equal total"
    );

    let owned = state.frames.iter().filter(|s| s.owner.is_some()).count();
    assert_eq!(owned, valid_entries, "slot owners must mirror valid entries");
}

/// Every TLB entry must point at a valid page-table entry with the same frame.
fn assert_tlb_consistent(state: &MemoryState) {
    for entry in &state.tlb.entries {
        let process = state
            .processes
            .get(&entry.key.pid)
            .expect("TLB entry for live process");
        let pte = &process.page_table[entry.key.page.raw() as usize];
        assert!(pte.valid, "TLB entry {} maps an invalid page", entry.key);
        assert_eq!(pte.frame, Some(entry.frame));
    }
}

// ---------------------------------------------------------------------------
// Creation and translation scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_create_process_eagerly_allocates() {
    let mut engine = MemoryEngine::new();
    engine.create_process(Pid::new(1), 4).unwrap();

    let state = engine.memory_state();
    let process = &state.processes[&Pid::new(1)];
    assert_eq!(process.allocated_pages, 4);
    assert!(process.page_table.iter().take(4).all(|e| e.valid));
    assert_conserved(&state);

    // First touch of a resident page: no fault, no TLB hit.
    let t = engine.translate(Pid::new(1), VirtAddr::new(0)).unwrap();
    assert_eq!(t.page, PageId::new(0));
    assert!(!t.page_fault);
    assert!(!t.tlb_hit);
}

#[test]
fn test_round_trip_addresses_match_page_table() {
    let mut engine = MemoryEngine::new();
    engine.create_process(Pid::new(1), 6).unwrap();

    for page in 0..6u64 {
        for offset in [0u64, 1, PAGE / 2, PAGE - 1] {
            let t = engine.translate(Pid::new(1), vaddr(page, offset)).unwrap();
            assert_eq!(t.offset, offset);
            assert_eq!(
                t.physical_address.raw(),
                t.frame.raw() as u64 * PAGE + offset
            );
        }
    }

    // The frames reported in translations must agree with the page table.
    let state = engine.memory_state();
    let process = &state.processes[&Pid::new(1)];
    for (page, entry) in process.page_table.iter().enumerate() {
        assert!(entry.valid, "page {page} should have stayed resident");
    }
    assert_tlb_consistent(&state);
}

#[test]
fn test_boundary_address_segfaults() {
    let mut engine = MemoryEngine::new();
    engine.create_process(Pid::new(1), 4).unwrap();

    // One byte below the limit resolves; the limit itself does not.
    assert!(engine.translate(Pid::new(1), VirtAddr::new(4 * PAGE - 1)).is_ok());
    let err = engine
        .translate(Pid::new(1), VirtAddr::new(4 * PAGE))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::SegmentationFault { page, .. } if page == 4
    ));
}

#[test]
fn test_huge_address_segfaults_instead_of_wrapping() {
    let mut engine = MemoryEngine::new();
    engine.create_process(Pid::new(1), 4).unwrap();

    // A page index past the u32 id space must be caught by the bounds
    // check, not wrapped back into the live range as page 0.
    let err = engine
        .translate(Pid::new(1), VirtAddr::new((1u64 << 32) * PAGE + 5))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::SegmentationFault { page, .. } if page == 1u64 << 32
    ));

    for addr in [u64::MAX, (u64::from(u32::MAX) + 4) * PAGE] {
        let err = engine.translate(Pid::new(1), VirtAddr::new(addr)).unwrap_err();
        assert!(
            matches!(err, EngineError::SegmentationFault { .. }),
            "address {addr:#x} must segfault"
        );
    }

    // Failed calls leave no counters or history behind.
    assert_eq!(engine.stats().memory_accesses, 0);
    assert!(engine.memory_state().history.access_log.is_empty());
}

#[test]
fn test_tlb_hit_on_repeat_access() {
    let mut engine = MemoryEngine::new();
    engine.create_process(Pid::new(1), 4).unwrap();

    let first = engine.translate(Pid::new(1), vaddr(2, 0)).unwrap();
    let second = engine.translate(Pid::new(1), vaddr(2, 77)).unwrap();
    assert!(!first.tlb_hit);
    assert!(second.tlb_hit);
    assert_eq!(first.frame, second.frame);
    assert_eq!(engine.stats().tlb_hits, 1);
    assert_eq!(engine.stats().tlb_misses, 1);
}

// ---------------------------------------------------------------------------
// Eviction behavior
// ---------------------------------------------------------------------------

#[test]
fn test_exhaustion_triggers_exactly_one_eviction() {
    let mut engine = engine_with_frames(4);
    engine.create_process(Pid::new(1), 2).unwrap();
    engine.create_process(Pid::new(2), 2).unwrap();
    assert_eq!(engine.frames().free_count(), 0);

    // Growing pid 1 by one page must evict exactly once.
    let t = engine.translate(Pid::new(1), vaddr(2, 0)).unwrap();
    assert!(t.page_fault);
    let evictions = t
        .trace
        .iter()
        .filter(|s| matches!(s, TraceStep::VictimSelection { .. }))
        .count();
    assert_eq!(evictions, 1);

    let state = engine.memory_state();
    assert_conserved(&state);
    assert_tlb_consistent(&state);
}

#[test]
fn test_fifo_evicts_first_loaded_page() {
    let mut engine = engine_with_frames(3);
    // Load order within the creation tick is frame order: pages 0, 1, 2.
    engine.create_process(Pid::new(1), 4).unwrap();

    let t = engine.translate(Pid::new(1), vaddr(3, 0)).unwrap();
    let victim = t.trace.iter().find_map(|s| match s {
        TraceStep::VictimSelection { victim, .. } => Some(*victim),
        _ => None,
    });
    assert_eq!(victim.map(|v| v.page), Some(PageId::new(0)));

    // The next forced eviction takes the second-loaded page.
    let t = engine.translate(Pid::new(1), vaddr(0, 0)).unwrap();
    let victim = t.trace.iter().find_map(|s| match s {
        TraceStep::VictimSelection { victim, .. } => Some(*victim),
        _ => None,
    });
    assert_eq!(victim.map(|v| v.page), Some(PageId::new(1)));
}

#[test]
fn test_dirty_victim_is_written_back() {
    let mut engine = engine_with_frames(2);
    engine.create_process(Pid::new(1), 3).unwrap();

    engine
        .translate_with(Pid::new(1), vaddr(0, 0), AccessKind::Write, None)
        .unwrap();
    let t = engine.translate(Pid::new(1), vaddr(2, 0)).unwrap();

    let steps: Vec<&TraceStep> = t.trace.iter().collect();
    let victim_at = steps
        .iter()
        .position(|s| matches!(s, TraceStep::VictimSelection { .. }))
        .expect("eviction step");
    assert!(
        matches!(steps[victim_at + 1], TraceStep::WriteBack { .. }),
        "write-back must directly follow victim selection"
    );
    assert_eq!(engine.stats().write_backs, 1);
}

// ---------------------------------------------------------------------------
// Algorithm switching
// ---------------------------------------------------------------------------

#[test]
fn test_switch_to_fifo_rebuilds_from_load_order() {
    let mut engine = engine_with_frames(3);
    engine.set_algorithm(Algorithm::Lru);
    engine.create_process(Pid::new(1), 6).unwrap();

    // Touch 0, 1, 2, then fault page 3: LRU evicts page 0.
    for page in 0..3u64 {
        engine.translate(Pid::new(1), vaddr(page, 0)).unwrap();
    }
    let t = engine.translate(Pid::new(1), vaddr(3, 0)).unwrap();
    assert!(t.page_fault);

    // Freshen page 1 so recency (1 newest) disagrees with load order
    // (1 oldest, tied with 2).
    engine.translate(Pid::new(1), vaddr(1, 0)).unwrap();
    engine.set_algorithm(Algorithm::Fifo);

    // FIFO must now follow ascending load tick: page 1, then page 2,
    // both loaded at creation, before page 3 which was just loaded.
    let t = engine.translate(Pid::new(1), vaddr(4, 0)).unwrap();
    let victim = t.trace.iter().find_map(|s| match s {
        TraceStep::VictimSelection { victim, .. } => Some(victim.page),
        _ => None,
    });
    assert_eq!(victim, Some(PageId::new(1)), "LRU would have spared page 1");

    let t = engine.translate(Pid::new(1), vaddr(5, 0)).unwrap();
    let victim = t.trace.iter().find_map(|s| match s {
        TraceStep::VictimSelection { victim, .. } => Some(victim.page),
        _ => None,
    });
    assert_eq!(victim, Some(PageId::new(2)));
}

#[test]
fn test_switch_does_not_disturb_resident_set() {
    let mut engine = engine_with_frames(5);
    engine.create_process(Pid::new(1), 5).unwrap();
    let before = engine.memory_state();

    for algorithm in Algorithm::ALL {
        engine.set_algorithm(algorithm);
        let after = engine.memory_state();
        assert_eq!(after.frames, before.frames);
        assert_eq!(after.free_frames, before.free_frames);
        assert_conserved(&after);
    }
}

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

#[test]
fn test_terminate_frees_frames_exactly_once() {
    let mut engine = MemoryEngine::new();
    engine.create_process(Pid::new(1), 5).unwrap();
    engine.create_process(Pid::new(2), 5).unwrap();
    engine.translate(Pid::new(1), vaddr(0, 0)).unwrap();

    engine.terminate_process(Pid::new(1)).unwrap();
    let state = engine.memory_state();
    assert_eq!(state.free_frames.len(), 15);
    assert!(!state.processes.contains_key(&Pid::new(1)));
    // No TLB entry may survive its process.
    assert!(state
        .tlb
        .entries
        .iter()
        .all(|entry| entry.key.pid != Pid::new(1)));
    assert_conserved(&state);
    assert_tlb_consistent(&state);

    let err = engine.terminate_process(Pid::new(1)).unwrap_err();
    assert!(matches!(err, EngineError::ProcessNotFound { .. }));
    assert_eq!(engine.memory_state().free_frames.len(), 15);
}

#[test]
fn test_terminated_frames_are_reused_lowest_first() {
    let mut engine = engine_with_frames(6);
    engine.create_process(Pid::new(1), 3).unwrap(); // frames 0..2
    engine.create_process(Pid::new(2), 3).unwrap(); // frames 3..5
    engine.terminate_process(Pid::new(1)).unwrap();

    engine.create_process(Pid::new(3), 2).unwrap();
    let state = engine.memory_state();
    assert_eq!(state.frames[0].owner.map(|k| k.pid), Some(Pid::new(3)));
    assert_eq!(state.frames[1].owner.map(|k| k.pid), Some(Pid::new(3)));
    assert_eq!(state.free_frames, vec![2]);
}

// ---------------------------------------------------------------------------
// Working set and thrashing
// ---------------------------------------------------------------------------

#[test]
fn test_working_set_counts_recent_distinct_pages() {
    let mut engine = MemoryEngine::new();
    engine.create_process(Pid::new(1), 8).unwrap();

    // Six accesses, four distinct pages, all within the 10-tick window.
    for page in [0u64, 1, 2, 1, 0, 3] {
        engine.translate(Pid::new(1), vaddr(page, 0)).unwrap();
    }
    let report = engine.report();
    assert_eq!(report.working_sets[&Pid::new(1)], 4);
}

#[test]
fn test_thrashing_flags_fault_storms_only() {
    let mut engine = engine_with_frames(2);
    engine.create_process(Pid::new(1), 12).unwrap();

    // Cyclic sweep over 12 pages with 2 frames: every access faults,
    // but the window must fill before the detector may fire.
    for i in 0..19u64 {
        engine.translate(Pid::new(1), vaddr(i % 12, 0)).unwrap();
    }
    assert!(!engine.is_thrashing(), "window not yet full");

    for i in 19..40u64 {
        engine.translate(Pid::new(1), vaddr(i % 12, 0)).unwrap();
    }
    assert!(engine.is_thrashing(), "sustained fault storm");
    assert!(engine.report().thrashing_detected);

    // A stretch of hits pushes the faults out of the window again.
    for _ in 0..30 {
        engine.translate(Pid::new(1), vaddr(0, 0)).unwrap();
        engine.translate(Pid::new(1), vaddr(1, 0)).unwrap();
    }
    assert!(!engine.is_thrashing(), "hot pages stopped faulting");
}

// ---------------------------------------------------------------------------
// Determinism and reset
// ---------------------------------------------------------------------------

#[test]
fn test_identical_runs_produce_identical_state() {
    let run = || {
        let mut engine = engine_with_frames(4);
        engine.set_algorithm(Algorithm::Lru);
        engine.create_process(Pid::new(1), 6).unwrap();
        engine.create_process(Pid::new(2), 3).unwrap();
        for page in [0u64, 3, 5, 1, 3, 0, 4, 5, 2] {
            engine.translate(Pid::new(1), vaddr(page, 8)).unwrap();
        }
        engine.terminate_process(Pid::new(2)).unwrap();
        engine.translate(Pid::new(1), vaddr(5, 0)).unwrap();
        serde_json::to_value(engine.memory_state()).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_reset_returns_to_pristine_state() {
    let mut engine = engine_with_frames(4);
    engine.create_process(Pid::new(1), 6).unwrap();
    for page in 0..6u64 {
        engine.translate(Pid::new(1), vaddr(page, 0)).unwrap();
    }
    engine.set_algorithm(Algorithm::Clock);
    engine.reset();

    let state = engine.memory_state();
    assert!(state.processes.is_empty());
    assert_eq!(state.free_frames.len(), 4);
    assert!(state.tlb.entries.is_empty());
    assert_eq!(state.history.memory_accesses, 0);
    assert!(state.history.access_log.is_empty());
    assert_eq!(state.algorithm, Algorithm::Fifo);
    assert_eq!(state.tick, 0);
}

// ---------------------------------------------------------------------------
// Mixed churn
// ---------------------------------------------------------------------------

#[test]
fn test_invariants_hold_under_churn() {
    let mut engine = engine_with_frames(6);
    engine.create_process(Pid::new(1), 8).unwrap();
    engine.create_process(Pid::new(2), 8).unwrap();

    for i in 0..120u64 {
        // Alternate pid 1 with pid 2, which is replaced by pid 3 mid-run.
        let pid = if i % 2 == 0 {
            Pid::new(1)
        } else if i < 60 {
            Pid::new(2)
        } else {
            Pid::new(3)
        };
        let pages = if pid == Pid::new(3) { 4 } else { 8 };
        engine.translate(pid, vaddr((i * 7) % pages, i % PAGE)).unwrap();

        if i == 40 {
            engine.set_algorithm(Algorithm::Clock);
        }
        if i == 59 {
            engine.terminate_process(Pid::new(2)).unwrap();
            engine.create_process(Pid::new(3), 4).unwrap();
        }
    }

    let state = engine.memory_state();
    assert_conserved(&state);
    assert_tlb_consistent(&state);
    let stats = engine.stats();
    assert_eq!(stats.tlb_hits + stats.tlb_misses, stats.memory_accesses);
}
