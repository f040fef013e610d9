//! # ruvmm-core
//!
//! Deterministic two-level memory-translation simulator: a bounded TLB in
//! front of per-process page tables over one shared pool of physical frames,
//! with demand paging and pluggable replacement policies (FIFO, LRU, Clock,
//! Optimal). Every access returns the ordered trace of steps the hardware
//! analogue would take, so the crate doubles as a teaching and
//! policy-evaluation harness.
//!
//! # Translation Path
//!
//! Each access walks one fixed path; the trace records exactly the branches
//! taken:
//!
//! ```text
//! VirtAddr -> split (page, offset) -> TLB probe ----hit----> PhysAddr
//!                                        |
//!                                      miss
//!                                        v
//!                                 page-table entry --valid--> PhysAddr (+TLB fill)
//!                                        |
//!                                     invalid
//!                                        v
//!                  page fault -> [select victim -> write back?] -> load -> PhysAddr
//! ```
//!
//! Eviction only runs when the frame pool is exhausted; victims come from the
//! active policy and never more than one per fault. Time is a logical tick
//! advanced by every operation that assigns timestamps (process creation and
//! translation), which keeps victim choice fully deterministic and
//! replayable.
//!
//! # Core Types
//!
//! | Module | Primary Type | Purpose |
//! |--------|-------------|---------|
//! | [`engine`] | [`MemoryEngine`] | Operations, fault handling, bookkeeping |
//! | [`addr`] | [`PageKey`], [`VirtAddr`] | Typed ids and address arithmetic |
//! | [`tlb`] | [`TlbCache`](tlb::TlbCache) | Bounded LRU translation cache |
//! | [`page_table`] | [`Process`](page_table::Process) | Per-process address spaces |
//! | [`frame`] | [`FrameTable`](frame::FrameTable) | Frame pool with first-fit free list |
//! | [`policy`] | [`ReplacementState`](policy::ReplacementState) | Victim selection per algorithm |
//! | [`trace`] | [`Translation`] | Per-access step traces |
//! | [`workset`] | [`WorkingSetWindow`](workset::WorkingSetWindow) | Working sets and thrashing |
//! | [`stats`] | [`EngineStats`] | Counters and capped histories |
//! | [`snapshot`] | [`Report`], [`MemoryState`] | Serializable views |
//! | [`compare`] | [`ComparisonHarness`] | Same trace, four isolated engines |
//! | [`demo`] | [`run_demo`] | Canned and random workloads |
//! | [`shared`] | [`SharedEngine`] | `Arc<Mutex>` handle for embedders |
//!
//! # Quick Start
//!
//! ```rust
//! use ruvmm_core::{Algorithm, MemoryEngine, Pid, VirtAddr};
//!
//! let mut engine = MemoryEngine::new();
//! engine.create_process(Pid::new(1), 8)?;
//!
//! let t = engine.translate(Pid::new(1), VirtAddr::new(0x2A10))?;
//! assert_eq!(t.page.raw(), 2); // 0x2A10 / 4096
//! assert_eq!(t.offset, 0xA10);
//! assert!(!t.page_fault); // created resident, only demand-grown pages fault
//!
//! engine.set_algorithm(Algorithm::Lru);
//! # Ok::<(), ruvmm_core::EngineError>(())
//! ```
//!
//! Comparing policies over one trace:
//!
//! ```rust
//! use ruvmm_core::{Algorithm, ComparisonHarness, Pid, VirtAddr};
//!
//! let trace: Vec<_> = [1u64, 2, 3, 4, 1, 2, 5, 1, 2]
//!     .iter()
//!     .map(|&page| (Pid::new(1), VirtAddr::new(page * 4096)))
//!     .collect();
//! let comparison = ComparisonHarness::with_frame_budget(3).run(&trace)?;
//! assert_eq!(comparison.outcomes.len(), 4);
//! let optimal = comparison.outcome(Algorithm::Optimal);
//! assert!(comparison.outcomes.iter().all(|o| optimal.page_faults <= o.page_faults));
//! # Ok::<(), ruvmm_core::EngineError>(())
//! ```

#![warn(clippy::all)]

pub mod addr;
pub mod compare;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod frame;
pub mod page_table;
pub mod policy;
pub mod shared;
pub mod snapshot;
pub mod stats;
pub mod tlb;
pub mod trace;
pub mod workset;

// Re-exports
pub use addr::{FrameId, PageId, PageKey, PhysAddr, Pid, VirtAddr};
pub use compare::{Comparison, ComparisonHarness, PolicyOutcome};
pub use config::EngineConfig;
pub use demo::{run_demo, run_random};
pub use engine::MemoryEngine;
pub use error::{EngineError, Result};
pub use policy::{Algorithm, VictimReason};
pub use shared::SharedEngine;
pub use snapshot::{EngineStatus, MemoryState, Report};
pub use stats::EngineStats;
pub use trace::{AccessKind, TraceStep, Translation};

/// Everything a typical embedder needs, importable in one line.
pub mod prelude {
    pub use crate::addr::{FrameId, PageId, PageKey, PhysAddr, Pid, VirtAddr};
    pub use crate::compare::ComparisonHarness;
    pub use crate::config::EngineConfig;
    pub use crate::engine::MemoryEngine;
    pub use crate::error::{EngineError, Result};
    pub use crate::policy::Algorithm;
    pub use crate::shared::SharedEngine;
    pub use crate::trace::{AccessKind, Translation};
}
