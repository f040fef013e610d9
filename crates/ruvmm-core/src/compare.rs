//! Policy comparison harness
//!
//! Replays one literal access trace against four isolated engines, one per
//! replacement algorithm, and reports their fault counts side by side. The
//! runs share nothing; ordering inside each run is the engine's own.

use serde::Serialize;

use crate::addr::{PageId, PageKey, Pid, VirtAddr};
use crate::config::EngineConfig;
use crate::engine::MemoryEngine;
use crate::error::Result;
use crate::policy::Algorithm;
use crate::trace::AccessKind;

/// Frame budget used when none is given; small enough that realistic traces
/// actually contend for frames.
pub const DEFAULT_COMPARISON_FRAMES: u32 = 10;

/// Outcome of one policy's run over the trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolicyOutcome {
    pub algorithm: Algorithm,
    pub page_faults: u64,
    pub accesses: u64,
    pub fault_rate: f64,
    pub hit_ratio: f64,
}

/// All four outcomes, in [`Algorithm::ALL`] order.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub frame_budget: u32,
    pub trace_len: usize,
    pub outcomes: Vec<PolicyOutcome>,
}

impl Comparison {
    /// The outcome for one algorithm.
    pub fn outcome(&self, algorithm: Algorithm) -> &PolicyOutcome {
        &self.outcomes[algorithm.index()]
    }

    /// The outcome with the fewest faults; declaration order breaks ties.
    pub fn fewest_faults(&self) -> Option<&PolicyOutcome> {
        self.outcomes
            .iter()
            .min_by_key(|outcome| outcome.page_faults)
    }
}

/// Builds a fresh engine per policy and replays the trace through each.
#[derive(Debug, Clone)]
pub struct ComparisonHarness {
    config: EngineConfig,
}

impl ComparisonHarness {
    /// Harness with the default comparison frame budget.
    pub fn new() -> Self {
        Self::with_frame_budget(DEFAULT_COMPARISON_FRAMES)
    }

    /// Harness whose engines get `frames` physical frames and defaults for
    /// everything else.
    pub fn with_frame_budget(frames: u32) -> Self {
        Self {
            config: EngineConfig::new().with_physical_frames(frames),
        }
    }

    /// Harness over a fully custom engine configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Run the trace through all four policies.
    ///
    /// Every pid referenced by the trace is pre-created with the full
    /// virtual-page allowance, so a well-formed trace can only fault pages
    /// in, never the engine. A malformed trace (out-of-range address)
    /// surfaces the engine's own error.
    pub fn run(&self, trace: &[(Pid, VirtAddr)]) -> Result<Comparison> {
        let mut outcomes = Vec::with_capacity(Algorithm::ALL.len());
        for &algorithm in Algorithm::ALL.iter() {
            outcomes.push(self.run_policy(algorithm, trace)?);
        }
        Ok(Comparison {
            frame_budget: self.config.physical_frames,
            trace_len: trace.len(),
            outcomes,
        })
    }

    fn run_policy(&self, algorithm: Algorithm, trace: &[(Pid, VirtAddr)]) -> Result<PolicyOutcome> {
        let mut engine = MemoryEngine::with_config(self.config.clone())?;
        engine.set_algorithm(algorithm);

        let mut pids: Vec<Pid> = trace.iter().map(|&(pid, _)| pid).collect();
        pids.sort_unstable();
        pids.dedup();
        let allowance = engine.config().virtual_page_limit;
        for pid in pids {
            engine.create_process(pid, allowance)?;
        }

        // Optimal wants the future as (pid, page) keys; the others ignore it.
        let lookahead: Vec<PageKey> = if algorithm == Algorithm::Optimal {
            let page_size = engine.config().page_size;
            trace
                .iter()
                .map(|&(pid, addr)| {
                    // An index past the id space can never name a resident
                    // page; clamping keeps it inert instead of wrapping it
                    // onto a live one. The replay itself still errors when
                    // it reaches such an element.
                    let index = addr.page_index(page_size).min(u64::from(u32::MAX));
                    PageKey::new(pid, PageId::new(index as u32))
                })
                .collect()
        } else {
            Vec::new()
        };

        for (position, &(pid, addr)) in trace.iter().enumerate() {
            let future = if algorithm == Algorithm::Optimal {
                Some(&lookahead[position + 1..])
            } else {
                None
            };
            engine.translate_with(pid, addr, AccessKind::Read, future)?;
        }

        let stats = engine.stats();
        Ok(PolicyOutcome {
            algorithm,
            page_faults: stats.page_faults,
            accesses: stats.memory_accesses,
            fault_rate: stats.policy(algorithm).fault_rate(),
            hit_ratio: stats.hit_ratio(),
        })
    }
}

impl Default for ComparisonHarness {
    fn default() -> Self {
        Self::new()
    }
}
