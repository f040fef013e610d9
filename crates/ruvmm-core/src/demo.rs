//! Canned workloads
//!
//! A fixed two-process script for walkthroughs and a seeded random driver
//! for soak-style runs. Both return the per-access translations in order so
//! callers can render the step traces.

use rand::Rng;

use crate::addr::{Pid, VirtAddr};
use crate::engine::MemoryEngine;
use crate::error::{EngineError, Result};
use crate::trace::Translation;

/// The walkthrough script: interleaved (pid, virtual address) accesses with
/// one repeat near the end.
pub const DEMO_SCRIPT: [(u32, u64); 10] = [
    (1, 0x1000),
    (1, 0x2000),
    (2, 0x1000),
    (1, 0x3000),
    (2, 0x2000),
    (1, 0x4000),
    (2, 0x3000),
    (1, 0x1000),
    (1, 0x5000),
    (2, 0x4000),
];

/// Pages granted to each demo process.
pub const DEMO_PAGES: u32 = 10;

/// Replay the fixed demo script, returning every translation in order.
///
/// An empty engine first gets pid 1 and pid 2 with [`DEMO_PAGES`] pages
/// each; an engine that already has processes is used as-is, so replaying
/// against unrelated pids surfaces the engine's own error.
pub fn run_demo(engine: &mut MemoryEngine) -> Result<Vec<Translation>> {
    if engine.process_count() == 0 {
        engine.create_process(Pid::new(1), DEMO_PAGES)?;
        engine.create_process(Pid::new(2), DEMO_PAGES)?;
    }
    let mut results = Vec::with_capacity(DEMO_SCRIPT.len());
    for (pid, addr) in DEMO_SCRIPT {
        results.push(engine.translate(Pid::new(pid), VirtAddr::new(addr))?);
    }
    Ok(results)
}

/// Perform `count` uniformly random accesses across the engine's processes.
///
/// Each access draws an existing pid, then an address inside that process's
/// page range, so a healthy engine only ever demand-faults. Fails with
/// [`EngineError::NoProcesses`] when there is no addressable process to
/// draw from.
pub fn run_random<R: Rng>(
    engine: &mut MemoryEngine,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Translation>> {
    let page_size = engine.config().page_size;
    let targets: Vec<(Pid, u64)> = engine
        .processes()
        .filter(|process| process.pages_needed > 0)
        .map(|process| (process.pid, process.pages_needed as u64 * page_size))
        .collect();
    if targets.is_empty() {
        return Err(EngineError::NoProcesses);
    }

    let mut results = Vec::with_capacity(count);
    for _ in 0..count {
        let (pid, span) = targets[rng.gen_range(0..targets.len())];
        let addr = VirtAddr::new(rng.gen_range(0..span));
        results.push(engine.translate(pid, addr)?);
    }
    Ok(results)
}
