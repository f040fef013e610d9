//! Shared-ownership wrapper
//!
//! The engine itself is strictly sequential; `SharedEngine` is the seam for
//! embedders that need one simulation visible from several threads. It is a
//! cheap-to-clone handle that funnels whole operations through a single
//! `parking_lot::Mutex`, so observers only ever see complete transitions,
//! never a half-applied fault.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::addr::{PageKey, Pid, VirtAddr};
use crate::config::EngineConfig;
use crate::engine::MemoryEngine;
use crate::error::Result;
use crate::policy::Algorithm;
use crate::snapshot::{EngineStatus, MemoryState, Report};
use crate::trace::{AccessKind, Translation};

/// Clonable, thread-safe handle to one engine.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<MemoryEngine>>,
}

impl SharedEngine {
    /// Shared engine over the default configuration.
    pub fn new() -> Self {
        Self::from_engine(MemoryEngine::new())
    }

    /// Shared engine over a validated custom configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        Ok(Self::from_engine(MemoryEngine::with_config(config)?))
    }

    /// Wrap an already-built engine.
    pub fn from_engine(engine: MemoryEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn create_process(&self, pid: Pid, pages_needed: u32) -> Result<()> {
        self.inner.lock().create_process(pid, pages_needed)
    }

    pub fn terminate_process(&self, pid: Pid) -> Result<()> {
        self.inner.lock().terminate_process(pid)
    }

    pub fn translate(&self, pid: Pid, addr: VirtAddr) -> Result<Translation> {
        self.inner.lock().translate(pid, addr)
    }

    pub fn translate_with(
        &self,
        pid: Pid,
        addr: VirtAddr,
        kind: AccessKind,
        lookahead: Option<&[PageKey]>,
    ) -> Result<Translation> {
        self.inner.lock().translate_with(pid, addr, kind, lookahead)
    }

    pub fn set_algorithm(&self, algorithm: Algorithm) {
        self.inner.lock().set_algorithm(algorithm)
    }

    pub fn set_algorithm_by_name(&self, name: &str) -> Result<()> {
        self.inner.lock().set_algorithm_by_name(name)
    }

    pub fn reset(&self) {
        self.inner.lock().reset()
    }

    pub fn status(&self) -> EngineStatus {
        self.inner.lock().status()
    }

    pub fn report(&self) -> Report {
        self.inner.lock().report()
    }

    pub fn memory_state(&self) -> MemoryState {
        self.inner.lock().memory_state()
    }

    pub fn is_thrashing(&self) -> bool {
        self.inner.lock().is_thrashing()
    }

    /// Run several dependent calls under one lock acquisition.
    ///
    /// This is how the demo and random drivers run against a shared handle:
    /// `shared.with_engine(|engine| run_demo(engine))`.
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut MemoryEngine) -> T) -> T {
        f(&mut self.inner.lock())
    }
}

impl Default for SharedEngine {
    fn default() -> Self {
        Self::new()
    }
}
