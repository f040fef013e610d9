//! Translation results and step traces
//!
//! Every successful translation returns the ordered list of steps the engine
//! actually took, so a caller can show *why* an access cost what it did. The
//! trace is part of the result, not a logging side effect.

use serde::{Deserialize, Serialize};

use crate::addr::{FrameId, PageId, PageKey, PhysAddr, Pid};
use crate::policy::{Algorithm, VictimReason};

/// Whether an access reads or writes the page.
///
/// Writes mark the entry dirty after a successful translation, which is what
/// makes the write-back trace step reachable on a later eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    Read,
    Write,
}

/// One step of a translation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceStep {
    /// TLB probe outcome.
    TlbLookup { page: PageId, hit: bool },
    /// Page-table entry inspection after a TLB miss.
    PageTableLookup { page: PageId },
    /// The entry was invalid; fault handling starts.
    PageFault { page: PageId },
    /// A victim was chosen to free a frame.
    VictimSelection {
        algorithm: Algorithm,
        victim: PageKey,
        frame: FrameId,
        reason: VictimReason,
    },
    /// The victim was dirty; its contents are (notionally) written out.
    WriteBack { victim: PageKey, frame: FrameId },
    /// The faulting page was loaded into a frame.
    PageLoad { page: PageId, frame: FrameId },
    /// Final physical address composition.
    AddressCalculation {
        frame: FrameId,
        offset: u64,
        physical: PhysAddr,
    },
}

impl std::fmt::Display for TraceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceStep::TlbLookup { page, hit: true } => write!(f, "TLB hit for {page}"),
            TraceStep::TlbLookup { page, hit: false } => write!(f, "TLB miss for {page}"),
            TraceStep::PageTableLookup { page } => {
                write!(f, "Checking page table for {page}")
            }
            TraceStep::PageFault { page } => write!(f, "Page fault for {page}"),
            TraceStep::VictimSelection {
                algorithm,
                victim,
                frame,
                reason,
            } => write!(f, "{algorithm} evicts {victim} from {frame}: {reason}"),
            TraceStep::WriteBack { victim, frame } => {
                write!(f, "Writing dirty page {victim} in {frame} back to disk")
            }
            TraceStep::PageLoad { page, frame } => write!(f, "Loaded {page} into {frame}"),
            TraceStep::AddressCalculation {
                frame,
                offset,
                physical,
            } => write!(
                f,
                "Physical address {physical} = {frame} base + offset {offset:#x}"
            ),
        }
    }
}

/// Outcome of one successful translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub pid: Pid,
    pub page: PageId,
    pub offset: u64,
    pub frame: FrameId,
    pub physical_address: PhysAddr,
    pub page_fault: bool,
    pub tlb_hit: bool,
    pub trace: Vec<TraceStep>,
}
