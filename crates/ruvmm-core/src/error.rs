//! Error types for the simulation engine

use crate::addr::{PageId, Pid, VirtAddr};
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// All of these are recoverable: the engine stays internally consistent after
/// any failure, and a failed operation leaves no partial mutation behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Process {pid} not found")]
    ProcessNotFound { pid: Pid },

    #[error("Process {pid} already exists")]
    ProcessAlreadyExists { pid: Pid },

    #[error("Segmentation fault: address {addr} maps to page {page} but {pid} owns {limit} pages")]
    SegmentationFault {
        pid: Pid,
        addr: VirtAddr,
        /// Raw page index; kept full width because an out-of-range address
        /// can map past the id space entirely.
        page: u64,
        limit: u32,
    },

    #[error("Invalid algorithm: {name:?}")]
    InvalidAlgorithm { name: String },

    #[error("Unrecoverable page fault for {pid}:{page}: no frame could be produced")]
    PageFaultUnrecoverable { pid: Pid, page: PageId },

    #[error("No processes exist")]
    NoProcesses,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
