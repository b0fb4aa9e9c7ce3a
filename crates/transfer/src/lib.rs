//! Chunk planning and per-file transfer bookkeeping.
//!
//! Nothing in this crate touches the network: it decides how a file is
//! sent, slices it into chunks, and tracks which chunks the store has
//! acknowledged.

mod chunked;
mod id;
mod plan;
mod progress;
mod size;
mod types;
mod validation;

pub use chunked::{ChunkReader, read_chunk};
pub use id::new_upload_id;
pub use plan::{ChunkLayout, MIB, PlanThresholds, TransferPlan, plan_transfer};
pub use progress::ProgressGate;
pub use size::format_size;
pub use types::{ChunkDescriptor, ChunkLedger, ChunkState, TransferUnit, detect_media_type};
pub use validation::{Admission, admit_units, validate_unit};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is empty: {0}")]
    EmptyFile(String),

    #[error("not a regular file: {0}")]
    NotAFile(String),

    #[error("short read on chunk {index}: expected {expected} bytes, got {actual}")]
    ShortRead {
        index: usize,
        expected: u64,
        actual: u64,
    },
}
