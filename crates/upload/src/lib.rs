//! Upload orchestration for FileShare.
//!
//! This crate holds the **business logic** of sending local files to a
//! remote store. It has no HTTP dependency: the binary provides a
//! `RemoteStore` implementation that bridges to the actual client.
//!
//! # Pipeline
//!
//! 1. **Admit**: drop zero-length files before any network call
//! 2. **Plan**: single-shot or chunked, chunk size and concurrency
//! 3. **Transfer**: one file at a time, chunks in bounded batches with retries
//! 4. **Complete**: finalize each chunked upload once every chunk is acknowledged
//! 5. **Group**: optionally bind the uploaded files to one shared code

pub mod batch;
pub mod chunk_uploader;
pub mod error;
pub mod group;
pub mod policy;
pub mod scanner;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::BatchCoordinator;
pub use chunk_uploader::ChunkUploader;
pub use error::{FailureKind, UploadError};
pub use group::GroupFinalizer;
pub use policy::TransferPolicy;
pub use scanner::{ScanResult, collect_units};
pub use session::{PercentSink, SessionState, TransferSession};
pub use store::{ByteProgress, FileUpload, RemoteStore, StoreFuture};
pub use types::{
    BatchOutcome, BatchRequest, GroupOutcome, GroupResult, TransferResult, UnitFailure,
    UploadEvent,
};
