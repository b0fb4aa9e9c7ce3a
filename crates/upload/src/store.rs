//! Remote store trait.
//!
//! `RemoteStore` is implemented by the binary on top of the HTTP client.
//! Keeping it a trait keeps the orchestration decoupled from transport and
//! testable with mocks.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use fileshare_protocol::{
    CompleteUploadRequest, CreateGroupRequest, GroupResponse, InitUploadRequest, UploadResponse,
};

use crate::error::UploadError;

/// Boxed future returned by every store call.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// Callback receiving the cumulative number of bytes sent.
pub type ByteProgress = Arc<dyn Fn(u64) + Send + Sync>;

/// A whole-file upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub path: PathBuf,
    pub filename: String,
    pub mime_type: String,
    pub file_size: u64,
    /// Asks the store to compress the file.
    pub optimized: bool,
}

/// Abstract connection to the remote store.
pub trait RemoteStore: Send + Sync {
    /// Sends a whole file in one request.
    fn upload_file(
        &self,
        request: FileUpload,
        on_progress: ByteProgress,
    ) -> StoreFuture<'_, UploadResponse>;

    /// Opens a chunked upload.
    fn init_upload(&self, request: InitUploadRequest) -> StoreFuture<'_, ()>;

    /// Sends one chunk tagged with its upload id and index.
    ///
    /// `data` is shared across retries of the same chunk.
    fn upload_chunk(
        &self,
        upload_id: String,
        chunk_index: usize,
        data: Bytes,
    ) -> StoreFuture<'_, ()>;

    /// Finalizes a chunked upload.
    fn complete_upload(&self, request: CompleteUploadRequest) -> StoreFuture<'_, UploadResponse>;

    /// Binds uploaded files to a group.
    fn create_group(&self, request: CreateGroupRequest) -> StoreFuture<'_, GroupResponse>;
}
