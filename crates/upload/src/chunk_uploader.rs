//! Single-chunk upload with bounded retries.

use std::path::Path;

use bytes::Bytes;
use fileshare_transfer::{ChunkDescriptor, read_chunk};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::UploadError;
use crate::policy::TransferPolicy;
use crate::store::RemoteStore;

/// Sends chunks of one file, each with its own retry budget.
///
/// The uploader never touches the session's chunk ledger; it returns the
/// chunk index with the outcome and the session folds it in.
pub struct ChunkUploader<'a> {
    store: &'a dyn RemoteStore,
    policy: &'a TransferPolicy,
    cancel: &'a CancellationToken,
    path: &'a Path,
    upload_id: &'a str,
}

impl<'a> ChunkUploader<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        policy: &'a TransferPolicy,
        cancel: &'a CancellationToken,
        path: &'a Path,
        upload_id: &'a str,
    ) -> Self {
        Self {
            store,
            policy,
            cancel,
            path,
            upload_id,
        }
    }

    /// Uploads one chunk, retrying transport and server failures.
    ///
    /// Each attempt is bounded by the chunk timeout; a timeout counts as a
    /// transport failure. Once the token is cancelled no further attempt or
    /// backoff happens.
    pub async fn upload(&self, chunk: ChunkDescriptor) -> (usize, Result<(), UploadError>) {
        (chunk.index, self.upload_inner(chunk).await)
    }

    async fn upload_inner(&self, chunk: ChunkDescriptor) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        let data = Bytes::from(read_chunk(self.path.to_path_buf(), chunk).await?);

        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            trace!(upload_id = self.upload_id, chunk = chunk.index, attempt, "sending chunk");
            let call = self
                .store
                .upload_chunk(self.upload_id.to_string(), chunk.index, data.clone());
            let err = match tokio::time::timeout(self.policy.chunk_timeout, call).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => e,
                Err(_) => UploadError::Transport(format!(
                    "chunk {} timed out after {}s",
                    chunk.index,
                    self.policy.chunk_timeout.as_secs()
                )),
            };

            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            let budget = if err.is_retryable() {
                self.policy.chunk_budget(err.is_client_error())
            } else {
                0
            };
            if attempt >= budget {
                return Err(err);
            }

            attempt += 1;
            let delay = self.policy.backoff(attempt);
            warn!(
                upload_id = self.upload_id,
                chunk = chunk.index,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "chunk failed, retrying"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFailure, MockStore, write_file};
    use std::time::Duration;

    fn chunk(index: usize, start: u64, end: u64) -> ChunkDescriptor {
        ChunkDescriptor { index, start, end }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_first_try() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 8);
        let store = MockStore::new();
        let policy = TransferPolicy::default();
        let cancel = CancellationToken::new();

        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (index, result) = uploader.upload(chunk(1, 4, 8)).await;
        assert_eq!(index, 1);
        assert!(result.is_ok());
        assert_eq!(store.chunk_calls(), 1);
        assert_eq!(store.chunk_lengths(), vec![(1, 4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transport_errors_with_backoff() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 8);
        let store = MockStore::new().fail_chunk(0, 2, MockFailure::Transport);
        let policy = TransferPolicy::default();
        let cancel = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (_, result) = uploader.upload(chunk(0, 0, 8)).await;
        assert!(result.is_ok());
        assert_eq!(store.chunk_calls(), 3);
        // 1s after the first failure, 2s after the second.
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_reuse_the_chunk_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 8);
        let store = MockStore::new().fail_chunk(0, 2, MockFailure::Transport);
        let policy = TransferPolicy::default();
        let cancel = CancellationToken::new();

        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (_, result) = uploader.upload(chunk(0, 2, 6)).await;
        assert!(result.is_ok());

        let payloads = store.chunk_payloads();
        assert_eq!(payloads.len(), 3);
        assert_eq!(&payloads[0][..], &[2, 3, 4, 5]);
        for payload in &payloads[1..] {
            assert_eq!(payload.as_ptr(), payloads[0].as_ptr());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 8);
        let store = MockStore::new().fail_chunk(0, 10, MockFailure::Server(503));
        let policy = TransferPolicy::default();
        let cancel = CancellationToken::new();

        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (_, result) = uploader.upload(chunk(0, 0, 8)).await;
        assert!(matches!(result, Err(UploadError::Server { status: 503, .. })));
        assert_eq!(store.chunk_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn client_error_retried_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 8);
        let store = MockStore::new().fail_chunk(0, 10, MockFailure::Server(400));
        let policy = TransferPolicy::default();
        let cancel = CancellationToken::new();

        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (_, result) = uploader.upload(chunk(0, 0, 8)).await;
        assert!(result.unwrap_err().is_client_error());
        assert_eq!(store.chunk_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_counts_as_transport_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 8);
        let store = MockStore::new().hang_chunk(0, 1);
        let policy = TransferPolicy::default();
        let cancel = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (_, result) = uploader.upload(chunk(0, 0, 8)).await;
        assert!(result.is_ok());
        assert_eq!(store.chunk_calls(), 2);
        assert!(started.elapsed() >= Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 8);
        let store = MockStore::new();
        let policy = TransferPolicy::default();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (_, result) = uploader.upload(chunk(0, 0, 8)).await;
        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert_eq!(store.chunk_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_skips_backoff() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 8);
        let cancel = CancellationToken::new();
        let store = MockStore::new()
            .fail_chunk(0, 10, MockFailure::Transport)
            .cancel_on_chunk_call(cancel.clone(), 1);
        let policy = TransferPolicy::default();

        let started = tokio::time::Instant::now();
        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (_, result) = uploader.upload(chunk(0, 0, 8)).await;
        assert!(matches!(result, Err(UploadError::Cancelled)));
        assert_eq!(store.chunk_calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn unreadable_range_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.bin", 4);
        let store = MockStore::new();
        let policy = TransferPolicy::default();
        let cancel = CancellationToken::new();

        let uploader = ChunkUploader::new(&store, &policy, &cancel, &path, "up-1");
        let (_, result) = uploader.upload(chunk(1, 4, 8)).await;
        assert!(matches!(result, Err(UploadError::Transfer(_))));
        assert_eq!(store.chunk_calls(), 0);
    }
}
