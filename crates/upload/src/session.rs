//! Per-file transfer session.
//!
//! A [`TransferSession`] owns one file's upload from planning to a terminal
//! state. It is consumed by [`TransferSession::run`], so it reaches a
//! terminal state exactly once.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use fileshare_protocol::{CompleteUploadRequest, InitUploadRequest, UploadResponse};
use fileshare_transfer::{
    ChunkLayout, ChunkLedger, ProgressGate, TransferPlan, TransferUnit, new_upload_id,
};
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chunk_uploader::ChunkUploader;
use crate::error::UploadError;
use crate::policy::TransferPolicy;
use crate::store::{ByteProgress, FileUpload, RemoteStore, StoreFuture};
use crate::types::TransferResult;

/// Receives the unit's percentage (0-100) each time it moves forward.
pub type PercentSink = Arc<dyn Fn(u8) + Send + Sync>;

/// Lifecycle of one session.
#[derive(Debug)]
pub enum SessionState {
    Planning,
    Initializing(ChunkLayout),
    Transferring(TransferPlan),
    Completing,
    Succeeded(TransferResult),
    Failed(UploadError),
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_) | Self::Cancelled)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Initializing(_) => "initializing",
            Self::Transferring(_) => "transferring",
            Self::Completing => "completing",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Maps a step error onto the terminal state it leads to.
    fn from_error(e: UploadError) -> Self {
        match e {
            UploadError::Cancelled => Self::Cancelled,
            e => Self::Failed(e),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Uploads one file, single-shot or chunked.
pub struct TransferSession<'a> {
    unit: TransferUnit,
    store: &'a dyn RemoteStore,
    policy: &'a TransferPolicy,
    cancel: CancellationToken,
    compress: bool,
    upload_id: String,
    progress: Arc<ProgressGate>,
    on_progress: PercentSink,
}

impl<'a> TransferSession<'a> {
    pub fn new(
        unit: TransferUnit,
        store: &'a dyn RemoteStore,
        policy: &'a TransferPolicy,
        cancel: CancellationToken,
        compress: bool,
        on_progress: PercentSink,
    ) -> Self {
        Self {
            unit,
            store,
            policy,
            cancel,
            compress,
            upload_id: new_upload_id(),
            progress: Arc::new(ProgressGate::new()),
            on_progress,
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Drives the session to a terminal state.
    pub async fn run(self) -> Result<TransferResult, UploadError> {
        let mut state = SessionState::Planning;
        loop {
            if !state.is_terminal() && self.cancel.is_cancelled() {
                state = SessionState::Cancelled;
            }

            let next = match state {
                SessionState::Planning => self.plan(),
                SessionState::Initializing(layout) => self.initialize(layout).await,
                SessionState::Transferring(TransferPlan::SingleShot { .. }) => {
                    self.send_whole().await
                }
                SessionState::Transferring(TransferPlan::Chunked(layout)) => {
                    match self.send_chunks(&layout).await {
                        Ok(()) => SessionState::Completing,
                        Err(e) => SessionState::from_error(e),
                    }
                }
                SessionState::Completing => self.complete().await,
                SessionState::Succeeded(result) => {
                    if self.progress.finish() {
                        (self.on_progress)(100);
                    }
                    return Ok(result);
                }
                SessionState::Failed(e) => return Err(e),
                SessionState::Cancelled => return Err(UploadError::Cancelled),
            };

            debug!(
                upload_id = %self.upload_id,
                unit = self.unit.index,
                state = %next,
                "session transition"
            );
            state = next;
        }
    }

    fn plan(&self) -> SessionState {
        match self.policy.thresholds.plan(self.unit.size) {
            Ok(TransferPlan::Chunked(layout)) => SessionState::Initializing(layout),
            Ok(plan) => SessionState::Transferring(plan),
            Err(e) => SessionState::Failed(e.into()),
        }
    }

    async fn initialize(&self, layout: ChunkLayout) -> SessionState {
        let request = InitUploadRequest {
            upload_id: self.upload_id.clone(),
            filename: self.unit.name.clone(),
            total_chunks: layout.chunk_count as u64,
            file_size: layout.file_size,
            mime_type: self.unit.mime_type.clone(),
            chunk_size: layout.chunk_size,
        };
        debug!(
            upload_id = %self.upload_id,
            chunks = layout.chunk_count,
            chunk_size = layout.chunk_size,
            concurrency = layout.concurrency,
            "initializing chunked upload"
        );

        let call = self.store.init_upload(request);
        match with_timeout(self.policy.call_timeout, "init", call).await {
            Ok(()) => SessionState::Transferring(TransferPlan::Chunked(layout)),
            Err(e) => SessionState::from_error(e),
        }
    }

    async fn send_whole(&self) -> SessionState {
        let gate = Arc::clone(&self.progress);
        let sink = Arc::clone(&self.on_progress);
        let total = self.unit.size;
        let on_bytes: ByteProgress = Arc::new(move |sent| {
            if let Some(pct) = gate.advance_ratio(sent, total) {
                sink(pct);
            }
        });

        let request = FileUpload {
            path: self.unit.path.clone(),
            filename: self.unit.name.clone(),
            mime_type: self.unit.mime_type.clone(),
            file_size: self.unit.size,
            optimized: self.compress,
        };
        let call = self.store.upload_file(request, on_bytes);
        self.finish_with(with_timeout(self.policy.single_shot_timeout, "upload", call).await)
    }

    /// Sends every chunk in batches of `layout.concurrency`, then retries
    /// whatever failed in up to `retry_passes` global passes.
    async fn send_chunks(&self, layout: &ChunkLayout) -> Result<(), UploadError> {
        let uploader = ChunkUploader::new(
            self.store,
            self.policy,
            &self.cancel,
            &self.unit.path,
            &self.upload_id,
        );
        let mut ledger = ChunkLedger::new(layout.chunk_count);

        let indices: Vec<usize> = (0..layout.chunk_count).collect();
        for batch in indices.chunks(layout.concurrency) {
            self.check_cancelled()?;
            self.run_round(&uploader, layout, batch, &mut ledger).await?;
        }

        for pass in 1..=self.policy.retry_passes {
            let failed = ledger.failed();
            if failed.is_empty() {
                break;
            }
            self.check_cancelled()?;
            warn!(
                upload_id = %self.upload_id,
                pass,
                failed = failed.len(),
                "retrying failed chunks"
            );
            self.run_round(&uploader, layout, &failed, &mut ledger).await?;
        }

        if !ledger.is_complete() {
            return Err(UploadError::IncompleteTransfer {
                missing: ledger.missing(),
                total: ledger.total(),
            });
        }
        Ok(())
    }

    /// Dispatches `indices` concurrently and waits for all of them.
    ///
    /// Results arriving after cancellation are dropped without touching
    /// the ledger.
    async fn run_round(
        &self,
        uploader: &ChunkUploader<'_>,
        layout: &ChunkLayout,
        indices: &[usize],
        ledger: &mut ChunkLedger,
    ) -> Result<(), UploadError> {
        let mut in_flight = FuturesUnordered::new();
        for &index in indices {
            if let Some(chunk) = layout.chunk(index)
                && ledger.dispatch(index)
            {
                in_flight.push(uploader.upload(chunk));
            }
        }

        while let Some((index, result)) = in_flight.next().await {
            if self.cancel.is_cancelled() {
                continue;
            }
            match result {
                Ok(()) => {
                    if ledger.acknowledge(index)
                        && let Some(pct) = self
                            .progress
                            .advance_ratio(ledger.acknowledged_count() as u64, ledger.total() as u64)
                    {
                        (self.on_progress)(pct);
                    }
                }
                Err(e) => {
                    debug!(upload_id = %self.upload_id, chunk = index, error = %e, "chunk failed");
                    ledger.fail(index);
                }
            }
        }

        self.check_cancelled()
    }

    async fn complete(&self) -> SessionState {
        let request = CompleteUploadRequest {
            upload_id: self.upload_id.clone(),
            compress: Some(self.compress),
        };
        let call = self.store.complete_upload(request);
        self.finish_with(with_timeout(self.policy.call_timeout, "complete", call).await)
    }

    fn finish_with(&self, response: Result<UploadResponse, UploadError>) -> SessionState {
        match response {
            Ok(resp) => SessionState::Succeeded(TransferResult::from_response(&self.unit, resp)),
            Err(e) => SessionState::from_error(e),
        }
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Bounds a store call; exceeding `limit` is a transport failure.
async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    call: StoreFuture<'_, T>,
) -> Result<T, UploadError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(UploadError::Transport(format!(
            "{what} timed out after {}s",
            limit.as_secs()
        ))),
    }
}
