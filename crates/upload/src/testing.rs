//! In-memory `RemoteStore` for tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;

use fileshare_protocol::{
    CompleteUploadRequest, CreateGroupRequest, GroupMember, GroupResponse, InitUploadRequest,
    UploadResponse,
};
use fileshare_transfer::TransferUnit;
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;
use crate::store::{ByteProgress, FileUpload, RemoteStore, StoreFuture};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) enum MockFailure {
    #[default]
    Transport,
    Server(u16),
}

impl MockFailure {
    fn to_error(self) -> UploadError {
        match self {
            Self::Transport => UploadError::Transport("connection reset".into()),
            Self::Server(status) => UploadError::Server {
                status,
                message: format!("mock status {status}"),
            },
        }
    }
}

#[derive(Default)]
struct Faults {
    /// Remaining failures per chunk index.
    chunks: HashMap<usize, (u32, MockFailure)>,
    /// Remaining hangs per chunk index.
    hangs: HashMap<usize, u32>,
    /// File names whose upload or init always fails.
    files: HashMap<String, MockFailure>,
    group: (u32, MockFailure),
    cancel_on_chunk: Option<(CancellationToken, usize)>,
    /// Time every chunk call takes before answering.
    chunk_latency: Option<Duration>,
}

/// Chunk calls currently inside the store.
#[derive(Default)]
struct Gauge {
    in_flight: usize,
    max_in_flight: usize,
    finished: usize,
    /// `(chunk index, chunk calls finished before it entered)`, in call order.
    entries: Vec<(usize, usize)>,
}

#[derive(Default)]
pub(crate) struct MockStore {
    faults: Mutex<Faults>,
    uploads: Mutex<Vec<FileUpload>>,
    inits: Mutex<Vec<InitUploadRequest>>,
    chunks: Mutex<Vec<(String, usize, usize)>>,
    payloads: Mutex<Vec<Bytes>>,
    completes: Mutex<Vec<CompleteUploadRequest>>,
    groups: Mutex<Vec<CreateGroupRequest>>,
    /// Upload id to filename, from init calls.
    sessions: Mutex<HashMap<String, String>>,
    gauge: Mutex<Gauge>,
    next_code: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first `times` calls for chunk `index`.
    pub fn fail_chunk(self, index: usize, times: u32, failure: MockFailure) -> Self {
        self.faults.lock().unwrap().chunks.insert(index, (times, failure));
        self
    }

    /// Never resolves the first `times` calls for chunk `index`.
    pub fn hang_chunk(self, index: usize, times: u32) -> Self {
        self.faults.lock().unwrap().hangs.insert(index, times);
        self
    }

    /// Fails every upload or init call for `filename`.
    pub fn fail_file(self, filename: &str, failure: MockFailure) -> Self {
        self.faults
            .lock()
            .unwrap()
            .files
            .insert(filename.to_string(), failure);
        self
    }

    /// Fails the first `times` group calls with a 500.
    pub fn fail_group(self, times: u32) -> Self {
        self.fail_group_with(times, MockFailure::Server(500))
    }

    /// Fails the first `times` group calls with `failure`.
    pub fn fail_group_with(self, times: u32, failure: MockFailure) -> Self {
        self.faults.lock().unwrap().group = (times, failure);
        self
    }

    /// Cancels `token` while handling the `nth` chunk call (1-based).
    pub fn cancel_on_chunk_call(self, token: CancellationToken, nth: usize) -> Self {
        self.faults.lock().unwrap().cancel_on_chunk = Some((token, nth));
        self
    }

    /// Makes every chunk call take `latency` to answer.
    pub fn chunk_latency(self, latency: Duration) -> Self {
        self.faults.lock().unwrap().chunk_latency = Some(latency);
        self
    }

    /// Most chunk calls seen inside the store at once.
    pub fn max_in_flight(&self) -> usize {
        self.gauge.lock().unwrap().max_in_flight
    }

    /// For each chunk call: its index and how many calls had finished
    /// when it entered.
    pub fn chunk_entries(&self) -> Vec<(usize, usize)> {
        self.gauge.lock().unwrap().entries.clone()
    }

    pub fn upload_calls(&self) -> Vec<FileUpload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn init_calls(&self) -> Vec<InitUploadRequest> {
        self.inits.lock().unwrap().clone()
    }

    pub fn chunk_calls(&self) -> usize {
        self.chunks.lock().unwrap().len()
    }

    /// `(index, byte length)` of every chunk call, in call order.
    pub fn chunk_lengths(&self) -> Vec<(usize, usize)> {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .map(|(_, i, len)| (*i, *len))
            .collect()
    }

    /// Payload of every chunk call, in call order.
    pub fn chunk_payloads(&self) -> Vec<Bytes> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn complete_calls(&self) -> Vec<CompleteUploadRequest> {
        self.completes.lock().unwrap().clone()
    }

    pub fn group_calls(&self) -> Vec<CreateGroupRequest> {
        self.groups.lock().unwrap().clone()
    }

    fn next_code(&self) -> String {
        format!("CODE{}", self.next_code.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn file_failure(&self, filename: &str) -> Option<UploadError> {
        self.faults
            .lock()
            .unwrap()
            .files
            .get(filename)
            .map(|f| f.to_error())
    }
}

impl RemoteStore for MockStore {
    fn upload_file(
        &self,
        request: FileUpload,
        on_progress: ByteProgress,
    ) -> StoreFuture<'_, UploadResponse> {
        Box::pin(async move {
            self.uploads.lock().unwrap().push(request.clone());
            if let Some(e) = self.file_failure(&request.filename) {
                return Err(e);
            }
            on_progress(request.file_size / 2);
            on_progress(request.file_size);
            Ok(UploadResponse {
                code: self.next_code(),
                filename: request.filename,
                size: request.file_size,
                compressed: Some(request.optimized),
                compression_ratio: None,
                original_size: None,
                upload_date: "2024-06-01T10:00:00Z".into(),
            })
        })
    }

    fn init_upload(&self, request: InitUploadRequest) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.inits.lock().unwrap().push(request.clone());
            if let Some(e) = self.file_failure(&request.filename) {
                return Err(e);
            }
            self.sessions
                .lock()
                .unwrap()
                .insert(request.upload_id, request.filename);
            Ok(())
        })
    }

    fn upload_chunk(
        &self,
        upload_id: String,
        chunk_index: usize,
        data: Bytes,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            {
                let mut gauge = self.gauge.lock().unwrap();
                gauge.in_flight += 1;
                gauge.max_in_flight = gauge.max_in_flight.max(gauge.in_flight);
                let finished = gauge.finished;
                gauge.entries.push((chunk_index, finished));
            }
            let result = self.answer_chunk(upload_id, chunk_index, data).await;
            let mut gauge = self.gauge.lock().unwrap();
            gauge.in_flight -= 1;
            gauge.finished += 1;
            result
        })
    }

    fn complete_upload(&self, request: CompleteUploadRequest) -> StoreFuture<'_, UploadResponse> {
        Box::pin(async move {
            self.completes.lock().unwrap().push(request.clone());
            let filename = self
                .sessions
                .lock()
                .unwrap()
                .get(&request.upload_id)
                .cloned()
                .ok_or_else(|| UploadError::Server {
                    status: 404,
                    message: "Upload session not found".into(),
                })?;
            let size = self
                .chunks
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _, _)| *id == request.upload_id)
                .map(|(_, i, len)| (*i, *len as u64))
                .collect::<HashMap<_, _>>()
                .values()
                .sum();
            Ok(UploadResponse {
                code: self.next_code(),
                filename,
                size,
                compressed: request.compress,
                compression_ratio: None,
                original_size: None,
                upload_date: "2024-06-01T10:00:00Z".into(),
            })
        })
    }

    fn create_group(&self, request: CreateGroupRequest) -> StoreFuture<'_, GroupResponse> {
        Box::pin(async move {
            self.groups.lock().unwrap().push(request.clone());
            {
                let mut faults = self.faults.lock().unwrap();
                let (remaining, failure) = &mut faults.group;
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(failure.to_error());
                }
            }
            Ok(GroupResponse {
                group_code: "GROUP1".into(),
                file_count: request.file_ids.len() as u32,
                files: request
                    .file_ids
                    .iter()
                    .map(|id| GroupMember {
                        id: id.clone(),
                        filename: format!("{id}.bin"),
                        size: 0,
                    })
                    .collect(),
            })
        })
    }
}

impl MockStore {
    async fn answer_chunk(
        &self,
        upload_id: String,
        chunk_index: usize,
        data: Bytes,
    ) -> Result<(), UploadError> {
        let call_number = {
            let mut chunks = self.chunks.lock().unwrap();
            chunks.push((upload_id, chunk_index, data.len()));
            chunks.len()
        };
        self.payloads.lock().unwrap().push(data);

        let (failure, hang, latency) = {
            let mut faults = self.faults.lock().unwrap();
            if let Some((token, nth)) = &faults.cancel_on_chunk
                && *nth == call_number
            {
                token.cancel();
            }
            let failure = match faults.chunks.get_mut(&chunk_index) {
                Some((remaining, failure)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(*failure)
                }
                _ => None,
            };
            let hang = match faults.hangs.get_mut(&chunk_index) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            };
            (failure, hang, faults.chunk_latency)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(f) => Err(f.to_error()),
            None => Ok(()),
        }
    }
}

/// Writes a file of `len` patterned bytes.
pub(crate) fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, data).unwrap();
    path
}

/// Creates a sparse file of `len` bytes.
pub(crate) fn sparse_file(dir: &Path, name: &str, len: u64) -> PathBuf {
    let path = dir.join(name);
    std::fs::File::create(&path).unwrap().set_len(len).unwrap();
    path
}

pub(crate) fn unit_for(index: usize, path: &Path) -> TransferUnit {
    TransferUnit::from_path(index, path).unwrap()
}

/// Distinct chunk indices the store has seen.
pub(crate) fn distinct_indices(store: &MockStore) -> HashSet<usize> {
    store.chunk_lengths().into_iter().map(|(i, _)| i).collect()
}
