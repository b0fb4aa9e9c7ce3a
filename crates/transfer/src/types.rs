use std::path::{Path, PathBuf};

use crate::TransferError;

/// A byte range `[start, end)` of a file, the unit of chunked transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Zero-based chunk index.
    pub index: usize,
    /// Inclusive start offset.
    pub start: u64,
    /// Exclusive end offset.
    pub end: u64,
}

impl ChunkDescriptor {
    /// Size of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// One file awaiting or undergoing transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferUnit {
    /// Stable position in the submitted batch.
    pub index: usize,
    /// Local file the bytes are read from.
    pub path: PathBuf,
    /// Display name sent to the store.
    pub name: String,
    /// Byte length at submission time.
    pub size: u64,
    /// Media-type hint.
    pub mime_type: String,
}

impl TransferUnit {
    /// Builds a unit from a local file's metadata.
    pub fn from_path(index: usize, path: &Path) -> Result<Self, TransferError> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(TransferError::NotAFile(path.display().to_string()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = detect_media_type(&name).to_string();

        Ok(Self {
            index,
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            mime_type,
        })
    }
}

/// Detects a media type from a file name extension.
pub fn detect_media_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("txt" | "log") => "text/plain",
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("gz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("7z") => "application/x-7z-compressed",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Transfer state of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    InFlight,
    Acknowledged,
    Failed,
}

/// Per-chunk state for one file's chunked transfer.
///
/// Acknowledgement is write-once: an acknowledged chunk never goes back
/// in flight and acknowledging it again changes nothing.
#[derive(Debug, Clone)]
pub struct ChunkLedger {
    states: Vec<ChunkState>,
    acknowledged: usize,
}

impl ChunkLedger {
    /// Creates a ledger with `total` pending chunks.
    pub fn new(total: usize) -> Self {
        Self {
            states: vec![ChunkState::Pending; total],
            acknowledged: 0,
        }
    }

    /// Returns the state of chunk `index`.
    pub fn state(&self, index: usize) -> Option<ChunkState> {
        self.states.get(index).copied()
    }

    /// Moves a pending or failed chunk in flight.
    ///
    /// Returns `false` if the chunk is already acknowledged (it must not be
    /// re-sent) or does not exist.
    pub fn dispatch(&mut self, index: usize) -> bool {
        match self.states.get_mut(index) {
            Some(state) if *state != ChunkState::Acknowledged => {
                *state = ChunkState::InFlight;
                true
            }
            _ => false,
        }
    }

    /// Marks a chunk acknowledged. Returns `true` only on the first acknowledgement.
    pub fn acknowledge(&mut self, index: usize) -> bool {
        match self.states.get_mut(index) {
            Some(state) if *state != ChunkState::Acknowledged => {
                *state = ChunkState::Acknowledged;
                self.acknowledged += 1;
                true
            }
            _ => false,
        }
    }

    /// Marks a chunk failed unless it was already acknowledged.
    pub fn fail(&mut self, index: usize) {
        if let Some(state) = self.states.get_mut(index)
            && *state != ChunkState::Acknowledged
        {
            *state = ChunkState::Failed;
        }
    }

    /// Indices of chunks currently in the failed state.
    pub fn failed(&self) -> Vec<usize> {
        self.indices_in(ChunkState::Failed)
    }

    fn indices_in(&self, wanted: ChunkState) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == wanted)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn acknowledged_count(&self) -> usize {
        self.acknowledged
    }

    pub fn total(&self) -> usize {
        self.states.len()
    }

    /// Number of chunks still missing an acknowledgement.
    pub fn missing(&self) -> usize {
        self.total() - self.acknowledged
    }

    pub fn is_complete(&self) -> bool {
        self.acknowledged == self.states.len()
    }
}
