use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::TransferError;
use crate::types::ChunkDescriptor;

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads arbitrary chunk ranges out of a local file.
pub struct ChunkReader {
    file: std::fs::File,
}

impl ChunkReader {
    /// Opens `path` for chunk reads.
    pub fn new(path: &Path) -> Result<Self, TransferError> {
        Ok(Self {
            file: std::fs::File::open(path)?,
        })
    }

    /// Reads exactly the bytes of `chunk`.
    ///
    /// A file that shrank since planning yields [`TransferError::ShortRead`].
    pub fn read(&mut self, chunk: &ChunkDescriptor) -> Result<Vec<u8>, TransferError> {
        let expected = chunk.len();
        self.file.seek(SeekFrom::Start(chunk.start))?;

        let mut buf = Vec::with_capacity(expected as usize);
        let actual = (&mut self.file).take(expected).read_to_end(&mut buf)? as u64;
        if actual != expected {
            return Err(TransferError::ShortRead {
                index: chunk.index,
                expected,
                actual,
            });
        }
        Ok(buf)
    }
}

/// Reads one chunk on the blocking thread pool.
pub async fn read_chunk(path: PathBuf, chunk: ChunkDescriptor) -> Result<Vec<u8>, TransferError> {
    tokio::task::spawn_blocking(move || ChunkReader::new(&path)?.read(&chunk))
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(format!("task join error: {e}"))))?
}
