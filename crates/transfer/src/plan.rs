//! Transfer strategy: single-shot vs. chunked, chunk size and concurrency.

use crate::TransferError;
use crate::types::ChunkDescriptor;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Size and concurrency thresholds used by [`PlanThresholds::plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanThresholds {
    /// Files up to and including this size are sent in one request.
    pub single_shot_max: u64,
    /// Files strictly larger than this use the large chunk size.
    pub large_file_over: u64,
    /// Files strictly smaller than this are split into quarters.
    pub small_file_under: u64,
    /// Lower bound for quartered chunks.
    pub min_chunk_size: u64,
    pub large_chunk_size: u64,
    pub medium_chunk_size: u64,
    pub large_concurrency: usize,
    pub medium_concurrency: usize,
    pub small_concurrency: usize,
}

impl Default for PlanThresholds {
    fn default() -> Self {
        Self {
            single_shot_max: 2 * MIB,
            large_file_over: 100 * MIB,
            small_file_under: 20 * MIB,
            min_chunk_size: MIB,
            large_chunk_size: 10 * MIB,
            medium_chunk_size: 5 * MIB,
            large_concurrency: 4,
            medium_concurrency: 3,
            small_concurrency: 2,
        }
    }
}

/// How a file of a given size is transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    /// Whole file in one request.
    SingleShot { file_size: u64 },
    /// Three-phase init / chunk / complete upload.
    Chunked(ChunkLayout),
}

impl TransferPlan {
    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::Chunked(_))
    }
}

/// Chunk geometry for a chunked transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLayout {
    pub file_size: u64,
    pub chunk_size: u64,
    pub chunk_count: usize,
    /// Number of chunks sent concurrently per batch.
    pub concurrency: usize,
}

impl ChunkLayout {
    /// Builds a layout; `chunk_size` must be non-zero.
    pub fn new(file_size: u64, chunk_size: u64, concurrency: usize) -> Self {
        let chunk_count = file_size.div_ceil(chunk_size) as usize;
        Self {
            file_size,
            chunk_size,
            chunk_count,
            concurrency: concurrency.max(1),
        }
    }

    /// Returns the descriptor for chunk `index`, or `None` past the end.
    pub fn chunk(&self, index: usize) -> Option<ChunkDescriptor> {
        if index >= self.chunk_count {
            return None;
        }
        let start = index as u64 * self.chunk_size;
        let end = (start + self.chunk_size).min(self.file_size);
        Some(ChunkDescriptor { index, start, end })
    }

    /// Iterates over every chunk in index order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkDescriptor> + '_ {
        (0..self.chunk_count).filter_map(|i| self.chunk(i))
    }
}

impl PlanThresholds {
    /// Plans the transfer of a file of `file_size` bytes.
    ///
    /// Zero-length files are rejected; they never reach the store.
    pub fn plan(&self, file_size: u64) -> Result<TransferPlan, TransferError> {
        if file_size == 0 {
            return Err(TransferError::EmptyFile(
                "zero-length files cannot be planned".into(),
            ));
        }

        if file_size <= self.single_shot_max {
            return Ok(TransferPlan::SingleShot { file_size });
        }

        let (chunk_size, concurrency) = if file_size > self.large_file_over {
            (self.large_chunk_size, self.large_concurrency)
        } else if file_size < self.small_file_under {
            (
                file_size.div_ceil(4).max(self.min_chunk_size),
                self.small_concurrency,
            )
        } else {
            (self.medium_chunk_size, self.medium_concurrency)
        };

        Ok(TransferPlan::Chunked(ChunkLayout::new(
            file_size,
            chunk_size.min(file_size),
            concurrency,
        )))
    }
}

/// Plans a transfer with the default thresholds.
pub fn plan_transfer(file_size: u64) -> Result<TransferPlan, TransferError> {
    PlanThresholds::default().plan(file_size)
}
