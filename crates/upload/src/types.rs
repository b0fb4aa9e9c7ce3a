//! Data types for the upload flow.

use chrono::{DateTime, Utc};
use fileshare_protocol::{GroupResponse, UploadResponse};
use fileshare_transfer::TransferUnit;

use crate::error::{FailureKind, UploadError};

/// A file the store accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferResult {
    /// Position of the unit in the submitted batch.
    pub index: usize,
    /// Share code assigned by the store.
    pub code: String,
    /// Original local file name.
    pub filename: String,
    /// Size reported by the store.
    pub size: u64,
    pub compressed: bool,
    pub compression_ratio: Option<f64>,
    pub original_size: Option<u64>,
    /// Store-side timestamp, as returned.
    pub upload_date: String,
    pub completed_at: DateTime<Utc>,
}

impl TransferResult {
    pub(crate) fn from_response(unit: &TransferUnit, resp: UploadResponse) -> Self {
        Self {
            index: unit.index,
            code: resp.code,
            filename: unit.name.clone(),
            size: resp.size,
            compressed: resp.compressed.unwrap_or(false),
            compression_ratio: resp.compression_ratio,
            original_size: resp.original_size,
            upload_date: resp.upload_date,
            completed_at: Utc::now(),
        }
    }
}

/// A group created from a batch's successful uploads.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResult {
    pub code: String,
    pub member_count: usize,
    pub members: Vec<TransferResult>,
}

impl GroupResult {
    pub(crate) fn from_response(resp: GroupResponse, members: &[TransferResult]) -> Self {
        let member_count = if resp.file_count > 0 {
            resp.file_count as usize
        } else {
            members.len()
        };
        Self {
            code: resp.group_code,
            member_count,
            members: members.to_vec(),
        }
    }
}

/// A unit that reached a terminal state without a result.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    pub index: usize,
    pub name: String,
    pub kind: FailureKind,
    /// Human-readable reason.
    pub message: String,
}

impl UnitFailure {
    pub(crate) fn new(unit: &TransferUnit, error: &UploadError) -> Self {
        Self {
            index: unit.index,
            name: unit.name.clone(),
            kind: error.kind(),
            message: error.user_message(),
        }
    }
}

/// What happened to the grouping step of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum GroupOutcome {
    /// The batch did not ask for a group.
    #[default]
    NotRequested,
    /// Grouping was requested but fewer than two files succeeded or the
    /// batch was cancelled.
    Skipped,
    Created(GroupResult),
    /// Group creation exhausted its retries; individual results stand.
    Failed(String),
}

/// A batch submission.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub units: Vec<TransferUnit>,
    /// Bind the uploaded files to one group afterwards.
    pub group: bool,
    pub group_name: Option<String>,
    /// Ask the store to compress uploaded files.
    pub compress: bool,
}

/// Terminal report for a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Number of units submitted, including rejected ones.
    pub total: usize,
    /// Successful uploads in submission order.
    pub results: Vec<TransferResult>,
    /// Failed, rejected and cancelled units in submission order.
    pub failures: Vec<UnitFailure>,
    pub group: GroupOutcome,
    pub cancelled: bool,
}

impl BatchOutcome {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.total > 0 && self.results.len() == self.total
    }

    /// "N of M files uploaded".
    pub fn summary(&self) -> String {
        let noun = if self.total == 1 { "file" } else { "files" };
        format!("{} of {} {noun} uploaded", self.results.len(), self.total)
    }

    /// Group share code, if one was created.
    pub fn group_code(&self) -> Option<&str> {
        match &self.group {
            GroupOutcome::Created(g) => Some(&g.code),
            _ => None,
        }
    }
}

/// Progress and lifecycle event emitted during a batch.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    UnitStarted {
        index: usize,
        name: String,
        size: u64,
        chunked: bool,
    },
    /// Per-unit percentage, monotonic within one unit.
    UnitProgress { index: usize, percent: u8 },
    /// Whole-batch percentage, capped at 99 until the batch finishes.
    BatchProgress {
        percent: u8,
        completed: usize,
        total: usize,
    },
    UnitSucceeded(TransferResult),
    UnitFailed(UnitFailure),
    GroupCreated(GroupResult),
    GroupFailed { message: String },
    BatchFinished {
        succeeded: usize,
        failed: usize,
        cancelled: bool,
    },
}
