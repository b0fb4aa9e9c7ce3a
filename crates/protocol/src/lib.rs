//! Wire protocol for the FileShare store API.
//!
//! JSON bodies use camelCase keys; multipart requests use the field names
//! in [`constants`].

pub mod constants;
pub mod messages;

// Re-export primary types for convenience.
pub use messages::{
    CompleteUploadRequest, CreateGroupRequest, FileInfo, GroupInfo, GroupMember, GroupResponse,
    InitUploadRequest, LookupError, UploadResponse,
};
