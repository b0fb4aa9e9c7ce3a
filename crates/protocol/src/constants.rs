//! Endpoint paths and multipart field names.

/// Single-shot upload of a whole file (multipart).
pub const UPLOAD_PATH: &str = "/upload";

/// Opens a chunked upload (JSON).
pub const UPLOAD_INIT_PATH: &str = "/upload/init";

/// Sends one chunk of a chunked upload (multipart).
pub const UPLOAD_CHUNK_PATH: &str = "/upload/chunk";

/// Finalizes a chunked upload (JSON).
pub const UPLOAD_COMPLETE_PATH: &str = "/upload/complete";

/// Creates a group from already uploaded files (JSON).
pub const GROUP_PATH: &str = "/group";

/// Multipart field carrying the whole file in a single-shot upload.
pub const FIELD_FILE: &str = "file";
/// Multipart flag asking the store to compress the file.
pub const FIELD_OPTIMIZED: &str = "optimized";
/// Multipart field carrying the declared file size.
pub const FIELD_FILE_SIZE: &str = "fileSize";
/// Multipart field carrying raw chunk bytes.
pub const FIELD_CHUNK: &str = "chunk";
/// Multipart field carrying the client-minted upload identifier.
pub const FIELD_UPLOAD_ID: &str = "uploadId";
/// Multipart field carrying the zero-based chunk index.
pub const FIELD_CHUNK_INDEX: &str = "chunkIndex";

/// Path for looking up a single file by its share code.
pub fn download_path(code: &str) -> String {
    format!("/download/{code}")
}

/// Path for looking up a group by its share code.
pub fn group_path(code: &str) -> String {
    format!("{GROUP_PATH}/{code}")
}

/// Path serving a stored file's bytes, by share code or group member id.
pub fn file_path(id: &str) -> String {
    format!("/file/{id}")
}
