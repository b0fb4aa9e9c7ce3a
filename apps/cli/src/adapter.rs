//! Adapter bridging the HTTP client to the `RemoteStore` trait required by
//! the upload crate.

use bytes::Bytes;
use fileshare_protocol::{
    CompleteUploadRequest, CreateGroupRequest, GroupResponse, InitUploadRequest, UploadResponse,
};
use fileshare_store_client::{Client, Error};
use fileshare_transfer::TransferError;
use fileshare_upload::{ByteProgress, FileUpload, RemoteStore, StoreFuture, UploadError};

/// Implements `RemoteStore` by delegating to the store HTTP client.
pub struct HttpStore {
    client: Client,
}

impl HttpStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl RemoteStore for HttpStore {
    fn upload_file(
        &self,
        request: FileUpload,
        on_progress: ByteProgress,
    ) -> StoreFuture<'_, UploadResponse> {
        Box::pin(async move {
            self.client
                .upload_file(
                    &request.path,
                    &request.filename,
                    &request.mime_type,
                    request.file_size,
                    request.optimized,
                    on_progress,
                )
                .await
                .map_err(to_upload_error)
        })
    }

    fn init_upload(&self, request: InitUploadRequest) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.client
                .init_upload(&request)
                .await
                .map_err(to_upload_error)
        })
    }

    fn upload_chunk(
        &self,
        upload_id: String,
        chunk_index: usize,
        data: Bytes,
    ) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.client
                .upload_chunk(&upload_id, chunk_index, data)
                .await
                .map_err(to_upload_error)
        })
    }

    fn complete_upload(&self, request: CompleteUploadRequest) -> StoreFuture<'_, UploadResponse> {
        Box::pin(async move {
            self.client
                .complete_upload(&request)
                .await
                .map_err(to_upload_error)
        })
    }

    fn create_group(&self, request: CreateGroupRequest) -> StoreFuture<'_, GroupResponse> {
        Box::pin(async move {
            self.client
                .create_group(&request)
                .await
                .map_err(to_upload_error)
        })
    }
}

/// Maps client errors onto the upload taxonomy.
fn to_upload_error(e: Error) -> UploadError {
    if e.is_transport() {
        return UploadError::Transport(e.to_string());
    }
    if let Some(status) = e.status() {
        let message = e.lookup_error().map(|body| body.error).unwrap_or_default();
        return UploadError::Server { status, message };
    }
    match e {
        Error::Json(inner) => UploadError::InvalidResponse(inner.to_string()),
        Error::Io(inner) => UploadError::Transfer(TransferError::Io(inner)),
        Error::InvalidUrl(url) => UploadError::Validation(format!("invalid server address {url}")),
        other => UploadError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshare_upload::FailureKind;

    #[test]
    fn maps_api_errors_to_server() {
        let err = to_upload_error(Error::Api {
            status: 413,
            body: r#"{"error":"File too large"}"#.into(),
        });
        match err {
            UploadError::Server { status, message } => {
                assert_eq!(status, 413);
                assert_eq!(message, "File too large");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn maps_timeout_to_transport() {
        let err = to_upload_error(Error::Timeout);
        assert_eq!(err.kind(), FailureKind::Transport);
        assert!(err.is_retryable());
    }

    #[test]
    fn maps_local_errors() {
        let err = to_upload_error(Error::Io(std::io::Error::other("denied")));
        assert_eq!(err.kind(), FailureKind::LocalIo);

        let json = serde_json_error();
        assert!(matches!(
            to_upload_error(Error::Json(json)),
            UploadError::InvalidResponse(_)
        ));
    }

    fn serde_json_error() -> serde_json::Error {
        serde_json::from_str::<u32>("nope").unwrap_err()
    }
}
