//! FileShare store API client.
//!
//! Async HTTP client using `reqwest`; JSON for metadata calls, multipart
//! for file and chunk payloads.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use fileshare_protocol::constants::{
    self, FIELD_CHUNK, FIELD_CHUNK_INDEX, FIELD_FILE, FIELD_FILE_SIZE, FIELD_OPTIMIZED,
    FIELD_UPLOAD_ID,
};
use fileshare_protocol::{
    CompleteUploadRequest, CreateGroupRequest, FileInfo, GroupInfo, GroupResponse,
    InitUploadRequest, UploadResponse,
};
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::Error;

const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Callback receiving the cumulative number of bytes sent.
pub type ByteProgress = Arc<dyn Fn(u64) + Send + Sync>;

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the endpoint paths are appended to, e.g. `https://share.example/api`.
    pub base_url: String,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout for read-only lookups. Upload calls are bounded
    /// by the caller instead.
    pub lookup_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            connect_timeout: Duration::from_secs(10),
            lookup_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of resolving a share code.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    File(FileInfo),
    Group(GroupInfo),
}

/// FileShare store API client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    lookup_timeout: Duration,
}

impl Client {
    /// Creates a new client.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            lookup_timeout: config.lookup_timeout,
        })
    }

    /// Returns the normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Direct download URL for a share code or group member id.
    pub fn file_url(&self, id: &str) -> String {
        self.url(&constants::file_path(id))
    }

    /// Uploads a whole file in one multipart request, streaming it from disk.
    pub async fn upload_file(
        &self,
        path: &Path,
        filename: &str,
        mime_type: &str,
        file_size: u64,
        optimized: bool,
        on_progress: ByteProgress,
    ) -> Result<UploadResponse, Error> {
        let file = tokio::fs::File::open(path).await?;

        let mut sent: u64 = 0;
        let stream = tokio_util::io::ReaderStream::new(file).inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                sent += bytes.len() as u64;
                on_progress(sent);
            }
        });
        let body = reqwest::Body::wrap_stream(stream);

        let part = Part::stream_with_length(body, file_size)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;

        let form = Form::new()
            .text(FIELD_OPTIMIZED, optimized.to_string())
            .text(FIELD_FILE_SIZE, file_size.to_string())
            .part(FIELD_FILE, part);

        debug!(filename, file_size, optimized, "single-shot upload");
        self.post_multipart(constants::UPLOAD_PATH, form).await
    }

    /// Opens a chunked upload session.
    pub async fn init_upload(&self, req: &InitUploadRequest) -> Result<(), Error> {
        let resp = self
            .http
            .post(self.url(constants::UPLOAD_INIT_PATH))
            .json(req)
            .send()
            .await?;
        check_status(resp).await.map(drop)
    }

    /// Sends one chunk's raw bytes.
    pub async fn upload_chunk(
        &self,
        upload_id: &str,
        chunk_index: usize,
        data: Bytes,
    ) -> Result<(), Error> {
        trace!(upload_id, chunk_index, bytes = data.len(), "sending chunk");
        let len = data.len() as u64;
        let part = Part::stream_with_length(data, len)
            .file_name(format!("chunk-{chunk_index}"))
            .mime_str("application/octet-stream")?;

        let form = Form::new()
            .text(FIELD_UPLOAD_ID, upload_id.to_string())
            .text(FIELD_CHUNK_INDEX, chunk_index.to_string())
            .part(FIELD_CHUNK, part);

        let resp = self
            .http
            .post(self.url(constants::UPLOAD_CHUNK_PATH))
            .multipart(form)
            .send()
            .await?;
        check_status(resp).await.map(drop)
    }

    /// Finalizes a chunked upload.
    pub async fn complete_upload(
        &self,
        req: &CompleteUploadRequest,
    ) -> Result<UploadResponse, Error> {
        self.post_json(constants::UPLOAD_COMPLETE_PATH, req).await
    }

    /// Creates a group from uploaded file codes.
    pub async fn create_group(&self, req: &CreateGroupRequest) -> Result<GroupResponse, Error> {
        self.post_json(constants::GROUP_PATH, req).await
    }

    /// Looks up a single file by code.
    pub async fn file_info(&self, code: &str) -> Result<FileInfo, Error> {
        self.get_json(&constants::download_path(code)).await
    }

    /// Looks up a group by code.
    pub async fn group_info(&self, code: &str) -> Result<GroupInfo, Error> {
        self.get_json(&constants::group_path(code)).await
    }

    /// Resolves a code to a file, falling back to a group when the store
    /// reports the code belongs to one.
    pub async fn resolve_code(&self, code: &str) -> Result<Lookup, Error> {
        match self.file_info(code).await {
            Ok(info) => Ok(Lookup::File(info)),
            Err(e) if e.lookup_error().is_some_and(|b| b.is_group) => {
                debug!(code, "code refers to a group");
                Ok(Lookup::Group(self.group_info(code).await?))
            }
            Err(e) => Err(e),
        }
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        let resp = self
            .http
            .get(self.url(path))
            .timeout(self.lookup_timeout)
            .send()
            .await?;
        parse_json(resp).await
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Error> {
        let resp = self.http.post(self.url(path)).json(body).send().await?;
        parse_json(resp).await
    }

    async fn post_multipart<R: DeserializeOwned>(&self, path: &str, form: Form) -> Result<R, Error> {
        let resp = self.http.post(self.url(path)).multipart(form).send().await?;
        parse_json(resp).await
    }
}

/// Turns a non-2xx response into [`Error::Api`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Api {
        status: status.as_u16(),
        body,
    })
}

async fn parse_json<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, Error> {
    let resp = check_status(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
