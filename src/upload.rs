use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use url::Url;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upload rejected: {status} - {message}")]
    Rejected { status: u16, message: String },
    #[error("not a video file: {0}")]
    NotVideo(String),
    #[error("invalid upload endpoint: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    filename: String,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Container check by extension, done locally before any network call.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

/// The upload handshake with the file-ingest service. One multipart POST; a
/// 2xx response yields the server-side filename that playback mode is keyed
/// on. Non-2xx is a hard failure with no automatic retry; the caller stays
/// interactive and may re-invoke.
pub struct VideoUploader {
    client: Client,
    endpoint: Url,
}

impl VideoUploader {
    pub fn new(server_url: &Url) -> Result<Self, UploadError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            endpoint: server_url.join("upload-video")?,
        })
    }

    pub async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        if !is_video_file(path) {
            return Err(UploadError::NotVideo(path.display().to_string()));
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let file = tokio::fs::File::open(path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream(body)
            .file_name(file_name.clone())
            .mime_str(mime_for(path))?;
        let form = Form::new().part("file", part);

        log::info!("uploading {} to {}", file_name, self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse = response.json().await?;
        log::info!("upload accepted as {}", parsed.filename);
        Ok(parsed.filename)
    }
}
