use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Connection(#[from] crate::connection::ConnectionError),

    #[error("upload error: {0}")]
    Upload(#[from] crate::upload::UploadError),

    #[error("capture error: {0}")]
    Capture(#[from] crate::capture::CaptureError),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
