//! Audio Bridge - an HTTP adapter that turns a YouTube reference into audio bytes
//!
//! This library resolves a video URL or identifier, delegates the download to yt-dlp,
//! reads the produced file back, and returns it base64-encoded together with its
//! metadata. The temp artifact is removed on every exit path.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod pipeline;
pub mod server;
pub mod transfer;
pub mod utils;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{AudioFormat, ExtractionConfig, ExtractionResult, MediaExtractor};
pub use pipeline::{AudioPipeline, DownloadResponse, FetchedAudio};

/// Result type used on the request path
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Error kinds a download request can end in
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    #[error("{0}")]
    ExtractionFailed(String),

    #[error("Extraction timed out after {0} seconds")]
    ExtractionTimeout(u64),

    #[error("Downloaded file not found: {0}")]
    FileNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
