use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod youtube;
pub mod ytdlp;

pub use youtube::{resolve, watch_url};
pub use ytdlp::YtDlpExtractor;

use crate::{BridgeError, Result};

/// What the extraction tool should do for one request
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Format selector handed to the tool (e.g. `bestaudio/best`)
    pub format: String,

    /// Output path template, ending in `.%(ext)s`
    pub output_template: PathBuf,

    /// Optional post-download transcode
    pub transcode: Option<TranscodeTarget>,
}

/// Metadata surfaced by the extraction tool after a download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,

    pub duration_seconds: Option<f64>,

    /// Where the tool says it wrote the file. With a transcode this may still
    /// carry the pre-conversion extension.
    pub produced_path: PathBuf,
}

/// Target codec and bitrate for the audio transcode step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeTarget {
    pub codec: String,
    pub bitrate: String,
}

impl TranscodeTarget {
    const CODECS: &'static [&'static str] = &["mp3", "aac", "m4a", "opus", "vorbis", "flac", "wav"];

    pub fn is_supported(&self) -> bool {
        Self::CODECS.contains(&self.codec.to_lowercase().as_str())
    }

    /// File extension the tool gives the transcoded output
    pub fn extension(&self) -> &'static str {
        match self.codec.to_lowercase().as_str() {
            "aac" | "m4a" => "m4a",
            "opus" => "opus",
            "vorbis" => "ogg",
            "flac" => "flac",
            "wav" => "wav",
            _ => "mp3",
        }
    }
}

/// Audio container formats the service knows a MIME type for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Opus,
    Webm,
}

impl AudioFormat {
    /// MIME type used when the extension is not in the table
    pub const DEFAULT_MIME: &'static str = "audio/mpeg";

    /// Extensions the tool commonly produces for `bestaudio`, tried in order
    pub const COMMON_EXTENSIONS: &'static [&'static str] = &["m4a", "webm", "opus", "mp3", "ogg"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Opus => "opus",
            AudioFormat::Webm => "webm",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" | "mp4" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            "opus" => Some(AudioFormat::Opus),
            "webm" => Some(AudioFormat::Webm),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Opus => "audio/ogg",
            AudioFormat::Webm => "audio/webm",
        }
    }
}

/// MIME type for a produced file, falling back to [`AudioFormat::DEFAULT_MIME`]
pub fn content_type_for(path: &Path) -> &'static str {
    AudioFormat::from_path(path)
        .map(|format| format.mime_type())
        .unwrap_or(AudioFormat::DEFAULT_MIME)
}

/// Extensions to try after a download, most likely first
pub fn candidate_extensions(transcode: Option<&TranscodeTarget>) -> Vec<&'static str> {
    let mut extensions = Vec::with_capacity(AudioFormat::COMMON_EXTENSIONS.len() + 1);
    if let Some(target) = transcode {
        extensions.push(target.extension());
    }
    for ext in AudioFormat::COMMON_EXTENSIONS {
        if !extensions.contains(ext) {
            extensions.push(ext);
        }
    }
    extensions
}

/// Boundary to the external media-extraction tool
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Download the audio for `reference` according to `config`.
    ///
    /// Every tool-side failure comes back as [`BridgeError::ExtractionFailed`].
    async fn extract(&self, reference: &str, config: &ExtractionConfig) -> Result<ExtractionResult>;

    /// Name of the tool, for logs
    fn tool_name(&self) -> &'static str;
}

/// Map any displayable tool error into the extraction error kind
pub(crate) fn extraction_failed(err: impl std::fmt::Display) -> BridgeError {
    BridgeError::ExtractionFailed(err.to_string())
}
