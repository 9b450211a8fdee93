use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ExtractionSettings;
use crate::extractors::{
    candidate_extensions, resolve, watch_url, AudioFormat, ExtractionConfig, MediaExtractor,
    TranscodeTarget,
};
use crate::transfer::{transfer_and_cleanup, TempArtifact};
use crate::utils::{format_duration, format_file_size};
use crate::{BridgeError, Result};

const REDACTED_EXTRACTION_ERROR: &str = "Media extraction failed";

/// Audio fetched for one request, before encoding for the wire
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedAudio {
    pub title: String,
    pub video_id: String,
    pub duration_seconds: Option<f64>,
    pub content_type: &'static str,
    /// Extension of the file the tool actually produced
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// JSON body returned by `/download`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub title: String,
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_duration")]
    pub duration: Option<f64>,
    pub content_type: String,
    pub file_base64: String,
    pub file_size: u64,
}

impl From<FetchedAudio> for DownloadResponse {
    fn from(audio: FetchedAudio) -> Self {
        Self {
            file_size: audio.bytes.len() as u64,
            file_base64: STANDARD.encode(&audio.bytes),
            title: audio.title,
            video_id: audio.video_id,
            duration: audio.duration_seconds,
            content_type: audio.content_type.to_string(),
        }
    }
}

/// Whole seconds go out as integers, fractional ones as floats
fn serialize_duration<S: Serializer>(duration: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match duration {
        Some(secs) if secs.fract() == 0.0 && *secs >= 0.0 && *secs <= u64::MAX as f64 => {
            serializer.serialize_u64(*secs as u64)
        }
        Some(secs) => serializer.serialize_f64(*secs),
        None => serializer.serialize_none(),
    }
}

/// Resolve, extract, read back, clean up
pub struct AudioPipeline {
    extractor: Arc<dyn MediaExtractor>,
    format: String,
    transcode: Option<TranscodeTarget>,
    temp_dir: PathBuf,
    timeout: Duration,
    redact_tool_errors: bool,
}

impl AudioPipeline {
    pub fn new(extractor: Arc<dyn MediaExtractor>, settings: &ExtractionSettings) -> Self {
        Self {
            extractor,
            format: settings.format.clone(),
            transcode: settings.transcode.clone(),
            temp_dir: settings.resolved_temp_dir(),
            timeout: settings.timeout(),
            redact_tool_errors: settings.redact_tool_errors,
        }
    }

    pub fn temp_dir(&self) -> &PathBuf {
        &self.temp_dir
    }

    /// Run one full cycle for a raw URL or video id
    pub async fn fetch(&self, raw_reference: &str) -> Result<FetchedAudio> {
        let video_id = resolve(raw_reference)?;

        // Owns the request's temp namespace; dropping it sweeps leftovers on every
        // exit path, including cancellation of this future.
        let artifact = TempArtifact::allocate(&self.temp_dir, &video_id);
        let config = ExtractionConfig {
            format: self.format.clone(),
            output_template: artifact.template(),
            transcode: self.transcode.clone(),
        };

        tracing::info!("Extracting audio for {} into {}", video_id, artifact.stem());

        let extracted = tokio::time::timeout(self.timeout, self.extractor.extract(&watch_url(&video_id), &config))
            .await
            .map_err(|_| BridgeError::ExtractionTimeout(self.timeout.as_secs()))
            .and_then(|result| result)
            .map_err(|err| self.surface(&video_id, err))?;

        let candidates = candidate_extensions(self.transcode.as_ref());
        let payload = transfer_and_cleanup(&extracted.produced_path, &candidates).await?;

        tracing::info!(
            "Fetched \"{}\" ({}, {}{})",
            extracted.title,
            payload.content_type,
            format_file_size(payload.bytes.len() as u64),
            extracted
                .duration_seconds
                .map(|secs| format!(", {}", format_duration(secs)))
                .unwrap_or_default()
        );

        drop(artifact);

        let extension = payload
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(AudioFormat::Mp3.as_str())
            .to_string();

        Ok(FetchedAudio {
            title: extracted.title,
            video_id,
            duration_seconds: extracted.duration_seconds,
            content_type: payload.content_type,
            extension,
            bytes: payload.bytes,
        })
    }

    /// Log extraction failures in full, optionally hiding tool output from callers
    fn surface(&self, video_id: &str, err: BridgeError) -> BridgeError {
        tracing::warn!("{} failed for {}: {}", self.extractor.tool_name(), video_id, err);

        match err {
            BridgeError::ExtractionFailed(_) if self.redact_tool_errors => {
                BridgeError::ExtractionFailed(REDACTED_EXTRACTION_ERROR.to_string())
            }
            other => other,
        }
    }
}
