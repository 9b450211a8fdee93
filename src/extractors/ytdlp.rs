use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{extraction_failed, ExtractionConfig, ExtractionResult, MediaExtractor};
use crate::Result;

const UNKNOWN_TITLE: &str = "Unknown";

/// Audio extractor backed by the yt-dlp executable
pub struct YtDlpExtractor {
    yt_dlp_path: String,
}

impl YtDlpExtractor {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Arguments for one download run
    fn build_args(reference: &str, config: &ExtractionConfig) -> Vec<String> {
        let mut args: Vec<String> = [
            "--format",
            config.format.as_str(),
            "--output",
            &config.output_template.to_string_lossy(),
            "--no-playlist",
            // Keep the tool's own console chatter out of our streams
            "--quiet",
            "--no-warnings",
            "--no-progress",
            // Structured metadata on stdout while still downloading
            "--dump-json",
            "--no-simulate",
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect();

        if let Some(target) = &config.transcode {
            args.extend([
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                target.codec.clone(),
                "--audio-quality".to_string(),
                target.bitrate.clone(),
            ]);
        }

        args.push(reference.to_string());
        args
    }

    /// Pull title, duration and final path out of the `--dump-json` output
    fn parse_metadata(stdout: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
        let line = stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| extraction_failed("yt-dlp returned no metadata"))?;

        let info: Value = serde_json::from_str(line)
            .map_err(|e| extraction_failed(format!("Unreadable yt-dlp metadata: {}", e)))?;

        let title = info["title"]
            .as_str()
            .filter(|title| !title.is_empty())
            .unwrap_or(UNKNOWN_TITLE)
            .to_string();
        let duration_seconds = info["duration"].as_f64();

        let mut produced_path = info["_filename"]
            .as_str()
            .or_else(|| info["filename"].as_str())
            .map(PathBuf::from)
            .or_else(|| {
                info["ext"]
                    .as_str()
                    .map(|ext| expand_template(&config.output_template, ext))
            })
            .ok_or_else(|| extraction_failed("yt-dlp did not report an output file"))?;

        if let Some(target) = &config.transcode {
            produced_path.set_extension(target.extension());
        }

        Ok(ExtractionResult {
            title,
            duration_seconds,
            produced_path,
        })
    }
}

/// Replace the `%(ext)s` placeholder in an output template
fn expand_template(template: &Path, ext: &str) -> PathBuf {
    PathBuf::from(template.to_string_lossy().replace("%(ext)s", ext))
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract(&self, reference: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
        tracing::debug!("Running {} for: {}", self.tool_name(), reference);

        let output = Command::new(&self.yt_dlp_path)
            .args(Self::build_args(reference, config))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A dropped request (timeout or client gone) must not leave yt-dlp running
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| extraction_failed(format!("Failed to launch {}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            return Err(extraction_failed(if message.is_empty() {
                format!("yt-dlp exited with {}", output.status)
            } else {
                message.to_string()
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_metadata(&stdout, config)
    }

    fn tool_name(&self) -> &'static str {
        "yt-dlp"
    }
}
