use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extractors::TranscodeTarget;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener settings
    pub server: ServerConfig,

    /// Shared-secret authentication
    pub auth: AuthConfig,

    /// Extraction tool and temp file settings
    pub extraction: ExtractionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret; empty or absent disables authentication
    pub api_key: Option<String>,

    /// Header the secret is read from
    pub header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// yt-dlp executable name or path
    pub yt_dlp_path: String,

    /// Format selector passed to the tool
    pub format: String,

    /// Directory for per-request temp files
    pub temp_dir: Option<PathBuf>,

    /// Upper bound on one extraction run
    pub timeout_secs: u64,

    /// Convert downloaded audio to this codec
    pub transcode: Option<TranscodeTarget>,

    /// Hide raw tool error messages from callers
    pub redact_tool_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            header: "X-API-Key".to_string(),
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            format: "bestaudio/best".to_string(),
            temp_dir: None,
            timeout_secs: 300,
            transcode: None,
            redact_tool_errors: false,
        }
    }
}

impl AuthConfig {
    /// The configured key, if authentication is enabled
    pub fn required_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl ExtractionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Temp directory, defaulting to a subdirectory of the OS temp dir
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("audio-bridge"))
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub temp_dir: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub yt_dlp_path: Option<String>,
}

impl Config {
    /// Load configuration from file (if any), apply overrides, validate
    pub fn load(explicit_path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut config = match Self::config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        serde_yaml::from_str(&content).context("Failed to parse config file")
    }

    /// Get configuration file path, if one should be read
    fn config_path(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            if !path.exists() {
                anyhow::bail!("Config file does not exist: {}", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }

        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        Ok(dirs::config_dir()
            .map(|dir| dir.join("audio-bridge").join("config.yaml"))
            .filter(|path| path.exists()))
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(api_key) = overrides.api_key {
            self.auth.api_key = Some(api_key);
        }
        if let Some(temp_dir) = overrides.temp_dir {
            self.extraction.temp_dir = Some(temp_dir);
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.extraction.timeout_secs = timeout_secs;
        }
        if let Some(path) = overrides.yt_dlp_path {
            self.extraction.yt_dlp_path = path;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be non-zero");
        }

        if self.auth.header.trim().is_empty() {
            anyhow::bail!("API key header name must not be empty");
        }

        if self.extraction.timeout_secs == 0 {
            anyhow::bail!("Extraction timeout must be at least one second");
        }

        if self.extraction.format.trim().is_empty() {
            anyhow::bail!("Extraction format selector must not be empty");
        }

        if self.extraction.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("yt-dlp path must not be empty");
        }

        if let Some(target) = &self.extraction.transcode {
            if !target.is_supported() {
                anyhow::bail!("Unsupported transcode codec: {}", target.codec);
            }
        }

        Ok(())
    }

    /// Listen address as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen: {}", self.bind_address());
        println!(
            "  Auth: {}",
            if self.auth.required_key().is_some() {
                format!("API key required ({})", self.auth.header)
            } else {
                "disabled".to_string()
            }
        );
        println!("  yt-dlp: {}", self.extraction.yt_dlp_path);
        println!("  Format: {}", self.extraction.format);
        println!("  Temp Dir: {}", self.extraction.resolved_temp_dir().display());
        println!("  Timeout: {}s", self.extraction.timeout_secs);
        if let Some(target) = &self.extraction.transcode {
            println!("  Transcode: {} @ {}", target.codec, target.bitrate);
        }
    }
}
