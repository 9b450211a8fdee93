use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

#[derive(Parser)]
#[command(
    name = "audio-bridge",
    about = "Audio Bridge - Fetch YouTube audio through yt-dlp and serve it as base64 JSON",
    version,
    long_about = "An HTTP adapter that accepts a YouTube URL or video id, downloads the best available audio with yt-dlp, and returns it base64-encoded with its title, duration, content type and size. Temp files are removed after every request."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Path to a YAML config file
    #[arg(short, long, global = true, env = "AUDIO_BRIDGE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to bind
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Shared secret required in the API key header (empty disables auth)
        #[arg(long, env = "API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },

    /// Download audio for one reference and write it to a file
    Fetch {
        /// YouTube URL or video id
        #[arg(value_name = "URL_OR_ID")]
        reference: String,

        /// Output file path (defaults to <videoId>.<ext> in the current directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },

    /// Print the video id a URL resolves to
    Resolve {
        /// YouTube URL or video id
        #[arg(value_name = "URL_OR_ID")]
        reference: String,
    },

    /// Check that yt-dlp and ffmpeg are installed
    Check,
}

/// Extraction settings that can be overridden per invocation
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ExtractionArgs {
    /// Directory for per-request temp files
    #[arg(long, env = "AUDIO_BRIDGE_TEMP_DIR", value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Maximum seconds one extraction may run
    #[arg(long, env = "EXTRACTION_TIMEOUT_SECS", value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// yt-dlp executable
    #[arg(long, env = "YT_DLP_PATH", value_name = "PATH")]
    pub yt_dlp_path: Option<String>,
}

impl Commands {
    /// Config overrides carried by this command
    pub fn overrides(&self) -> Overrides {
        match self {
            Commands::Serve {
                host,
                port,
                api_key,
                extraction,
            } => Overrides {
                host: host.clone(),
                port: *port,
                api_key: api_key.clone(),
                ..extraction.overrides()
            },
            Commands::Fetch { extraction, .. } => extraction.overrides(),
            Commands::Resolve { .. } | Commands::Check => Overrides::default(),
        }
    }
}

impl ExtractionArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            temp_dir: self.temp_dir.clone(),
            timeout_secs: self.timeout_secs,
            yt_dlp_path: self.yt_dlp_path.clone(),
            ..Overrides::default()
        }
    }
}
