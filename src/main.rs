use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use audio_bridge::cli::{Cli, Commands};
use audio_bridge::config::Config;
use audio_bridge::extractors::{self, YtDlpExtractor};
use audio_bridge::{server, utils, AudioPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    let config = Config::load(cli.config.as_deref(), cli.command.overrides())?;

    match cli.command {
        Commands::Serve { .. } => {
            report_missing_dependencies(&config).await;
            let extractor = Arc::new(YtDlpExtractor::new(config.extraction.yt_dlp_path.clone()));
            server::serve(&config, extractor).await?;
        }
        Commands::Fetch { reference, output, .. } => {
            let extractor = Arc::new(YtDlpExtractor::new(config.extraction.yt_dlp_path.clone()));
            let pipeline = AudioPipeline::new(extractor, &config.extraction);
            fs_err::create_dir_all(pipeline.temp_dir()).context("Failed to create temp directory")?;

            let audio = pipeline.fetch(&reference).await?;

            let path = output
                .unwrap_or_else(|| format!("{}.{}", audio.video_id, audio.extension).into());
            fs_err::write(&path, &audio.bytes)?;

            println!("{}", audio.title);
            println!(
                "Saved {} to: {}",
                utils::format_file_size(audio.bytes.len() as u64),
                path.display()
            );
        }
        Commands::Resolve { reference } => {
            let video_id = extractors::resolve(&reference)?;
            println!("{}", video_id);
        }
        Commands::Check => {
            config.display();
            let missing = utils::check_dependencies(&config.extraction.yt_dlp_path).await;
            if missing.is_empty() {
                println!("All external tools found.");
            } else {
                println!("Missing tools:");
                for dep in &missing {
                    println!("  • {}", dep);
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "audio_bridge=debug,tower_http=debug"
    } else {
        "audio_bridge=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr so `fetch` and `resolve` output stays clean on stdout
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Missing tools are reported but not fatal; they may appear on PATH later
async fn report_missing_dependencies(config: &Config) {
    let missing = utils::check_dependencies(&config.extraction.yt_dlp_path).await;
    for dep in missing {
        tracing::warn!("Dependency check: {}", dep);
    }
}
