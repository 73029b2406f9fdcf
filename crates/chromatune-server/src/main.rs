mod error;
mod pipeline;
mod web;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chromatune_render::{AudioRenderer, SoundFontRenderer, DEFAULT_SAMPLE_RATE};
use clap::Parser;

/// The Chromatune image-to-music server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the GM soundfont used for rendering.
    /// Falls back to $SOUNDFONT_PATH, then to soundfonts/FluidR3_GM.sf2.
    #[arg(long)]
    soundfont: Option<PathBuf>,

    /// Directory where generated audio artifacts are stored
    #[arg(long, default_value = "audio")]
    audio_dir: PathBuf,

    /// Output sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let soundfont = cli.soundfont.unwrap_or_else(|| {
        std::env::var("SOUNDFONT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("soundfonts/FluidR3_GM.sf2"))
    });

    std::fs::create_dir_all(&cli.audio_dir).context("Failed to create audio directory")?;
    tracing::info!("Audio artifacts at: {}", cli.audio_dir.display());

    // Loaded once, shared read-only across all requests.
    let renderer: Arc<dyn AudioRenderer> = Arc::new(
        SoundFontRenderer::from_file(&soundfont, cli.sample_rate)
            .context("Failed to load soundfont")?,
    );

    let state = web::AppState {
        renderer,
        audio_dir: cli.audio_dir,
        start_time: Instant::now(),
    };
    let app = web::router(state);

    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("🎨 Chromatune listening on http://{addr}");
    tracing::info!("   Generate: POST http://{addr}/generate");
    tracing::info!("   Audio:    GET  http://{addr}/audio/:id");
    tracing::info!("   Health:   GET  http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM (systemd, cargo-watch, etc.)
async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down gracefully...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(_) => std::future::pending::<()>().await,
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
