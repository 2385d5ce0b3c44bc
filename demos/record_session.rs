// Example: Record a scripted webcam session into a reassembled artifact
//
// This example demonstrates the complete recording pipeline:
// 1. Mount a scripted camera in a capture registry
// 2. Bind the session's callbacks to a reassembler
// 3. Record for a few seconds, emitting chunks every timeslice
// 4. Stop, then report the artifact URL and take a screenshot
//
// Usage: cargo run --example record_session -- --duration 2
//
// Capture settings come from the `[capture]` section of the config file.
// This will write the artifact to ~/.webcam-bridge/uploads/demo-client_video.webm

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn, Level};
use webcam_bridge::{
    bind_reassembler, CaptureHandle, CaptureRegistry, Config, Reassembler, ScreenshotStore,
    ScriptedCamera,
};

#[derive(Parser)]
#[command(name = "record_session")]
#[command(about = "Record a scripted webcam session")]
struct Args {
    /// Duration to record in seconds
    #[arg(short, long, default_value = "2")]
    duration: u64,

    /// Artifact key (used for the artifact filename)
    #[arg(short, long, default_value = "demo-client")]
    key: String,

    /// Output directory
    #[arg(short, long, default_value = "~/.webcam-bridge/uploads")]
    output_dir: String,

    /// Timeslice in milliseconds (overrides the config file)
    #[arg(short, long)]
    timeslice_ms: Option<u64>,

    /// Config file (TOML), without extension
    #[arg(short, long, default_value = "config/webcam-bridge")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();

    info!("Webcam Bridge - Recording Session Example");
    info!("Recording for {} seconds", args.duration);

    // Expand home directory
    let output_dir = shellexpand::tilde(&args.output_dir);
    let output_dir = PathBuf::from(output_dir.as_ref());
    info!("Output directory: {}", output_dir.display());

    let cfg = Config::load(&args.config)?;

    let mut capture = cfg.capture.clone();
    let timeslice_ms = args.timeslice_ms.or(capture.timeslice_ms).unwrap_or(250);
    capture.timeslice_ms = Some(timeslice_ms);
    info!("Capture config: {:?}", capture);

    let mut reassembler_config = cfg.reassembler_config();
    reassembler_config.upload_dir = output_dir;

    let reassembler = Arc::new(Reassembler::new(reassembler_config));
    let (callbacks, mut failures) = bind_reassembler(Arc::clone(&reassembler), &args.key);

    // One synthetic chunk per timeslice, with an empty one mixed in
    let chunk_count = (args.duration * 1000 / timeslice_ms.max(1)) as usize;
    let chunks = (0..chunk_count)
        .map(|i| if i % 5 == 4 { Vec::new() } else { format!("chunk-{:04};", i).into_bytes() })
        .collect();

    let camera = ScriptedCamera::new("scripted-webcam")
        .with_chunks(chunks)
        .with_frame(vec![0xff, 0xd8, 0xff, 0xe0]);

    let registry = CaptureRegistry::new();
    let session = registry
        .mount(CaptureHandle::new("webcam", capture, Arc::new(camera)), callbacks)
        .await;

    info!("Starting recording...");
    let state = session.start().await?;
    info!("Recorder state: {:?}", state);

    sleep(Duration::from_secs(args.duration)).await;

    info!("Stopping recording...");
    session.stop().await;

    let stats = session.stats().await;
    info!(
        "Delivered {} chunks ({} bytes), discarded {} empty",
        stats.chunks_delivered, stats.bytes_delivered, stats.empty_chunks_discarded
    );

    while let Ok(error) = failures.try_recv() {
        warn!("Bridge failure: {}", error);
    }

    let status = reassembler.status(&args.key).await?;
    info!("Artifact: {}", reassembler.artifact_path(&args.key)?.display());
    info!("  url: {}", status.url);
    info!("  exists: {}", status.exists);
    info!("  bytes: {}", status.bytes_written);

    // Screenshot into an in-memory slot
    let store = ScreenshotStore::new();
    match registry.screenshot("webcam").await? {
        Ok(payload) => {
            if let Some(screenshot) = store.accept("webcam", &payload.data_uri).await? {
                info!(
                    "Screenshot at {}: {} ({} bytes)",
                    screenshot.timestamp,
                    screenshot.mime_type,
                    screenshot.data.len()
                );
            }
        }
        Err(error) => warn!("Screenshot failed: {} ({})", error.message, error.kind),
    }

    Ok(())
}
