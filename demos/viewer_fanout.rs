//! Viewer fan-out demo with simulated cameras
//!
//! Run with: cargo run --example viewer_fanout [SERIAL] [SECONDS]
//!
//! Examples:
//!   cargo run --example viewer_fanout                 # camera 40012345 for 3s
//!   cargo run --example viewer_fanout CAM1 10         # camera CAM1 for 10s
//!
//! Three viewers attach to the same camera. One acquisition loop serves all
//! of them; the session is torn down when the last viewer detaches. Press
//! Ctrl+C to stop early.

use std::sync::Arc;
use std::time::Duration;

use camstream::device::{CameraId, SimulatedOpener};
use camstream::features::{apply_settings, FeatureMap};
use camstream::sink::ViewerMessage;
use camstream::{DeviceOpener, RegistryConfig, StreamRegistry};

fn print_usage() {
    eprintln!("Usage: viewer_fanout [SERIAL] [SECONDS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  SERIAL     Camera serial number (default: 40012345)");
    eprintln!("  SECONDS    How long the viewers watch (default: 3)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let camera = CameraId::new(args.get(1).map(String::as_str).unwrap_or("40012345"));
    let seconds: u64 = match args.get(2) {
        Some(s) => s.parse()?,
        None => 3,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camstream=info".parse()?)
                .add_directive("viewer_fanout=debug".parse()?),
        )
        .init();

    let config = RegistryConfig::default().sink_buffer(4);
    let registry = Arc::new(StreamRegistry::with_config(SimulatedOpener::new(), config)?);
    let cleanup = registry.spawn_cleanup_task();

    // Configure the camera before streaming; the node map outlives the connection
    {
        let mut device = registry.opener().open(&camera)?;
        let settings = serde_json::json!({ "Gain": 6, "PixelFormat": "RGB8", "Width": 32 });
        if let Some(settings) = settings.as_object() {
            let report = apply_settings(&mut device, settings);
            println!("Applied: {:?}", report.applied);
            println!("Rejected: {:?}", report.rejected);
        }
        println!("Features: {}", device.descriptors().len());
    }

    let mut viewers = Vec::new();
    for n in 0..3 {
        let (sink, mut rx) = registry.attach_viewer(&camera).await;
        let task = tokio::spawn(async move {
            let mut frames = 0u64;
            let mut bytes = 0usize;
            while let Some(message) = rx.recv().await {
                match message {
                    ViewerMessage::Frame(envelope) => {
                        frames += 1;
                        bytes += envelope.len();
                    }
                    ViewerMessage::Closed(code) => {
                        println!("Viewer {} closed by server with code {}", n, code);
                    }
                }
            }
            (frames, bytes)
        });
        viewers.push((sink, task));
    }

    println!(
        "{} viewers on camera {} ({} session)",
        viewers.len(),
        camera,
        registry.session_count().await
    );

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    if let Some(stats) = registry.session_stats(&camera).await {
        println!(
            "Session: {} frames, {:.1} fps, {} deliveries, {} drops",
            stats.frames_broadcast,
            stats.broadcast_fps(),
            stats.deliveries,
            stats.drops
        );
    }

    for (n, (sink, task)) in viewers.into_iter().enumerate() {
        registry.detach(&camera, &sink).await;
        drop(sink);
        let (frames, bytes) = task.await?;
        println!("Viewer {}: {} frames, {} bytes", n, frames, bytes);
    }

    println!("Streaming after last detach: {}", registry.is_streaming(&camera).await);

    cleanup.abort();
    registry.shutdown().await;
    Ok(())
}
