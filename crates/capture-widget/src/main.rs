//! Clip capture demo
//!
//! Drives the widget against the mock camera driver: surface up, open,
//! record one clip, shut down.

use anyhow::Result;
use camera_session::MockCameraProvider;
use capture_widget::{init_logging, CaptureWidget, WidgetCommand};
use clip_recorder::{format_elapsed, ChannelListener, FileRecorder, PreviewSurface, RecordEvent, WidgetConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging(Level::INFO)?;

    info!("=== Clip Capture v{} ===", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = WidgetConfig::load(config_path.as_deref())?;
    info!(
        "Target {}x{} @ {}fps, {}kb, duration {}s..{}s",
        config.video_width,
        config.video_height,
        config.frame_rate,
        config.bit_rate_kb,
        config.min_duration_secs,
        config.max_duration_secs
    );

    let (provider, _probe) = MockCameraProvider::new();
    let (listener, mut events) = ChannelListener::new();
    let mut widget = CaptureWidget::new(provider, FileRecorder::new(), listener, &config)?;

    // Time display and toasts
    let display = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RecordEvent::Started => info!("Recording started"),
                RecordEvent::Tick { elapsed_ms } => info!("{}", format_elapsed(elapsed_ms)),
                RecordEvent::TooShort { min_duration_secs } => {
                    info!("Record at least {} seconds", min_duration_secs)
                }
                RecordEvent::Stopped { duration_ms } => {
                    info!("Recording finished after {}", format_elapsed(duration_ms))
                }
                RecordEvent::Cancelled => info!("Recording cancelled"),
            }
        }
    });

    // Hold the clip past the minimum; a limited maximum ends it on its own
    let clip = if config.max_duration_secs > 0 {
        config.max_duration_secs + 1
    } else {
        config.min_duration_secs.max(3)
    };

    let (tx, rx) = mpsc::channel(16);
    let script = tokio::spawn(async move {
        let steps = async {
            tx.send(WidgetCommand::SurfaceCreated(PreviewSurface(1))).await?;
            tx.send(WidgetCommand::OpenCamera).await?;
            tx.send(WidgetCommand::ToggleRecord).await?;
            tokio::time::sleep(Duration::from_secs(clip as u64)).await;
            tx.send(WidgetCommand::StopRecord).await?;
            tx.send(WidgetCommand::Shutdown).await
        };
        if let Err(e) = steps.await {
            warn!("Demo script aborted: {}", e);
        }
    });

    widget.run(rx).await;
    script.await?;
    drop(widget);
    display.await?;

    info!("Clip written to {}", config.output_path.display());
    Ok(())
}
