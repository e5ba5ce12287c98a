//! Clip Capture Widget
//!
//! Host-facing facade tying a camera session and a recording controller to
//! preview-surface lifecycle and record-button input, plus the event loop
//! that drives the elapsed-time tick.

use camera_session::{CameraError, CameraSession, DriverProvider, Facing, ParameterOutcome};
use clip_recorder::{
    format_elapsed, ConfigError, PreviewSurface, RecordError, RecordListener, Recorder, RecordingController,
    StopOutcome, WidgetConfig,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Widget error types
#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Recording error: {0}")]
    Record(#[from] RecordError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Input from the host, processed in order on the widget's event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetCommand {
    SurfaceCreated(PreviewSurface),
    SurfaceDestroyed,
    OpenCamera,
    CloseCamera,
    /// Record button: stop if recording, otherwise start
    ToggleRecord,
    StopRecord,
    CancelRecord,
    SetTorch(bool),
    Shutdown,
}

/// Capture widget
pub struct CaptureWidget<P: DriverProvider, R: Recorder, L: RecordListener> {
    controller: RecordingController<P, R, L>,
    facing: Facing,
    auto_open: bool,
    surface_ready: bool,
}

impl<P: DriverProvider, R: Recorder, L: RecordListener> CaptureWidget<P, R, L> {
    /// Create a widget; fails if the duration bounds are inconsistent
    pub fn new(provider: P, recorder: R, listener: L, config: &WidgetConfig) -> Result<Self, WidgetError> {
        let session = CameraSession::new(provider, config.desired());
        let controller = RecordingController::from_config(session, recorder, listener, config)?;
        Ok(Self {
            controller,
            facing: config.facing,
            auto_open: config.auto_open,
            surface_ready: false,
        })
    }

    /// Preview surface is ready; opens the camera when auto-open is set
    pub fn surface_created(&mut self, surface: PreviewSurface) -> Result<(), WidgetError> {
        self.surface_ready = true;
        self.controller.set_preview_surface(Some(surface));
        if self.auto_open {
            self.open_camera()?;
        }
        Ok(())
    }

    /// Preview surface is gone; the camera cannot stay open without it
    pub fn surface_destroyed(&mut self) {
        self.surface_ready = false;
        self.close_camera();
        self.controller.set_preview_surface(None);
    }

    /// (Re)open the configured camera and start preview.
    /// Does nothing until the preview surface exists.
    pub fn open_camera(&mut self) -> Result<Option<ParameterOutcome>, WidgetError> {
        if !self.surface_ready {
            warn!("Preview surface not ready; not opening camera");
            return Ok(None);
        }
        self.close_camera();

        let session = self.controller.session_mut();
        let outcome = session.open(self.facing)?;
        session.start_preview()?;
        Ok(Some(outcome))
    }

    /// Stop preview and release the camera, cancelling any recording
    pub fn close_camera(&mut self) {
        if self.controller.is_recording() {
            self.controller.cancel();
        }
        let session = self.controller.session_mut();
        session.stop_preview();
        if let Err(e) = session.close() {
            warn!("Failed to close camera: {}", e);
        }
    }

    pub fn toggle_record(&mut self) -> Result<(), WidgetError> {
        if self.controller.is_recording() {
            self.controller.stop(false)?;
        } else {
            self.controller.start()?;
        }
        Ok(())
    }

    pub fn cancel_record(&mut self) -> StopOutcome {
        self.controller.cancel()
    }

    pub fn set_torch(&mut self, enabled: bool) -> Result<(), WidgetError> {
        self.controller.session_mut().set_torch(enabled)?;
        Ok(())
    }

    pub fn torch_state(&self) -> bool {
        self.controller.session().torch_state()
    }

    /// Switch cameras; takes effect on the next open
    pub fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }

    pub fn controller(&self) -> &RecordingController<P, R, L> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut RecordingController<P, R, L> {
        &mut self.controller
    }

    /// Apply one command. Returns `false` when the loop should exit.
    pub fn handle(&mut self, command: WidgetCommand) -> Result<bool, WidgetError> {
        debug!("Widget command {:?}", command);
        match command {
            WidgetCommand::SurfaceCreated(surface) => self.surface_created(surface)?,
            WidgetCommand::SurfaceDestroyed => self.surface_destroyed(),
            WidgetCommand::OpenCamera => {
                self.open_camera()?;
            }
            WidgetCommand::CloseCamera => self.close_camera(),
            WidgetCommand::ToggleRecord => self.toggle_record()?,
            WidgetCommand::StopRecord => {
                self.controller.stop(false)?;
            }
            WidgetCommand::CancelRecord => {
                self.cancel_record();
            }
            WidgetCommand::SetTorch(enabled) => self.set_torch(enabled)?,
            WidgetCommand::Shutdown => return Ok(false),
        }
        Ok(true)
    }

    /// Event loop: apply commands and run ticks until shutdown or until
    /// the command channel closes. The camera is closed on exit.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<WidgetCommand>) {
        info!("Capture widget running");
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    match self.handle(command) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => warn!("{:?} failed: {}", command, e),
                    }
                }
                Some(elapsed) = self.controller.wait_tick(), if self.controller.is_recording() => {
                    debug!("Elapsed {}", format_elapsed(elapsed));
                }
            }
        }
        self.close_camera();
        info!("Capture widget stopped");
    }
}

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_session::{MockCameraProvider, MockProbe, SessionState};
    use clip_recorder::{ChannelListener, FileRecorder, RecordEvent, RecordState};
    use std::time::Duration;
    use tempfile::TempDir;

    type TestWidget = CaptureWidget<MockCameraProvider, FileRecorder, Vec<RecordEvent>>;

    fn widget(config: WidgetConfig) -> (TestWidget, MockProbe, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = WidgetConfig {
            output_path: dir.path().join("clip.mp4"),
            ..config
        };
        let (provider, probe) = MockCameraProvider::new();
        let widget = CaptureWidget::new(provider, FileRecorder::new(), Vec::new(), &config).unwrap();
        (widget, probe, dir)
    }

    #[test]
    fn test_invalid_durations_rejected() {
        let config = WidgetConfig {
            min_duration_secs: 9,
            max_duration_secs: 3,
            ..Default::default()
        };
        let (provider, _probe) = MockCameraProvider::new();
        let result = CaptureWidget::new(provider, FileRecorder::new(), Vec::<RecordEvent>::new(), &config);
        assert!(matches!(result, Err(WidgetError::Config(ConfigError::InvalidDuration { .. }))));
    }

    #[test]
    fn test_auto_open_on_surface() {
        let (mut widget, _probe, _dir) = widget(WidgetConfig {
            auto_open: true,
            ..Default::default()
        });
        widget.surface_created(PreviewSurface(1)).unwrap();
        assert_eq!(widget.controller().session().state(), SessionState::Previewing);
    }

    #[test]
    fn test_no_auto_open_by_default() {
        let (mut widget, _probe, _dir) = widget(WidgetConfig::default());
        widget.surface_created(PreviewSurface(1)).unwrap();
        assert!(!widget.controller().session().is_open());
    }

    #[test]
    fn test_open_requires_surface() {
        let (mut widget, _probe, _dir) = widget(WidgetConfig::default());
        assert_eq!(widget.open_camera().unwrap(), None);
        assert!(!widget.controller().session().is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_destroyed_cancels_recording() {
        let (mut widget, probe, _dir) = widget(WidgetConfig::default());
        widget.surface_created(PreviewSurface(1)).unwrap();
        widget.open_camera().unwrap();
        widget.toggle_record().unwrap();
        assert!(widget.controller().is_recording());

        widget.surface_destroyed();
        assert_eq!(widget.controller().state(), RecordState::Idle);
        assert!(widget.controller().listener().contains(&RecordEvent::Cancelled));
        assert!(probe.is_released());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_respects_min_duration() {
        let (mut widget, _probe, _dir) = widget(WidgetConfig {
            min_duration_secs: 2,
            ..Default::default()
        });
        widget.surface_created(PreviewSurface(1)).unwrap();
        widget.open_camera().unwrap();
        widget.toggle_record().unwrap();

        let result = widget.toggle_record();
        assert!(matches!(result, Err(WidgetError::Record(RecordError::TooShort { .. }))));
        assert!(widget.controller().is_recording());

        tokio::time::advance(Duration::from_secs(2)).await;
        widget.toggle_record().unwrap();
        assert!(widget
            .controller()
            .listener()
            .contains(&RecordEvent::Stopped { duration_ms: 2000 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_torch_through_widget() {
        let (mut widget, _probe, _dir) = widget(WidgetConfig::default());
        widget.surface_created(PreviewSurface(1)).unwrap();
        widget.open_camera().unwrap();
        widget.set_torch(true).unwrap();
        assert!(widget.torch_state());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_auto_stops() {
        let (mut widget, probe, _dir) = widget(WidgetConfig {
            max_duration_secs: 2,
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(8);
        tx.send(WidgetCommand::SurfaceCreated(PreviewSurface(1))).await.unwrap();
        tx.send(WidgetCommand::OpenCamera).await.unwrap();
        tx.send(WidgetCommand::ToggleRecord).await.unwrap();

        let script = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            tx.send(WidgetCommand::Shutdown).await.unwrap();
        });

        widget.run(rx).await;
        script.await.unwrap();

        let events = widget.controller().listener();
        assert_eq!(events.first(), Some(&RecordEvent::Started));
        assert_eq!(events.last(), Some(&RecordEvent::Stopped { duration_ms: 2000 }));
        assert!(events.contains(&RecordEvent::Tick { elapsed_ms: 1000 }));
        assert!(probe.is_released());
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_reach_channel_listener() {
        let dir = tempfile::tempdir().unwrap();
        let config = WidgetConfig {
            max_duration_secs: 1,
            output_path: dir.path().join("clip.mp4"),
            ..Default::default()
        };
        let (provider, _probe) = MockCameraProvider::new();
        let (listener, mut events) = ChannelListener::new();
        let mut widget = CaptureWidget::new(provider, FileRecorder::new(), listener, &config).unwrap();

        widget.surface_created(PreviewSurface(1)).unwrap();
        widget.open_camera().unwrap();
        widget.toggle_record().unwrap();
        assert_eq!(widget.controller_mut().wait_tick().await, Some(1000));
        assert!(!widget.controller().is_recording());
        drop(widget);

        let mut received = Vec::new();
        while let Some(event) = events.recv().await {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![
                RecordEvent::Started,
                RecordEvent::Tick { elapsed_ms: 1000 },
                RecordEvent::Stopped { duration_ms: 1000 },
            ]
        );
    }
}
