//! Bounded-duration recording state machine

use crate::config::{DurationPolicy, WidgetConfig};
use crate::error::{ConfigError, RecordError, RecorderError};
use crate::factory::MediaRecorderFactory;
use crate::listener::RecordListener;
use crate::recorder::{remove_stale_output, PreviewSurface, Recorder, RecordingTarget};
use camera_session::{CameraLease, CameraSession, DeviceCapabilities, DriverProvider};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Interval between elapsed-time ticks
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Idle,
    Recording,
}

/// Result of a stop or cancel request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was recording
    NotRecording,
    /// Recording finished and `on_stop_record` fired
    Completed { duration_ms: u64 },
    /// Recording was cancelled and `on_cancel_record` fired
    Cancelled,
}

/// State held only while recording. Dropping it cancels the pending tick.
struct ActiveRecording {
    id: Uuid,
    started_at: Instant,
    next_tick: Instant,
    lease: CameraLease,
}

impl ActiveRecording {
    fn elapsed_ms(&self, now: Instant) -> u64 {
        now.duration_since(self.started_at).as_millis() as u64
    }
}

/// Drives one camera session and one recorder through clip recordings.
///
/// All methods run on the owning event loop. The tick is a deadline the
/// loop awaits through [`RecordingController::wait_tick`].
pub struct RecordingController<P: DriverProvider, R: Recorder, L: RecordListener> {
    session: CameraSession<P>,
    recorder: R,
    listener: L,
    policy: DurationPolicy,
    output_path: PathBuf,
    preview_surface: Option<PreviewSurface>,
    active: Option<ActiveRecording>,
}

impl<P: DriverProvider, R: Recorder, L: RecordListener> RecordingController<P, R, L> {
    /// Create an idle controller
    pub fn new(
        session: CameraSession<P>,
        recorder: R,
        listener: L,
        policy: DurationPolicy,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            session,
            recorder,
            listener,
            policy,
            output_path: output_path.into(),
            preview_surface: None,
            active: None,
        }
    }

    /// Create an idle controller from widget configuration
    pub fn from_config(
        session: CameraSession<P>,
        recorder: R,
        listener: L,
        config: &WidgetConfig,
    ) -> Result<Self, ConfigError> {
        let policy = config.duration_policy()?;
        Ok(Self::new(session, recorder, listener, policy, &config.output_path))
    }

    /// Start recording from the open camera
    pub fn start(&mut self) -> Result<(), RecordError> {
        if self.active.is_some() {
            return Err(RecordError::AlreadyRecording);
        }
        let Some(capabilities) = self.session.capabilities().filter(|_| self.session.is_open()).cloned() else {
            warn!("Open the camera before recording");
            return Err(RecordError::CameraNotOpen);
        };
        if self.session.is_lent() {
            return Err(RecordError::CameraNotOpen);
        }

        let started_at = Instant::now();
        let lease = self.session.unlock().map_err(|e| {
            metrics::counter!("capture_recordings_failed_total").increment(1);
            RecordError::RecordStartFailed(e.into())
        })?;

        if let Err(e) = self.begin(&capabilities, &lease) {
            warn!("Recorder failed to start: {}", e);
            self.recorder.reset();
            self.recorder.release();
            self.session.relock(lease);
            metrics::counter!("capture_recordings_failed_total").increment(1);
            return Err(RecordError::RecordStartFailed(e));
        }

        let id = Uuid::new_v4();
        info!("Recording {} started -> {}", id, self.output_path.display());
        self.active = Some(ActiveRecording {
            id,
            started_at,
            next_tick: Instant::now() + TICK_INTERVAL,
            lease,
        });
        metrics::counter!("capture_recordings_started_total").increment(1);
        self.listener.on_start_record();
        Ok(())
    }

    /// Build the profile, then bind the output path and start the recorder.
    /// Output is only touched once the profile exists; a failure after that
    /// removes whatever the recorder wrote.
    fn begin(&mut self, capabilities: &DeviceCapabilities, lease: &CameraLease) -> Result<(), RecorderError> {
        let profile = MediaRecorderFactory::from_custom_config(self.session.desired(), capabilities)?;
        remove_stale_output(&self.output_path)?;

        let target = RecordingTarget {
            output_path: self.output_path.clone(),
            orientation_hint: lease.orientation(),
            preview_surface: self.preview_surface,
        };
        let started = self
            .recorder
            .configure(&profile, &target, lease)
            .and_then(|()| self.recorder.prepare())
            .and_then(|()| self.recorder.start());
        if started.is_err() {
            if let Err(e) = remove_stale_output(&self.output_path) {
                warn!("Could not remove partial output: {}", e);
            }
        }
        started
    }

    /// Run one tick: publish elapsed time, then auto-stop at the maximum
    /// duration or schedule the next tick. Returns the elapsed time, or
    /// `None` when idle.
    pub fn tick(&mut self) -> Option<u64> {
        let now = Instant::now();
        let active = self.active.as_mut()?;
        let elapsed = active.elapsed_ms(now);
        active.next_tick = now + TICK_INTERVAL;

        self.listener.on_tick(elapsed);
        if self.policy.is_expired(elapsed) {
            info!("Maximum duration reached after {}ms", elapsed);
            self.finish(false);
        }
        Some(elapsed)
    }

    /// When the next tick is due, if recording
    pub fn next_tick(&self) -> Option<Instant> {
        self.active.as_ref().map(|a| a.next_tick)
    }

    /// Sleep until the next tick is due and run it. Returns `None`
    /// immediately when idle.
    pub async fn wait_tick(&mut self) -> Option<u64> {
        let due = self.next_tick()?;
        tokio::time::sleep_until(due).await;
        self.tick()
    }

    /// Stop recording. A non-forced stop before the minimum duration is
    /// refused and recording continues.
    pub fn stop(&mut self, force: bool) -> Result<StopOutcome, RecordError> {
        let Some(active) = self.active.as_ref() else {
            return Ok(StopOutcome::NotRecording);
        };

        let elapsed = active.elapsed_ms(Instant::now());
        if !force && self.policy.is_too_short(elapsed) {
            debug!("Stop refused at {}ms, minimum {}ms", elapsed, self.policy.min_ms());
            self.listener.on_record_too_short(self.policy.min_secs());
            return Err(RecordError::TooShort {
                elapsed_ms: elapsed,
                min_ms: self.policy.min_ms(),
            });
        }
        Ok(self.finish(force))
    }

    /// Cancel recording regardless of elapsed time
    pub fn cancel(&mut self) -> StopOutcome {
        self.finish(true)
    }

    /// Tear down the recording and fire the single terminal callback
    fn finish(&mut self, cancelled: bool) -> StopOutcome {
        let Some(active) = self.active.take() else {
            return StopOutcome::NotRecording;
        };
        let elapsed = active.elapsed_ms(Instant::now());

        if let Err(e) = self.recorder.stop() {
            warn!("Recorder stop failed: {}", e);
        }
        self.recorder.reset();
        self.recorder.release();
        self.session.relock(active.lease);

        if cancelled {
            info!("Recording {} cancelled after {}ms", active.id, elapsed);
            metrics::counter!("capture_recordings_cancelled_total").increment(1);
            self.listener.on_cancel_record();
            StopOutcome::Cancelled
        } else {
            info!("Recording {} completed: {}ms", active.id, elapsed);
            metrics::counter!("capture_recordings_completed_total").increment(1);
            self.listener.on_stop_record(elapsed);
            StopOutcome::Completed { duration_ms: elapsed }
        }
    }

    pub fn state(&self) -> RecordState {
        if self.active.is_some() {
            RecordState::Recording
        } else {
            RecordState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Time since recording started
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.elapsed_ms(Instant::now()))
    }

    pub fn policy(&self) -> DurationPolicy {
        self.policy
    }

    /// Change duration bounds; applies from the next tick or stop
    pub fn set_policy(&mut self, policy: DurationPolicy) {
        self.policy = policy;
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Destination for the next recording
    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.output_path = path.into();
    }

    pub fn set_preview_surface(&mut self, surface: Option<PreviewSurface>) {
        self.preview_surface = surface;
    }

    pub fn session(&self) -> &CameraSession<P> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CameraSession<P> {
        &mut self.session
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }
}

impl<P: DriverProvider, R: Recorder, L: RecordListener> Drop for RecordingController<P, R, L> {
    fn drop(&mut self) {
        if self.active.is_some() {
            warn!("Controller dropped while recording; cancelling");
            self.finish(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::RecordEvent;
    use crate::recorder::FileRecorder;
    use camera_session::{CameraError, DesiredCaptureConfig, Facing, MockCameraProvider, MockProbe};
    use tempfile::TempDir;

    type TestController = RecordingController<MockCameraProvider, FileRecorder, Vec<RecordEvent>>;

    fn controller(policy: DurationPolicy, recorder: FileRecorder) -> (TestController, MockProbe, TempDir) {
        let (provider, probe) = MockCameraProvider::new();
        let session = CameraSession::new(provider, DesiredCaptureConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        (RecordingController::new(session, recorder, Vec::new(), policy, path), probe, dir)
    }

    fn open_controller(min: u32, max: u32) -> (TestController, MockProbe, TempDir) {
        let (mut ctl, probe, dir) = controller(DurationPolicy::new(min, max).unwrap(), FileRecorder::new());
        ctl.session_mut().open(Facing::Back).unwrap();
        ctl.session_mut().start_preview().unwrap();
        (ctl, probe, dir)
    }

    fn terminal_events(events: &[RecordEvent]) -> Vec<RecordEvent> {
        events
            .iter()
            .copied()
            .filter(|e| matches!(e, RecordEvent::Stopped { .. } | RecordEvent::Cancelled))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_camera() {
        let (mut ctl, _probe, _dir) = controller(DurationPolicy::unlimited(), FileRecorder::new());
        assert!(matches!(ctl.start(), Err(RecordError::CameraNotOpen)));
        assert_eq!(ctl.state(), RecordState::Idle);
        assert!(ctl.listener().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_borrows_handle() {
        let (mut ctl, probe, _dir) = open_controller(0, 0);
        ctl.start().unwrap();

        assert_eq!(ctl.state(), RecordState::Recording);
        assert!(probe.is_unlocked());
        assert!(ctl.session().is_lent());
        assert!(ctl.recorder().is_recording());
        assert!(ctl.output_path().exists());
        assert_eq!(ctl.listener(), &vec![RecordEvent::Started]);
        assert!(matches!(ctl.start(), Err(RecordError::AlreadyRecording)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_replaces_stale_output() {
        let (mut ctl, _probe, _dir) = open_controller(0, 0);
        std::fs::write(ctl.output_path(), b"old clip").unwrap();
        ctl.start().unwrap();

        let contents = std::fs::read_to_string(ctl.output_path()).unwrap();
        assert!(!contents.contains("old clip"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prepare_failure_returns_handle() {
        let (mut ctl, probe, _dir) = controller(DurationPolicy::unlimited(), FileRecorder::failing_prepare());
        ctl.session_mut().open(Facing::Back).unwrap();
        std::fs::write(ctl.output_path(), b"old clip").unwrap();

        let result = ctl.start();
        assert!(matches!(result, Err(RecordError::RecordStartFailed(RecorderError::Prepare(_)))));
        assert_eq!(ctl.state(), RecordState::Idle);
        assert!(!probe.is_unlocked());
        assert!(!ctl.session().is_lent());
        assert!(!ctl.output_path().exists());
        assert!(ctl.next_tick().is_none());
        assert!(ctl.listener().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_failure_keeps_previous_clip() {
        let mut params = MockCameraProvider::default_parameters();
        params.supported_preview_sizes.clear();
        params.preview_size = None;
        let (provider, probe) = MockCameraProvider::new();
        let session = CameraSession::new(provider.with_parameters(params), DesiredCaptureConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let mut ctl: TestController =
            RecordingController::new(session, FileRecorder::new(), Vec::new(), DurationPolicy::unlimited(), &path);
        ctl.session_mut().open(Facing::Back).unwrap();
        std::fs::write(&path, b"previous good clip").unwrap();

        let result = ctl.start();
        assert!(matches!(
            result,
            Err(RecordError::RecordStartFailed(RecorderError::Camera(CameraError::NoResolutionAvailable)))
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous good clip");
        assert_eq!(ctl.state(), RecordState::Idle);
        assert!(!ctl.session().is_lent());
        assert!(!probe.is_unlocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_noop() {
        let (mut ctl, _probe, _dir) = open_controller(5, 0);
        assert_eq!(ctl.stop(false).unwrap(), StopOutcome::NotRecording);
        assert_eq!(ctl.cancel(), StopOutcome::NotRecording);
        assert!(ctl.listener().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_duration_guard() {
        let (mut ctl, probe, _dir) = open_controller(5, 0);
        ctl.start().unwrap();

        tokio::time::advance(Duration::from_millis(3000)).await;
        let result = ctl.stop(false);
        assert!(matches!(result, Err(RecordError::TooShort { elapsed_ms: 3000, min_ms: 5000 })));
        assert_eq!(ctl.state(), RecordState::Recording);
        assert!(ctl.next_tick().is_some());
        assert!(terminal_events(ctl.listener()).is_empty());
        assert!(ctl.listener().contains(&RecordEvent::TooShort { min_duration_secs: 5 }));

        tokio::time::advance(Duration::from_millis(3000)).await;
        assert_eq!(ctl.stop(false).unwrap(), StopOutcome::Completed { duration_ms: 6000 });
        assert_eq!(ctl.state(), RecordState::Idle);
        assert_eq!(terminal_events(ctl.listener()), vec![RecordEvent::Stopped { duration_ms: 6000 }]);
        assert!(!probe.is_unlocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_ignores_min_duration() {
        let (mut ctl, probe, _dir) = open_controller(5, 0);
        ctl.start().unwrap();
        tokio::time::advance(Duration::from_millis(1000)).await;

        assert_eq!(ctl.cancel(), StopOutcome::Cancelled);
        assert_eq!(ctl.state(), RecordState::Idle);
        assert_eq!(terminal_events(ctl.listener()), vec![RecordEvent::Cancelled]);
        assert!(!probe.is_unlocked());
        assert!(ctl.wait_tick().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_stop_cancels() {
        let (mut ctl, _probe, _dir) = open_controller(5, 0);
        ctl.start().unwrap();
        assert_eq!(ctl.stop(true).unwrap(), StopOutcome::Cancelled);
        assert_eq!(terminal_events(ctl.listener()), vec![RecordEvent::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_at_max_duration() {
        let (mut ctl, probe, _dir) = open_controller(0, 90);
        ctl.start().unwrap();

        let mut ticks = Vec::new();
        while let Some(elapsed) = ctl.wait_tick().await {
            ticks.push(elapsed);
        }

        assert_eq!(ticks.len(), 90);
        assert_eq!(ticks[0], 1000);
        assert_eq!(*ticks.last().unwrap(), 90_000);
        assert_eq!(ctl.state(), RecordState::Idle);
        assert_eq!(terminal_events(ctl.listener()), vec![RecordEvent::Stopped { duration_ms: 90_000 }]);
        assert!(!probe.is_unlocked());
        assert!(ctl.next_tick().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_with_min_equal_max() {
        let (mut ctl, _probe, _dir) = open_controller(3, 3);
        ctl.start().unwrap();
        while ctl.wait_tick().await.is_some() {}

        assert_eq!(terminal_events(ctl.listener()), vec![RecordEvent::Stopped { duration_ms: 3000 }]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_publishes_elapsed() {
        let (mut ctl, _probe, _dir) = open_controller(0, 0);
        ctl.start().unwrap();
        assert_eq!(ctl.wait_tick().await, Some(1000));
        assert_eq!(ctl.wait_tick().await, Some(2000));
        assert!(ctl.listener().contains(&RecordEvent::Tick { elapsed_ms: 2000 }));
        assert_eq!(ctl.state(), RecordState::Recording);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_again_after_stop() {
        let (mut ctl, _probe, _dir) = open_controller(0, 0);
        ctl.start().unwrap();
        ctl.stop(false).unwrap();
        ctl.start().unwrap();
        ctl.cancel();

        let events = terminal_events(ctl.listener());
        assert_eq!(events, vec![RecordEvent::Stopped { duration_ms: 0 }, RecordEvent::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_validates() {
        let (provider, _probe) = MockCameraProvider::new();
        let session = CameraSession::new(provider, DesiredCaptureConfig::default());
        let config = WidgetConfig {
            min_duration_secs: 10,
            max_duration_secs: 5,
            ..Default::default()
        };
        let result = RecordingController::from_config(session, FileRecorder::new(), Vec::<RecordEvent>::new(), &config);
        assert!(matches!(result, Err(ConfigError::InvalidDuration { min: 10, max: 5 })));
    }
}
