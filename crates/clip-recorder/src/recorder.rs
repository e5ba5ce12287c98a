//! Recorder backend abstraction

use crate::error::RecorderError;
use crate::factory::EncodingProfile;
use camera_session::CameraLease;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Opaque id of the surface the host draws preview into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreviewSurface(pub u64);

/// Where and how a clip is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingTarget {
    pub output_path: PathBuf,
    /// Rotation to tag the stream with, in degrees
    pub orientation_hint: u32,
    pub preview_surface: Option<PreviewSurface>,
}

/// A media recorder that encodes from a lent camera.
///
/// Lifecycle per clip: `configure` → `prepare` → `start` → `stop` →
/// `reset` → `release`. `reset` and `release` must be safe in any state.
pub trait Recorder {
    fn configure(
        &mut self,
        profile: &EncodingProfile,
        target: &RecordingTarget,
        lease: &CameraLease,
    ) -> Result<(), RecorderError>;

    fn prepare(&mut self) -> Result<(), RecorderError>;

    fn start(&mut self) -> Result<(), RecorderError>;

    fn stop(&mut self) -> Result<(), RecorderError>;

    /// Return to the unconfigured state
    fn reset(&mut self);

    /// Free encoder resources
    fn release(&mut self);
}

/// Delete a clip left over from a previous session
pub fn remove_stale_output(path: &Path) -> Result<(), RecorderError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed previous output {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileRecorderState {
    Initial,
    Configured,
    Prepared,
    Recording,
}

#[derive(Serialize)]
struct ClipHeader<'a> {
    camera: u32,
    orientation_hint: u32,
    preview_surface: Option<PreviewSurface>,
    profile: &'a EncodingProfile,
}

/// Simulated recorder that writes the clip's settings as a JSON header.
///
/// Stands in for a hardware encoder in demos and tests.
#[derive(Debug)]
pub struct FileRecorder {
    state: FileRecorderState,
    profile: Option<EncodingProfile>,
    target: Option<RecordingTarget>,
    camera: u32,
    file: Option<File>,
    fail_prepare: bool,
}

impl Default for FileRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRecorder {
    pub fn new() -> Self {
        Self {
            state: FileRecorderState::Initial,
            profile: None,
            target: None,
            camera: 0,
            file: None,
            fail_prepare: false,
        }
    }

    /// Make every `prepare()` fail, as an encoder without a usable
    /// surface would
    pub fn failing_prepare() -> Self {
        Self {
            fail_prepare: true,
            ..Self::new()
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state == FileRecorderState::Recording
    }
}

impl Recorder for FileRecorder {
    fn configure(
        &mut self,
        profile: &EncodingProfile,
        target: &RecordingTarget,
        lease: &CameraLease,
    ) -> Result<(), RecorderError> {
        if self.state != FileRecorderState::Initial {
            return Err(RecorderError::InvalidState("configure after configure"));
        }
        self.profile = Some(profile.clone());
        self.target = Some(target.clone());
        self.camera = lease.device().id;
        self.state = FileRecorderState::Configured;
        Ok(())
    }

    fn prepare(&mut self) -> Result<(), RecorderError> {
        if self.state != FileRecorderState::Configured {
            return Err(RecorderError::InvalidState("prepare before configure"));
        }
        if self.fail_prepare {
            return Err(RecorderError::Prepare("encoder unavailable".to_string()));
        }
        let (Some(profile), Some(target)) = (&self.profile, &self.target) else {
            return Err(RecorderError::InvalidState("prepare before configure"));
        };

        let mut file = File::create(&target.output_path)?;
        let header = ClipHeader {
            camera: self.camera,
            orientation_hint: target.orientation_hint,
            preview_surface: target.preview_surface,
            profile,
        };
        let json = serde_json::to_string(&header).map_err(|e| RecorderError::Prepare(e.to_string()))?;
        writeln!(file, "{}", json)?;

        self.file = Some(file);
        self.state = FileRecorderState::Prepared;
        Ok(())
    }

    fn start(&mut self) -> Result<(), RecorderError> {
        if self.state != FileRecorderState::Prepared {
            return Err(RecorderError::Start("recorder not prepared".to_string()));
        }
        self.state = FileRecorderState::Recording;
        if let Some(target) = &self.target {
            info!("Recording to {}", target.output_path.display());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        if self.state != FileRecorderState::Recording {
            return Err(RecorderError::Stop("recorder not started".to_string()));
        }
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
            file.sync_all()?;
        }
        self.state = FileRecorderState::Prepared;
        Ok(())
    }

    fn reset(&mut self) {
        self.file = None;
        self.profile = None;
        self.target = None;
        self.state = FileRecorderState::Initial;
    }

    fn release(&mut self) {
        self.reset();
    }
}
