//! Recording Error Types

use camera_session::CameraError;
use thiserror::Error;

/// Errors from the recording state machine
#[derive(Debug, Error)]
pub enum RecordError {
    /// No camera handle to record from
    #[error("Camera not open")]
    CameraNotOpen,

    /// `start()` called while a recording is running
    #[error("Already recording")]
    AlreadyRecording,

    /// Recorder could not be configured, prepared or started
    #[error("Failed to start recording: {0}")]
    RecordStartFailed(#[source] RecorderError),

    /// Manual stop before the minimum duration; recording continues
    #[error("Recording too short: {elapsed_ms}ms elapsed, minimum is {min_ms}ms")]
    TooShort { elapsed_ms: u64, min_ms: u64 },
}

/// Errors from a recorder backend
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Recorder prepare failed: {0}")]
    Prepare(String),

    #[error("Recorder start failed: {0}")]
    Start(String),

    #[error("Recorder stop failed: {0}")]
    Stop(String),

    #[error("Recorder called in wrong state: {0}")]
    InvalidState(&'static str),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Output file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors loading or validating widget configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Minimum duration {min}s exceeds maximum duration {max}s")]
    InvalidDuration { min: u32, max: u32 },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
