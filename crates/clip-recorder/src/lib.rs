//! Clip Recording
//!
//! Records time-bounded clips from a camera session:
//! - Recorder configuration from platform presets or negotiated settings
//! - Idle/Recording state machine with min/max duration policy
//! - One-second elapsed-time tick with auto-stop
//! - Exactly one completed-or-cancelled callback per recording

mod config;
mod controller;
mod error;
mod factory;
mod listener;
mod recorder;
mod time;

pub use config::{DurationPolicy, WidgetConfig, ENV_PREFIX};
pub use controller::{RecordState, RecordingController, StopOutcome, TICK_INTERVAL};
pub use error::{ConfigError, RecordError, RecorderError};
pub use factory::{
    standard_profiles, AudioEncoder, EncodingProfile, MediaRecorderFactory, OutputFormat, ProfileCatalog,
    QualityTier, VideoEncoder,
};
pub use listener::{ChannelListener, RecordEvent, RecordListener};
pub use recorder::{remove_stale_output, FileRecorder, PreviewSurface, Recorder, RecordingTarget};
pub use time::format_elapsed;
