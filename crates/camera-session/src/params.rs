//! Camera hardware parameter set and snapshots

use crate::negotiate::{closest_frame_rate, closest_resolution, FPS_SCALE};
use crate::{CameraError, DesiredCaptureConfig, FrameRateRange, Resolution};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Focus mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FocusMode {
    #[default]
    Fixed,
    Auto,
    ContinuousVideo,
    Infinity,
}

/// Flash mode (torch is the continuous-light mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlashMode {
    #[default]
    Off,
    On,
    Auto,
    Torch,
}

/// Full parameter set as read from and written to the driver
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraParameters {
    /// Active preview size
    pub preview_size: Option<Resolution>,
    /// Active preview frame-rate range (scaled by 1000)
    pub preview_fps_range: Option<FrameRateRange>,
    /// Sizes the driver accepts, in driver order
    pub supported_preview_sizes: Vec<Resolution>,
    /// Frame-rate ranges the driver accepts, in driver order
    pub supported_fps_ranges: Vec<FrameRateRange>,
    pub focus_mode: FocusMode,
    pub supported_focus_modes: Vec<FocusMode>,
    pub flash_mode: FlashMode,
    pub supported_flash_modes: Vec<FlashMode>,
    /// Hint that the preview feeds a video recorder
    pub recording_hint: bool,
}

impl CameraParameters {
    /// Whether the driver can keep the flash lit
    pub fn supports_torch(&self) -> bool {
        self.supported_flash_modes.contains(&FlashMode::Torch)
    }

    /// Whether the torch is lit
    pub fn torch_on(&self) -> bool {
        self.flash_mode == FlashMode::Torch
    }

    /// Turn the torch on or off
    pub fn set_torch(&mut self, enabled: bool) {
        self.flash_mode = if enabled { FlashMode::Torch } else { FlashMode::Off };
    }

    /// Apply the minimal settings every driver is expected to accept:
    /// the negotiated preview size and nothing else.
    pub fn apply_safe(&mut self, desired: &DesiredCaptureConfig) -> Result<(), CameraError> {
        let size = closest_resolution(
            &self.supported_preview_sizes,
            desired.resolution,
            self.preview_size,
        )?;
        self.preview_size = Some(size);
        Ok(())
    }

    /// Apply the full desired configuration: negotiated size and frame-rate
    /// range, best video focus mode, torch off and the recording hint.
    pub fn apply_desired(&mut self, desired: &DesiredCaptureConfig) -> Result<(), CameraError> {
        self.apply_safe(desired)?;

        let fps = closest_frame_rate(&self.supported_fps_ranges, desired.frame_rate);
        let scaled = fps as i64 * FPS_SCALE;
        if let Some(range) = self.supported_fps_ranges.iter().find(|r| r.contains(scaled)) {
            self.preview_fps_range = Some(*range);
        }

        if let Some(mode) = [FocusMode::ContinuousVideo, FocusMode::Auto]
            .into_iter()
            .find(|m| self.supported_focus_modes.contains(m))
        {
            self.focus_mode = mode;
        }

        if self.supports_torch() {
            self.set_torch(false);
        }
        self.recording_hint = true;

        debug!(
            "Desired parameters: size {:?}, fps range {:?}, focus {:?}",
            self.preview_size, self.preview_fps_range, self.focus_mode
        );
        Ok(())
    }
}

/// Serialized copy of a parameter set, taken before mutating the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSnapshot(String);

impl ParameterSnapshot {
    /// Flatten the parameters
    pub fn capture(params: &CameraParameters) -> Result<Self, CameraError> {
        Ok(Self(serde_json::to_string(params)?))
    }

    /// Rebuild the parameters exactly as captured
    pub fn restore(&self) -> Result<CameraParameters, CameraError> {
        Ok(serde_json::from_str(&self.0)?)
    }

    /// Flattened form, for logging
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
