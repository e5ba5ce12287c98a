//! Camera Session Library for Clip Capture
//!
//! Owns the exclusive camera hardware handle and reconciles requested capture
//! settings with what the driver actually supports:
//! - Closest-match negotiation for resolution and frame rate
//! - Transactional parameter apply with safe-mode fallback
//! - Preview, auto-focus and torch control
//! - Lease-based handoff of the handle to a recorder

pub mod driver;
pub mod focus;
pub mod mock;
pub mod negotiate;
pub mod params;
pub mod session;

pub use driver::{CameraDevice, DeviceCapabilities, DeviceInfo, DriverProvider};
pub use mock::{DeviceCall, MockCameraProvider, MockProbe, Rejection};
pub use negotiate::{closest_frame_rate, closest_resolution};
pub use params::{CameraParameters, FlashMode, FocusMode, ParameterSnapshot};
pub use session::{CameraLease, CameraSession, FramingRect, ParameterOutcome, SessionState};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("No camera driver available for {0:?} facing")]
    DriverUnavailable(Facing),

    #[error("Camera rejected parameters: {0}")]
    ParameterRejected(String),

    #[error("No resolution available from camera")]
    NoResolutionAvailable,

    #[error("Camera not open")]
    NotOpen,

    #[error("Camera handle is lent to a recorder")]
    HandleLent,

    #[error("Camera hardware error: {0}")]
    Hardware(String),

    #[error("Parameter snapshot failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Which physical camera is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    #[default]
    Back,
    Front,
}

/// Frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when taller than wide
    pub fn is_portrait(&self) -> bool {
        self.width < self.height
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Closed frame-rate interval, scaled by 1000 as drivers report it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRateRange {
    pub min: u32,
    pub max: u32,
}

impl FrameRateRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Check whether a scaled rate falls inside the range
    pub fn contains(&self, scaled: i64) -> bool {
        scaled >= self.min as i64 && scaled <= self.max as i64
    }
}

/// What the caller wants the camera to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredCaptureConfig {
    /// Target frame size
    pub resolution: Resolution,
    /// Target frames per second
    pub frame_rate: u32,
    /// Target bit rate, in the widget's "KB" unit (see `bit_rate_bps`)
    pub bit_rate_kb: u32,
    /// Requested camera
    pub facing: Facing,
}

impl Default for DesiredCaptureConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::new(1280, 720),
            frame_rate: 20,
            bit_rate_kb: 512,
            facing: Facing::Back,
        }
    }
}

impl DesiredCaptureConfig {
    /// Encoder bit rate. The "KB" value is multiplied by 1024 * 8, so it is
    /// effectively kilobits per second.
    pub fn bit_rate_bps(&self) -> u64 {
        self.bit_rate_kb as u64 * 1024 * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_rate_unit() {
        let desired = DesiredCaptureConfig::default();
        assert_eq!(desired.bit_rate_bps(), 512 * 8192);
    }

    #[test]
    fn test_range_contains_bounds() {
        let range = FrameRateRange::new(15000, 30000);
        assert!(range.contains(15000));
        assert!(range.contains(30000));
        assert!(!range.contains(14999));
    }

    #[test]
    fn test_facing_deserialize() {
        let facing: Facing = serde_json::from_str("\"front\"").unwrap();
        assert_eq!(facing, Facing::Front);
    }
}
