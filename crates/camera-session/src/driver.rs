//! Camera driver abstraction
//!
//! The session talks to hardware only through these traits. A provider opens
//! a device by facing; the device exposes the operations the session and the
//! recorder need.

use crate::params::CameraParameters;
use crate::{CameraError, Facing, FrameRateRange, Resolution};

/// Static information about an opened device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Driver-assigned camera index
    pub id: u32,
    pub facing: Facing,
    /// Clockwise rotation of the sensor image, in degrees
    pub orientation: u32,
}

/// Source of camera devices
pub trait DriverProvider {
    type Device: CameraDevice;

    /// Open the first camera matching `facing`
    fn open(&mut self, facing: Facing) -> Result<Self::Device, CameraError>;
}

/// An opened camera. Not safe for concurrent calls; callers hold `&mut`.
pub trait CameraDevice {
    fn info(&self) -> DeviceInfo;

    /// Read the current parameter set
    fn parameters(&self) -> Result<CameraParameters, CameraError>;

    /// Write a parameter set; the driver may reject it
    fn set_parameters(&mut self, params: &CameraParameters) -> Result<(), CameraError>;

    fn start_preview(&mut self) -> Result<(), CameraError>;

    fn stop_preview(&mut self) -> Result<(), CameraError>;

    /// Hand the device over to a recorder
    fn unlock(&mut self) -> Result<(), CameraError>;

    /// Take the device back from a recorder
    fn lock(&mut self) -> Result<(), CameraError>;

    fn auto_focus(&mut self) -> Result<(), CameraError>;

    fn cancel_auto_focus(&mut self) -> Result<(), CameraError>;

    /// Free the hardware. The device must not be used afterwards.
    fn release(&mut self);
}

/// Capability metadata captured the first time a device is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub device: DeviceInfo,
    pub resolutions: Vec<Resolution>,
    pub fps_ranges: Vec<FrameRateRange>,
    pub torch_supported: bool,
    pub auto_focus_supported: bool,
    /// Preview size the driver was using when first opened
    pub current_resolution: Option<Resolution>,
}

impl DeviceCapabilities {
    /// Read capabilities from a parameter set
    pub fn from_parameters(device: DeviceInfo, params: &CameraParameters) -> Self {
        Self {
            device,
            resolutions: params.supported_preview_sizes.clone(),
            fps_ranges: params.supported_fps_ranges.clone(),
            torch_supported: params.supports_torch(),
            auto_focus_supported: params
                .supported_focus_modes
                .iter()
                .any(|m| matches!(m, crate::FocusMode::Auto | crate::FocusMode::ContinuousVideo)),
            current_resolution: params.preview_size,
        }
    }

    pub fn orientation(&self) -> u32 {
        self.device.orientation
    }
}
