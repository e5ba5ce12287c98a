//! Camera session: exclusive owner of the hardware handle

use crate::driver::{CameraDevice, DeviceCapabilities, DeviceInfo, DriverProvider};
use crate::focus::AutoFocus;
use crate::params::{CameraParameters, ParameterSnapshot};
use crate::{CameraError, DesiredCaptureConfig, Facing, Resolution};
use tracing::{debug, info, warn};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Opening,
    Open,
    Previewing,
}

/// Which configuration ended up active after `open()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterOutcome {
    /// The full desired configuration was accepted
    Desired,
    /// Desired was rejected; the safe subset was accepted
    SafeMode,
    /// Both were rejected; the pre-open parameters are active
    Restored,
    /// Parameters could not be read or restored; driver defaults are active
    Unconfigured,
}

/// Centered region of the preview, in preview pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl FramingRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Proof that the hardware handle is lent out for recording.
///
/// Cannot be cloned; handing it back through [`CameraSession::relock`] is the
/// only way to return the handle to preview use.
#[derive(Debug)]
pub struct CameraLease {
    device: DeviceInfo,
    generation: u64,
}

impl CameraLease {
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Rotation hint for the recorded stream
    pub fn orientation(&self) -> u32 {
        self.device.orientation
    }
}

/// Owns one camera device at a time.
///
/// Every operation takes `&mut self`; the device is never driven by two
/// callers at once.
pub struct CameraSession<P: DriverProvider> {
    provider: P,
    desired: DesiredCaptureConfig,
    device: Option<P::Device>,
    capabilities: Option<DeviceCapabilities>,
    state: SessionState,
    auto_focus: Option<AutoFocus>,
    /// Auto-focus was running when the handle was lent
    focus_suspended: bool,
    lent: bool,
    generation: u64,
    negotiated: Option<Resolution>,
    framing_rect: Option<FramingRect>,
    requested_framing: Option<(u32, u32)>,
}

impl<P: DriverProvider> CameraSession<P> {
    /// Create a closed session
    pub fn new(provider: P, desired: DesiredCaptureConfig) -> Self {
        Self {
            provider,
            desired,
            device: None,
            capabilities: None,
            state: SessionState::Closed,
            auto_focus: None,
            focus_suspended: false,
            lent: false,
            generation: 0,
            negotiated: None,
            framing_rect: None,
            requested_framing: None,
        }
    }

    /// Open the camera for `facing` and configure it.
    ///
    /// Parameter rejection never fails the open; the returned outcome says
    /// which configuration is active.
    pub fn open(&mut self, facing: Facing) -> Result<ParameterOutcome, CameraError> {
        if self.lent {
            return Err(CameraError::HandleLent);
        }

        if let Some(device) = &self.device {
            if device.info().facing != facing {
                debug!("Switching camera from {:?} to {:?}", device.info().facing, facing);
                self.close()?;
            }
        }

        if self.device.is_none() {
            self.state = SessionState::Opening;
            let device = match self.provider.open(facing) {
                Ok(device) => device,
                Err(e) => {
                    warn!("Failed to open {:?} camera: {}", facing, e);
                    self.state = SessionState::Closed;
                    return Err(e);
                }
            };
            self.generation += 1;
            self.device = Some(device);
        }

        let Some(device) = self.device.as_mut() else {
            return Err(CameraError::NotOpen);
        };

        let info = device.info();
        if self.capabilities.as_ref().map_or(true, |c| c.device != info) {
            let params = device.parameters().unwrap_or_else(|e| {
                warn!("Could not read camera capabilities: {}", e);
                CameraParameters::default()
            });
            let capabilities = DeviceCapabilities::from_parameters(info.clone(), &params);
            info!(
                "Camera {} capabilities: {} sizes, {} fps ranges, torch {}",
                info.id,
                capabilities.resolutions.len(),
                capabilities.fps_ranges.len(),
                capabilities.torch_supported
            );
            self.capabilities = Some(capabilities);
        }

        // Reopening while previewing: keep focus requests off the driver
        // while parameters change
        let was_focusing = match self.auto_focus.take() {
            Some(focus) => {
                focus.stop(device);
                true
            }
            None => false,
        };
        let outcome = configure(device, &self.desired);
        if was_focusing {
            self.auto_focus = AutoFocus::start(device, true);
        }
        self.negotiated = device
            .parameters()
            .ok()
            .and_then(|p| p.preview_size)
            .or_else(|| self.capabilities.as_ref().and_then(|c| c.current_resolution));

        if let Some((width, height)) = self.requested_framing.take() {
            self.set_manual_framing_rect(width, height);
        }

        if self.state != SessionState::Previewing {
            self.state = SessionState::Open;
        }
        info!("Camera {} open ({:?}), parameters {:?}", info.id, facing, outcome);
        Ok(outcome)
    }

    /// Begin drawing preview frames. Idempotent.
    pub fn start_preview(&mut self) -> Result<(), CameraError> {
        if self.lent {
            return Err(CameraError::HandleLent);
        }
        let device = self.device.as_mut().ok_or(CameraError::NotOpen)?;
        if self.state == SessionState::Previewing {
            return Ok(());
        }

        device.start_preview()?;
        self.state = SessionState::Previewing;
        let supported = self.capabilities.as_ref().is_some_and(|c| c.auto_focus_supported);
        self.auto_focus = AutoFocus::start(device, supported);
        debug!("Preview started");
        Ok(())
    }

    /// Stop drawing preview frames. Idempotent.
    pub fn stop_preview(&mut self) {
        let Some(device) = self.device.as_mut() else {
            return;
        };
        if let Some(focus) = self.auto_focus.take() {
            focus.stop(device);
        }
        self.focus_suspended = false;
        if self.state == SessionState::Previewing {
            if let Err(e) = device.stop_preview() {
                warn!("Failed to stop preview: {}", e);
            }
            self.state = SessionState::Open;
            debug!("Preview stopped");
        }
    }

    /// Turn the torch on or off.
    ///
    /// Auto-focus is paused around the flash-mode change so the two never
    /// hit the driver concurrently.
    pub fn set_torch(&mut self, enabled: bool) -> Result<(), CameraError> {
        if self.lent {
            return Err(CameraError::HandleLent);
        }
        let supported = self.capabilities.as_ref().is_some_and(|c| c.torch_supported);
        if !supported || self.device.is_none() || self.torch_state() == enabled {
            return Ok(());
        }
        let Some(device) = self.device.as_mut() else {
            return Ok(());
        };

        let was_focusing = match self.auto_focus.take() {
            Some(focus) => {
                focus.stop(device);
                true
            }
            None => false,
        };

        match device.parameters() {
            Ok(mut params) => {
                params.set_torch(enabled);
                match device.set_parameters(&params) {
                    Ok(()) => info!("Torch {}", if enabled { "on" } else { "off" }),
                    Err(e) => warn!("Camera rejected torch change: {}", e),
                }
            }
            Err(e) => warn!("Could not read parameters for torch: {}", e),
        }

        if was_focusing {
            self.auto_focus = AutoFocus::start(device, true);
        }
        Ok(())
    }

    /// Whether the torch is lit
    pub fn torch_state(&self) -> bool {
        if self.lent {
            return false;
        }
        self.device
            .as_ref()
            .and_then(|d| d.parameters().ok())
            .is_some_and(|p| p.torch_on())
    }

    /// Lend the handle to a recorder. Auto-focus is suspended until the
    /// lease comes back.
    pub fn unlock(&mut self) -> Result<CameraLease, CameraError> {
        if self.lent {
            return Err(CameraError::HandleLent);
        }
        let device = self.device.as_mut().ok_or(CameraError::NotOpen)?;

        let was_focusing = match self.auto_focus.take() {
            Some(focus) => {
                focus.stop(device);
                true
            }
            None => false,
        };

        if let Err(e) = device.unlock() {
            if was_focusing {
                self.auto_focus = AutoFocus::start(device, true);
            }
            return Err(e);
        }

        self.focus_suspended = was_focusing;
        self.lent = true;
        debug!("Camera handle lent (generation {})", self.generation);
        Ok(CameraLease {
            device: device.info(),
            generation: self.generation,
        })
    }

    /// Take the handle back from a recorder
    pub fn relock(&mut self, lease: CameraLease) {
        if lease.generation != self.generation {
            warn!("Ignoring lease from a previous camera session");
            return;
        }
        self.lent = false;
        let Some(device) = self.device.as_mut() else {
            return;
        };
        if let Err(e) = device.lock() {
            warn!("Failed to relock camera: {}", e);
        }
        if std::mem::take(&mut self.focus_suspended) && self.state == SessionState::Previewing {
            self.auto_focus = AutoFocus::start(device, true);
        }
        debug!("Camera handle returned");
    }

    /// Release the camera. Idempotent.
    pub fn close(&mut self) -> Result<(), CameraError> {
        if self.lent {
            return Err(CameraError::HandleLent);
        }
        self.stop_preview();
        if let Some(mut device) = self.device.take() {
            device.release();
            info!("Camera {} closed", device.info().id);
            // Forget any framing requested for the previous device
            self.framing_rect = None;
        }
        self.state = SessionState::Closed;
        Ok(())
    }

    /// Center a framing rect of the given size, clamped to the preview.
    /// Before the first open the request is kept and applied on open.
    pub fn set_manual_framing_rect(&mut self, width: u32, height: u32) {
        let Some(preview) = self.negotiated.filter(|_| self.capabilities.is_some()) else {
            self.requested_framing = Some((width, height));
            return;
        };
        let width = width.min(preview.width);
        let height = height.min(preview.height);
        let left = (preview.width - width) / 2;
        let top = (preview.height - height) / 2;
        let rect = FramingRect {
            left,
            top,
            right: left + width,
            bottom: top + height,
        };
        debug!("Calculated manual framing rect: {:?}", rect);
        self.framing_rect = Some(rect);
    }

    pub fn framing_rect(&self) -> Option<FramingRect> {
        self.framing_rect
    }

    /// Whether camera and screen are both portrait or both landscape.
    /// True before the camera has been configured.
    pub fn orientation_matches(&self, screen: Resolution) -> bool {
        match self.negotiated {
            Some(camera) => camera.is_portrait() == screen.is_portrait(),
            None => true,
        }
    }

    /// Update the settings used by the next `open()`
    pub fn set_desired(&mut self, desired: DesiredCaptureConfig) {
        self.desired = desired;
    }

    pub fn desired(&self) -> &DesiredCaptureConfig {
        &self.desired
    }

    /// Preview size negotiated on the last open
    pub fn camera_resolution(&self) -> Option<Resolution> {
        self.negotiated
    }

    pub fn capabilities(&self) -> Option<&DeviceCapabilities> {
        self.capabilities.as_ref()
    }

    /// Whether a device is held, lent or not
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_lent(&self) -> bool {
        self.lent
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: DriverProvider> Drop for CameraSession<P> {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.release();
        }
    }
}

/// Apply the desired parameters transactionally: snapshot, try the full set,
/// roll back and try the safe subset, and keep the rollback if that fails too.
fn configure<D: CameraDevice>(device: &mut D, desired: &DesiredCaptureConfig) -> ParameterOutcome {
    let current = match device.parameters() {
        Ok(params) => params,
        Err(e) => {
            warn!("Could not read camera parameters; using defaults: {}", e);
            return ParameterOutcome::Unconfigured;
        }
    };
    let snapshot = ParameterSnapshot::capture(&current)
        .map_err(|e| warn!("Could not snapshot camera parameters: {}", e))
        .ok();

    let mut params = current;
    match params.apply_desired(desired).and_then(|()| device.set_parameters(&params)) {
        Ok(()) => return ParameterOutcome::Desired,
        Err(e) => warn!("Camera rejected parameters. Setting only minimal safe-mode parameters: {}", e),
    }

    let Some(snapshot) = snapshot else {
        return ParameterOutcome::Unconfigured;
    };
    info!("Resetting to saved camera params: {}", snapshot.as_str());
    let restored = match snapshot.restore() {
        Ok(params) => params,
        Err(e) => {
            warn!("Saved camera params unreadable: {}", e);
            return ParameterOutcome::Unconfigured;
        }
    };
    if let Err(e) = device.set_parameters(&restored) {
        warn!("Camera rejected saved parameters: {}", e);
        return ParameterOutcome::Unconfigured;
    }

    let mut safe = restored;
    match safe.apply_safe(desired).and_then(|()| device.set_parameters(&safe)) {
        Ok(()) => ParameterOutcome::SafeMode,
        Err(e) => {
            warn!("Camera rejected even safe-mode parameters! No configuration: {}", e);
            ParameterOutcome::Restored
        }
    }
}
