//! Simulated camera driver for testing and demos (no hardware required)

use crate::driver::{CameraDevice, DeviceInfo, DriverProvider};
use crate::params::{CameraParameters, FlashMode, FocusMode};
use crate::{CameraError, Facing, FrameRateRange, Resolution};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Which parameter writes the simulated driver refuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rejection {
    /// Accept everything
    #[default]
    None,
    /// Refuse sets carrying the recording hint (the full desired set)
    Desired,
    /// Refuse any set that differs from the power-on parameters
    AnyChange,
}

/// Calls observed by the simulated driver
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Open(Facing),
    SetParameters { params: CameraParameters, accepted: bool },
    StartPreview,
    StopPreview,
    Unlock,
    Lock,
    AutoFocus,
    CancelAutoFocus,
    Release,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<DeviceCall>,
    current: Option<CameraParameters>,
    unlocked: bool,
    released: bool,
}

/// Read access to what the simulated driver saw
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockProbe {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every call in order
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock().calls.clone()
    }

    /// Count calls matching a predicate
    pub fn count(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Parameters the driver currently holds
    pub fn current_parameters(&self) -> Option<CameraParameters> {
        self.lock().current.clone()
    }

    /// Whether the device is currently handed to a recorder
    pub fn is_unlocked(&self) -> bool {
        self.lock().unlocked
    }

    pub fn is_released(&self) -> bool {
        self.lock().released
    }
}

/// Simulated driver provider
#[derive(Debug, Clone)]
pub struct MockCameraProvider {
    facings: Vec<Facing>,
    initial: CameraParameters,
    rejection: Rejection,
    probe: MockProbe,
}

impl MockCameraProvider {
    /// A back and a front camera with typical phone capabilities
    pub fn new() -> (Self, MockProbe) {
        let probe = MockProbe::default();
        let provider = Self {
            facings: vec![Facing::Back, Facing::Front],
            initial: Self::default_parameters(),
            rejection: Rejection::None,
            probe: probe.clone(),
        };
        (provider, probe)
    }

    /// Only the given cameras exist
    pub fn with_facings(mut self, facings: &[Facing]) -> Self {
        self.facings = facings.to_vec();
        self
    }

    /// Power-on parameters for every opened device
    pub fn with_parameters(mut self, params: CameraParameters) -> Self {
        self.initial = params;
        self
    }

    pub fn with_rejection(mut self, rejection: Rejection) -> Self {
        self.rejection = rejection;
        self
    }

    /// Parameters a mid-range phone camera reports
    pub fn default_parameters() -> CameraParameters {
        CameraParameters {
            preview_size: Some(Resolution::new(640, 480)),
            preview_fps_range: Some(FrameRateRange::new(15000, 30000)),
            supported_preview_sizes: vec![
                Resolution::new(1920, 1080),
                Resolution::new(1280, 720),
                Resolution::new(640, 480),
                Resolution::new(320, 240),
            ],
            supported_fps_ranges: vec![FrameRateRange::new(15000, 30000), FrameRateRange::new(30000, 30000)],
            focus_mode: FocusMode::Auto,
            supported_focus_modes: vec![FocusMode::Auto, FocusMode::ContinuousVideo],
            flash_mode: FlashMode::Off,
            supported_flash_modes: vec![FlashMode::Off, FlashMode::Torch],
            recording_hint: false,
        }
    }
}

impl DriverProvider for MockCameraProvider {
    type Device = MockCamera;

    fn open(&mut self, facing: Facing) -> Result<MockCamera, CameraError> {
        let id = self
            .facings
            .iter()
            .position(|f| *f == facing)
            .ok_or(CameraError::DriverUnavailable(facing))?;

        info!("Mock camera {} opened ({:?})", id, facing);
        let mut state = self.probe.lock();
        state.calls.push(DeviceCall::Open(facing));
        state.current = Some(self.initial.clone());
        state.unlocked = false;
        state.released = false;
        drop(state);

        Ok(MockCamera {
            info: DeviceInfo {
                id: id as u32,
                facing,
                orientation: if facing == Facing::Front { 270 } else { 90 },
            },
            initial: self.initial.clone(),
            rejection: self.rejection,
            probe: self.probe.clone(),
        })
    }
}

/// Simulated opened camera
#[derive(Debug)]
pub struct MockCamera {
    info: DeviceInfo,
    initial: CameraParameters,
    rejection: Rejection,
    probe: MockProbe,
}

impl MockCamera {
    fn record(&self, call: DeviceCall) -> Result<(), CameraError> {
        let mut state = self.probe.lock();
        if state.released {
            return Err(CameraError::Hardware("camera already released".to_string()));
        }
        state.calls.push(call);
        Ok(())
    }
}

impl CameraDevice for MockCamera {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn parameters(&self) -> Result<CameraParameters, CameraError> {
        let state = self.probe.lock();
        if state.unlocked {
            return Err(CameraError::Hardware("camera is unlocked".to_string()));
        }
        state.current.clone().ok_or(CameraError::NotOpen)
    }

    fn set_parameters(&mut self, params: &CameraParameters) -> Result<(), CameraError> {
        let accepted = match self.rejection {
            Rejection::None => true,
            Rejection::Desired => !params.recording_hint,
            Rejection::AnyChange => *params == self.initial,
        };
        self.record(DeviceCall::SetParameters {
            params: params.clone(),
            accepted,
        })?;

        if !accepted {
            debug!("Mock camera rejecting parameters");
            return Err(CameraError::ParameterRejected("setParameters failed".to_string()));
        }
        self.probe.lock().current = Some(params.clone());
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), CameraError> {
        self.record(DeviceCall::StartPreview)
    }

    fn stop_preview(&mut self) -> Result<(), CameraError> {
        self.record(DeviceCall::StopPreview)
    }

    fn unlock(&mut self) -> Result<(), CameraError> {
        self.record(DeviceCall::Unlock)?;
        self.probe.lock().unlocked = true;
        Ok(())
    }

    fn lock(&mut self) -> Result<(), CameraError> {
        self.record(DeviceCall::Lock)?;
        self.probe.lock().unlocked = false;
        Ok(())
    }

    fn auto_focus(&mut self) -> Result<(), CameraError> {
        self.record(DeviceCall::AutoFocus)
    }

    fn cancel_auto_focus(&mut self) -> Result<(), CameraError> {
        self.record(DeviceCall::CancelAutoFocus)
    }

    fn release(&mut self) {
        let mut state = self.probe.lock();
        if !state.released {
            state.calls.push(DeviceCall::Release);
            state.released = true;
            state.current = None;
        }
    }
}
