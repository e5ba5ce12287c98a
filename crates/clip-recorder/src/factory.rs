//! Recorder configuration builder

use camera_session::{closest_frame_rate, closest_resolution, CameraError, DesiredCaptureConfig, DeviceCapabilities, Resolution};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Mpeg4,
    ThreeGpp,
}

/// Audio codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEncoder {
    Aac,
    AmrNb,
}

/// Video codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoEncoder {
    /// MPEG-4 Simple Profile
    Mpeg4Sp,
    H264,
}

/// Named platform quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    Low,
    P480,
    P720,
    P1080,
    High,
}

impl QualityTier {
    /// Frame size of the preset, if it has a fixed one
    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            QualityTier::P480 => Some(Resolution::new(720, 480)),
            QualityTier::P720 => Some(Resolution::new(1280, 720)),
            QualityTier::P1080 => Some(Resolution::new(1920, 1080)),
            QualityTier::Low | QualityTier::High => None,
        }
    }
}

/// Finalized encoder settings handed to a recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingProfile {
    pub output_format: OutputFormat,
    pub video_size: Resolution,
    /// Frames per second
    pub frame_rate: u32,
    /// Video bit rate in bits per second
    pub video_bit_rate: u64,
    pub audio_encoder: AudioEncoder,
    pub video_encoder: VideoEncoder,
}

/// Presets a device supports
pub trait ProfileCatalog {
    fn profile(&self, tier: QualityTier) -> Option<EncodingProfile>;

    fn has_profile(&self, tier: QualityTier) -> bool {
        self.profile(tier).is_some()
    }
}

impl ProfileCatalog for HashMap<QualityTier, EncodingProfile> {
    fn profile(&self, tier: QualityTier) -> Option<EncodingProfile> {
        self.get(&tier).cloned()
    }
}

/// Build the fixed-size presets a camera can actually deliver
pub fn standard_profiles(capabilities: &DeviceCapabilities) -> HashMap<QualityTier, EncodingProfile> {
    [(QualityTier::P480, 2_000_000), (QualityTier::P720, 5_000_000), (QualityTier::P1080, 12_000_000)]
        .into_iter()
        .filter_map(|(tier, bit_rate)| {
            let size = tier.resolution()?;
            capabilities.resolutions.contains(&size).then(|| {
                (
                    tier,
                    EncodingProfile {
                        output_format: OutputFormat::Mpeg4,
                        video_size: size,
                        frame_rate: 30,
                        video_bit_rate: bit_rate,
                        audio_encoder: AudioEncoder::Aac,
                        video_encoder: VideoEncoder::H264,
                    },
                )
            })
        })
        .collect()
}

/// Builds recorder configurations
pub struct MediaRecorderFactory;

impl MediaRecorderFactory {
    /// Presets tried after the requested one, in order
    pub const FALLBACK_TIERS: [QualityTier; 2] = [QualityTier::P720, QualityTier::P480];

    /// Use a platform preset, degrading to 720p and then 480p when the
    /// requested tier is unsupported. `None` leaves the recorder
    /// unconfigured; callers are expected to check support beforehand.
    pub fn from_system_quality(catalog: &impl ProfileCatalog, tier: QualityTier) -> Option<EncodingProfile> {
        let profile = std::iter::once(tier)
            .chain(Self::FALLBACK_TIERS)
            .find_map(|t| {
                let profile = catalog.profile(t)?;
                if t != tier {
                    info!("Quality {:?} unsupported, falling back to {:?}", tier, t);
                }
                Some(profile)
            });

        if profile.is_none() {
            warn!("No supported quality preset for {:?}; recorder left unconfigured", tier);
        }
        profile
    }

    /// Negotiate size and frame rate against the camera and fix the
    /// encoders to AAC audio and MPEG-4 SP video.
    pub fn from_custom_config(
        desired: &DesiredCaptureConfig,
        capabilities: &DeviceCapabilities,
    ) -> Result<EncodingProfile, CameraError> {
        let video_size = closest_resolution(
            &capabilities.resolutions,
            desired.resolution,
            capabilities.current_resolution,
        )?;
        let frame_rate = closest_frame_rate(&capabilities.fps_ranges, desired.frame_rate);

        let profile = EncodingProfile {
            output_format: OutputFormat::Mpeg4,
            video_size,
            frame_rate,
            video_bit_rate: desired.bit_rate_bps(),
            audio_encoder: AudioEncoder::Aac,
            video_encoder: VideoEncoder::Mpeg4Sp,
        };
        debug!("Custom recorder profile: {:?}", profile);
        Ok(profile)
    }
}
