//! Widget configuration

use crate::error::ConfigError;
use camera_session::{DesiredCaptureConfig, Facing, Resolution};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable prefix for overrides (e.g. `CAPTURE_MAX_DURATION_SECS`)
pub const ENV_PREFIX: &str = "CAPTURE";

/// Host-facing configuration surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Shortest clip a manual stop accepts (seconds, 0 = no minimum)
    pub min_duration_secs: u32,

    /// Clip length at which recording stops itself (seconds, 0 = unlimited)
    pub max_duration_secs: u32,

    /// Target video size, negotiated against the camera
    pub video_width: u32,
    pub video_height: u32,

    /// Target frames per second
    pub frame_rate: u32,

    /// Target bit rate (multiplied by 1024 * 8)
    pub bit_rate_kb: u32,

    pub facing: Facing,

    /// Open the camera as soon as the preview surface is ready
    pub auto_open: bool,

    /// Clip destination, overwritten per recording
    pub output_path: PathBuf,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: 0,
            max_duration_secs: 0,
            video_width: 1280,
            video_height: 720,
            frame_rate: 20,
            bit_rate_kb: 512,
            facing: Facing::Back,
            auto_open: false,
            output_path: std::env::temp_dir().join("temp.mp4"),
        }
    }
}

impl WidgetConfig {
    /// Load from an optional file, then `CAPTURE_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Loading widget config from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.duration_policy().map(|_| ())
    }

    pub fn duration_policy(&self) -> Result<DurationPolicy, ConfigError> {
        DurationPolicy::new(self.min_duration_secs, self.max_duration_secs)
    }

    /// Capture settings for the camera session
    pub fn desired(&self) -> DesiredCaptureConfig {
        DesiredCaptureConfig {
            resolution: Resolution::new(self.video_width, self.video_height),
            frame_rate: self.frame_rate,
            bit_rate_kb: self.bit_rate_kb,
            facing: self.facing,
        }
    }
}

/// Validated recording duration bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurationPolicy {
    min_secs: u32,
    max_secs: u32,
}

impl DurationPolicy {
    /// Fails when a limited maximum is below the minimum
    pub fn new(min_secs: u32, max_secs: u32) -> Result<Self, ConfigError> {
        if max_secs > 0 && min_secs > max_secs {
            return Err(ConfigError::InvalidDuration {
                min: min_secs,
                max: max_secs,
            });
        }
        Ok(Self { min_secs, max_secs })
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn min_secs(&self) -> u32 {
        self.min_secs
    }

    pub fn max_secs(&self) -> u32 {
        self.max_secs
    }

    pub fn min_ms(&self) -> u64 {
        self.min_secs as u64 * 1000
    }

    /// Whether a manual stop at `elapsed_ms` must be refused
    pub fn is_too_short(&self, elapsed_ms: u64) -> bool {
        self.min_secs > 0 && elapsed_ms < self.min_ms()
    }

    /// Whether the recording has reached its maximum length
    pub fn is_expired(&self, elapsed_ms: u64) -> bool {
        self.max_secs > 0 && elapsed_ms >= self.max_secs as u64 * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_policy_rejects_min_above_max() {
        assert!(matches!(
            DurationPolicy::new(10, 5),
            Err(ConfigError::InvalidDuration { min: 10, max: 5 })
        ));
        assert!(DurationPolicy::new(5, 5).is_ok());
    }

    #[test]
    fn test_policy_unlimited_max_allows_any_min() {
        let policy = DurationPolicy::new(5, 0).unwrap();
        assert!(policy.is_too_short(3000));
        assert!(!policy.is_too_short(5000));
        assert!(!policy.is_expired(u64::MAX));
    }

    #[test]
    fn test_policy_expiry() {
        let policy = DurationPolicy::new(0, 90).unwrap();
        assert!(!policy.is_expired(89_999));
        assert!(policy.is_expired(90_000));
        assert!(!policy.is_too_short(0));
    }

    #[test]
    fn test_default_matches_widget_defaults() {
        let config = WidgetConfig::default();
        let desired = config.desired();
        assert_eq!(desired.resolution, Resolution::new(1280, 720));
        assert_eq!(desired.frame_rate, 20);
        assert_eq!(desired.bit_rate_kb, 512);
        assert!(config.output_path.ends_with("temp.mp4"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "min_duration_secs = 3\nmax_duration_secs = 30\nfacing = \"front\"\nauto_open = true").unwrap();

        let config = WidgetConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.min_duration_secs, 3);
        assert_eq!(config.max_duration_secs, 30);
        assert_eq!(config.facing, Facing::Front);
        assert!(config.auto_open);
        assert_eq!(config.video_width, 1280);
    }

    #[test]
    fn test_load_rejects_bad_durations() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "min_duration_secs = 60\nmax_duration_secs = 30").unwrap();

        let result = WidgetConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::InvalidDuration { .. })));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "bit_rate_kb = 256").unwrap();

        std::env::set_var("CAPTURE_BIT_RATE_KB", "2048");
        let result = WidgetConfig::load(Some(file.path()));
        std::env::remove_var("CAPTURE_BIT_RATE_KB");

        let config = result.unwrap();
        assert_eq!(config.bit_rate_kb, 2048);
        assert_eq!(config.desired().bit_rate_bps(), 2048 * 8192);
    }
}
