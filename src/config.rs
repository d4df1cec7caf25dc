use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::detect::preprocess::{CHANNEL_MEAN, INPUT_SIZE};
use crate::drone::VideoBitrate;
use crate::tracking::{SelectionMode, CONFIDENCE_THRESHOLD};

const DEFAULT_FRAME_WIDTH: u32 = 400;
const DEFAULT_FRAME_HEIGHT: u32 = 300;
const DEFAULT_DRONE_ADDR: &str = "192.168.10.1:8889";
const DEFAULT_STATE_PORT: u16 = 8890;
const DEFAULT_VIDEO_PORT: u16 = 11111;
const DEFAULT_KEEPALIVE_MS: u64 = 100;
const DEFAULT_DECODER: &str = "ffmpeg";
const DEFAULT_HWACCEL: &str = "auto";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FollowerConfigFile {
    frame: Option<FrameConfigFile>,
    drone: Option<DroneConfigFile>,
    decoder: Option<DecoderConfigFile>,
    detector: Option<DetectorConfigFile>,
    tracking: Option<TrackingConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FrameConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DroneConfigFile {
    addr: Option<String>,
    state_port: Option<u16>,
    video_port: Option<u16>,
    keepalive_ms: Option<u64>,
    video_bitrate: Option<VideoBitrate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DecoderConfigFile {
    program: Option<String>,
    /// Empty string disables hardware acceleration.
    hwaccel: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    input_width: Option<u32>,
    input_height: Option<u32>,
    mean: Option<[f32; 3]>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrackingConfigFile {
    selection: Option<SelectionMode>,
}

#[derive(Debug, Clone)]
pub struct FollowerConfig {
    pub frame: FrameSettings,
    pub drone: DroneSettings,
    pub decoder: DecoderSettings,
    pub detector: DetectorSettings,
    pub tracking: TrackingSettings,
}

/// Nominal decoded frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSettings {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroneSettings {
    pub addr: String,
    pub state_port: u16,
    pub video_port: u16,
    pub keepalive: Duration,
    pub video_bitrate: VideoBitrate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoderSettings {
    pub program: String,
    pub hwaccel: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub input_width: u32,
    pub input_height: u32,
    pub mean: [f32; 3],
    pub confidence_threshold: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            input_width: INPUT_SIZE.0,
            input_height: INPUT_SIZE.1,
            mean: CHANNEL_MEAN,
            confidence_threshold: CONFIDENCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackingSettings {
    pub selection: SelectionMode,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        // An empty file section set resolves to all defaults and cannot fail.
        Self::from_file(FollowerConfigFile::default())
    }
}

impl FollowerConfig {
    /// Load from `path`, or `FOLLOW_CONFIG` when no path is given, then apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("FOLLOW_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty());
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => match env_path.as_deref() {
                Some(p) => Some(read_config_file(Path::new(p))?),
                None => None,
            },
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FollowerConfigFile) -> Self {
        let frame = file.frame.unwrap_or_default();
        let drone = file.drone.unwrap_or_default();
        let decoder = file.decoder.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let tracking = file.tracking.unwrap_or_default();
        let detector_defaults = DetectorSettings::default();

        Self {
            frame: FrameSettings {
                width: frame.width.unwrap_or(DEFAULT_FRAME_WIDTH),
                height: frame.height.unwrap_or(DEFAULT_FRAME_HEIGHT),
            },
            drone: DroneSettings {
                addr: drone
                    .addr
                    .unwrap_or_else(|| DEFAULT_DRONE_ADDR.to_string()),
                state_port: drone.state_port.unwrap_or(DEFAULT_STATE_PORT),
                video_port: drone.video_port.unwrap_or(DEFAULT_VIDEO_PORT),
                keepalive: Duration::from_millis(
                    drone.keepalive_ms.unwrap_or(DEFAULT_KEEPALIVE_MS),
                ),
                video_bitrate: drone.video_bitrate.unwrap_or_default(),
            },
            decoder: DecoderSettings {
                program: decoder
                    .program
                    .unwrap_or_else(|| DEFAULT_DECODER.to_string()),
                hwaccel: match decoder.hwaccel {
                    Some(h) if h.trim().is_empty() => None,
                    Some(h) => Some(h),
                    None => Some(DEFAULT_HWACCEL.to_string()),
                },
            },
            detector: DetectorSettings {
                input_width: detector
                    .input_width
                    .unwrap_or(detector_defaults.input_width),
                input_height: detector
                    .input_height
                    .unwrap_or(detector_defaults.input_height),
                mean: detector.mean.unwrap_or(detector_defaults.mean),
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(detector_defaults.confidence_threshold),
            },
            tracking: TrackingSettings {
                selection: tracking.selection.unwrap_or_default(),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("FOLLOW_DRONE_ADDR") {
            if !addr.trim().is_empty() {
                self.drone.addr = addr.trim().to_string();
            }
        }
        if let Ok(program) = std::env::var("FOLLOW_FFMPEG") {
            if !program.trim().is_empty() {
                self.decoder.program = program;
            }
        }
        if let Ok(selection) = std::env::var("FOLLOW_SELECTION") {
            if !selection.trim().is_empty() {
                self.tracking.selection = SelectionMode::parse(&selection).ok_or_else(|| {
                    anyhow!(
                        "FOLLOW_SELECTION must be 'last_qualifying' or 'highest_confidence', got '{}'",
                        selection
                    )
                })?;
            }
        }
        if let Ok(keepalive) = std::env::var("FOLLOW_KEEPALIVE_MS") {
            if !keepalive.trim().is_empty() {
                let millis: u64 = keepalive.trim().parse().map_err(|_| {
                    anyhow!("FOLLOW_KEEPALIVE_MS must be an integer number of milliseconds")
                })?;
                self.drone.keepalive = Duration::from_millis(millis);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(anyhow!(
                "frame size must be non-zero, got {}x{}",
                self.frame.width,
                self.frame.height
            ));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input size must be non-zero"));
        }
        let threshold = self.detector.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "confidence threshold must be within [0, 1], got {}",
                threshold
            ));
        }
        if self.drone.keepalive.is_zero() {
            return Err(anyhow!("keep-alive interval must be greater than zero"));
        }
        if self.decoder.program.trim().is_empty() {
            return Err(anyhow!("decoder program must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FollowerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
