use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

/// Values applied when writing to the rig. Read every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub face_sensitivity: f32,
    pub hand_smoothing_factor: f32,
    pub hand_rotation_multiplier: f32,
    pub expression_intensity: f32,
    /// Head rotation (radians) produced by a normalized head axis of 1.0.
    pub head_rotation_range: f32,
    pub eye_rotation_range: f32,
    pub eye_yaw_limit: f32,
    pub eye_pitch_limit: f32,
    pub enable_blendshapes: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            face_sensitivity: 1.0,
            hand_smoothing_factor: 0.15,
            hand_rotation_multiplier: 1.0,
            expression_intensity: 1.0,
            head_rotation_range: PI / 4.0,
            eye_rotation_range: PI / 12.0,
            eye_yaw_limit: PI / 8.0,
            eye_pitch_limit: PI / 10.0,
            enable_blendshapes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub calibration_scale: f32,
    pub sensitivity_multiplier: f32,
    /// Dead zone below which enhanced channels snap to 0.
    pub blendshape_threshold: f32,
    pub stabilization_frames: usize,
    /// Overrides every face channel alpha when set.
    pub smoothing_factor: Option<f32>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            calibration_scale: 1.0,
            sensitivity_multiplier: 2.5,
            blendshape_threshold: 0.01,
            stabilization_frames: 3,
            smoothing_factor: None,
        }
    }
}

/// Per-channel EMA alphas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterTuning {
    pub eye: f32,
    pub head: f32,
    pub mouth: f32,
    pub pupil: f32,
    pub brow: f32,
    pub blendshape: f32,
    pub hand: f32,
}

impl Default for FilterTuning {
    fn default() -> Self {
        Self {
            eye: 0.4,
            head: 0.3,
            mouth: 0.5,
            pupil: 0.6,
            brow: 0.5,
            blendshape: 0.3,
            hand: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub target_frames: u32,
    pub eye_gain: f32,
    pub mouth_gain: f32,
    /// Save the neutral baseline once collected and restore it at startup.
    pub persist: bool,
    pub path: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            target_frames: 30,
            eye_gain: 3.0,
            mouth_gain: 4.0,
            persist: false,
            path: PathBuf::from("neutral_pose.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Recorded perception frames (JSON lines).
    pub replay_path: PathBuf,
    pub loop_replay: bool,
    pub max_fps: Option<f32>,
    /// Port for the HTTP control surface; `None` disables it.
    pub control_port: Option<u16>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            replay_path: PathBuf::from("capture.jsonl"),
            loop_replay: false,
            max_fps: Some(30.0),
            control_port: Some(9010),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub animation: AnimationConfig,
    pub adapter: AdapterConfig,
    pub filters: FilterTuning,
    pub calibration: CalibrationConfig,
    pub runtime: RuntimeConfig,
}

/// Partial update from an external control surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub face_sensitivity: Option<f32>,
    pub hand_smoothing_factor: Option<f32>,
    pub hand_rotation_multiplier: Option<f32>,
    pub expression_intensity: Option<f32>,
    pub smoothing_factor: Option<f32>,
    pub sensitivity_multiplier: Option<f32>,
    pub blendshape_threshold: Option<f32>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Folds a later patch into this one; the later value wins per field.
    pub fn merge(&mut self, later: &ConfigPatch) {
        self.face_sensitivity = later.face_sensitivity.or(self.face_sensitivity);
        self.hand_smoothing_factor = later.hand_smoothing_factor.or(self.hand_smoothing_factor);
        self.hand_rotation_multiplier = later
            .hand_rotation_multiplier
            .or(self.hand_rotation_multiplier);
        self.expression_intensity = later.expression_intensity.or(self.expression_intensity);
        self.smoothing_factor = later.smoothing_factor.or(self.smoothing_factor);
        self.sensitivity_multiplier = later.sensitivity_multiplier.or(self.sensitivity_multiplier);
        self.blendshape_threshold = later.blendshape_threshold.or(self.blendshape_threshold);
    }
}

impl RigConfig {
    /// Reads `path`, writing the defaults there first when it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, writing defaults", path);
            let config = Self::default();
            let json = serde_json::to_string_pretty(&config)?;
            fs::write(path, json)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            return Ok(config);
        }

        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.sanitize();
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Repairs values a hand-edited file can get wrong.
    fn sanitize(&mut self) {
        let sensitivity = &mut self.adapter.sensitivity_multiplier;
        if !sensitivity.is_finite() || *sensitivity < 0.0 {
            warn!("Invalid sensitivity_multiplier {}, using 0", sensitivity);
            *sensitivity = 0.0;
        }
        let threshold = &mut self.adapter.blendshape_threshold;
        if !threshold.is_finite() || *threshold < 0.0 {
            *threshold = 0.0;
        }
    }

    /// Applies the fields present in `patch`. Factors are clamped to [0, 1];
    /// non-finite values are ignored.
    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        let finite = |v: Option<f32>| v.filter(|x| x.is_finite());

        if let Some(v) = finite(patch.face_sensitivity) {
            self.animation.face_sensitivity = v;
        }
        if let Some(v) = finite(patch.hand_smoothing_factor) {
            self.animation.hand_smoothing_factor = v.clamp(0.0, 1.0);
        }
        if let Some(v) = finite(patch.hand_rotation_multiplier) {
            self.animation.hand_rotation_multiplier = v;
        }
        if let Some(v) = finite(patch.expression_intensity) {
            self.animation.expression_intensity = v;
        }
        if let Some(v) = finite(patch.smoothing_factor) {
            self.adapter.smoothing_factor = Some(v.clamp(0.0, 1.0));
        }
        if let Some(v) = finite(patch.sensitivity_multiplier) {
            self.adapter.sensitivity_multiplier = v.max(0.0);
        }
        if let Some(v) = finite(patch.blendshape_threshold) {
            self.adapter.blendshape_threshold = v.max(0.0);
        }
    }
}
