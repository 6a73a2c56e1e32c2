use crate::config::CalibrationConfig;
use crate::retarget::FacePose;
use crate::{EyeOpenness, MouthShape};

/// Gains restoring expressive range after the baseline is subtracted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeutralGains {
    pub eye: f32,
    pub mouth: f32,
}

impl Default for NeutralGains {
    fn default() -> Self {
        Self {
            eye: 3.0,
            mouth: 4.0,
        }
    }
}

impl From<&CalibrationConfig> for NeutralGains {
    fn from(config: &CalibrationConfig) -> Self {
        Self {
            eye: config.eye_gain,
            mouth: config.mouth_gain,
        }
    }
}

fn above_baseline(live: f32, baseline: f32, gain: f32) -> f32 {
    ((live - baseline) * gain).max(0.0)
}

/// Expresses eye openness and mouth shapes relative to the calibrated
/// neutral pose. Head, pupil and the remaining channels pass through. Without
/// a baseline the pose is returned unchanged.
pub fn normalize(pose: &FacePose, baseline: Option<&FacePose>, gains: NeutralGains) -> FacePose {
    let Some(base) = baseline else {
        return *pose;
    };

    let live_shape = pose.mouth.shape.values();
    let base_shape = base.mouth.shape.values();
    let mut shape = [0.0; 5];
    for i in 0..5 {
        shape[i] = above_baseline(live_shape[i], base_shape[i], gains.mouth);
    }

    let mut out = *pose;
    out.eye = EyeOpenness {
        l: above_baseline(pose.eye.l, base.eye.l, gains.eye),
        r: above_baseline(pose.eye.r, base.eye.r, gains.eye),
    };
    out.mouth.shape = MouthShape::from_values(shape);
    out
}
