use crate::BlendshapeScores;
use std::collections::BTreeMap;

/// Category a perception blendshape falls in, by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendshapeCategory {
    Blink,
    Mouth,
    Brow,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryCurve {
    pub multiplier: f32,
    pub exponent: f32,
}

impl BlendshapeCategory {
    pub fn of(name: &str) -> Self {
        if name.contains("Blink") {
            Self::Blink
        } else if name.contains("mouth") || name.contains("jaw") {
            Self::Mouth
        } else if name.contains("brow") {
            Self::Brow
        } else {
            Self::Generic
        }
    }

    pub fn curve(&self) -> CategoryCurve {
        let (multiplier, exponent) = match self {
            Self::Blink => (1.5, 1.3),
            Self::Mouth => (1.3, 1.1),
            Self::Brow => (1.2, 1.05),
            Self::Generic => (1.0, 1.0),
        };
        CategoryCurve {
            multiplier,
            exponent,
        }
    }
}

/// Dead zone + power curve shared by blink and mouth-shape channels.
/// Output magnitude is clamped to [0, 1] and keeps the input's sign.
pub fn enhance(value: f32, threshold: f32, sensitivity: f32, exponent: f32) -> f32 {
    if !value.is_finite() || value.abs() < threshold {
        return 0.0;
    }
    let curved = (value.abs() * sensitivity).max(0.0).powf(exponent);
    curved.clamp(0.0, 1.0) * value.signum()
}

/// Applies the per-category multiplier and curve to every score.
pub fn enhance_blendshapes(
    scores: &BlendshapeScores,
    threshold: f32,
    sensitivity: f32,
) -> BlendshapeScores {
    scores
        .iter()
        .map(|(name, &value)| {
            let enhanced = if !value.is_finite() || value.abs() < threshold {
                0.0
            } else {
                let curve = BlendshapeCategory::of(name).curve();
                let scaled = (value * sensitivity * curve.multiplier).max(0.0);
                scaled.powf(curve.exponent).clamp(0.0, 1.0)
            };
            (name.clone(), enhanced)
        })
        .collect()
}

/// Perception blendshape -> rig expression, for expressions the
/// blink/viseme path does not drive.
const EXPRESSION_MAP: &[(&str, &str)] = &[
    ("mouthSmileLeft", "happy"),
    ("mouthSmileRight", "happy"),
    ("mouthFrownLeft", "sad"),
    ("mouthFrownRight", "sad"),
    ("browDownLeft", "angry"),
    ("browDownRight", "angry"),
    ("browInnerUp", "surprised"),
    ("eyeWideLeft", "surprised"),
    ("eyeWideRight", "surprised"),
    ("cheekPuff", "puff"),
];

const EXPRESSION_CURVE: f32 = 0.7;

pub fn expression_for(blendshape: &str) -> Option<&'static str> {
    EXPRESSION_MAP
        .iter()
        .find(|(name, _)| *name == blendshape)
        .map(|(_, expr)| *expr)
}

/// Folds enhanced blendshapes into rig expression weights. Several sources
/// for one expression combine by maximum.
pub fn map_to_expressions(scores: &BlendshapeScores) -> BTreeMap<&'static str, f32> {
    let mut out = BTreeMap::new();
    for (name, &value) in scores {
        let Some(expr) = expression_for(name) else {
            continue;
        };
        let weight = value.clamp(0.0, 1.0).powf(EXPRESSION_CURVE);
        let slot = out.entry(expr).or_insert(0.0f32);
        if weight > *slot {
            *slot = weight;
        }
    }
    out
}
