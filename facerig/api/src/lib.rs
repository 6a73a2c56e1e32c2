mod skeleton;
pub use skeleton::{HandJoint, HumanBone, Side};

use anyhow::Result;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Perception category name -> score in [0, 1].
pub type BlendshapeScores = BTreeMap<String, f32>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Euler {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Euler {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    fn sanitized(self) -> Self {
        Self::new(finite_or_zero(self.x), finite_or_zero(self.y), finite_or_zero(self.z))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadEstimate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub degrees: Option<Euler>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeOpenness {
    pub l: f32,
    pub r: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouthShape {
    #[serde(rename = "A")]
    pub a: f32,
    #[serde(rename = "E")]
    pub e: f32,
    #[serde(rename = "I")]
    pub i: f32,
    #[serde(rename = "O")]
    pub o: f32,
    #[serde(rename = "U")]
    pub u: f32,
}

impl EyeOpenness {
    pub fn sanitized(self) -> Self {
        Self {
            l: finite_or_zero(self.l),
            r: finite_or_zero(self.r),
        }
    }
}

impl MouthShape {
    pub fn values(&self) -> [f32; 5] {
        [self.a, self.e, self.i, self.o, self.u]
    }

    pub fn from_values(v: [f32; 5]) -> Self {
        Self {
            a: v[0],
            e: v[1],
            i: v[2],
            o: v[3],
            u: v[4],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouthEstimate {
    pub x: f32,
    pub y: f32,
    pub shape: MouthShape,
}

impl MouthEstimate {
    pub fn sanitized(self) -> Self {
        Self {
            x: finite_or_zero(self.x),
            y: finite_or_zero(self.y),
            shape: MouthShape::from_values(self.shape.values().map(finite_or_zero)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PupilPosition {
    pub x: f32,
    pub y: f32,
}

impl PupilPosition {
    pub fn sanitized(self) -> Self {
        Self {
            x: finite_or_zero(self.x),
            y: finite_or_zero(self.y),
        }
    }
}

/// Face solver output for a single frame. Missing fields deserialize as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPoseEstimate {
    pub head: HeadEstimate,
    pub eye: EyeOpenness,
    pub brow: f32,
    pub mouth: MouthEstimate,
    pub pupil: PupilPosition,
}

impl RawPoseEstimate {
    /// Replaces every non-finite channel with 0.
    pub fn sanitized(&self) -> Self {
        let f = finite_or_zero;
        Self {
            head: HeadEstimate {
                x: f(self.head.x),
                y: f(self.head.y),
                z: f(self.head.z),
                degrees: self.head.degrees.map(Euler::sanitized),
            },
            eye: self.eye.sanitized(),
            brow: f(self.brow),
            mouth: self.mouth.sanitized(),
            pupil: self.pupil.sanitized(),
        }
    }
}

/// A single joint rotation as reported by the hand solver. Components may be
/// absent or non-numeric; such joints are skipped downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointRotation {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl JointRotation {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// `None` unless all three components are present and finite.
    pub fn value(&self) -> Option<Vec3> {
        match (self.x, self.y, self.z) {
            (Some(x), Some(y), Some(z)) if x.is_finite() && y.is_finite() && z.is_finite() => {
                Some(Vec3::new(x, y, z))
            }
            _ => None,
        }
    }
}

impl From<Vec3> for JointRotation {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Hand solver output keyed by solver joint name (e.g. `LeftIndexProximal`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandPoseEstimate {
    pub joints: BTreeMap<String, JointRotation>,
}

impl HandPoseEstimate {
    pub fn insert(&mut self, side: Side, joint: HandJoint, rotation: Vec3) {
        self.joints
            .insert(joint.solver_name(side), JointRotation::from(rotation));
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceObservation {
    pub landmarks: Vec<LandmarkPoint>,
    pub blendshapes: Option<BlendshapeScores>,
    pub transform: Option<[f32; 16]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    pub side: Side,
    #[serde(default)]
    pub landmarks: Vec<LandmarkPoint>,
}

/// Everything the perception backend produced for one video frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionFrame {
    /// Video timestamp in seconds. Frames repeating the previous timestamp are skipped.
    pub timestamp: f64,
    pub face: Option<FaceObservation>,
    pub hands: Vec<HandObservation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub runtime: String,
    pub blink_settings: [f32; 2],
    pub smooth_blink: bool,
    pub stabilize_blink: bool,
    pub enable_wink: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            runtime: "mediapipe".to_string(),
            blink_settings: [0.15, 0.85],
            smooth_blink: true,
            stabilize_blink: true,
            enable_wink: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneForm {
    Normalized,
    Raw,
}

/// Camera frame -> landmarks. Implementations may block on an accelerator.
pub trait LandmarkSource: Send {
    fn initialize(&mut self) -> Result<()>;
    /// `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<PerceptionFrame>>;
    fn close(&mut self) {}
}

/// Landmarks -> raw joint rotations.
pub trait PoseSolver: Send {
    fn solve_face(
        &mut self,
        landmarks: &[LandmarkPoint],
        options: &SolverOptions,
    ) -> Result<RawPoseEstimate>;
    fn solve_hand(&mut self, landmarks: &[LandmarkPoint], side: Side) -> Result<HandPoseEstimate>;
}

/// The avatar's named bone tree.
pub trait SkeletalRig: Send {
    fn bone(&self, bone: HumanBone, form: BoneForm) -> Option<BoneHandle>;
    fn set_rotation(&mut self, handle: BoneHandle, rotation: Vec3);
    fn set_expression(&mut self, name: &str, weight: f32);
    fn update(&mut self, dt: f32);
}

/// Non-finite values (NaN, infinities) become 0.
pub fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
