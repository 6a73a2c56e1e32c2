use crate::blendshape::map_to_expressions;
use crate::config::AnimationConfig;
use crate::error::RigError;
use crate::retarget::FacePose;
use crate::{
    BlendshapeScores, BoneForm, BoneHandle, HandJoint, HandPoseEstimate, HumanBone, Side,
    SkeletalRig,
};
use glam::Vec3;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

use HandJoint as J;
use HumanBone as B;

/// Solver joint -> rig bone, left hand. The solver's thumb Intermediate is
/// the rig's metacarpal; Proximal keeps its name.
pub const LEFT_HAND_BONES: [(HandJoint, HumanBone); 16] = [
    (J::Wrist, B::LeftHand),
    (J::ThumbProximal, B::LeftThumbProximal),
    (J::ThumbIntermediate, B::LeftThumbMetacarpal),
    (J::ThumbDistal, B::LeftThumbDistal),
    (J::IndexProximal, B::LeftIndexProximal),
    (J::IndexIntermediate, B::LeftIndexIntermediate),
    (J::IndexDistal, B::LeftIndexDistal),
    (J::MiddleProximal, B::LeftMiddleProximal),
    (J::MiddleIntermediate, B::LeftMiddleIntermediate),
    (J::MiddleDistal, B::LeftMiddleDistal),
    (J::RingProximal, B::LeftRingProximal),
    (J::RingIntermediate, B::LeftRingIntermediate),
    (J::RingDistal, B::LeftRingDistal),
    (J::LittleProximal, B::LeftLittleProximal),
    (J::LittleIntermediate, B::LeftLittleIntermediate),
    (J::LittleDistal, B::LeftLittleDistal),
];

/// Solver joint -> rig bone, right hand.
pub const RIGHT_HAND_BONES: [(HandJoint, HumanBone); 16] = [
    (J::Wrist, B::RightHand),
    (J::ThumbProximal, B::RightThumbProximal),
    (J::ThumbIntermediate, B::RightThumbMetacarpal),
    (J::ThumbDistal, B::RightThumbDistal),
    (J::IndexProximal, B::RightIndexProximal),
    (J::IndexIntermediate, B::RightIndexIntermediate),
    (J::IndexDistal, B::RightIndexDistal),
    (J::MiddleProximal, B::RightMiddleProximal),
    (J::MiddleIntermediate, B::RightMiddleIntermediate),
    (J::MiddleDistal, B::RightMiddleDistal),
    (J::RingProximal, B::RightRingProximal),
    (J::RingIntermediate, B::RightRingIntermediate),
    (J::RingDistal, B::RightRingDistal),
    (J::LittleProximal, B::RightLittleProximal),
    (J::LittleIntermediate, B::RightLittleIntermediate),
    (J::LittleDistal, B::RightLittleDistal),
];

/// Clamps into `[-|limit|, |limit|]`. A non-finite limit leaves the value
/// unbounded; a non-finite value becomes 0.
fn symmetric_clamp(value: f32, limit: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    if !limit.is_finite() {
        return value;
    }
    let limit = limit.abs();
    value.clamp(-limit, limit)
}

pub fn hand_table(side: Side) -> &'static [(HandJoint, HumanBone); 16] {
    match side {
        Side::Left => &LEFT_HAND_BONES,
        Side::Right => &RIGHT_HAND_BONES,
    }
}

pub fn hand_bone(side: Side, joint: HandJoint) -> HumanBone {
    hand_table(side)[joint as usize].1
}

const NECK_FOLLOW: Vec3 = Vec3::new(0.3, 0.3, 0.2);
const VISEMES: [&str; 5] = ["aa", "ee", "ih", "oh", "ou"];

/// Rig handles memoized per bone for the lifetime of one rig.
#[derive(Debug, Default)]
pub struct BoneCache {
    handles: HashMap<HumanBone, BoneHandle>,
    missing: HashSet<HumanBone>,
}

impl BoneCache {
    /// Cached handle, or a rig query preferring the normalized form.
    /// A bone the rig lacks is logged once and not queried again.
    pub fn resolve(&mut self, rig: &dyn SkeletalRig, bone: HumanBone) -> Option<BoneHandle> {
        if let Some(handle) = self.handles.get(&bone) {
            return Some(*handle);
        }
        if self.missing.contains(&bone) {
            return None;
        }

        let found = rig
            .bone(bone, BoneForm::Normalized)
            .or_else(|| rig.bone(bone, BoneForm::Raw));
        match found {
            Some(handle) => {
                debug!("Bone resolved and cached: {}", bone);
                self.handles.insert(bone, handle);
                Some(handle)
            }
            None => {
                debug!("Bone not found in rig: {}", bone);
                self.missing.insert(bone);
                None
            }
        }
    }

    pub fn get(&self, bone: HumanBone) -> Option<BoneHandle> {
        self.handles.get(&bone).copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
        self.missing.clear();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandReport {
    pub processed: usize,
    pub applied: usize,
}

/// Writes retargeted poses into the rig: joint -> bone mapping, bone
/// caching, inter-frame interpolation for hands, range clamps for face.
#[derive(Debug, Default)]
pub struct RigApplier {
    cache: BoneCache,
    previous: HashMap<(Side, HumanBone), Vec3>,
    bones_validated: bool,
    unmapped_reported: HashSet<String>,
}

impl RigApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything learned about the previous rig.
    pub fn on_rig_loaded(&mut self) {
        self.cache.clear();
        self.previous.clear();
        self.unmapped_reported.clear();
        self.bones_validated = false;
    }

    pub fn cache(&self) -> &BoneCache {
        &self.cache
    }

    pub fn bones_validated(&self) -> bool {
        self.bones_validated
    }

    pub fn previous_rotation(&self, side: Side, bone: HumanBone) -> Option<Vec3> {
        self.previous.get(&(side, bone)).copied()
    }

    /// Resolves every mapped bone once so the cache is warm and missing bones
    /// are reported up front.
    pub fn validate_bones(&mut self, rig: &dyn SkeletalRig) {
        if self.bones_validated {
            return;
        }

        let mut missing = Vec::new();
        let all = HumanBone::FACE
            .iter()
            .copied()
            .chain(Side::ALL.iter().flat_map(|s| hand_table(*s).iter().map(|(_, b)| *b)));
        let mut valid = 0;
        for bone in all {
            if self.cache.resolve(rig, bone).is_some() {
                valid += 1;
            } else {
                missing.push(bone.name());
            }
        }

        info!("Rig bones validated: {} valid, {} missing", valid, missing.len());
        if !missing.is_empty() {
            warn!("Missing bones: {:?}", missing);
        }
        self.bones_validated = true;
    }

    pub fn apply_hand(
        &mut self,
        rig: &mut dyn SkeletalRig,
        side: Side,
        hand: &HandPoseEstimate,
        config: &AnimationConfig,
    ) -> HandReport {
        self.validate_bones(rig);

        let mut report = HandReport::default();
        let weight = 1.0 - config.hand_smoothing_factor.clamp(0.0, 1.0);

        for (name, rotation) in &hand.joints {
            report.processed += 1;

            let joint = match HandJoint::parse_solver_name(name) {
                Some((joint_side, joint)) if joint_side == side => joint,
                _ => {
                    if self.unmapped_reported.insert(name.clone()) {
                        warn!("No {} hand bone mapping for solver joint {}", side, name);
                    }
                    continue;
                }
            };

            let Some(rotation) = rotation.value() else {
                debug!("{}", RigError::MalformedEstimate(name.clone()));
                continue;
            };

            let bone = hand_bone(side, joint);
            let Some(handle) = self.cache.resolve(rig, bone) else {
                continue;
            };

            let key = (side, bone);
            let rotation = match self.previous.get(&key) {
                Some(prev) if config.hand_smoothing_factor > 0.0 => prev.lerp(rotation, weight),
                _ => rotation,
            };

            rig.set_rotation(handle, rotation * config.hand_rotation_multiplier);
            self.previous.insert(key, rotation);
            report.applied += 1;
        }

        debug!(
            "{} hand: {} joints processed, {} rotations applied",
            side, report.processed, report.applied
        );
        report
    }

    /// Applies a (baseline-normalized) face pose. Returns bones written.
    pub fn apply_face(
        &mut self,
        rig: &mut dyn SkeletalRig,
        pose: &FacePose,
        blendshapes: Option<&BlendshapeScores>,
        config: &AnimationConfig,
    ) -> usize {
        self.validate_bones(rig);

        let clamp01 = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };

        rig.set_expression("blinkLeft", clamp01(pose.eye.l));
        rig.set_expression("blinkRight", clamp01(pose.eye.r));
        for (name, value) in VISEMES.iter().zip(pose.mouth.shape.values()) {
            rig.set_expression(name, clamp01(value * config.expression_intensity));
        }

        if config.enable_blendshapes {
            if let Some(scores) = blendshapes {
                for (expr, weight) in map_to_expressions(scores) {
                    rig.set_expression(expr, clamp01(weight * config.expression_intensity));
                }
            }
        }

        let mut written = 0;
        let head = pose.head.clamp(Vec3::NEG_ONE, Vec3::ONE);
        let head_dir = Vec3::new(-head.x, -head.y, head.z);

        if let Some(handle) = self.cache.resolve(rig, B::Head) {
            let range = config.head_rotation_range * config.face_sensitivity;
            rig.set_rotation(handle, head_dir * range);
            written += 1;
        }
        if let Some(handle) = self.cache.resolve(rig, B::Neck) {
            rig.set_rotation(handle, head_dir * NECK_FOLLOW);
            written += 1;
        }

        let left = self.cache.resolve(rig, B::LeftEye);
        let right = self.cache.resolve(rig, B::RightEye);
        if let (Some(left), Some(right)) = (left, right) {
            let range = config.eye_rotation_range;
            let yaw = symmetric_clamp(-pose.pupil.x * range, config.eye_yaw_limit);
            let pitch = symmetric_clamp(-pose.pupil.y * range, config.eye_pitch_limit);
            let eye = Vec3::new(pitch, yaw, 0.0);
            rig.set_rotation(left, eye);
            rig.set_rotation(right, eye);
            written += 2;
        }

        written
    }
}
