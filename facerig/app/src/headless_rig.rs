use api::{BoneForm, BoneHandle, HumanBone, SkeletalRig};
use common::bone_map::{LEFT_HAND_BONES, RIGHT_HAND_BONES};
use glam::Vec3;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Last published rig state, keyed by VRM bone name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RigPose {
    pub rotations: BTreeMap<String, Vec3>,
    pub expressions: BTreeMap<String, f32>,
    pub updates: u64,
    pub elapsed: f32,
}

pub type SharedPose = Arc<RwLock<RigPose>>;

/// Scene-graph stand-in with no renderer. Writes accumulate locally and are
/// published once per `update`, like a scene tick.
pub struct HeadlessRig {
    bones: HashMap<HumanBone, BoneHandle>,
    raw_only: Vec<HumanBone>,
    names: Vec<HumanBone>,
    rotations: Vec<Vec3>,
    expressions: BTreeMap<String, f32>,
    updates: u64,
    elapsed: f32,
    published: SharedPose,
}

impl HeadlessRig {
    pub fn with_bones(bones: impl IntoIterator<Item = HumanBone>) -> Self {
        let names: Vec<HumanBone> = bones.into_iter().collect();
        Self {
            bones: names
                .iter()
                .enumerate()
                .map(|(i, b)| (*b, BoneHandle(i as u32)))
                .collect(),
            raw_only: Vec::new(),
            rotations: vec![Vec3::ZERO; names.len()],
            names,
            expressions: BTreeMap::new(),
            updates: 0,
            elapsed: 0.0,
            published: SharedPose::default(),
        }
    }

    /// Every bone the retargeting pipeline drives.
    pub fn humanoid() -> Self {
        let hands = LEFT_HAND_BONES
            .iter()
            .chain(RIGHT_HAND_BONES.iter())
            .map(|(_, b)| *b);
        Self::with_bones(HumanBone::FACE.iter().copied().chain(hands))
    }

    /// Face only, for avatars without finger bones.
    pub fn face_only() -> Self {
        Self::with_bones(HumanBone::FACE)
    }

    /// Marks bones reachable only through their raw form.
    pub fn with_raw_only(mut self, bones: impl IntoIterator<Item = HumanBone>) -> Self {
        self.raw_only.extend(bones);
        self
    }

    pub fn shared_pose(&self) -> SharedPose {
        self.published.clone()
    }

    pub fn rotation(&self, bone: HumanBone) -> Option<Vec3> {
        self.bones
            .get(&bone)
            .map(|handle| self.rotations[handle.0 as usize])
    }

    pub fn expression(&self, name: &str) -> Option<f32> {
        self.expressions.get(name).copied()
    }
}

impl SkeletalRig for HeadlessRig {
    fn bone(&self, bone: HumanBone, form: BoneForm) -> Option<BoneHandle> {
        if form == BoneForm::Normalized && self.raw_only.contains(&bone) {
            return None;
        }
        self.bones.get(&bone).copied()
    }

    fn set_rotation(&mut self, handle: BoneHandle, rotation: Vec3) {
        if let Some(slot) = self.rotations.get_mut(handle.0 as usize) {
            *slot = rotation;
        }
    }

    fn set_expression(&mut self, name: &str, weight: f32) {
        self.expressions.insert(name.to_string(), weight);
    }

    fn update(&mut self, dt: f32) {
        self.updates += 1;
        self.elapsed += dt;

        let mut pose = self.published.write().unwrap_or_else(PoisonError::into_inner);
        pose.rotations = self
            .names
            .iter()
            .zip(&self.rotations)
            .map(|(bone, rotation)| (bone.name().to_string(), *rotation))
            .collect();
        pose.expressions = self.expressions.clone();
        pose.updates = self.updates;
        pose.elapsed = self.elapsed;
    }
}
