#![allow(dead_code)]

use anyhow::{anyhow, Result};
use common::bone_map::{LEFT_HAND_BONES, RIGHT_HAND_BONES};
use common::{
    BoneForm, BoneHandle, HandPoseEstimate, HumanBone, LandmarkPoint, LandmarkSource,
    PerceptionFrame, PoseSolver, RawPoseEstimate, Side, SkeletalRig, SolverOptions,
};
use glam::Vec3;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct RigLog {
    pub lookups: HashMap<HumanBone, usize>,
    pub rotations: HashMap<HumanBone, Vec3>,
    pub expressions: HashMap<String, f32>,
    pub updates: usize,
}

impl RigLog {
    pub fn lookups(&self, bone: HumanBone) -> usize {
        self.lookups.get(&bone).copied().unwrap_or(0)
    }
}

/// In-memory rig recording every call through a shared log.
pub struct MockRig {
    bones: HashMap<HumanBone, BoneHandle>,
    raw_only: HashSet<HumanBone>,
    pub log: Arc<Mutex<RigLog>>,
}

impl MockRig {
    pub fn with_bones(bones: impl IntoIterator<Item = HumanBone>) -> Self {
        Self {
            bones: bones
                .into_iter()
                .enumerate()
                .map(|(i, b)| (b, BoneHandle(i as u32)))
                .collect(),
            raw_only: HashSet::new(),
            log: Arc::new(Mutex::new(RigLog::default())),
        }
    }

    pub fn full() -> Self {
        let hands = LEFT_HAND_BONES
            .iter()
            .chain(RIGHT_HAND_BONES.iter())
            .map(|(_, b)| *b);
        Self::with_bones(HumanBone::FACE.iter().copied().chain(hands))
    }

    /// Bone only reachable through the raw form.
    pub fn raw_only(mut self, bone: HumanBone) -> Self {
        self.raw_only.insert(bone);
        self
    }

    pub fn shared_log(&self) -> Arc<Mutex<RigLog>> {
        self.log.clone()
    }

    fn bone_for(&self, handle: BoneHandle) -> Option<HumanBone> {
        self.bones
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(b, _)| *b)
    }
}

impl SkeletalRig for MockRig {
    fn bone(&self, bone: HumanBone, form: BoneForm) -> Option<BoneHandle> {
        *self.log.lock().unwrap().lookups.entry(bone).or_insert(0) += 1;
        if form == BoneForm::Normalized && self.raw_only.contains(&bone) {
            return None;
        }
        self.bones.get(&bone).copied()
    }

    fn set_rotation(&mut self, handle: BoneHandle, rotation: Vec3) {
        if let Some(bone) = self.bone_for(handle) {
            self.log.lock().unwrap().rotations.insert(bone, rotation);
        }
    }

    fn set_expression(&mut self, name: &str, weight: f32) {
        self.log
            .lock()
            .unwrap()
            .expressions
            .insert(name.to_string(), weight);
    }

    fn update(&mut self, _dt: f32) {
        self.log.lock().unwrap().updates += 1;
    }
}

/// Returns canned estimates; an empty queue means failure.
#[derive(Default)]
pub struct ScriptedSolver {
    pub faces: VecDeque<Result<RawPoseEstimate>>,
    pub hands: HashMap<Side, HandPoseEstimate>,
    pub face_calls: usize,
}

impl ScriptedSolver {
    pub fn repeating(raw: RawPoseEstimate, n: usize) -> Self {
        Self {
            faces: (0..n).map(|_| Ok(raw)).collect(),
            ..Default::default()
        }
    }
}

impl PoseSolver for ScriptedSolver {
    fn solve_face(
        &mut self,
        _landmarks: &[LandmarkPoint],
        _options: &SolverOptions,
    ) -> Result<RawPoseEstimate> {
        self.face_calls += 1;
        self.faces
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no face estimate scripted")))
    }

    fn solve_hand(&mut self, _landmarks: &[LandmarkPoint], side: Side) -> Result<HandPoseEstimate> {
        self.hands
            .get(&side)
            .cloned()
            .ok_or_else(|| anyhow!("no {} hand scripted", side))
    }
}

pub struct FailingSource;

impl LandmarkSource for FailingSource {
    fn initialize(&mut self) -> Result<()> {
        Err(anyhow!("accelerator unavailable"))
    }

    fn next_frame(&mut self) -> Result<Option<PerceptionFrame>> {
        Ok(None)
    }
}

pub struct EmptySource;

impl LandmarkSource for EmptySource {
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<PerceptionFrame>> {
        Ok(None)
    }
}

pub fn face_frame(timestamp: f64) -> PerceptionFrame {
    PerceptionFrame {
        timestamp,
        face: Some(common::FaceObservation {
            landmarks: vec![LandmarkPoint::default(); 468],
            ..Default::default()
        }),
        hands: Vec::new(),
    }
}

pub fn hand_frame(timestamp: f64, side: Side) -> PerceptionFrame {
    PerceptionFrame {
        timestamp,
        face: None,
        hands: vec![common::HandObservation {
            side,
            landmarks: vec![LandmarkPoint::default(); 21],
        }],
    }
}
