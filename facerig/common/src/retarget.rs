use crate::blendshape::{enhance, enhance_blendshapes};
use crate::config::{AdapterConfig, FilterTuning, RigConfig};
use crate::error::RigError;
use crate::{
    finite_or_zero, BlendshapeScores, ExponentialFilter, EyeOpenness, HandJoint, HandPoseEstimate,
    JointRotation, LandmarkPoint, MouthEstimate, MouthShape, PoseSolver, PupilPosition,
    RawPoseEstimate, Side, SolverOptions,
};
use glam::Vec3;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

const BLINK_EXPONENT: f32 = 1.2;
const MOUTH_EXPONENT: f32 = 1.1;

/// Normalized face pose: solver output after scaling, enhancement,
/// stabilization and smoothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FacePose {
    pub head: Vec3,
    pub head_degrees: Vec3,
    pub eye: EyeOpenness,
    pub brow: f32,
    pub mouth: MouthEstimate,
    pub pupil: PupilPosition,
}

impl FacePose {
    /// Replaces every non-finite channel with 0.
    pub fn sanitized(&self) -> Self {
        let v = |v: Vec3| Vec3::new(finite_or_zero(v.x), finite_or_zero(v.y), finite_or_zero(v.z));
        Self {
            head: v(self.head),
            head_degrees: v(self.head_degrees),
            eye: self.eye.sanitized(),
            brow: finite_or_zero(self.brow),
            mouth: self.mouth.sanitized(),
            pupil: self.pupil.sanitized(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetargetedFace {
    pub pose: FacePose,
    pub blendshapes: Option<BlendshapeScores>,
}

#[derive(Debug, Clone)]
struct FaceFilters {
    head: [ExponentialFilter; 3],
    eye: [ExponentialFilter; 2],
    brow: ExponentialFilter,
    mouth: [ExponentialFilter; 2],
    shape: [ExponentialFilter; 5],
    pupil: [ExponentialFilter; 2],
}

impl FaceFilters {
    fn new(tuning: &FilterTuning, global: Option<f32>) -> Self {
        let mut filters = Self {
            head: [ExponentialFilter::default(); 3],
            eye: [ExponentialFilter::default(); 2],
            brow: ExponentialFilter::default(),
            mouth: [ExponentialFilter::default(); 2],
            shape: [ExponentialFilter::default(); 5],
            pupil: [ExponentialFilter::default(); 2],
        };
        filters.set_alphas(tuning, global);
        filters
    }

    fn set_alphas(&mut self, tuning: &FilterTuning, global: Option<f32>) {
        let pick = |channel: f32| global.unwrap_or(channel);
        self.head.iter_mut().for_each(|f| f.set_alpha(pick(tuning.head)));
        self.eye.iter_mut().for_each(|f| f.set_alpha(pick(tuning.eye)));
        self.brow.set_alpha(pick(tuning.brow));
        self.mouth.iter_mut().for_each(|f| f.set_alpha(pick(tuning.mouth)));
        self.shape.iter_mut().for_each(|f| f.set_alpha(pick(tuning.mouth)));
        self.pupil.iter_mut().for_each(|f| f.set_alpha(pick(tuning.pupil)));
    }

    fn reset(&mut self) {
        self.head
            .iter_mut()
            .chain(self.eye.iter_mut())
            .chain(std::iter::once(&mut self.brow))
            .chain(self.mouth.iter_mut())
            .chain(self.shape.iter_mut())
            .chain(self.pupil.iter_mut())
            .for_each(ExponentialFilter::reset);
    }
}

/// Turns raw solver output into a stable, bounded face pose.
///
/// Per frame: scale rotations by `calibration_scale * sensitivity_multiplier`,
/// run blink and mouth-shape channels through a dead-zone power curve,
/// average head and eye channels over the last few frames, then smooth every
/// channel with its own [`ExponentialFilter`].
pub struct RetargetingAdapter {
    config: AdapterConfig,
    tuning: FilterTuning,
    solver_options: SolverOptions,
    frame_buffer: VecDeque<FacePose>,
    face: FaceFilters,
    blendshapes: HashMap<String, ExponentialFilter>,
    hands: HashMap<(Side, HandJoint), [ExponentialFilter; 3]>,
}

impl RetargetingAdapter {
    pub fn new(config: &RigConfig) -> Self {
        Self {
            config: config.adapter.clone(),
            tuning: config.filters.clone(),
            solver_options: SolverOptions::default(),
            frame_buffer: VecDeque::with_capacity(config.adapter.stabilization_frames.max(1)),
            face: FaceFilters::new(&config.filters, config.adapter.smoothing_factor),
            blendshapes: HashMap::new(),
            hands: HashMap::new(),
        }
    }

    /// Picks up configuration changes without discarding filter history.
    pub fn configure(&mut self, config: &RigConfig) {
        if self.config == config.adapter && self.tuning == config.filters {
            return;
        }
        self.config = config.adapter.clone();
        self.tuning = config.filters.clone();

        let global = self.config.smoothing_factor;
        self.face.set_alphas(&self.tuning, global);
        let bs_alpha = global.unwrap_or(self.tuning.blendshape);
        self.blendshapes.values_mut().for_each(|f| f.set_alpha(bs_alpha));
        for filters in self.hands.values_mut() {
            filters.iter_mut().for_each(|f| f.set_alpha(self.tuning.hand));
        }

        let depth = self.config.stabilization_frames.max(1);
        while self.frame_buffer.len() > depth {
            self.frame_buffer.pop_front();
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn solver_options(&self) -> &SolverOptions {
        &self.solver_options
    }

    /// Solves and retargets one face. Solver failures are logged and yield
    /// `None`; the caller skips animation for this frame.
    pub fn process_landmarks(
        &mut self,
        landmarks: &[LandmarkPoint],
        blendshapes: Option<&BlendshapeScores>,
        solver: &mut dyn PoseSolver,
    ) -> Option<RetargetedFace> {
        if landmarks.is_empty() {
            return None;
        }

        match solver.solve_face(landmarks, &self.solver_options) {
            Ok(raw) => Some(self.retarget(&raw, blendshapes)),
            Err(e) => {
                error!("{}", RigError::Solver(format!("{:#}", e)));
                None
            }
        }
    }

    pub fn retarget(
        &mut self,
        raw: &RawPoseEstimate,
        blendshapes: Option<&BlendshapeScores>,
    ) -> RetargetedFace {
        let shaped = self.shape(raw, blendshapes);

        let depth = self.config.stabilization_frames.max(1);
        self.frame_buffer.push_back(shaped.pose);
        while self.frame_buffer.len() > depth {
            self.frame_buffer.pop_front();
        }

        let stabilized = self.stabilize(shaped.pose);
        RetargetedFace {
            pose: self.smooth(&stabilized),
            blendshapes: shaped.blendshapes.map(|b| self.smooth_blendshapes(b)),
        }
    }

    /// Scaling and enhancement only; no history is read or written.
    pub fn shape(
        &self,
        raw: &RawPoseEstimate,
        blendshapes: Option<&BlendshapeScores>,
    ) -> RetargetedFace {
        let raw = raw.sanitized();
        let c = &self.config;
        let scale = |v: f32| v * c.calibration_scale * c.sensitivity_multiplier;
        let blink = |v: f32| enhance(v, c.blendshape_threshold, c.sensitivity_multiplier, BLINK_EXPONENT);
        let mouth = |v: f32| enhance(v, c.blendshape_threshold, c.sensitivity_multiplier, MOUTH_EXPONENT);

        let head_degrees = raw
            .head
            .degrees
            .map(|d| d.to_vec3() * c.calibration_scale)
            .unwrap_or(Vec3::ZERO);

        let pose = FacePose {
            head: Vec3::new(scale(raw.head.x), scale(raw.head.y), scale(raw.head.z)),
            head_degrees,
            eye: EyeOpenness {
                l: blink(raw.eye.l),
                r: blink(raw.eye.r),
            },
            brow: scale(raw.brow),
            mouth: MouthEstimate {
                x: scale(raw.mouth.x),
                y: scale(raw.mouth.y),
                shape: MouthShape::from_values(raw.mouth.shape.values().map(mouth)),
            },
            pupil: raw.pupil,
        };

        RetargetedFace {
            pose,
            blendshapes: blendshapes.map(|b| {
                enhance_blendshapes(b, c.blendshape_threshold, c.sensitivity_multiplier)
            }),
        }
    }

    /// Replaces head axes and eye openness with their mean over the buffer.
    fn stabilize(&self, current: FacePose) -> FacePose {
        if self.frame_buffer.len() < 2 {
            return current;
        }
        let n = self.frame_buffer.len() as f32;
        let mut head = Vec3::ZERO;
        let (mut l, mut r) = (0.0, 0.0);
        for frame in &self.frame_buffer {
            head += frame.head;
            l += frame.eye.l;
            r += frame.eye.r;
        }
        FacePose {
            head: head / n,
            eye: EyeOpenness { l: l / n, r: r / n },
            ..current
        }
    }

    fn smooth(&mut self, pose: &FacePose) -> FacePose {
        let f = &mut self.face;
        let shape = pose.mouth.shape.values();
        let mut smoothed_shape = [0.0; 5];
        for (i, v) in shape.iter().enumerate() {
            smoothed_shape[i] = f.shape[i].filter(*v);
        }

        FacePose {
            head: Vec3::new(
                f.head[0].filter(pose.head.x),
                f.head[1].filter(pose.head.y),
                f.head[2].filter(pose.head.z),
            ),
            head_degrees: pose.head_degrees,
            eye: EyeOpenness {
                l: f.eye[0].filter(pose.eye.l),
                r: f.eye[1].filter(pose.eye.r),
            },
            brow: f.brow.filter(pose.brow),
            mouth: MouthEstimate {
                x: f.mouth[0].filter(pose.mouth.x),
                y: f.mouth[1].filter(pose.mouth.y),
                shape: MouthShape::from_values(smoothed_shape),
            },
            pupil: PupilPosition {
                x: f.pupil[0].filter(pose.pupil.x),
                y: f.pupil[1].filter(pose.pupil.y),
            },
        }
    }

    fn smooth_blendshapes(&mut self, scores: BlendshapeScores) -> BlendshapeScores {
        let alpha = self.config.smoothing_factor.unwrap_or(self.tuning.blendshape);
        scores
            .into_iter()
            .map(|(name, value)| {
                let filter = self
                    .blendshapes
                    .entry(name.clone())
                    .or_insert_with(|| ExponentialFilter::new(alpha));
                let out = filter.filter(value);
                (name, out)
            })
            .collect()
    }

    /// Smooths every well-formed, known joint per axis. Other entries pass
    /// through untouched for the application layer to judge.
    pub fn smooth_hand(&mut self, side: Side, raw: &HandPoseEstimate) -> HandPoseEstimate {
        let alpha = self.tuning.hand;
        let mut out = HandPoseEstimate::default();
        for (name, rotation) in &raw.joints {
            let smoothed = match (HandJoint::parse_solver_name(name), rotation.value()) {
                (Some((joint_side, joint)), Some(v)) if joint_side == side => {
                    let filters = self
                        .hands
                        .entry((side, joint))
                        .or_insert_with(|| [ExponentialFilter::new(alpha); 3]);
                    JointRotation::new(
                        filters[0].filter(v.x),
                        filters[1].filter(v.y),
                        filters[2].filter(v.z),
                    )
                }
                _ => *rotation,
            };
            out.joints.insert(name.clone(), smoothed);
        }
        out
    }

    /// Clears face smoothing and stabilization history.
    pub fn reset_face(&mut self) {
        self.face.reset();
        self.blendshapes.clear();
        self.frame_buffer.clear();
        debug!("Face filters reset");
    }

    pub fn reset_hands(&mut self) {
        self.hands.clear();
    }
}
