pub use api::{
    finite_or_zero, BlendshapeScores, BoneForm, BoneHandle, Euler, EyeOpenness, FaceObservation, HandJoint,
    HandObservation, HandPoseEstimate, HeadEstimate, HumanBone, JointRotation, LandmarkPoint,
    LandmarkSource, MouthEstimate, MouthShape, PerceptionFrame, PoseSolver, PupilPosition,
    RawPoseEstimate, SkeletalRig, Side, SolverOptions,
};

pub mod baseline_store;
mod blendshape;
pub mod bone_map;
mod calibration;
mod config;
mod ema_filter;
mod error;
mod normalization;
mod retarget;
mod session;

pub use blendshape::{
    enhance, enhance_blendshapes, expression_for, map_to_expressions, BlendshapeCategory,
    CategoryCurve,
};
pub use bone_map::{BoneCache, HandReport, RigApplier};
pub use calibration::{
    CalibrationEvent, CalibrationState, NeutralPoseCalibrator, DEFAULT_TARGET_FRAMES,
};
pub use config::{
    AdapterConfig, AnimationConfig, CalibrationConfig, ConfigPatch, FilterTuning, RigConfig,
    RuntimeConfig,
};
pub use ema_filter::ExponentialFilter;
pub use error::RigError;
pub use normalization::{normalize, NeutralGains};
pub use retarget::{FacePose, RetargetedFace, RetargetingAdapter};
pub use session::{CalibrationStatus, RetargetSession, SessionStats, TickOutcome};
