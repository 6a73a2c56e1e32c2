use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Solver-side hand joints. Solver names are side-prefixed: `LeftWrist`,
/// `RightMiddleIntermediate`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandJoint {
    Wrist,
    ThumbProximal,
    ThumbIntermediate,
    ThumbDistal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
}

impl HandJoint {
    pub const ALL: [HandJoint; 16] = [
        HandJoint::Wrist,
        HandJoint::ThumbProximal,
        HandJoint::ThumbIntermediate,
        HandJoint::ThumbDistal,
        HandJoint::IndexProximal,
        HandJoint::IndexIntermediate,
        HandJoint::IndexDistal,
        HandJoint::MiddleProximal,
        HandJoint::MiddleIntermediate,
        HandJoint::MiddleDistal,
        HandJoint::RingProximal,
        HandJoint::RingIntermediate,
        HandJoint::RingDistal,
        HandJoint::LittleProximal,
        HandJoint::LittleIntermediate,
        HandJoint::LittleDistal,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            HandJoint::Wrist => "Wrist",
            HandJoint::ThumbProximal => "ThumbProximal",
            HandJoint::ThumbIntermediate => "ThumbIntermediate",
            HandJoint::ThumbDistal => "ThumbDistal",
            HandJoint::IndexProximal => "IndexProximal",
            HandJoint::IndexIntermediate => "IndexIntermediate",
            HandJoint::IndexDistal => "IndexDistal",
            HandJoint::MiddleProximal => "MiddleProximal",
            HandJoint::MiddleIntermediate => "MiddleIntermediate",
            HandJoint::MiddleDistal => "MiddleDistal",
            HandJoint::RingProximal => "RingProximal",
            HandJoint::RingIntermediate => "RingIntermediate",
            HandJoint::RingDistal => "RingDistal",
            HandJoint::LittleProximal => "LittleProximal",
            HandJoint::LittleIntermediate => "LittleIntermediate",
            HandJoint::LittleDistal => "LittleDistal",
        }
    }

    pub fn solver_name(&self, side: Side) -> String {
        format!("{}{}", side.as_str(), self.suffix())
    }

    /// Parses a side-prefixed solver name.
    pub fn parse_solver_name(name: &str) -> Option<(Side, HandJoint)> {
        let (side, rest) = if let Some(rest) = name.strip_prefix("Left") {
            (Side::Left, rest)
        } else if let Some(rest) = name.strip_prefix("Right") {
            (Side::Right, rest)
        } else {
            return None;
        };
        Self::ALL
            .iter()
            .find(|j| j.suffix() == rest)
            .map(|j| (side, *j))
    }
}

/// Humanoid rig bones the retargeter writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HumanBone {
    Head,
    Neck,
    LeftEye,
    RightEye,

    LeftHand,
    LeftThumbMetacarpal,
    LeftThumbProximal,
    LeftThumbDistal,
    LeftIndexProximal,
    LeftIndexIntermediate,
    LeftIndexDistal,
    LeftMiddleProximal,
    LeftMiddleIntermediate,
    LeftMiddleDistal,
    LeftRingProximal,
    LeftRingIntermediate,
    LeftRingDistal,
    LeftLittleProximal,
    LeftLittleIntermediate,
    LeftLittleDistal,

    RightHand,
    RightThumbMetacarpal,
    RightThumbProximal,
    RightThumbDistal,
    RightIndexProximal,
    RightIndexIntermediate,
    RightIndexDistal,
    RightMiddleProximal,
    RightMiddleIntermediate,
    RightMiddleDistal,
    RightRingProximal,
    RightRingIntermediate,
    RightRingDistal,
    RightLittleProximal,
    RightLittleIntermediate,
    RightLittleDistal,
}

impl HumanBone {
    pub const FACE: [HumanBone; 4] = [
        HumanBone::Head,
        HumanBone::Neck,
        HumanBone::LeftEye,
        HumanBone::RightEye,
    ];

    /// Canonical (VRM humanoid) bone name.
    pub fn name(&self) -> &'static str {
        use HumanBone::*;
        match self {
            Head => "head",
            Neck => "neck",
            LeftEye => "leftEye",
            RightEye => "rightEye",

            LeftHand => "leftHand",
            LeftThumbMetacarpal => "leftThumbMetacarpal",
            LeftThumbProximal => "leftThumbProximal",
            LeftThumbDistal => "leftThumbDistal",
            LeftIndexProximal => "leftIndexProximal",
            LeftIndexIntermediate => "leftIndexIntermediate",
            LeftIndexDistal => "leftIndexDistal",
            LeftMiddleProximal => "leftMiddleProximal",
            LeftMiddleIntermediate => "leftMiddleIntermediate",
            LeftMiddleDistal => "leftMiddleDistal",
            LeftRingProximal => "leftRingProximal",
            LeftRingIntermediate => "leftRingIntermediate",
            LeftRingDistal => "leftRingDistal",
            LeftLittleProximal => "leftLittleProximal",
            LeftLittleIntermediate => "leftLittleIntermediate",
            LeftLittleDistal => "leftLittleDistal",

            RightHand => "rightHand",
            RightThumbMetacarpal => "rightThumbMetacarpal",
            RightThumbProximal => "rightThumbProximal",
            RightThumbDistal => "rightThumbDistal",
            RightIndexProximal => "rightIndexProximal",
            RightIndexIntermediate => "rightIndexIntermediate",
            RightIndexDistal => "rightIndexDistal",
            RightMiddleProximal => "rightMiddleProximal",
            RightMiddleIntermediate => "rightMiddleIntermediate",
            RightMiddleDistal => "rightMiddleDistal",
            RightRingProximal => "rightRingProximal",
            RightRingIntermediate => "rightRingIntermediate",
            RightRingDistal => "rightRingDistal",
            RightLittleProximal => "rightLittleProximal",
            RightLittleIntermediate => "rightLittleIntermediate",
            RightLittleDistal => "rightLittleDistal",
        }
    }
}

impl fmt::Display for HumanBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
