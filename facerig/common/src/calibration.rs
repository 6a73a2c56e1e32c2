use crate::retarget::FacePose;
use log::{debug, info};

pub const DEFAULT_TARGET_FRAMES: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationState {
    Idle,
    Collecting { frames_collected: u32 },
    Calibrated { baseline: FacePose },
}

/// What a single observed frame did to the calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationEvent {
    /// Not collecting, or no face this frame.
    Unchanged,
    Progress { frames_collected: u32, target_frames: u32 },
    Completed,
}

/// Learns the user's neutral expression from the first `target_frames`
/// frames with a detected face.
#[derive(Debug, Clone)]
pub struct NeutralPoseCalibrator {
    state: CalibrationState,
    target_frames: u32,
}

impl NeutralPoseCalibrator {
    pub fn new(target_frames: u32) -> Self {
        Self {
            state: CalibrationState::Idle,
            target_frames: target_frames.max(1),
        }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn target_frames(&self) -> u32 {
        self.target_frames
    }

    /// Takes effect at the next reset.
    pub fn set_target_frames(&mut self, target_frames: u32) {
        self.target_frames = target_frames.max(1);
    }

    pub fn frames_collected(&self) -> u32 {
        match self.state {
            CalibrationState::Idle => 0,
            CalibrationState::Collecting { frames_collected } => frames_collected,
            CalibrationState::Calibrated { .. } => self.target_frames,
        }
    }

    pub fn progress(&self) -> f32 {
        self.frames_collected() as f32 / self.target_frames as f32
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated { .. })
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.state, CalibrationState::Collecting { .. })
    }

    pub fn baseline(&self) -> Option<&FacePose> {
        match &self.state {
            CalibrationState::Calibrated { baseline } => Some(baseline),
            _ => None,
        }
    }

    /// Feeds one frame. `None` means no face was detected; the counter does
    /// not advance.
    pub fn observe(&mut self, pose: Option<&FacePose>) -> CalibrationEvent {
        let Some(pose) = pose else {
            return CalibrationEvent::Unchanged;
        };

        let collected = match self.state {
            CalibrationState::Calibrated { .. } => return CalibrationEvent::Unchanged,
            CalibrationState::Idle => {
                debug!("Face detected, collecting neutral pose");
                1
            }
            CalibrationState::Collecting { frames_collected } => frames_collected + 1,
        };

        if collected >= self.target_frames {
            self.state = CalibrationState::Calibrated { baseline: *pose };
            info!("Neutral pose calibrated after {} frames", self.target_frames);
            CalibrationEvent::Completed
        } else {
            self.state = CalibrationState::Collecting {
                frames_collected: collected,
            };
            CalibrationEvent::Progress {
                frames_collected: collected,
                target_frames: self.target_frames,
            }
        }
    }

    /// Installs a previously saved baseline.
    pub fn restore(&mut self, baseline: FacePose) {
        self.state = CalibrationState::Calibrated { baseline };
    }

    pub fn reset(&mut self) {
        self.state = CalibrationState::Idle;
    }
}

impl Default for NeutralPoseCalibrator {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_FRAMES)
    }
}
