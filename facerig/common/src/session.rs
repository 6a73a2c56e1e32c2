use crate::baseline_store::BaselineStore;
use crate::bone_map::RigApplier;
use crate::calibration::{CalibrationEvent, NeutralPoseCalibrator};
use crate::config::{ConfigPatch, RigConfig};
use crate::error::RigError;
use crate::normalization::{normalize, NeutralGains};
use crate::retarget::RetargetingAdapter;
use crate::{LandmarkSource, PerceptionFrame, PoseSolver, SkeletalRig};
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use std::time::Instant;

/// What one call to [`RetargetSession::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tracking is stopped; the frame was discarded.
    Stopped,
    /// Same video timestamp as the previous frame.
    Skipped,
    /// No rig loaded.
    NoRig,
    Applied { face: bool, hands: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub solver_failures: u64,
    pub last_processing_ms: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CalibrationStatus {
    pub is_calibrated: bool,
    pub is_collecting: bool,
    pub frames_collected: u32,
    pub target_frames: u32,
    pub progress: f32,
}

/// Per-frame driver. Owns every piece of mutable pipeline state; a tick runs
/// to completion before the next one starts.
pub struct RetargetSession {
    config: RigConfig,
    adapter: RetargetingAdapter,
    calibrator: NeutralPoseCalibrator,
    applier: RigApplier,
    rig: Option<Box<dyn SkeletalRig>>,
    baseline_store: Option<BaselineStore>,
    last_timestamp: Option<f64>,
    running: bool,
    stats: SessionStats,
}

impl RetargetSession {
    pub fn new(config: RigConfig) -> Self {
        let mut calibrator = NeutralPoseCalibrator::new(config.calibration.target_frames);

        let baseline_store = if config.calibration.persist {
            let store = BaselineStore::new(config.calibration.path.clone());
            match store.load() {
                Ok(Some(baseline)) => calibrator.restore(baseline),
                Ok(None) => {}
                Err(e) => warn!("Ignoring saved baseline: {:#}", e),
            }
            Some(store)
        } else {
            None
        };

        Self {
            adapter: RetargetingAdapter::new(&config),
            calibrator,
            applier: RigApplier::new(),
            rig: None,
            baseline_store,
            last_timestamp: None,
            running: false,
            stats: SessionStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn calibrator(&self) -> &NeutralPoseCalibrator {
        &self.calibrator
    }

    pub fn applier(&self) -> &RigApplier {
        &self.applier
    }

    pub fn calibration_status(&self) -> CalibrationStatus {
        let c = &self.calibrator;
        CalibrationStatus {
            is_calibrated: c.is_calibrated(),
            is_collecting: c.is_collecting(),
            frames_collected: c.frames_collected(),
            target_frames: c.target_frames(),
            progress: c.progress(),
        }
    }

    /// Initializes the perception backend and begins accepting frames.
    /// Initialization failures are not retried.
    pub fn start(&mut self, source: &mut dyn LandmarkSource) -> Result<(), RigError> {
        source
            .initialize()
            .map_err(|e| RigError::Initialization(format!("{:#}", e)))?;
        self.running = true;
        self.last_timestamp = None;
        self.stats = SessionStats::default();
        info!("Tracking started");
        Ok(())
    }

    /// Frames arriving after this are discarded without touching the rig.
    pub fn stop(&mut self) {
        if self.running {
            info!(
                "Tracking stopped after {} frames",
                self.stats.frames_processed
            );
        }
        self.running = false;
    }

    pub fn load_rig(&mut self, rig: Box<dyn SkeletalRig>) {
        self.applier.on_rig_loaded();
        self.rig = Some(rig);
        info!("Rig loaded, bone cache cleared");
    }

    pub fn unload_rig(&mut self) -> Option<Box<dyn SkeletalRig>> {
        self.applier.on_rig_loaded();
        self.rig.take()
    }

    pub fn rig(&self) -> Option<&dyn SkeletalRig> {
        self.rig.as_deref()
    }

    /// Drops the neutral baseline and face filter history; collection
    /// restarts with the next detected face.
    pub fn recalibrate(&mut self) {
        self.calibrator.reset();
        self.adapter.reset_face();
        info!("Recalibration requested");
    }

    pub fn apply_patch(&mut self, patch: &ConfigPatch) {
        if patch.is_empty() {
            return;
        }
        self.config.apply_patch(patch);
        self.adapter.configure(&self.config);
        debug!("Configuration patched: {:?}", patch);
    }

    pub fn set_config(&mut self, config: RigConfig) {
        self.calibrator
            .set_target_frames(config.calibration.target_frames);
        self.config = config;
        self.adapter.configure(&self.config);
    }

    pub fn tick(
        &mut self,
        frame: &PerceptionFrame,
        solver: &mut dyn PoseSolver,
        dt: f32,
    ) -> TickOutcome {
        if !self.running {
            return TickOutcome::Stopped;
        }
        if self.last_timestamp == Some(frame.timestamp) {
            self.stats.frames_skipped += 1;
            return TickOutcome::Skipped;
        }
        self.last_timestamp = Some(frame.timestamp);

        let Some(rig) = self.rig.as_deref_mut() else {
            trace!("{}", RigError::RigUnavailable);
            return TickOutcome::NoRig;
        };
        let started = Instant::now();

        let mut retargeted = None;
        if let Some(face) = frame.face.as_ref().filter(|f| !f.landmarks.is_empty()) {
            retargeted = self.adapter.process_landmarks(
                &face.landmarks,
                face.blendshapes.as_ref(),
                &mut *solver,
            );
            if retargeted.is_none() {
                self.stats.solver_failures += 1;
            }
        }

        // the frame that completes calibration is animated against the prior baseline
        let baseline = self.calibrator.baseline().copied();
        match self.calibrator.observe(retargeted.as_ref().map(|r| &r.pose)) {
            CalibrationEvent::Completed => {
                if let (Some(store), Some(baseline)) =
                    (&self.baseline_store, self.calibrator.baseline())
                {
                    if let Err(e) = store.save(baseline) {
                        error!("Failed to save neutral baseline: {:#}", e);
                    }
                }
            }
            CalibrationEvent::Progress {
                frames_collected,
                target_frames,
            } => debug!("Calibrating: {}/{}", frames_collected, target_frames),
            CalibrationEvent::Unchanged => {}
        }

        let animation = &self.config.animation;
        let face_applied = match &retargeted {
            Some(r) => {
                let gains = NeutralGains::from(&self.config.calibration);
                let pose = normalize(&r.pose, baseline.as_ref(), gains);
                self.applier
                    .apply_face(rig, &pose, r.blendshapes.as_ref(), animation);
                true
            }
            None => false,
        };

        let mut hands = 0;
        for hand in frame.hands.iter().filter(|h| !h.landmarks.is_empty()) {
            match solver.solve_hand(&hand.landmarks, hand.side) {
                Ok(raw) => {
                    let smoothed = self.adapter.smooth_hand(hand.side, &raw);
                    self.applier.apply_hand(rig, hand.side, &smoothed, animation);
                    hands += 1;
                }
                Err(e) => {
                    error!("{} ({} hand)", RigError::Solver(format!("{:#}", e)), hand.side);
                    self.stats.solver_failures += 1;
                }
            }
        }

        rig.update(dt);

        self.stats.frames_processed += 1;
        self.stats.last_processing_ms = started.elapsed().as_secs_f32() * 1000.0;

        TickOutcome::Applied {
            face: face_applied,
            hands,
        }
    }
}
