//! Recorded perception sessions.
//!
//! A capture is a JSON-lines file. Each line is one [`PerceptionFrame`]
//! plus the estimates the solver produced for it at record time, so a replay
//! exercises the whole retargeting path without a camera or solver runtime.

use anyhow::{anyhow, Context, Result};
use api::{
    HandPoseEstimate, LandmarkPoint, LandmarkSource, PerceptionFrame, PoseSolver,
    RawPoseEstimate, Side, SolverOptions,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    #[serde(flatten)]
    pub frame: PerceptionFrame,
    #[serde(default)]
    pub face_estimate: Option<RawPoseEstimate>,
    #[serde(default)]
    pub hand_estimates: BTreeMap<Side, HandPoseEstimate>,
}

type CurrentEstimates = Arc<RwLock<Option<RecordedFrame>>>;

/// Opens a capture as a source plus the solver that answers from it.
pub fn open(path: impl Into<PathBuf>, looping: bool) -> (ReplaySource, RecordedSolver) {
    let current = CurrentEstimates::default();
    let source = ReplaySource {
        path: path.into(),
        looping,
        frames: Vec::new(),
        cursor: 0,
        time_offset: 0.0,
        current: current.clone(),
    };
    (source, RecordedSolver { current })
}

pub fn parse_capture(reader: impl BufRead) -> Result<Vec<RecordedFrame>> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read capture")?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RecordedFrame>(&line) {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!("Skipping malformed capture line {}: {}", i + 1, e),
        }
    }
    Ok(frames)
}

pub struct ReplaySource {
    path: PathBuf,
    looping: bool,
    frames: Vec<RecordedFrame>,
    cursor: usize,
    time_offset: f64,
    current: CurrentEstimates,
}

impl ReplaySource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkSource for ReplaySource {
    fn initialize(&mut self) -> Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open capture {:?}", self.path))?;
        self.frames = parse_capture(BufReader::new(file))?;
        if self.frames.is_empty() {
            return Err(anyhow!("Capture {:?} contains no frames", self.path));
        }
        self.cursor = 0;
        self.time_offset = 0.0;
        info!("Loaded {} frames from {:?}", self.frames.len(), self.path);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<PerceptionFrame>> {
        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Ok(None);
            }
            // keep timestamps increasing across loops
            let last = self.frames[self.frames.len() - 1].frame.timestamp;
            self.time_offset += last - self.frames[0].frame.timestamp + 1.0 / 30.0;
            self.cursor = 0;
        }

        let mut recorded = self.frames[self.cursor].clone();
        self.cursor += 1;
        recorded.frame.timestamp += self.time_offset;

        let frame = recorded.frame.clone();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(recorded);
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.frames.clear();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Answers solve requests with the estimates recorded for the frame the
/// paired [`ReplaySource`] returned last. Landmarks are ignored.
pub struct RecordedSolver {
    current: CurrentEstimates,
}

impl PoseSolver for RecordedSolver {
    fn solve_face(
        &mut self,
        _landmarks: &[LandmarkPoint],
        _options: &SolverOptions,
    ) -> Result<RawPoseEstimate> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        current
            .as_ref()
            .and_then(|f| f.face_estimate)
            .ok_or_else(|| anyhow!("No face estimate recorded for this frame"))
    }

    fn solve_hand(&mut self, _landmarks: &[LandmarkPoint], side: Side) -> Result<HandPoseEstimate> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        current
            .as_ref()
            .and_then(|f| f.hand_estimates.get(&side).cloned())
            .ok_or_else(|| anyhow!("No {} hand estimate recorded for this frame", side))
    }
}
