use crate::retarget::FacePose;
use anyhow::{Context, Result};
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Keeps a calibrated neutral pose on disk so a restart can skip collection.
pub struct BaselineStore {
    path: PathBuf,
}

impl BaselineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, baseline: &FacePose) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create baseline dir: {:?}", parent))?;
            }
        }
        let file = File::create(&self.path).context("Failed to create baseline file")?;
        serde_json::to_writer_pretty(file, &baseline.sanitized())
            .context("Failed to serialize neutral baseline")?;
        info!("Saved neutral baseline to {:?}", self.path);
        Ok(())
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<FacePose>> {
        if !self.path.exists() {
            info!("No neutral baseline found at {:?}, calibrating live", self.path);
            return Ok(None);
        }

        let file = File::open(&self.path).context("Failed to open baseline file")?;
        let baseline: FacePose = serde_json::from_reader(BufReader::new(file))
            .context("Failed to deserialize neutral baseline")?;
        info!("Loaded neutral baseline from {:?}", self.path);
        Ok(Some(baseline.sanitized()))
    }
}
