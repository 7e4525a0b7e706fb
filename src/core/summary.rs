use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::decoder::VideoMeta;

/// What a finished run produced, written as JSON when `--summary` is given.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub out_video: PathBuf,
    pub out_csv: PathBuf,
    pub model_complexity: u8,
    pub source: VideoMeta,
    pub frames_processed: u64,
    pub frames_with_pose: u64,
    pub detection_rate: f64,
    pub elapsed_sec: f64,
    pub processing_fps: f64,
}

impl RunSummary {
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write summary: {}", path.display()))
    }
}

pub fn detection_rate(detected: u64, frames: u64) -> f64 {
    if frames == 0 {
        0.0
    } else {
        detected as f64 / frames as f64
    }
}
