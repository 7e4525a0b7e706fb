use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::renderer::OverlayStyle;
use crate::shared::constants::{DEFAULT_ALPHA, DEFAULT_VIS_THRESHOLD};

/// How each frame is annotated.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub vis_thr: f32,
    pub alpha: f64,
    pub style: OverlayStyle,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            vis_thr: DEFAULT_VIS_THRESHOLD,
            alpha: DEFAULT_ALPHA,
            style: OverlayStyle::default(),
        }
    }
}

/// Fully resolved settings for one run: output paths already defaulted.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub input: PathBuf,
    pub out_video: PathBuf,
    pub out_csv: PathBuf,
    pub model_dir: PathBuf,
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    pub smooth: bool,
    pub summary: Option<PathBuf>,
    #[serde(skip)]
    pub render: RenderSettings,
}

impl RunConfig {
    /// Reject values that would make the run meaningless before anything is opened.
    pub fn validate(&self) -> Result<()> {
        if self.model_complexity > 2 {
            bail!("--model_complexity must be 0, 1 or 2 (got {})", self.model_complexity);
        }
        if !self.render.vis_thr.is_finite() {
            bail!("--vis_thr must be a finite number");
        }
        if !self.render.alpha.is_finite() || self.render.alpha < 0.0 {
            bail!("--alpha must be a non-negative number (got {})", self.render.alpha);
        }
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            bail!(
                "--min_detection_confidence must be within 0..1 (got {})",
                self.min_detection_confidence
            );
        }
        if !(0.0..=1.0).contains(&self.min_tracking_confidence) {
            bail!(
                "--min_tracking_confidence must be within 0..1 (got {})",
                self.min_tracking_confidence
            );
        }
        if self.render.style.thickness < 1 {
            bail!("--thickness must be at least 1");
        }
        if self.render.style.radius < 0 {
            bail!("--radius must not be negative");
        }
        Ok(())
    }
}
