use anyhow::Result;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};

/// Per-frame pixel work around the skeleton overlay.
pub struct FrameProcessor {
    alpha: f64,
}

impl FrameProcessor {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// The estimator wants RGB; capture hands out BGR.
    pub fn to_rgb(&self, bgr: &Mat) -> Result<Mat> {
        let mut rgb = Mat::default();
        imgproc::cvt_color_def(bgr, &mut rgb, imgproc::COLOR_BGR2RGB)?;
        Ok(rgb)
    }

    pub fn dims_frame(&self) -> bool {
        self.alpha < 1.0
    }

    /// Scale every channel by `alpha` so the overlay stands out, truncating
    /// toward zero. A no-op unless `alpha < 1.0`.
    pub fn dim(&self, frame: &mut Mat) -> Result<()> {
        if !self.dims_frame() {
            return Ok(());
        }
        let table = dim_table(self.alpha);
        let lut = Mat::from_slice(&table[..])?.try_clone()?;
        let mut dimmed = Mat::default();
        core::lut(&*frame, &lut, &mut dimmed)?;
        *frame = dimmed;
        Ok(())
    }
}

/// `floor(level * alpha)` for every 8-bit level.
fn dim_table(alpha: f64) -> [u8; 256] {
    let mut table = [0u8; 256];
    for (level, out) in table.iter_mut().enumerate() {
        *out = (level as f64 * alpha) as u8;
    }
    table
}
