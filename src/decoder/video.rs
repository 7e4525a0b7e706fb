use anyhow::{anyhow, bail, Context, Result};
use opencv::{core::Mat, prelude::*, videoio};
use serde::Serialize;
use std::path::Path;

use crate::shared::constants::{DEFAULT_FPS, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Stream properties as reported by the container, with defaults filled in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoMeta {
    pub fps: f64,
    pub width: i32,
    pub height: i32,
    /// 0 when the container does not say.
    pub frame_count: u64,
}

impl VideoMeta {
    /// Apply the fallbacks for properties the backend reports as 0 (or garbage).
    pub fn from_reported(fps: f64, width: f64, height: f64, frame_count: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { DEFAULT_FPS };
        let width = if width.is_finite() && width >= 1.0 { width as i32 } else { DEFAULT_WIDTH };
        let height = if height.is_finite() && height >= 1.0 { height as i32 } else { DEFAULT_HEIGHT };
        let frame_count = if frame_count.is_finite() && frame_count > 0.0 {
            frame_count as u64
        } else {
            0
        };
        Self { fps, width, height, frame_count }
    }

    /// Seconds since the start of the stream for a zero-based frame index.
    pub fn timestamp(&self, frame_idx: u64) -> f64 {
        frame_idx as f64 / self.fps
    }
}

/// Sequential BGR frame reader over an OpenCV capture.
pub struct VideoSource {
    capture: videoio::VideoCapture,
    meta: VideoMeta,
}

impl VideoSource {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Video path is not valid UTF-8: {}", path.display()))?;

        crate::utils::logger::debug(&format!("Opening video with OpenCV: {}", path_str));

        // CAP_ANY lets OpenCV pick the backend (FFmpeg, GStreamer, AVFoundation, MSMF)
        let capture = videoio::VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .with_context(|| format!("Could not open video: {}", path.display()))?;

        if !capture.is_opened()? {
            let err_msg = format!("Could not open video: {}", path.display());
            crate::utils::logger::error(&err_msg);
            bail!(err_msg);
        }

        let meta = VideoMeta::from_reported(
            capture.get(videoio::CAP_PROP_FPS)?,
            capture.get(videoio::CAP_PROP_FRAME_WIDTH)?,
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT)?,
            capture.get(videoio::CAP_PROP_FRAME_COUNT)?,
        );

        crate::utils::logger::info(&format!(
            "Opened {}: {}x{} @ {:.3} fps, {} frames reported",
            path.display(),
            meta.width,
            meta.height,
            meta.fps,
            meta.frame_count
        ));

        Ok(Self { capture, meta })
    }

    pub fn meta(&self) -> VideoMeta {
        self.meta
    }

    /// Next frame in decode order, `None` at end of stream.
    pub fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    pub fn release(&mut self) -> Result<()> {
        self.capture.release()?;
        Ok(())
    }
}
