use anyhow::{anyhow, bail, Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::VideoWriter,
};
use std::path::Path;

use crate::decoder::VideoMeta;
use crate::shared::constants::OUTPUT_FOURCC;

/// MP4 writer for the annotated frames. Size and rate follow the source.
pub struct VideoSink {
    writer: VideoWriter,
    frames_written: u64,
}

impl VideoSink {
    pub fn create(path: &Path, meta: &VideoMeta) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Output path is not valid UTF-8: {}", path.display()))?;
        let [c1, c2, c3, c4] = OUTPUT_FOURCC;
        let fourcc = VideoWriter::fourcc(c1, c2, c3, c4)?;

        let writer = VideoWriter::new(
            path_str,
            fourcc,
            meta.fps,
            Size::new(meta.width, meta.height),
            true,
        )
        .with_context(|| format!("Could not create output video: {}", path.display()))?;

        if !writer.is_opened()? {
            bail!("Could not create output video: {}", path.display());
        }

        crate::utils::logger::info(&format!(
            "Writing {} ({}x{} @ {:.3} fps)",
            path.display(),
            meta.width,
            meta.height,
            meta.fps
        ));

        Ok(Self { writer, frames_written: 0 })
    }

    pub fn write(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn release(&mut self) -> Result<()> {
        self.writer.release()?;
        Ok(())
    }
}
