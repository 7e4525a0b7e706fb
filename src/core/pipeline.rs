use anyhow::{bail, Result};
use opencv::core::Mat;
use std::io::Write;

use super::config::{RenderSettings, RunConfig};
use super::progress::Progress;
use super::summary::{detection_rate, RunSummary};
use crate::decoder::{FrameRecord, VideoMeta, VideoSource};
use crate::encoder::VideoSink;
use crate::export::LandmarkTable;
use crate::pose::{BlazePoseEstimator, LandmarkSmoother, PoseEstimator};
use crate::renderer::{draw_pose, FrameProcessor};
use crate::utils::file_utils;
use crate::utils::logger;
use crate::utils::time_utils::Timer;

/// Where BGR frames come from, in order.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Mat>>;
}

/// Where annotated frames go.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()>;
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> Result<Option<Mat>> {
        self.read_frame()
    }
}

impl FrameSink for VideoSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        self.write(frame)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub detected: u64,
}

/// Run every frame of `source` through estimate → dim → export → draw → write.
///
/// Estimator errors are logged and the frame is exported as "no person"; any
/// other error ends the loop.
pub fn process_frames<S, K, E, W>(
    source: &mut S,
    sink: &mut K,
    estimator: &mut E,
    table: &mut LandmarkTable<W>,
    meta: &VideoMeta,
    settings: &RenderSettings,
    progress: &mut Progress,
) -> Result<FrameStats>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
    E: PoseEstimator + ?Sized,
    W: Write,
{
    let processor = FrameProcessor::new(settings.alpha);
    let mut stats = FrameStats::default();

    while let Some(mut frame) = source.next_frame()? {
        let frame_idx = stats.frames;

        let rgb = processor.to_rgb(&frame)?;
        let landmarks = match estimator.estimate(&rgb) {
            Ok(found) => found,
            Err(e) => {
                logger::warn(&format!("Pose estimation failed on frame {}: {:#}", frame_idx, e));
                estimator.reset();
                None
            }
        };

        processor.dim(&mut frame)?;

        let record = FrameRecord::new(frame_idx, meta.timestamp(frame_idx), landmarks);
        table.write(&record)?;
        if record.detected() {
            stats.detected += 1;
        }

        draw_pose(&mut frame, record.landmarks.as_slice(), settings.vis_thr, &settings.style)?;
        sink.write_frame(&frame)?;

        stats.frames += 1;
        progress.tick();
    }

    Ok(stats)
}

/// Process `config.input` end to end and return what was produced.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;

    if !config.input.exists() {
        bail!("Input file does not exist: {}", config.input.display());
    }

    file_utils::ensure_parent_dir(&config.out_video)?;
    file_utils::ensure_parent_dir(&config.out_csv)?;

    let mut source = VideoSource::open(&config.input)?;
    let meta = source.meta();

    let mut sink = VideoSink::create(&config.out_video, &meta)?;

    let smoother = config.smooth.then(|| LandmarkSmoother::new(meta.fps));
    let mut estimator = BlazePoseEstimator::load(
        &config.model_dir,
        config.model_complexity,
        config.min_detection_confidence,
        config.min_tracking_confidence,
        smoother,
    )?;

    let mut table = LandmarkTable::create(&config.out_csv)?;
    let mut progress = Progress::new(meta.frame_count);
    let timer = Timer::new();

    logger::debug(&format!(
        "Run config: {}",
        serde_json::to_string(config).unwrap_or_default()
    ));

    let stats = process_frames(
        &mut source,
        &mut sink,
        &mut estimator,
        &mut table,
        &meta,
        &config.render,
        &mut progress,
    )?;
    progress.finish();
    logger::debug(&format!("Progress counted {} frames", progress.done()));

    table.flush()?;
    drop(estimator);
    source.release()?;
    sink.release()?;

    let elapsed = timer.elapsed().as_secs_f64();
    logger::info(&format!(
        "Done: {} frames ({} with pose), {} video frames and {} CSV rows written in {:.2}s",
        stats.frames,
        stats.detected,
        sink.frames_written(),
        table.rows(),
        elapsed
    ));

    Ok(RunSummary {
        input: config.input.clone(),
        out_video: config.out_video.clone(),
        out_csv: config.out_csv.clone(),
        model_complexity: config.model_complexity,
        source: meta,
        frames_processed: stats.frames,
        frames_with_pose: stats.detected,
        detection_rate: detection_rate(stats.detected, stats.frames),
        elapsed_sec: elapsed,
        processing_fps: timer.rate(stats.frames),
    })
}
