mod core;
mod decoder;
mod encoder;
mod export;
mod pose;
mod renderer;
mod shared;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::core::{RenderSettings, RunConfig};
use crate::renderer::OverlayStyle;
use crate::shared::constants;
use crate::utils::file_utils;

/// Overlay body pose on a video and export per-frame landmarks to CSV
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input video
    #[arg(long)]
    input: PathBuf,
    /// Annotated MP4 output (default: <input>_pose.mp4)
    #[arg(long = "out_video")]
    out_video: Option<PathBuf>,
    /// Landmark CSV output (default: <input>_pose.csv)
    #[arg(long = "out_csv")]
    out_csv: Option<PathBuf>,
    /// Pose model size: 0 lite, 1 full, 2 heavy
    #[arg(long = "model_complexity", default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=2))]
    model_complexity: u8,
    /// Visibility needed to draw a landmark or bone
    #[arg(long = "vis_thr", default_value_t = constants::DEFAULT_VIS_THRESHOLD)]
    vis_thr: f32,
    /// Brightness multiplier applied before drawing (1 = unchanged)
    #[arg(long, default_value_t = constants::DEFAULT_ALPHA)]
    alpha: f64,
    /// Directory holding pose_detection.onnx and pose_landmark_{lite,full,heavy}.onnx
    #[arg(long = "model_dir", default_value = constants::DEFAULT_MODEL_DIR)]
    model_dir: PathBuf,
    /// Detector score needed to start tracking a person
    #[arg(long = "min_detection_confidence", default_value_t = constants::DEFAULT_MIN_DETECTION_CONFIDENCE)]
    min_detection_confidence: f32,
    /// Presence score below which tracking is dropped and the frame counts as "no person"
    #[arg(long = "min_tracking_confidence", default_value_t = constants::DEFAULT_MIN_TRACKING_CONFIDENCE)]
    min_tracking_confidence: f32,
    /// Disable temporal landmark smoothing
    #[arg(long = "no_smooth", default_value_t = false)]
    no_smooth: bool,
    /// Bone line thickness in pixels
    #[arg(long, default_value_t = constants::DEFAULT_THICKNESS)]
    thickness: i32,
    /// Landmark dot radius in pixels
    #[arg(long, default_value_t = constants::DEFAULT_RADIUS)]
    radius: i32,
    /// Write a JSON run summary here
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        let out_video = self
            .out_video
            .unwrap_or_else(|| file_utils::default_video_output(&self.input));
        let out_csv = self
            .out_csv
            .unwrap_or_else(|| file_utils::default_csv_output(&self.input));

        RunConfig {
            input: self.input,
            out_video,
            out_csv,
            model_dir: self.model_dir,
            model_complexity: self.model_complexity,
            min_detection_confidence: self.min_detection_confidence,
            min_tracking_confidence: self.min_tracking_confidence,
            smooth: !self.no_smooth,
            summary: self.summary,
            render: RenderSettings {
                vis_thr: self.vis_thr,
                alpha: self.alpha,
                style: OverlayStyle {
                    thickness: self.thickness,
                    radius: self.radius,
                    ..OverlayStyle::default()
                },
            },
        }
    }
}

fn main() -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_default();
    crate::utils::logger::init(&cwd);

    let config = Cli::parse().into_config();
    crate::utils::logger::info(&format!("Input: {}", config.input.display()));

    let summary = match crate::core::run(&config) {
        Ok(summary) => summary,
        Err(e) => {
            crate::utils::logger::error(&format!("{:#}", e));
            return Err(e);
        }
    };

    if let Some(path) = &config.summary {
        file_utils::ensure_parent_dir(path)?;
        summary.write_to(path)?;
    }

    println!("[OK] Pose video: {}", config.out_video.display());
    println!("[OK] Landmark CSV: {}", config.out_csv.display());

    Ok(())
}
