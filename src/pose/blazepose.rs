use anyhow::{anyhow, bail, Result};
use opencv::{core::Mat, dnn, prelude::*};
use std::path::Path;

use super::detector::PoseDetector;
use super::roi::Roi;
use super::{sigmoid, tensor, Landmark, LandmarkSet, LandmarkSmoother, PoseEstimator};
use crate::shared::constants::{
    MODEL_FILES, MODEL_INPUT_SIZE, MODEL_LANDMARKS, MODEL_VALUES_PER_LANDMARK, NUM_LANDMARKS,
};

/// Auxiliary network landmarks that align the next crop: mid-hip, then a
/// point on the circle enclosing the body.
const ALIGN_CENTER: usize = 33;
const ALIGN_EDGE: usize = 34;

pub fn model_file(complexity: u8) -> Result<&'static str> {
    MODEL_FILES
        .get(complexity as usize)
        .copied()
        .ok_or_else(|| anyhow!("model complexity must be 0, 1 or 2 (got {})", complexity))
}

/// The landmark network's tensors that matter, picked out by size.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkOutputs {
    /// `MODEL_LANDMARKS` groups of (x, y, z, visibility, presence).
    pub landmarks: Vec<f32>,
    /// Probability that a person is inside the crop.
    pub presence: f32,
}

impl LandmarkOutputs {
    /// 195 landmark values and one presence probability. Segmentation,
    /// heatmap and world-landmark tensors are ignored.
    pub fn from_tensors(tensors: Vec<Vec<f32>>) -> Result<Self> {
        let mut landmarks = None;
        let mut presence = None;
        for t in tensors {
            match t.len() {
                n if n == MODEL_LANDMARKS * MODEL_VALUES_PER_LANDMARK => landmarks = Some(t),
                1 => presence = Some(t[0]),
                _ => {}
            }
        }
        Ok(Self {
            landmarks: landmarks.ok_or_else(|| anyhow!("Pose model produced no landmark tensor"))?,
            presence: presence.ok_or_else(|| anyhow!("Pose model produced no presence score"))?,
        })
    }
}

/// BlazePose two-stage tracker run through OpenCV's dnn module.
///
/// While nothing is tracked the person detector proposes a rotated crop.
/// After that the crop for frame N+1 comes from the auxiliary landmarks of
/// frame N, until the presence score drops.
pub struct BlazePoseEstimator {
    net: dnn::Net,
    detector: PoseDetector,
    min_tracking_confidence: f32,
    roi: Option<Roi>,
    smoother: Option<LandmarkSmoother>,
}

impl BlazePoseEstimator {
    pub fn load(
        model_dir: &Path,
        complexity: u8,
        min_detection_confidence: f32,
        min_tracking_confidence: f32,
        smoother: Option<LandmarkSmoother>,
    ) -> Result<Self> {
        let net = tensor::load_onnx(model_dir, model_file(complexity)?, "Pose model")?;
        let detector = PoseDetector::load(model_dir, min_detection_confidence)?;

        crate::utils::logger::info(&format!("Pose model complexity {}", complexity));

        Ok(Self {
            net,
            detector,
            min_tracking_confidence,
            roi: None,
            smoother,
        })
    }
}

fn checked_landmarks(raw: &[f32]) -> Result<()> {
    let expected = MODEL_LANDMARKS * MODEL_VALUES_PER_LANDMARK;
    if raw.len() < expected {
        bail!("Landmark tensor has {} values, expected {}", raw.len(), expected);
    }
    Ok(())
}

fn crop_point(raw: &[f32], i: usize, roi: &Roi) -> (f32, f32) {
    let v = &raw[i * MODEL_VALUES_PER_LANDMARK..];
    roi.to_frame(v[0], v[1], MODEL_INPUT_SIZE)
}

/// Convert the network's raw landmark tensor into frame-normalized landmarks.
///
/// `raw` is in crop-pixel units with logit visibilities. Only the 33 body
/// points are kept.
pub fn decode_landmarks(raw: &[f32], roi: &Roi, frame_w: u32, frame_h: u32) -> Result<LandmarkSet> {
    checked_landmarks(raw)?;

    let (fw, fh) = (frame_w as f32, frame_h as f32);
    let crop_scale = roi.side / MODEL_INPUT_SIZE as f32;
    let mut set = LandmarkSet::missing();
    for (i, lm) in set.0.iter_mut().enumerate().take(NUM_LANDMARKS) {
        let v = &raw[i * MODEL_VALUES_PER_LANDMARK..(i + 1) * MODEL_VALUES_PER_LANDMARK];
        let (px, py) = crop_point(raw, i, roi);
        *lm = Landmark {
            x: px / fw,
            y: py / fh,
            z: v[2] * crop_scale / fw,
            visibility: sigmoid(v[3]),
        };
    }
    Ok(set)
}

/// Crop for the next frame, from this frame's auxiliary alignment points.
pub fn tracking_roi(raw: &[f32], roi: &Roi) -> Result<Option<Roi>> {
    checked_landmarks(raw)?;
    Ok(Roi::from_alignment(
        crop_point(raw, ALIGN_CENTER, roi),
        crop_point(raw, ALIGN_EDGE, roi),
    ))
}

impl PoseEstimator for BlazePoseEstimator {
    fn estimate(&mut self, rgb: &Mat) -> Result<Option<LandmarkSet>> {
        let (frame_w, frame_h) = (rgb.cols() as u32, rgb.rows() as u32);
        if frame_w == 0 || frame_h == 0 {
            bail!("Empty frame");
        }

        let roi = match self.roi {
            Some(roi) => roi,
            None => match self.detector.detect(rgb)?.and_then(|p| p.roi()) {
                Some(roi) => roi,
                None => {
                    self.reset();
                    return Ok(None);
                }
            },
        };

        let blob = tensor::rotated_crop_blob(rgb, &roi, MODEL_INPUT_SIZE)?;
        let outputs = LandmarkOutputs::from_tensors(tensor::forward(&mut self.net, &blob)?)?;
        if outputs.presence < self.min_tracking_confidence {
            self.reset();
            return Ok(None);
        }

        let mut set = decode_landmarks(&outputs.landmarks, &roi, frame_w, frame_h)?;
        if let Some(smoother) = self.smoother.as_mut() {
            set = smoother.apply(&set);
        }
        self.roi = tracking_roi(&outputs.landmarks, &roi)?;

        Ok(Some(set))
    }

    fn reset(&mut self) {
        self.roi = None;
        if let Some(smoother) = self.smoother.as_mut() {
            smoother.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn centered_roi(rotation: f32) -> Roi {
        Roi {
            center_x: 320.0,
            center_y: 180.0,
            side: 256.0,
            rotation,
        }
    }

    fn raw_with(points: &[(usize, [f32; 4])]) -> Vec<f32> {
        let mut raw = vec![0.0f32; MODEL_LANDMARKS * MODEL_VALUES_PER_LANDMARK];
        for &(i, values) in points {
            raw[i * MODEL_VALUES_PER_LANDMARK..i * MODEL_VALUES_PER_LANDMARK + 4]
                .copy_from_slice(&values);
        }
        raw
    }

    #[test]
    fn test_model_file_per_complexity() {
        assert_eq!(model_file(0).unwrap(), "pose_landmark_lite.onnx");
        assert_eq!(model_file(2).unwrap(), "pose_landmark_heavy.onnx");
        assert!(model_file(3).is_err());
    }

    #[test]
    fn test_load_missing_model_fails() {
        let dir = std::env::temp_dir().join("posecast-no-models-here");
        let err = BlazePoseEstimator::load(&dir, 1, 0.5, 0.5, None).err().unwrap();
        assert!(err.to_string().contains("Pose model not found"));
        assert!(err.to_string().contains("pose_landmark_full.onnx"));
    }

    #[test]
    fn test_decode_maps_back_to_frame() {
        // landmark 0 at the crop center, confidently visible
        let raw = raw_with(&[(0, [128.0, 128.0, 64.0, 10.0])]);

        let set = decode_landmarks(&raw, &centered_roi(0.0), 640, 360).unwrap();
        let lm = set.0[0];
        assert!((lm.x - 0.5).abs() < 1e-4);
        assert!((lm.y - 0.5).abs() < 1e-4);
        assert!((lm.z - 0.1).abs() < 1e-4);
        assert!(lm.visibility > 0.99);
        // zero logit
        assert!((set.0[1].visibility - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_undoes_crop_rotation() {
        // top-center of a crop turned a quarter clockwise lies right of center
        let raw = raw_with(&[(0, [128.0, 0.0, 0.0, 0.0])]);
        let set = decode_landmarks(&raw, &centered_roi(FRAC_PI_2), 640, 360).unwrap();
        assert!((set.0[0].x - 448.0 / 640.0).abs() < 1e-4);
        assert!((set.0[0].y - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_decode_rejects_short_tensor() {
        assert!(decode_landmarks(&[0.0; 10], &centered_roi(0.0), 64, 64).is_err());
        assert!(tracking_roi(&[0.0; 10], &centered_roi(0.0)).is_err());
    }

    #[test]
    fn test_tracking_roi_follows_alignment_points() {
        let raw = raw_with(&[
            (ALIGN_CENTER, [128.0, 128.0, 0.0, 0.0]),
            (ALIGN_EDGE, [128.0, 64.0, 0.0, 0.0]),
        ]);
        let next = tracking_roi(&raw, &centered_roi(0.0)).unwrap().unwrap();
        assert!((next.center_x - 320.0).abs() < 1e-3);
        assert!((next.center_y - 180.0).abs() < 1e-3);
        // radius 64 grown by 1.25 on both sides
        assert!((next.side - 160.0).abs() < 1e-3);
        assert!(next.rotation.abs() < 1e-5);
    }

    #[test]
    fn test_tracking_roi_lost_on_collapsed_points() {
        let raw = raw_with(&[]);
        assert!(tracking_roi(&raw, &centered_roi(0.0)).unwrap().is_none());
    }

    #[test]
    fn test_outputs_picked_by_size() {
        let landmarks = vec![0.5; MODEL_LANDMARKS * MODEL_VALUES_PER_LANDMARK];
        let outputs = LandmarkOutputs::from_tensors(vec![
            vec![0.9],
            vec![0.0; 64 * 64],
            landmarks.clone(),
            vec![0.0; 117],
        ])
        .unwrap();
        assert_eq!(outputs.landmarks, landmarks);
        assert_eq!(outputs.presence, 0.9);
    }

    #[test]
    fn test_outputs_without_presence_fail() {
        let landmarks = vec![0.0; MODEL_LANDMARKS * MODEL_VALUES_PER_LANDMARK];
        let err = LandmarkOutputs::from_tensors(vec![landmarks, vec![0.0; 117]]).unwrap_err();
        assert!(err.to_string().contains("presence"));

        let err = LandmarkOutputs::from_tensors(vec![vec![0.7]]).unwrap_err();
        assert!(err.to_string().contains("landmark tensor"));
    }
}
