use anyhow::{anyhow, bail, Result};
use fast_image_resize as fr;
use opencv::{core::Mat, dnn, prelude::*};
use std::path::Path;

use super::roi::{Letterbox, Rect, Roi};
use super::tensor;
use crate::shared::constants::{
    DETECTOR_ANCHORS, DETECTOR_ANCHORS_PER_LAYER, DETECTOR_INPUT_SIZE, DETECTOR_KEYPOINTS,
    DETECTOR_MODEL_FILE, DETECTOR_SCORE_CLIP, DETECTOR_STRIDES, DETECTOR_VALUES_PER_ANCHOR,
};

/// Center of one SSD anchor, normalized to the detector input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

/// Anchor grid of the BlazePose detector. Boxes are fixed-size, so only the
/// centers matter.
pub fn generate_anchors() -> Vec<Anchor> {
    let mut anchors = Vec::with_capacity(DETECTOR_ANCHORS);
    let mut layer = 0;
    while layer < DETECTOR_STRIDES.len() {
        let stride = DETECTOR_STRIDES[layer];
        let mut per_cell = 0;
        while layer < DETECTOR_STRIDES.len() && DETECTOR_STRIDES[layer] == stride {
            per_cell += DETECTOR_ANCHORS_PER_LAYER;
            layer += 1;
        }

        let grid = DETECTOR_INPUT_SIZE.div_ceil(stride);
        for y in 0..grid {
            for x in 0..grid {
                let anchor = Anchor {
                    x: (x as f32 + 0.5) / grid as f32,
                    y: (y as f32 + 0.5) / grid as f32,
                };
                anchors.extend(std::iter::repeat(anchor).take(per_cell));
            }
        }
    }
    anchors
}

/// Best person found by the detector, keypoints in frame pixels.
///
/// Keypoint 0 is the mid-hip, keypoint 1 a point on the circle enclosing the
/// whole body; 2 and 3 describe the upper body the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonDetection {
    pub score: f32,
    pub keypoints: [(f32, f32); DETECTOR_KEYPOINTS],
}

impl PersonDetection {
    /// Landmark crop around the whole body.
    pub fn roi(&self) -> Option<Roi> {
        Roi::from_alignment(self.keypoints[0], self.keypoints[1])
    }
}

/// Split the detector outputs by size: per-anchor regressors and scores.
pub fn detector_outputs(tensors: Vec<Vec<f32>>) -> Result<(Vec<f32>, Vec<f32>)> {
    let mut boxes = None;
    let mut scores = None;
    for t in tensors {
        match t.len() {
            n if n == DETECTOR_ANCHORS * DETECTOR_VALUES_PER_ANCHOR => boxes = Some(t),
            DETECTOR_ANCHORS => scores = Some(t),
            _ => {}
        }
    }
    let boxes = boxes.ok_or_else(|| anyhow!("Pose detector produced no box tensor"))?;
    let scores = scores.ok_or_else(|| anyhow!("Pose detector produced no score tensor"))?;
    Ok((boxes, scores))
}

/// Keep the single highest-scoring anchor, if it clears `min_score`.
/// Scores are logits, clipped before the sigmoid.
pub fn decode_best(
    boxes: &[f32],
    scores: &[f32],
    anchors: &[Anchor],
    letterbox: &Letterbox,
    min_score: f32,
) -> Result<Option<PersonDetection>> {
    if scores.len() < anchors.len() || boxes.len() < anchors.len() * DETECTOR_VALUES_PER_ANCHOR {
        bail!(
            "Detector tensors too short for {} anchors ({} boxes, {} scores)",
            anchors.len(),
            boxes.len(),
            scores.len()
        );
    }

    let best = scores[..anchors.len()]
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1));
    let Some((idx, &logit)) = best else {
        return Ok(None);
    };

    let score = super::sigmoid(logit.clamp(-DETECTOR_SCORE_CLIP, DETECTOR_SCORE_CLIP));
    if score < min_score {
        return Ok(None);
    }

    let side = DETECTOR_INPUT_SIZE as f32;
    let anchor = anchors[idx];
    let raw = &boxes[idx * DETECTOR_VALUES_PER_ANCHOR..(idx + 1) * DETECTOR_VALUES_PER_ANCHOR];
    let mut keypoints = [(0.0, 0.0); DETECTOR_KEYPOINTS];
    for (k, point) in keypoints.iter_mut().enumerate() {
        let offset = 4 + k * 2;
        *point = letterbox.to_frame(
            raw[offset] + anchor.x * side,
            raw[offset + 1] + anchor.y * side,
        );
    }

    Ok(Some(PersonDetection { score, keypoints }))
}

/// BlazePose person detector on the whole frame, letterboxed to 224x224
/// with pixels in -1..1.
pub struct PoseDetector {
    net: dnn::Net,
    resizer: fr::Resizer,
    anchors: Vec<Anchor>,
    min_score: f32,
}

impl PoseDetector {
    pub fn load(model_dir: &Path, min_score: f32) -> Result<Self> {
        let net = tensor::load_onnx(model_dir, DETECTOR_MODEL_FILE, "Pose detector model")?;
        Ok(Self {
            net,
            resizer: fr::Resizer::new(),
            anchors: generate_anchors(),
            min_score,
        })
    }

    pub fn detect(&mut self, rgb: &Mat) -> Result<Option<PersonDetection>> {
        let frame = Rect::full(rgb.cols() as u32, rgb.rows() as u32);
        let letterbox = Letterbox::new(frame, DETECTOR_INPUT_SIZE);
        let blob = tensor::letterboxed_blob(
            &mut self.resizer,
            rgb,
            &letterbox,
            DETECTOR_INPUT_SIZE,
            (-1.0, 1.0),
        )?;

        let (boxes, scores) = detector_outputs(tensor::forward(&mut self.net, &blob)?)?;
        let person = decode_best(&boxes, &scores, &self.anchors, &letterbox, self.min_score)?;
        if let Some(p) = &person {
            crate::utils::logger::debug(&format!("Person detected (score {:.3})", p.score));
        }
        Ok(person)
    }
}
