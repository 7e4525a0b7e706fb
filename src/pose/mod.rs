pub mod blazepose;
pub mod detector;
pub mod roi;
pub mod smoothing;
pub mod tensor;

use anyhow::Result;
use opencv::core::Mat;

use crate::shared::constants::NUM_LANDMARKS;

pub use blazepose::BlazePoseEstimator;
pub use smoothing::LandmarkSmoother;

/// A single body keypoint.
///
/// `x`/`y` are normalized to the frame (0..1), `z` is depth relative to the
/// hips on roughly the same scale as `x`, `visibility` is a 0..1 confidence.
/// Every field is NaN when the keypoint was not detected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub const MISSING: Landmark = Landmark {
        x: f32::NAN,
        y: f32::NAN,
        z: f32::NAN,
        visibility: f32::NAN,
    };

    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// NaN visibility never passes, since every comparison with NaN is false.
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    pub fn values(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.visibility]
    }
}

/// The 33 landmarks of one frame. Always full length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkSet(pub [Landmark; NUM_LANDMARKS]);

impl LandmarkSet {
    /// Placeholder for a frame where nobody was detected.
    pub fn missing() -> Self {
        Self([Landmark::MISSING; NUM_LANDMARKS])
    }

    pub fn as_slice(&self) -> &[Landmark] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.0.iter()
    }

    pub fn is_missing(&self) -> bool {
        self.0.iter().all(|lm| lm.visibility.is_nan())
    }
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self::missing()
    }
}

pub(crate) fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// Anything that turns one RGB frame into a set of body landmarks.
///
/// `Ok(None)` means nobody was found. The pipeline treats `Err` the same way,
/// so implementations are free to fail on a single bad frame.
pub trait PoseEstimator {
    fn estimate(&mut self, rgb: &Mat) -> Result<Option<LandmarkSet>>;

    /// Drop any state carried between frames.
    fn reset(&mut self) {}
}

impl<E: PoseEstimator + ?Sized> PoseEstimator for Box<E> {
    fn estimate(&mut self, rgb: &Mat) -> Result<Option<LandmarkSet>> {
        (**self).estimate(rgb)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}
