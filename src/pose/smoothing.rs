use super::{Landmark, LandmarkSet};
use crate::shared::constants::{NUM_LANDMARKS, SMOOTH_BETA, SMOOTH_D_CUTOFF, SMOOTH_MIN_CUTOFF};

struct LowPassFilter {
    prev: Option<f32>,
}

impl LowPassFilter {
    fn new() -> Self {
        Self { prev: None }
    }

    fn filter(&mut self, value: f32, alpha: f32) -> f32 {
        let out = match self.prev {
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
            None => value,
        };
        self.prev = Some(out);
        out
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}

fn smoothing_factor(dt: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * dt;
    r / (r + 1.0)
}

/// One Euro filter over a single scalar.
struct OneEuroFilter {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    x: LowPassFilter,
    dx: LowPassFilter,
    prev_value: Option<f32>,
}

impl OneEuroFilter {
    fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff,
            x: LowPassFilter::new(),
            dx: LowPassFilter::new(),
            prev_value: None,
        }
    }

    fn filter(&mut self, value: f32, dt: f32) -> f32 {
        let dx = match self.prev_value {
            Some(prev) if dt > 0.0 => (value - prev) / dt,
            _ => 0.0,
        };
        self.prev_value = Some(value);
        let edx = self.dx.filter(dx, smoothing_factor(dt, self.d_cutoff));
        let cutoff = self.min_cutoff + self.beta * edx.abs();
        self.x.filter(value, smoothing_factor(dt, cutoff))
    }

    fn reset(&mut self) {
        self.x.reset();
        self.dx.reset();
        self.prev_value = None;
    }
}

/// Temporal smoothing of landmark positions across consecutive frames.
///
/// x, y and z are filtered; visibility passes through untouched. NaN inputs
/// are passed through and reset that landmark's filters so a lost keypoint
/// does not poison later frames.
pub struct LandmarkSmoother {
    dt: f32,
    filters: Vec<[OneEuroFilter; 3]>,
}

impl LandmarkSmoother {
    pub fn new(fps: f64) -> Self {
        Self::with_params(fps, SMOOTH_MIN_CUTOFF, SMOOTH_BETA, SMOOTH_D_CUTOFF)
    }

    pub fn with_params(fps: f64, min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        let dt = if fps > 0.0 { (1.0 / fps) as f32 } else { 0.0 };
        let filters = (0..NUM_LANDMARKS)
            .map(|_| std::array::from_fn(|_| OneEuroFilter::new(min_cutoff, beta, d_cutoff)))
            .collect();
        Self { dt, filters }
    }

    pub fn apply(&mut self, set: &LandmarkSet) -> LandmarkSet {
        let mut out = *set;
        for (lm, filters) in out.0.iter_mut().zip(self.filters.iter_mut()) {
            if lm.x.is_nan() || lm.y.is_nan() || lm.z.is_nan() {
                filters.iter_mut().for_each(OneEuroFilter::reset);
                continue;
            }
            *lm = Landmark {
                x: filters[0].filter(lm.x, self.dt),
                y: filters[1].filter(lm.y, self.dt),
                z: filters[2].filter(lm.z, self.dt),
                visibility: lm.visibility,
            };
        }
        out
    }

    pub fn reset(&mut self) {
        for filters in self.filters.iter_mut() {
            filters.iter_mut().for_each(OneEuroFilter::reset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(x: f32) -> LandmarkSet {
        LandmarkSet([Landmark::new(x, x, 0.0, 1.0); NUM_LANDMARKS])
    }

    #[test]
    fn test_first_sample_passes_through() {
        let mut smoother = LandmarkSmoother::new(30.0);
        let out = smoother.apply(&uniform(0.4));
        assert_eq!(out.0[0].x, 0.4);
        assert_eq!(out.0[0].visibility, 1.0);
    }

    #[test]
    fn test_jump_is_damped() {
        let mut smoother = LandmarkSmoother::new(30.0);
        smoother.apply(&uniform(0.2));
        let out = smoother.apply(&uniform(0.8));
        assert!(out.0[5].x > 0.2 && out.0[5].x < 0.8);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut smoother = LandmarkSmoother::new(30.0);
        smoother.apply(&uniform(0.2));
        smoother.reset();
        let out = smoother.apply(&uniform(0.8));
        assert_eq!(out.0[5].x, 0.8);
    }

    #[test]
    fn test_nan_landmarks_stay_nan() {
        let mut smoother = LandmarkSmoother::new(30.0);
        smoother.apply(&uniform(0.2));
        let out = smoother.apply(&LandmarkSet::missing());
        assert!(out.is_missing());
        let out = smoother.apply(&uniform(0.9));
        assert_eq!(out.0[0].x, 0.9);
    }
}
