use std::f32::consts::{FRAC_PI_2, PI};

use crate::shared::constants::ROI_SCALE;

/// Axis-aligned region of the source frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn full(frame_w: u32, frame_h: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: frame_w as f32,
            height: frame_h as f32,
        }
    }
}

/// Square landmark crop in frame pixels, turned by `rotation` radians
/// (clockwise on screen) so the body stands upright inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roi {
    pub center_x: f32,
    pub center_y: f32,
    pub side: f32,
    pub rotation: f32,
}

impl Roi {
    /// Crop aligned on two keypoints: `center` (mid-hip) and `edge`, a point
    /// on the circle enclosing the body. The center→edge direction ends up
    /// pointing up in the crop, and the circle is grown by `ROI_SCALE`.
    ///
    /// Returns `None` when the circle is degenerate.
    pub fn from_alignment(center: (f32, f32), edge: (f32, f32)) -> Option<Self> {
        let (dx, dy) = (edge.0 - center.0, edge.1 - center.1);
        let radius = (dx * dx + dy * dy).sqrt();
        if !radius.is_finite() || radius < 1.0 || !center.0.is_finite() || !center.1.is_finite() {
            return None;
        }

        Some(Self {
            center_x: center.0,
            center_y: center.1,
            side: 2.0 * radius * ROI_SCALE,
            rotation: normalize_radians(FRAC_PI_2 - (-dy).atan2(dx)),
        })
    }

    /// Pixel of an `input_size` square crop to source frame pixel.
    pub fn to_frame(&self, x: f32, y: f32, input_size: u32) -> (f32, f32) {
        let k = self.side / input_size as f32;
        let half = input_size as f32 / 2.0;
        let (dx, dy) = ((x - half) * k, (y - half) * k);
        let (sin, cos) = self.rotation.sin_cos();
        (
            self.center_x + dx * cos - dy * sin,
            self.center_y + dx * sin + dy * cos,
        )
    }

    /// Inverse of `to_frame` as a 2x3 affine matrix for `warp_affine`.
    pub fn frame_to_crop(&self, input_size: u32) -> [[f64; 3]; 2] {
        let k = input_size as f64 / self.side as f64;
        let half = input_size as f64 / 2.0;
        let (sin, cos) = (self.rotation as f64).sin_cos();
        let (cx, cy) = (self.center_x as f64, self.center_y as f64);
        [
            [k * cos, k * sin, half - k * (cos * cx + sin * cy)],
            [-k * sin, k * cos, half - k * (cos * cy - sin * cx)],
        ]
    }
}

fn normalize_radians(angle: f32) -> f32 {
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

/// Aspect-preserving fit of a `Rect` into a square network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub rect: Rect,
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    /// Resized crop size inside the square, in pixels.
    pub inner_w: u32,
    pub inner_h: u32,
}

impl Letterbox {
    pub fn new(rect: Rect, input_size: u32) -> Self {
        let side = input_size as f32;
        let scale = (side / rect.width).min(side / rect.height);
        let inner_w = ((rect.width * scale).round() as u32).clamp(1, input_size);
        let inner_h = ((rect.height * scale).round() as u32).clamp(1, input_size);
        Self {
            rect,
            scale,
            pad_x: ((input_size - inner_w) / 2) as f32,
            pad_y: ((input_size - inner_h) / 2) as f32,
            inner_w,
            inner_h,
        }
    }

    /// Network input pixel to source frame pixel.
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.rect.x + (x - self.pad_x) / self.scale,
            self.rect.y + (y - self.pad_y) / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-3 && (a.1 - b.1).abs() < 1e-3
    }

    #[test]
    fn test_letterbox_wide_frame_pads_vertically() {
        let lb = Letterbox::new(Rect::full(640, 360), 256);
        assert_eq!(lb.inner_w, 256);
        assert_eq!(lb.inner_h, 144);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 56.0);
        assert!(close(lb.to_frame(128.0, 128.0), (320.0, 180.0)));
    }

    #[test]
    fn test_upright_body_needs_no_rotation() {
        // edge point straight above the hips
        let roi = Roi::from_alignment((200.0, 300.0), (200.0, 200.0)).unwrap();
        assert!(roi.rotation.abs() < 1e-6);
        assert!((roi.side - 250.0).abs() < 1e-3);

        assert!(close(roi.to_frame(128.0, 128.0, 256), (200.0, 300.0)));
        // top-left corner of the crop
        assert!(close(roi.to_frame(0.0, 0.0, 256), (75.0, 175.0)));
    }

    #[test]
    fn test_body_lying_right_turns_crop() {
        // head to the right of the hips
        let roi = Roi::from_alignment((100.0, 100.0), (180.0, 100.0)).unwrap();
        assert!((roi.rotation - FRAC_PI_2).abs() < 1e-5);
        // "up" in the crop points right in the frame
        assert!(close(roi.to_frame(128.0, 0.0, 256), (200.0, 100.0)));
    }

    #[test]
    fn test_degenerate_alignment_is_rejected() {
        assert!(Roi::from_alignment((50.0, 50.0), (50.2, 50.0)).is_none());
        assert!(Roi::from_alignment((f32::NAN, 50.0), (0.0, 0.0)).is_none());
    }

    #[test]
    fn test_frame_to_crop_inverts_to_frame() {
        let roi = Roi {
            center_x: 310.0,
            center_y: 170.0,
            side: 180.0,
            rotation: 0.6,
        };
        let (fx, fy) = roi.to_frame(40.0, 200.0, 256);
        let m = roi.frame_to_crop(256);
        let u = m[0][0] * fx as f64 + m[0][1] * fy as f64 + m[0][2];
        let v = m[1][0] * fx as f64 + m[1][1] * fy as f64 + m[1][2];
        assert!((u - 40.0).abs() < 1e-2);
        assert!((v - 200.0).abs() < 1e-2);
    }

    #[test]
    fn test_normalize_radians_range() {
        assert!((normalize_radians(3.0 * PI / 2.0) + FRAC_PI_2).abs() < 1e-5);
        assert!((normalize_radians(0.25) - 0.25).abs() < 1e-6);
    }
}
