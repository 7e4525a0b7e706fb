use anyhow::Result;
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
    prelude::*,
};

use crate::pose::Landmark;
use crate::shared::constants::{DEFAULT_RADIUS, DEFAULT_THICKNESS, POSE_CONNECTIONS, SKELETON_COLOR};

#[derive(Debug, Clone, Copy)]
pub struct OverlayStyle {
    pub color: Scalar,
    pub thickness: i32,
    pub radius: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        let (b, g, r) = SKELETON_COLOR;
        Self {
            color: Scalar::new(b, g, r, 0.0),
            thickness: DEFAULT_THICKNESS,
            radius: DEFAULT_RADIUS,
        }
    }
}

/// Pixel geometry to burn into one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub segments: Vec<(Point, Point)>,
    pub points: Vec<Point>,
}

/// Normalized coordinates to pixels. Truncates toward zero.
fn to_pixel(lm: &Landmark, width: i32, height: i32) -> Point {
    Point::new(
        (lm.x as f64 * width as f64) as i32,
        (lm.y as f64 * height as f64) as i32,
    )
}

/// Decide what gets drawn for a frame of `width` x `height` pixels.
///
/// A segment needs both endpoints at or above `threshold`; a point needs only
/// itself. Connections referring past the end of `landmarks` are skipped.
pub fn plan_overlay(
    landmarks: &[Landmark],
    connections: &[(usize, usize)],
    width: i32,
    height: i32,
    threshold: f32,
) -> Overlay {
    let segments = connections
        .iter()
        .filter_map(|&(a, b)| {
            let (la, lb) = (landmarks.get(a)?, landmarks.get(b)?);
            if la.is_visible(threshold) && lb.is_visible(threshold) {
                Some((to_pixel(la, width, height), to_pixel(lb, width, height)))
            } else {
                None
            }
        })
        .collect();

    let points = landmarks
        .iter()
        .filter(|lm| lm.is_visible(threshold))
        .map(|lm| to_pixel(lm, width, height))
        .collect();

    Overlay { segments, points }
}

/// Lines first, then filled dots on top.
pub fn draw_overlay(frame: &mut Mat, overlay: &Overlay, style: &OverlayStyle) -> Result<()> {
    for &(pa, pb) in &overlay.segments {
        imgproc::line(frame, pa, pb, style.color, style.thickness, imgproc::LINE_AA, 0)?;
    }
    for &p in &overlay.points {
        imgproc::circle(frame, p, style.radius, style.color, imgproc::FILLED, imgproc::LINE_AA, 0)?;
    }
    Ok(())
}

/// Draw the body skeleton over `frame` in place.
pub fn draw_pose(
    frame: &mut Mat,
    landmarks: &[Landmark],
    threshold: f32,
    style: &OverlayStyle,
) -> Result<()> {
    let overlay = plan_overlay(landmarks, &POSE_CONNECTIONS, frame.cols(), frame.rows(), threshold);
    draw_overlay(frame, &overlay, style)
}
