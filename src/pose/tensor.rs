use anyhow::{anyhow, bail, Context, Result};
use fast_image_resize as fr;
use fr::images::{Image, ImageRef};
use opencv::{
    core::{self, Mat, Scalar, Size, Vector},
    dnn, imgproc,
    prelude::*,
};
use std::path::Path;

use super::roi::{Letterbox, Roi};

/// Load an ONNX graph from `model_dir` onto the CPU backend.
/// A missing file is reported with the name that was expected.
pub fn load_onnx(model_dir: &Path, file: &str, label: &str) -> Result<dnn::Net> {
    let path = model_dir.join(file);
    if !path.exists() {
        bail!(
            "{} not found: {} (expected {} in {})",
            label,
            path.display(),
            file,
            model_dir.display()
        );
    }

    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("Model path is not valid UTF-8: {}", path.display()))?;
    let mut net = dnn::read_net_from_onnx(path_str)
        .with_context(|| format!("Failed to load {}: {}", label, path.display()))?;
    net.set_preferable_backend(dnn::DNN_BACKEND_OPENCV)?;
    net.set_preferable_target(dnn::DNN_TARGET_CPU)?;

    crate::utils::logger::info(&format!("Loaded {} {}", label, path.display()));
    Ok(net)
}

/// One forward pass; every output tensor comes back as flat f32 values.
pub fn forward(net: &mut dnn::Net, blob: &Mat) -> Result<Vec<Vec<f32>>> {
    net.set_input_def(blob)?;
    let names = net.get_unconnected_out_layers_names()?;
    let mut outputs = Vector::<Mat>::new();
    net.forward(&mut outputs, &names)?;
    outputs
        .iter()
        .map(|out| -> Result<Vec<f32>> { Ok(out.data_typed::<f32>()?.to_vec()) })
        .collect()
}

fn check_rgb(rgb: &Mat) -> Result<()> {
    if rgb.cols() == 0 || rgb.rows() == 0 {
        bail!("Empty frame");
    }
    if rgb.channels() != 3 || rgb.depth() != core::CV_8U {
        bail!("Estimator expects an 8-bit 3-channel frame");
    }
    if !rgb.is_continuous() {
        bail!("Frame is not continuous");
    }
    Ok(())
}

/// Resize `letterbox.rect` of the RGB frame into a `size`x`size` square and
/// return it as a 1xHxWx3 float blob. Pixel values map linearly from 0..255
/// onto `range`; the padding gets `range.0`.
pub fn letterboxed_blob(
    resizer: &mut fr::Resizer,
    rgb: &Mat,
    letterbox: &Letterbox,
    size: u32,
    range: (f32, f32),
) -> Result<Mat> {
    check_rgb(rgb)?;

    let src = ImageRef::new(
        rgb.cols() as u32,
        rgb.rows() as u32,
        rgb.data_bytes()?,
        fr::PixelType::U8x3,
    )?;
    let mut dst = Image::new(letterbox.inner_w, letterbox.inner_h, fr::PixelType::U8x3);
    let rect = letterbox.rect;
    let options = fr::ResizeOptions::new().crop(
        rect.x as f64,
        rect.y as f64,
        rect.width as f64,
        rect.height as f64,
    );
    resizer.resize(&src, &mut dst, &options)?;

    let side = size as i32;
    let mut blob =
        Mat::new_nd_with_default(&[1, side, side, 3], core::CV_32F, Scalar::all(range.0 as f64))?;
    let canvas = blob.data_typed_mut::<f32>()?;

    let step = (range.1 - range.0) / 255.0;
    let inner_w = letterbox.inner_w as usize;
    let (pad_x, pad_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
    for (y, row) in dst.buffer().chunks_exact(inner_w * 3).enumerate() {
        let offset = ((pad_y + y) * size as usize + pad_x) * 3;
        let Some(out_row) = canvas.get_mut(offset..offset + row.len()) else {
            bail!("Letterbox does not fit a {}px input", size);
        };
        for (out, &px) in out_row.iter_mut().zip(row) {
            *out = range.0 + px as f32 * step;
        }
    }

    Ok(blob)
}

/// Cut the rotated square `roi` out of the RGB frame into a `size`x`size`
/// 1xHxWx3 float blob in 0..1. Whatever falls outside the frame is black.
pub fn rotated_crop_blob(rgb: &Mat, roi: &Roi, size: u32) -> Result<Mat> {
    check_rgb(rgb)?;

    let affine = Mat::from_slice_2d(&roi.frame_to_crop(size)[..])?;
    let side = size as i32;
    let mut crop = Mat::default();
    imgproc::warp_affine(
        rgb,
        &mut crop,
        &affine,
        Size::new(side, side),
        imgproc::INTER_LINEAR,
        core::BORDER_CONSTANT,
        Scalar::all(0.0),
    )?;

    let mut scaled = Mat::default();
    crop.convert_to(&mut scaled, core::CV_32F, 1.0 / 255.0, 0.0)?;

    let mut blob = Mat::new_nd_with_default(&[1, side, side, 3], core::CV_32F, Scalar::all(0.0))?;
    blob.data_bytes_mut()?.copy_from_slice(scaled.data_bytes()?);
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::roi::Rect;
    use opencv::core::{Vec3b, CV_8UC3};

    fn frame(w: i32, h: i32, fill: (u8, u8, u8)) -> Mat {
        Mat::new_rows_cols_with_default(
            h,
            w,
            CV_8UC3,
            Scalar::new(fill.0 as f64, fill.1 as f64, fill.2 as f64, 0.0),
        )
        .unwrap()
    }

    fn paint(mat: &mut Mat, x: i32, y: i32, px: (u8, u8, u8)) {
        let dst = mat.at_2d_mut::<Vec3b>(y, x).unwrap();
        dst[0] = px.0;
        dst[1] = px.1;
        dst[2] = px.2;
    }

    fn pixel(blob: &Mat, size: usize, x: usize, y: usize) -> [f32; 3] {
        let data = blob.data_typed::<f32>().unwrap();
        let i = (y * size + x) * 3;
        [data[i], data[i + 1], data[i + 2]]
    }

    #[test]
    fn test_letterbox_pads_rows_and_places_pixels() {
        // 16x8 into 16x16: scale 1, four padding rows above and below
        let mut rgb = frame(16, 8, (10, 10, 10));
        paint(&mut rgb, 5, 3, (255, 102, 51));
        let lb = Letterbox::new(Rect::full(16, 8), 16);
        assert_eq!(lb.pad_y, 4.0);

        let mut resizer = fr::Resizer::new();
        let blob = letterboxed_blob(&mut resizer, &rgb, &lb, 16, (0.0, 1.0)).unwrap();
        assert_eq!(blob.total(), 16 * 16 * 3);

        for y in (0..4).chain(12..16) {
            for x in 0..16 {
                assert_eq!(pixel(&blob, 16, x, y), [0.0; 3], "pad at ({}, {})", x, y);
            }
        }

        let marked = pixel(&blob, 16, 5, 4 + 3);
        assert!((marked[0] - 1.0).abs() < 1e-6);
        assert!((marked[1] - 0.4).abs() < 1e-6);
        assert!((marked[2] - 0.2).abs() < 1e-6);
        let plain = pixel(&blob, 16, 6, 4 + 3);
        assert!((plain[0] - 10.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_letterbox_reads_from_cropped_rect() {
        // left half dark, right half bright; crop the right half only
        let mut rgb = frame(32, 16, (0, 0, 0));
        for y in 0..16 {
            for x in 16..32 {
                paint(&mut rgb, x, y, (255, 255, 255));
            }
        }
        let rect = Rect {
            x: 16.0,
            y: 0.0,
            width: 16.0,
            height: 16.0,
        };
        let lb = Letterbox::new(rect, 16);
        let mut resizer = fr::Resizer::new();
        let blob = letterboxed_blob(&mut resizer, &rgb, &lb, 16, (-1.0, 1.0)).unwrap();
        let data = blob.data_typed::<f32>().unwrap();
        assert!(data.iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_letterbox_padding_takes_range_floor() {
        let rgb = frame(16, 8, (0, 0, 0));
        let lb = Letterbox::new(Rect::full(16, 8), 16);
        let mut resizer = fr::Resizer::new();
        let blob = letterboxed_blob(&mut resizer, &rgb, &lb, 16, (-1.0, 1.0)).unwrap();
        assert_eq!(pixel(&blob, 16, 0, 0), [-1.0; 3]);
    }

    #[test]
    fn test_rejects_gray_frame() {
        let gray = Mat::new_rows_cols_with_default(8, 8, core::CV_8UC1, Scalar::all(0.0)).unwrap();
        let lb = Letterbox::new(Rect::full(8, 8), 16);
        let mut resizer = fr::Resizer::new();
        assert!(letterboxed_blob(&mut resizer, &gray, &lb, 16, (0.0, 1.0)).is_err());
    }

    #[test]
    fn test_rotated_crop_identity_reads_source() {
        let mut rgb = frame(64, 64, (20, 20, 20));
        paint(&mut rgb, 10, 20, (255, 0, 0));
        let roi = Roi {
            center_x: 32.0,
            center_y: 32.0,
            side: 64.0,
            rotation: 0.0,
        };
        let blob = rotated_crop_blob(&rgb, &roi, 64).unwrap();
        assert_eq!(blob.total(), 64 * 64 * 3);
        let px = pixel(&blob, 64, 10, 20);
        assert!((px[0] - 1.0).abs() < 1e-4);
        assert!(px[1].abs() < 1e-4);
    }

    #[test]
    fn test_rotated_crop_turns_body_upright() {
        // bright block right of the center; a quarter turn brings it to the top
        let mut rgb = frame(64, 64, (0, 0, 0));
        for y in 28..36 {
            for x in 44..52 {
                paint(&mut rgb, x, y, (200, 200, 200));
            }
        }
        let roi = Roi {
            center_x: 32.0,
            center_y: 32.0,
            side: 64.0,
            rotation: std::f32::consts::FRAC_PI_2,
        };
        let blob = rotated_crop_blob(&rgb, &roi, 64).unwrap();
        let top = pixel(&blob, 64, 32, 16);
        assert!((top[0] - 200.0 / 255.0).abs() < 1e-3);
        let right = pixel(&blob, 64, 48, 32);
        assert!(right[0].abs() < 1e-4);
    }

    #[test]
    fn test_rotated_crop_outside_frame_is_black() {
        let rgb = frame(64, 64, (90, 90, 90));
        let roi = Roi {
            center_x: 0.0,
            center_y: 0.0,
            side: 64.0,
            rotation: 0.0,
        };
        let blob = rotated_crop_blob(&rgb, &roi, 64).unwrap();
        assert_eq!(pixel(&blob, 64, 2, 2), [0.0; 3]);
        let inside = pixel(&blob, 64, 50, 50);
        assert!((inside[0] - 90.0 / 255.0).abs() < 1e-4);
    }
}
