//! Per-frame quality signals used to rank enrollment candidates.

use image::{DynamicImage, GrayImage};

use crate::face::Detection;

/// Variance of the 4-neighbour Laplacian over the grayscale frame.
///
/// Higher means more high-frequency detail, i.e. less blur. Frames smaller
/// than 3x3 have no interior pixels and yield 0.
pub fn sharpness(img: &DynamicImage) -> f32 {
    laplacian_variance(&img.to_luma8())
}

pub fn laplacian_variance(gray: &GrayImage) -> f32 {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let n = ((w - 2) as f64) * ((h - 2) as f64);
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0) as f32
}

/// Estimated degree to which the face looks at the camera, in `[0, 1]`.
///
/// Uses nose-to-eye symmetry when landmarks are available (68-point or 5-point
/// layout) and falls back on the horizontal offset of the box from the frame
/// centre otherwise.
pub fn frontalness(detection: &Detection, frame_width: u32) -> f32 {
    let lm = &detection.landmarks;
    let symmetric = if lm.len() >= 48 {
        Some(eye_symmetry(mean_point(&lm[36..42]), mean_point(&lm[42..48]), lm[30]))
    } else if lm.len() == 5 {
        Some(eye_symmetry(lm[0], lm[1], lm[2]))
    } else {
        None
    };

    match symmetric {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => offset_frontalness(detection, frame_width),
    }
}

fn offset_frontalness(detection: &Detection, frame_width: u32) -> f32 {
    if frame_width == 0 {
        return 0.0;
    }
    let half = frame_width as f32 / 2.0;
    let v = 1.0 - (detection.center_x() - half).abs() / half;
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn eye_symmetry(left_eye: [f32; 2], right_eye: [f32; 2], nose: [f32; 2]) -> f32 {
    let dist_left = distance(nose, left_eye);
    let dist_right = distance(nose, right_eye);
    let denom = dist_left.max(dist_right).max(1e-6);
    1.0 - (dist_left - dist_right).abs() / denom
}

fn mean_point(points: &[[f32; 2]]) -> [f32; 2] {
    let n = points.len().max(1) as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    [sx / n, sy / n]
}

fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}
