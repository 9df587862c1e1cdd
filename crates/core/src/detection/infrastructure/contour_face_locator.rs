/// Model-free face locator: Otsu binarisation followed by connected-region
/// bounding boxes, filtered down to roughly face-shaped candidates.
///
/// Far less accurate than BlazeFace, but needs no model file and no native
/// runtime, so it keeps the loop alive on a bare board.
use crate::detection::domain::face_locator::{FaceLocator, LocateError};
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Candidates must be strictly larger than this on both axes.
const MIN_SIDE: i32 = 50;

/// Candidates must be strictly smaller than this fraction of the frame.
const MAX_FRACTION: f64 = 0.8;

/// Open interval of accepted width / height ratios.
const MIN_ASPECT: f64 = 0.6;
const MAX_ASPECT: f64 = 1.4;

#[derive(Default)]
pub struct ContourFaceLocator;

impl ContourFaceLocator {
    pub fn new() -> Self {
        Self
    }
}

impl FaceLocator for ContourFaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, LocateError> {
        let gray;
        let frame = if frame.is_grayscale() {
            frame
        } else {
            gray = frame.to_grayscale();
            &gray
        };

        let threshold = otsu_threshold(frame.data());
        let mask: Vec<bool> = frame.data().iter().map(|&p| p > threshold).collect();
        let regions = region_boxes(&mask, frame.width(), frame.height());
        let faces = outermost_candidates(
            &regions,
            frame.width() as f64,
            frame.height() as f64,
        );

        log::debug!(
            "contour locator: threshold {threshold}, {} candidate(s)",
            faces.len()
        );
        Ok(faces)
    }
}

fn is_face_shaped(b: &FaceBox, cols: f64, rows: f64) -> bool {
    let aspect = b.aspect_ratio();
    b.width > MIN_SIDE
        && b.height > MIN_SIDE
        && (b.width as f64) < MAX_FRACTION * cols
        && (b.height as f64) < MAX_FRACTION * rows
        && aspect > MIN_ASPECT
        && aspect < MAX_ASPECT
}

// ---------------------------------------------------------------------------
// Thresholding
// ---------------------------------------------------------------------------

/// Otsu's method: the level maximising between-class variance.
///
/// Pixels strictly above the returned level are foreground. Ties keep the
/// lowest level.
fn otsu_threshold(pixels: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &p in pixels {
        histogram[p as usize] += 1;
    }

    let total = pixels.len() as f64;
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_bg = 0.0;
    let mut sum_bg = 0.0;
    let mut best_variance = 0.0;
    let mut threshold = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += level as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            threshold = level as u8;
        }
    }

    threshold
}

// ---------------------------------------------------------------------------
// Connected regions
// ---------------------------------------------------------------------------

/// Bounding boxes of 8-connected foreground regions, in scan order of each
/// region's first pixel.
fn region_boxes(mask: &[bool], width: u32, height: u32) -> Vec<FaceBox> {
    let w = width as usize;
    let h = height as usize;
    let mut visited = vec![false; mask.len()];
    let mut boxes = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        visited[start] = true;
        stack.push(start);

        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);

        while let Some(idx) = stack.pop() {
            let x = idx % w;
            let y = idx / w;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        boxes.push(FaceBox::new(
            min_x as i32,
            min_y as i32,
            (max_x - min_x + 1) as i32,
            (max_y - min_y + 1) as i32,
        ));
    }

    boxes
}

/// Face-shaped regions that no other region's box encloses, in scan order.
///
/// Only regions larger than `MIN_SIDE` on both axes can enclose a candidate,
/// so a speckled frame with many tiny regions stays cheap. Containment is
/// by bounding box: a region in a hole is dropped, and so is one sitting in
/// the open concavity of another region's outline.
fn outermost_candidates(regions: &[FaceBox], cols: f64, rows: f64) -> Vec<FaceBox> {
    let containers: Vec<(usize, &FaceBox)> = regions
        .iter()
        .enumerate()
        .filter(|(_, b)| b.width > MIN_SIDE && b.height > MIN_SIDE)
        .collect();

    regions
        .iter()
        .enumerate()
        .filter(|(_, b)| is_face_shaped(b, cols, rows))
        .filter(|&(j, inner)| {
            !containers
                .iter()
                .any(|&(i, outer)| i != j && outer.contains(inner) && (outer != inner || i < j))
        })
        .map(|(_, b)| *b)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn canvas(width: u32, height: u32) -> Vec<u8> {
        vec![0u8; (width * height) as usize]
    }

    fn fill(data: &mut [u8], stride: u32, b: FaceBox, value: u8) {
        for y in b.y..b.y + b.height {
            for x in b.x..b.x + b.width {
                data[(y as u32 * stride + x as u32) as usize] = value;
            }
        }
    }

    fn locate(data: Vec<u8>, width: u32, height: u32) -> Vec<FaceBox> {
        ContourFaceLocator::new()
            .locate(&Frame::new(data, width, height, 1))
            .unwrap()
    }

    #[test]
    fn test_otsu_splits_two_levels() {
        let mut pixels = vec![20u8; 100];
        pixels.extend(vec![200u8; 100]);
        let t = otsu_threshold(&pixels);
        assert!((20..200).contains(&t));
    }

    #[test]
    fn test_otsu_uniform_is_zero() {
        assert_eq!(otsu_threshold(&[90u8; 64]), 0);
    }

    #[test]
    fn test_bright_square_is_found() {
        let mut data = canvas(200, 200);
        fill(&mut data, 200, FaceBox::new(40, 40, 80, 80), 255);
        assert_eq!(locate(data, 200, 200), vec![FaceBox::new(40, 40, 80, 80)]);
    }

    #[test]
    fn test_color_frame_is_converted() {
        let mut data = vec![0u8; 200 * 200 * 3];
        for y in 40..120usize {
            for x in 40..120usize {
                let i = (y * 200 + x) * 3;
                data[i..i + 3].copy_from_slice(&[250, 250, 250]);
            }
        }
        let faces = ContourFaceLocator::new()
            .locate(&Frame::new(data, 200, 200, 3))
            .unwrap();
        assert_eq!(faces, vec![FaceBox::new(40, 40, 80, 80)]);
    }

    #[test]
    fn test_thin_rectangle_is_rejected() {
        let mut data = canvas(200, 200);
        fill(&mut data, 200, FaceBox::new(20, 60, 120, 60), 255);
        assert!(locate(data, 200, 200).is_empty());
    }

    #[test]
    fn test_oversized_region_is_rejected() {
        let mut data = canvas(200, 200);
        fill(&mut data, 200, FaceBox::new(10, 10, 170, 170), 255);
        assert!(locate(data, 200, 200).is_empty());
    }

    #[test]
    fn test_small_region_is_rejected() {
        let mut data = canvas(200, 200);
        fill(&mut data, 200, FaceBox::new(10, 10, 50, 50), 255);
        assert!(locate(data, 200, 200).is_empty());
    }

    #[test]
    fn test_two_regions_in_scan_order() {
        let mut data = canvas(300, 200);
        fill(&mut data, 300, FaceBox::new(180, 10, 60, 60), 255);
        fill(&mut data, 300, FaceBox::new(20, 100, 70, 70), 255);
        assert_eq!(
            locate(data, 300, 200),
            vec![FaceBox::new(180, 10, 60, 60), FaceBox::new(20, 100, 70, 70)]
        );
    }

    #[test]
    fn test_region_inside_hole_is_dropped() {
        let mut data = canvas(200, 200);
        fill(&mut data, 200, FaceBox::new(40, 40, 100, 100), 255);
        fill(&mut data, 200, FaceBox::new(45, 45, 90, 90), 0);
        fill(&mut data, 200, FaceBox::new(60, 60, 60, 60), 255);
        assert_eq!(locate(data, 200, 200), vec![FaceBox::new(40, 40, 100, 100)]);
    }

    #[test]
    fn test_region_inside_oversized_ring_is_dropped() {
        let mut data = canvas(200, 200);
        fill(&mut data, 200, FaceBox::new(10, 10, 180, 180), 255);
        fill(&mut data, 200, FaceBox::new(15, 15, 170, 170), 0);
        fill(&mut data, 200, FaceBox::new(70, 70, 60, 60), 255);
        assert!(locate(data, 200, 200).is_empty());
    }

    #[test]
    fn test_region_within_concave_outline_is_dropped() {
        let mut data = canvas(200, 200);
        fill(&mut data, 200, FaceBox::new(20, 20, 10, 150), 255);
        fill(&mut data, 200, FaceBox::new(160, 20, 10, 150), 255);
        fill(&mut data, 200, FaceBox::new(20, 160, 150, 10), 255);
        fill(&mut data, 200, FaceBox::new(60, 40, 70, 70), 255);
        assert_eq!(locate(data, 200, 200), vec![FaceBox::new(20, 20, 150, 150)]);
    }

    #[test]
    fn test_speckled_frame_is_handled_quickly() {
        let (w, h) = (640u32, 480u32);
        let mut data = canvas(w, h);
        for y in (0..h).step_by(2) {
            for x in (0..w).step_by(2) {
                data[(y * w + x) as usize] = 255;
            }
        }
        let mask: Vec<bool> = data.iter().map(|&p| p > 0).collect();
        assert_eq!(region_boxes(&mask, w, h).len(), 76_800);

        let start = Instant::now();
        assert!(locate(data, w, h).is_empty());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_uniform_frame_has_no_faces() {
        assert!(locate(vec![128u8; 200 * 200], 200, 200).is_empty());
        assert!(locate(canvas(200, 200), 200, 200).is_empty());
    }

    #[test]
    fn test_diagonal_pixels_are_connected() {
        let mask = vec![true, false, false, true];
        assert_eq!(region_boxes(&mask, 2, 2), vec![FaceBox::new(0, 0, 2, 2)]);
    }
}
