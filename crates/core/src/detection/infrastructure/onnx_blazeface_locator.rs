/// BlazeFace face locator using ONNX Runtime via `ort`.
///
/// Boxes only, no landmarks. Results come back highest-confidence first, so
/// the primary face is the one the model is surest about.
use std::path::Path;

use crate::detection::domain::face_locator::{FaceLocator, LocateError};
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Floats per anchor in the regressor output (box + six keypoints).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceLocator {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceLocator {
    /// Load a BlazeFace ONNX model.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, ort::Error> {
        let session = ort::session::Session::builder()?.commit_from_file(model_path)?;
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let fw = frame.width();
        let fh = frame.height();

        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let mut raw_dets = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence as f32,
            fw,
            fh,
        );
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);

        Ok(kept
            .iter()
            .filter_map(|d| to_face_box(d, fw, fh))
            .collect())
    }
}

impl FaceLocator for OnnxBlazefaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, LocateError> {
        self.infer(frame)
            .map_err(|e| LocateError::Backend(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `size × size` and normalize to [0,1] NCHW float32.
///
/// Single-channel frames are replicated across the three model channels.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let last_channel = frame.channels().max(1) as usize - 1;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c.min(last_channel)]] as f32 / 255.0;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Anchor generation (BlazeFace short-range)
// ---------------------------------------------------------------------------

/// The short-range model uses two feature map sizes, 16×16 and 8×8, with
/// 2 and 6 anchors per cell respectively.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

// ---------------------------------------------------------------------------
// Decoding + NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

/// Anchor-relative regressions to frame-pixel boxes above `confidence`.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    fw: u32,
    fh: u32,
) -> Vec<RawDet> {
    let mut dets = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }

        let anchor = &anchors[i];
        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > reg_data.len() {
            break;
        }

        let cx = anchor[0] + reg_data[offset] / INPUT_SIZE as f32;
        let cy = anchor[1] + reg_data[offset + 1] / INPUT_SIZE as f32;
        let w = reg_data[offset + 2] / INPUT_SIZE as f32;
        let h = reg_data[offset + 3] / INPUT_SIZE as f32;

        let x1 = ((cx - w / 2.0) * fw as f32).max(0.0);
        let y1 = ((cy - h / 2.0) * fh as f32).max(0.0);
        let x2 = ((cx + w / 2.0) * fw as f32).min(fw as f32);
        let y2 = ((cy + h / 2.0) * fh as f32).min(fh as f32);

        dets.push(RawDet {
            x1: x1 as f64,
            y1: y1 as f64,
            x2: x2 as f64,
            y2: y2 as f64,
            score: score as f64,
        });
    }

    dets
}

fn to_face_box(d: &RawDet, fw: u32, fh: u32) -> Option<FaceBox> {
    // x1/y1 are already clamped to >= 0 during decoding
    let x = d.x1 as i32;
    let y = d.y1 as i32;
    let w = ((d.x2 - d.x1) as i32).min(fw as i32 - x);
    let h = ((d.y2 - d.y1) as i32).min(fh as i32 - y);
    (w > 0 && h > 0).then(|| FaceBox::new(x, y, w, h))
}

/// Greedy NMS; output is sorted by descending score.
fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            if bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> RawDet {
        RawDet {
            x1,
            y1,
            x2,
            y2,
            score,
        }
    }

    #[test]
    fn test_preprocess_shape() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3);
        let tensor = preprocess(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_normalized() {
        let frame = Frame::new(vec![255u8; 50 * 50 * 3], 50, 50, 3);
        let tensor = preprocess(&frame, 128);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_preprocess_replicates_gray_channel() {
        let frame = Frame::new(vec![51u8; 64 * 64], 64, 64, 1);
        let tensor = preprocess(&frame, 128);
        for c in 0..3 {
            assert_relative_eq!(tensor[[0, c, 10, 10]], 0.2, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_generate_anchors_count() {
        // 16×16 grid × 2 anchors + 8×8 grid × 6 anchors = 512 + 384 = 896
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in &generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(0.0), 0.5, epsilon = 1e-6);
        assert!((sigmoid(10.0) - 1.0).abs() < 0.001);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_decode_filters_low_scores() {
        let anchors = vec![[0.5, 0.5], [0.25, 0.25]];
        let mut regs = vec![0.0f32; 2 * REGRESSOR_STRIDE];
        // Anchor 0: 64×64 box (in model pixels) at the centre.
        regs[2] = 64.0;
        regs[3] = 64.0;
        let scores = vec![5.0, -5.0];

        let dets = decode(&regs, &scores, &anchors, 0.5, 256, 256);
        assert_eq!(dets.len(), 1);
        assert_relative_eq!(dets[0].x1, 64.0, epsilon = 1e-3);
        assert_relative_eq!(dets[0].x2, 192.0, epsilon = 1e-3);
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let mut dets = vec![
            det(0.0, 0.0, 100.0, 100.0, 0.9),
            det(5.0, 5.0, 105.0, 105.0, 0.7),
        ];
        assert_eq!(nms(&mut dets, 0.3).len(), 1);
    }

    #[test]
    fn test_nms_keeps_separate_by_score() {
        let mut dets = vec![
            det(200.0, 200.0, 250.0, 250.0, 0.6),
            det(0.0, 0.0, 50.0, 50.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_to_face_box_drops_empty() {
        assert_eq!(
            to_face_box(&det(10.5, 20.0, 60.5, 70.0, 0.9), 640, 480),
            Some(FaceBox::new(10, 20, 50, 50))
        );
        assert_eq!(to_face_box(&det(30.0, 30.0, 30.0, 60.0, 0.9), 640, 480), None);
    }

    #[test]
    fn test_missing_model_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OnnxBlazefaceLocator::new(&dir.path().join("absent.onnx"), 0.5).is_err());
    }
}
