//! SCRFD-style face detector via ONNX Runtime.
//!
//! Anchor-free decoding over three stride levels with five-point
//! landmarks, NMS, and letterbox de-mapping back to source coordinates.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::extractor::ExtractError;

const DETECT_INPUT_SIZE: u32 = 640;
const DETECT_MEAN: f32 = 127.5;
const DETECT_STD: f32 = 128.0;
const CONFIDENCE_THRESHOLD: f32 = 0.5;
const NMS_IOU_THRESHOLD: f32 = 0.4;
const STRIDES: [u32; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;

/// A face located in the source image, in source-pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct DetectedFace {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point landmarks: left eye, right eye, nose, left mouth, right mouth.
    pub landmarks: [(f32, f32); 5],
}

/// Geometry of a letterbox resize, for mapping model-space coordinates
/// back to the source image.
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Output tensor indices for one stride: (scores, boxes, landmarks).
type StrideOutputs = (usize, usize, usize);

/// SCRFD-style single-shot face detector.
pub struct FaceDetector {
    session: Session,
    /// Per-stride output indices for strides [8, 16, 32], discovered by
    /// name at load time with a positional fallback.
    stride_outputs: [StrideOutputs; 3],
}

impl FaceDetector {
    /// Load the detection model, failing fast if the file is absent or
    /// its output signature does not look like SCRFD.
    pub fn load(model_path: &Path) -> Result<Self, ExtractError> {
        if !model_path.exists() {
            return Err(ExtractError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            "loaded face detection model"
        );

        if output_names.len() < 9 {
            return Err(ExtractError::Inference(format!(
                "detection model requires 9 outputs (3 strides x scores/boxes/landmarks), got {}",
                output_names.len()
            )));
        }

        let stride_outputs = map_output_tensors(&output_names);
        tracing::debug!(?stride_outputs, "detection output tensor mapping");

        Ok(Self { session, stride_outputs })
    }

    /// Detect faces in an RGB image, returned sorted by descending
    /// confidence. An empty vec means no face cleared the threshold.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, ExtractError> {
        let (input, letterbox) = preprocess(image);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut detections = Vec::new();
        for (level, &stride) in STRIDES.iter().enumerate() {
            let (score_idx, box_idx, kps_idx) = self.stride_outputs[level];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| ExtractError::Inference(format!("scores stride {stride}: {e}")))?;
            let (_, boxes) = outputs[box_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| ExtractError::Inference(format!("boxes stride {stride}: {e}")))?;
            let (_, kps) = outputs[kps_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| ExtractError::Inference(format!("landmarks stride {stride}: {e}")))?;

            detections.extend(decode_stride(scores, boxes, kps, stride, &letterbox));
        }

        let mut faces = non_max_suppression(detections, NMS_IOU_THRESHOLD);
        faces.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(faces)
    }
}

/// Letterbox an RGB image into the model's square input tensor.
///
/// The image is scaled to fit, centered, and normalized; padding is left
/// at the tensor's zero fill, which is exactly the normalized mean.
fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let side = DETECT_INPUT_SIZE;
    let (width, height) = image.dimensions();

    let scale = (side as f32 / width as f32).min(side as f32 / height as f32);
    let scaled_w = ((width as f32 * scale).round() as u32).clamp(1, side);
    let scaled_h = ((height as f32 * scale).round() as u32).clamp(1, side);
    let pad_x = (side - scaled_w) / 2;
    let pad_y = (side - scaled_h) / 2;

    let resized = imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, side as usize, side as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let tx = (x + pad_x) as usize;
        let ty = (y + pad_y) as usize;
        for channel in 0..3 {
            tensor[[0, channel, ty, tx]] = (pixel[channel] as f32 - DETECT_MEAN) / DETECT_STD;
        }
    }

    let letterbox = Letterbox {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
    };
    (tensor, letterbox)
}

/// Map output tensor names to stride slots.
///
/// SCRFD exports either named tensors ("score_8", "bbox_16", "kps_32")
/// or generic numeric names; for the latter the standard positional
/// ordering applies: [0-2] scores, [3-5] boxes, [6-8] landmarks.
fn map_output_tensors(names: &[String]) -> [StrideOutputs; 3] {
    let find = |prefix: &str, stride: u32| {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let mut mapped = [(0, 3, 6), (1, 4, 7), (2, 5, 8)];
    for (level, &stride) in STRIDES.iter().enumerate() {
        match (find("score", stride), find("bbox", stride), find("kps", stride)) {
            (Some(s), Some(b), Some(k)) => mapped[level] = (s, b, k),
            _ => {
                tracing::info!(?names, "unrecognized detection output names, using positional mapping");
                return [(0, 3, 6), (1, 4, 7), (2, 5, 8)];
            }
        }
    }
    mapped
}

/// Decode one stride level's raw tensors into source-space detections.
///
/// Detections whose landmark block falls outside the tensor are dropped;
/// the rest of the pipeline requires all five points.
fn decode_stride(
    scores: &[f32],
    boxes: &[f32],
    kps: &[f32],
    stride: u32,
    letterbox: &Letterbox,
) -> Vec<DetectedFace> {
    let grid_w = (DETECT_INPUT_SIZE / stride) as usize;
    let grid_h = (DETECT_INPUT_SIZE / stride) as usize;
    let anchor_count = grid_w * grid_h * ANCHORS_PER_CELL;
    let s = stride as f32;

    let mut detections = Vec::new();
    for idx in 0..anchor_count {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= CONFIDENCE_THRESHOLD {
            continue;
        }

        let cell = idx / ANCHORS_PER_CELL;
        let anchor_cx = (cell % grid_w) as f32 * s;
        let anchor_cy = (cell / grid_w) as f32 * s;

        // Box offsets: [left, top, right, bottom] distances in stride units.
        let b = idx * 4;
        if b + 4 > boxes.len() {
            continue;
        }
        let (x1, y1) = letterbox.to_source(anchor_cx - boxes[b] * s, anchor_cy - boxes[b + 1] * s);
        let (x2, y2) =
            letterbox.to_source(anchor_cx + boxes[b + 2] * s, anchor_cy + boxes[b + 3] * s);

        let k = idx * 10;
        if k + 10 > kps.len() {
            continue;
        }
        let mut landmarks = [(0.0f32, 0.0f32); 5];
        for (point, lm) in landmarks.iter_mut().enumerate() {
            *lm = letterbox.to_source(
                anchor_cx + kps[k + point * 2] * s,
                anchor_cy + kps[k + point * 2 + 1] * s,
            );
        }

        detections.push(DetectedFace {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: score,
            landmarks,
        });
    }
    detections
}

/// Non-maximum suppression: keep the highest-confidence detection of
/// each overlapping cluster.
fn non_max_suppression(mut detections: Vec<DetectedFace>, iou_threshold: f32) -> Vec<DetectedFace> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];
    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i]);
        for j in (i + 1)..detections.len() {
            if !suppressed[j] && iou(&detections[i], &detections[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn iou(a: &DetectedFace, b: &DetectedFace) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
