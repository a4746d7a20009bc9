//! Face embedder via ONNX Runtime.
//!
//! Turns an aligned 112×112 face crop into a 128-dimensional
//! MobileFaceNet-style embedding, L2-normalized so Euclidean distances
//! are comparable across images.

use std::path::Path;

use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::align;
use crate::detect::DetectedFace;
use crate::extractor::ExtractError;
use crate::types::{Embedding, EMBEDDING_DIM};

const EMBED_INPUT_SIZE: u32 = align::ALIGNED_SIZE;
const EMBED_MEAN: f32 = 127.5;
// Symmetric normalization: the embedding model expects [-1, 1] inputs.
const EMBED_STD: f32 = 127.5;

/// ONNX face embedder operating on aligned crops.
pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the embedding model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, ExtractError> {
        if !model_path.exists() {
            return Err(ExtractError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face embedding model"
        );

        Ok(Self { session })
    }

    /// Embed one detected face: align to the canonical 112×112 pose,
    /// run the model, validate the dimension, L2-normalize.
    pub fn embed(&mut self, image: &RgbImage, face: &DetectedFace) -> Result<Embedding, ExtractError> {
        let aligned = align::align_face(image, &face.landmarks);
        let input = preprocess(&aligned);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractError::Inference(format!("embedding output: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(ExtractError::Inference(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        let norm: f32 = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
        let values: Vec<f32> = if norm > 0.0 {
            raw.iter().map(|v| v / norm).collect()
        } else {
            raw.to_vec()
        };

        Ok(Embedding::new(values))
    }
}

/// Preprocess an aligned RGB crop into a NCHW float tensor.
fn preprocess(aligned: &RgbImage) -> Array4<f32> {
    let size = EMBED_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in aligned.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize, x as usize]] =
                (pixel[channel] as f32 - EMBED_MEAN) / EMBED_STD;
        }
    }

    tensor
}
