//! The embedding-extraction seam.
//!
//! [`EmbeddingExtractor`] is the one capability the comparison pipeline
//! needs from the outside world: RGB image in, zero or more face
//! embeddings out. [`OnnxExtractor`] is the production implementation
//! (detector plus embedder); tests substitute their own.

use std::path::Path;

use image::RgbImage;
use thiserror::Error;

use crate::detect::FaceDetector;
use crate::embed::FaceEmbedder;
use crate::types::Embedding;

/// Why embedding extraction failed outright (as opposed to finding no
/// face, which is an empty result, not an error).
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Extracts face embeddings from an image.
///
/// Returns one embedding per detected face, in the detector's confidence
/// order; an empty vec means the image contained no detectable face.
pub trait EmbeddingExtractor {
    fn embeddings(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, ExtractError>;
}

/// Detector + embedder pipeline backed by ONNX Runtime sessions.
pub struct OnnxExtractor {
    detector: FaceDetector,
    embedder: FaceEmbedder,
}

impl OnnxExtractor {
    /// Load both models, failing fast on a missing or malformed file.
    pub fn load(detector_model: &Path, embedder_model: &Path) -> Result<Self, ExtractError> {
        let detector = FaceDetector::load(detector_model)?;
        let embedder = FaceEmbedder::load(embedder_model)?;
        Ok(Self { detector, embedder })
    }
}

impl EmbeddingExtractor for OnnxExtractor {
    fn embeddings(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, ExtractError> {
        let faces = self.detector.detect(image)?;
        tracing::debug!(count = faces.len(), "faces detected");

        let mut embeddings = Vec::with_capacity(faces.len());
        for face in &faces {
            embeddings.push(self.embedder.embed(image, face)?);
        }
        Ok(embeddings)
    }
}
