//! facematch-core — the face comparison pipeline.
//!
//! Decodes client-supplied images to RGB, extracts 128-dimensional face
//! embeddings (SCRFD-style detection and MobileFaceNet-style embedding
//! via ONNX Runtime), and scores pairs by Euclidean distance against a
//! tolerance. Everything here is synchronous and transport-agnostic;
//! the daemon supplies the HTTP surface and threading.

mod align;
pub mod compare;
pub mod decoder;
pub mod detect;
pub mod embed;
pub mod extractor;
pub mod tolerance;
pub mod types;

pub use decoder::DecodeError;
pub use extractor::{EmbeddingExtractor, ExtractError, OnnxExtractor};
pub use types::{ComparisonOutcome, Embedding, FacesDetected, EMBEDDING_DIM};
