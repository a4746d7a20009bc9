//! Face comparison.
//!
//! [`compare_embeddings`] is the pure decision kernel; [`compare_images`]
//! runs extraction first and folds extraction faults into the outcome, so
//! callers always get a well-formed [`ComparisonOutcome`].

use image::RgbImage;

use crate::extractor::EmbeddingExtractor;
use crate::types::{ComparisonOutcome, Embedding, FacesDetected, ImageSlot};

/// Compare the embeddings extracted from two images.
///
/// Only the first (highest-confidence) embedding of each image takes part
/// in the decision; `faces_detected` reports the full counts. Either side
/// empty yields the corresponding no-face outcome.
pub fn compare_embeddings(
    first: &[Embedding],
    second: &[Embedding],
    tolerance: f64,
) -> ComparisonOutcome {
    if first.is_empty() {
        return ComparisonOutcome::no_face(ImageSlot::First);
    }
    if second.is_empty() {
        return ComparisonOutcome::no_face(ImageSlot::Second);
    }

    let a = &first[0];
    let b = &second[0];
    if a.len() != b.len() {
        return ComparisonOutcome::engine_failure(format!(
            "embedding length mismatch: {} vs {}",
            a.len(),
            b.len()
        ));
    }

    let distance = f64::from(a.euclidean_distance(b));
    let faces = FacesDetected {
        image1: first.len(),
        image2: second.len(),
    };
    ComparisonOutcome::from_distance(distance, tolerance, faces)
}

/// Extract embeddings from both images and compare them.
///
/// Extraction faults (model or inference failures) become an engine
/// failure outcome rather than an error; the comparison itself cannot
/// fail from the caller's point of view.
pub fn compare_images<E>(
    extractor: &mut E,
    first: &RgbImage,
    second: &RgbImage,
    tolerance: f64,
) -> ComparisonOutcome
where
    E: EmbeddingExtractor + ?Sized,
{
    let first_embeddings = match extractor.embeddings(first) {
        Ok(embeddings) => embeddings,
        Err(e) => return ComparisonOutcome::engine_failure(e),
    };
    let second_embeddings = match extractor.embeddings(second) {
        Ok(embeddings) => embeddings,
        Err(e) => return ComparisonOutcome::engine_failure(e),
    };
    compare_embeddings(&first_embeddings, &second_embeddings, tolerance)
}
