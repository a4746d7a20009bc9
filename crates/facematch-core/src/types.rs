use std::fmt;

use serde::Serialize;

/// Dimensionality of every face embedding produced by this crate.
pub const EMBEDDING_DIM: usize = 128;

/// Face embedding vector (128-dimensional, L2-normalized).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Callers must ensure both vectors have the same length; extra
    /// trailing dimensions on either side are ignored.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Which of the two submitted images a message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    First,
    Second,
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSlot::First => f.write_str("first"),
            ImageSlot::Second => f.write_str("second"),
        }
    }
}

/// Number of faces detected in each submitted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FacesDetected {
    pub image1: usize,
    pub image2: usize,
}

/// Result of comparing the faces in two images.
///
/// Serializes to the service's wire shape: failures carry `error` and
/// `same_person: false` only; scored results carry `same_person`,
/// `confidence`, `distance` and `faces_detected` with no `error` key.
/// The constructors are the only way to build one, so the two shapes
/// cannot be mixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub same_person: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faces_detected: Option<FacesDetected>,
}

impl ComparisonOutcome {
    /// Scored outcome from a raw (unrounded) Euclidean distance.
    ///
    /// The match decision uses the raw distance; rounding applies only to
    /// the reported fields. Confidence is `(1 - distance) * 100` floored
    /// at zero, two decimals; distance is reported at four decimals.
    pub fn from_distance(distance: f64, tolerance: f64, faces: FacesDetected) -> Self {
        Self {
            error: None,
            same_person: distance <= tolerance,
            confidence: Some(round2(((1.0 - distance) * 100.0).max(0.0))),
            distance: Some(round4(distance)),
            faces_detected: Some(faces),
        }
    }

    /// Completed comparison in which one image contained no face.
    pub fn no_face(slot: ImageSlot) -> Self {
        Self::failure(format!("No face found in {slot} image"))
    }

    /// Comparison aborted by an extraction or scoring fault.
    pub fn engine_failure(cause: impl fmt::Display) -> Self {
        Self::failure(format!("Face comparison failed: {cause}"))
    }

    fn failure(message: String) -> Self {
        Self {
            error: Some(message),
            same_person: false,
            confidence: None,
            distance: None,
            faces_detected: None,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
