//! HTTP handlers for the comparison service.
//!
//! Three endpoints: `GET /health`, `POST /compare` (JSON with base64
//! images) and `POST /compare-files` (multipart file upload). Both
//! compare endpoints return the same outcome shape; client mistakes
//! surface as 400s in that shape too.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use facematch_core::{decoder, tolerance, ComparisonOutcome};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Exact message for a JSON request missing either image field.
pub const MISSING_FIELDS_MESSAGE: &str =
    "Missing required fields. Please provide 'image1' and 'image2' as base64 strings";

/// Exact message for a multipart request missing either file.
pub const MISSING_FILES_MESSAGE: &str = "Please upload both image1 and image2 files";

const SERVICE_NAME: &str = "face-comparison";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// POST /compare request body. Both images are base64 strings, raw or
/// data-URL prefixed; tolerance is optional.
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub image1: Option<String>,
    #[serde(default)]
    pub image2: Option<String>,
    #[serde(default)]
    pub tolerance: Option<f64>,
}

/// POST /compare
pub async fn compare(
    State(state): State<AppState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<ComparisonOutcome>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;

    let (Some(image1), Some(image2)) = (request.image1, request.image2) else {
        return Err(ApiError::BadRequest(MISSING_FIELDS_MESSAGE.to_string()));
    };

    let tolerance = tolerance::resolve(request.tolerance);
    let first = decoder::decode_base64_image(&image1)?;
    let second = decoder::decode_base64_image(&image2)?;

    run_comparison(&state, first, second, tolerance).await
}

/// POST /compare-files
///
/// Multipart fields: `image1` and `image2` (raw image files, required)
/// and `tolerance` (optional text). Unknown fields are ignored.
pub async fn compare_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ComparisonOutcome>, ApiError> {
    let mut image1 = None;
    let mut image2 = None;
    let mut tolerance_text = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_fault)? {
        match field.name() {
            Some("image1") => {
                image1 = Some(field.bytes().await.map_err(multipart_fault)?);
            }
            Some("image2") => {
                image2 = Some(field.bytes().await.map_err(multipart_fault)?);
            }
            Some("tolerance") => {
                tolerance_text = Some(field.text().await.map_err(multipart_fault)?);
            }
            _ => {}
        }
    }

    let (Some(image1), Some(image2)) = (image1, image2) else {
        return Err(ApiError::BadRequest(MISSING_FILES_MESSAGE.to_string()));
    };

    // A tolerance that parses but is out of range silently defaults;
    // text that does not parse at all is a processing fault.
    let tolerance = match tolerance_text {
        None => tolerance::resolve(None),
        Some(text) => {
            let value = text.trim().parse::<f64>().map_err(|_| {
                ApiError::FileProcessing(format!("invalid tolerance value '{text}'"))
            })?;
            tolerance::resolve(Some(value))
        }
    };

    let first = decoder::decode_image_bytes(&image1)?;
    let second = decoder::decode_image_bytes(&image2)?;

    run_comparison(&state, first, second, tolerance).await
}

fn multipart_fault(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::FileProcessing(e.to_string())
    }
}

async fn run_comparison(
    state: &AppState,
    first: RgbImage,
    second: RgbImage,
    tolerance: f64,
) -> Result<Json<ComparisonOutcome>, ApiError> {
    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        tolerance,
        first_dims = ?first.dimensions(),
        second_dims = ?second.dimensions(),
        "comparison requested"
    );

    let outcome = state.engine.compare(first, second, tolerance).await?;

    match &outcome.error {
        Some(error) => {
            tracing::info!(%request_id, error = %error, "comparison finished without a score")
        }
        None => tracing::info!(
            %request_id,
            same_person = outcome.same_person,
            distance = ?outcome.distance,
            "comparison finished"
        ),
    }

    Ok(Json(outcome))
}
