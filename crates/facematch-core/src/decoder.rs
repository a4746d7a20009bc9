//! Image ingestion.
//!
//! Accepts the formats clients actually send: raw base64, base-64 data
//! URLs (`data:image/png;base64,...`) and raw bytes from file uploads.
//! Every image is normalized to 8-bit RGB before it reaches the face
//! pipeline, whatever the source format or color model.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbImage;
use thiserror::Error;

/// Why an image payload could not be turned into pixels.
///
/// Every variant renders with the `Failed to decode image:` prefix, which
/// is part of the service's client-visible contract.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to decode image: empty image payload")]
    Empty,
    #[error("Failed to decode image: data URL is missing its comma separator")]
    MalformedDataUrl,
    #[error("Failed to decode image: invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a base64 string (optionally a data URL) into an RGB image.
///
/// ASCII whitespace is stripped first, so line-wrapped base64 from web
/// clients decodes cleanly.
pub fn decode_base64_image(payload: &str) -> Result<RgbImage, DecodeError> {
    let body = match payload.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((_, encoded)) => encoded,
            None => return Err(DecodeError::MalformedDataUrl),
        },
        None => payload,
    };

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(DecodeError::Empty);
    }

    let bytes = BASE64.decode(compact.as_bytes())?;
    decode_image_bytes(&bytes)
}

/// Decode raw image bytes (PNG, JPEG, ...) into an RGB image.
///
/// The format is sniffed from the bytes; alpha channels, grayscale and
/// palette images all convert to RGB.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder, Rgb, Rgba, RgbaImage};

    fn rgb_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    fn rgba_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
            .unwrap();
        buffer
    }

    #[test]
    fn test_decode_plain_base64() {
        let png = rgb_png(4, 3, [10, 20, 30]);
        let decoded = decode_base64_image(&BASE64.encode(&png)).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_decode_data_url() {
        let png = rgb_png(2, 2, [255, 0, 0]);
        let payload = format!("data:image/png;base64,{}", BASE64.encode(&png));
        let decoded = decode_base64_image(&payload).unwrap();
        assert_eq!(decoded.dimensions(), (2, 2));
    }

    #[test]
    fn test_decode_tolerates_wrapped_base64() {
        let png = rgb_png(2, 2, [0, 128, 255]);
        let encoded = BASE64.encode(&png);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(8)
            .flat_map(|chunk| chunk.iter().copied().chain(*b"\r\n"))
            .map(char::from)
            .collect();
        assert!(decode_base64_image(&wrapped).is_ok());
    }

    #[test]
    fn test_decode_data_url_without_comma() {
        let err = decode_base64_image("data:image/png;base64").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedDataUrl));
        assert!(err.to_string().starts_with("Failed to decode image:"));
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(matches!(decode_base64_image(""), Err(DecodeError::Empty)));
        assert!(matches!(
            decode_base64_image("data:image/png;base64,"),
            Err(DecodeError::Empty)
        ));
        assert!(matches!(decode_image_bytes(&[]), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_base64_image("!!!not-base64!!!").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
        assert!(err.to_string().starts_with("Failed to decode image:"));
    }

    #[test]
    fn test_decode_valid_base64_garbage_bytes() {
        let err = decode_base64_image(&BASE64.encode(b"these are not pixels")).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
        assert!(err.to_string().starts_with("Failed to decode image:"));
    }

    #[test]
    fn test_rgba_converts_to_rgb() {
        let png = rgba_png(3, 3, [1, 2, 3, 200]);
        let decoded = decode_image_bytes(&png).unwrap();
        assert_eq!(decoded.dimensions(), (3, 3));
        assert_eq!(decoded.get_pixel(1, 1).0, [1, 2, 3]);
    }

    #[test]
    fn test_grayscale_converts_to_rgb() {
        let img = image::GrayImage::from_pixel(5, 4, image::Luma([77]));
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(img.as_raw(), 5, 4, ExtendedColorType::L8)
            .unwrap();
        let decoded = decode_image_bytes(&buffer).unwrap();
        assert_eq!(decoded.get_pixel(2, 2).0, [77, 77, 77]);
    }
}
