// SPDX-License-Identifier: MIT

//! Image staging: format sniffing, base64 payload, preview reference

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use serde::Serialize;

use crate::{PlatescanError, Result};

/// An uploaded image prepared for analysis.
///
/// `data` is the raw bytes base64-encoded with no data-URI prefix, the form
/// the Gemini inline payload expects. `preview` is a data URI the UI can
/// display directly.
#[derive(Debug, Clone, Serialize)]
pub struct StagedImage {
    pub data: String,
    pub mime_type: String,
    pub preview: String,
}

/// Map a sniffed format onto its MIME type.
///
/// Only the formats the recognition endpoint accepts are allowed; anything
/// else is rejected even if the `image` crate could decode it.
fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Stage raw upload bytes for analysis.
///
/// The format is sniffed from the bytes rather than taken from the client's
/// declared content type. Fails on unreadable or unsupported data, so a
/// rejected upload never leaves a stale payload behind.
pub fn stage_image(bytes: &[u8]) -> Result<StagedImage> {
    let format = image::guess_format(bytes)
        .map_err(|_| PlatescanError::UnsupportedFormat("unrecognized image data".to_string()))?;

    let mime_type = mime_for(format)
        .ok_or_else(|| PlatescanError::UnsupportedFormat(format!("{:?}", format)))?;

    // A valid magic number is not enough; reject files the decoder cannot read
    image::load_from_memory(bytes)?;

    let data = general_purpose::STANDARD.encode(bytes);
    let preview = format!("data:{};base64,{}", mime_type, data);

    Ok(StagedImage {
        data,
        mime_type: mime_type.to_string(),
        preview,
    })
}
