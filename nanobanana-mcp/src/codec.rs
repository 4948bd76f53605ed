//! Image payload codec.
//!
//! Converts between image files on disk and the inline base64 + MIME
//! representation used by the Gemini API.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use nanobanana_mcp_common::error::Error;

use crate::api::InlineData;

/// Raw image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Raw file contents
    pub bytes: Vec<u8>,
    /// MIME type derived from the file extension
    pub mime_type: String,
}

impl ImagePayload {
    /// Encode into the API's inline representation.
    pub fn to_inline(&self) -> InlineData {
        InlineData {
            mime_type: self.mime_type.clone(),
            data: BASE64.encode(&self.bytes),
        }
    }

    /// Decode an inline payload.
    ///
    /// # Errors
    /// Returns `Error::Internal` if the data is not valid base64.
    pub fn from_inline(inline: &InlineData) -> Result<Self, Error> {
        let bytes = BASE64
            .decode(inline.data.as_bytes())
            .map_err(|e| Error::internal(format!("Invalid base64 image data: {}", e)))?;
        Ok(Self {
            bytes,
            mime_type: inline.mime_type.clone(),
        })
    }
}

/// MIME type for an image path, by extension (case-insensitive).
///
/// Unknown or missing extensions map to `image/jpeg`.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/jpeg",
    }
}

/// Read an image file.
///
/// # Errors
/// Returns `Error::File` carrying the path if the file cannot be read.
pub async fn load_image(path: &Path) -> Result<ImagePayload, Error> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::file(path, e))?;

    Ok(ImagePayload {
        bytes,
        mime_type: mime_type_for(path).to_string(),
    })
}
