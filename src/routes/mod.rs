//! API route handlers, grouped per resource. Shared pieces live here: the
//! response envelopes and the multipart form collector used by every
//! image-carrying endpoint.

pub mod auth;
pub mod blogs;
pub mod health;
pub mod services;
pub mod shows;
pub mod users;

use axum::extract::Multipart;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::ApiError;
use crate::media::MediaStore;
use crate::state::AppState;

const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A decoded `multipart/form-data` body: text fields by name plus at most one
/// image part (field name `image`).
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub image: Option<Bytes>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

/// Drain a multipart body into [`FormData`]. The `image` part is size-capped
/// and content-sniffed; any other part is read as UTF-8 text.
pub async fn collect_form(mut multipart: Multipart) -> Result<FormData, ApiError> {
    let mut form = FormData::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("Failed to read file data".to_string()))?;
            if bytes.is_empty() {
                continue;
            }
            if bytes.len() > MAX_IMAGE_SIZE {
                return Err(ApiError::Validation(
                    "File too large. Maximum size is 5MB.".to_string(),
                ));
            }
            if validate_image_magic_bytes(&bytes).is_none() {
                return Err(ApiError::Validation(
                    "File content does not match an allowed image type.".to_string(),
                ));
            }
            form.image = Some(bytes);
        } else {
            let value = field
                .text()
                .await
                .map_err(|_| ApiError::Validation("Invalid multipart data".to_string()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Push an optional image to the media host and hand back its public URL.
pub async fn store_image(
    state: &AppState,
    image: Option<Bytes>,
    folder: &str,
) -> Result<Option<String>, ApiError> {
    match image {
        Some(bytes) => {
            let url = state.media.store(bytes, folder).await?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_bytes_accept_known_formats() {
        assert_eq!(
            validate_image_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("image/jpeg")
        );
        assert_eq!(
            validate_image_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
            Some("image/png")
        );
        assert_eq!(
            validate_image_magic_bytes(&[0x47, 0x49, 0x46, 0x38, 0x39]),
            Some("image/gif")
        );
        assert_eq!(
            validate_image_magic_bytes(&[
                0x52, 0x49, 0x46, 0x46, 0x00, 0x00, 0x00, 0x00, 0x57, 0x45, 0x42, 0x50
            ]),
            Some("image/webp")
        );
    }

    #[test]
    fn test_magic_bytes_reject_other_content() {
        assert_eq!(validate_image_magic_bytes(b"<svg></svg>"), None);
        assert_eq!(validate_image_magic_bytes(&[0xFF, 0xD8]), None);
        assert_eq!(validate_image_magic_bytes(b"plain text"), None);
    }

    #[test]
    fn test_form_data_text_treats_empty_as_absent() {
        let mut form = FormData::default();
        form.fields.insert("title".to_string(), String::new());
        form.fields.insert("body".to_string(), "hello".to_string());
        assert_eq!(form.text("title"), None);
        assert_eq!(form.text("body"), Some("hello"));
        assert_eq!(form.text("missing"), None);
    }
}
