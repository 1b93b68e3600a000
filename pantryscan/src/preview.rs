//! Image loading and inline preview encoding.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::Result;

/// Extensions the backend accepts, mapped to their MIME types.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

/// An image file loaded into memory for previewing and uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    file_name: String,
    bytes: Vec<u8>,
}

impl ImageFile {
    /// Load an image from disk.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self { file_name, bytes })
    }

    /// Build from bytes already in memory.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type by extension, if it is on the allowlist.
    pub fn mime(&self) -> Option<&'static str> {
        let (_, extension) = self.file_name.rsplit_once('.')?;
        let extension = extension.to_ascii_lowercase();
        ALLOWED_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, mime)| *mime)
    }

    /// Encode as a `data:` URL usable as an inline image source.
    ///
    /// Files outside the allowlist encode with a generic MIME type.
    pub fn to_data_url(&self) -> String {
        let mime = self.mime().unwrap_or("application/octet-stream");
        format!("data:{};base64,{}", mime, STANDARD.encode(&self.bytes))
    }
}
