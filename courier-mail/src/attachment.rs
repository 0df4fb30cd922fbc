//! Email attachments.

use crate::{MailError, Result};
use lettre::message::header::ContentType;
use serde::{Deserialize, Serialize};
use std::path::Path;

const OCTET_STREAM: &str = "application/octet-stream";

/// Email attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File content.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create a new attachment from bytes.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Create an attachment from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MailError::Validation(format!("Invalid attachment path: {}", path.display())))?
            .to_string();

        let data = std::fs::read(path).map_err(|e| {
            MailError::Validation(format!("Cannot read attachment {}: {}", path.display(), e))
        })?;

        Ok(Self::from_bytes(filename, data))
    }

    /// Create an attachment from bytes with automatic MIME type detection.
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);

        Self::new(filename, content_type, data)
    }

    /// Get the size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Unparsable content types are sent as `application/octet-stream`.
    pub(crate) fn to_lettre(&self) -> Result<lettre::message::SinglePart> {
        let content_type = ContentType::parse(&self.content_type)
            .or_else(|_| ContentType::parse(OCTET_STREAM))
            .map_err(|e| MailError::Validation(format!("{}: {}", self.filename, e)))?;

        Ok(lettre::message::Attachment::new(self.filename.clone()).body(self.data.clone(), content_type))
    }
}

fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}
