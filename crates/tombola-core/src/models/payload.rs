//! Request payload shapes accepted by the router

use serde_json::Value;

/// Body of a create/update operation, decided once at the call site rather
/// than detected downstream by inspecting the value's shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Plain JSON body
    Json(Value),
    /// Form submission carrying one or more binary attachments
    Multipart(MultipartPayload),
}

/// One binary field of a multipart submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub key: String,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A form-shaped payload: plain text fields plus file attachments
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultipartPayload {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain text field
    #[must_use]
    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Add a file field
    #[must_use]
    pub fn file(
        mut self,
        key: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.files.push(FilePart {
            key: key.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        });
        self
    }

    /// Whether any file fields are present
    #[must_use]
    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let payload = MultipartPayload::new()
            .text("name", "Abel")
            .file("photo", "abel.png", "image/png", vec![1, 2, 3]);

        assert_eq!(payload.fields.len(), 1);
        assert_eq!(payload.files.len(), 1);
        assert!(payload.has_files());
        assert!(!MultipartPayload::new().has_files());
    }
}
