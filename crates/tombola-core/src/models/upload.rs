//! Deferred file-upload model

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Lifecycle of a queued upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Completed,
}

/// One file field of a queued multipart submission.
///
/// Bytes are base64-encoded so the entry survives JSON serialization into
/// the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Form field key
    pub key: String,
    /// Original filename
    pub filename: String,
    /// MIME type
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size in bytes of the original file
    pub size: u64,
    /// Base64-encoded content
    pub data: String,
}

impl FileEntry {
    /// Encode raw bytes into a storable entry
    #[must_use]
    pub fn from_bytes(
        key: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self {
            key: key.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            data: STANDARD.encode(bytes),
        }
    }

    /// Decode the stored content back into bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(&self.data)?)
    }
}

/// A queued binary submission awaiting transmission.
///
/// Referenced by exactly one `FILE_UPLOAD` action-log entry via `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpload {
    /// Temporary local identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Plain (non-file) form fields
    pub json_data: Map<String, Value>,
    /// Encoded file fields
    pub file_entries: Vec<FileEntry>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Queue status
    pub status: UploadStatus,
    /// Server response retained after a successful replay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_response: Option<Value>,
}
