//! Deferred-mutation action model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pending marker for the `synced` index.
///
/// Stored as an integer rather than a boolean so the expression index on
/// `synced` has a single, queryable representation.
pub const SYNCED_PENDING: u8 = 0;

/// Replayed marker for the `synced` index
pub const SYNCED_DONE: u8 = 1;

/// Kind of deferred mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Post,
    Put,
    Delete,
    FileUpload,
    /// Terminal, informational record of a detected conflict; never replayed
    Conflict,
}

/// One mutation recorded while disconnected, awaiting replay.
///
/// `id` is the creation timestamp in Unix milliseconds rendered as a string;
/// replay order is by `timestamp` ascending to preserve causal ordering of
/// mutations against the same record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineAction {
    /// Synthetic identifier (creation Unix ms as string)
    pub id: String,
    /// Mutation kind
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Target endpoint path
    pub endpoint: String,
    /// Collection the mutation applies to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Request body for POST/PUT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Temporary local identifier to reconcile after a create syncs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    /// Identifier of the record a DELETE removes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_id: Option<String>,
    /// Creation timestamp (Unix ms)
    pub timestamp: i64,
    /// 0 = pending, 1 = synced (integer-encoded for the index)
    pub synced: u8,
    /// Locally-held version at conflict time (CONFLICT entries only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_data: Option<Value>,
    /// Server-held version at conflict time (CONFLICT entries only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_data: Option<Value>,
}

impl OfflineAction {
    /// Whether this entry still awaits replay
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.synced == SYNCED_PENDING
    }
}

/// An action as submitted by the router, before the log stamps identity
/// and timestamp onto it
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDraft {
    pub kind: ActionKind,
    pub endpoint: String,
    pub collection: Option<String>,
    pub payload: Option<Value>,
    pub local_id: Option<String>,
    pub delete_id: Option<String>,
}

impl ActionDraft {
    /// Deferred create; `local_id` names the temporary cached record
    pub fn post(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        payload: Value,
        local_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActionKind::Post,
            endpoint: endpoint.into(),
            collection: Some(collection.into()),
            payload: Some(payload),
            local_id: Some(local_id.into()),
            delete_id: None,
        }
    }

    /// Deferred update
    pub fn put(endpoint: impl Into<String>, collection: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: ActionKind::Put,
            endpoint: endpoint.into(),
            collection: Some(collection.into()),
            payload: Some(payload),
            local_id: None,
            delete_id: None,
        }
    }

    /// Deferred delete
    pub fn delete(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        delete_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActionKind::Delete,
            endpoint: endpoint.into(),
            collection: Some(collection.into()),
            payload: None,
            local_id: None,
            delete_id: Some(delete_id.into()),
        }
    }

    /// Deferred multipart submission; `local_id` references the upload
    /// queue entry
    pub fn file_upload(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        local_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActionKind::FileUpload,
            endpoint: endpoint.into(),
            collection: Some(collection.into()),
            payload: None,
            local_id: Some(local_id.into()),
            delete_id: None,
        }
    }
}
