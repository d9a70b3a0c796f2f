//! Synchronization engine
//!
//! Drains the action log in timestamp order after reconnection, replaying
//! each deferred mutation against the live backend. Update conflicts are
//! detected by comparing `updatedAt` timestamps and resolved
//! last-write-wins: the queued local change is applied anyway, with a
//! CONFLICT entry recorded for audit.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::actions::{ActionLog, UploadQueue};
use crate::db::LocalStore;
use crate::error::{Error, Result};
use crate::models::{
    parse_timestamp, ActionKind, MultipartPayload, OfflineAction, Record, SyncReport, ID_FIELD,
    LOCAL_ONLY_FLAG, UPDATED_AT_FIELD,
};
use crate::net::{Connectivity, RemoteBackend};

/// Replays queued offline work against the backend
pub struct SyncEngine {
    store: Arc<LocalStore>,
    log: ActionLog,
    uploads: UploadQueue,
    backend: Arc<dyn RemoteBackend>,
    connectivity: Arc<dyn Connectivity>,
    /// Single-flight guard: a second trigger while a pass is running
    /// (e.g. reconnect flapping) coalesces into a no-op instead of
    /// double-submitting actions not yet marked synced
    in_flight: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<LocalStore>,
        log: ActionLog,
        uploads: UploadQueue,
        backend: Arc<dyn RemoteBackend>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            store,
            log,
            uploads,
            backend,
            connectivity,
            in_flight: Mutex::new(()),
        }
    }

    /// One complete drain-and-replay pass.
    ///
    /// Never partially drains while offline, and one action's failure
    /// never aborts the batch — the entry stays pending for the next pass.
    pub async fn run(&self) -> Result<SyncReport> {
        if !self.connectivity.is_online() {
            return Ok(SyncReport::skipped("Cannot sync while offline"));
        }

        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Sync pass already running, coalescing trigger");
            return Ok(SyncReport::skipped("Sync already in progress"));
        };

        let mut actions = match self.log.pending().await {
            Ok(actions) => actions,
            Err(err) => {
                // A batch-level store failure downgrades to a zeroed
                // report; callers poll the report, they do not branch on Err
                tracing::error!(%err, "Error during sync process");
                return Ok(SyncReport::skipped(format!("Sync error: {err}")));
            }
        };
        // The index returns an unordered bucket; causal order between
        // mutations of the same record comes from the creation timestamp
        actions.sort_by_key(|action| action.timestamp);
        tracing::debug!(count = actions.len(), "Found pending actions to sync");

        let mut success: u32 = 0;
        let mut failed: u32 = 0;
        let mut conflicts: u32 = 0;
        let mut file_uploads: u32 = 0;

        for action in &actions {
            // Conflicts are counted at detection, before the apply, so the
            // report agrees with the audit entry even when the apply fails
            match self.detect_conflict(action).await {
                Ok(true) => conflicts += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(id = %action.id, %err, "Failed to record conflict, will retry");
                    failed += 1;
                    continue;
                }
            }

            match self.replay(action).await {
                Ok(was_file_upload) => {
                    success += 1;
                    if was_file_upload {
                        file_uploads += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(id = %action.id, %err, "Failed to sync action, will retry");
                    failed += 1;
                }
            }
        }

        let report = SyncReport::summarize(success, failed, conflicts, file_uploads);
        tracing::info!(
            success,
            failed,
            conflicts,
            file_uploads,
            "Sync pass completed"
        );
        Ok(report)
    }

    /// Replay one action: live call, synced marker, temporary-id
    /// reconciliation. Returns whether the action carried a file upload.
    async fn replay(&self, action: &OfflineAction) -> Result<bool> {
        let empty = Value::Null;
        let payload = action.payload.as_ref().unwrap_or(&empty);

        let (response, was_file_upload) = match action.kind {
            ActionKind::Post => (self.backend.post(&action.endpoint, payload).await?, false),
            ActionKind::Put => (self.backend.put(&action.endpoint, payload).await?, false),
            ActionKind::Delete => (self.backend.delete(&action.endpoint).await?, false),
            ActionKind::FileUpload => (self.replay_file_upload(action).await?, true),
            // Conflict entries are recorded pre-synced and never reach here
            ActionKind::Conflict => (Value::Null, false),
        };

        self.log.mark_synced(&action.id).await?;

        if matches!(action.kind, ActionKind::Post | ActionKind::FileUpload) {
            if let (Some(server_id), Some(local_id), Some(collection)) = (
                response.get(ID_FIELD).and_then(Value::as_str),
                action.local_id.as_deref(),
                action.collection.as_deref(),
            ) {
                self.reconcile_local_id(collection, local_id, server_id)
                    .await?;
            }
        }

        Ok(was_file_upload)
    }

    /// Fetch the server-side version of a queued PUT's target and compare
    /// timestamps. A failed pre-check is treated as "no conflict detected"
    /// rather than a sync failure (known false-negative risk).
    async fn detect_conflict(&self, action: &OfflineAction) -> Result<bool> {
        if action.kind != ActionKind::Put {
            return Ok(false);
        }
        let Some(payload) = &action.payload else {
            return Ok(false);
        };
        let Some(collection) = &action.collection else {
            return Ok(false);
        };
        if payload.get(ID_FIELD).and_then(Value::as_str).is_none() {
            return Ok(false);
        }

        let server_item = match self.backend.get(&action.endpoint).await {
            Ok(item) => item,
            Err(err) => {
                tracing::debug!(%err, "Could not check for conflicts, proceeding with update");
                return Ok(false);
            }
        };

        if !server_newer(payload, &server_item) {
            return Ok(false);
        }

        tracing::warn!(
            endpoint = %action.endpoint,
            "Conflict detected, resolving with last-write-wins"
        );
        self.log
            .record_conflict(&action.endpoint, collection, payload.clone(), server_item)
            .await?;
        Ok(true)
    }

    /// Rebuild the multipart submission from its encoded queue entry and
    /// POST it; the entry becomes `completed` and keeps the server response
    async fn replay_file_upload(&self, action: &OfflineAction) -> Result<Value> {
        let collection = action
            .collection
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("FILE_UPLOAD action without collection".into()))?;
        let local_id = action
            .local_id
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("FILE_UPLOAD action without local id".into()))?;

        let upload = self
            .uploads
            .load(collection, local_id)
            .await?
            .ok_or_else(|| Error::InvalidInput(format!("Pending upload not found: {local_id}")))?;

        let mut form = MultipartPayload::new();
        for (key, value) in &upload.json_data {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), text);
        }
        for entry in &upload.file_entries {
            form = form.file(&entry.key, &entry.filename, &entry.mime_type, entry.decode()?);
        }

        let response = self.backend.post_multipart(&action.endpoint, &form).await?;
        self.uploads
            .complete(collection, upload, response.clone())
            .await?;
        Ok(response)
    }

    /// Replace the record stored under a temporary identifier with one
    /// under the server-assigned identifier, carrying forward any fields
    /// applied since creation
    async fn reconcile_local_id(
        &self,
        collection: &str,
        local_id: &str,
        server_id: &str,
    ) -> Result<()> {
        let Some(doc) = self.store.get(collection, local_id).await? else {
            return Ok(());
        };

        let mut record = Record::from_value(doc)?;
        record.set_id(server_id);
        record.remove(LOCAL_ONLY_FLAG);
        self.store.update(collection, &record.to_value()).await?;
        self.store.delete(collection, local_id).await?;

        tracing::debug!(collection, local_id, server_id, "Reconciled temporary id");
        Ok(())
    }
}

/// True when the server's `updatedAt` is strictly newer than the queued
/// payload's
fn server_newer(local: &Value, server: &Value) -> bool {
    let local_at = local.get(UPDATED_AT_FIELD).and_then(parse_timestamp);
    let server_at = server.get(UPDATED_AT_FIELD).and_then(parse_timestamp);
    match (local_at, server_at) {
        (Some(local_at), Some(server_at)) => server_at > local_at,
        _ => false,
    }
}
