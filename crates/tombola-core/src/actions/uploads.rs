//! Durable queue for binary submissions
//!
//! Binary blobs cannot traverse the JSON mutation-replay path, so file
//! uploads are split: plain fields and base64-encoded file entries persist
//! in a per-entity upload collection, referenced by a `FILE_UPLOAD` action
//! log entry.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::db::{schema, LocalStore};
use crate::error::Result;
use crate::models::{
    new_local_id, ActionDraft, FileEntry, MultipartPayload, PendingUpload, Record, UploadStatus,
    LOCAL_ONLY_FLAG, PENDING_UPLOAD_FLAG,
};

use super::log::ActionLog;

/// Holding area for uploads awaiting transmission
#[derive(Clone)]
pub struct UploadQueue {
    store: Arc<LocalStore>,
    log: ActionLog,
}

impl UploadQueue {
    pub fn new(store: Arc<LocalStore>, log: ActionLog) -> Self {
        Self { store, log }
    }

    /// Queue a multipart submission for the given entity (`participants`,
    /// `controllers`, `prizes`), optionally scoped to a game.
    ///
    /// Returns a placeholder that mimics a server-created record so calling
    /// UI code can proceed optimistically.
    pub async fn enqueue(
        &self,
        entity: &str,
        payload: MultipartPayload,
        context_id: Option<&str>,
    ) -> Result<Record> {
        let collection = schema::upload_collection_for(entity)?;
        let local_id = new_local_id();

        let mut json_data = Map::new();
        for (key, value) in &payload.fields {
            json_data.insert(key.clone(), Value::String(value.clone()));
        }
        if let Some(game_id) = context_id {
            json_data.insert("gameId".to_string(), Value::String(game_id.to_string()));
        }

        let file_entries: Vec<FileEntry> = payload
            .files
            .iter()
            .map(|f| FileEntry::from_bytes(&f.key, &f.filename, &f.mime_type, &f.bytes))
            .collect();
        let has_files = !file_entries.is_empty();

        let upload = PendingUpload {
            id: local_id.clone(),
            json_data: json_data.clone(),
            file_entries,
            created_at: chrono::Utc::now().timestamp_millis(),
            status: UploadStatus::Pending,
            server_response: None,
        };
        self.store
            .update(collection, &serde_json::to_value(&upload)?)
            .await?;

        let endpoint = context_id.map_or_else(
            || format!("/{entity}"),
            |game_id| format!("/games/{game_id}/{entity}"),
        );
        self.log
            .record(ActionDraft::file_upload(endpoint, collection, &local_id))
            .await?;

        tracing::debug!(local_id, collection, "File upload queued for later");

        let mut placeholder = Record::from_value(Value::Object(json_data))?;
        placeholder.set_id(&local_id);
        placeholder.set(
            "imageUrl",
            if has_files {
                Value::String("pending_upload".to_string())
            } else {
                Value::Null
            },
        );
        placeholder.set(LOCAL_ONLY_FLAG, Value::Bool(true));
        placeholder.set(PENDING_UPLOAD_FLAG, Value::Bool(true));
        Ok(placeholder)
    }

    /// Load a queue entry by its local identifier
    pub async fn load(&self, collection: &str, id: &str) -> Result<Option<PendingUpload>> {
        match self.store.get(collection, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Mark an entry completed, retaining the server response for
    /// inspection
    pub async fn complete(
        &self,
        collection: &str,
        mut upload: PendingUpload,
        server_response: Value,
    ) -> Result<PendingUpload> {
        upload.status = UploadStatus::Completed;
        upload.server_response = Some(server_response);
        self.store
            .update(collection, &serde_json::to_value(&upload)?)
            .await?;
        Ok(upload)
    }

    /// Number of entries still pending in one upload collection
    pub async fn pending_count(&self, collection: &str) -> Result<usize> {
        let pending = self
            .store
            .get_by_index(collection, "status", &Value::String("pending".to_string()))
            .await?;
        Ok(pending.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup() -> (Arc<LocalStore>, ActionLog, UploadQueue) {
        let store = Arc::new(LocalStore::open_in_memory().await.unwrap());
        let log = ActionLog::new(Arc::clone(&store));
        let queue = UploadQueue::new(Arc::clone(&store), log.clone());
        (store, log, queue)
    }

    fn photo_payload() -> MultipartPayload {
        MultipartPayload::new()
            .text("name", "Abel")
            .file("photo", "abel.png", "image/png", b"png bytes".to_vec())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_returns_optimistic_placeholder() {
        let (_store, _log, queue) = setup().await;

        let placeholder = queue
            .enqueue("participants", photo_payload(), Some("g1"))
            .await
            .unwrap();

        assert!(placeholder.is_local_only());
        assert_eq!(placeholder.get("name"), Some(&json!("Abel")));
        assert_eq!(placeholder.get("gameId"), Some(&json!("g1")));
        assert_eq!(placeholder.get("imageUrl"), Some(&json!("pending_upload")));
        assert_eq!(placeholder.get(PENDING_UPLOAD_FLAG), Some(&json!(true)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_persists_entry_and_action() {
        let (_store, log, queue) = setup().await;

        let placeholder = queue
            .enqueue("participants", photo_payload(), Some("g1"))
            .await
            .unwrap();
        let local_id = placeholder.id().unwrap();

        let entry = queue
            .load(schema::PARTICIPANTS_UPLOADS, local_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.status, UploadStatus::Pending);
        assert_eq!(entry.file_entries.len(), 1);
        assert_eq!(entry.file_entries[0].decode().unwrap(), b"png bytes");

        let pending = log.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, ActionKind::FileUpload);
        assert_eq!(pending[0].endpoint, "/games/g1/participants");
        assert_eq!(pending[0].local_id.as_deref(), Some(local_id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enqueue_without_context_uses_flat_endpoint() {
        let (_store, log, queue) = setup().await;

        queue
            .enqueue("controllers", MultipartPayload::new().text("username", "staff1"), None)
            .await
            .unwrap();

        let pending = log.pending().await.unwrap();
        assert_eq!(pending[0].endpoint, "/controllers");
        assert_eq!(
            pending[0].collection.as_deref(),
            Some(schema::CONTROLLERS_UPLOADS)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_complete_updates_status_and_keeps_response() {
        let (_store, _log, queue) = setup().await;

        let placeholder = queue
            .enqueue("participants", photo_payload(), Some("g1"))
            .await
            .unwrap();
        let local_id = placeholder.id().unwrap().to_string();

        let entry = queue
            .load(schema::PARTICIPANTS_UPLOADS, &local_id)
            .await
            .unwrap()
            .unwrap();
        queue
            .complete(
                schema::PARTICIPANTS_UPLOADS,
                entry,
                json!({"_id": "srv1", "imageUrl": "/img/srv1.png"}),
            )
            .await
            .unwrap();

        let reloaded = queue
            .load(schema::PARTICIPANTS_UPLOADS, &local_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.status, UploadStatus::Completed);
        assert_eq!(reloaded.server_response.unwrap()["_id"], json!("srv1"));
        assert_eq!(
            queue.pending_count(schema::PARTICIPANTS_UPLOADS).await.unwrap(),
            0
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pending_count() {
        let (_store, _log, queue) = setup().await;

        queue
            .enqueue("participants", photo_payload(), Some("g1"))
            .await
            .unwrap();
        queue
            .enqueue("participants", photo_payload(), Some("g2"))
            .await
            .unwrap();

        assert_eq!(
            queue.pending_count(schema::PARTICIPANTS_UPLOADS).await.unwrap(),
            2
        );
        assert_eq!(
            queue.pending_count(schema::PRIZES_UPLOADS).await.unwrap(),
            0
        );
    }
}
