//! Append-only action log

use std::sync::Arc;

use serde_json::Value;

use crate::db::{schema, LocalStore};
use crate::error::{Error, Result};
use crate::models::{ActionDraft, ActionKind, OfflineAction, SYNCED_DONE, SYNCED_PENDING};

/// Queryable record of deferred mutations awaiting replay.
///
/// Entries are returned unordered by `pending()`; replay callers sort by
/// timestamp ascending to preserve causal ordering of mutations against the
/// same record.
#[derive(Clone)]
pub struct ActionLog {
    store: Arc<LocalStore>,
}

impl ActionLog {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// Stamp a draft with identity and timestamp and append it, pending
    pub async fn record(&self, draft: ActionDraft) -> Result<OfflineAction> {
        let action = OfflineAction {
            id: String::new(),
            kind: draft.kind,
            endpoint: draft.endpoint,
            collection: draft.collection,
            payload: draft.payload,
            local_id: draft.local_id,
            delete_id: draft.delete_id,
            timestamp: 0,
            synced: SYNCED_PENDING,
            local_data: None,
            server_data: None,
        };
        self.insert_stamped(action).await
    }

    /// Append a terminal, informational conflict entry carrying both
    /// versions of the record; pre-marked synced so it is never replayed
    pub async fn record_conflict(
        &self,
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        local_data: Value,
        server_data: Value,
    ) -> Result<OfflineAction> {
        let action = OfflineAction {
            id: String::new(),
            kind: ActionKind::Conflict,
            endpoint: endpoint.into(),
            collection: Some(collection.into()),
            payload: None,
            local_id: None,
            delete_id: None,
            timestamp: 0,
            synced: SYNCED_DONE,
            local_data: Some(local_data),
            server_data: Some(server_data),
        };
        self.insert_stamped(action).await
    }

    /// All entries still awaiting replay, via the `synced` index; may be
    /// empty, order unspecified
    pub async fn pending(&self) -> Result<Vec<OfflineAction>> {
        let docs = self
            .store
            .get_by_index(
                schema::OFFLINE_ACTIONS,
                "synced",
                &Value::from(i64::from(SYNCED_PENDING)),
            )
            .await?;

        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Error::from))
            .collect()
    }

    /// Mark an entry replayed; no-op if it no longer exists
    pub async fn mark_synced(&self, id: &str) -> Result<()> {
        let Some(doc) = self.store.get(schema::OFFLINE_ACTIONS, id).await? else {
            return Ok(());
        };

        let mut action: OfflineAction = serde_json::from_value(doc)?;
        action.synced = SYNCED_DONE;
        self.store
            .update(schema::OFFLINE_ACTIONS, &serde_json::to_value(&action)?)
            .await
    }

    /// Insert with the creation millisecond as the identifier. Two entries
    /// landing in the same millisecond would collide, so the timestamp is
    /// bumped until the insert succeeds, keeping ids monotone with
    /// timestamps.
    async fn insert_stamped(&self, mut action: OfflineAction) -> Result<OfflineAction> {
        let mut now = chrono::Utc::now().timestamp_millis();
        loop {
            action.id = now.to_string();
            action.timestamp = now;

            match self
                .store
                .add(schema::OFFLINE_ACTIONS, &serde_json::to_value(&action)?)
                .await
            {
                Ok(()) => return Ok(action),
                Err(Error::DuplicateKey { .. }) => now += 1,
                Err(e) => return Err(e),
            }
        }
    }
}
