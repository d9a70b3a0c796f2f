//! Network-aware request router
//!
//! Every operation resolves against the live backend when online and
//! against the local store when offline, recording deferred mutations in
//! the action log for later replay. Callers never branch on connectivity
//! themselves.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::actions::{ActionLog, UploadQueue};
use crate::db::{schema, LocalStore};
use crate::error::{Error, Result};
use crate::models::{
    new_local_id, ActionDraft, MultipartPayload, OfflineLimitations, Payload, Record, SyncReport,
    ID_FIELD,
};
use crate::net::{Connectivity, RemoteBackend, SessionStore};
use crate::sync::{offline_limitations, SyncEngine};

/// How a read resolves against the local store when the backend is
/// unreachable
enum GetTarget {
    All,
    ById(String),
    ByIndex { field: &'static str, value: Value },
}

/// Entry point for all entity operations.
///
/// Hold behind an [`Arc`]; [`OfflineApi::spawn_reconnect_sync`] needs one to
/// keep the watcher task alive independently of the caller.
pub struct OfflineApi {
    store: Arc<LocalStore>,
    log: ActionLog,
    uploads: UploadQueue,
    backend: Arc<dyn RemoteBackend>,
    connectivity: Arc<dyn Connectivity>,
    session: SessionStore,
    engine: SyncEngine,
}

impl OfflineApi {
    pub fn new(
        store: Arc<LocalStore>,
        backend: Arc<dyn RemoteBackend>,
        connectivity: Arc<dyn Connectivity>,
        session: SessionStore,
    ) -> Self {
        let log = ActionLog::new(Arc::clone(&store));
        let uploads = UploadQueue::new(Arc::clone(&store), log.clone());
        let engine = SyncEngine::new(
            Arc::clone(&store),
            log.clone(),
            uploads.clone(),
            Arc::clone(&backend),
            Arc::clone(&connectivity),
        );
        Self {
            store,
            log,
            uploads,
            backend,
            connectivity,
            session,
            engine,
        }
    }

    /// Bearer credential attached to live calls
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Synchronous connectivity snapshot
    #[must_use]
    pub fn check_online_status(&self) -> bool {
        self.connectivity.is_online()
    }

    // ----- games -----

    pub async fn fetch_games(&self) -> Result<Value> {
        self.get_request("/games", schema::GAMES, GetTarget::All)
            .await
    }

    pub async fn get_game(&self, game_id: &str) -> Result<Value> {
        self.get_request(
            &format!("/games/{game_id}"),
            schema::GAMES,
            GetTarget::ById(game_id.to_string()),
        )
        .await
    }

    pub async fn create_game(&self, game: Value) -> Result<Value> {
        self.post_request("/games", schema::GAMES, game).await
    }

    pub async fn update_game(&self, game_id: &str, changes: Value) -> Result<Value> {
        self.put_request(
            &format!("/games/{game_id}"),
            schema::GAMES,
            with_id(changes, game_id)?,
        )
        .await
    }

    pub async fn delete_game(&self, game_id: &str) -> Result<Value> {
        self.delete_request(&format!("/games/{game_id}"), schema::GAMES, game_id)
            .await
    }

    /// Sum of `totalRevenue` across locally cached games; absent fields and
    /// read failures degrade to zero
    pub async fn total_revenue(&self) -> Value {
        let games = self.store.get_all(schema::GAMES).await.unwrap_or_default();
        let total: f64 = games
            .iter()
            .map(|game| game.get("totalRevenue").and_then(Value::as_f64).unwrap_or(0.0))
            .sum();
        json!({ "totalRevenue": total })
    }

    // ----- participants -----

    pub async fn get_participants(&self, game_id: &str) -> Result<Value> {
        self.get_request(
            &format!("/games/{game_id}/participants"),
            schema::PARTICIPANTS,
            GetTarget::ByIndex {
                field: "gameId",
                value: Value::String(game_id.to_string()),
            },
        )
        .await
    }

    /// Create a participant within a game. A multipart payload while offline
    /// is diverted through the upload queue instead of the action log.
    pub async fn create_participant(&self, game_id: &str, payload: Payload) -> Result<Value> {
        let endpoint = format!("/games/{game_id}/participants");
        match payload {
            Payload::Json(mut body) => {
                if let Value::Object(map) = &mut body {
                    map.insert("gameId".to_string(), Value::String(game_id.to_string()));
                }
                self.post_request(&endpoint, schema::PARTICIPANTS, body)
                    .await
            }
            Payload::Multipart(form) => {
                if self.connectivity.is_online() {
                    let data = self.backend.post_multipart(&endpoint, &form).await?;
                    self.cache_read(schema::PARTICIPANTS, &data).await?;
                    Ok(data)
                } else {
                    let placeholder = self
                        .uploads
                        .enqueue("participants", form, Some(game_id))
                        .await?;
                    Ok(placeholder.into_value())
                }
            }
        }
    }

    pub async fn update_participant(&self, participant_id: &str, changes: Value) -> Result<Value> {
        self.put_request(
            &format!("/participants/{participant_id}"),
            schema::PARTICIPANTS,
            with_id(changes, participant_id)?,
        )
        .await
    }

    pub async fn delete_participant(&self, participant_id: &str) -> Result<Value> {
        self.delete_request(
            &format!("/participants/{participant_id}"),
            schema::PARTICIPANTS,
            participant_id,
        )
        .await
    }

    // ----- users and game controllers -----

    pub async fn fetch_users(&self) -> Result<Value> {
        self.get_request("/users", schema::USERS, GetTarget::All)
            .await
    }

    pub async fn update_user(&self, user_id: &str, changes: Value) -> Result<Value> {
        self.put_request(
            &format!("/users/{user_id}"),
            schema::USERS,
            with_id(changes, user_id)?,
        )
        .await
    }

    /// Controllers are users with the `gameController` role; offline reads
    /// resolve through the role index
    pub async fn get_game_controllers(&self) -> Result<Value> {
        self.get_request(
            "/admin/controllers",
            schema::USERS,
            GetTarget::ByIndex {
                field: "role",
                value: Value::String("gameController".to_string()),
            },
        )
        .await
    }

    pub async fn create_game_controller(&self, payload: Payload) -> Result<Value> {
        match payload {
            Payload::Json(body) => {
                self.post_request("/admin/controllers", schema::USERS, body)
                    .await
            }
            Payload::Multipart(form) => {
                if self.connectivity.is_online() {
                    let data = self.backend.post_multipart("/admin/controllers", &form).await?;
                    // The controller endpoint nests the created user
                    let created = data.get("user").unwrap_or(&data);
                    self.cache_read(schema::USERS, created).await?;
                    Ok(data)
                } else {
                    let placeholder = self.uploads.enqueue("controllers", form, None).await?;
                    Ok(placeholder.into_value())
                }
            }
        }
    }

    pub async fn update_game_controller(&self, user_id: &str, changes: Value) -> Result<Value> {
        self.put_request(
            &format!("/admin/controllers/{user_id}"),
            schema::USERS,
            with_id(changes, user_id)?,
        )
        .await
    }

    pub async fn delete_game_controller(&self, user_id: &str) -> Result<Value> {
        self.delete_request(&format!("/admin/controllers/{user_id}"), schema::USERS, user_id)
            .await
    }

    // ----- uploads, sync, limitations -----

    /// Queue a multipart submission for transmission on the next sync pass
    pub async fn queue_file_upload(
        &self,
        entity: &str,
        payload: MultipartPayload,
        context_id: Option<&str>,
    ) -> Result<Value> {
        let placeholder = self.uploads.enqueue(entity, payload, context_id).await?;
        Ok(placeholder.into_value())
    }

    /// Replay everything recorded while offline
    pub async fn sync_offline_actions(&self) -> Result<SyncReport> {
        self.engine.run().await
    }

    /// What is pending or degraded right now
    pub async fn offline_limitations(&self) -> OfflineLimitations {
        offline_limitations(&self.log, &self.uploads).await
    }

    /// Watch connectivity and run a sync pass on each offline-to-online
    /// edge. The task ends when the connectivity source is dropped.
    pub fn spawn_reconnect_sync(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let api = Arc::clone(self);
        let mut rx = api.connectivity.subscribe();
        tokio::spawn(async move {
            let mut was_online = *rx.borrow();
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online && !was_online {
                    tracing::info!("Back online, attempting to sync");
                    if let Err(err) = api.sync_offline_actions().await {
                        tracing::warn!(%err, "Reconnect sync failed");
                    }
                }
                was_online = online;
            }
        })
    }

    // ----- generic routing -----

    /// Live read with cache write-through; on live failure, silently fall
    /// back to cached data and rethrow the original error only if the
    /// fallback fails too. Offline goes straight to the store.
    async fn get_request(
        &self,
        endpoint: &str,
        collection: &'static str,
        target: GetTarget,
    ) -> Result<Value> {
        if !self.connectivity.is_online() {
            tracing::debug!(endpoint, "Offline mode for GET");
            return self.local_get(collection, &target).await;
        }

        match self.backend.get(endpoint).await {
            Ok(data) => {
                self.cache_read(collection, &data).await?;
                Ok(data)
            }
            Err(err) => {
                tracing::warn!(endpoint, %err, "Live request failed, falling back to cached data");
                match self.local_get(collection, &target).await {
                    Ok(data) => Ok(data),
                    Err(fallback_err) => {
                        tracing::warn!(%fallback_err, "Cached fallback also failed");
                        Err(err)
                    }
                }
            }
        }
    }

    async fn local_get(&self, collection: &str, target: &GetTarget) -> Result<Value> {
        match target {
            GetTarget::All => Ok(Value::Array(self.store.get_all(collection).await?)),
            GetTarget::ById(id) => self
                .store
                .get(collection, id)
                .await?
                .ok_or_else(|| Error::NotFoundOffline(format!("Item not found offline: {id}"))),
            GetTarget::ByIndex { field, value } => Ok(Value::Array(
                self.store.get_by_index(collection, field, value).await?,
            )),
        }
    }

    /// Create: live POST with the response cached, or a locally-identified
    /// record plus a deferred `POST` action. A mutating failure while online
    /// propagates, never downgrades to offline handling.
    async fn post_request(
        &self,
        endpoint: &str,
        collection: &'static str,
        payload: Value,
    ) -> Result<Value> {
        if self.connectivity.is_online() {
            let data = self.backend.post(endpoint, &payload).await?;
            self.cache_created(collection, &data).await?;
            return Ok(data);
        }

        tracing::debug!(endpoint, "Offline mode for POST");
        let mut record = Record::from_value(payload.clone())?;
        let local_id = new_local_id();
        record.set_id(&local_id);
        record.mark_local_only();
        self.store.add(collection, &record.to_value()).await?;

        self.log
            .record(ActionDraft::post(endpoint, collection, payload, &local_id))
            .await?;
        Ok(record.into_value())
    }

    /// Update: live PUT with the response cached, or a field-merge into the
    /// cached copy plus a deferred `PUT` action carrying the merged record
    /// so replay can compare `updatedAt` against the server
    async fn put_request(
        &self,
        endpoint: &str,
        collection: &'static str,
        payload: Value,
    ) -> Result<Value> {
        if self.connectivity.is_online() {
            let data = self.backend.put(endpoint, &payload).await?;
            self.cache_read(collection, &data).await?;
            return Ok(data);
        }

        tracing::debug!(endpoint, "Offline mode for PUT");
        let id = payload
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidInput("Cannot update without an id".to_string()))?
            .to_string();

        let existing = self
            .store
            .get(collection, &id)
            .await?
            .ok_or_else(|| {
                Error::NotFoundOffline(format!("Cannot update non-existent item: {id}"))
            })?;

        let mut record = Record::from_value(existing)?;
        record.merge(&payload);
        self.store.update(collection, &record.to_value()).await?;

        self.log
            .record(ActionDraft::put(endpoint, collection, record.to_value()))
            .await?;
        Ok(record.into_value())
    }

    /// Delete: removed from the cache either way; offline additionally
    /// defers the live call
    async fn delete_request(
        &self,
        endpoint: &str,
        collection: &'static str,
        id: &str,
    ) -> Result<Value> {
        if self.connectivity.is_online() {
            let data = self.backend.delete(endpoint).await?;
            self.store.delete(collection, id).await?;
            return Ok(data);
        }

        tracing::debug!(endpoint, "Offline mode for DELETE");
        self.store.delete(collection, id).await?;
        self.log
            .record(ActionDraft::delete(endpoint, collection, id))
            .await?;
        Ok(json!({ "message": "Item deleted offline" }))
    }

    /// Mirror a live read (single object or array) into the cache
    async fn cache_read(&self, collection: &str, data: &Value) -> Result<()> {
        let items: Vec<&Value> = match data {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for item in items {
            if item.get(ID_FIELD).and_then(Value::as_str).is_some() {
                self.store.update(collection, item).await?;
            }
        }
        Ok(())
    }

    /// Cache a freshly created record; a duplicate means a concurrent read
    /// already mirrored it
    async fn cache_created(&self, collection: &str, data: &Value) -> Result<()> {
        if data.get(ID_FIELD).and_then(Value::as_str).is_none() {
            return Ok(());
        }
        match self.store.add(collection, data).await {
            Ok(()) | Err(Error::DuplicateKey { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Stamp the path identifier onto an update payload so offline merge and
/// conflict detection always have one to key on
fn with_id(mut payload: Value, id: &str) -> Result<Value> {
    match &mut payload {
        Value::Object(map) => {
            map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            Ok(payload)
        }
        other => Err(Error::InvalidInput(format!(
            "Update payload must be a JSON object, got {other}"
        ))),
    }
}
