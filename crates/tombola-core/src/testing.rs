//! Test support: scripted backend fake
//!
//! Only compiled for tests; production code talks to the real backend
//! through [`crate::net::HttpBackend`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::models::MultipartPayload;
use crate::net::RemoteBackend;

/// One live call observed by the fake
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub endpoint: String,
    pub body: Option<Value>,
}

/// Scripted in-memory backend. Responses are queued per
/// `(method, endpoint)`; unscripted calls answer 404 so tests fail loudly
/// instead of succeeding by accident.
#[derive(Default)]
pub struct FakeBackend {
    responses: Mutex<HashMap<String, VecDeque<Value>>>,
    failures: Mutex<HashMap<String, u16>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(method: &str, endpoint: &str) -> String {
        format!("{method} {endpoint}")
    }

    /// Queue a response for the next call to `(method, endpoint)`
    pub fn respond(&self, method: &str, endpoint: &str, value: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry(Self::key(method, endpoint))
            .or_default()
            .push_back(value);
    }

    /// Make every call to `(method, endpoint)` fail with the given status
    pub fn fail(&self, method: &str, endpoint: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert(Self::key(method, endpoint), status);
    }

    /// Every call observed so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls matching a method, in order
    pub fn calls_with_method(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    fn handle(&self, method: &str, endpoint: &str, body: Option<Value>) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            body,
        });

        let key = Self::key(method, endpoint);
        if let Some(status) = self.failures.lock().unwrap().get(&key) {
            return Err(Error::Api {
                status: *status,
                message: format!("scripted failure for {key}"),
            });
        }

        self.responses
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .ok_or(Error::Api {
                status: 404,
                message: format!("no scripted response for {key}"),
            })
    }
}

#[async_trait]
impl RemoteBackend for FakeBackend {
    async fn get(&self, endpoint: &str) -> Result<Value> {
        self.handle("GET", endpoint, None)
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.handle("POST", endpoint, Some(body.clone()))
    }

    async fn put(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.handle("PUT", endpoint, Some(body.clone()))
    }

    async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.handle("DELETE", endpoint, None)
    }

    async fn post_multipart(&self, endpoint: &str, payload: &MultipartPayload) -> Result<Value> {
        let mut fields = Map::new();
        for (key, value) in &payload.fields {
            fields.insert(key.clone(), Value::String(value.clone()));
        }
        let files: Vec<Value> = payload
            .files
            .iter()
            .map(|f| json!({"key": f.key, "filename": f.filename, "type": f.mime_type}))
            .collect();

        self.handle(
            "POST_MULTIPART",
            endpoint,
            Some(json!({"fields": fields, "files": files})),
        )
    }
}
