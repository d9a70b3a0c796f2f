//! Remote backend seam

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::MultipartPayload;

/// CRUD-shaped transport to the REST backend.
///
/// The router and sync engine only speak this trait; production code uses
/// the reqwest-backed [`super::HttpBackend`], tests substitute a scripted
/// fake.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn get(&self, endpoint: &str) -> Result<Value>;

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value>;

    async fn put(&self, endpoint: &str, body: &Value) -> Result<Value>;

    async fn delete(&self, endpoint: &str) -> Result<Value>;

    /// Multipart POST for file-bearing submissions
    async fn post_multipart(&self, endpoint: &str, payload: &MultipartPayload) -> Result<Value>;
}
