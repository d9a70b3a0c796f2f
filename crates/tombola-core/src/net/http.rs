//! reqwest-backed remote backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::MultipartPayload;

use super::backend::RemoteBackend;
use super::session::SessionStore;

/// Every live call carries a fixed timeout; a hung server turns into a
/// per-action failure instead of stalling the whole pass
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Tombola REST backend
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    session: SessionStore,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url,
            client,
            session,
        })
    }

    /// The base URL this backend was configured with
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut builder = self.client.request(method, url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn dispatch(&self, builder: RequestBuilder) -> Result<Value> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            // Unsynced offline work stays; only the credential is dropped
            self.session.clear();
            return Err(Error::Auth(
                "Session credential rejected by the backend".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: parse_api_error(&body),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn get(&self, endpoint: &str) -> Result<Value> {
        self.dispatch(self.request(Method::GET, endpoint)).await
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.dispatch(self.request(Method::POST, endpoint).json(body))
            .await
    }

    async fn put(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.dispatch(self.request(Method::PUT, endpoint).json(body))
            .await
    }

    async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.dispatch(self.request(Method::DELETE, endpoint)).await
    }

    async fn post_multipart(&self, endpoint: &str, payload: &MultipartPayload) -> Result<Value> {
        let mut form = multipart::Form::new();
        for (key, value) in &payload.fields {
            form = form.text(key.clone(), value.clone());
        }
        for file in &payload.files {
            let part = multipart::Part::bytes(file.bytes.clone())
                .file_name(file.filename.clone())
                .mime_str(&file.mime_type)?;
            form = form.part(file.key.clone(), part);
        }

        self.dispatch(self.request(Method::POST, endpoint).multipart(form))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed".to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "API base URL must not be empty".to_string(),
        ));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}
