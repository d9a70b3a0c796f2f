//! Structured local store: key-indexed, multi-collection persistence
//!
//! Each collection is a table of `(id, body)` rows where `body` is the JSON
//! document; secondary lookups go through expression indexes over
//! `json_extract`. Every operation is independently transactional — batch
//! atomicity across records is the caller's responsibility.

use serde_json::Value;
use std::path::Path;

use crate::error::{Error, Result};

use super::connection::Database;
use super::schema::{self, CollectionSpec};

/// Durable multi-collection store backing the cache, the action log, and
/// the upload queues
pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    /// Open (or create) the store at the given path
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            db: Database::open(path).await?,
        })
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Database::open_in_memory().await?,
        })
    }

    /// Insert a document; fails with `DuplicateKey` if the identifier
    /// already exists in the collection
    pub async fn add(&self, collection: &str, doc: &Value) -> Result<()> {
        let spec = schema::require(collection)?;
        let key = key_of(spec, doc)?;
        let body = serde_json::to_string(doc)?;

        let sql = format!("INSERT INTO {} (id, body) VALUES (?1, ?2)", spec.name);
        match self
            .db
            .connection()
            .execute(&sql, libsql::params![key.as_str(), body.as_str()])
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Err(Error::DuplicateKey {
                    collection: spec.name.to_string(),
                    id: key,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All documents in a collection; order is unspecified
    pub async fn get_all(&self, collection: &str) -> Result<Vec<Value>> {
        let spec = schema::require(collection)?;
        let sql = format!("SELECT body FROM {}", spec.name);
        let rows = self.db.connection().query(&sql, ()).await?;
        collect_bodies(rows).await
    }

    /// A single document by identifier; `Ok(None)` when absent
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let spec = schema::require(collection)?;
        let sql = format!("SELECT body FROM {} WHERE id = ?1", spec.name);
        let mut rows = self
            .db
            .connection()
            .query(&sql, libsql::params![id])
            .await?;

        match rows.next().await? {
            Some(row) => {
                let body: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    /// All documents whose indexed field equals `value`
    pub async fn get_by_index(
        &self,
        collection: &str,
        index: &str,
        value: &Value,
    ) -> Result<Vec<Value>> {
        let spec = schema::require(collection)?;
        schema::require_index(spec, index)?;

        let sql = format!(
            "SELECT body FROM {} WHERE json_extract(body, '$.{index}') = ?1",
            spec.name
        );
        let rows = self
            .db
            .connection()
            .query(&sql, vec![to_sql_value(value)?])
            .await?;
        collect_bodies(rows).await
    }

    /// Upsert a document by identifier
    pub async fn update(&self, collection: &str, doc: &Value) -> Result<()> {
        let spec = schema::require(collection)?;
        let key = key_of(spec, doc)?;
        let body = serde_json::to_string(doc)?;

        let sql = format!(
            "INSERT INTO {} (id, body) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body",
            spec.name
        );
        self.db
            .connection()
            .execute(&sql, libsql::params![key.as_str(), body.as_str()])
            .await?;
        Ok(())
    }

    /// Remove a document; no-op when absent
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let spec = schema::require(collection)?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", spec.name);
        self.db
            .connection()
            .execute(&sql, libsql::params![id])
            .await?;
        Ok(())
    }

    /// Empty a collection; maintenance only, not used in the main flows
    pub async fn clear(&self, collection: &str) -> Result<()> {
        let spec = schema::require(collection)?;
        let sql = format!("DELETE FROM {}", spec.name);
        self.db.connection().execute(&sql, ()).await?;
        Ok(())
    }
}

/// Extract the primary key from a document
fn key_of(spec: &CollectionSpec, doc: &Value) -> Result<String> {
    doc.get(spec.key_field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "Document for '{}' is missing key field '{}'",
                spec.name, spec.key_field
            ))
        })
}

/// Convert a JSON scalar into a bindable SQL value
fn to_sql_value(value: &Value) -> Result<libsql::Value> {
    match value {
        Value::String(s) => Ok(libsql::Value::Text(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(libsql::Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(libsql::Value::Real(f))
            } else {
                Err(Error::InvalidInput(format!("Unbindable number: {n}")))
            }
        }
        Value::Bool(b) => Ok(libsql::Value::Integer(i64::from(*b))),
        other => Err(Error::InvalidInput(format!(
            "Index lookups require a scalar value, got {other}"
        ))),
    }
}

async fn collect_bodies(mut rows: libsql::Rows) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        let body: String = row.get(0)?;
        out.push(serde_json::from_str(&body)?);
    }
    Ok(out)
}
