//! Generic cached entity record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier field used by the backend for every entity
pub const ID_FIELD: &str = "_id";

/// Last-modified field used for conflict comparison
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Flag marking a record whose identifier is a temporary placeholder
pub const LOCAL_ONLY_FLAG: &str = "_isLocalOnly";

/// Flag marking a placeholder returned by the upload queue
pub const PENDING_UPLOAD_FLAG: &str = "_hasPendingUpload";

/// Prefix marking a client-generated temporary identifier
pub const LOCAL_ID_PREFIX: &str = "local_";

/// A locally cached entity (game, participant, user).
///
/// Records are schemaless JSON objects; the backend owns the shape. The
/// wrapper only interprets the handful of fields the sync layer relies on
/// (`_id`, `updatedAt`, `_isLocalOnly`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap a JSON value; fails unless it is an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidInput(format!(
                "Record must be a JSON object, got {other}"
            ))),
        }
    }

    /// Consume into the underlying JSON value
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Clone out as a JSON value
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Identifier, if assigned
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Assign the identifier
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// Read an arbitrary field
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Write an arbitrary field
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Remove a field, returning its previous value
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Whether this record carries a temporary, unconfirmed identifier
    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.0
            .get(LOCAL_ONLY_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false)
            || self.id().is_some_and(|id| id.starts_with(LOCAL_ID_PREFIX))
    }

    /// Tag the record as pending server confirmation
    pub fn mark_local_only(&mut self) {
        self.0.insert(LOCAL_ONLY_FLAG.to_string(), Value::Bool(true));
    }

    /// Last-modified timestamp, if present and parseable
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.0.get(UPDATED_AT_FIELD).and_then(parse_timestamp)
    }

    /// Merge fields from a JSON object into this record, overwriting on
    /// collision. Used by offline PUT to apply partial updates to the
    /// cached copy.
    pub fn merge(&mut self, changes: &Value) {
        if let Value::Object(map) = changes {
            for (key, value) in map {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Generate a temporary client-side identifier (`local_<ms>_<suffix>`)
#[must_use]
pub fn new_local_id() -> String {
    let now = chrono::Utc::now().timestamp_millis();
    // The head of a v7 UUID encodes the same millisecond as the prefix;
    // the tail is the random portion, so the suffix comes from there
    let simple = Uuid::now_v7().simple().to_string();
    let suffix = &simple[simple.len() - 9..];
    format!("{LOCAL_ID_PREFIX}{now}_{suffix}")
}

/// Parse a timestamp value from either Unix milliseconds or an RFC 3339
/// string; the backend uses ISO strings, offline payloads may carry ms.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Record::from_value(json!([1, 2, 3])).is_err());
        assert!(Record::from_value(json!("text")).is_err());
        assert!(Record::from_value(json!({"_id": "a"})).is_ok());
    }

    #[test]
    fn test_id_roundtrip() {
        let mut record = Record::new();
        assert!(record.id().is_none());

        record.set_id("srv123");
        assert_eq!(record.id(), Some("srv123"));
    }

    #[test]
    fn test_local_only_detection() {
        let mut record = Record::new();
        record.set_id("srv123");
        assert!(!record.is_local_only());

        record.set_id(new_local_id());
        assert!(record.is_local_only());

        let mut flagged = Record::new();
        flagged.set_id("srv123");
        flagged.mark_local_only();
        assert!(flagged.is_local_only());
    }

    #[test]
    fn test_new_local_id_unique() {
        // A tight loop mints many ids inside the same millisecond; every
        // one must still be distinct
        let ids: Vec<String> = (0..50).map(|_| new_local_id()).collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
        assert!(ids[0].starts_with(LOCAL_ID_PREFIX));
    }

    #[test]
    fn test_merge_overwrites_and_adds() {
        let mut record = Record::from_value(json!({"_id": "p1", "name": "Abel"})).unwrap();
        record.merge(&json!({"name": "Bethel", "photo": "x.png"}));

        assert_eq!(record.get("name"), Some(&json!("Bethel")));
        assert_eq!(record.get("photo"), Some(&json!("x.png")));
        assert_eq!(record.id(), Some("p1"));
    }

    #[test]
    fn test_parse_timestamp_millis_and_rfc3339() {
        let from_ms = parse_timestamp(&json!(1_700_000_000_000_i64)).unwrap();
        let from_str = parse_timestamp(&json!("2023-11-14T22:13:20Z")).unwrap();
        assert_eq!(from_ms, from_str);

        assert!(parse_timestamp(&json!(null)).is_none());
        assert!(parse_timestamp(&json!("not a date")).is_none());
    }

    #[test]
    fn test_updated_at() {
        let record =
            Record::from_value(json!({"_id": "g1", "updatedAt": "2024-01-01T00:00:00Z"})).unwrap();
        assert!(record.updated_at().is_some());

        let missing = Record::from_value(json!({"_id": "g1"})).unwrap();
        assert!(missing.updated_at().is_none());
    }
}
