//! Collection registry for the local store

use crate::error::{Error, Result};

/// Entity collections
pub const GAMES: &str = "games";
pub const PARTICIPANTS: &str = "participants";
pub const USERS: &str = "users";

/// Action log collection
pub const OFFLINE_ACTIONS: &str = "offline_actions";

/// Per-entity upload queues
pub const PARTICIPANTS_UPLOADS: &str = "participants_uploads";
pub const CONTROLLERS_UPLOADS: &str = "controllers_uploads";
pub const PRIZES_UPLOADS: &str = "prizes_uploads";

/// All upload-queue collections, for limitation aggregation
pub const UPLOAD_COLLECTIONS: &[&str] =
    &[PARTICIPANTS_UPLOADS, CONTROLLERS_UPLOADS, PRIZES_UPLOADS];

/// Declared shape of one collection: its key field and the record fields
/// that get a secondary (expression) index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub key_field: &'static str,
    pub indexes: &'static [&'static str],
}

/// Fixed collection set (schema version 1).
///
/// Version bumps must be additive: new collections or indexes only, so an
/// upgrade never destroys unsynced user data.
pub const COLLECTIONS: &[CollectionSpec] = &[
    CollectionSpec {
        name: GAMES,
        key_field: "_id",
        indexes: &["status", "createdAt"],
    },
    CollectionSpec {
        name: PARTICIPANTS,
        key_field: "_id",
        indexes: &["gameId"],
    },
    CollectionSpec {
        name: USERS,
        key_field: "_id",
        indexes: &["role"],
    },
    CollectionSpec {
        name: OFFLINE_ACTIONS,
        key_field: "id",
        indexes: &["timestamp", "synced"],
    },
    CollectionSpec {
        name: PARTICIPANTS_UPLOADS,
        key_field: "_id",
        indexes: &["status", "createdAt"],
    },
    CollectionSpec {
        name: CONTROLLERS_UPLOADS,
        key_field: "_id",
        indexes: &["status", "createdAt"],
    },
    CollectionSpec {
        name: PRIZES_UPLOADS,
        key_field: "_id",
        indexes: &["status", "createdAt"],
    },
];

/// Look up a declared collection
#[must_use]
pub fn spec(name: &str) -> Option<&'static CollectionSpec> {
    COLLECTIONS.iter().find(|c| c.name == name)
}

/// Look up a declared collection, failing on unknown names.
///
/// Collection and index names are the only strings ever formatted into SQL,
/// so everything must come from this registry.
pub fn require(name: &str) -> Result<&'static CollectionSpec> {
    spec(name).ok_or_else(|| Error::InvalidInput(format!("Unknown collection: {name}")))
}

/// Validate that `index` is declared for the collection
pub fn require_index(collection: &CollectionSpec, index: &str) -> Result<()> {
    if collection.indexes.contains(&index) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Collection '{}' has no index '{index}'",
            collection.name
        )))
    }
}

/// Upload-queue collection for an entity collection (e.g. `participants`
/// -> `participants_uploads`)
pub fn upload_collection_for(entity: &str) -> Result<&'static str> {
    let name = format!("{entity}_uploads");
    UPLOAD_COLLECTIONS
        .iter()
        .find(|c| **c == name)
        .copied()
        .ok_or_else(|| Error::InvalidInput(format!("No upload queue for entity: {entity}")))
}
