//! Database migrations
//!
//! Migrations are additive only: new collections or indexes may be added in
//! later versions, but existing tables are never dropped or rewritten, so an
//! upgrade cannot destroy unsynced offline work.

use crate::error::Result;
use libsql::Connection;

use super::schema;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: one table per declared collection, with
/// expression indexes over the declared record fields
async fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let mut statements = vec![
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )"
        .to_string(),
    ];

    for collection in schema::COLLECTIONS {
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                body TEXT NOT NULL
            )",
            collection.name
        ));
        for index in collection.indexes {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}(json_extract(body, '$.{}'))",
                collection.name, index, collection.name, index
            ));
        }
    }

    statements.push("INSERT INTO schema_version (version) VALUES (1)".to_string());

    for stmt in &statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated local store to version {CURRENT_VERSION}");
    Ok(())
}
