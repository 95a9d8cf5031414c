use std::path::Path;

use anyhow::{ensure, Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::KeyValueStore;

/// Schema steps in order; `user_version` counts how many have run.
const SCHEMA_STEPS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

/// Key-value table in a SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(db_path).context("failed to open SQLite database")?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }

        let store = Self::from_connection(conn)?;
        info!("Store initialized at {}", db_path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory SQLite")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        Self::upgrade(&mut conn).context("failed to upgrade store schema")?;
        Ok(Self { conn })
    }

    /// Run the schema steps this file has not seen, all in one transaction.
    fn upgrade(conn: &mut Connection) -> Result<()> {
        let applied: usize = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .context("failed to read user_version pragma")?;
        ensure!(
            applied <= SCHEMA_STEPS.len(),
            "store schema {applied} is newer than this build ({})",
            SCHEMA_STEPS.len()
        );
        let pending = &SCHEMA_STEPS[applied..];
        if pending.is_empty() {
            return Ok(());
        }

        let tx = conn.transaction()?;
        for (offset, sql) in pending.iter().enumerate() {
            tx.execute_batch(sql)
                .with_context(|| format!("schema step {} failed", applied + offset + 1))?;
        }
        tx.pragma_update(None, "user_version", SCHEMA_STEPS.len())?;
        tx.commit().context("failed to commit schema upgrade")?;
        info!("store schema upgraded from {applied} to {}", SCHEMA_STEPS.len());
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("failed to read key {key}"))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .with_context(|| format!("failed to delete key {key}"))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_and_delete() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.set("pagepause-state", "{}").unwrap();
        store.set("pagepause-state", "{\"isRunning\":false}").unwrap();
        assert_eq!(
            store.get("pagepause-state").unwrap().as_deref(),
            Some("{\"isRunning\":false}")
        );
        store.delete("pagepause-state").unwrap();
        assert_eq!(store.get("pagepause-state").unwrap(), None);
    }

    #[test]
    fn fresh_file_is_stamped_and_newer_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagepause.sqlite3");
        drop(SqliteStore::open(&path).unwrap());

        let conn = Connection::open(&path).unwrap();
        let version: usize = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_STEPS.len());
        conn.pragma_update(None, "user_version", SCHEMA_STEPS.len() + 1)
            .unwrap();
        drop(conn);

        assert!(SqliteStore::open(&path).is_err());
    }

    #[test]
    fn reopening_file_keeps_values_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagepause.sqlite3");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.set("pagepause-page-hit-count", "7").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get("pagepause-page-hit-count").unwrap().as_deref(),
            Some("7")
        );
    }
}
