//! SQLite WAL persistence backend
//!
//! One keyed `documents` table holding the JSON payload of every entity,
//! with a blake3 integrity hash verified at load and a millisecond save
//! timestamp. WAL mode keeps concurrent readers non-blocking while the
//! store's single worker serializes writes.

use std::marker::PhantomData;
use std::path::Path;

use anyhow::{bail, Context};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::EntityId;

use super::{Persistence, PersistBatch};

/// SQLite-backed keyed document storage.
pub struct SqlitePersistence<A> {
    conn: Connection,
    _marker: PhantomData<fn() -> A>,
}

impl<A> std::fmt::Debug for SqlitePersistence<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePersistence").finish_non_exhaustive()
    }
}

impl<A> SqlitePersistence<A> {
    /// Open (or create) the database at `path` in WAL mode.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory '{}'", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening sqlite database '{}'", path.display()))?;

        // WAL mode: concurrent readers, serialized writers.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .context("configuring sqlite WAL pragmas")?;

        let backend = Self {
            conn,
            _marker: PhantomData,
        };
        backend.migrate()?;
        Ok(backend)
    }

    /// Open an in-memory database, for tests.
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory sqlite database")?;
        let backend = Self {
            conn,
            _marker: PhantomData,
        };
        backend.migrate()?;
        Ok(backend)
    }

    /// Idempotent DDL migration.
    fn migrate(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS documents (
                id             INTEGER PRIMARY KEY,
                payload_json   TEXT NOT NULL,
                integrity_hash TEXT NOT NULL,
                saved_at_ms    INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_saved_at
                ON documents(saved_at_ms DESC);
            ",
            )
            .context("migrating sqlite schema")?;
        Ok(())
    }
}

impl<A> Persistence<A> for SqlitePersistence<A>
where
    A: Serialize + DeserializeOwned + Send + 'static,
{
    fn load_all(&mut self) -> anyhow::Result<Vec<(EntityId, A)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, payload_json, integrity_hash FROM documents ORDER BY id")
            .context("preparing document load")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("querying documents")?;

        let mut loaded = Vec::new();
        for row in rows {
            let (id, payload, stored_hash) = row.context("reading document row")?;
            let hash = blake3::hash(payload.as_bytes()).to_hex().to_string();
            if hash != stored_hash {
                bail!("integrity hash mismatch for entity {id}");
            }
            let value: A = serde_json::from_str(&payload)
                .with_context(|| format!("deserializing entity {id}"))?;
            loaded.push((EntityId(id), value));
        }
        Ok(loaded)
    }

    fn apply(&mut self, batch: PersistBatch<A>) -> anyhow::Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("starting sqlite transaction")?;

        for (id, value) in &batch.upserts {
            let payload = serde_json::to_string(value)
                .with_context(|| format!("serializing entity {id}"))?;
            let hash = blake3::hash(payload.as_bytes()).to_hex().to_string();
            let saved_at_ms = chrono::Utc::now().timestamp_millis();
            tx.execute(
                "INSERT INTO documents (id, payload_json, integrity_hash, saved_at_ms)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     payload_json = excluded.payload_json,
                     integrity_hash = excluded.integrity_hash,
                     saved_at_ms = excluded.saved_at_ms",
                params![id.raw(), payload, hash, saved_at_ms],
            )
            .with_context(|| format!("writing entity {id}"))?;
        }

        for id in &batch.removals {
            tx.execute("DELETE FROM documents WHERE id = ?1", params![id.raw()])
                .with_context(|| format!("deleting entity {id}"))?;
        }

        tx.commit().context("committing sqlite transaction")
    }
}
