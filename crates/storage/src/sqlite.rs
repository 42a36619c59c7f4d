// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed transaction log
//!
//! Keeps one row per live key: a put upserts the key's row, a delete removes
//! it. History is not retained, but replaying the rows in sequence order
//! rebuilds the same final table as replaying every event would.

use crate::config::SqliteConfig;
use kv_core::{Backend, Event, EventKind, LogError, Mutation, QueuedLogger};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// Transaction logger persisting to a SQLite table
pub type SqliteTransactionLogger = QueuedLogger<SqliteBackend>;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS events (
        sequence   INTEGER PRIMARY KEY AUTOINCREMENT,
        key        TEXT NOT NULL UNIQUE,
        value      TEXT NOT NULL,
        event_type INTEGER NOT NULL
    );
";

const UPSERT: &str = "
    INSERT INTO events (key, value, event_type) VALUES (?1, ?2, ?3)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, event_type = excluded.event_type
    RETURNING sequence
";

const DELETE: &str = "DELETE FROM events WHERE key = ?1 RETURNING sequence";

const SELECT_ALL: &str =
    "SELECT sequence, key, value, event_type FROM events ORDER BY sequence ASC";

fn sqlite_err(err: rusqlite::Error) -> LogError {
    LogError::backend(SqliteBackend::NAME, err)
}

/// Relational medium: the `events` table of one SQLite database
pub struct SqliteBackend {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open the database, check it answers, and create the schema
    pub fn open(config: &SqliteConfig) -> Result<Self, LogError> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        let conn = Connection::open_with_flags(&config.path, flags).map_err(sqlite_err)?;
        configure_connection(&conn)?;

        let backend = Self::prepare(config.path.clone(), conn)?;
        info!(path = %config.path.display(), "sqlite transaction log opened");
        Ok(backend)
    }

    /// Open an existing database for inspection
    ///
    /// Makes no schema or journal changes; SQLite itself refuses writes.
    pub fn open_read_only(path: &Path) -> Result<Self, LogError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(sqlite_err)?;
        conn.busy_timeout(Duration::from_secs(5)).map_err(sqlite_err)?;
        ping(&conn)?;

        debug!(path = %path.display(), "sqlite transaction log opened read-only");
        Ok(Self {
            path: path.to_path_buf(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self, LogError> {
        let conn = Connection::open_in_memory().map_err(sqlite_err)?;
        Self::prepare(PathBuf::from(":memory:"), conn)
    }

    fn prepare(path: PathBuf, conn: Connection) -> Result<Self, LogError> {
        ping(&conn)?;
        conn.execute_batch(SCHEMA).map_err(sqlite_err)?;
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live rows
    pub fn row_count(&self) -> Result<u64, LogError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .map_err(sqlite_err)?;
        Ok(count.max(0) as u64)
    }
}

fn configure_connection(conn: &Connection) -> Result<(), LogError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = FULL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .map_err(sqlite_err)
}

fn ping(conn: &Connection) -> Result<(), LogError> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map_err(sqlite_err)?;
    Ok(())
}

impl Backend for SqliteBackend {
    const NAME: &'static str = "sqlite";
    const REPLAY_BUFFER: usize = 16;
    type Reader = SqliteReader;

    fn reader(&self) -> Result<SqliteReader, LogError> {
        Ok(SqliteReader {
            conn: Some(Arc::clone(&self.conn)),
            rows: Vec::new().into_iter(),
        })
    }

    fn append(&mut self, mutation: &Mutation) -> Result<Option<u64>, LogError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let sequence: Option<i64> = match mutation.kind {
            EventKind::Put => Some(
                conn.query_row(
                    UPSERT,
                    params![mutation.key, mutation.value, u8::from(mutation.kind)],
                    |row| row.get(0),
                )
                .map_err(sqlite_err)?,
            ),
            // Deleting an absent key is not an error
            EventKind::Delete => conn
                .query_row(DELETE, params![mutation.key], |row| row.get(0))
                .optional()
                .map_err(sqlite_err)?,
        };
        Ok(sequence.map(|s| s.max(0) as u64))
    }

    fn release(self) -> Result<(), LogError> {
        debug!(path = %self.path.display(), "sqlite connection released");
        Ok(())
    }
}

/// Rows of the `events` table in sequence order
///
/// The query runs on the first call to `next`, on the replay task.
pub struct SqliteReader {
    conn: Option<Arc<Mutex<Connection>>>,
    rows: std::vec::IntoIter<Result<Event, LogError>>,
}

impl Iterator for SqliteReader {
    type Item = Result<Event, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(conn) = self.conn.take() {
            self.rows = load_rows(&conn).into_iter();
        }
        self.rows.next()
    }
}

struct RawRow {
    sequence: i64,
    key: String,
    value: String,
    event_type: i64,
}

fn load_rows(conn: &Mutex<Connection>) -> Vec<Result<Event, LogError>> {
    let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
    let raw = match query_all(&conn) {
        Ok(raw) => raw,
        Err(e) => return vec![Err(e)],
    };

    let mut out = Vec::with_capacity(raw.len());
    let mut previous = 0u64;
    for row in raw {
        match decode(row, previous) {
            Ok(event) => {
                previous = event.sequence;
                out.push(Ok(event));
            }
            Err(e) => {
                out.push(Err(e));
                break;
            }
        }
    }
    out
}

fn query_all(conn: &Connection) -> Result<Vec<RawRow>, LogError> {
    let mut stmt = conn.prepare(SELECT_ALL).map_err(sqlite_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RawRow {
                sequence: row.get(0)?,
                key: row.get(1)?,
                value: row.get(2)?,
                event_type: row.get(3)?,
            })
        })
        .map_err(sqlite_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(sqlite_err)
}

fn decode(row: RawRow, previous: u64) -> Result<Event, LogError> {
    let sequence = u64::try_from(row.sequence).map_err(|_| {
        LogError::backend(
            SqliteBackend::NAME,
            format!("negative sequence {}", row.sequence),
        )
    })?;
    if sequence <= previous {
        return Err(LogError::OutOfOrder {
            previous,
            found: sequence,
        });
    }
    let raw_kind = u8::try_from(row.event_type).unwrap_or(u8::MAX);
    let kind = EventKind::try_from(raw_kind)?;
    Ok(Event {
        sequence,
        kind,
        key: row.key,
        value: match kind {
            EventKind::Put => row.value,
            EventKind::Delete => String::new(),
        },
    })
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
