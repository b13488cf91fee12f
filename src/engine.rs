use std::ptr::NonNull;

use rusqlite::serialize::OwnedData;
use rusqlite::{ffi, Connection, OptionalExtension, Params, Row, MAIN_DB};

use crate::error::{Error, Result};

/// Binding over the embedded relational engine: one in-memory connection
/// whose entire state can be exported to, and reopened from, a flat byte
/// image. The engine itself is a given primitive; this wrapper only fixes
/// how the rest of the crate opens, runs and snapshots it.
pub struct Engine {
    conn: Connection,
}

impl Engine {
    /// Opens a fresh empty engine with no schema applied.
    pub fn open_empty() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Opens an engine restored from a previously exported image.
    ///
    /// Corrupt images are rejected here rather than on first use, so the
    /// caller can degrade at startup instead of mid-session.
    pub fn open_from_image(image: &[u8]) -> Result<Self> {
        if image.is_empty() {
            return Err(Error::Decode("empty database image".into()));
        }
        let mut conn = Connection::open_in_memory()?;
        let data = copy_to_engine_buffer(image)?;
        conn.deserialize(MAIN_DB, data, false)?;
        // Read the catalog now; garbage surfaces lazily otherwise.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(Self { conn })
    }

    /// Serializes the whole database to a flat byte image.
    pub fn export(&self) -> Result<Vec<u8>> {
        let data = self.conn.serialize(MAIN_DB)?;
        Ok(data.to_vec())
    }

    /// Runs a semicolon-separated batch of statements (schema creation).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Runs one mutating statement, returning the affected row count.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    /// Runs a read-only statement, mapping each row with `decode`.
    pub fn query<T, P, F>(&self, sql: &str, params: P, decode: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, decode)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Like `query` for statements matching at most one row.
    pub fn query_row_opt<T, P, F>(&self, sql: &str, params: P, decode: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        Ok(stmt.query_row(params, decode).optional()?)
    }
}

/// Copies `image` into an engine-owned buffer, which `deserialize` takes
/// ownership of.
fn copy_to_engine_buffer(image: &[u8]) -> Result<OwnedData> {
    let len = image.len();
    // SAFETY: the buffer comes from sqlite3_malloc64 and ownership moves into
    // OwnedData, which releases it with sqlite3_free. The copy stays within
    // the `len` bytes just allocated.
    unsafe {
        let ptr = ffi::sqlite3_malloc64(len as u64);
        let Some(ptr) = NonNull::new(ptr) else {
            return Err(Error::Engine(rusqlite::Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_NOMEM),
                Some("sqlite3_malloc64 returned null".into()),
            )));
        };
        std::ptr::copy_nonoverlapping(image.as_ptr(), ptr.as_ptr().cast::<u8>(), len);
        Ok(OwnedData::from_raw_nonnull(ptr.cast(), len))
    }
}
