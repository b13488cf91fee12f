use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use rusqlite::{Params, Row};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::storage::DurableBlobStore;

/// Schema applied once when no saved image exists. Restored images never
/// re-run this.
const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE,
    name TEXT,
    password TEXT,
    role TEXT,
    phone TEXT,
    created_at TEXT
);
CREATE TABLE IF NOT EXISTS submissions (
    id TEXT PRIMARY KEY,
    account_id TEXT,
    created_at TEXT,
    student_name TEXT,
    email TEXT,
    phone TEXT,
    school_name TEXT,
    address TEXT,
    academic_strengths TEXT,
    interests TEXT,
    soft_skills TEXT,
    work_preference TEXT,
    env_preference TEXT,
    top_major TEXT,
    match_score INTEGER
);
";

/// Timestamp layout for every `created_at` column. Constant width (always
/// three subsecond digits, always `Z`) keeps lexicographic order equal to
/// chronological order for TEXT comparisons.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Current UTC time in the stored column format.
pub fn now_stamp() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(TIMESTAMP_FORMAT)
        .map_err(|e| Error::Decode(format!("format timestamp: {e}")))
}

/// Parses a stored `created_at` value back into a point in time.
pub fn parse_stamp(stamp: &str) -> Result<OffsetDateTime> {
    PrimitiveDateTime::parse(stamp, TIMESTAMP_FORMAT)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|e| Error::Decode(format!("parse timestamp {stamp:?}: {e}")))
}

/// The persistence service: sole owner of the embedded engine handle.
///
/// The in-memory engine is authoritative for the whole session. After every
/// mutation the full image is written back to the durable store as a
/// checkpoint, not a write-ahead log: a crash between a committed write and
/// the next successful checkpoint loses that write, by accepted trade-off.
///
/// Operations are expected to arrive one at a time (single logical writer);
/// the inner mutex only makes the handle safe to share across await points,
/// it is not a scheduling mechanism.
#[derive(Clone)]
pub struct Database {
    engine: Arc<Mutex<Option<Engine>>>,
    store: Arc<dyn DurableBlobStore>,
    image_key: String,
}

impl Database {
    pub fn new(store: Arc<dyn DurableBlobStore>, image_key: impl Into<String>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(None)),
            store,
            image_key: image_key.into(),
        }
    }

    fn engine(&self) -> MutexGuard<'_, Option<Engine>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restores the engine from the last saved image, or creates a fresh
    /// schema and checkpoints it immediately. Repeat calls are no-ops.
    ///
    /// A store *read error* (not absence) fails initialization outright: a
    /// fresh start over an unreadable prior image would overwrite it on the
    /// next checkpoint. A failed initial checkpoint merely logs; the
    /// session continues in memory only.
    pub async fn initialize(&self) -> Result<()> {
        if self.engine().is_some() {
            return Ok(());
        }
        let loaded = self.store.load(&self.image_key).await?;
        let (engine, fresh_image) = match loaded {
            Some(image) if !image.is_empty() => {
                let engine = Engine::open_from_image(&image)?;
                info!(bytes = image.len(), "database restored from saved image");
                (engine, None)
            }
            _ => {
                let engine = Engine::open_empty()?;
                engine.execute_batch(SCHEMA)?;
                let image = engine.export()?;
                info!("fresh database created");
                (engine, Some(image))
            }
        };
        {
            let mut guard = self.engine();
            if guard.is_some() {
                return Ok(());
            }
            *guard = Some(engine);
        }
        if let Some(image) = fresh_image {
            if let Err(e) = self.store.save(&self.image_key, Bytes::from(image)).await {
                warn!(error = %e, "initial checkpoint failed, continuing in memory only");
            }
        }
        Ok(())
    }

    /// True once `initialize` produced a usable engine.
    pub fn is_ready(&self) -> bool {
        self.engine().is_some()
    }

    /// Read-only statement. A service that never initialized returns no
    /// rows, keeping cold reads harmless.
    pub fn query<T, P, F>(&self, sql: &str, params: P, decode: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        match self.engine().as_ref() {
            Some(engine) => engine.query(sql, params, decode),
            None => {
                warn!("query before initialize, returning no rows");
                Ok(Vec::new())
            }
        }
    }

    /// Like `query` for statements matching at most one row.
    pub fn query_row_opt<T, P, F>(&self, sql: &str, params: P, decode: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        match self.engine().as_ref() {
            Some(engine) => engine.query_row_opt(sql, params, decode),
            None => {
                warn!("query before initialize, returning no row");
                Ok(None)
            }
        }
    }

    /// Runs one mutating operation, then checkpoints the full image to the
    /// durable store. A failed checkpoint is logged and the write stands in
    /// memory; a write against an uninitialized service is refused rather
    /// than dropped.
    ///
    /// Taking the mutation as a closure keeps statement parameters (which
    /// borrow as `&dyn ToSql`) out of the future entirely, so callers stay
    /// `Send`, and makes it impossible to mutate without checkpointing.
    pub async fn write<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Engine) -> Result<T>,
    {
        let (value, image) = {
            let guard = self.engine();
            let Some(engine) = guard.as_ref() else {
                return Err(Error::SchemaNotInitialized);
            };
            let value = op(engine)?;
            (value, engine.export()?)
        };
        if let Err(e) = self.store.save(&self.image_key, Bytes::from(image)).await {
            warn!(error = %e, "checkpoint failed, in-memory state remains authoritative");
        }
        Ok(value)
    }
}
