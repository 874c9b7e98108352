//! Registration storage
//!
//! Append-only SQLite table of accepted registrations. Rows are never
//! updated or deleted; a member may register more than once.

use crate::error::StorageError;
use crate::platform::UserId;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Number of teammate columns in the table
pub const TEAMMATE_SLOTS: usize = 3;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS registrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    submitter_id INTEGER NOT NULL,
    primary_name TEXT NOT NULL,
    teammate1 TEXT,
    teammate2 TEXT,
    teammate3 TEXT
);

CREATE INDEX IF NOT EXISTS idx_registrations_submitter ON registrations(submitter_id);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, submitter_id, primary_name, teammate1, teammate2, teammate3 FROM registrations";

/// Teammate names mapped onto the fixed teammate columns.
///
/// Slot `i` holds the `i`-th non-blank name in submission order; trailing
/// slots are `None`. A filled slot never follows an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeammateSlots([Option<String>; TEAMMATE_SLOTS]);

impl TeammateSlots {
    /// Pack already-normalized names into slots. Names past the last slot
    /// are ignored.
    pub fn pack<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut slots: [Option<String>; TEAMMATE_SLOTS] = Default::default();
        for (slot, name) in slots.iter_mut().zip(names) {
            *slot = Some(name.into());
        }
        Self(slots)
    }

    pub fn slots(&self) -> &[Option<String>; TEAMMATE_SLOTS] {
        &self.0
    }

    /// Filled slots, in order
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().flatten().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// A registration ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub submitter_id: UserId,
    pub primary_name: String,
    pub teammates: TeammateSlots,
}

/// A stored registration row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    pub submitter_id: UserId,
    pub primary_name: String,
    pub teammates: TeammateSlots,
}

impl Registration {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let submitter: i64 = row.get(1)?;
        Ok(Self {
            id: row.get(0)?,
            submitter_id: UserId(submitter as u64),
            primary_name: row.get(2)?,
            teammates: TeammateSlots([row.get(3)?, row.get(4)?, row.get(5)?]),
        })
    }
}

/// Durable store of registrations. Implementations must serialize
/// concurrent inserts so every insert gets its own id.
pub trait SubmissionStore: Send + Sync {
    fn insert(&self, registration: &NewRegistration) -> Result<Registration, StorageError>;

    fn count(&self) -> Result<u64, StorageError>;
}

/// SQLite-backed submission store
#[derive(Clone)]
pub struct SqliteSubmissionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSubmissionStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!("Registration store initialized at {:?}", path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create in-memory storage (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<Registration>, StorageError> {
        let conn = self.conn.lock();
        let registration = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                Registration::from_row,
            )
            .optional()?;
        Ok(registration)
    }

    /// All registrations made by one member, oldest first
    pub fn list_by_submitter(&self, submitter: UserId) -> Result<Vec<Registration>, StorageError> {
        let submitter = sql_user_id(submitter)?;
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE submitter_id = ?1 ORDER BY id ASC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![submitter], Registration::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl SubmissionStore for SqliteSubmissionStore {
    fn insert(&self, registration: &NewRegistration) -> Result<Registration, StorageError> {
        let submitter = sql_user_id(registration.submitter_id)?;
        let [t1, t2, t3] = registration.teammates.slots();

        // Insert and rowid read share one lock so concurrent inserts cannot
        // observe each other's id.
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO registrations (submitter_id, primary_name, teammate1, teammate2, teammate3)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![submitter, registration.primary_name, t1, t2, t3],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Registration {
            id,
            submitter_id: registration.submitter_id,
            primary_name: registration.primary_name.clone(),
            teammates: registration.teammates.clone(),
        })
    }

    fn count(&self) -> Result<u64, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM registrations", [], |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }
}

fn sql_user_id(id: UserId) -> Result<i64, StorageError> {
    i64::try_from(id.0).map_err(|_| StorageError::IdOutOfRange(id.0))
}
