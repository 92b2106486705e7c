//! The domain store: a single SQLite file accessed through a serialized
//! writer lock. WAL mode lets readers proceed while a writer holds the
//! lock; the lock itself exists because `rusqlite::Connection` is `!Sync`
//! and we want one clear serialization point rather than a connection
//! pool, matching the "single-process, serialized writers" requirement.

pub mod audit;
pub mod drivers;
pub mod finance;
pub mod missions;
pub mod requests;
pub mod routes;
mod schema;
pub mod stats;
pub mod subcontractors;
pub mod users;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use fretcore_domain::error::Error;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> fretcore_domain::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref()).map_err(map_db_err)?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> fretcore_domain::Result<Self> {
        let conn = Connection::open_in_memory().map_err(map_db_err)?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Translate a SQLite error into the shared domain error type. A UNIQUE
/// constraint violation becomes a `Conflict`; everything else is `Internal`
/// since it indicates a bug or a corrupted file, not a client mistake.
pub fn map_db_err(e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(ref ffi_err, _) = e {
        if ffi_err.code == rusqlite::ErrorCode::ConstraintViolation {
            return Error::Conflict(e.to_string());
        }
    }
    Error::Internal(format!("db: {e}"))
}
