//! SQLite connection ownership and schema bootstrap.

use crate::{JotterError, Result};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);
const REQUIRED_COLUMNS: [&str; 4] = ["id", "title", "content", "created_at"];

/// Owns the SQLite connection that backs a note store.
///
/// A file-backed storage survives the process; an in-memory one has the same
/// schema and transactional behaviour but is discarded on drop.
pub struct Storage {
    conn: Connection,
    persistent: bool,
}

impl Storage {
    /// Opens (or creates) the database file at `path` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::StorageUnavailable`] if the file cannot be opened,
    /// is not a SQLite database, or has an incompatible `notes` table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let started_at = Instant::now();
        info!("event=db_open module=storage status=start mode=file path={}", path.display());

        let result = Connection::open(path)
            .map_err(|e| unavailable(path, e))
            .and_then(|conn| bootstrap(conn).map_err(|e| unavailable(path, e)));

        match result {
            Ok(conn) => {
                info!(
                    "event=db_open module=storage status=ok mode=file duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    conn,
                    persistent: true,
                })
            }
            Err(err) => {
                error!(
                    "event=db_open module=storage status=error mode=file duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Opens an in-memory database with the same schema.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::StorageUnavailable`] if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        info!("event=db_open module=storage status=start mode=memory");
        let conn = Connection::open_in_memory()
            .and_then(bootstrap)
            .map_err(|e| {
                error!("event=db_open module=storage status=error mode=memory error={e}");
                JotterError::StorageUnavailable(format!("in-memory database: {e}"))
            })?;
        info!("event=db_open module=storage status=ok mode=memory");
        Ok(Self {
            conn,
            persistent: false,
        })
    }

    /// Whether writes through this storage reach disk.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

fn bootstrap(conn: Connection) -> rusqlite::Result<Connection> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(include_str!("schema.sql"))?;

    // An older or foreign `notes` table survives CREATE TABLE IF NOT EXISTS untouched.
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('notes')")?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    drop(stmt);

    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !columns.iter().any(|c| c == *col))
    {
        return Err(rusqlite::Error::InvalidColumnName((*missing).to_string()));
    }

    Ok(conn)
}

fn unavailable(path: &Path, err: rusqlite::Error) -> JotterError {
    JotterError::StorageUnavailable(format!("{}: {err}", path.display()))
}
