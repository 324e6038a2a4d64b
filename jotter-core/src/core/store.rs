//! Durable note CRUD over the `notes` table.

use crate::core::note::{decode_timestamp, encode_timestamp, normalize_title};
use crate::{JotterError, NoteRecord, Result, Storage, TitleGenerator};
use chrono::{SubsecRound, Utc};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Whether a [`NoteStore`] writes through to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMode {
    /// Backed by the database file; changes survive a restart.
    Persistent,
    /// The database could not be opened. Notes live in memory for the
    /// lifetime of the process only.
    Degraded {
        /// Why the file database was unavailable.
        reason: String,
    },
}

/// The note store: owns the persisted records and every write to them.
///
/// Notes are addressed by title. Each mutating call runs in its own SQLite
/// transaction, so a failed call leaves the table exactly as it was.
pub struct NoteStore {
    storage: Storage,
    titles: TitleGenerator,
    mode: StoreMode,
}

impl NoteStore {
    /// Opens the database file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::StorageUnavailable`] if the file cannot be used.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::open(path)?;
        Ok(Self::with_storage(storage, StoreMode::Persistent))
    }

    /// Opens the database file at `path`, falling back to an in-memory store
    /// in [`StoreMode::Degraded`] if it is unavailable.
    ///
    /// # Errors
    ///
    /// Only fails if SQLite cannot allocate an in-memory database either.
    pub fn open_or_degraded<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::open(path) {
            Ok(store) => Ok(store),
            Err(JotterError::StorageUnavailable(reason)) => {
                warn!("event=store_open module=store status=degraded reason={reason}");
                Self::degraded(reason)
            }
            Err(other) => Err(other),
        }
    }

    /// Creates a memory-only store.
    pub fn in_memory() -> Result<Self> {
        Self::degraded("opened in memory".to_string())
    }

    fn degraded(reason: String) -> Result<Self> {
        let storage = Storage::open_in_memory()?;
        Ok(Self::with_storage(storage, StoreMode::Degraded { reason }))
    }

    fn with_storage(storage: Storage, mode: StoreMode) -> Self {
        Self {
            storage,
            titles: TitleGenerator::default(),
            mode,
        }
    }

    pub fn mode(&self) -> &StoreMode {
        &self.mode
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.mode, StoreMode::Persistent)
    }

    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    /// Returns every note, newest first.
    ///
    /// Ordered by `created_at` descending, then by `id` descending so notes
    /// created within the same millisecond still come out in a stable order.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::Database`] for any SQLite failure, or
    /// [`JotterError::InvalidTimestamp`] if a row's `created_at` is corrupt.
    pub fn list(&self) -> Result<Vec<NoteRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, title, content, created_at FROM notes
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map([], map_note_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(note_from_row).collect()
    }

    /// Fetches a single note by title.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::NotFound`] if no note has this title.
    pub fn get(&self, title: &str) -> Result<NoteRecord> {
        let row = self
            .connection()
            .query_row(
                "SELECT id, title, content, created_at FROM notes WHERE title = ?1",
                [title],
                map_note_row,
            )
            .optional()?
            .ok_or_else(|| JotterError::NotFound(title.to_string()))?;
        note_from_row(row)
    }

    pub fn contains(&self, title: &str) -> Result<bool> {
        title_exists(self.connection(), title)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .connection()
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Inserts a new note and returns the stored record.
    ///
    /// With no `title`, the next free `"Note N"` is used. The counter behind
    /// it only moves forward, skipping titles that are already taken.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::DuplicateTitle`] if the title is taken, or
    /// [`JotterError::EmptyTitle`] if it is blank.
    pub fn create(&mut self, title: Option<&str>, content: Option<&str>) -> Result<NoteRecord> {
        let content = content.unwrap_or_default();
        let created_at = Utc::now().trunc_subsecs(3);

        let tx = self.storage.connection_mut().transaction()?;

        let title = match title {
            Some(t) => normalize_title(t)?.to_string(),
            None => next_free_title(&tx, &mut self.titles)?,
        };
        if title_exists(&tx, &title)? {
            return Err(JotterError::DuplicateTitle(title));
        }

        tx.execute(
            "INSERT INTO notes (title, content, created_at) VALUES (?1, ?2, ?3)",
            params![title, content, encode_timestamp(&created_at)],
        )
        .map_err(|e| JotterError::from_write(e, &title))?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        debug!("event=note_create module=store id={id}");

        Ok(NoteRecord {
            id,
            title,
            content: content.to_string(),
            created_at,
        })
    }

    /// Renames `old` to `new` in a single check-and-rename transaction.
    ///
    /// Renaming a note to its current title is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::NotFound`] if `old` does not exist,
    /// [`JotterError::DuplicateTitle`] if `new` is taken by another note, or
    /// [`JotterError::EmptyTitle`] if `new` is blank.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let new = normalize_title(new)?;
        let tx = self.storage.connection_mut().transaction()?;

        let id = require_id(&tx, old)?;
        if new == old {
            return Ok(());
        }
        rename_in_tx(&tx, id, new)?;

        tx.commit()?;
        debug!("event=note_rename module=store id={id}");
        Ok(())
    }

    /// Replaces the content of the note titled `title`.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::NotFound`] if no note has this title.
    pub fn update_content(&mut self, title: &str, content: &str) -> Result<()> {
        let tx = self.storage.connection_mut().transaction()?;

        let changed = tx.execute(
            "UPDATE notes SET content = ?1 WHERE title = ?2",
            params![content, title],
        )?;
        if changed == 0 {
            return Err(JotterError::NotFound(title.to_string()));
        }

        tx.commit()?;
        debug!("event=note_update module=store bytes={}", content.len());
        Ok(())
    }

    /// Writes a whole edited note back under its identifying `key`: renames
    /// it to `title` when that differs and replaces its content, atomically.
    ///
    /// # Errors
    ///
    /// Same as [`rename`](Self::rename) and [`update_content`](Self::update_content);
    /// on any error neither the title nor the content changes.
    pub fn replace(&mut self, key: &str, title: &str, content: &str) -> Result<()> {
        let title = normalize_title(title)?;
        let tx = self.storage.connection_mut().transaction()?;

        let id = require_id(&tx, key)?;
        if title != key {
            rename_in_tx(&tx, id, title)?;
        }
        tx.execute(
            "UPDATE notes SET content = ?1 WHERE id = ?2",
            params![content, id],
        )?;

        tx.commit()?;
        debug!("event=note_replace module=store id={id}");
        Ok(())
    }

    /// Deletes the note titled `title`.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::NotFound`] if no note has this title.
    pub fn delete(&mut self, title: &str) -> Result<()> {
        let tx = self.storage.connection_mut().transaction()?;

        let changed = tx.execute("DELETE FROM notes WHERE title = ?1", [title])?;
        if changed == 0 {
            return Err(JotterError::NotFound(title.to_string()));
        }

        tx.commit()?;
        debug!("event=note_delete module=store");
        Ok(())
    }

    /// Removes every note and starts the store over: ids restart at 1 and
    /// auto-titles restart at `"Note 1"`.
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.storage.connection_mut().transaction()?;
        let removed = tx.execute("DELETE FROM notes", [])?;
        tx.execute("DELETE FROM sqlite_sequence WHERE name = 'notes'", [])?;
        tx.commit()?;

        self.titles.reset();
        debug!("event=store_clear module=store removed={removed}");
        Ok(())
    }
}

/// Raw 4-column tuple extracted from a `notes` row.
type NoteRow = (i64, String, String, Option<String>);

fn map_note_row(row: &rusqlite::Row) -> rusqlite::Result<NoteRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn note_from_row((id, title, content, created_at): NoteRow) -> Result<NoteRecord> {
    let raw = created_at.ok_or_else(|| JotterError::InvalidTimestamp(format!("NULL (id {id})")))?;
    Ok(NoteRecord {
        id,
        title,
        content,
        created_at: decode_timestamp(&raw)?,
    })
}

fn title_exists(conn: &Connection, title: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM notes WHERE title = ?1", [title], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn require_id(conn: &Connection, title: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM notes WHERE title = ?1", [title], |row| row.get(0))
        .optional()?
        .ok_or_else(|| JotterError::NotFound(title.to_string()))
}

/// Must run inside the caller's transaction.
fn rename_in_tx(conn: &Connection, id: i64, new: &str) -> Result<()> {
    if title_exists(conn, new)? {
        return Err(JotterError::DuplicateTitle(new.to_string()));
    }
    conn.execute("UPDATE notes SET title = ?1 WHERE id = ?2", params![new, id])
        .map_err(|e| JotterError::from_write(e, new))?;
    Ok(())
}

fn next_free_title(conn: &Connection, titles: &mut TitleGenerator) -> Result<String> {
    loop {
        let candidate = titles.next_candidate();
        if !title_exists(conn, &candidate)? {
            return Ok(candidate);
        }
    }
}
