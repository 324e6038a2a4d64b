//! Error types for the Jotter core library.

use thiserror::Error;

/// All errors that can occur within the Jotter core library.
#[derive(Debug, Error)]
pub enum JotterError {
    /// The backing database could not be opened or created.
    ///
    /// Callers are expected to fall back to an in-memory store rather than abort.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A write would give two live notes the same title.
    #[error("A note titled '{0}' already exists")]
    DuplicateTitle(String),

    /// An operation referenced a title that is not (or no longer) present.
    #[error("Note not found: {0}")]
    NotFound(String),

    /// A note title was empty or whitespace only.
    #[error("Note title cannot be empty")]
    EmptyTitle,

    /// A stored `created_at` value could not be parsed.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The file logger could not be configured or started.
    #[error("Logging error: {0}")]
    Logging(String),

    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings data could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`JotterError`].
pub type Result<T> = std::result::Result<T, JotterError>;

impl JotterError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::StorageUnavailable(_) => {
                "Working in offline mode - notes won't be saved!".to_string()
            }
            Self::DuplicateTitle(title) => {
                format!("A note named \"{title}\" already exists. Pick another title.")
            }
            Self::NotFound(_) => "Note no longer exists".to_string(),
            Self::EmptyTitle => "Note title cannot be empty".to_string(),
            Self::InvalidTimestamp(_) => "Stored note data is damaged".to_string(),
            Self::Logging(msg) => format!("Logging unavailable: {msg}"),
            Self::Database(e) => format!("Failed to save: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }

    /// Whether a failed save may succeed later once the user fixes the input.
    ///
    /// A retryable failure keeps the unsaved edit; `NotFound` means the edit
    /// points at a deleted note and can never be written.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }

    /// Maps a SQLite `UNIQUE` violation on `notes.title` to [`JotterError::DuplicateTitle`].
    pub(crate) fn from_write(err: rusqlite::Error, title: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Self::DuplicateTitle(title.to_string())
            }
            other => Self::Database(other),
        }
    }
}
