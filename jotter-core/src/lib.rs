//! Core library for Jotter: a local note list with debounced auto-save.
//!
//! The persistent side is [`NoteStore`], which owns the `notes` table of a
//! SQLite file (or an in-memory copy when the file is unavailable). The
//! editing side is [`Notebook`], which a UI drives with selection and
//! keystroke events and which writes through the store once edits settle.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    autosave::{
        AutosaveCoordinator, AutosaveState, Clock, ManualClock, PendingEdit, SystemClock,
        DEFAULT_QUIESCENCE,
    },
    error::{JotterError, Result},
    logging::{default_log_level, init_logging, logging_status},
    note::NoteRecord,
    notebook::{EditorState, LoadingGuard, NoListener, Notebook, NotebookListener},
    settings::{
        data_directory, load_settings, load_settings_from, save_settings, save_settings_to,
        settings_file_path, Settings,
    },
    storage::Storage,
    store::{NoteStore, StoreMode},
    title::{TitleGenerator, DEFAULT_TITLE_PREFIX},
};
