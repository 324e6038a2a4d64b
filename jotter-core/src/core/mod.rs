//! Internal domain modules for the Jotter core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod autosave;
pub mod error;
pub mod logging;
pub mod note;
pub mod notebook;
pub mod settings;
pub mod storage;
pub mod store;
pub mod title;

#[doc(inline)]
pub use autosave::{
    AutosaveCoordinator, AutosaveState, Clock, ManualClock, PendingEdit, SystemClock,
    DEFAULT_QUIESCENCE,
};
#[doc(inline)]
pub use error::{JotterError, Result};
#[doc(inline)]
pub use note::NoteRecord;
#[doc(inline)]
pub use notebook::{EditorState, LoadingGuard, NoListener, Notebook, NotebookListener};
#[doc(inline)]
pub use settings::Settings;
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use store::{NoteStore, StoreMode};
#[doc(inline)]
pub use title::TitleGenerator;
