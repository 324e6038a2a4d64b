//! The editing session that sits between a UI and the [`NoteStore`].
//!
//! A [`Notebook`] holds the one note currently open in the editor, feeds
//! keystrokes to the [`AutosaveCoordinator`], and performs the writes it asks
//! for. Outcomes are reported back through [`NotebookListener`], so the UI
//! never needs a handle into the store.

use crate::core::autosave::{Clock, SystemClock, DEFAULT_QUIESCENCE};
use crate::{
    AutosaveCoordinator, JotterError, NoteRecord, NoteStore, PendingEdit, Result, Settings,
    StoreMode,
};
use log::{debug, warn};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

/// Callbacks from the core to the presentation layer.
///
/// Every method has an empty default so a UI only implements what it displays.
pub trait NotebookListener {
    fn on_note_created(&mut self, _note: &NoteRecord) {}

    /// A note's title changed, either by an inline rename or an auto-saved title edit.
    fn on_note_renamed(&mut self, _old: &str, _new: &str) {}

    fn on_note_deleted(&mut self, _title: &str) {}

    /// A write failed. The UI should show `error.user_message()`.
    fn on_save_failed(&mut self, _error: &JotterError) {}
}

/// A listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoListener;

impl NotebookListener for NoListener {}

/// The editor's working copy of the selected note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    /// Title the note is currently stored under.
    pub key: String,
    pub title: String,
    pub content: String,
}

impl From<&NoteRecord> for EditorState {
    fn from(note: &NoteRecord) -> Self {
        Self {
            key: note.title.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
        }
    }
}

/// An editing session over a [`NoteStore`].
pub struct Notebook {
    store: NoteStore,
    autosave: AutosaveCoordinator,
    clock: Box<dyn Clock>,
    listener: Box<dyn NotebookListener>,
    editor: Option<EditorState>,
}

impl Notebook {
    /// Starts a session with the default 1 s auto-save delay and the system clock.
    pub fn new(store: NoteStore, listener: impl NotebookListener + 'static) -> Self {
        Self::with_options(store, listener, DEFAULT_QUIESCENCE, SystemClock)
    }

    /// Starts a session with an explicit auto-save delay and clock.
    ///
    /// If `store` is degraded, the listener immediately receives
    /// [`JotterError::StorageUnavailable`] so the UI can warn that nothing
    /// will be saved.
    pub fn with_options(
        store: NoteStore,
        listener: impl NotebookListener + 'static,
        quiescence: Duration,
        clock: impl Clock + 'static,
    ) -> Self {
        let mut notebook = Self {
            store,
            autosave: AutosaveCoordinator::new(quiescence),
            clock: Box::new(clock),
            listener: Box::new(listener),
            editor: None,
        };
        if let StoreMode::Degraded { reason } = notebook.store.mode() {
            let err = JotterError::StorageUnavailable(reason.clone());
            notebook.listener.on_save_failed(&err);
        }
        notebook
    }

    /// Opens the store named in `settings` (degrading to memory if needed),
    /// clears it when `clear_on_startup` is set, and starts a session.
    ///
    /// # Errors
    ///
    /// Fails only if no store at all can be created, or clearing fails.
    pub fn from_settings(
        settings: &Settings,
        listener: impl NotebookListener + 'static,
    ) -> Result<Self> {
        let mut store = NoteStore::open_or_degraded(&settings.database_path)?;
        if settings.clear_on_startup {
            store.clear()?;
        }
        Ok(Self::with_options(
            store,
            listener,
            settings.autosave_delay(),
            SystemClock,
        ))
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn autosave(&self) -> &AutosaveCoordinator {
        &self.autosave
    }

    pub fn list(&self) -> Result<Vec<NoteRecord>> {
        self.store.list()
    }

    /// Title of the note open in the editor.
    pub fn selected(&self) -> Option<&str> {
        self.editor.as_ref().map(|e| e.key.as_str())
    }

    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    /// Creates a note and announces it through `on_note_created`.
    ///
    /// Any unsaved edit is written first, so it cannot collide with the new title.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::DuplicateTitle`] or [`JotterError::EmptyTitle`]
    /// for a bad title; the store is left unchanged. A fixable failure to
    /// save the pending edit is returned before anything is created.
    pub fn create_note(
        &mut self,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<NoteRecord> {
        self.flush_before_switch()?;
        let note = self.store.create(title, content)?;
        self.listener.on_note_created(&note);
        Ok(note)
    }

    /// Opens `title` in the editor.
    ///
    /// Any unsaved edit is written first, including when `title` is already
    /// open, so the returned record always carries the latest text.
    /// The returned record is what the UI should load into its fields,
    /// inside a [`loading`](Self::loading) guard.
    ///
    /// # Errors
    ///
    /// If the previous note cannot be saved for a reason the user can fix
    /// (e.g. a duplicate title), that error is returned and the selection
    /// does not change. Returns [`JotterError::NotFound`] if `title` does not exist.
    pub fn select_note(&mut self, title: &str) -> Result<NoteRecord> {
        let reselect = self.selected() == Some(title);
        self.flush_before_switch()?;

        // A flushed title edit moves the open note to its new key.
        if let Some(key) = self.selected().filter(|_| reselect).map(str::to_string) {
            return self.store.get(&key);
        }

        let note = self.store.get(title)?;
        self.editor = Some(EditorState::from(&note));
        debug!("event=note_select module=notebook id={}", note.id);
        Ok(note)
    }

    /// Suppresses edit notifications until the returned guard is dropped.
    ///
    /// Wrap programmatic writes to the editor widgets in this so that their
    /// change signals do not count as user edits.
    pub fn loading(&mut self) -> LoadingGuard<'_> {
        let previous = self.autosave.is_loading();
        self.autosave.set_loading(true);
        LoadingGuard {
            notebook: self,
            previous,
        }
    }

    /// Reports the editor fields after a user edit and restarts the auto-save timer.
    ///
    /// Returns `false` if the edit was ignored: nothing is selected or the
    /// fields are being loaded.
    pub fn note_field_edited(&mut self, title: &str, content: &str) -> bool {
        if self.autosave.is_loading() {
            return false;
        }
        let Some(editor) = self.editor.as_mut() else {
            return false;
        };
        editor.title = title.to_string();
        editor.content = content.to_string();

        let edit = PendingEdit::new(editor.key.clone(), title, content);
        self.autosave.note_field_edited(edit, self.clock.now())
    }

    /// When the UI's auto-save timer should next fire.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.autosave.next_deadline()
    }

    /// Time left until the pending auto-save, zero if it is already due.
    pub fn time_until_flush(&self) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(self.clock.now()))
    }

    /// Timer callback: writes the pending edit if its quiet period has passed.
    ///
    /// Returns whether a write happened.
    pub fn tick(&mut self) -> Result<bool> {
        match self.autosave.take_due(self.clock.now()) {
            Some(edit) => self.write_edit(edit).map(|()| true),
            None => Ok(false),
        }
    }

    /// Writes any unsaved edit now, without waiting for the timer.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails. A fixable failure keeps
    /// the edit for a later retry; `NotFound` discards it.
    pub fn flush_pending(&mut self) -> Result<()> {
        match self.autosave.take_pending() {
            Some(edit) => self.write_edit(edit),
            None => Ok(()),
        }
    }

    /// Renames a note from the note list (outside the editor).
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::NotFound`], [`JotterError::DuplicateTitle`] or
    /// [`JotterError::EmptyTitle`] from the store, or a failed flush of the
    /// pending edit.
    pub fn rename_note(&mut self, old: &str, new: &str) -> Result<()> {
        self.flush_before_switch()?;
        self.store.rename(old, new)?;

        let new = new.trim();
        if new == old {
            return Ok(());
        }
        if let Some(editor) = self.editor.as_mut().filter(|e| e.key == old) {
            editor.key = new.to_string();
            editor.title = new.to_string();
        }
        self.listener.on_note_renamed(old, new);
        Ok(())
    }

    /// Deletes a note, dropping any unsaved edit to it and closing it in the editor.
    ///
    /// # Errors
    ///
    /// Returns [`JotterError::NotFound`] if no note has this title.
    pub fn delete_note(&mut self, title: &str) -> Result<()> {
        self.store.delete(title)?;
        if self.autosave.discard_for(title) {
            debug!("event=autosave_discard module=notebook reason=delete");
        }

        if self.selected() == Some(title) {
            self.editor = None;
        }
        self.listener.on_note_deleted(title);
        Ok(())
    }

    /// Flushes pending edits and hands the store back.
    ///
    /// # Errors
    ///
    /// Returns the flush error; the unsaved edit has already been reported
    /// through `on_save_failed` and is lost with the session. Call
    /// [`flush_pending`](Self::flush_pending) first to give the user a chance to fix it.
    pub fn close(mut self) -> Result<NoteStore> {
        self.flush_pending()?;
        Ok(self.store)
    }

    /// Flushes before the editor moves elsewhere. Stale edits (the note is
    /// gone) do not block the move; fixable failures do.
    fn flush_before_switch(&mut self) -> Result<()> {
        match self.flush_pending() {
            Err(err) if err.is_retryable() => Err(err),
            _ => Ok(()),
        }
    }

    fn write_edit(&mut self, edit: PendingEdit) -> Result<()> {
        match self.store.replace(&edit.key, &edit.title, &edit.content) {
            Ok(()) => {
                debug!("event=autosave_flush module=notebook status=ok");
                if edit.changes_title() {
                    let stored = edit.title.trim();
                    if let Some(editor) = self.editor.as_mut().filter(|e| e.key == edit.key) {
                        editor.key = stored.to_string();
                    }
                    if stored != edit.key {
                        self.listener.on_note_renamed(&edit.key, stored);
                    }
                }
                Ok(())
            }
            Err(err) => {
                warn!("event=autosave_flush module=notebook status=error error={err}");
                self.listener.on_save_failed(&err);
                if err.is_retryable() {
                    self.autosave.retain(edit);
                } else if self.selected() == Some(edit.key.as_str()) {
                    self.editor = None;
                }
                Err(err)
            }
        }
    }
}

/// Keeps edit notifications suppressed while the editor is populated.
///
/// Derefs to the [`Notebook`]; restores the previous loading state on drop.
pub struct LoadingGuard<'a> {
    notebook: &'a mut Notebook,
    previous: bool,
}

impl Deref for LoadingGuard<'_> {
    type Target = Notebook;

    fn deref(&self) -> &Notebook {
        self.notebook
    }
}

impl DerefMut for LoadingGuard<'_> {
    fn deref_mut(&mut self) -> &mut Notebook {
        self.notebook
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.notebook.autosave.set_loading(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Created(String),
        Renamed(String, String),
        Deleted(String),
        SaveFailed(String),
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Event>>>);

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.0.borrow().clone()
        }
    }

    impl NotebookListener for Recorder {
        fn on_note_created(&mut self, note: &NoteRecord) {
            self.0.borrow_mut().push(Event::Created(note.title.clone()));
        }
        fn on_note_renamed(&mut self, old: &str, new: &str) {
            self.0
                .borrow_mut()
                .push(Event::Renamed(old.to_string(), new.to_string()));
        }
        fn on_note_deleted(&mut self, title: &str) {
            self.0.borrow_mut().push(Event::Deleted(title.to_string()));
        }
        fn on_save_failed(&mut self, error: &JotterError) {
            let kind = match error {
                JotterError::DuplicateTitle(_) => "duplicate",
                JotterError::NotFound(_) => "not_found",
                JotterError::StorageUnavailable(_) => "unavailable",
                _ => "other",
            };
            self.0.borrow_mut().push(Event::SaveFailed(kind.to_string()));
        }
    }

    fn notebook() -> (Notebook, ManualClock, Recorder) {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let store = NoteStore::in_memory().unwrap();
        let notebook =
            Notebook::with_options(store, recorder.clone(), DEFAULT_QUIESCENCE, clock.clone());
        // Drop the offline warning an in-memory store always raises.
        recorder.0.borrow_mut().clear();
        (notebook, clock, recorder)
    }

    fn content_of(notebook: &Notebook, title: &str) -> String {
        notebook.store().get(title).unwrap().content
    }

    #[test]
    fn test_degraded_store_warns_on_start() {
        let recorder = Recorder::default();
        let store = NoteStore::in_memory().unwrap();

        let _notebook = Notebook::new(store, recorder.clone());

        assert_eq!(recorder.events(), vec![Event::SaveFailed("unavailable".to_string())]);
    }

    #[test]
    fn test_create_announces_note() {
        let (mut notebook, _clock, recorder) = notebook();

        let note = notebook.create_note(None, None).unwrap();

        assert_eq!(note.title, "Note 1");
        assert_eq!(recorder.events(), vec![Event::Created("Note 1".to_string())]);
    }

    #[test]
    fn test_edit_without_selection_is_ignored() {
        let (mut notebook, _clock, _recorder) = notebook();
        assert!(!notebook.note_field_edited("x", "y"));
        assert!(notebook.next_deadline().is_none());
    }

    #[test]
    fn test_burst_of_edits_writes_once_with_last_content() {
        let (mut notebook, clock, _recorder) = notebook();
        notebook.create_note(Some("Todo"), Some("")).unwrap();
        notebook.select_note("Todo").unwrap();

        for text in ["b", "bu", "buy", "buy milk"] {
            assert!(notebook.note_field_edited("Todo", text));
            clock.advance(Duration::from_millis(200));
            assert!(!notebook.tick().unwrap());
        }
        assert_eq!(content_of(&notebook, "Todo"), "");

        clock.advance(Duration::from_millis(800));
        assert!(notebook.tick().unwrap());
        assert_eq!(content_of(&notebook, "Todo"), "buy milk");

        clock.advance(Duration::from_secs(5));
        assert!(!notebook.tick().unwrap());
    }

    #[test]
    fn test_time_until_flush_counts_down() {
        let (mut notebook, clock, _recorder) = notebook();
        notebook.create_note(Some("Todo"), None).unwrap();
        notebook.select_note("Todo").unwrap();

        notebook.note_field_edited("Todo", "a");
        clock.advance(Duration::from_millis(400));

        assert_eq!(notebook.time_until_flush(), Some(Duration::from_millis(600)));
        clock.advance(Duration::from_secs(2));
        assert_eq!(notebook.time_until_flush(), Some(Duration::ZERO));
    }

    #[test]
    fn test_loading_guard_suppresses_programmatic_edits() {
        let (mut notebook, _clock, _recorder) = notebook();
        notebook.create_note(Some("Todo"), Some("buy milk")).unwrap();
        let note = notebook.select_note("Todo").unwrap();

        {
            let mut guard = notebook.loading();
            assert!(!guard.note_field_edited(&note.title, &note.content));
        }

        assert!(notebook.next_deadline().is_none());
        assert!(!notebook.autosave().is_loading());
        assert!(notebook.note_field_edited("Todo", "typed"));
    }

    #[test]
    fn test_select_flushes_previous_note_first() {
        let (mut notebook, _clock, _recorder) = notebook();
        notebook.create_note(Some("Todo"), Some("buy milk")).unwrap();
        notebook.create_note(Some("Other"), Some("")).unwrap();
        notebook.select_note("Todo").unwrap();

        notebook.note_field_edited("Todo", "buy milk and eggs");
        let other = notebook.select_note("Other").unwrap();

        assert_eq!(other.title, "Other");
        assert_eq!(notebook.selected(), Some("Other"));
        assert_eq!(content_of(&notebook, "Todo"), "buy milk and eggs");
        assert!(notebook.next_deadline().is_none());
    }

    #[test]
    fn test_title_edit_is_saved_as_rename() {
        let (mut notebook, _clock, recorder) = notebook();
        let original = notebook.create_note(Some("draft"), Some("v1")).unwrap();
        notebook.select_note("draft").unwrap();

        notebook.note_field_edited("final", "v2");
        notebook.flush_pending().unwrap();

        let saved = notebook.store().get("final").unwrap();
        assert_eq!(saved.id, original.id);
        assert_eq!(saved.content, "v2");
        assert_eq!(notebook.selected(), Some("final"));
        assert!(recorder
            .events()
            .contains(&Event::Renamed("draft".to_string(), "final".to_string())));
    }

    #[test]
    fn test_failed_flush_retains_edit_and_blocks_switch() {
        let (mut notebook, clock, recorder) = notebook();
        notebook.create_note(Some("a"), Some("one")).unwrap();
        notebook.create_note(Some("b"), Some("two")).unwrap();
        notebook.select_note("a").unwrap();

        notebook.note_field_edited("b", "one, edited");
        clock.advance(DEFAULT_QUIESCENCE);
        let result = notebook.tick();

        assert!(matches!(result, Err(JotterError::DuplicateTitle(_))));
        assert_eq!(recorder.events().last(), Some(&Event::SaveFailed("duplicate".to_string())));
        assert_eq!(
            notebook.autosave().pending().map(|e| e.content.as_str()),
            Some("one, edited")
        );
        assert_eq!(content_of(&notebook, "a"), "one");

        // The unsaved edit pins the selection until it can be written.
        assert!(notebook.select_note("b").is_err());
        assert_eq!(notebook.selected(), Some("a"));

        notebook.note_field_edited("c", "one, edited");
        notebook.select_note("b").unwrap();
        assert_eq!(content_of(&notebook, "c"), "one, edited");
    }

    #[test]
    fn test_flush_of_deleted_note_is_discarded() {
        let (mut notebook, _clock, recorder) = notebook();
        notebook.create_note(Some("a"), Some("one")).unwrap();
        notebook.create_note(Some("b"), None).unwrap();
        notebook.select_note("a").unwrap();
        notebook.note_field_edited("a", "edited");

        // Removed behind the session's back, e.g. by another window.
        notebook.store.delete("a").unwrap();

        notebook.select_note("b").unwrap();
        assert_eq!(notebook.selected(), Some("b"));
        assert!(notebook.autosave().pending().is_none());
        assert!(recorder.events().contains(&Event::SaveFailed("not_found".to_string())));
    }

    #[test]
    fn test_delete_drops_pending_edit_and_selection() {
        let (mut notebook, clock, recorder) = notebook();
        notebook.create_note(Some("a"), Some("one")).unwrap();
        notebook.select_note("a").unwrap();
        notebook.note_field_edited("a", "edited");

        notebook.delete_note("a").unwrap();

        assert!(notebook.selected().is_none());
        assert!(notebook.autosave().pending().is_none());
        clock.advance(Duration::from_secs(2));
        assert!(!notebook.tick().unwrap());
        assert_eq!(recorder.events().last(), Some(&Event::Deleted("a".to_string())));
    }

    #[test]
    fn test_delete_missing_note() {
        let (mut notebook, _clock, recorder) = notebook();
        assert!(matches!(notebook.delete_note("ghost"), Err(JotterError::NotFound(_))));
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_failed_delete_keeps_pending_edit() {
        let (mut notebook, _clock, _recorder) = notebook();
        notebook.create_note(Some("a"), Some("one")).unwrap();
        notebook.select_note("a").unwrap();
        notebook.note_field_edited("a", "edited");
        notebook
            .store
            .connection()
            .execute_batch(
                "CREATE TRIGGER keep_a BEFORE DELETE ON notes \
                 BEGIN SELECT RAISE(ABORT, 'locked'); END;",
            )
            .unwrap();

        assert!(matches!(notebook.delete_note("a"), Err(JotterError::Database(_))));

        assert_eq!(notebook.selected(), Some("a"));
        assert_eq!(
            notebook.autosave().pending().map(|e| e.content.as_str()),
            Some("edited")
        );
        notebook.flush_pending().unwrap();
        assert_eq!(content_of(&notebook, "a"), "edited");
    }

    #[test]
    fn test_reselect_open_note_returns_unsaved_edit() {
        let (mut notebook, _clock, _recorder) = notebook();
        notebook.create_note(Some("Todo"), Some("buy milk")).unwrap();
        notebook.select_note("Todo").unwrap();
        notebook.note_field_edited("Todo", "buy milk and eggs");

        let note = notebook.select_note("Todo").unwrap();

        assert_eq!(note.content, "buy milk and eggs");
        assert_eq!(content_of(&notebook, "Todo"), "buy milk and eggs");
        assert!(notebook.autosave().pending().is_none());
    }

    #[test]
    fn test_reselect_after_title_edit_follows_new_title() {
        let (mut notebook, _clock, _recorder) = notebook();
        notebook.create_note(Some("draft"), Some("v1")).unwrap();
        notebook.select_note("draft").unwrap();
        notebook.note_field_edited("final", "v2");

        let note = notebook.select_note("draft").unwrap();

        assert_eq!(note.title, "final");
        assert_eq!(note.content, "v2");
        assert_eq!(notebook.selected(), Some("final"));
    }

    #[test]
    fn test_create_note_flushes_pending_edit() {
        let (mut notebook, _clock, _recorder) = notebook();
        notebook.create_note(Some("Todo"), Some("buy milk")).unwrap();
        notebook.select_note("Todo").unwrap();
        notebook.note_field_edited("Todo", "buy milk and eggs");

        notebook.create_note(Some("New"), None).unwrap();

        assert_eq!(content_of(&notebook, "Todo"), "buy milk and eggs");
        assert!(notebook.autosave().pending().is_none());
    }

    #[test]
    fn test_create_note_blocked_by_unsaved_title_clash() {
        let (mut notebook, _clock, _recorder) = notebook();
        notebook.create_note(Some("a"), None).unwrap();
        notebook.create_note(Some("b"), None).unwrap();
        notebook.select_note("a").unwrap();
        notebook.note_field_edited("b", "");

        assert!(matches!(
            notebook.create_note(Some("c"), None),
            Err(JotterError::DuplicateTitle(_))
        ));
        assert!(!notebook.store().contains("c").unwrap());
        assert!(notebook.autosave().pending().is_some());
    }

    #[test]
    fn test_rename_note_updates_selection() {
        let (mut notebook, _clock, recorder) = notebook();
        notebook.create_note(Some("a"), Some("one")).unwrap();
        notebook.select_note("a").unwrap();
        notebook.note_field_edited("a", "typed");

        notebook.rename_note("a", " renamed ").unwrap();

        assert_eq!(notebook.selected(), Some("renamed"));
        assert_eq!(content_of(&notebook, "renamed"), "typed");
        assert_eq!(
            recorder.events().last(),
            Some(&Event::Renamed("a".to_string(), "renamed".to_string()))
        );
    }

    #[test]
    fn test_rename_to_same_title_is_silent() {
        let (mut notebook, _clock, recorder) = notebook();
        notebook.create_note(Some("a"), None).unwrap();
        recorder.0.borrow_mut().clear();

        notebook.rename_note("a", "a").unwrap();

        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_close_flushes() {
        let (mut notebook, _clock, _recorder) = notebook();
        notebook.create_note(Some("a"), Some("one")).unwrap();
        notebook.select_note("a").unwrap();
        notebook.note_field_edited("a", "last words");

        let store = notebook.close().unwrap();

        assert_eq!(store.get("a").unwrap().content, "last words");
    }
}
