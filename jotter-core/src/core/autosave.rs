//! Debounced auto-save: collapses bursts of edits into one store write.
//!
//! The coordinator is a pure state machine. It never touches the store
//! itself; [`Notebook`](super::notebook::Notebook) asks it which edit is due
//! and performs the write. Time is passed in explicitly so the timer can be
//! driven by any event loop (or by a [`ManualClock`] in tests).

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Idle time after the last edit before an auto-save fires.
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(1000);

/// Source of monotonic time for the debounce timer.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall-clock [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A [`Clock`] that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// The latest unsaved state of one note's edit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    /// Title the note is stored under; identifies the row to write.
    pub key: String,
    /// Title currently in the editor. Differs from `key` after a title edit.
    pub title: String,
    pub content: String,
}

impl PendingEdit {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn changes_title(&self) -> bool {
        self.key != self.title
    }
}

/// Where the coordinator is in its debounce cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveState {
    /// Nothing to save.
    Idle,
    /// An edit is waiting for `deadline`; every new edit pushes it back.
    PendingWrite { edit: PendingEdit, deadline: Instant },
    /// A save was attempted and failed. The edit is kept, unarmed, until the
    /// user edits again or an explicit flush retries it.
    Retained { edit: PendingEdit },
}

/// Debounce state machine for editor auto-save.
#[derive(Debug)]
pub struct AutosaveCoordinator {
    state: AutosaveState,
    quiescence: Duration,
    loading: bool,
}

impl AutosaveCoordinator {
    pub fn new(quiescence: Duration) -> Self {
        Self {
            state: AutosaveState::Idle,
            quiescence,
            loading: false,
        }
    }

    pub fn quiescence(&self) -> Duration {
        self.quiescence
    }

    pub fn state(&self) -> &AutosaveState {
        &self.state
    }

    /// The unsaved edit, armed or retained.
    pub fn pending(&self) -> Option<&PendingEdit> {
        match &self.state {
            AutosaveState::Idle => None,
            AutosaveState::PendingWrite { edit, .. } | AutosaveState::Retained { edit } => {
                Some(edit)
            }
        }
    }

    /// Suppresses edit notifications while the editor is being filled
    /// programmatically.
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Records a user edit and (re)arms the timer at `now + quiescence`.
    ///
    /// Returns `false` without changing state while loading.
    pub fn note_field_edited(&mut self, edit: PendingEdit, now: Instant) -> bool {
        if self.loading {
            return false;
        }
        self.state = AutosaveState::PendingWrite {
            edit,
            deadline: now + self.quiescence,
        };
        true
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            AutosaveState::PendingWrite { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Hands out the pending edit if its quiet period has elapsed.
    ///
    /// Returns each armed edit at most once; the coordinator goes back to idle.
    pub fn take_due(&mut self, now: Instant) -> Option<PendingEdit> {
        if !self.is_due(now) {
            return None;
        }
        self.take_pending()
    }

    /// Hands out any unsaved edit immediately, armed or retained.
    pub fn take_pending(&mut self) -> Option<PendingEdit> {
        match std::mem::replace(&mut self.state, AutosaveState::Idle) {
            AutosaveState::Idle => None,
            AutosaveState::PendingWrite { edit, .. } | AutosaveState::Retained { edit } => {
                Some(edit)
            }
        }
    }

    /// Puts back an edit whose save failed, without re-arming the timer.
    pub fn retain(&mut self, edit: PendingEdit) {
        self.state = AutosaveState::Retained { edit };
    }

    /// Drops an unsaved edit for the note stored as `key`.
    ///
    /// Returns whether anything was dropped.
    pub fn discard_for(&mut self, key: &str) -> bool {
        if self.pending().is_some_and(|edit| edit.key == key) {
            self.state = AutosaveState::Idle;
            return true;
        }
        false
    }
}

impl Default for AutosaveCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_QUIESCENCE)
    }
}
