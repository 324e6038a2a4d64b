//! Auto-generated titles for notes created without one.

/// Prefix used for generated titles (`"Note 1"`, `"Note 2"`, ...).
pub const DEFAULT_TITLE_PREFIX: &str = "Note";

/// Per-store counter that hands out `"<prefix> N"` titles.
///
/// The counter only moves forward. It is reset explicitly when the store is
/// cleared, never implicitly.
#[derive(Debug, Clone)]
pub struct TitleGenerator {
    prefix: String,
    counter: u64,
}

impl TitleGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }

    /// Advances the counter and returns the next candidate title.
    ///
    /// The caller decides whether the candidate is free; taken candidates are
    /// skipped by calling this again.
    pub fn next_candidate(&mut self) -> String {
        self.counter += 1;
        format!("{} {}", self.prefix, self.counter)
    }

    /// The number of the most recently issued title, `0` if none yet.
    pub fn current(&self) -> u64 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

impl Default for TitleGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_PREFIX)
    }
}
