//! The decision seam between the mutation engine and whatever is driving it.
//!
//! The core never talks to a terminal: wherever an operation needs a human
//! answer mid-flight (destructive conversions, ambiguous drops, discarding
//! throwaway fragments) it asks through [`Prompter`]. The CLI binary
//! implements this over stdin; tests use [`ScriptedPrompter`] and assert how
//! often each question was asked.

use std::cell::Cell;

/// Answer to "snip dropped onto a sibling snip": nest the mover inside the
/// target, or just reorder them within their shared container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnipDropIntent {
    Insert,
    Reorder,
    Cancel,
}

pub trait Prompter {
    /// Chapter-to-snip conversion is irreversible and destructive; it must
    /// be explicitly approved.
    fn confirm_chapter_conversion(&self, chapter_title: &str) -> bool;

    /// Asked at most once per batch; the engine remembers the answer.
    fn snip_drop_intent(&self, mover_title: &str, target_title: &str) -> SnipDropIntent;

    /// Empty, never-titled fragments can skip the recycle bin entirely when
    /// deleted alongside real content.
    fn confirm_discard_empty_fragments(&self, count: usize) -> bool;
}

/// Answers everything in the affirmative. Suits non-interactive callers that
/// pass `--yes`.
pub struct AutoConfirm;

impl Prompter for AutoConfirm {
    fn confirm_chapter_conversion(&self, _chapter_title: &str) -> bool {
        true
    }

    fn snip_drop_intent(&self, _mover_title: &str, _target_title: &str) -> SnipDropIntent {
        SnipDropIntent::Insert
    }

    fn confirm_discard_empty_fragments(&self, _count: usize) -> bool {
        true
    }
}

/// Canned answers plus ask-counters, for tests.
pub struct ScriptedPrompter {
    pub convert_chapters: bool,
    pub snip_intent: SnipDropIntent,
    pub discard_empty: bool,
    pub conversion_asks: Cell<usize>,
    pub snip_asks: Cell<usize>,
    pub discard_asks: Cell<usize>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self {
            convert_chapters: true,
            snip_intent: SnipDropIntent::Insert,
            discard_empty: true,
            conversion_asks: Cell::new(0),
            snip_asks: Cell::new(0),
            discard_asks: Cell::new(0),
        }
    }

    pub fn with_snip_intent(mut self, intent: SnipDropIntent) -> Self {
        self.snip_intent = intent;
        self
    }

    pub fn refusing_conversion(mut self) -> Self {
        self.convert_chapters = false;
        self
    }

    pub fn keeping_empty_fragments(mut self) -> Self {
        self.discard_empty = false;
        self
    }
}

impl Default for ScriptedPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm_chapter_conversion(&self, _chapter_title: &str) -> bool {
        self.conversion_asks.set(self.conversion_asks.get() + 1);
        self.convert_chapters
    }

    fn snip_drop_intent(&self, _mover_title: &str, _target_title: &str) -> SnipDropIntent {
        self.snip_asks.set(self.snip_asks.get() + 1);
        self.snip_intent
    }

    fn confirm_discard_empty_fragments(&self, _count: usize) -> bool {
        self.discard_asks.set(self.discard_asks.get() + 1);
        self.discard_empty
    }
}
