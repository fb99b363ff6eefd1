//! Diff reconciliation: turning two versions of a text into document macros.
//!
//! The reconciler computes a char-level diff, cleans it up for efficiency,
//! and reads the result off as a sequence of edits whose offsets are valid
//! when the edits are applied one after another. A deletion immediately
//! followed by an insertion at the same offset is reported as one
//! replacement.
//!
//! ```text
//! "foobar" -> "foobarbaz"   =>   AUTO_DIFF { start: 6, inserted: "baz" }
//! ```

mod cleanup;

pub use cleanup::{Diff, Op, char_diff, cleanup_efficiency, cleanup_merge};

use macrorec_core::text::char_len;
use macrorec_core::{DocumentAction, DocumentMacro, MacroClock, MacroPath};

/// Edit cost used when none is configured.
pub const DEFAULT_EDIT_COST: u16 = 4;

/// One sequential edit: replace `deleted` at `start` by `inserted`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    /// Char offset in the text as it is after all preceding edits.
    pub start: usize,
    /// Inserted text.
    pub inserted: String,
    /// Deleted text.
    pub deleted: String,
}

impl TextEdit {
    fn is_deletion(&self) -> bool {
        self.inserted.is_empty() && !self.deleted.is_empty()
    }

    fn is_insertion(&self) -> bool {
        !self.inserted.is_empty() && self.deleted.is_empty()
    }
}

/// Computes the document macros that turn one text into another.
#[derive(Clone, Copy, Debug)]
pub struct DiffReconciler {
    edit_cost: usize,
}

impl Default for DiffReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_EDIT_COST)
    }
}

impl DiffReconciler {
    /// Reconciler with the given efficiency edit cost (at least 1).
    pub fn new(edit_cost: u16) -> Self {
        Self {
            edit_cost: usize::from(edit_cost.max(1)),
        }
    }

    /// Sequential edits turning `before` into `after`.
    pub fn edits(&self, before: &str, after: &str) -> Vec<TextEdit> {
        if before == after {
            return Vec::new();
        }
        let mut diffs = char_diff(before, after);
        cleanup_efficiency(&mut diffs, self.edit_cost);
        aggregate(aggregate(deltas(&diffs)))
    }

    /// Document macros turning `before` into `after`.
    ///
    /// `expected` selects AUTO_DIFF (the change came through a known
    /// channel) over IRREGULAR_DIFF. Every macro gets its own timestamp.
    pub fn macros(
        &self,
        clock: &MacroClock,
        path: &MacroPath,
        before: &str,
        after: &str,
        expected: bool,
    ) -> Vec<DocumentMacro> {
        let action = if expected {
            DocumentAction::AutoDiff
        } else {
            DocumentAction::IrregularDiff
        };
        self.edits(before, after)
            .into_iter()
            .map(|edit| {
                DocumentMacro::new(
                    clock.now(),
                    path.clone(),
                    action,
                    edit.start,
                    edit.inserted,
                    edit.deleted,
                )
            })
            .collect()
    }
}

/// Read edits off a run list.
///
/// `offset` walks the concatenation of every run; subtracting the chars
/// deleted so far gives positions in the progressively edited text.
fn deltas(diffs: &[Diff]) -> Vec<TextEdit> {
    let mut edits = Vec::new();
    let mut offset = 0;
    let mut deleted = 0;
    for diff in diffs {
        let len = char_len(&diff.text);
        let start = offset - deleted;
        match diff.op {
            Op::Equal => {}
            Op::Insert => edits.push(TextEdit {
                start,
                inserted: diff.text.clone(),
                deleted: String::new(),
            }),
            Op::Delete => {
                edits.push(TextEdit {
                    start,
                    inserted: String::new(),
                    deleted: diff.text.clone(),
                });
                deleted += len;
            }
        }
        offset += len;
    }
    edits
}

/// Fuse each deletion with an insertion that follows it at the same offset.
fn aggregate(edits: Vec<TextEdit>) -> Vec<TextEdit> {
    let mut merged: Vec<TextEdit> = Vec::with_capacity(edits.len());
    for edit in edits {
        if let Some(previous) = merged.last_mut() {
            if previous.is_deletion() && edit.is_insertion() && previous.start == edit.start {
                previous.inserted = edit.inserted;
                continue;
            }
        }
        merged.push(edit);
    }
    merged
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
