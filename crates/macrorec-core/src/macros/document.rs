//! Document macros: one change to a resource's text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MacroHeader;
use crate::errors::{MacroError, Result};
use crate::path::MacroPath;
use crate::text::{char_len, char_slice_clamped, splice};

action_enum! {
    /// What produced a document change.
    DocumentAction {
        /// Ordinary typing or programmatic edits.
        Edit => "EDIT",
        /// Text removed by a cut command.
        Cut => "CUT",
        /// Text inserted by a paste command.
        Paste => "PASTE",
        /// Change made by an undo.
        Undo => "UNDO",
        /// Change made by a redo.
        Redo => "REDO",
        /// Reconciled change that arrived through a known channel.
        AutoDiff => "AUTO_DIFF",
        /// Reconciled change that arrived through an unobserved channel.
        IrregularDiff => "IRREGULAR_DIFF",
    }
}

/// Replacement of `deleted_text` at `start` by `inserted_text`.
///
/// Offsets count chars. A pure insertion has an empty `deleted_text`, a pure
/// deletion an empty `inserted_text`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// What produced the change.
    pub action: DocumentAction,
    /// Char offset of the change.
    pub start: usize,
    /// Text inserted at `start`.
    pub inserted_text: String,
    /// Text removed at `start`.
    pub deleted_text: String,
}

impl DocumentMacro {
    /// Create a document macro.
    pub fn new(
        time: DateTime<Utc>,
        path: MacroPath,
        action: DocumentAction,
        start: usize,
        inserted_text: impl Into<String>,
        deleted_text: impl Into<String>,
    ) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action,
            start,
            inserted_text: inserted_text.into(),
            deleted_text: deleted_text.into(),
        }
    }

    /// Only text was inserted.
    pub fn inserted(&self) -> bool {
        !self.inserted_text.is_empty() && self.deleted_text.is_empty()
    }

    /// Only text was deleted.
    pub fn deleted(&self) -> bool {
        self.inserted_text.is_empty() && !self.deleted_text.is_empty()
    }

    /// Text was both deleted and inserted.
    pub fn replaced(&self) -> bool {
        !self.inserted_text.is_empty() && !self.deleted_text.is_empty()
    }

    /// Neither inserts nor deletes anything.
    pub fn is_noop(&self) -> bool {
        self.inserted_text.is_empty() && self.deleted_text.is_empty()
    }

    /// Char offset just past the inserted text.
    pub fn inserted_end(&self) -> usize {
        self.start + char_len(&self.inserted_text)
    }

    /// Verify that `text` holds `deleted_text` at `start`.
    pub fn check(&self, text: &str) -> Result<()> {
        let len = char_len(text);
        if self.start > len {
            return Err(MacroError::OutOfBounds {
                path: self.header.path.path.clone(),
                start: self.start,
                len,
            });
        }
        let found = char_slice_clamped(text, self.start, char_len(&self.deleted_text));
        if found != self.deleted_text {
            return Err(MacroError::Inconsistency {
                path: self.header.path.path.clone(),
                start: self.start,
                expected: self.deleted_text.clone(),
                found: found.to_owned(),
            });
        }
        Ok(())
    }

    /// Apply this change to `text` after checking consistency.
    ///
    /// On error `text` is left untouched.
    pub fn apply(&self, text: &mut String) -> Result<()> {
        self.check(text)?;
        let _ = splice(text, self.start, char_len(&self.deleted_text), &self.inserted_text);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
