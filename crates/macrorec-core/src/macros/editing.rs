//! Refactoring, copy, and code completion macros.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MacroHeader;
use crate::path::MacroPath;

action_enum! {
    /// Refactoring engine notifications.
    RefactoringAction {
        /// A refactoring is about to run.
        AboutToPerform => "ABOUT_TO_PERFORM",
        /// A refactoring is about to be undone.
        AboutToUndo => "ABOUT_TO_UNDO",
        /// A refactoring is about to be redone.
        AboutToRedo => "ABOUT_TO_REDO",
        /// A refactoring ran.
        Performed => "PERFORMED",
        /// A refactoring was undone.
        Undone => "UNDONE",
        /// A refactoring was redone.
        Redone => "REDONE",
    }
}

impl RefactoringAction {
    /// Whether this notification opens a refactoring session.
    pub fn is_about_to(self) -> bool {
        matches!(
            self,
            Self::AboutToPerform | Self::AboutToUndo | Self::AboutToRedo
        )
    }
}

/// A refactoring engine notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactoringMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// Notification kind.
    pub action: RefactoringAction,
    /// Refactoring identifier.
    pub name: String,
    /// Refactoring arguments.
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
    /// Editor selection offset when the refactoring started.
    #[serde(default)]
    pub selection_start: usize,
    /// Editor selection text when the refactoring started.
    #[serde(default)]
    pub selection_text: String,
}

impl RefactoringMacro {
    /// Create a refactoring macro with an empty selection.
    pub fn new(
        time: DateTime<Utc>,
        path: MacroPath,
        action: RefactoringAction,
        name: impl Into<String>,
        arguments: BTreeMap<String, String>,
    ) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action,
            name: name.into(),
            arguments,
            selection_start: 0,
            selection_text: String::new(),
        }
    }

    /// Set the editor selection.
    #[must_use]
    pub fn with_selection(mut self, start: usize, text: impl Into<String>) -> Self {
        self.selection_start = start;
        self.selection_text = text.into();
        self
    }
}

action_enum! {
    /// Copy macro action.
    CopyAction {
        /// Text copied.
        Copy => "COPY",
    }
}

/// Text copied from an editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// Always [`CopyAction::Copy`].
    pub action: CopyAction,
    /// Char offset of the copied range.
    pub start: usize,
    /// Copied text.
    pub copied_text: String,
}

impl CopyMacro {
    /// Create a copy macro.
    pub fn new(time: DateTime<Utc>, path: MacroPath, start: usize, copied_text: impl Into<String>) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action: CopyAction::Copy,
            start,
            copied_text: copied_text.into(),
        }
    }
}

action_enum! {
    /// Code completion session boundaries.
    CodeCompletionAction {
        /// Quick assist popup opened.
        QuickAssistBegin => "QUICK_ASSIST_BEGIN",
        /// Quick assist popup closed.
        QuickAssistEnd => "QUICK_ASSIST_END",
        /// Content assist popup opened.
        ContentAssistBegin => "CONTENT_ASSIST_BEGIN",
        /// Content assist popup closed.
        ContentAssistEnd => "CONTENT_ASSIST_END",
    }
}

/// A code completion session boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeCompletionMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// Boundary kind.
    pub action: CodeCompletionAction,
    /// Applied proposal, when known.
    #[serde(default)]
    pub name: String,
}

impl CodeCompletionMacro {
    /// Create a code completion macro.
    pub fn new(
        time: DateTime<Utc>,
        path: MacroPath,
        action: CodeCompletionAction,
        name: impl Into<String>,
    ) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action,
            name: name.into(),
        }
    }
}
