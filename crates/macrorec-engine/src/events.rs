//! Host notifications as data.
//!
//! Every collaborator notification the engine understands has a
//! [`HostEvent`] variant, so hosts can drive the engine through one entry
//! point ([`MacroEngine::handle`](crate::MacroEngine::handle)) and event logs
//! can be replayed. The wire form is one JSON object tagged by `event`:
//!
//! ```json
//! {"event":"documentChanged","path":"/P/src/A.java","offset":3,"insertedText":"bar"}
//! ```

use std::collections::BTreeMap;

use macrorec_core::{RefactoringAction, ResourceTarget};
use serde::{Deserialize, Serialize};

/// Undo/redo notification phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryPhase {
    /// An undo is about to replay changes.
    AboutToUndo,
    /// The undo finished.
    Undone,
    /// A redo is about to replay changes.
    AboutToRedo,
    /// The redo finished.
    Redone,
}

/// Code completion popup kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionKind {
    /// Quick assist (quick fixes).
    QuickAssist,
    /// Content assist (completion proposals).
    ContentAssist,
}

/// Kind of a resource delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeltaKind {
    /// Resource created, possibly as the target of a move.
    Added,
    /// Resource deleted, possibly as the source of a move.
    Removed,
    /// Resource modified in place.
    Changed,
}

/// One resource delta reported by the host workspace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDelta {
    /// Delta kind.
    pub kind: DeltaKind,
    /// Resource kind.
    pub target: ResourceTarget,
    /// Workspace path of the resource.
    pub path: String,
    /// For additions: where the resource was moved from.
    #[serde(default)]
    pub moved_from: Option<String>,
    /// For removals: where the resource was moved to.
    #[serde(default)]
    pub moved_to: Option<String>,
    /// Content after the delta, for files.
    #[serde(default)]
    pub content: Option<String>,
    /// Content before the delta, for files.
    #[serde(default)]
    pub previous_content: Option<String>,
    /// Content charset, for files.
    #[serde(default)]
    pub charset: String,
    /// For changes: whether the content changed (as opposed to markers or
    /// properties).
    #[serde(default)]
    pub content_changed: bool,
}

impl ResourceDelta {
    /// A delta with no move information or content.
    pub fn new(kind: DeltaKind, target: ResourceTarget, path: impl Into<String>) -> Self {
        Self {
            kind,
            target,
            path: path.into(),
            moved_from: None,
            moved_to: None,
            content: None,
            previous_content: None,
            charset: String::new(),
            content_changed: false,
        }
    }
}

/// A notification from the host editor, workspace, or VCS.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    /// Document text changed in an editor.
    #[serde(rename_all = "camelCase")]
    DocumentChanged {
        /// Resource path.
        path: String,
        /// Char offset of the change.
        offset: usize,
        /// Inserted text.
        #[serde(default)]
        inserted_text: String,
        /// Deleted text.
        #[serde(default)]
        deleted_text: String,
    },
    /// Undo/redo history notification.
    UndoHistory {
        /// Resource path.
        path: String,
        /// Phase.
        phase: HistoryPhase,
    },
    /// Caret moved.
    CursorMoved {
        /// Resource path.
        path: String,
    },
    /// A completion popup opened.
    CompletionStarted {
        /// Resource path.
        path: String,
        /// Popup kind.
        kind: CompletionKind,
    },
    /// A completion popup closed.
    CompletionEnded {
        /// Resource path.
        path: String,
        /// Popup kind.
        kind: CompletionKind,
        /// Applied proposal, if any.
        #[serde(default)]
        proposal: String,
    },
    /// A command is about to execute.
    #[serde(rename_all = "camelCase")]
    CommandExecuting {
        /// Command identifier.
        command_id: String,
        /// Command category identifier.
        category: String,
        /// Resource the command targets, when known.
        #[serde(default)]
        path: Option<String>,
    },
    /// A command finished, successfully or not.
    #[serde(rename_all = "camelCase")]
    CommandExecuted {
        /// Command identifier.
        command_id: String,
        /// Whether it succeeded.
        #[serde(default)]
        success: bool,
    },
    /// Refactoring engine notification.
    #[serde(rename_all = "camelCase")]
    Refactoring {
        /// Notification kind.
        action: RefactoringAction,
        /// Refactoring identifier.
        refactoring_id: String,
        /// Refactoring arguments.
        #[serde(default)]
        arguments: BTreeMap<String, String>,
        /// Resource being refactored, when known.
        #[serde(default)]
        path: Option<String>,
    },
    /// An editor opened.
    EditorOpened {
        /// Resource path.
        path: String,
        /// Editor content, when the host supplies it.
        #[serde(default)]
        text: Option<String>,
        /// Content charset.
        #[serde(default)]
        charset: String,
    },
    /// An editor closed.
    EditorClosed {
        /// Resource path.
        path: String,
        /// Final content, when the host supplies it.
        #[serde(default)]
        text: Option<String>,
        /// Content charset.
        #[serde(default)]
        charset: String,
    },
    /// An editor came to the front.
    EditorActivated {
        /// Resource path.
        path: String,
        /// Editor content, when the host supplies it.
        #[serde(default)]
        text: Option<String>,
        /// Content charset.
        #[serde(default)]
        charset: String,
    },
    /// A resource was selected in a project view.
    SelectionChanged {
        /// Resource path.
        path: String,
    },
    /// A workspace resource changed.
    ResourceChanged(ResourceDelta),
    /// A repository was opened.
    RepositoryOpened {
        /// Project name.
        project: String,
        /// Current branch.
        branch: String,
    },
    /// Branches or tags changed.
    BranchChanged {
        /// Project name.
        project: String,
        /// Current branch.
        branch: String,
    },
    /// The staging area changed.
    IndexChanged {
        /// Project name.
        project: String,
        /// Current branch.
        branch: String,
        /// Paths staged as added.
        #[serde(default)]
        added: Vec<String>,
        /// Paths staged as removed.
        #[serde(default)]
        removed: Vec<String>,
        /// Paths staged as modified.
        #[serde(default)]
        modified: Vec<String>,
    },
    /// Reconcile a resource against its current content.
    Reconcile {
        /// Resource path.
        path: String,
        /// Content to reconcile against; fetched from the host when absent.
        #[serde(default)]
        text: Option<String>,
        /// Whether the change came through a known channel.
        #[serde(default)]
        expected: bool,
    },
}

impl HostEvent {
    /// Parse one JSON event.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Resource path the event concerns, if it has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::DocumentChanged { path, .. }
            | Self::UndoHistory { path, .. }
            | Self::CursorMoved { path }
            | Self::CompletionStarted { path, .. }
            | Self::CompletionEnded { path, .. }
            | Self::EditorOpened { path, .. }
            | Self::EditorClosed { path, .. }
            | Self::EditorActivated { path, .. }
            | Self::SelectionChanged { path }
            | Self::Reconcile { path, .. } => Some(path),
            Self::ResourceChanged(delta) => Some(&delta.path),
            Self::CommandExecuting { path, .. } | Self::Refactoring { path, .. } => path.as_deref(),
            Self::CommandExecuted { .. }
            | Self::RepositoryOpened { .. }
            | Self::BranchChanged { .. }
            | Self::IndexChanged { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_document_change() {
        let event = HostEvent::from_json(
            r#"{"event":"documentChanged","path":"/P/A.java","offset":3,"insertedText":"bar"}"#,
        )
        .unwrap();
        assert_matches!(
            &event,
            HostEvent::DocumentChanged { offset: 3, inserted_text, deleted_text, .. }
                if inserted_text == "bar" && deleted_text.is_empty()
        );
        assert_eq!(event.path(), Some("/P/A.java"));
    }

    #[test]
    fn parse_resource_delta() {
        let event = HostEvent::from_json(
            r#"{"event":"resourceChanged","kind":"added","target":"FILE","path":"/P/B.java","movedFrom":"/P/A.java","content":"x"}"#,
        )
        .unwrap();
        let HostEvent::ResourceChanged(delta) = event else {
            panic!("expected a resource delta");
        };
        assert_eq!(delta.kind, DeltaKind::Added);
        assert_eq!(delta.target, ResourceTarget::File);
        assert_eq!(delta.moved_from.as_deref(), Some("/P/A.java"));
        assert!(!delta.content_changed);
    }

    #[test]
    fn parse_refactoring_and_history() {
        let event = HostEvent::from_json(
            r#"{"event":"refactoring","action":"ABOUT_TO_PERFORM","refactoringId":"rename","arguments":{"name":"x"}}"#,
        )
        .unwrap();
        assert_matches!(event, HostEvent::Refactoring { action: RefactoringAction::AboutToPerform, .. });

        let event = HostEvent::from_json(r#"{"event":"undoHistory","path":"/P/A.java","phase":"aboutToUndo"}"#).unwrap();
        assert_matches!(event, HostEvent::UndoHistory { phase: HistoryPhase::AboutToUndo, .. });
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(HostEvent::from_json(r#"{"event":"explode"}"#).is_err());
    }

    #[test]
    fn serializes_with_event_tag() {
        let event = HostEvent::CommandExecuted {
            command_id: "org.eclipse.ui.file.save".into(),
            success: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "commandExecuted");
        assert_eq!(json["commandId"], "org.eclipse.ui.file.save");
        assert_eq!(HostEvent::from_json(&json.to_string()).unwrap(), event);
    }
}
