//! Command macros and the trigger markers that bracket sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MacroHeader;
use crate::path::MacroPath;

action_enum! {
    /// Command macro action.
    CommandAction {
        /// A command was executed.
        Execution => "EXECUTION",
    }
}

/// Execution of a host command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// Always [`CommandAction::Execution`].
    pub action: CommandAction,
    /// Host command identifier.
    pub command_id: String,
}

impl CommandMacro {
    /// Create a command macro.
    pub fn new(time: DateTime<Utc>, path: MacroPath, command_id: impl Into<String>) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action: CommandAction::Execution,
            command_id: command_id.into(),
        }
    }
}

action_enum! {
    /// The kind of session a trigger delimits.
    TriggerAction {
        /// A refactoring session.
        Refactoring => "REFACTORING",
        /// A command execution.
        Command => "COMMAND",
        /// An undo step.
        Undo => "UNDO",
        /// A redo step.
        Redo => "REDO",
        /// Cursor movement.
        CursorChange => "CURSOR_CHANGE",
        /// A VCS index update.
        Git => "GIT",
        /// A code completion session.
        CodeCompletion => "CODE_COMPLETION",
    }
}

action_enum! {
    /// Position of a trigger in its session.
    Timing {
        /// Opens a bracket.
        Begin => "BEGIN",
        /// Closes a bracket, committing its contents.
        End => "END",
        /// Abandons a bracket, replaying its contents individually.
        Cancel => "CANCEL",
        /// A point event with no bracket.
        Instant => "INSTANT",
    }
}

/// Boundary marker of a bracketed session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// Session kind.
    pub action: TriggerAction,
    /// Boundary position.
    pub timing: Timing,
    /// Command that started the session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandMacro>,
}

impl TriggerMacro {
    /// Create a trigger.
    pub fn new(time: DateTime<Utc>, path: MacroPath, action: TriggerAction, timing: Timing) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action,
            timing,
            command: None,
        }
    }

    /// Attach the originating command.
    #[must_use]
    pub fn with_command(mut self, command: CommandMacro) -> Self {
        self.command = Some(command);
        self
    }

    /// Opens a bracket.
    pub fn is_begin(&self) -> bool {
        self.timing == Timing::Begin
    }

    /// Closes a bracket.
    pub fn is_end(&self) -> bool {
        self.timing == Timing::End
    }

    /// Abandons a bracket.
    pub fn is_cancel(&self) -> bool {
        self.timing == Timing::Cancel
    }

    /// Instantaneous cursor movement.
    pub fn is_cursor_change(&self) -> bool {
        self.action == TriggerAction::CursorChange
    }
}
