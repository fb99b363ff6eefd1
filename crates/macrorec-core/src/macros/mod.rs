//! The macro model.
//!
//! A macro is a structured record of one observed or inferred editing
//! action. Every kind shares a [`MacroHeader`] (timestamp, resource path,
//! branch, and the raw macros that produced it) and adds its own payload.
//! [`Macro`] is the closed set of kinds, dispatched by pattern matching.
//!
//! # Wire format
//!
//! Macros serialize to flat JSON objects tagged by `kind`:
//!
//! ```json
//! {
//!   "kind": "DocumentMacro",
//!   "time": "2026-10-19T08:15:02.125031Z",
//!   "path": "/Tetris/src/game/Board.java",
//!   "branch": "main",
//!   "project": "Tetris",
//!   "package": "game",
//!   "file": "Board.java",
//!   "rawMacros": [],
//!   "action": "EDIT",
//!   "start": 3,
//!   "insertedText": "bar",
//!   "deletedText": ""
//! }
//! ```

/// Defines a closed action/tag enum with its `SCREAMING_SNAKE_CASE` wire tag.
macro_rules! action_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $tag:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $tag)] $variant, )+
        }

        impl $name {
            /// Wire tag of this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $tag, )+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mod compound;
mod document;
mod editing;
mod resource;
mod trigger;

pub use compound::CompoundMacro;
pub use document::{DocumentAction, DocumentMacro};
pub use editing::{
    CodeCompletionAction, CodeCompletionMacro, CopyAction, CopyMacro, RefactoringAction,
    RefactoringMacro,
};
pub use resource::{FileAction, FileMacro, GitAction, GitMacro, ResourceAction, ResourceMacro, ResourceTarget};
pub use trigger::{CommandAction, CommandMacro, Timing, TriggerAction, TriggerMacro};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::MacroPath;

/// Envelope fields shared by every macro kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroHeader {
    /// When the macro was recorded. Distinct per macro.
    pub time: DateTime<Utc>,
    /// Resource the macro applies to.
    #[serde(flatten)]
    pub path: MacroPath,
    /// Unaggregated macros that produced this one, attached at commit time.
    #[serde(default)]
    pub raw_macros: Vec<Macro>,
}

impl MacroHeader {
    /// Header with no raw macros.
    pub fn new(time: DateTime<Utc>, path: MacroPath) -> Self {
        Self {
            time,
            path,
            raw_macros: Vec::new(),
        }
    }
}

/// Any recorded macro.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Macro {
    /// A change to document text.
    #[serde(rename = "DocumentMacro")]
    Document(DocumentMacro),
    /// An undo/redo step that annuls an earlier document change.
    #[serde(rename = "CancelMacro")]
    Cancel(DocumentMacro),
    /// A host command execution.
    #[serde(rename = "CommandMacro")]
    Command(CommandMacro),
    /// A bracket boundary. Never emitted on the macro channel.
    #[serde(rename = "TriggerMacro")]
    Trigger(TriggerMacro),
    /// Macros grouped by one bracketed session.
    #[serde(rename = "CompoundMacro")]
    Compound(CompoundMacro),
    /// A file lifecycle event.
    #[serde(rename = "FileMacro")]
    File(FileMacro),
    /// A resource delta.
    #[serde(rename = "ResourceMacro")]
    Resource(ResourceMacro),
    /// A refactoring engine notification.
    #[serde(rename = "RefactoringMacro")]
    Refactoring(RefactoringMacro),
    /// Text copied to the clipboard.
    #[serde(rename = "CopyMacro")]
    Copy(CopyMacro),
    /// A code completion session boundary.
    #[serde(rename = "CodeCompletionMacro")]
    CodeCompletion(CodeCompletionMacro),
    /// A VCS notification.
    #[serde(rename = "GitMacro")]
    Git(GitMacro),
}

impl Macro {
    /// The shared envelope.
    pub fn header(&self) -> &MacroHeader {
        match self {
            Self::Document(m) | Self::Cancel(m) => &m.header,
            Self::Command(m) => &m.header,
            Self::Trigger(m) => &m.header,
            Self::Compound(m) => &m.header,
            Self::File(m) => &m.header,
            Self::Resource(m) => &m.header,
            Self::Refactoring(m) => &m.header,
            Self::Copy(m) => &m.header,
            Self::CodeCompletion(m) => &m.header,
            Self::Git(m) => &m.header,
        }
    }

    /// Mutable access to the shared envelope.
    pub fn header_mut(&mut self) -> &mut MacroHeader {
        match self {
            Self::Document(m) | Self::Cancel(m) => &mut m.header,
            Self::Command(m) => &mut m.header,
            Self::Trigger(m) => &mut m.header,
            Self::Compound(m) => &mut m.header,
            Self::File(m) => &mut m.header,
            Self::Resource(m) => &mut m.header,
            Self::Refactoring(m) => &mut m.header,
            Self::Copy(m) => &mut m.header,
            Self::CodeCompletion(m) => &mut m.header,
            Self::Git(m) => &mut m.header,
        }
    }

    /// Recording time.
    pub fn time(&self) -> DateTime<Utc> {
        self.header().time
    }

    /// Resource path projection.
    pub fn macro_path(&self) -> &MacroPath {
        &self.header().path
    }

    /// Workspace path of the resource.
    pub fn path(&self) -> &str {
        &self.header().path.path
    }

    /// Branch of the resource.
    pub fn branch(&self) -> &str {
        &self.header().path.branch
    }

    /// Wire tag of the `kind` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Document(_) => "DocumentMacro",
            Self::Cancel(_) => "CancelMacro",
            Self::Command(_) => "CommandMacro",
            Self::Trigger(_) => "TriggerMacro",
            Self::Compound(_) => "CompoundMacro",
            Self::File(_) => "FileMacro",
            Self::Resource(_) => "ResourceMacro",
            Self::Refactoring(_) => "RefactoringMacro",
            Self::Copy(_) => "CopyMacro",
            Self::CodeCompletion(_) => "CodeCompletionMacro",
            Self::Git(_) => "GitMacro",
        }
    }

    /// Wire tag of the `action` field.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Document(m) | Self::Cancel(m) => m.action.as_str(),
            Self::Command(m) => m.action.as_str(),
            Self::Trigger(m) => m.action.as_str(),
            Self::Compound(m) => m.action.as_str(),
            Self::File(m) => m.action.as_str(),
            Self::Resource(m) => m.action.as_str(),
            Self::Refactoring(m) => m.action.as_str(),
            Self::Copy(m) => m.action.as_str(),
            Self::CodeCompletion(m) => m.action.as_str(),
            Self::Git(m) => m.action.as_str(),
        }
    }

    /// Document payload of document and cancel macros.
    pub fn as_document(&self) -> Option<&DocumentMacro> {
        match self {
            Self::Document(m) | Self::Cancel(m) => Some(m),
            _ => None,
        }
    }

    /// Whether this is a bracket boundary.
    pub fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger(_))
    }

    /// Unaggregated macros attached at commit time.
    pub fn raw_macros(&self) -> &[Macro] {
        &self.header().raw_macros
    }

    /// Attach the raw macros that produced this one.
    pub fn set_raw_macros(&mut self, raw: Vec<Macro>) {
        self.header_mut().raw_macros = raw;
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<CommandMacro> for Macro {
    fn from(m: CommandMacro) -> Self {
        Self::Command(m)
    }
}

impl From<TriggerMacro> for Macro {
    fn from(m: TriggerMacro) -> Self {
        Self::Trigger(m)
    }
}

impl From<CompoundMacro> for Macro {
    fn from(m: CompoundMacro) -> Self {
        Self::Compound(m)
    }
}

impl From<FileMacro> for Macro {
    fn from(m: FileMacro) -> Self {
        Self::File(m)
    }
}

impl From<ResourceMacro> for Macro {
    fn from(m: ResourceMacro) -> Self {
        Self::Resource(m)
    }
}

impl From<RefactoringMacro> for Macro {
    fn from(m: RefactoringMacro) -> Self {
        Self::Refactoring(m)
    }
}

impl From<CopyMacro> for Macro {
    fn from(m: CopyMacro) -> Self {
        Self::Copy(m)
    }
}

impl From<CodeCompletionMacro> for Macro {
    fn from(m: CodeCompletionMacro) -> Self {
        Self::CodeCompletion(m)
    }
}

impl From<GitMacro> for Macro {
    fn from(m: GitMacro) -> Self {
        Self::Git(m)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
