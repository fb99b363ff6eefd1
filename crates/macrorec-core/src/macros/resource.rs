//! File, resource, and VCS macros.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MacroHeader;
use crate::path::MacroPath;

action_enum! {
    /// File lifecycle events.
    FileAction {
        /// File created.
        Added => "ADDED",
        /// File deleted.
        Removed => "REMOVED",
        /// File opened in an editor.
        Opened => "OPENED",
        /// Editor closed.
        Closed => "CLOSED",
        /// File saved.
        Saved => "SAVED",
        /// Editor brought to front.
        Activated => "ACTIVATED",
        /// File changed by a refactoring.
        Refactored => "REFACTORED",
        /// File moved here from `srcDstPath`.
        MovedFrom => "MOVED_FROM",
        /// File moved away to `srcDstPath`.
        MovedTo => "MOVED_TO",
        /// File renamed from `srcDstPath`.
        RenamedFrom => "RENAMED_FROM",
        /// File renamed to `srcDstPath`.
        RenamedTo => "RENAMED_TO",
        /// Content changed outside an editor.
        ContentChanged => "CONTENT_CHANGED",
        /// File staged as added.
        GitAdded => "GIT_ADDED",
        /// File staged as removed.
        GitRemoved => "GIT_REMOVED",
        /// File staged as modified.
        GitModified => "GIT_MODIFIED",
    }
}

/// A file lifecycle event, with the file content at that moment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// What happened to the file.
    pub action: FileAction,
    /// File content, or empty when unknown.
    pub code: String,
    /// Content charset.
    pub charset: String,
    /// Counterpart path of a move or rename.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub src_dst_path: String,
}

impl FileMacro {
    /// Create a file macro.
    pub fn new(
        time: DateTime<Utc>,
        path: MacroPath,
        action: FileAction,
        code: impl Into<String>,
        charset: impl Into<String>,
    ) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action,
            code: code.into(),
            charset: charset.into(),
            src_dst_path: String::new(),
        }
    }

    /// Set the counterpart path of a move or rename.
    #[must_use]
    pub fn with_src_dst_path(mut self, path: impl Into<String>) -> Self {
        self.src_dst_path = path.into();
        self
    }
}

action_enum! {
    /// Resource delta kinds.
    ResourceAction {
        /// Resource created.
        Added => "ADDED",
        /// Resource deleted.
        Removed => "REMOVED",
        /// Resource changed.
        Changed => "CHANGED",
        /// Resource moved here.
        MovedFrom => "MOVED_FROM",
        /// Resource moved away.
        MovedTo => "MOVED_TO",
        /// Resource renamed from another name.
        RenamedFrom => "RENAMED_FROM",
        /// Resource renamed to another name.
        RenamedTo => "RENAMED_TO",
    }
}

action_enum! {
    /// Kind of resource a delta applies to.
    ResourceTarget {
        /// A project.
        Project => "PROJECT",
        /// A package (source folder below a root).
        Package => "PACKAGE",
        /// A file.
        File => "FILE",
        /// Anything else.
        Others => "OTHERS",
    }
}

/// A resource delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// Delta kind.
    pub action: ResourceAction,
    /// Resource kind.
    pub target: ResourceTarget,
    /// Counterpart path of a move or rename.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub src_dst_path: String,
}

impl ResourceMacro {
    /// Create a resource macro.
    pub fn new(
        time: DateTime<Utc>,
        path: MacroPath,
        action: ResourceAction,
        target: ResourceTarget,
    ) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action,
            target,
            src_dst_path: String::new(),
        }
    }

    /// Set the counterpart path of a move or rename.
    #[must_use]
    pub fn with_src_dst_path(mut self, path: impl Into<String>) -> Self {
        self.src_dst_path = path.into();
        self
    }
}

action_enum! {
    /// VCS notifications.
    GitAction {
        /// Repository opened.
        Open => "OPEN",
        /// Branches or tags changed.
        RefsChanged => "REFS_CHANGED",
        /// Staging area changed.
        IndexChanged => "INDEX_CHANGED",
    }
}

/// A VCS notification, path-scoped to the repository's project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitMacro {
    /// Shared envelope.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// Notification kind.
    pub action: GitAction,
    /// Paths staged as added.
    #[serde(default)]
    pub added: BTreeSet<String>,
    /// Paths staged as removed.
    #[serde(default)]
    pub removed: BTreeSet<String>,
    /// Paths staged as modified.
    #[serde(default)]
    pub modified: BTreeSet<String>,
}

impl GitMacro {
    /// Create a VCS macro with no file sets.
    pub fn new(time: DateTime<Utc>, path: MacroPath, action: GitAction) -> Self {
        Self {
            header: MacroHeader::new(time, path),
            action,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
            modified: BTreeSet::new(),
        }
    }

    /// Set the staged file sets.
    #[must_use]
    pub fn with_files(
        mut self,
        added: BTreeSet<String>,
        removed: BTreeSet<String>,
        modified: BTreeSet<String>,
    ) -> Self {
        self.added = added;
        self.removed = removed;
        self.modified = modified;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn src_dst_path_omitted_when_empty() {
        let m = FileMacro::new(Utc::now(), MacroPath::bare("/P/A.java", ""), FileAction::Saved, "", "UTF-8");
        let v = serde_json::to_value(&m).unwrap();
        assert!(v.get("srcDstPath").is_none());
        let v = serde_json::to_value(m.with_src_dst_path("/P/B.java")).unwrap();
        assert_eq!(v["srcDstPath"], "/P/B.java");
    }

    #[test]
    fn git_file_sets_serialize_sorted() {
        let modified: BTreeSet<String> = ["/P/b".to_string(), "/P/a".to_string()].into();
        let m = GitMacro::new(Utc::now(), MacroPath::bare("/P", "main"), GitAction::IndexChanged)
            .with_files(BTreeSet::new(), BTreeSet::new(), modified);
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["modified"], serde_json::json!(["/P/a", "/P/b"]));
        assert_eq!(v["action"], "INDEX_CHANGED");
    }
}
