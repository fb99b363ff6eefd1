//! Seams to the host editor.
//!
//! The engine never reads files or editor buffers itself. Whenever it needs
//! the current truth of a resource (to reconcile its shadow buffer, or to
//! capture a selection for a copy or refactoring macro) it asks a
//! [`DocumentSource`]. Project layout questions go to a
//! [`ProjectLayout`](macrorec_core::ProjectLayout).

use dashmap::DashMap;
use macrorec_core::Result;
use macrorec_core::text::splice;

/// Text currently selected in an editor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Char offset of the selection.
    pub start: usize,
    /// Selected text.
    pub text: String,
}

/// Current content of resources, as the host sees it.
pub trait DocumentSource: Send + Sync {
    /// Current text of `path`.
    ///
    /// `Ok(None)` means the host has no content for it (deleted, binary, or
    /// not tracked). An error means it should have had content but could not
    /// produce it. The engine treats both as "no content".
    fn current_text(&self, path: &str) -> Result<Option<String>>;

    /// Current selection in the editor of `path`, if any.
    fn selection(&self, _path: &str) -> Option<Selection> {
        None
    }
}

/// A host that never has content.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDocuments;

impl DocumentSource for NoDocuments {
    fn current_text(&self, _path: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Documents kept in memory, mirrored from host events.
///
/// Used by the replay tool and tests, where there is no live editor to ask.
#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    texts: DashMap<String, String>,
    selections: DashMap<String, Selection>,
}

impl InMemoryDocuments {
    /// Empty document set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the text of `path`.
    pub fn set_text(&self, path: &str, text: impl Into<String>) {
        let _ = self.texts.insert(path.to_owned(), text.into());
    }

    /// Forget `path`.
    pub fn remove(&self, path: &str) {
        let _ = self.texts.remove(path);
        let _ = self.selections.remove(path);
    }

    /// Move the text of `from` to `to`.
    pub fn rename(&self, from: &str, to: &str) {
        if let Some((_, text)) = self.texts.remove(from) {
            let _ = self.texts.insert(to.to_owned(), text);
        }
    }

    /// Apply a change to `path`. Returns `false` if it does not fit the text.
    pub fn apply_change(&self, path: &str, start: usize, removed: usize, inserted: &str) -> bool {
        let mut text = self.texts.entry(path.to_owned()).or_default();
        splice(&mut text, start, removed, inserted)
    }

    /// Set the selection reported for `path`.
    pub fn set_selection(&self, path: &str, start: usize, text: impl Into<String>) {
        let _ = self.selections.insert(
            path.to_owned(),
            Selection {
                start,
                text: text.into(),
            },
        );
    }

    /// Text of `path`, if known.
    pub fn text(&self, path: &str) -> Option<String> {
        self.texts.get(path).map(|t| t.value().clone())
    }
}

impl DocumentSource for InMemoryDocuments {
    fn current_text(&self, path: &str) -> Result<Option<String>> {
        Ok(self.text(path))
    }

    fn selection(&self, path: &str) -> Option<Selection> {
        self.selections.get(path).map(|s| s.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_documents() {
        let docs = InMemoryDocuments::new();
        assert_eq!(docs.current_text("/P/a").unwrap(), None);

        docs.set_text("/P/a", "hello");
        assert!(docs.apply_change("/P/a", 5, 0, " world"));
        assert!(!docs.apply_change("/P/a", 50, 0, "x"));
        assert_eq!(docs.current_text("/P/a").unwrap().as_deref(), Some("hello world"));

        docs.rename("/P/a", "/P/b");
        assert_eq!(docs.text("/P/a"), None);
        assert_eq!(docs.text("/P/b").as_deref(), Some("hello world"));

        docs.set_selection("/P/b", 6, "world");
        assert_eq!(docs.selection("/P/b").map(|s| s.start), Some(6));
        docs.remove("/P/b");
        assert!(docs.selection("/P/b").is_none());
    }

    #[test]
    fn no_documents() {
        assert_eq!(NoDocuments.current_text("/P/a").unwrap(), None);
        assert!(NoDocuments.selection("/P/a").is_none());
    }
}
