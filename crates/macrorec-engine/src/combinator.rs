//! Merging consecutive fine-grained document macros.
//!
//! Typing `f`, `o`, `o` arrives as three insertions. Merging them into one
//! insertion of `foo` keeps the stream readable. A macro is only eligible if
//! its text contains no delimiter, so merged runs stop at word boundaries.

use macrorec_core::text::char_len;
use macrorec_core::{DocumentMacro, MacroHeader};
use macrorec_settings::{CombinatorSettings, CombineMode};

/// Merges adjacent document macros according to [`CombinatorSettings`].
#[derive(Clone, Debug)]
pub struct Combinator {
    mode: CombineMode,
    delimiters: Vec<char>,
}

impl Default for Combinator {
    fn default() -> Self {
        Self::new(&CombinatorSettings::default())
    }
}

impl Combinator {
    /// Combinator configured by `settings`.
    ///
    /// An empty delimiter set in delimited mode never combines.
    pub fn new(settings: &CombinatorSettings) -> Self {
        let mode = match settings.mode {
            CombineMode::Delimited if settings.delimiters.is_empty() => CombineMode::Never,
            mode => mode,
        };
        Self {
            mode,
            delimiters: settings.delimiters.chars().collect(),
        }
    }

    /// Combinator that never merges.
    pub fn never() -> Self {
        Self::new(&CombinatorSettings::never())
    }

    /// Whether `m` may take part in a merge at all.
    pub fn can_combine(&self, m: &DocumentMacro) -> bool {
        match self.mode {
            CombineMode::Never => false,
            CombineMode::Always => !m.is_noop(),
            CombineMode::Delimited => {
                if m.inserted() {
                    !self.has_delimiter(&m.inserted_text)
                } else if m.deleted() {
                    !self.has_delimiter(&m.deleted_text)
                } else if m.replaced() {
                    !self.has_delimiter(&m.inserted_text) && !self.has_delimiter(&m.deleted_text)
                } else {
                    false
                }
            }
        }
    }

    /// Merge `next` into `prior`, or `None` if they are not contiguous.
    ///
    /// The merged macro keeps the envelope of `prior`.
    pub fn combine(&self, prior: &DocumentMacro, next: &DocumentMacro) -> Option<DocumentMacro> {
        if !self.can_combine(prior) || !self.can_combine(next) {
            return None;
        }
        if prior.action != next.action || prior.header.path != next.header.path {
            return None;
        }

        let (start, inserted, deleted) = if next.inserted() {
            // Typing forward.
            if !prior.inserted() || prior.inserted_end() != next.start {
                return None;
            }
            (prior.start, format!("{}{}", prior.inserted_text, next.inserted_text), String::new())
        } else if next.deleted() {
            if !prior.deleted() {
                return None;
            }
            if next.start + char_len(&next.deleted_text) == prior.start {
                // Backspace.
                (next.start, String::new(), format!("{}{}", next.deleted_text, prior.deleted_text))
            } else if next.start == prior.start {
                // Forward delete.
                (prior.start, String::new(), format!("{}{}", prior.deleted_text, next.deleted_text))
            } else {
                return None;
            }
        } else if next.replaced() {
            // Overwrite of text that was just inserted or replaced.
            if !(prior.inserted() || prior.replaced())
                || prior.start != next.start
                || prior.inserted_text != next.deleted_text
            {
                return None;
            }
            (prior.start, next.inserted_text.clone(), prior.deleted_text.clone())
        } else {
            return None;
        };

        Some(DocumentMacro {
            header: MacroHeader::new(prior.header.time, prior.header.path.clone()),
            action: prior.action,
            start,
            inserted_text: inserted,
            deleted_text: deleted,
        })
    }

    fn has_delimiter(&self, text: &str) -> bool {
        text.chars().any(|c| self.delimiters.contains(&c))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
