//! Compound macros: the contents of one bracketed session.

use serde::{Deserialize, Serialize};

use super::{CommandMacro, DocumentMacro, Macro, MacroHeader, TriggerAction, TriggerMacro};
use crate::errors::{MacroError, Result};
use crate::text::{char_len, truncate_chars};

/// Macros recorded between a BEGIN trigger and its END.
///
/// Children are sorted by timestamp before commit. An empty compound is never
/// emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundMacro {
    /// Shared envelope. Time and path come from the opening trigger.
    #[serde(flatten)]
    pub header: MacroHeader,
    /// Session kind of the opening trigger.
    pub action: TriggerAction,
    /// Command that started the session, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandMacro>,
    macros: Vec<Macro>,
}

/// How a cancel macro annulled its target.
enum Annulment {
    Whole,
    Partial,
}

impl CompoundMacro {
    /// Open a compound for a BEGIN trigger.
    pub fn open(trigger: &TriggerMacro) -> Self {
        Self {
            header: MacroHeader::new(trigger.header.time, trigger.header.path.clone()),
            action: trigger.action,
            command: trigger.command.clone(),
            macros: Vec::new(),
        }
    }

    /// Append a child.
    pub fn add(&mut self, m: Macro) {
        self.macros.push(m);
    }

    /// Children in their current order.
    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    /// Originating command, if any.
    pub fn command(&self) -> Option<&CommandMacro> {
        self.command.as_ref()
    }

    /// No children.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Stable sort of the children by timestamp.
    pub fn sort(&mut self) {
        self.macros.sort_by_key(Macro::time);
    }

    /// Take the children, leaving the compound empty.
    pub fn into_macros(self) -> Vec<Macro> {
        self.macros
    }

    /// Annul the most recent document change undone by `cancel`.
    ///
    /// A cancel that exactly inverts a child removes it. A cancel that undoes
    /// only the trailing chars of an insertion (or re-inserts the trailing
    /// chars of a deletion) trims that child, matching char by char from the
    /// boundary. The compound is unchanged on error.
    pub fn cancel(&mut self, cancel: &DocumentMacro) -> Result<()> {
        for idx in (0..self.macros.len()).rev() {
            let Macro::Document(target) = &mut self.macros[idx] else {
                continue;
            };
            match annul(target, cancel) {
                Some(Annulment::Whole) => {
                    let _ = self.macros.remove(idx);
                    return Ok(());
                }
                Some(Annulment::Partial) => return Ok(()),
                None => {}
            }
        }
        Err(MacroError::CancelMismatch {
            path: cancel.header.path.path.clone(),
            start: cancel.start,
        })
    }
}

fn annul(target: &mut DocumentMacro, cancel: &DocumentMacro) -> Option<Annulment> {
    if target.start == cancel.start
        && target.inserted_text == cancel.deleted_text
        && target.deleted_text == cancel.inserted_text
    {
        return Some(Annulment::Whole);
    }

    // Trailing chars of an insertion deleted again.
    if target.inserted() && cancel.deleted() {
        let n = char_len(&cancel.deleted_text);
        let len = char_len(&target.inserted_text);
        if n < len
            && cancel.start == target.start + len - n
            && target.inserted_text.ends_with(&cancel.deleted_text)
        {
            truncate_chars(&mut target.inserted_text, len - n);
            return Some(Annulment::Partial);
        }
    }

    // Trailing chars of a deletion restored.
    if target.deleted() && cancel.inserted() {
        let n = char_len(&cancel.inserted_text);
        let len = char_len(&target.deleted_text);
        if n < len
            && cancel.start == target.start
            && target.deleted_text.ends_with(&cancel.inserted_text)
        {
            truncate_chars(&mut target.deleted_text, len - n);
            return Some(Annulment::Partial);
        }
    }

    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
