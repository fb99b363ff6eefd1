//! Per-resource recorders.
//!
//! A [`ResourceRecorder`] owns everything the engine knows about one
//! resource: a shadow copy of its text, the document macro waiting to be
//! combined with the next keystroke, the compound of an open bracket, and the
//! raw macros observed since the last commit.
//!
//! # Bracket state machine
//!
//! ```text
//!            BEGIN                     END (non-empty: commit compound)
//!   IDLE ───────────────▶ OPEN ────────────────────────────────▶ IDLE
//!     ▲                    │  CANCEL (replay children one by one)
//!     └────────────────────┘
//! ```
//!
//! While a bracket is open, every macro joins the compound; a cancel macro
//! annuls the child it undoes instead. A BEGIN while open is ignored, and an
//! END or CANCEL only closes a compound of the same action.
//!
//! # Shadow fidelity
//!
//! A document macro is applied to the shadow exactly once, when it is
//! dumped. If its deleted text does not match the shadow, it is discarded and
//! the resource is reconciled against the host's truth instead, so the
//! difference still reaches the stream as a diff macro. The truth already
//! holds every change observed so far, so a change in hand when a repair
//! happens is discarded along with the inconsistent one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use macrorec_core::{
    CompoundMacro, DocumentAction, DocumentMacro, Macro, MacroClock, MacroPath, Timing, TriggerAction,
    TriggerMacro,
};
use tracing::{debug, warn};

use crate::aggregator::StreamAggregator;
use crate::combinator::Combinator;
use crate::diff::DiffReconciler;
use crate::host::DocumentSource;

/// Whether a resource is open in an editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecorderMode {
    /// Open in an editor: keystrokes are combined.
    Editor,
    /// Closed: every change is recorded as it arrives.
    Background,
}

/// Undo/redo phase of a resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryState {
    /// Ordinary editing.
    #[default]
    Idle,
    /// An undo is replaying changes.
    Undoing,
    /// A redo is replaying changes.
    Redoing,
}

/// Engine-wide collaborators shared by every recorder.
#[derive(Clone)]
pub struct RecorderContext {
    /// Where committed macros go.
    pub aggregator: Arc<StreamAggregator>,
    /// Timestamp source.
    pub clock: Arc<MacroClock>,
    /// Host truth for reconciliation.
    pub documents: Arc<dyn DocumentSource>,
    /// Diff settings.
    pub reconciler: DiffReconciler,
    /// Combining policy for editor keystrokes.
    pub combinator: Combinator,
}

impl std::fmt::Debug for RecorderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecorderContext")
            .field("reconciler", &self.reconciler)
            .field("combinator", &self.combinator)
            .finish_non_exhaustive()
    }
}

/// Recording state of one resource.
#[derive(Debug)]
pub struct ResourceRecorder {
    path: MacroPath,
    mode: RecorderMode,
    shadow: String,
    pending: Option<DocumentMacro>,
    compound: Option<CompoundMacro>,
    raw: Vec<Macro>,
    history: HistoryState,
    dispose_requested: bool,
    stopped: bool,
    ctx: RecorderContext,
}

impl ResourceRecorder {
    /// Recorder for `path` whose shadow starts as `shadow`.
    pub fn new(path: MacroPath, mode: RecorderMode, shadow: impl Into<String>, ctx: RecorderContext) -> Self {
        Self {
            path,
            mode,
            shadow: shadow.into(),
            pending: None,
            compound: None,
            raw: Vec::new(),
            history: HistoryState::Idle,
            dispose_requested: false,
            stopped: false,
            ctx,
        }
    }

    /// Resource path.
    pub fn path(&self) -> &MacroPath {
        &self.path
    }

    /// Current shadow text (pending macro not yet applied).
    pub fn shadow(&self) -> &str {
        &self.shadow
    }

    /// Recording mode.
    pub fn mode(&self) -> RecorderMode {
        self.mode
    }

    /// Undo/redo phase.
    pub fn history(&self) -> HistoryState {
        self.history
    }

    /// Set the undo/redo phase.
    pub fn set_history(&mut self, history: HistoryState) {
        self.history = history;
    }

    /// Action of the open compound, if any.
    pub fn open_compound(&self) -> Option<TriggerAction> {
        self.compound.as_ref().map(|c| c.action)
    }

    /// Whether the recorder has stopped and should be dropped.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Re-resolve the resource path (e.g. after a branch switch).
    pub fn set_path(&mut self, path: MacroPath) {
        if self.path != path {
            self.dump_pending();
            self.path = path;
        }
    }

    /// Switch mode, dumping any pending macro first.
    pub fn set_mode(&mut self, mode: RecorderMode) {
        if self.mode != mode {
            self.dump_pending();
            self.mode = mode;
        }
    }

    /// Replace the shadow without emitting anything.
    pub fn set_shadow(&mut self, text: impl Into<String>) {
        self.dump_pending();
        self.shadow = text.into();
    }

    /// Record an observed text change.
    pub fn record_edit(&mut self, action: DocumentAction, start: usize, inserted: &str, deleted: &str) {
        let m = DocumentMacro::new(self.ctx.clock.now(), self.path.clone(), action, start, inserted, deleted);
        self.record_document(Macro::Document(m));
    }

    /// Record an undo/redo change that annuls an earlier one.
    pub fn record_cancel(&mut self, action: DocumentAction, start: usize, inserted: &str, deleted: &str) {
        let m = DocumentMacro::new(self.ctx.clock.now(), self.path.clone(), action, start, inserted, deleted);
        self.record_document(Macro::Cancel(m));
    }

    /// Record a document or cancel macro, combining keystrokes in editor mode.
    pub fn record_document(&mut self, m: Macro) {
        self.record_raw(&m);
        let next = match m {
            Macro::Document(next) => next,
            other => {
                self.dump(other);
                return;
            }
        };

        let combinable = self.mode == RecorderMode::Editor
            && !matches!(next.action, DocumentAction::Cut | DocumentAction::Paste)
            && self.ctx.combinator.can_combine(&next);
        if !combinable {
            self.dump(Macro::Document(next));
            return;
        }

        match self.pending.take() {
            Some(prior) => match self.ctx.combinator.combine(&prior, &next) {
                Some(merged) => self.pending = Some(merged),
                None => {
                    if self.apply_and_record(Macro::Document(prior)) {
                        self.pending = Some(next);
                    } else {
                        debug!(path = %self.path.path, start = next.start, "change covered by reconciliation");
                    }
                }
            },
            None => self.pending = Some(next),
        }
    }

    /// Record a non-document macro (command, file, refactoring, ...).
    pub fn record(&mut self, m: Macro) {
        self.record_with(|_| m);
    }

    /// Record a non-document macro stamped after the pending macro is
    /// dumped, so it is never older than anything this recorder committed.
    pub fn record_with(&mut self, build: impl FnOnce(DateTime<Utc>) -> Macro) {
        self.dump_pending();
        let m = build(self.ctx.clock.now());
        self.record_raw(&m);
        self.record_macro(m);
    }

    /// Like [`record_with`](Self::record_with) for triggers. Returns the
    /// stamped trigger.
    pub fn record_trigger_with(&mut self, build: impl FnOnce(DateTime<Utc>) -> TriggerMacro) -> TriggerMacro {
        self.dump_pending();
        let trigger = build(self.ctx.clock.now());
        self.record_trigger(trigger.clone());
        trigger
    }

    /// Record a bracket trigger.
    pub fn record_trigger(&mut self, trigger: TriggerMacro) {
        self.record_raw(&Macro::Trigger(trigger.clone()));
        self.dump_pending();

        match trigger.timing {
            Timing::Begin => {
                if let Some(open) = &self.compound {
                    debug!(path = %self.path.path, open = %open.action, "compound already open");
                } else {
                    self.compound = Some(CompoundMacro::open(&trigger));
                }
            }
            Timing::End => {
                if self.open_compound() == Some(trigger.action) {
                    self.end_compound();
                }
            }
            Timing::Cancel => {
                if self.open_compound() == Some(trigger.action) {
                    self.cancel_compound();
                }
            }
            Timing::Instant => {
                if trigger.is_cursor_change() {
                    self.cancel_code_completion();
                }
            }
        }
    }

    /// Abandon an open code completion compound.
    pub fn cancel_code_completion(&mut self) {
        if self.open_compound() == Some(TriggerAction::CodeCompletion) {
            debug!(path = %self.path.path, "cancelling code completion");
            self.cancel_compound();
        }
    }

    /// Dump the pending macro (if any) through the consistency check.
    pub fn dump_pending(&mut self) {
        let _ = self.flush_pending();
    }

    /// False when the pending macro was inconsistent and forced a repair.
    fn flush_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => self.apply_and_record(Macro::Document(pending)),
            None => true,
        }
    }

    /// Reconcile the shadow with the host's current text.
    ///
    /// A host that cannot supply content leaves the resource with an empty
    /// shadow and nothing emitted.
    pub fn reconcile(&mut self, expected: bool) {
        match self.ctx.documents.current_text(&self.path.path) {
            Ok(Some(text)) => self.reconcile_with(&text, expected),
            Ok(None) => {
                debug!(path = %self.path.path, "no content to reconcile against");
                self.set_shadow(String::new());
            }
            Err(e) => {
                warn!(path = %self.path.path, error = %e, "content unavailable, resetting shadow");
                self.set_shadow(String::new());
            }
        }
    }

    /// Reconcile the shadow with `text`, emitting diff macros for the gap.
    pub fn reconcile_with(&mut self, text: &str, expected: bool) {
        self.dump_pending();
        if self.shadow == text {
            return;
        }
        let macros = self
            .ctx
            .reconciler
            .macros(&self.ctx.clock, &self.path, &self.shadow, text, expected);
        debug!(path = %self.path.path, count = macros.len(), expected, "reconciled");
        for m in macros {
            let m = Macro::Document(m);
            self.record_raw(&m);
            self.record_macro(m);
        }
        text.clone_into(&mut self.shadow);
    }

    /// Request disposal. Deferred while a compound is open.
    ///
    /// Returns whether the recorder stopped.
    pub fn dispose(&mut self) -> bool {
        if self.compound.is_some() {
            debug!(path = %self.path.path, "deferring disposal until the open compound closes");
            self.dispose_requested = true;
            return false;
        }
        self.stop();
        true
    }

    /// Flush everything: pending macro, open compound (forced END), and a
    /// final reconciliation.
    pub fn stop(&mut self) {
        self.drain();
        self.reconcile(false);
        self.stopped = true;
    }

    /// Flush the pending macro and force-close any open compound.
    pub fn drain(&mut self) {
        self.dump_pending();
        if self.compound.is_some() {
            self.end_compound();
        }
    }

    fn record_raw(&mut self, m: &Macro) {
        self.raw.push(m.clone());
        self.ctx.aggregator.record_raw(m);
    }

    fn dump(&mut self, m: Macro) {
        if self.flush_pending() {
            let _ = self.apply_and_record(m);
        } else {
            debug!(path = %self.path.path, kind = m.kind(), "change covered by reconciliation");
        }
    }

    /// Apply a document change to the shadow and record it. Returns false if
    /// it did not fit and the shadow was reconciled instead.
    fn apply_and_record(&mut self, m: Macro) -> bool {
        let Some(doc) = m.as_document() else {
            self.record_macro(m);
            return true;
        };
        match doc.apply(&mut self.shadow) {
            Ok(()) => {
                self.record_macro(m);
                true
            }
            Err(e) => {
                warn!(path = %self.path.path, error = %e, "inconsistent document macro, reconciling");
                self.reconcile(false);
                false
            }
        }
    }

    fn record_macro(&mut self, m: Macro) {
        let Some(compound) = self.compound.as_mut() else {
            let mut m = m;
            if let Macro::Compound(_) = m {
                m.set_raw_macros(std::mem::take(&mut self.raw));
            } else {
                self.raw.clear();
            }
            self.ctx.aggregator.commit(m);
            return;
        };
        match m {
            Macro::Cancel(cancel) => {
                if let Err(e) = compound.cancel(&cancel) {
                    warn!(error = %e, "dropping cancel macro");
                }
            }
            other => compound.add(other),
        }
    }

    fn end_compound(&mut self) {
        if let Some(mut compound) = self.compound.take() {
            if compound.is_empty() {
                self.raw.clear();
            } else {
                compound.sort();
                self.record_macro(Macro::Compound(compound));
            }
        }
        self.dispose_if_requested();
    }

    fn cancel_compound(&mut self) {
        if let Some(compound) = self.compound.take() {
            for child in compound.into_macros() {
                self.ctx.aggregator.commit(child);
            }
            self.raw.clear();
        }
        self.dispose_if_requested();
    }

    fn dispose_if_requested(&mut self) {
        if self.dispose_requested {
            self.dispose_requested = false;
            self.stop();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
