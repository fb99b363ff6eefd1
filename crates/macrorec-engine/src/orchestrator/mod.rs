//! The orchestrator: one coordination point per engine.
//!
//! Host notifications arrive here. The orchestrator keeps the cross-cutting
//! session flags (save, cut, paste, and refactoring in progress, plus the
//! path being refactored), classifies document changes, routes triggers to
//! the right [`ResourceRecorder`] and to the aggregator, and resolves every
//! resource path to a [`MacroPath`] on its project's current branch.
//!
//! # Locking
//!
//! Session flags live behind one short-lived mutex that is never held while
//! another lock is taken. Recorders are individually locked; a recorder lock
//! may be held while the aggregator lock is taken, never the other way round.
//! The recorder map is only touched to look up or insert recorders, never
//! while a recorder is locked.

mod commands;
mod resources;
mod vcs;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use macrorec_core::path::normalize;
use macrorec_core::text::{char_len, char_slice, splice};
use macrorec_core::{
    CodeCompletionAction, CodeCompletionMacro, CommandMacro, DocumentAction, Macro, MacroPath, PathResolver,
    ProjectLayout, Timing, TriggerAction, TriggerMacro, project_name,
};
use macrorec_settings::{CommandSettings, MacroRecorderSettings};
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::events::{CompletionKind, HistoryPhase};
use crate::recorder::{HistoryState, RecorderContext, RecorderMode, ResourceRecorder};

type SharedRecorder = Arc<Mutex<ResourceRecorder>>;

/// Cross-resource session flags.
#[derive(Debug, Default)]
struct SessionState {
    save: bool,
    cut: bool,
    paste: bool,
    refactoring: bool,
    refactored_path: Option<String>,
    selected_path: Option<String>,
    active_path: Option<String>,
    last_command: Option<CommandMacro>,
    /// Path of a refactoring command bracket awaiting its post-execute.
    command_bracket: Option<String>,
}

/// Routes host notifications to recorders and the aggregator.
pub struct Orchestrator {
    ctx: RecorderContext,
    commands: CommandSettings,
    resolver: PathResolver,
    recorders: DashMap<String, SharedRecorder>,
    branches: DashMap<String, String>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("recorders", &self.recorders.len())
            .field("branches", &self.branches.len())
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Orchestrator sharing `ctx` with every recorder it creates.
    pub fn new(settings: &MacroRecorderSettings, ctx: RecorderContext, layout: Arc<dyn ProjectLayout>) -> Self {
        let resolver = PathResolver::new(layout)
            .with_extensions(settings.paths.source_extensions.clone())
            .with_default_package(settings.paths.default_package.clone());
        Self {
            ctx,
            commands: settings.commands.clone(),
            resolver,
            recorders: DashMap::new(),
            branches: DashMap::new(),
            state: Mutex::new(SessionState::default()),
        }
    }

    // ── paths and branches ───────────────────────────────────────────────

    /// Cached branch of `project`, or empty.
    pub fn branch(&self, project: &str) -> String {
        self.branches
            .get(project)
            .map(|b| b.value().clone())
            .unwrap_or_default()
    }

    /// Resolve `path` on its project's current branch.
    pub fn macro_path(&self, path: &str) -> MacroPath {
        let path = normalize(path);
        let branch = self.branch(project_name(&path));
        self.resolver.resolve(&path, &branch)
    }

    // ── recorders ────────────────────────────────────────────────────────

    /// Number of live recorders.
    pub fn recorder_count(&self) -> usize {
        self.recorders.len()
    }

    /// Shadow text of `path`, if it has a recorder.
    pub fn shadow(&self, path: &str) -> Option<String> {
        self.recorder(&normalize(path)).map(|r| r.lock().shadow().to_owned())
    }

    /// Mode of the recorder of `path`, if any.
    pub fn mode(&self, path: &str) -> Option<RecorderMode> {
        self.recorder(&normalize(path)).map(|r| r.lock().mode())
    }

    /// Path currently being refactored.
    pub fn refactored_path(&self) -> Option<String> {
        self.state.lock().refactored_path.clone()
    }

    fn recorder(&self, path: &str) -> Option<SharedRecorder> {
        self.recorders.get(path).map(|r| Arc::clone(r.value()))
    }

    fn ensure_recorder(&self, path: &str, mode: RecorderMode, shadow: impl FnOnce() -> String) -> SharedRecorder {
        if let Some(existing) = self.recorder(path) {
            return existing;
        }
        let recorder = ResourceRecorder::new(self.macro_path(path), mode, shadow(), self.ctx.clone());
        let shared = Arc::new(Mutex::new(recorder));
        Arc::clone(self.recorders.entry(path.to_owned()).or_insert(shared).value())
    }

    /// Run `f` on the recorder of `path`, dropping the recorder if it stopped.
    fn with_recorder<R>(&self, path: &str, f: impl FnOnce(&mut ResourceRecorder) -> R) -> Option<R> {
        let shared = self.recorder(path)?;
        let mut recorder = shared.lock();
        let out = f(&mut recorder);
        let stopped = recorder.is_stopped();
        drop(recorder);
        if stopped {
            let _ = self.recorders.remove_if(path, |_, r| Arc::ptr_eq(r, &shared));
            debug!(path, "recorder disposed");
        }
        Some(out)
    }

    fn dump_all_pending(&self) {
        let recorders: Vec<SharedRecorder> = self.recorders.iter().map(|r| Arc::clone(r.value())).collect();
        for recorder in recorders {
            recorder.lock().dump_pending();
        }
    }

    fn host_text(&self, path: &str) -> Option<String> {
        match self.ctx.documents.current_text(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path, error = %e, "content unavailable");
                None
            }
        }
    }

    /// Flush every recorder: pending macros and forced END on open compounds.
    /// Recorders are dropped afterwards.
    pub fn drain(&self) {
        let recorders: Vec<SharedRecorder> = self.recorders.iter().map(|r| Arc::clone(r.value())).collect();
        for recorder in recorders {
            recorder.lock().drain();
        }
        self.recorders.clear();
        *self.state.lock() = SessionState::default();
    }

    // ── routing ──────────────────────────────────────────────────────────

    fn now(&self) -> DateTime<Utc> {
        self.ctx.clock.now()
    }

    fn trigger(&self, path: &str, action: TriggerAction, timing: Timing) -> Boundary {
        Boundary {
            path: self.macro_path(path),
            action,
            timing,
            command: None,
        }
    }

    /// Record a non-document macro for `path`.
    ///
    /// It goes through the resource's recorder when there is one, so it
    /// joins that resource's open compound; otherwise straight to the
    /// aggregator. `build` receives the macro's timestamp, taken under the
    /// lock it is committed under.
    pub fn record_macro(&self, path: &str, build: impl FnOnce(DateTime<Utc>) -> Macro) {
        let path = normalize(path);
        let mut build = Some(build);
        let _ = self.with_recorder(&path, |r| {
            if let Some(build) = build.take() {
                r.record_with(build);
            }
        });
        if let Some(build) = build {
            self.ctx.aggregator.commit_new(&self.ctx.clock, build);
        }
    }

    /// Record a trigger at both the resource and the global level.
    ///
    /// Bracket boundaries flush every recorder's pending macro first, so
    /// keystrokes typed before a boundary land on the right side of it.
    fn record_trigger(&self, boundary: Boundary) {
        if boundary.action == TriggerAction::CursorChange {
            self.cancel_refactoring();
        }
        if boundary.timing != Timing::Instant {
            self.dump_all_pending();
        }
        let trigger = match self.record_resource_trigger(boundary.clone()) {
            Some(trigger) => trigger,
            None => {
                let trigger = boundary.stamp(self.now());
                self.ctx.aggregator.record_raw(&Macro::Trigger(trigger.clone()));
                trigger
            }
        };
        self.ctx.aggregator.record(Macro::Trigger(trigger));
    }

    /// Stamp and record a trigger on the resource only, if it has a recorder.
    fn record_resource_trigger(&self, boundary: Boundary) -> Option<TriggerMacro> {
        let path = boundary.path.path.clone();
        let mut boundary = Some(boundary);
        self.with_recorder(&path, |r| {
            let boundary = boundary.take()?;
            Some(r.record_trigger_with(|time| boundary.stamp(time)))
        })
        .flatten()
    }

    fn cancel_refactoring(&self) {
        let path = {
            let mut state = self.state.lock();
            if !state.refactoring {
                return;
            }
            state.refactoring = false;
            state.refactored_path.take().unwrap_or_default()
        };
        debug!(path, "cancelling dangling refactoring");
        let cancel = self.trigger(&path, TriggerAction::Refactoring, Timing::Cancel);
        self.record_trigger(cancel);
    }

    // ── editor stream ────────────────────────────────────────────────────

    /// A document changed in an editor.
    ///
    /// The change is classified as UNDO/REDO (or as a cancel of an earlier
    /// change while a refactoring is being undone), CUT, PASTE, or EDIT.
    #[instrument(level = "trace", skip(self, inserted, deleted))]
    pub fn document_changed(&self, path: &str, offset: usize, inserted: &str, deleted: &str) {
        if inserted.is_empty() && deleted.is_empty() {
            return;
        }
        let path = normalize(path);
        let (cut, paste, refactoring) = {
            let state = self.state.lock();
            (state.cut, state.paste, state.refactored_path.is_some())
        };

        let recorder = self.recorder(&path).unwrap_or_else(|| {
            debug!(path, "change on an untracked resource");
            self.ensure_recorder(&path, RecorderMode::Editor, || {
                self.host_text(&path)
                    .and_then(|text| revert_change(&text, offset, inserted, deleted))
                    .unwrap_or_default()
            })
        });

        let mut recorder = recorder.lock();
        let history = match recorder.history() {
            HistoryState::Undoing => Some(DocumentAction::Undo),
            HistoryState::Redoing => Some(DocumentAction::Redo),
            HistoryState::Idle => None,
        };
        match history {
            Some(action) if refactoring => recorder.record_cancel(action, offset, inserted, deleted),
            Some(action) => recorder.record_edit(action, offset, inserted, deleted),
            None => {
                let action = if cut {
                    DocumentAction::Cut
                } else if paste {
                    DocumentAction::Paste
                } else {
                    DocumentAction::Edit
                };
                recorder.record_edit(action, offset, inserted, deleted);
            }
        }
    }

    /// An undo or redo is about to start or has finished on `path`.
    pub fn undo_history(&self, path: &str, phase: HistoryPhase) {
        let path = normalize(path);
        let (history, action, timing) = match phase {
            HistoryPhase::AboutToUndo => (HistoryState::Undoing, TriggerAction::Undo, Timing::Begin),
            HistoryPhase::Undone => (HistoryState::Idle, TriggerAction::Undo, Timing::End),
            HistoryPhase::AboutToRedo => (HistoryState::Redoing, TriggerAction::Redo, Timing::Begin),
            HistoryPhase::Redone => (HistoryState::Idle, TriggerAction::Redo, Timing::End),
        };
        let (refactoring, command) = {
            let state = self.state.lock();
            (state.refactored_path.is_some(), state.last_command.clone())
        };

        let mut boundary = self.trigger(&path, action, timing);
        boundary.command = command;
        let recorder = self.ensure_recorder(&path, RecorderMode::Editor, || self.host_text(&path).unwrap_or_default());
        let mut recorder = recorder.lock();
        recorder.set_history(history);
        if !refactoring {
            let _ = recorder.record_trigger_with(|time| boundary.stamp(time));
        }
    }

    /// The caret moved in the editor of `path`.
    pub fn cursor_moved(&self, path: &str) {
        let trigger = self.trigger(path, TriggerAction::CursorChange, Timing::Instant);
        self.record_trigger(trigger);
    }

    /// A completion popup opened.
    pub fn completion_started(&self, path: &str, kind: CompletionKind) {
        let action = match kind {
            CompletionKind::QuickAssist => CodeCompletionAction::QuickAssistBegin,
            CompletionKind::ContentAssist => CodeCompletionAction::ContentAssistBegin,
        };
        let macro_path = self.macro_path(path);
        self.record_macro(path, |time| CodeCompletionMacro::new(time, macro_path, action, "").into());
        let _ = self.record_resource_trigger(self.trigger(path, TriggerAction::CodeCompletion, Timing::Begin));
    }

    /// A completion popup closed, possibly after applying `proposal`.
    pub fn completion_ended(&self, path: &str, kind: CompletionKind, proposal: &str) {
        let _ = self.record_resource_trigger(self.trigger(path, TriggerAction::CodeCompletion, Timing::End));
        let action = match kind {
            CompletionKind::QuickAssist => CodeCompletionAction::QuickAssistEnd,
            CompletionKind::ContentAssist => CodeCompletionAction::ContentAssistEnd,
        };
        let macro_path = self.macro_path(path);
        self.record_macro(path, |time| CodeCompletionMacro::new(time, macro_path, action, proposal).into());
    }

    /// A resource was selected in a project view.
    pub fn selection_changed(&self, path: &str) {
        let path = normalize(path);
        self.state.lock().selected_path = Some(path.clone());
        let _ = self.with_recorder(&path, |r| r.reconcile(false));
    }

    /// Reconcile `path` against `text`, or against the host's content.
    pub fn reconcile(&self, path: &str, text: Option<&str>, expected: bool) {
        let path = normalize(path);
        let recorder = self.ensure_recorder(&path, RecorderMode::Background, String::new);
        let mut recorder = recorder.lock();
        match text {
            Some(text) => recorder.reconcile_with(text, expected),
            None => recorder.reconcile(expected),
        }
    }
}

/// A trigger waiting for its timestamp.
#[derive(Clone, Debug)]
struct Boundary {
    path: MacroPath,
    action: TriggerAction,
    timing: Timing,
    command: Option<CommandMacro>,
}

impl Boundary {
    fn with_command(mut self, command: CommandMacro) -> Self {
        self.command = Some(command);
        self
    }

    fn stamp(self, time: DateTime<Utc>) -> TriggerMacro {
        let trigger = TriggerMacro::new(time, self.path, self.action, self.timing);
        match self.command {
            Some(command) => trigger.with_command(command),
            None => trigger,
        }
    }
}

/// Undo a change on `text`, recovering the content it was applied to.
fn revert_change(text: &str, offset: usize, inserted: &str, deleted: &str) -> Option<String> {
    let len = char_len(inserted);
    if char_slice(text, offset, offset + len)? != inserted {
        return None;
    }
    let mut before = text.to_owned();
    splice(&mut before, offset, len, deleted).then_some(before)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests;
