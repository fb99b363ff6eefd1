//! The engine facade.
//!
//! [`MacroEngine`] wires a [`StreamAggregator`], an [`Orchestrator`] and the
//! configured handlers together, and gives hosts one entry point,
//! [`handle`](MacroEngine::handle), for every [`HostEvent`].
//!
//! # Lifecycle
//!
//! ```text
//! new ──start──► running ──stop──► stopped ──start──► running ...
//! ```
//!
//! `start` and `stop` are idempotent and may race with in-flight events:
//! events hold the lifecycle lock shared, `start`/`stop` hold it exclusively,
//! so a stop waits for the events already being handled and every event
//! handled after it is ignored. A stop drains: pending macros are flushed,
//! open compounds are closed as if their END arrived, handlers are
//! terminated, and all listeners are detached.

use std::sync::Arc;

use macrorec_core::{Macro, MacroClock, ProjectLayout};
use macrorec_settings::{CombinatorSettings, MacroRecorderSettings};
use parking_lot::RwLock;
use tracing::{debug, info, instrument, trace};

use crate::aggregator::StreamAggregator;
use crate::combinator::Combinator;
use crate::diff::DiffReconciler;
use crate::events::HostEvent;
use crate::host::DocumentSource;
use crate::listener::{DisplayListener, MacroHandler, MacroListener};
use crate::orchestrator::Orchestrator;
use crate::recorder::RecorderContext;

#[derive(Default)]
struct Lifecycle {
    running: bool,
    /// Handlers initialized by the current start.
    active: Vec<Arc<dyn MacroHandler>>,
}

/// Routes a handler's macros without exposing its lifecycle to the aggregator.
struct HandlerListener(Arc<dyn MacroHandler>);

impl MacroListener for HandlerListener {
    fn on_macro(&self, m: &Macro) {
        self.0.on_macro(m);
    }

    fn on_raw_macro(&self, m: &Macro) {
        self.0.on_raw_macro(m);
    }
}

/// A complete macro recorder.
pub struct MacroEngine {
    settings: MacroRecorderSettings,
    aggregator: Arc<StreamAggregator>,
    orchestrator: Orchestrator,
    handlers: Vec<Arc<dyn MacroHandler>>,
    lifecycle: RwLock<Lifecycle>,
}

impl std::fmt::Debug for MacroEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroEngine")
            .field("running", &self.is_running())
            .field("handlers", &self.handlers.len())
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl MacroEngine {
    /// Build a stopped engine.
    ///
    /// `handlers` is fixed for the engine's lifetime; whether each one
    /// records is decided at every start.
    pub fn new(
        settings: MacroRecorderSettings,
        documents: Arc<dyn DocumentSource>,
        layout: Arc<dyn ProjectLayout>,
        handlers: Vec<Arc<dyn MacroHandler>>,
    ) -> Self {
        let aggregator = Arc::new(StreamAggregator::new());
        let ctx = RecorderContext {
            aggregator: Arc::clone(&aggregator),
            clock: Arc::new(MacroClock::new()),
            documents,
            reconciler: DiffReconciler::new(settings.diff.edit_cost),
            combinator: Combinator::new(&settings.combinator),
        };
        let orchestrator = Orchestrator::new(&settings, ctx, layout);
        Self {
            settings,
            aggregator,
            orchestrator,
            handlers,
            lifecycle: RwLock::new(Lifecycle::default()),
        }
    }

    /// Settings the engine was built with.
    pub fn settings(&self) -> &MacroRecorderSettings {
        &self.settings
    }

    /// Whether events are being recorded.
    pub fn is_running(&self) -> bool {
        self.lifecycle.read().running
    }

    /// The orchestrator, for hosts that call it directly.
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Start recording. A no-op when already running.
    #[instrument(level = "debug", skip(self))]
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle.write();
        if lifecycle.running {
            debug!("macro engine already running");
            return;
        }

        for handler in &self.handlers {
            if !handler.recording_allowed() {
                info!(handler = handler.name(), "handler declined recording");
                continue;
            }
            handler.initialize();
            self.aggregator
                .add_listener(Arc::new(HandlerListener(Arc::clone(handler))), &handler.combinator());
            lifecycle.active.push(Arc::clone(handler));
        }

        let display = &self.settings.display;
        if display.macros || display.raw_macros {
            self.aggregator.add_listener(
                Arc::new(DisplayListener::new(display.macros, display.raw_macros)),
                &CombinatorSettings::never(),
            );
        }

        lifecycle.running = true;
        info!(handlers = lifecycle.active.len(), "macro engine started");
    }

    /// Stop recording, draining everything buffered. A no-op when stopped.
    #[instrument(level = "debug", skip(self))]
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.write();
        if !lifecycle.running {
            debug!("macro engine not running");
            return;
        }

        self.orchestrator.drain();
        self.aggregator.drain();
        for handler in lifecycle.active.drain(..) {
            handler.terminate();
        }
        let detached = self.aggregator.detach_all();

        lifecycle.running = false;
        info!(detached, "macro engine stopped");
    }

    /// Attach an extra listener with its own combining policy.
    ///
    /// Listeners are detached by [`stop`](Self::stop).
    pub fn add_listener(&self, listener: Arc<dyn MacroListener>, combinator: &CombinatorSettings) {
        self.aggregator.add_listener(listener, combinator);
    }

    /// Detach a listener added with [`add_listener`](Self::add_listener).
    pub fn remove_listener(&self, listener: &Arc<dyn MacroListener>) -> bool {
        self.aggregator.remove_listener(listener)
    }

    /// Deliver every listener's pending combined macro.
    pub fn flush(&self) {
        self.aggregator.flush();
    }

    /// Handle one host notification. Ignored while stopped.
    #[instrument(level = "trace", skip_all)]
    pub fn handle(&self, event: HostEvent) {
        let lifecycle = self.lifecycle.read();
        if !lifecycle.running {
            trace!("macro engine stopped, event ignored");
            return;
        }

        let o = &self.orchestrator;
        match event {
            HostEvent::DocumentChanged {
                path,
                offset,
                inserted_text,
                deleted_text,
            } => o.document_changed(&path, offset, &inserted_text, &deleted_text),
            HostEvent::UndoHistory { path, phase } => o.undo_history(&path, phase),
            HostEvent::CursorMoved { path } => o.cursor_moved(&path),
            HostEvent::CompletionStarted { path, kind } => o.completion_started(&path, kind),
            HostEvent::CompletionEnded { path, kind, proposal } => o.completion_ended(&path, kind, &proposal),
            HostEvent::CommandExecuting {
                command_id,
                category,
                path,
            } => o.command_executing(&command_id, &category, path.as_deref()),
            HostEvent::CommandExecuted { command_id, success } => o.command_executed(&command_id, success),
            HostEvent::Refactoring {
                action,
                refactoring_id,
                arguments,
                path,
            } => o.refactoring(action, &refactoring_id, arguments, path.as_deref()),
            HostEvent::EditorOpened { path, text, charset } => o.editor_opened(&path, text.as_deref(), &charset),
            HostEvent::EditorClosed { path, text, charset } => o.editor_closed(&path, text.as_deref(), &charset),
            HostEvent::EditorActivated { path, text, charset } => {
                o.editor_activated(&path, text.as_deref(), &charset);
            }
            HostEvent::SelectionChanged { path } => o.selection_changed(&path),
            HostEvent::ResourceChanged(delta) => o.resource_changed(&delta),
            HostEvent::RepositoryOpened { project, branch } => o.repository_opened(&project, &branch),
            HostEvent::BranchChanged { project, branch } => o.branch_changed(&project, &branch),
            HostEvent::IndexChanged {
                project,
                branch,
                added,
                removed,
                modified,
            } => o.index_changed(&project, &branch, &added, &removed, &modified),
            HostEvent::Reconcile { path, text, expected } => o.reconcile(&path, text.as_deref(), expected),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
