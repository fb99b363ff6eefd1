//! # macrorec-engine
//!
//! The macro recording and aggregation engine.
//!
//! Host notifications enter through [`MacroEngine::handle`] (or the
//! [`Orchestrator`] directly) and leave as a stream of [`Macro`]s delivered
//! to [`MacroListener`]s:
//!
//! ```text
//! HostEvent ─► Orchestrator ─► ResourceRecorder (one per resource)
//!                   │               │ shadow buffer, combining, compounds,
//!                   │               │ diff reconciliation
//!                   ▼               ▼
//!              StreamAggregator (global compound, ordering check)
//!                   │
//!                   ▼
//!              listeners / handlers
//! ```
//!
//! - **Diff**: [`DiffReconciler`] turns two versions of a text into
//!   `AUTO_DIFF`/`IRREGULAR_DIFF` macros
//! - **Combinator**: [`Combinator`] merges adjacent keystrokes
//! - **Recorder**: [`ResourceRecorder`] owns one resource's shadow text and
//!   open compound
//! - **Orchestrator**: [`Orchestrator`] keeps the session flags and routes
//!   events to recorders
//! - **Aggregator**: [`StreamAggregator`] owns the global compound and
//!   fans out to listeners
//!
//! [`Macro`]: macrorec_core::Macro

#![deny(unsafe_code)]

pub mod aggregator;
pub mod combinator;
pub mod diff;
pub mod engine;
pub mod events;
pub mod host;
pub mod listener;
pub mod orchestrator;
pub mod recorder;

pub use aggregator::StreamAggregator;
pub use combinator::Combinator;
pub use diff::{DiffReconciler, TextEdit};
pub use engine::MacroEngine;
pub use events::{CompletionKind, DeltaKind, HistoryPhase, HostEvent, ResourceDelta};
pub use host::{DocumentSource, InMemoryDocuments, NoDocuments, Selection};
pub use listener::{DisplayListener, MacroCollector, MacroHandler, MacroListener};
pub use orchestrator::Orchestrator;
pub use recorder::{HistoryState, RecorderContext, RecorderMode, ResourceRecorder};
