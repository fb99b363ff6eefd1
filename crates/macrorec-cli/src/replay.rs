//! Replaying host-event logs.
//!
//! Each input line is one [`HostEvent`]. Lines that are blank or start with
//! `#` are skipped, malformed lines are logged and skipped. Document content
//! is served from snapshots kept up to date by the events themselves: editor
//! and reconcile events carrying text, document changes, and resource deltas.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use macrorec_core::path::normalize;
use macrorec_core::{Macro, ProjectLayout};
use macrorec_engine::{DeltaKind, HostEvent, InMemoryDocuments, MacroEngine, MacroHandler, MacroListener};
use macrorec_settings::MacroRecorderSettings;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, warn};

/// Replay options.
#[derive(Clone, Debug, Default)]
pub struct ReplayOptions {
    /// Also print raw macros.
    pub raw: bool,
    /// Source roots relative to each project.
    pub source_roots: Vec<String>,
}

/// Counts of one replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Events handed to the engine.
    pub events: usize,
    /// Lines that did not parse.
    pub skipped: usize,
}

/// Source roots at the same relative location in every project.
struct FixedLayout {
    roots: Vec<String>,
}

impl ProjectLayout for FixedLayout {
    fn source_roots(&self, project: &str) -> Vec<String> {
        self.roots
            .iter()
            .map(|root| format!("/{project}/{}", root.trim_matches('/')))
            .collect()
    }
}

/// Prints macros as JSON lines.
struct JsonLines {
    out: Mutex<Box<dyn Write + Send>>,
    raw: bool,
}

impl JsonLines {
    fn write(&self, value: &serde_json::Value) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "{value}") {
            warn!(error = %e, "failed to write macro");
        }
    }
}

impl MacroListener for JsonLines {
    fn on_macro(&self, m: &Macro) {
        match m.to_json() {
            Ok(value) => self.write(&value),
            Err(e) => warn!(error = %e, kind = m.kind(), "failed to serialize macro"),
        }
    }

    fn on_raw_macro(&self, m: &Macro) {
        if !self.raw {
            return;
        }
        match m.to_json() {
            Ok(value) => self.write(&json!({ "raw": value })),
            Err(e) => warn!(error = %e, kind = m.kind(), "failed to serialize raw macro"),
        }
    }
}

impl MacroHandler for JsonLines {
    fn name(&self) -> &str {
        "json-lines"
    }

    fn terminate(&self) {
        if let Err(e) = self.out.lock().flush() {
            warn!(error = %e, "failed to flush output");
        }
    }
}

/// Keep the document snapshots in step with `event`.
pub fn mirror(documents: &InMemoryDocuments, event: &HostEvent) {
    match event {
        HostEvent::EditorOpened { path, text: Some(text), .. }
        | HostEvent::EditorActivated { path, text: Some(text), .. }
        | HostEvent::EditorClosed { path, text: Some(text), .. }
        | HostEvent::Reconcile { path, text: Some(text), .. } => documents.set_text(&normalize(path), text.as_str()),
        HostEvent::DocumentChanged {
            path,
            offset,
            inserted_text,
            deleted_text,
        } => {
            let path = normalize(path);
            let removed = deleted_text.chars().count();
            if !documents.apply_change(&path, *offset, removed, inserted_text) {
                debug!(path = %path, offset, "change does not fit the snapshot");
            }
        }
        HostEvent::ResourceChanged(delta) => {
            let path = normalize(&delta.path);
            match (delta.kind, &delta.content) {
                (DeltaKind::Removed, _) => match &delta.moved_to {
                    Some(to) => documents.rename(&path, &normalize(to)),
                    None => documents.remove(&path),
                },
                (_, Some(content)) => documents.set_text(&path, content.as_str()),
                (_, None) => {}
            }
        }
        _ => {}
    }
}

/// Replay every event of `input`, writing macros to `out`.
pub fn replay(
    input: impl BufRead,
    settings: MacroRecorderSettings,
    options: ReplayOptions,
    out: Box<dyn Write + Send>,
) -> Result<ReplayStats> {
    let documents = Arc::new(InMemoryDocuments::new());
    let printer: Arc<dyn MacroHandler> = Arc::new(JsonLines {
        out: Mutex::new(out),
        raw: options.raw,
    });
    let layout = Arc::new(FixedLayout {
        roots: options.source_roots,
    });
    let engine = MacroEngine::new(settings, documents.clone(), layout, vec![printer]);
    engine.start();

    let mut stats = ReplayStats::default();
    for (idx, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match HostEvent::from_json(line) {
            Ok(event) => {
                mirror(&documents, &event);
                engine.handle(event);
                stats.events += 1;
            }
            Err(e) => {
                warn!(line = idx + 1, error = %e, "skipping malformed event");
                stats.skipped += 1;
            }
        }
    }

    engine.stop();
    Ok(stats)
}
