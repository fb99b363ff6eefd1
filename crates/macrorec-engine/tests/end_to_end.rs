//! Engine-level properties, driven through host events.

use std::collections::HashMap;
use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Duration;
use macrorec_core::logging::capture_logs;
use macrorec_core::text::{char_len, char_slice, splice};
use macrorec_core::{
    DocumentAction, DocumentMacro, Macro, MacroClock, MacroPath, ProjectLayout, RefactoringAction,
};
use macrorec_engine::{
    Combinator, CompletionKind, DiffReconciler, HostEvent, InMemoryDocuments, MacroCollector, MacroEngine,
    MacroHandler, MacroListener, RecorderContext, RecorderMode, ResourceRecorder, StreamAggregator,
};
use macrorec_settings::{CombinatorSettings, MacroRecorderSettings};
use proptest::prelude::*;
use tracing::Level;

const PATH: &str = "/P/src/game/Board.java";

struct SrcLayout;

impl ProjectLayout for SrcLayout {
    fn source_roots(&self, project: &str) -> Vec<String> {
        vec![format!("/{project}/src")]
    }
}

/// Collecting handler that survives engine restarts.
#[derive(Default)]
struct Recording(MacroCollector);

impl MacroListener for Recording {
    fn on_macro(&self, m: &Macro) {
        self.0.on_macro(m);
    }
}

impl MacroHandler for Recording {
    fn name(&self) -> &str {
        "recording"
    }
}

struct Host {
    engine: MacroEngine,
    documents: Arc<InMemoryDocuments>,
    recording: Arc<Recording>,
}

fn host() -> Host {
    let documents = Arc::new(InMemoryDocuments::new());
    let recording = Arc::new(Recording::default());
    let handlers: Vec<Arc<dyn MacroHandler>> = vec![recording.clone()];
    let engine = MacroEngine::new(
        MacroRecorderSettings::default(),
        documents.clone(),
        Arc::new(SrcLayout),
        handlers,
    );
    engine.start();
    Host {
        engine,
        documents,
        recording,
    }
}

impl Host {
    fn send(&self, json: &str) {
        let event = HostEvent::from_json(json).unwrap_or_else(|e| panic!("bad event {json}: {e}"));
        if let HostEvent::DocumentChanged {
            path,
            offset,
            inserted_text,
            deleted_text,
        } = &event
        {
            assert!(self.documents.apply_change(path, *offset, char_len(deleted_text), inserted_text));
        }
        self.engine.handle(event);
    }

    fn open(&self, path: &str, text: &str) {
        self.documents.set_text(path, text);
        self.send(&format!(r#"{{"event":"editorOpened","path":"{path}","charset":"UTF-8"}}"#));
    }

    fn insert(&self, path: &str, offset: usize, text: &str) {
        self.send(&format!(
            r#"{{"event":"documentChanged","path":"{path}","offset":{offset},"insertedText":"{text}"}}"#
        ));
    }

    fn macros(&self) -> Vec<Macro> {
        self.recording.0.macros()
    }
}

fn documents(out: &[Macro]) -> Vec<&DocumentMacro> {
    out.iter().filter_map(Macro::as_document).collect()
}

fn kinds(out: &[Macro]) -> Vec<&'static str> {
    out.iter().map(Macro::kind).collect()
}

// ── scenarios ───────────────────────────────────────────────────────────

#[test]
fn typed_text_then_external_change() {
    let h = host();
    h.open(PATH, "foo");
    h.insert(PATH, 3, "bar");
    h.documents.set_text(PATH, "foobarbaz");
    h.send(&format!(r#"{{"event":"reconcile","path":"{PATH}","expected":true}}"#));

    let out = h.macros();
    assert_eq!(kinds(&out), vec!["FileMacro", "DocumentMacro", "DocumentMacro"]);
    let docs = documents(&out);
    assert_eq!(docs[0].action, DocumentAction::Edit);
    assert_eq!((docs[0].start, docs[0].inserted_text.as_str(), docs[0].deleted_text.as_str()), (3, "bar", ""));
    assert_eq!(docs[1].action, DocumentAction::AutoDiff);
    assert_eq!((docs[1].start, docs[1].inserted_text.as_str(), docs[1].deleted_text.as_str()), (6, "baz", ""));
    assert_eq!(h.engine.orchestrator().shadow(PATH).as_deref(), Some("foobarbaz"));

    let path = docs[1].header.path.clone();
    assert_eq!(path.project_name, "P");
    assert_eq!(path.package_name, "game");
    assert_eq!(path.file_name, "Board.java");
}

#[test]
fn adjacent_keystrokes_combine() {
    let h = host();
    h.open(PATH, "hello");
    h.insert(PATH, 5, "a");
    h.insert(PATH, 6, "b");
    h.send(&format!(r#"{{"event":"cursorMoved","path":"{PATH}"}}"#));

    let out = h.macros();
    let docs = documents(&out);
    assert_eq!(docs.len(), 1);
    assert_eq!((docs[0].start, docs[0].inserted_text.as_str()), (5, "ab"));
}

#[test]
fn empty_bracket_emits_nothing() {
    let h = host();
    h.open(PATH, "a.");
    h.engine.handle(HostEvent::CompletionStarted {
        path: PATH.into(),
        kind: CompletionKind::ContentAssist,
    });
    h.engine.handle(HostEvent::CompletionEnded {
        path: PATH.into(),
        kind: CompletionKind::ContentAssist,
        proposal: String::new(),
    });

    let out = h.macros();
    assert_eq!(kinds(&out), vec!["FileMacro", "CodeCompletionMacro", "CodeCompletionMacro"]);
}

#[test]
fn cancelled_bracket_replays_every_child_in_order() {
    let h = host();
    h.open(PATH, "x");
    h.send(&format!(
        r#"{{"event":"refactoring","action":"ABOUT_TO_PERFORM","refactoringId":"rename","path":"{PATH}"}}"#
    ));
    h.insert(PATH, 1, " ");
    h.insert(PATH, 2, "b");
    h.insert(PATH, 3, " ");
    h.send(&format!(r#"{{"event":"cursorMoved","path":"{PATH}"}}"#));

    let out = h.macros();
    assert_eq!(
        kinds(&out),
        vec!["FileMacro", "RefactoringMacro", "DocumentMacro", "DocumentMacro", "DocumentMacro"]
    );
    let texts: Vec<_> = documents(&out).iter().map(|d| d.inserted_text.as_str()).collect();
    assert_eq!(texts, vec![" ", "b", " "]);
    assert!(h.engine.orchestrator().refactored_path().is_none());
}

#[test]
fn refactoring_engine_notifications_bracket_edits() {
    let h = host();
    h.open(PATH, "int x;");
    h.send(&format!(
        r#"{{"event":"refactoring","action":"ABOUT_TO_PERFORM","refactoringId":"rename","arguments":{{"newName":"y"}},"path":"{PATH}"}}"#
    ));
    h.send(&format!(
        r#"{{"event":"documentChanged","path":"{PATH}","offset":4,"insertedText":"y","deletedText":"x"}}"#
    ));
    h.send(&format!(
        r#"{{"event":"refactoring","action":"PERFORMED","refactoringId":"rename","path":"{PATH}"}}"#
    ));

    let out = h.macros();
    assert_eq!(kinds(&out), vec!["FileMacro", "RefactoringMacro", "CompoundMacro", "RefactoringMacro"]);
    assert_matches!(&out[1], Macro::Refactoring(r) if r.action == RefactoringAction::AboutToPerform && r.arguments["newName"] == "y");
    assert_matches!(&out[2], Macro::Compound(c) if c.len() == 1);
}

#[test]
fn inconsistent_change_is_repaired_by_reconciliation() {
    let (logs, _guard) = capture_logs();
    let h = host();
    h.open(PATH, "abc");
    // The host lost an event: its text moved on without telling the engine.
    h.documents.set_text(PATH, "abcZ");
    h.engine.handle(HostEvent::DocumentChanged {
        path: PATH.into(),
        offset: 0,
        inserted_text: String::new(),
        deleted_text: "q".into(),
    });
    h.send(&format!(r#"{{"event":"cursorMoved","path":"{PATH}"}}"#));

    assert!(logs.has_event(Level::WARN, "inconsistent document macro"));
    assert_eq!(h.engine.orchestrator().shadow(PATH).as_deref(), Some("abcZ"));
    let out = h.macros();
    assert_matches!(documents(&out).last(), Some(d) if d.action == DocumentAction::IrregularDiff && d.inserted_text == "Z");
}

// ── aggregator ordering ─────────────────────────────────────────────────

#[test]
fn out_of_order_macro_is_dropped() {
    let (logs, _guard) = capture_logs();
    let aggregator = StreamAggregator::new();
    let collector = Arc::new(MacroCollector::new());
    aggregator.add_listener(collector.clone(), &CombinatorSettings::never());

    let clock = MacroClock::new();
    let t1 = clock.now();
    let t0 = t1 - Duration::milliseconds(5);
    let path = MacroPath::bare(PATH, "main");
    let first = DocumentMacro::new(t1, path.clone(), DocumentAction::Edit, 0, "a", "");
    let late = DocumentMacro::new(t0, path, DocumentAction::Edit, 1, "b", "");
    aggregator.commit(Macro::Document(first));
    aggregator.commit(Macro::Document(late));

    let out = collector.macros();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].time(), t1);
    assert!(logs.has_event(Level::WARN, "dropping macro"));
}

#[test]
fn ordering_is_tracked_per_branch() {
    let aggregator = StreamAggregator::new();
    let collector = Arc::new(MacroCollector::new());
    aggregator.add_listener(collector.clone(), &CombinatorSettings::never());

    let t1 = MacroClock::new().now();
    let t0 = t1 - Duration::milliseconds(5);
    let on_main = DocumentMacro::new(t1, MacroPath::bare(PATH, "main"), DocumentAction::Edit, 0, "a", "");
    let on_dev = DocumentMacro::new(t0, MacroPath::bare(PATH, "dev"), DocumentAction::Edit, 0, "b", "");
    aggregator.commit(Macro::Document(on_main));
    aggregator.commit(Macro::Document(on_dev));

    assert_eq!(collector.macros().len(), 2);
}

// ── concurrency ─────────────────────────────────────────────────────────

#[test]
fn start_and_stop_race_with_events() {
    let h = Arc::new(host());
    let paths: Vec<String> = (0..4).map(|i| format!("/P/src/game/F{i}.java")).collect();
    for path in &paths {
        h.open(path, "");
    }

    std::thread::scope(|s| {
        for path in &paths {
            let h = Arc::clone(&h);
            let _ = s.spawn(move || {
                for i in 0..200 {
                    h.insert(path, i, "x");
                    if i % 17 == 0 {
                        h.send(&format!(r#"{{"event":"cursorMoved","path":"{path}"}}"#));
                    }
                }
            });
        }
        let h = Arc::clone(&h);
        let _ = s.spawn(move || {
            for _ in 0..50 {
                h.engine.stop();
                h.engine.start();
            }
        });
    });
    h.engine.stop();

    assert!(!h.engine.is_running());
    assert_eq!(h.engine.orchestrator().recorder_count(), 0);

    let mut last = HashMap::new();
    for m in h.macros() {
        let key = (m.path().to_owned(), m.branch().to_owned());
        if let Some(prev) = last.insert(key, m.time()) {
            assert!(prev < m.time(), "macros for {} out of order", m.path());
        }
    }
}

// ── shadow fidelity ─────────────────────────────────────────────────────

fn edit_strategy() -> impl Strategy<Value = Vec<(usize, usize, String)>> {
    prop::collection::vec((any::<usize>(), 0usize..4, "[a-c .]{0,3}"), 0..40)
}

proptest! {
    #[test]
    fn replaying_accepted_macros_reproduces_the_shadow(initial in "[a-c .]{0,20}", edits in edit_strategy()) {
        let aggregator = Arc::new(StreamAggregator::new());
        let collector = Arc::new(MacroCollector::new());
        aggregator.add_listener(collector.clone(), &CombinatorSettings::never());
        let ctx = RecorderContext {
            aggregator,
            clock: Arc::new(MacroClock::new()),
            documents: Arc::new(InMemoryDocuments::new()),
            reconciler: DiffReconciler::default(),
            combinator: Combinator::default(),
        };
        let mut recorder = ResourceRecorder::new(MacroPath::bare(PATH, ""), RecorderMode::Editor, initial.clone(), ctx);

        let mut expected = initial.clone();
        for (seed, removed, inserted) in edits {
            let len = char_len(&expected);
            let start = seed % (len + 1);
            let removed = removed.min(len - start);
            let deleted = char_slice(&expected, start, start + removed).unwrap_or_default().to_owned();
            if deleted.is_empty() && inserted.is_empty() {
                continue;
            }
            recorder.record_edit(DocumentAction::Edit, start, &inserted, &deleted);
            prop_assert!(splice(&mut expected, start, removed, &inserted));
        }
        recorder.dump_pending();

        let mut replayed = initial;
        for m in collector.macros() {
            let d = m.as_document().expect("only document macros are recorded");
            prop_assert!(splice(&mut replayed, d.start, char_len(&d.deleted_text), &d.inserted_text));
        }
        prop_assert_eq!(&replayed, &expected);
        prop_assert_eq!(recorder.shadow(), expected.as_str());
    }
}
