use std::collections::BTreeMap;

use assert_matches::assert_matches;
use macrorec_core::logging::capture_logs;
use macrorec_core::{
    CompoundMacro, DocumentMacro, FileAction, MacroClock, RefactoringAction, ResourceAction, ResourceTarget,
};
use macrorec_settings::CombinatorSettings;
use tracing::Level;

use super::*;
use crate::aggregator::StreamAggregator;
use crate::combinator::Combinator;
use crate::diff::DiffReconciler;
use crate::events::{DeltaKind, ResourceDelta};
use crate::host::InMemoryDocuments;
use crate::listener::MacroCollector;

const A: &str = "/P/src/a/A.java";
const B: &str = "/P/src/b/B.java";
const RENAME: &str = "org.eclipse.jdt.ui.edit.text.java.rename.element";
const REFACTORING_CATEGORY: &str = "org.eclipse.jdt.ui.category.refactoring";
const EDIT_CATEGORY: &str = "org.eclipse.ui.category.edit";
const FILE_CATEGORY: &str = "org.eclipse.ui.category.file";

struct SrcLayout;

impl ProjectLayout for SrcLayout {
    fn source_roots(&self, project: &str) -> Vec<String> {
        vec![format!("/{project}/src")]
    }
}

struct Harness {
    orchestrator: Orchestrator,
    documents: Arc<InMemoryDocuments>,
    collector: Arc<MacroCollector>,
}

fn harness() -> Harness {
    let documents = Arc::new(InMemoryDocuments::new());
    let aggregator = Arc::new(StreamAggregator::new());
    let collector = Arc::new(MacroCollector::new());
    aggregator.add_listener(collector.clone(), &CombinatorSettings::never());
    let ctx = RecorderContext {
        aggregator,
        clock: Arc::new(MacroClock::new()),
        documents: documents.clone(),
        reconciler: DiffReconciler::default(),
        combinator: Combinator::default(),
    };
    let orchestrator = Orchestrator::new(&MacroRecorderSettings::default(), ctx, Arc::new(SrcLayout));
    Harness {
        orchestrator,
        documents,
        collector,
    }
}

impl Harness {
    /// Open an editor on `path` and discard the OPENED macro.
    fn open(&self, path: &str, text: &str) {
        self.documents.set_text(path, text);
        self.orchestrator.editor_opened(path, None, "UTF-8");
        let _ = self.collector.take();
    }

    /// Apply a change to the host document, then notify the orchestrator.
    fn change(&self, path: &str, offset: usize, inserted: &str, deleted: &str) {
        assert!(self.documents.apply_change(path, offset, char_len(deleted), inserted));
        self.orchestrator.document_changed(path, offset, inserted, deleted);
    }

    fn take(&self) -> Vec<Macro> {
        self.collector.take()
    }
}

fn args() -> BTreeMap<String, String> {
    BTreeMap::from([("newName".to_string(), "y".to_string())])
}

fn compound(m: &Macro) -> &CompoundMacro {
    match m {
        Macro::Compound(c) => c,
        other => panic!("expected a compound, got {}", other.kind()),
    }
}

fn document(m: &Macro) -> &DocumentMacro {
    m.as_document().unwrap_or_else(|| panic!("expected a document macro, got {}", m.kind()))
}

fn kinds(out: &[Macro]) -> Vec<&'static str> {
    out.iter().map(Macro::kind).collect()
}

// ── paths ───────────────────────────────────────────────────────────────

#[test]
fn macro_paths_are_decomposed() {
    let h = harness();
    let path = h.orchestrator.macro_path("P/src/a/A.java");
    assert_eq!(path.path, A);
    assert_eq!(path.project_name, "P");
    assert_eq!(path.package_name, "a");
    assert_eq!(path.file_name, "A.java");
    assert_eq!(path.branch, "");
}

// ── classification ──────────────────────────────────────────────────────

#[test]
fn edits_are_classified_by_the_command_in_progress() {
    let h = harness();
    h.open(A, "hello world");

    h.orchestrator.command_executing("org.eclipse.ui.edit.cut", EDIT_CATEGORY, Some(A));
    h.change(A, 5, "", " world");
    h.orchestrator.command_executed("org.eclipse.ui.edit.cut", true);

    h.orchestrator.command_executing("org.eclipse.ui.edit.paste", EDIT_CATEGORY, Some(A));
    h.change(A, 0, " world", "");
    h.orchestrator.command_executed("org.eclipse.ui.edit.paste", true);

    h.change(A, 0, "x", "");
    h.orchestrator.cursor_moved(A);

    let out = h.take();
    let actions: Vec<_> = out.iter().filter_map(Macro::as_document).map(|d| d.action).collect();
    assert_eq!(actions, vec![DocumentAction::Cut, DocumentAction::Paste, DocumentAction::Edit]);
    assert_eq!(out.iter().filter(|m| matches!(m, Macro::Command(_))).count(), 2);
    assert_eq!(h.orchestrator.shadow(A).as_deref(), Some("x worldhello"));
}

#[test]
fn untracked_change_recovers_the_previous_content() {
    let h = harness();
    h.documents.set_text(A, "hello!");
    h.orchestrator.document_changed(A, 5, "!", "");
    h.orchestrator.cursor_moved(A);

    let out = h.take();
    assert_eq!(out.len(), 1);
    assert_matches!(&out[0], Macro::Document(d) if d.start == 5 && d.inserted_text == "!");
    assert_eq!(h.orchestrator.shadow(A).as_deref(), Some("hello!"));
}

// ── undo / redo ─────────────────────────────────────────────────────────

#[test]
fn undo_is_bracketed_into_a_compound() {
    let h = harness();
    h.open(A, "abc");
    h.change(A, 3, "d", "");

    h.orchestrator.undo_history(A, HistoryPhase::AboutToUndo);
    h.change(A, 3, "", "d");
    h.orchestrator.undo_history(A, HistoryPhase::Undone);

    let out = h.take();
    assert_eq!(out.len(), 2);
    assert_eq!(document(&out[0]).inserted_text, "d");
    let undo = compound(&out[1]);
    assert_eq!(undo.action, TriggerAction::Undo);
    assert_eq!(undo.len(), 1);
    assert_matches!(&undo.macros()[0], Macro::Document(d) if d.action == DocumentAction::Undo && d.deleted_text == "d");
    assert_eq!(h.orchestrator.shadow(A).as_deref(), Some("abc"));
}

#[test]
fn undo_inside_a_refactoring_trims_the_edit_it_annuls() {
    let h = harness();
    h.open(A, "ab");
    h.orchestrator.refactoring(RefactoringAction::AboutToPerform, "rename", args(), Some(A));
    h.change(A, 2, "cd", "");

    h.orchestrator.undo_history(A, HistoryPhase::AboutToUndo);
    h.change(A, 3, "", "d");
    h.orchestrator.undo_history(A, HistoryPhase::Undone);
    h.orchestrator.refactoring(RefactoringAction::Performed, "rename", args(), Some(A));

    let out = h.take();
    assert_eq!(kinds(&out), vec!["RefactoringMacro", "CompoundMacro", "RefactoringMacro"]);
    let refactoring = compound(&out[1]);
    assert_eq!(refactoring.len(), 1);
    assert_eq!(document(&refactoring.macros()[0]).inserted_text, "c");
    assert_eq!(h.orchestrator.shadow(A).as_deref(), Some("abc"));
}

#[test]
fn unmatched_cancel_is_dropped_with_a_warning() {
    let (logs, _guard) = capture_logs();
    let h = harness();
    h.open(A, "ab");
    h.orchestrator.refactoring(RefactoringAction::AboutToUndo, "rename", args(), Some(A));
    h.orchestrator.undo_history(A, HistoryPhase::AboutToUndo);
    h.change(A, 0, "", "a");
    h.orchestrator.undo_history(A, HistoryPhase::Undone);
    h.orchestrator.refactoring(RefactoringAction::Undone, "rename", args(), Some(A));

    assert!(logs.has_event(Level::WARN, "dropping cancel macro"));
    let out = h.take();
    assert_eq!(kinds(&out), vec!["RefactoringMacro", "RefactoringMacro"]);
    assert_eq!(h.orchestrator.shadow(A).as_deref(), Some("b"));
}

// ── refactoring ─────────────────────────────────────────────────────────

#[test]
fn refactoring_groups_changes_across_files() {
    let h = harness();
    h.open(A, "int x;");
    h.open(B, "use x;");

    h.orchestrator.refactoring(RefactoringAction::AboutToPerform, "rename", args(), Some(A));
    assert_eq!(h.orchestrator.refactored_path().as_deref(), Some(A));
    h.change(A, 4, "y", "x");
    h.change(B, 4, "y", "x");
    h.orchestrator.refactoring(RefactoringAction::Performed, "rename", args(), Some(A));

    let out = h.take();
    assert_eq!(kinds(&out), vec!["RefactoringMacro", "CompoundMacro", "RefactoringMacro"]);
    assert_matches!(&out[0], Macro::Refactoring(r) if r.action == RefactoringAction::AboutToPerform);
    let group = compound(&out[1]);
    assert_eq!(group.action, TriggerAction::Refactoring);
    assert_eq!(group.header.path.path, A);
    let paths: Vec<_> = group.macros().iter().map(Macro::path).collect();
    assert_eq!(paths, vec![A, B]);
    assert!(h.orchestrator.refactored_path().is_none());
}

#[test]
fn cursor_movement_cancels_a_dangling_refactoring() {
    let h = harness();
    h.open(A, "ab");
    h.orchestrator.refactoring(RefactoringAction::AboutToPerform, "rename", args(), Some(A));
    h.change(A, 2, "c", "");
    h.orchestrator.cursor_moved(A);

    let out = h.take();
    assert_eq!(kinds(&out), vec!["RefactoringMacro", "DocumentMacro"]);
    assert_eq!(document(&out[1]).inserted_text, "c");
    assert!(h.orchestrator.refactored_path().is_none());
}

#[test]
fn removal_during_a_refactoring_is_deferred() {
    let h = harness();
    h.open(A, "x");
    h.orchestrator.refactoring(RefactoringAction::AboutToPerform, "move", args(), Some(A));
    h.change(A, 1, "y", "");

    let delta = ResourceDelta::new(DeltaKind::Removed, ResourceTarget::File, A);
    h.orchestrator.resource_changed(&delta);
    assert_eq!(h.orchestrator.recorder_count(), 1);

    h.orchestrator.refactoring(RefactoringAction::Performed, "move", args(), Some(A));
    assert_eq!(h.orchestrator.recorder_count(), 0);

    let out = h.take();
    assert_eq!(kinds(&out), vec!["RefactoringMacro", "CompoundMacro", "RefactoringMacro"]);
    let group = compound(&out[1]);
    assert_eq!(kinds(group.macros()), vec!["DocumentMacro", "ResourceMacro", "FileMacro"]);
    assert_matches!(&group.macros()[2], Macro::File(f) if f.action == FileAction::Removed && f.code == "xy");
}

// ── code completion ─────────────────────────────────────────────────────

#[test]
fn completion_session_becomes_a_compound() {
    let h = harness();
    h.open(A, "a.");
    h.orchestrator.completion_started(A, CompletionKind::ContentAssist);
    h.change(A, 2, "toString()", "");
    h.orchestrator.completion_ended(A, CompletionKind::ContentAssist, "toString()");

    let out = h.take();
    assert_eq!(kinds(&out), vec!["CodeCompletionMacro", "CompoundMacro", "CodeCompletionMacro"]);
    let session = compound(&out[1]);
    assert_eq!(session.action, TriggerAction::CodeCompletion);
    assert_eq!(document(&session.macros()[0]).inserted_text, "toString()");
    assert_matches!(&out[2], Macro::CodeCompletion(c) if c.action == CodeCompletionAction::ContentAssistEnd);
}

#[test]
fn cursor_movement_abandons_a_completion_session() {
    let h = harness();
    h.open(A, "a.");
    h.orchestrator.completion_started(A, CompletionKind::QuickAssist);
    h.change(A, 2, "x", "");
    h.orchestrator.cursor_moved(A);

    let out = h.take();
    assert_eq!(kinds(&out), vec!["CodeCompletionMacro", "DocumentMacro"]);
}

// ── commands ────────────────────────────────────────────────────────────

#[test]
fn commands_outside_recordable_categories_are_ignored() {
    let h = harness();
    h.open(A, "x");
    h.orchestrator.command_executing("org.eclipse.ui.window.maximize", "org.eclipse.ui.category.window", Some(A));
    h.orchestrator.command_executed("org.eclipse.ui.window.maximize", true);
    assert!(h.take().is_empty());
}

#[test]
fn refactoring_command_brackets_its_changes() {
    let h = harness();
    h.open(A, "x");
    h.orchestrator.command_executing(RENAME, REFACTORING_CATEGORY, Some(A));
    h.change(A, 1, "y", "");
    h.orchestrator.command_executed(RENAME, true);

    let out = h.take();
    assert_eq!(kinds(&out), vec!["CommandMacro", "CompoundMacro"]);
    let group = compound(&out[1]);
    assert_eq!(group.command().map(|c| c.command_id.as_str()), Some(RENAME));
    assert_eq!(group.len(), 1);
}

#[test]
fn undo_inside_a_refactoring_command_annuls_its_edit() {
    let h = harness();
    h.open(A, "x");
    h.orchestrator.command_executing(RENAME, REFACTORING_CATEGORY, Some(A));
    assert_eq!(h.orchestrator.refactored_path().as_deref(), Some(A));

    h.change(A, 1, "yz", "");
    h.orchestrator.undo_history(A, HistoryPhase::AboutToUndo);
    h.change(A, 2, "", "z");
    h.orchestrator.undo_history(A, HistoryPhase::Undone);
    h.orchestrator.command_executed(RENAME, true);
    assert!(h.orchestrator.refactored_path().is_none());

    let out = h.take();
    assert_eq!(kinds(&out), vec!["CommandMacro", "CompoundMacro"]);
    let group = compound(&out[1]);
    assert_eq!(group.action, TriggerAction::Refactoring);
    assert_eq!(group.len(), 1);
    assert_matches!(&group.macros()[0], Macro::Document(d) if d.action == DocumentAction::Edit && d.inserted_text == "y");
    assert_eq!(h.orchestrator.shadow(A).as_deref(), Some("xy"));
}

#[test]
fn unclosed_command_bracket_is_cancelled_by_the_next_command() {
    let (logs, _guard) = capture_logs();
    let h = harness();
    h.open(A, "x");
    h.orchestrator.command_executing(RENAME, REFACTORING_CATEGORY, Some(A));
    h.change(A, 1, "y", "");
    h.orchestrator.command_executing("org.eclipse.ui.file.save", FILE_CATEGORY, Some(A));

    let out = h.take();
    assert_eq!(kinds(&out), vec!["CommandMacro", "DocumentMacro", "CommandMacro"]);
    assert_eq!(document(&out[1]).inserted_text, "y");
    assert!(logs.has_event(Level::WARN, "never closed"));
}

#[test]
fn copy_records_the_selection() {
    let h = harness();
    h.open(A, "int x;");
    h.documents.set_selection(A, 0, "int");
    h.orchestrator.command_executing("org.eclipse.ui.edit.copy", EDIT_CATEGORY, Some(A));

    let out = h.take();
    assert_eq!(kinds(&out), vec!["CommandMacro", "CopyMacro"]);
    assert_matches!(&out[1], Macro::Copy(c) if c.start == 0 && c.copied_text == "int");
}

// ── editors and resources ───────────────────────────────────────────────

#[test]
fn editor_lifecycle() {
    let h = harness();
    h.documents.set_text(A, "abc");
    h.documents.set_text(B, "b");

    h.orchestrator.editor_opened(A, None, "UTF-8");
    h.orchestrator.editor_activated(A, None, "UTF-8");
    h.orchestrator.editor_activated(B, None, "UTF-8");
    h.orchestrator.editor_closed(A, None, "UTF-8");

    let out = h.take();
    let files: Vec<_> = out
        .iter()
        .map(|m| match m {
            Macro::File(f) => (f.header.path.path.as_str(), f.action, f.code.as_str()),
            other => panic!("unexpected {}", other.kind()),
        })
        .collect();
    assert_eq!(
        files,
        vec![
            (A, FileAction::Opened, "abc"),
            (B, FileAction::Activated, "b"),
            (A, FileAction::Closed, "abc"),
        ]
    );
    assert_eq!(h.orchestrator.mode(A), Some(RecorderMode::Background));
    assert_eq!(h.orchestrator.mode(B), Some(RecorderMode::Editor));
}

#[test]
fn added_file_is_diffed_from_empty() {
    let h = harness();
    let mut delta = ResourceDelta::new(DeltaKind::Added, ResourceTarget::File, "/P/src/a/N.java");
    delta.content = Some("class N {}".into());
    h.orchestrator.resource_changed(&delta);

    let out = h.take();
    assert_eq!(kinds(&out), vec!["ResourceMacro", "FileMacro", "DocumentMacro"]);
    assert_matches!(&out[1], Macro::File(f) if f.action == FileAction::Added && f.code == "class N {}");
    let diff = document(&out[2]);
    assert_eq!(diff.action, DocumentAction::AutoDiff);
    assert_eq!((diff.start, diff.inserted_text.as_str()), (0, "class N {}"));
}

#[test]
fn rename_hands_the_content_to_the_new_path() {
    let h = harness();
    let new = "/P/src/a/B.java";
    h.documents.set_text(A, "class A {}");
    h.orchestrator.reconcile(A, None, false);
    let _ = h.take();
    h.documents.rename(A, new);

    let mut removed = ResourceDelta::new(DeltaKind::Removed, ResourceTarget::File, A);
    removed.moved_to = Some(new.into());
    h.orchestrator.resource_changed(&removed);
    let mut added = ResourceDelta::new(DeltaKind::Added, ResourceTarget::File, new);
    added.moved_from = Some(A.into());
    added.previous_content = Some("class A {}".into());
    h.orchestrator.resource_changed(&added);

    let out = h.take();
    let actions: Vec<_> = out.iter().map(Macro::action).collect();
    assert_eq!(actions, vec!["RENAMED_TO", "RENAMED_TO", "RENAMED_FROM", "RENAMED_FROM"]);
    assert_matches!(&out[1], Macro::File(f) if f.code == "class A {}" && f.src_dst_path == new);
    assert_eq!(h.orchestrator.recorder_count(), 1);
    assert_eq!(h.orchestrator.shadow(new).as_deref(), Some("class A {}"));
}

#[test]
fn background_change_repairs_drift_before_diffing() {
    let h = harness();
    let path = "/P/notes.txt";
    h.orchestrator.reconcile(path, Some("v1"), false);
    let _ = h.take();

    let mut delta = ResourceDelta::new(DeltaKind::Changed, ResourceTarget::File, path);
    delta.content_changed = true;
    delta.previous_content = Some("v1x".into());
    delta.content = Some("v2x".into());
    h.orchestrator.resource_changed(&delta);

    let out = h.take();
    assert_matches!(&out[0], Macro::Resource(r) if r.action == ResourceAction::Changed);
    assert_matches!(&out[1], Macro::File(f) if f.action == FileAction::ContentChanged && f.code == "v2x");
    let diffs: Vec<_> = out[2..].iter().map(|m| document(m).action).collect();
    assert_eq!(diffs, vec![DocumentAction::IrregularDiff, DocumentAction::AutoDiff]);
    assert_eq!(h.orchestrator.shadow(path).as_deref(), Some("v2x"));
}

#[test]
fn save_marks_the_change_as_saved() {
    let h = harness();
    h.open(A, "a");
    h.orchestrator.command_executing("org.eclipse.ui.file.save", FILE_CATEGORY, Some(A));
    let mut delta = ResourceDelta::new(DeltaKind::Changed, ResourceTarget::File, A);
    delta.content_changed = true;
    h.orchestrator.resource_changed(&delta);
    h.orchestrator.command_executed("org.eclipse.ui.file.save", true);

    let out = h.take();
    assert_eq!(kinds(&out), vec!["CommandMacro", "ResourceMacro", "FileMacro"]);
    assert_matches!(&out[2], Macro::File(f) if f.action == FileAction::Saved && f.code == "a");
}

// ── version control ─────────────────────────────────────────────────────

#[test]
fn index_change_groups_staged_files() {
    let h = harness();
    h.documents.set_text(A, "x");
    h.orchestrator.index_changed("P", "main", &[], &[], &[A.to_string()]);

    let out = h.take();
    assert_eq!(kinds(&out), vec!["GitMacro", "CompoundMacro"]);
    assert_matches!(&out[0], Macro::Git(g) if g.modified.contains(A) && g.header.path.branch == "main");
    let group = compound(&out[1]);
    assert_eq!(group.action, TriggerAction::Git);
    assert_eq!(group.header.path.path, "/P");
    assert_matches!(
        &group.macros()[0],
        Macro::File(f) if f.action == FileAction::GitModified && f.code == "x" && f.header.path.branch == "main"
    );
    assert_eq!(h.orchestrator.branch("P"), "main");
}

#[test]
fn branch_switch_moves_open_recorders() {
    let h = harness();
    h.orchestrator.repository_opened("P", "dev");
    h.open(A, "ab");
    h.orchestrator.branch_changed("P", "feature");
    h.change(A, 2, "c", "");
    h.orchestrator.cursor_moved(A);

    let out = h.take();
    assert_matches!(&out[0], Macro::Git(g) if g.header.path.branch == "feature");
    assert_eq!(document(&out[1]).header.path.branch, "feature");
}

#[test]
fn empty_index_change_opens_no_bracket() {
    let h = harness();
    h.orchestrator.index_changed("P", "main", &[], &[], &[]);
    let out = h.take();
    assert_eq!(kinds(&out), vec!["GitMacro"]);
}

// ── drain ───────────────────────────────────────────────────────────────

#[test]
fn drain_flushes_and_forgets_recorders() {
    let h = harness();
    h.open(A, "a");
    h.orchestrator.completion_started(A, CompletionKind::ContentAssist);
    h.change(A, 1, "b", "");
    h.orchestrator.drain();

    let out = h.take();
    assert_eq!(kinds(&out), vec!["CodeCompletionMacro", "CompoundMacro"]);
    assert_eq!(h.orchestrator.recorder_count(), 0);
}

// ── concurrency ─────────────────────────────────────────────────────────

#[test]
fn macros_recorded_from_several_threads_all_arrive() {
    const PER_THREAD: usize = 200;
    let h = harness();
    h.open(A, "a");

    std::thread::scope(|scope| {
        for path in [A, A, B, B] {
            let h = &h;
            let _ = scope.spawn(move || {
                let macro_path = h.orchestrator.macro_path(path);
                for _ in 0..PER_THREAD {
                    h.orchestrator
                        .record_macro(path, |time| CommandMacro::new(time, macro_path.clone(), "tick").into());
                }
            });
        }
    });

    let out = h.take();
    assert_eq!(out.len(), 4 * PER_THREAD);
    for path in [A, B] {
        let times: Vec<_> = out.iter().filter(|m| m.path() == path).map(Macro::time).collect();
        assert_eq!(times.len(), 2 * PER_THREAD);
        assert!(times.windows(2).all(|w| w[0] < w[1]));
    }
}
