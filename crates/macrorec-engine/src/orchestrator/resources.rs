//! Editor lifecycle and workspace resource deltas.

use macrorec_core::path::{SEPARATOR, normalize};
use macrorec_core::{FileAction, FileMacro, ResourceAction, ResourceMacro, ResourceTarget, project_name};
use tracing::{debug, instrument};

use super::Orchestrator;
use crate::events::{DeltaKind, ResourceDelta};
use crate::recorder::RecorderMode;

impl Orchestrator {
    /// An editor opened on `path`. Its recorder switches to editor mode.
    #[instrument(level = "debug", skip(self, text))]
    pub fn editor_opened(&self, path: &str, text: Option<&str>, charset: &str) {
        let path = normalize(path);
        let text = text.map(str::to_owned).or_else(|| self.host_text(&path)).unwrap_or_default();

        if let Some(recorder) = self.recorder(&path) {
            let mut recorder = recorder.lock();
            recorder.reconcile_with(&text, false);
            recorder.set_mode(RecorderMode::Editor);
        } else {
            let _ = self.ensure_recorder(&path, RecorderMode::Editor, || text.clone());
        }

        let macro_path = self.macro_path(&path);
        self.record_macro(&path, |time| {
            FileMacro::new(time, macro_path, FileAction::Opened, text.as_str(), charset).into()
        });
        let _ = self.with_recorder(&path, |r| r.reconcile_with(&text, false));
        self.state.lock().active_path = Some(path);
    }

    /// The editor of `path` closed. Its recorder falls back to background mode.
    #[instrument(level = "debug", skip(self, text))]
    pub fn editor_closed(&self, path: &str, text: Option<&str>, charset: &str) {
        let path = normalize(path);
        let code = self
            .with_recorder(&path, |r| {
                match text {
                    Some(text) => r.reconcile_with(text, false),
                    None => r.reconcile(false),
                }
                r.shadow().to_owned()
            })
            .or_else(|| text.map(str::to_owned))
            .unwrap_or_default();

        let macro_path = self.macro_path(&path);
        self.record_macro(&path, |time| FileMacro::new(time, macro_path, FileAction::Closed, code, charset).into());
        let _ = self.with_recorder(&path, |r| r.set_mode(RecorderMode::Background));

        let mut state = self.state.lock();
        if state.active_path.as_deref() == Some(path.as_str()) {
            state.active_path = None;
        }
    }

    /// The editor of `path` came to the front. Re-activation is ignored.
    #[instrument(level = "debug", skip(self, text))]
    pub fn editor_activated(&self, path: &str, text: Option<&str>, charset: &str) {
        let path = normalize(path);
        {
            let mut state = self.state.lock();
            if state.active_path.as_deref() == Some(path.as_str()) {
                return;
            }
            state.active_path = Some(path.clone());
        }

        let recorder = self.ensure_recorder(&path, RecorderMode::Editor, || {
            text.map(str::to_owned)
                .or_else(|| self.host_text(&path))
                .unwrap_or_default()
        });
        let code = text.map_or_else(|| recorder.lock().shadow().to_owned(), str::to_owned);
        let macro_path = self.macro_path(&path);
        self.record_macro(&path, |time| {
            FileMacro::new(time, macro_path, FileAction::Activated, code, charset).into()
        });

        let _ = self.with_recorder(&path, |r| match text {
            Some(text) => r.reconcile_with(text, false),
            None => r.reconcile(false),
        });
    }

    /// A workspace resource changed.
    #[instrument(level = "debug", skip(self, delta), fields(path = %delta.path, kind = ?delta.kind))]
    pub fn resource_changed(&self, delta: &ResourceDelta) {
        if delta.target != ResourceTarget::File {
            self.container_changed(delta);
            return;
        }
        match delta.kind {
            DeltaKind::Added => self.file_added(delta),
            DeltaKind::Removed => self.file_removed(delta),
            DeltaKind::Changed => self.file_changed(delta),
        }
    }

    fn container_changed(&self, delta: &ResourceDelta) {
        let path = normalize(&delta.path);
        let (action, counterpart) = resource_action(delta);
        let macro_path = self.macro_path(&path);
        self.record_macro(&path, |time| {
            let m = ResourceMacro::new(time, macro_path, action, delta.target);
            match counterpart {
                Some(counterpart) => m.with_src_dst_path(counterpart).into(),
                None => m.into(),
            }
        });

        if delta.target == ResourceTarget::Project {
            let project = project_name(&path).to_owned();
            self.resolver.invalidate(&project);
            if delta.kind == DeltaKind::Removed {
                let _ = self.branches.remove(&project);
            }
        }
    }

    fn file_added(&self, delta: &ResourceDelta) {
        let path = normalize(&delta.path);
        let (action, counterpart) = resource_action(delta);
        let code = delta
            .content
            .clone()
            .or_else(|| self.host_text(&path))
            .unwrap_or_default();

        let macro_path = self.macro_path(&path);
        self.record_macro(&path, |time| {
            let resource = ResourceMacro::new(time, macro_path.clone(), action, ResourceTarget::File);
            match &counterpart {
                Some(from) => resource.with_src_dst_path(from.as_str()).into(),
                None => resource.into(),
            }
        });

        let (file_action, previous) = match &counterpart {
            Some(from) => {
                let previous = delta
                    .previous_content
                    .clone()
                    .or_else(|| self.shadow(from))
                    .unwrap_or_default();
                let file_action = if action == ResourceAction::RenamedFrom {
                    FileAction::RenamedFrom
                } else {
                    FileAction::MovedFrom
                };
                (file_action, previous)
            }
            None => (FileAction::Added, String::new()),
        };

        let code_at_event = if counterpart.is_some() { previous.clone() } else { code.clone() };
        self.record_macro(&path, |time| {
            let file = FileMacro::new(time, macro_path, file_action, code_at_event, &delta.charset);
            match counterpart {
                Some(from) => file.with_src_dst_path(from).into(),
                None => file.into(),
            }
        });

        let recorder = self.ensure_recorder(&path, RecorderMode::Background, || previous);
        recorder.lock().reconcile_with(&code, true);
    }

    fn file_removed(&self, delta: &ResourceDelta) {
        let path = normalize(&delta.path);
        let (action, counterpart) = resource_action(delta);

        let macro_path = self.macro_path(&path);
        self.record_macro(&path, |time| {
            let resource = ResourceMacro::new(time, macro_path.clone(), action, ResourceTarget::File);
            match &counterpart {
                Some(to) => resource.with_src_dst_path(to.as_str()).into(),
                None => resource.into(),
            }
        });

        let file_action = match action {
            ResourceAction::MovedTo => FileAction::MovedTo,
            ResourceAction::RenamedTo => FileAction::RenamedTo,
            _ => FileAction::Removed,
        };
        let code = delta
            .previous_content
            .clone()
            .or_else(|| self.shadow(&path))
            .unwrap_or_default();
        self.record_macro(&path, |time| {
            let file = FileMacro::new(time, macro_path, file_action, code, &delta.charset);
            match counterpart {
                Some(to) => file.with_src_dst_path(to).into(),
                None => file.into(),
            }
        });

        if self.with_recorder(&path, |r| r.dispose()) == Some(false) {
            debug!(path, "disposal deferred until the open compound closes");
        }
    }

    fn file_changed(&self, delta: &ResourceDelta) {
        let path = normalize(&delta.path);
        let macro_path = self.macro_path(&path);
        self.record_macro(&path, |time| {
            ResourceMacro::new(time, macro_path.clone(), ResourceAction::Changed, ResourceTarget::File).into()
        });

        let in_editor = self.mode(&path) == Some(RecorderMode::Editor);
        let code = delta.content.clone().or_else(|| self.host_text(&path));

        if delta.content_changed && !in_editor {
            let code = code.clone().unwrap_or_default();
            self.record_macro(&path, |time| {
                FileMacro::new(time, macro_path.clone(), FileAction::ContentChanged, code.as_str(), &delta.charset).into()
            });

            let seed = delta.previous_content.clone().unwrap_or_else(|| code.clone());
            let recorder = self.ensure_recorder(&path, RecorderMode::Background, || seed.clone());
            let mut recorder = recorder.lock();
            if recorder.shadow() != seed {
                // The shadow drifted before this change arrived.
                recorder.reconcile_with(&seed, false);
            }
            recorder.reconcile_with(&code, true);
        }

        let (save, refactoring) = {
            let state = self.state.lock();
            (state.save, state.refactoring)
        };
        let file_action = if save {
            FileAction::Saved
        } else if refactoring {
            FileAction::Refactored
        } else {
            return;
        };
        let code = code.or_else(|| self.shadow(&path)).unwrap_or_default();
        self.record_macro(&path, |time| FileMacro::new(time, macro_path, file_action, code, &delta.charset).into());
    }
}

/// Resource action of a delta and the counterpart path of a move or rename.
///
/// A move within the same folder is a rename.
fn resource_action(delta: &ResourceDelta) -> (ResourceAction, Option<String>) {
    let path = normalize(&delta.path);
    match delta.kind {
        DeltaKind::Added => match delta.moved_from.as_deref().map(normalize) {
            Some(from) if parent(&from) == parent(&path) => (ResourceAction::RenamedFrom, Some(from)),
            Some(from) => (ResourceAction::MovedFrom, Some(from)),
            None => (ResourceAction::Added, None),
        },
        DeltaKind::Removed => match delta.moved_to.as_deref().map(normalize) {
            Some(to) if parent(&to) == parent(&path) => (ResourceAction::RenamedTo, Some(to)),
            Some(to) => (ResourceAction::MovedTo, Some(to)),
            None => (ResourceAction::Removed, None),
        },
        DeltaKind::Changed => (ResourceAction::Changed, None),
    }
}

fn parent(path: &str) -> &str {
    path.rfind(SEPARATOR).map_or("", |idx| &path[..idx])
}
