//! VCS notifications and the branch cache.

use std::collections::BTreeSet;
use std::sync::Arc;

use macrorec_core::path::normalize;
use macrorec_core::{FileAction, FileMacro, GitAction, GitMacro, Timing, TriggerAction, project_name};
use tracing::{debug, instrument};

use super::{Orchestrator, SharedRecorder};

impl Orchestrator {
    /// A repository was opened for `project`.
    #[instrument(level = "debug", skip(self))]
    pub fn repository_opened(&self, project: &str, branch: &str) {
        self.set_branch(project, branch);
        self.record_git(project, GitAction::Open, GitFiles::default());
    }

    /// Branches or tags of `project` changed.
    #[instrument(level = "debug", skip(self))]
    pub fn branch_changed(&self, project: &str, branch: &str) {
        self.set_branch(project, branch);
        self.record_git(project, GitAction::RefsChanged, GitFiles::default());
    }

    /// The staging area of `project` changed.
    ///
    /// Records an INDEX_CHANGED macro, then one GIT_* file macro per staged
    /// path inside a GIT bracket.
    #[instrument(level = "debug", skip(self, added, removed, modified))]
    pub fn index_changed(&self, project: &str, branch: &str, added: &[String], removed: &[String], modified: &[String]) {
        self.set_branch(project, branch);
        let files = GitFiles {
            added: added.iter().map(|p| normalize(p)).collect(),
            removed: removed.iter().map(|p| normalize(p)).collect(),
            modified: modified.iter().map(|p| normalize(p)).collect(),
        };
        self.record_git(project, GitAction::IndexChanged, files.clone());
        if files.is_empty() {
            return;
        }

        let project_path = normalize(project);
        self.record_trigger(self.trigger(&project_path, TriggerAction::Git, Timing::Begin));
        for (paths, action) in [
            (&files.added, FileAction::GitAdded),
            (&files.removed, FileAction::GitRemoved),
            (&files.modified, FileAction::GitModified),
        ] {
            for path in paths {
                let code = self.host_text(path).unwrap_or_default();
                let macro_path = self.macro_path(path);
                self.record_macro(path, |time| FileMacro::new(time, macro_path, action, code, "").into());
            }
        }
        self.record_trigger(self.trigger(&project_path, TriggerAction::Git, Timing::End));
    }

    fn record_git(&self, project: &str, action: GitAction, files: GitFiles) {
        let project_path = normalize(project);
        let macro_path = self.macro_path(&project_path);
        self.record_macro(&project_path, |time| {
            GitMacro::new(time, macro_path, action)
                .with_files(files.added, files.removed, files.modified)
                .into()
        });
    }

    /// Cache the branch of `project` and re-resolve its recorders' paths.
    fn set_branch(&self, project: &str, branch: &str) {
        let project = project_name(&normalize(project)).to_owned();
        let previous = self.branches.insert(project.clone(), branch.to_owned());
        if previous.as_deref() == Some(branch) {
            return;
        }
        debug!(project, branch, "branch changed");

        let affected: Vec<(String, SharedRecorder)> = self
            .recorders
            .iter()
            .filter(|entry| project_name(entry.key()) == project)
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        for (path, recorder) in affected {
            let resolved = self.macro_path(&path);
            recorder.lock().set_path(resolved);
        }
    }
}

#[derive(Clone, Debug, Default)]
struct GitFiles {
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
    modified: BTreeSet<String>,
}

impl GitFiles {
    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}
