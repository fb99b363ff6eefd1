//! Command execution and refactoring engine notifications.

use std::collections::BTreeMap;

use macrorec_core::path::normalize;
use macrorec_core::{CommandMacro, CopyMacro, RefactoringAction, RefactoringMacro, Timing, TriggerAction};
use tracing::{debug, instrument, warn};

use super::Orchestrator;

impl Orchestrator {
    /// A command is about to execute.
    ///
    /// Only commands of a recordable category are recorded. Refactoring
    /// commands open a REFACTORING bracket on their resource and mark it as
    /// the path being refactored until
    /// [`command_executed`](Self::command_executed).
    #[instrument(level = "debug", skip(self))]
    pub fn command_executing(&self, command_id: &str, category: &str, path: Option<&str>) {
        if !self.commands.is_recordable(category) {
            debug!("command not recordable");
            return;
        }

        let (path, stale_bracket) = {
            let mut state = self.state.lock();
            let path = path
                .map(normalize)
                .or_else(|| state.active_path.clone())
                .or_else(|| state.selected_path.clone())
                .unwrap_or_default();
            let stale = state.command_bracket.take();
            if stale.is_some() && !state.refactoring {
                state.refactored_path = None;
            }
            (path, stale)
        };

        if let Some(stale) = stale_bracket {
            warn!(path = %stale, "cancelling refactoring command bracket that was never closed");
            let _ = self.record_resource_trigger(self.trigger(&stale, TriggerAction::Refactoring, Timing::Cancel));
        }
        let _ = self.with_recorder(&path, |r| {
            r.dump_pending();
            r.cancel_code_completion();
        });
        self.cancel_refactoring();

        let macro_path = self.macro_path(&path);
        let mut recorded = None;
        self.record_macro(&path, |time| {
            let command = CommandMacro::new(time, macro_path.clone(), command_id);
            recorded = Some(command.clone());
            command.into()
        });
        let Some(command) = recorded else {
            return;
        };

        if self.commands.is_copy(command_id) {
            if let Some(selection) = self.ctx.documents.selection(&path) {
                self.record_macro(&path, |time| {
                    CopyMacro::new(time, macro_path, selection.start, selection.text).into()
                });
            }
        }

        let _ = self.with_recorder(&path, |r| r.reconcile(false));

        let refactoring = self.commands.is_refactoring(category);
        {
            let mut state = self.state.lock();
            state.last_command = Some(command.clone());
            state.cut = self.commands.is_cut(command_id);
            state.paste = self.commands.is_paste(command_id);
            state.save = self.commands.is_save(command_id);
            if refactoring {
                state.command_bracket = Some(path.clone());
                state.refactored_path = Some(path.clone());
            }
        }

        if refactoring {
            let begin = self
                .trigger(&path, TriggerAction::Refactoring, Timing::Begin)
                .with_command(command);
            let _ = self.record_resource_trigger(begin);
        }
    }

    /// A command finished. Closes its bracket and clears the in-progress flags.
    #[instrument(level = "debug", skip(self))]
    pub fn command_executed(&self, command_id: &str, success: bool) {
        let bracket = {
            let mut state = self.state.lock();
            state.cut = false;
            state.paste = false;
            state.save = false;
            let bracket = state.command_bracket.take();
            if bracket.is_some() && !state.refactoring {
                state.refactored_path = None;
            }
            bracket
        };
        if let Some(path) = bracket {
            let _ = self.record_resource_trigger(self.trigger(&path, TriggerAction::Refactoring, Timing::End));
        }
        if !success {
            debug!("command failed");
        }
    }

    /// A refactoring engine notification.
    ///
    /// About-to notifications record a [`RefactoringMacro`] carrying the
    /// editor selection and open a REFACTORING bracket on the resource and
    /// the aggregator. Completion notifications close both and record the
    /// completion macro.
    #[instrument(level = "debug", skip(self, arguments))]
    pub fn refactoring(
        &self,
        action: RefactoringAction,
        refactoring_id: &str,
        arguments: BTreeMap<String, String>,
        path: Option<&str>,
    ) {
        let path = {
            let state = self.state.lock();
            path.map(normalize)
                .or_else(|| state.refactored_path.clone())
                .or_else(|| state.active_path.clone())
                .unwrap_or_default()
        };

        let macro_path = self.macro_path(&path);
        if action.is_about_to() {
            let selection = self.ctx.documents.selection(&path);
            self.record_macro(&path, |time| {
                let m = RefactoringMacro::new(time, macro_path, action, refactoring_id, arguments);
                let m = match selection {
                    Some(selection) => m.with_selection(selection.start, selection.text),
                    None => m,
                };
                m.into()
            });
            {
                let mut state = self.state.lock();
                state.refactored_path = Some(path.clone());
                state.refactoring = true;
            }
            self.record_trigger(self.trigger(&path, TriggerAction::Refactoring, Timing::Begin));
        } else {
            self.record_trigger(self.trigger(&path, TriggerAction::Refactoring, Timing::End));
            {
                let mut state = self.state.lock();
                state.refactored_path = None;
                state.refactoring = false;
            }
            self.record_macro(&path, |time| {
                RefactoringMacro::new(time, macro_path, action, refactoring_id, arguments).into()
            });
        }
    }
}
