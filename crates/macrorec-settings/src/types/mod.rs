//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]`. Each type implements
//! [`Default`] with production default values, and `#[serde(default)]` lets
//! a settings file specify only what it changes.

mod combinator;
mod commands;
mod paths;

pub use combinator::*;
pub use commands::*;
pub use paths::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the macro recorder.
///
/// # JSON Format
///
/// ```json
/// {
///   "diff": { "editCost": 6 },
///   "combinator": { "mode": "never" },
///   "display": { "macros": true }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MacroRecorderSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Diff reconciliation settings.
    pub diff: DiffSettings,
    /// Keystroke combining applied by resource recorders.
    pub combinator: CombinatorSettings,
    /// Command classification.
    pub commands: CommandSettings,
    /// Path decomposition.
    pub paths: PathSettings,
    /// Echo macros to the log.
    pub display: DisplaySettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for MacroRecorderSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "macrorec".to_string(),
            diff: DiffSettings::default(),
            combinator: CombinatorSettings::default(),
            commands: CommandSettings::default(),
            paths: PathSettings::default(),
            display: DisplaySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl MacroRecorderSettings {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.diff.edit_cost == 0 {
            return Err(SettingsError::InvalidValue(
                "diff.editCost must be at least 1".to_string(),
            ));
        }
        if let Some(ext) = self
            .paths
            .source_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(SettingsError::InvalidValue(format!(
                "paths.sourceExtensions entry {ext:?} must look like \".ext\""
            )));
        }
        Ok(())
    }
}

/// Diff reconciliation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffSettings {
    /// Cost of an empty edit in chars; small edits next to larger ones are
    /// folded into them when cheaper than this.
    pub edit_cost: u16,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self { edit_cost: 4 }
    }
}

/// Echo macros to the log at `info` under target `macrorec::display`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    /// Echo aggregated macros.
    pub macros: bool,
    /// Echo raw macros.
    pub raw_macros: bool,
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
