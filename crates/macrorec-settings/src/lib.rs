//! # macrorec-settings
//!
//! Configuration management with layered sources for the macro recorder.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`MacroRecorderSettings::default()`]
//! 2. **User file**: `~/.macrorec/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `MACROREC_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use macrorec_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("edit cost: {}", settings.diff.edit_cost);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton for binaries.
///
/// Library code takes settings by value instead, so independent engines can
/// run side by side with different configurations.
static SETTINGS: OnceLock<MacroRecorderSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.macrorec/settings.json` with env
/// var overrides. On subsequent calls, returns the cached value. If loading
/// fails, returns compiled defaults.
pub fn get_settings() -> &'static MacroRecorderSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns `Err(settings)` if they were already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(
    settings: MacroRecorderSettings,
) -> std::result::Result<(), MacroRecorderSettings> {
    SETTINGS.set(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
