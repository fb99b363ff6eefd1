//! Macro consumers.
//!
//! A [`MacroListener`] receives the aggregated macro stream and, optionally,
//! every raw macro as it is observed. A [`MacroHandler`] is a listener with a
//! lifecycle: it is initialized when the engine starts and terminated when it
//! stops, and may decline to record at all.
//!
//! Listener callbacks run synchronously on the thread that produced the
//! macro, while the aggregator is locked. They must return promptly and must
//! not call back into the engine.

use macrorec_core::Macro;
use macrorec_core::logging::DISPLAY_TARGET;
use macrorec_settings::CombinatorSettings;
use parking_lot::Mutex;
use tracing::info;

/// Receives aggregated and raw macros.
pub trait MacroListener: Send + Sync {
    /// An aggregated macro left the engine.
    fn on_macro(&self, m: &Macro);

    /// A raw macro was observed.
    fn on_raw_macro(&self, _m: &Macro) {}
}

/// A listener with a start/stop lifecycle.
pub trait MacroHandler: MacroListener {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether this handler wants macros at all. Checked at engine start.
    fn recording_allowed(&self) -> bool {
        true
    }

    /// How this handler wants document macros combined. Defaults to one
    /// macro per observed change.
    fn combinator(&self) -> CombinatorSettings {
        CombinatorSettings::never()
    }

    /// Called at engine start, before the first macro.
    fn initialize(&self) {}

    /// Called at engine stop, after the last macro.
    fn terminate(&self) {}
}

/// Echoes macros to the log under the display target.
#[derive(Clone, Copy, Debug)]
pub struct DisplayListener {
    macros: bool,
    raw_macros: bool,
}

impl DisplayListener {
    /// Listener echoing aggregated and/or raw macros.
    pub fn new(macros: bool, raw_macros: bool) -> Self {
        Self { macros, raw_macros }
    }

    fn display(channel: &str, m: &Macro) {
        let json = m
            .to_json()
            .map(|v| v.to_string())
            .unwrap_or_else(|e| format!("<unserializable: {e}>"));
        info!(
            target: DISPLAY_TARGET,
            channel,
            kind = m.kind(),
            action = m.action(),
            path = m.path(),
            macro_json = %json,
            "macro"
        );
    }
}

impl MacroListener for DisplayListener {
    fn on_macro(&self, m: &Macro) {
        if self.macros {
            Self::display("macro", m);
        }
    }

    fn on_raw_macro(&self, m: &Macro) {
        if self.raw_macros {
            Self::display("raw", m);
        }
    }
}

/// Collects everything it receives.
#[derive(Debug, Default)]
pub struct MacroCollector {
    macros: Mutex<Vec<Macro>>,
    raw_macros: Mutex<Vec<Macro>>,
}

impl MacroCollector {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregated macros received so far.
    pub fn macros(&self) -> Vec<Macro> {
        self.macros.lock().clone()
    }

    /// Raw macros received so far.
    pub fn raw_macros(&self) -> Vec<Macro> {
        self.raw_macros.lock().clone()
    }

    /// Take the aggregated macros received so far.
    pub fn take(&self) -> Vec<Macro> {
        std::mem::take(&mut *self.macros.lock())
    }
}

impl MacroListener for MacroCollector {
    fn on_macro(&self, m: &Macro) {
        self.macros.lock().push(m.clone());
    }

    fn on_raw_macro(&self, m: &Macro) {
        self.raw_macros.lock().push(m.clone());
    }
}
