//! The stream aggregator: the single funnel every committed macro passes.
//!
//! Responsibilities, in the order a macro meets them:
//!
//! 1. **Global compounding.** A BEGIN trigger recorded here (refactorings,
//!    VCS index updates) opens a compound that swallows every macro
//!    committed until the matching END, whichever resource it came from.
//!    Compounds committed by resource recorders in the meantime are spliced
//!    into it child by child.
//! 2. **Raw attachment.** Raw macros observed since the last commit are
//!    attached to the next committed macro that has none of its own.
//! 3. **Ordering.** A macro whose timestamp is not strictly after the last
//!    one emitted for the same path and branch is dropped with a warning.
//! 4. **Fan-out.** Each listener has its own combinator and pending slot, so
//!    the same stream may reach different listeners combined differently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use macrorec_core::{CompoundMacro, DocumentMacro, Macro, MacroClock, MacroError, Timing, TriggerMacro};
use macrorec_settings::CombinatorSettings;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::combinator::Combinator;
use crate::listener::MacroListener;

struct ListenerSlot {
    listener: Arc<dyn MacroListener>,
    combinator: Combinator,
    pending: Option<DocumentMacro>,
}

impl ListenerSlot {
    fn deliver(&mut self, m: &Macro) {
        if let Macro::Document(next) = m {
            if self.combinator.can_combine(next) {
                let merged = self
                    .pending
                    .as_ref()
                    .and_then(|pending| self.combinator.combine(pending, next));
                if merged.is_none() {
                    self.flush();
                }
                self.pending = Some(merged.unwrap_or_else(|| next.clone()));
                return;
            }
        }
        self.flush();
        self.listener.on_macro(m);
    }

    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.listener.on_macro(&Macro::Document(pending));
        }
    }
}

#[derive(Default)]
struct AggregatorState {
    compound: Option<CompoundMacro>,
    raw: Vec<Macro>,
    last_emitted: HashMap<(String, String), DateTime<Utc>>,
    listeners: Vec<ListenerSlot>,
}

/// Serializes, groups, orders, and fans out committed macros.
#[derive(Default)]
pub struct StreamAggregator {
    state: Mutex<AggregatorState>,
}

impl std::fmt::Debug for StreamAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StreamAggregator")
            .field("compound_open", &state.compound.is_some())
            .field("raw", &state.raw.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl StreamAggregator {
    /// Aggregator with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener with its own combining policy.
    pub fn add_listener(&self, listener: Arc<dyn MacroListener>, combinator: &CombinatorSettings) {
        self.state.lock().listeners.push(ListenerSlot {
            listener,
            combinator: Combinator::new(combinator),
            pending: None,
        });
    }

    /// Detach `listener`, delivering its pending macro first.
    pub fn remove_listener(&self, listener: &Arc<dyn MacroListener>) -> bool {
        let mut state = self.state.lock();
        let Some(idx) = state
            .listeners
            .iter()
            .position(|slot| Arc::ptr_eq(&slot.listener, listener))
        else {
            return false;
        };
        let mut slot = state.listeners.remove(idx);
        slot.flush();
        true
    }

    /// Detach every listener, delivering pending macros first.
    pub fn detach_all(&self) -> usize {
        let mut state = self.state.lock();
        let mut slots = std::mem::take(&mut state.listeners);
        for slot in &mut slots {
            slot.flush();
        }
        slots.len()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Whether a global compound is open.
    pub fn has_open_compound(&self) -> bool {
        self.state.lock().compound.is_some()
    }

    /// Buffer a raw macro and pass it to every listener's raw channel.
    pub fn record_raw(&self, m: &Macro) {
        Self::buffer_raw(&mut self.state.lock(), m);
    }

    /// Build a macro stamped by `clock` while the aggregator is locked, then
    /// record it as raw and commit it.
    pub fn commit_new(&self, clock: &MacroClock, build: impl FnOnce(DateTime<Utc>) -> Macro) {
        let mut state = self.state.lock();
        let m = build(clock.now());
        Self::buffer_raw(&mut state, &m);
        Self::commit_locked(&mut state, m);
    }

    /// Record a macro at the global level.
    ///
    /// Triggers drive the global compound. Anything else is committed.
    pub fn record(&self, m: Macro) {
        match m {
            Macro::Trigger(trigger) => self.record_trigger(&trigger),
            other => self.commit(other),
        }
    }

    /// Commit a finished macro: into the open global compound if any,
    /// otherwise straight to the listeners.
    pub fn commit(&self, m: Macro) {
        Self::commit_locked(&mut self.state.lock(), m);
    }

    fn buffer_raw(state: &mut AggregatorState, m: &Macro) {
        state.raw.push(m.clone());
        for slot in &state.listeners {
            slot.listener.on_raw_macro(m);
        }
    }

    fn commit_locked(state: &mut AggregatorState, mut m: Macro) {
        if let Some(compound) = state.compound.as_mut() {
            match m {
                Macro::Compound(inner) => {
                    for child in inner.into_macros() {
                        compound.add(child);
                    }
                }
                other => compound.add(other),
            }
            return;
        }

        let raw = std::mem::take(&mut state.raw);
        if m.raw_macros().is_empty() {
            m.set_raw_macros(raw);
        }
        Self::emit(state, &m);
    }

    /// Deliver every listener's pending combined macro.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        for slot in &mut state.listeners {
            slot.flush();
        }
    }

    /// Close the global compound as if its END arrived, then flush.
    pub fn drain(&self) {
        let mut state = self.state.lock();
        if let Some(compound) = state.compound.take() {
            debug!(action = %compound.action, "closing global compound on drain");
            Self::close(&mut state, compound);
        }
        for slot in &mut state.listeners {
            slot.flush();
        }
        state.raw.clear();
    }

    fn record_trigger(&self, trigger: &TriggerMacro) {
        let mut state = self.state.lock();
        match trigger.timing {
            Timing::Begin => {
                if state.compound.is_none() {
                    state.compound = Some(CompoundMacro::open(trigger));
                } else {
                    debug!(action = %trigger.action, "global compound already open");
                }
            }
            Timing::End => {
                if let Some(compound) = Self::take_matching(&mut state, trigger) {
                    Self::close(&mut state, compound);
                }
            }
            Timing::Cancel => {
                if let Some(compound) = Self::take_matching(&mut state, trigger) {
                    for child in compound.into_macros() {
                        Self::emit(&mut state, &child);
                    }
                }
            }
            Timing::Instant => {}
        }
    }

    fn take_matching(state: &mut AggregatorState, trigger: &TriggerMacro) -> Option<CompoundMacro> {
        match state.compound.as_ref() {
            Some(open) if open.action == trigger.action => state.compound.take(),
            Some(open) => {
                debug!(open = %open.action, trigger = %trigger.action, "trigger does not match the global compound");
                None
            }
            None => None,
        }
    }

    fn close(state: &mut AggregatorState, mut compound: CompoundMacro) {
        if compound.is_empty() {
            return;
        }
        compound.sort();
        let mut m = Macro::Compound(compound);
        m.set_raw_macros(std::mem::take(&mut state.raw));
        Self::emit(state, &m);
    }

    fn emit(state: &mut AggregatorState, m: &Macro) {
        let key = (m.path().to_owned(), m.branch().to_owned());
        let time = m.time();
        if let Some(&last) = state.last_emitted.get(&key) {
            if time <= last {
                let err = MacroError::OutOfOrder {
                    path: key.0,
                    branch: key.1,
                    time,
                    last,
                };
                warn!(error = %err, kind = m.kind(), "dropping macro");
                return;
            }
        }
        let _ = state.last_emitted.insert(key, time);
        for slot in &mut state.listeners {
            slot.deliver(m);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
