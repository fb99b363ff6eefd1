//! Strictly increasing macro timestamps.
//!
//! Two macros recorded in the same microsecond would otherwise share a
//! timestamp, and the stream aggregator rejects any macro that is not
//! strictly after its predecessor on the same resource.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Hands out UTC timestamps that never repeat and never go backwards.
///
/// Each engine owns one clock. When the wall clock has not advanced since the
/// previous call, the next timestamp is bumped by one microsecond.
#[derive(Debug, Default)]
pub struct MacroClock {
    last_micros: AtomicI64,
}

impl MacroClock {
    /// Create a clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next distinct timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now();
        let wall_micros = wall.timestamp_micros();
        let mut last = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = wall_micros.max(last + 1);
            match self.last_micros.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or(wall),
                Err(current) => last = current,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
