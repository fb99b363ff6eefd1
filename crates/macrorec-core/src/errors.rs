//! Error taxonomy for macro recording.
//!
//! None of these errors terminate a recording session. They are produced as
//! values at the point where an anomaly is detected and reported through
//! `tracing` by whoever recovers from them.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while validating, grouping, or emitting macros.
#[derive(Debug, Error)]
pub enum MacroError {
    /// A document macro's deleted text does not match the shadow buffer.
    #[error("inconsistent edit on {path} at offset {start}: expected {expected:?}, found {found:?}")]
    Inconsistency {
        /// Resource path.
        path: String,
        /// Offset of the edit.
        start: usize,
        /// Text the macro claims to delete.
        expected: String,
        /// Text actually present in the shadow buffer.
        found: String,
    },

    /// A document macro starts past the end of the shadow buffer.
    #[error("offset {start} is beyond the end of {path} (length {len})")]
    OutOfBounds {
        /// Resource path.
        path: String,
        /// Offset of the edit.
        start: usize,
        /// Length of the shadow buffer in chars.
        len: usize,
    },

    /// A cancel macro found nothing to annul inside the open compound.
    #[error("cancellation failed on {path} at offset {start}: no matching macro in the open compound")]
    CancelMismatch {
        /// Resource path.
        path: String,
        /// Offset of the cancel macro.
        start: usize,
    },

    /// A macro's timestamp is not after the last one emitted for its resource.
    #[error("order of macros is abnormal on {path} ({branch}): {time} is not after {last}")]
    OutOfOrder {
        /// Resource path.
        path: String,
        /// Branch of the resource.
        branch: String,
        /// Timestamp of the rejected macro.
        time: DateTime<Utc>,
        /// Timestamp of the last macro emitted for the same resource.
        last: DateTime<Utc>,
    },

    /// The host could not supply the current content of a resource.
    #[error("content of {path} is unavailable: {reason}")]
    ContentUnavailable {
        /// Resource path.
        path: String,
        /// Host-provided reason.
        reason: String,
    },

    /// Macro (de)serialization failed.
    #[error("macro serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for macro operations.
pub type Result<T> = std::result::Result<T, MacroError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
