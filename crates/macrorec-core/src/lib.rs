//! # macrorec-core
//!
//! Foundation types, errors, and utilities for the macro recorder.
//!
//! This crate provides the shared vocabulary that the engine and the CLI
//! depend on:
//!
//! - **Macros**: the [`Macro`] tagged union with a shared [`MacroHeader`] and
//!   one payload struct per macro kind
//! - **Paths**: [`MacroPath`] projections and the caching [`PathResolver`]
//! - **Clock**: [`MacroClock`] hands out strictly increasing timestamps
//! - **Text**: char-offset helpers used by the shadow buffer and the diff
//! - **Errors**: [`MacroError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod clock;
pub mod errors;
pub mod logging;
pub mod macros;
pub mod path;
pub mod text;

pub use clock::MacroClock;
pub use errors::{MacroError, Result};
pub use macros::*;
pub use path::{MacroPath, NoSourceRoots, PathResolver, ProjectLayout, project_name};
