//! The `diff` subcommand.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use macrorec_core::{Macro, MacroClock, MacroPath};
use macrorec_engine::DiffReconciler;

/// Write the macros turning `before` into `after` as JSON lines. Returns how
/// many were written.
pub fn diff_files(before: &Path, after: &Path, edit_cost: u16, expected: bool, out: &mut impl Write) -> Result<usize> {
    let old = std::fs::read_to_string(before).with_context(|| format!("failed to read {}", before.display()))?;
    let new = std::fs::read_to_string(after).with_context(|| format!("failed to read {}", after.display()))?;

    let path = MacroPath::bare(after.to_string_lossy(), "");
    let macros = DiffReconciler::new(edit_cost).macros(&MacroClock::new(), &path, &old, &new, expected);
    for m in &macros {
        let json = Macro::Document(m.clone()).to_json()?;
        writeln!(out, "{json}").context("failed to write macro")?;
    }
    Ok(macros.len())
}
